//! Maps heterogeneous report rows onto the canonical [`RawRecord`].
//!
//! Report rows have been published under several field spellings over
//! time (`"MDL"` vs `"MDL Name"`, numbers vs `"1,234"` strings). The
//! [`FieldMapping`] lists, per canonical field, the source field names to
//! try in order. Normalization is lenient: missing or unparseable counts
//! become 0 and no row is rejected for its values.

use mdl_trends_records_models::{MAX_COUNT, RawRecord};
use serde::{Deserialize, Serialize};

/// Source field names for each canonical record field, tried in order
/// (first non-empty wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    /// District field names.
    pub entity: Vec<String>,
    /// Case-group field names.
    pub group: Vec<String>,
    /// Case-group title field names.
    pub title: Vec<String>,
    /// Judge field names.
    pub judge: Vec<String>,
    /// Pending-count field names.
    pub pending: Vec<String>,
    /// Total-count field names.
    pub total: Vec<String>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(ToString::to_string).collect()
        }

        Self {
            entity: names(&["District"]),
            group: names(&["MDL", "MDL Name"]),
            title: names(&["Title"]),
            judge: names(&["Judge"]),
            pending: names(&["Pending"]),
            total: names(&["Total"]),
        }
    }
}

impl FieldMapping {
    /// Normalizes one row. Returns `None` for rows that are not JSON
    /// objects.
    #[must_use]
    pub fn normalize(&self, row: &serde_json::Value) -> Option<RawRecord> {
        if !row.is_object() {
            return None;
        }

        Some(RawRecord {
            entity_key: extract_string(row, &self.entity).unwrap_or_default(),
            group_key: extract_string(row, &self.group),
            title: extract_string(row, &self.title).unwrap_or_default(),
            judge: extract_string(row, &self.judge),
            pending_count: extract_count(row, &self.pending),
            total_count: extract_count(row, &self.total),
        })
    }

    /// Normalizes every row of a period, skipping (and logging) rows that
    /// are not objects.
    #[must_use]
    pub fn normalize_rows(&self, rows: &[serde_json::Value]) -> Vec<RawRecord> {
        let records: Vec<RawRecord> = rows.iter().filter_map(|row| self.normalize(row)).collect();
        let skipped = rows.len() - records.len();
        if skipped > 0 {
            log::warn!("Skipped {skipped} non-object row(s) during normalization");
        }
        records
    }
}

/// Tries each field name in order and returns the first non-empty string
/// value. Numeric values are stringified.
fn extract_string(row: &serde_json::Value, fields: &[String]) -> Option<String> {
    for field in fields {
        match row.get(field) {
            Some(serde_json::Value::String(s)) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
            Some(serde_json::Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Tries each field name in order and returns the first parseable count,
/// defaulting to 0. Values clamp to `0..=MAX_COUNT`.
fn extract_count(row: &serde_json::Value, fields: &[String]) -> i64 {
    fields
        .iter()
        .find_map(|field| row.get(field).and_then(parse_count))
        .unwrap_or(0)
        .clamp(0, MAX_COUNT)
}

#[allow(clippy::cast_possible_truncation)]
fn parse_count(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        serde_json::Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
            cleaned.parse::<i64>().ok()
        }
        _ => None,
    }
}
