#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Record sources, normalization and per-period caching for MDL reports.
//!
//! A [`RecordSource`] knows how to list the published periods and fetch
//! the raw rows for one of them. Rows are normalized into
//! [`RawRecord`](mdl_trends_records_models::RawRecord)s exactly once, by
//! [`normalize::FieldMapping`], before the
//! [`cache::PeriodRecordCache`] hands them to the analytics engine.

pub mod cache;
pub mod catalog;
pub mod directory;
pub mod districts;
pub mod http;
pub mod normalize;
pub mod progress;
pub mod retry;

use async_trait::async_trait;
use mdl_trends_records_models::PeriodKey;

/// Errors that can occur while reading from a record source.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document had an unexpected shape.
    #[error("Normalization error: {message}")]
    Normalization {
        /// Description of what went wrong.
        message: String,
    },
}

/// A published tree of monthly MDL reports.
///
/// Implementations return raw JSON rows; mapping them to the canonical
/// record shape is the caller's job (see [`normalize`]).
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human-readable description of where records come from.
    fn describe(&self) -> String;

    /// Lists every published period in ascending chronological order.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the period index cannot be read.
    async fn list_periods(&self) -> Result<Vec<PeriodKey>, RecordError>;

    /// Fetches the raw rows of one period.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the period document cannot be read or is
    /// not a JSON array.
    async fn fetch_period_rows(
        &self,
        period: &PeriodKey,
    ) -> Result<Vec<serde_json::Value>, RecordError>;

    /// Fetches the district directory document.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the directory cannot be read.
    async fn fetch_districts(&self) -> Result<serde_json::Value, RecordError>;
}

/// Interprets a document as a JSON array of rows.
///
/// # Errors
///
/// Returns [`RecordError::Normalization`] if the document is not an array.
pub fn expect_rows(
    document: serde_json::Value,
    what: &str,
) -> Result<Vec<serde_json::Value>, RecordError> {
    match document {
        serde_json::Value::Array(rows) => Ok(rows),
        other => Err(RecordError::Normalization {
            message: format!("{what}: expected a JSON array, got {}", kind_of(&other)),
        }),
    }
}

/// Interprets a period index document as a list of period keys.
///
/// # Errors
///
/// Returns [`RecordError::Normalization`] if the document is not an array
/// of strings.
pub fn parse_period_index(document: serde_json::Value) -> Result<Vec<PeriodKey>, RecordError> {
    expect_rows(document, "period index")?
        .into_iter()
        .map(|entry| match entry {
            serde_json::Value::String(key) => Ok(PeriodKey::new(key)),
            other => Err(RecordError::Normalization {
                message: format!("period index: expected a string, got {}", kind_of(&other)),
            }),
        })
        .collect()
}

const fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_period_index() {
        let doc = serde_json::json!(["2024-01", "2024-02"]);
        let periods = parse_period_index(doc).unwrap();
        assert_eq!(periods, vec![PeriodKey::new("2024-01"), PeriodKey::new("2024-02")]);
    }

    #[test]
    fn rejects_non_array_index() {
        let err = parse_period_index(serde_json::json!({"months": []})).unwrap_err();
        assert!(err.to_string().contains("expected a JSON array"));
    }

    #[test]
    fn rejects_non_string_period() {
        assert!(parse_period_index(serde_json::json!(["2024-01", 7])).is_err());
    }
}
