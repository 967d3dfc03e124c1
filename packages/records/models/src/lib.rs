#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical MDL case-count record and period key types.
//!
//! Every record source (HTTP data tree, local directory, ...) produces
//! [`RawRecord`] rows after normalization, so the aggregation engine only
//! ever sees this one shape.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Largest count a normalized record carries (`u32::MAX`). Bounding
/// counts keeps period-wide sums far from `i64` overflow.
pub const MAX_COUNT: i64 = 4_294_967_295;

/// One row of a monthly MDL report: a case group's counts within a
/// district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    /// Top-level entity key (district code, e.g. "NJ").
    pub entity_key: String,
    /// Case-group key within the entity (e.g. "MDL-2738"), if the row
    /// carries one.
    pub group_key: Option<String>,
    /// Free-text case-group title.
    pub title: String,
    /// Transferee judge assigned to the group, if reported.
    pub judge: Option<String>,
    /// Actions still pending.
    pub pending_count: i64,
    /// Actions ever filed. Expected to be at least `pending_count` but
    /// not enforced.
    pub total_count: i64,
}

impl RawRecord {
    /// Terminated actions, derived as `total - pending`.
    ///
    /// May be negative when a source reports more pending than total
    /// actions.
    #[must_use]
    pub const fn terminated_count(&self) -> i64 {
        self.total_count - self.pending_count
    }
}

/// Opaque key of a reporting period (e.g. `"2024-03"`).
///
/// Keys compare lexically, which matches chronological order for the
/// `YYYY-MM` / `YYYY-MM-DD` keys the catalog publishes. Catalog order is
/// still authoritative for indexing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodKey(String);

impl PeriodKey {
    /// Wraps a raw period key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the key as the first day of its month, if it looks like
    /// `YYYY-MM` or `YYYY-MM-DD`.
    #[must_use]
    pub fn month_start(&self) -> Option<NaiveDate> {
        let mut parts = self.0.splitn(3, '-');
        let year = parts.next()?.parse::<i32>().ok()?;
        let month = parts.next()?.parse::<u32>().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1)
    }

    /// Returns the key `months` months away, formatted as `YYYY-MM-01`.
    ///
    /// Returns `None` if the key is not a calendar month.
    #[must_use]
    pub fn shift_months(&self, months: i32) -> Option<Self> {
        let start = self.month_start()?;
        let shifted = if months >= 0 {
            start.checked_add_months(Months::new(months.unsigned_abs()))?
        } else {
            start.checked_sub_months(Months::new(months.unsigned_abs()))?
        };
        Some(Self(shifted.format("%Y-%m-01").to_string()))
    }

    /// Human-readable label such as `"January 2024"`, falling back to
    /// the raw key.
    #[must_use]
    pub fn label(&self) -> String {
        self.month_start()
            .map_or_else(|| self.0.clone(), |d| d.format("%B %Y").to_string())
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeriodKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A prior ("start") and current ("end") period pair.
///
/// Built by the period catalog, which guarantees
/// `index(start) <= index(end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    /// Prior period.
    pub start: PeriodKey,
    /// Current period.
    pub end: PeriodKey,
}

impl Selection {
    /// Returns `true` when both ends are the same period.
    #[must_use]
    pub fn is_single_period(&self) -> bool {
        self.start == self.end
    }
}

/// A district as listed in the district directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictEntry {
    /// Short code used in report rows (e.g. "NJ").
    pub abbreviation: String,
    /// Medium or full court name (e.g. "D.N.J.").
    pub name: String,
}
