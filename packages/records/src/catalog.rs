//! The ordered list of published periods.

use mdl_trends_records_models::{PeriodKey, Selection};

use crate::{RecordError, RecordSource};

/// A period that is not listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown period: {0}")]
pub struct UnknownPeriod(pub PeriodKey);

/// Periods in ascending chronological order, fetched once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodCatalog {
    periods: Vec<PeriodKey>,
}

impl PeriodCatalog {
    /// Wraps an already ordered period list.
    #[must_use]
    pub const fn new(periods: Vec<PeriodKey>) -> Self {
        Self { periods }
    }

    /// Fetches the period index from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the index cannot be read.
    pub async fn load(source: &dyn RecordSource) -> Result<Self, RecordError> {
        let periods = source.list_periods().await?;
        log::info!(
            "Loaded period catalog from {}: {} periods",
            source.describe(),
            periods.len()
        );
        Ok(Self::new(periods))
    }

    /// All periods, oldest first.
    #[must_use]
    pub fn periods(&self) -> &[PeriodKey] {
        &self.periods
    }

    /// Number of periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Returns `true` if no period is published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Position of `period` in the catalog.
    #[must_use]
    pub fn index_of(&self, period: &PeriodKey) -> Option<usize> {
        self.periods.iter().position(|p| p == period)
    }

    /// Returns `true` if `period` is published.
    #[must_use]
    pub fn contains(&self, period: &PeriodKey) -> bool {
        self.index_of(period).is_some()
    }

    /// Most recent period.
    #[must_use]
    pub fn latest(&self) -> Option<&PeriodKey> {
        self.periods.last()
    }

    /// Period immediately before the most recent one.
    #[must_use]
    pub fn previous(&self) -> Option<&PeriodKey> {
        self.periods.len().checked_sub(2).map(|i| &self.periods[i])
    }

    /// Latest period against the one before it, or the latest against
    /// itself when only one is published.
    #[must_use]
    pub fn default_selection(&self) -> Option<Selection> {
        let end = self.latest()?.clone();
        let start = self.previous().cloned().unwrap_or_else(|| end.clone());
        Some(Selection { start, end })
    }

    /// Validates a user selection.
    ///
    /// An end period earlier than the start is clamped to the start.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownPeriod`] if either period is not in the catalog.
    pub fn select(&self, start: &PeriodKey, end: &PeriodKey) -> Result<Selection, UnknownPeriod> {
        let start_idx = self
            .index_of(start)
            .ok_or_else(|| UnknownPeriod(start.clone()))?;
        let end_idx = self.index_of(end).ok_or_else(|| UnknownPeriod(end.clone()))?;

        let end = if end_idx < start_idx {
            log::debug!("End period {end} precedes start {start}; clamping to start");
            start.clone()
        } else {
            end.clone()
        };

        Ok(Selection {
            start: start.clone(),
            end,
        })
    }
}
