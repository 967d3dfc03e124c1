//! Per-period record cache.
//!
//! Each period is fetched and normalized at most once per session.
//! Concurrent requests for the same uncached period share one in-flight
//! fetch. A failed fetch is cached as an empty record set so a missing
//! month degrades to all-zero aggregates instead of an error.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt as _;
use mdl_trends_records_models::{PeriodKey, RawRecord};
use tokio::sync::OnceCell;

use crate::RecordSource;
use crate::normalize::FieldMapping;
use crate::progress::ProgressCallback;

/// Maximum number of period fetches in flight during [`PeriodRecordCache::load_many`].
const PRELOAD_CONCURRENCY: usize = 4;

/// Records of one period, shared between the cache and its readers.
pub type PeriodRecords = Arc<[RawRecord]>;

type Slot = Arc<OnceCell<PeriodRecords>>;

/// Write-once-per-key cache of normalized period records.
pub struct PeriodRecordCache {
    source: Arc<dyn RecordSource>,
    mapping: FieldMapping,
    slots: Mutex<BTreeMap<PeriodKey, Slot>>,
}

impl PeriodRecordCache {
    /// Creates an empty cache over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn RecordSource>, mapping: FieldMapping) -> Self {
        Self {
            source,
            mapping,
            slots: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the records of `period`, fetching them on first use.
    ///
    /// Never fails: fetch errors are logged and yield an empty set.
    pub async fn load(&self, period: &PeriodKey) -> PeriodRecords {
        let slot = self.slot(period);
        if let Some(records) = slot.get() {
            log::debug!("Cache hit for period {period} ({} records)", records.len());
            return Arc::clone(records);
        }

        Arc::clone(slot.get_or_init(|| self.fetch(period)).await)
    }

    /// Loads several periods, at most [`PRELOAD_CONCURRENCY`] at a time,
    /// returning them in the order requested.
    pub async fn load_many(
        &self,
        periods: &[PeriodKey],
        progress: &Arc<dyn ProgressCallback>,
    ) -> Vec<(PeriodKey, PeriodRecords)> {
        progress.set_total(periods.len() as u64);
        progress.set_message("Loading periods".to_string());

        let loaded: Vec<(PeriodKey, PeriodRecords)> = futures::stream::iter(periods)
            .map(|period| async move {
                let records = self.load(period).await;
                progress.inc(1);
                (period.clone(), records)
            })
            .buffered(PRELOAD_CONCURRENCY)
            .collect()
            .await;

        progress.finish(format!("Loaded {} periods", loaded.len()));
        loaded
    }

    /// Returns `true` if `period` has already been fetched.
    #[must_use]
    pub fn is_cached(&self, period: &PeriodKey) -> bool {
        self.lock()
            .get(period)
            .is_some_and(|slot| slot.initialized())
    }

    /// Periods fetched so far, in key order.
    #[must_use]
    pub fn cached_periods(&self) -> Vec<PeriodKey> {
        self.lock()
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(period, _)| period.clone())
            .collect()
    }

    fn slot(&self, period: &PeriodKey) -> Slot {
        Arc::clone(self.lock().entry(period.clone()).or_default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PeriodKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(&self, period: &PeriodKey) -> PeriodRecords {
        match self.source.fetch_period_rows(period).await {
            Ok(rows) => {
                let records = self.mapping.normalize_rows(&rows);
                log::debug!("Fetched period {period}: {} records", records.len());
                records.into()
            }
            Err(e) => {
                log::warn!(
                    "Failed to fetch period {period} from {}: {e}; treating as empty",
                    self.source.describe()
                );
                Arc::from(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::RecordError;
    use crate::progress::null_progress;

    /// In-memory source that counts fetches per call.
    struct FakeSource {
        periods: BTreeMap<PeriodKey, Vec<serde_json::Value>>,
        fetches: AtomicUsize,
        delay: Duration,
    }

    impl FakeSource {
        fn new(periods: &[(&str, serde_json::Value)]) -> Self {
            Self {
                periods: periods
                    .iter()
                    .map(|(key, rows)| {
                        let rows = rows.as_array().cloned().unwrap_or_default();
                        (PeriodKey::new(*key), rows)
                    })
                    .collect(),
                fetches: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl RecordSource for FakeSource {
        fn describe(&self) -> String {
            "fake".to_string()
        }

        async fn list_periods(&self) -> Result<Vec<PeriodKey>, RecordError> {
            Ok(self.periods.keys().cloned().collect())
        }

        async fn fetch_period_rows(
            &self,
            period: &PeriodKey,
        ) -> Result<Vec<serde_json::Value>, RecordError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.periods
                .get(period)
                .cloned()
                .ok_or_else(|| RecordError::Normalization {
                    message: format!("no such period {period}"),
                })
        }

        async fn fetch_districts(&self) -> Result<serde_json::Value, RecordError> {
            Ok(serde_json::json!([]))
        }
    }

    fn source() -> Arc<FakeSource> {
        Arc::new(FakeSource::new(&[
            (
                "2024-01",
                serde_json::json!([{"District": "NJ", "MDL": "MDL-1", "Pending": 5, "Total": 7}]),
            ),
            ("2024-02", serde_json::json!([])),
        ]))
    }

    #[tokio::test]
    async fn fetches_each_period_once() {
        let fake = source();
        let cache = PeriodRecordCache::new(fake.clone(), FieldMapping::default());
        let key = PeriodKey::new("2024-01");

        let first = cache.load(&key).await;
        let second = cache.load(&key).await;

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].pending_count, 5);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fake.fetches.load(Ordering::SeqCst), 1);
        assert!(cache.is_cached(&key));
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_fetch() {
        let mut fake = FakeSource::new(&[("2024-01", serde_json::json!([{"District": "NJ"}]))]);
        fake.delay = Duration::from_millis(20);
        let fake = Arc::new(fake);
        let cache = PeriodRecordCache::new(fake.clone(), FieldMapping::default());
        let key = PeriodKey::new("2024-01");

        let (a, b) = tokio::join!(cache.load(&key), cache.load(&key));

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(fake.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_cached_as_empty() {
        let fake = source();
        let cache = PeriodRecordCache::new(fake.clone(), FieldMapping::default());
        let missing = PeriodKey::new("2023-12");

        assert!(cache.load(&missing).await.is_empty());
        assert!(cache.load(&missing).await.is_empty());
        assert_eq!(fake.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn load_many_preserves_order() {
        let fake = source();
        let cache = PeriodRecordCache::new(fake, FieldMapping::default());
        let periods = vec![PeriodKey::new("2024-02"), PeriodKey::new("2024-01")];

        let loaded = cache.load_many(&periods, &null_progress()).await;

        let keys: Vec<&str> = loaded.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["2024-02", "2024-01"]);
        assert!(loaded[0].1.is_empty());
        assert_eq!(loaded[1].1.len(), 1);
        assert_eq!(cache.cached_periods().len(), 2);
    }
}
