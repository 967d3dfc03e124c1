//! Per-session dashboard state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mdl_trends_analytics::drivers::compute_mom_drivers;
use mdl_trends_analytics::forecast::forecast_report;
use mdl_trends_analytics::insights::{
    district_breakdown, judge_activity, most_active_groups, trends_overview,
};
use mdl_trends_analytics::summary::compute_summary;
use mdl_trends_analytics_models::{
    DeltaMetric, DistrictBreakdown, EntityLevel, ForecastReport, KeySummaries, Summary, TrendMode,
    TrendsOverview,
};
use mdl_trends_records::RecordSource;
use mdl_trends_records::cache::{PeriodRecordCache, PeriodRecords};
use mdl_trends_records::catalog::PeriodCatalog;
use mdl_trends_records::districts::DistrictDirectory;
use mdl_trends_records::progress::{ProgressCallback, null_progress};
use mdl_trends_records_models::{PeriodKey, Selection};

use crate::view::{DashboardView, MetricToggles, build_view};
use crate::{DashboardConfig, DashboardError};

struct SessionState {
    selection: Selection,
    metrics: MetricToggles,
}

/// An open dashboard over one record source.
pub struct Session {
    config: DashboardConfig,
    cache: PeriodRecordCache,
    catalog: PeriodCatalog,
    districts: DistrictDirectory,
    state: Mutex<SessionState>,
    generation: AtomicU64,
    progress: Arc<dyn ProgressCallback>,
}

impl Session {
    /// Opens a session over the source described by `config`.
    ///
    /// # Errors
    ///
    /// See [`Session::open`] and [`DashboardConfig::build_source`].
    pub async fn connect(config: DashboardConfig) -> Result<Self, DashboardError> {
        let source = config.build_source()?;
        Self::open(source, config).await
    }

    /// Loads the catalog and district directory from `source` and selects
    /// the latest period against the one before it.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Records`] if the period index cannot be
    /// read, or [`DashboardError::EmptyCatalog`] if it lists no period.
    pub async fn open(
        source: Arc<dyn RecordSource>,
        config: DashboardConfig,
    ) -> Result<Self, DashboardError> {
        let catalog = PeriodCatalog::load(source.as_ref()).await?;
        let selection = catalog
            .default_selection()
            .ok_or(DashboardError::EmptyCatalog)?;
        let districts = DistrictDirectory::load_or_empty(source.as_ref()).await;

        log::debug!(
            "Session opened on {} with selection {} -> {}",
            source.describe(),
            selection.start,
            selection.end
        );

        Ok(Self {
            cache: PeriodRecordCache::new(source, config.fields.clone()),
            config,
            catalog,
            districts,
            state: Mutex::new(SessionState {
                selection,
                metrics: MetricToggles::default(),
            }),
            generation: AtomicU64::new(0),
            progress: null_progress(),
        })
    }

    /// Reports bulk period loads to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Published periods.
    #[must_use]
    pub const fn catalog(&self) -> &PeriodCatalog {
        &self.catalog
    }

    /// District display names.
    #[must_use]
    pub const fn districts(&self) -> &DistrictDirectory {
        &self.districts
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Current period selection.
    #[must_use]
    pub fn selection(&self) -> Selection {
        self.lock().selection.clone()
    }

    /// Current metric toggles.
    #[must_use]
    pub fn metrics(&self) -> MetricToggles {
        self.lock().metrics
    }

    /// Changes the compared periods.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::UnknownPeriod`] if either period is not
    /// published. The current selection is kept in that case.
    pub fn select(&self, start: &PeriodKey, end: &PeriodKey) -> Result<Selection, DashboardError> {
        let selection = self.catalog.select(start, end)?;
        {
            let mut state = self.lock();
            state.selection = selection.clone();
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        log::debug!("Selected {} -> {}", selection.start, selection.end);
        Ok(selection)
    }

    /// Switches the movers of `level` between absolute and percentage.
    pub fn set_metric(&self, level: EntityLevel, metric: DeltaMetric) {
        let mut state = self.lock();
        state.metrics.set(level, metric);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Recomputes the dashboard for the current selection.
    ///
    /// Returns `None` when the selection or a toggle changed while the
    /// periods were loading.
    pub async fn recompute(&self) -> Option<DashboardView> {
        let (generation, selection, metrics) = {
            let state = self.lock();
            (
                self.generation.load(Ordering::SeqCst),
                state.selection.clone(),
                state.metrics,
            )
        };

        let (start, end) = tokio::join!(
            self.cache.load(&selection.start),
            self.cache.load(&selection.end)
        );

        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!(
                "Discarding stale recompute for {} -> {}",
                selection.start,
                selection.end
            );
            return None;
        }

        Some(build_view(selection, metrics, &start, &end))
    }

    /// Summary of the latest period against the one before it, or `None`
    /// with fewer than two periods.
    pub async fn latest_changes(&self) -> Option<Summary> {
        let latest = self.catalog.latest()?;
        let previous = self.catalog.previous()?;
        let (current, prior) = tokio::join!(self.cache.load(latest), self.cache.load(previous));
        Some(compute_summary(&current, &prior))
    }

    /// Forecast and momentum rankings over every published period.
    pub async fn forecast_report(&self) -> ForecastReport {
        let history = self.history().await;
        forecast_report(&history, &self.config.momentum_options())
    }

    /// Per-period totals and dominant groups over every published period.
    pub async fn trends_overview(&self, mode: TrendMode) -> TrendsOverview {
        let history = self.history().await;
        trends_overview(&history, mode)
    }

    /// Judge activity, most active groups and change drivers for the
    /// current selection.
    pub async fn key_summaries(&self) -> KeySummaries {
        let selection = self.selection();
        let history = self.history().await;
        let (start, end) = tokio::join!(
            self.cache.load(&selection.start),
            self.cache.load(&selection.end)
        );

        KeySummaries {
            judges: judge_activity(&end, &history),
            most_active_groups: most_active_groups(&end),
            drivers: compute_mom_drivers((&selection.start, &start), (&selection.end, &end)),
            period: selection.end,
        }
    }

    /// Groups of `district` in the current end period.
    pub async fn district_breakdown(&self, district: &str) -> DistrictBreakdown {
        let end = self.selection().end;
        let records = self.cache.load(&end).await;
        district_breakdown(&records, district)
    }

    async fn history(&self) -> Vec<(PeriodKey, PeriodRecords)> {
        self.cache
            .load_many(self.catalog.periods(), &self.progress)
            .await
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use mdl_trends_records::RecordError;
    use serde_json::json;

    use super::*;

    struct FakeSource {
        periods: BTreeMap<PeriodKey, serde_json::Value>,
        districts: Option<serde_json::Value>,
        delay: Duration,
    }

    impl FakeSource {
        fn new(periods: &[(&str, serde_json::Value)]) -> Self {
            Self {
                periods: periods
                    .iter()
                    .map(|(key, rows)| (PeriodKey::new(*key), rows.clone()))
                    .collect(),
                districts: None,
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
            tokio::time::sleep(self.delay).await;
            self.periods
                .get(period)
                .and_then(|rows| rows.as_array().cloned())
                .ok_or_else(|| RecordError::Normalization {
                    message: format!("no period {period}"),
                })
        }

        async fn fetch_districts(&self) -> Result<serde_json::Value, RecordError> {
            self.districts
                .clone()
                .ok_or_else(|| RecordError::Normalization {
                    message: "no districts".to_string(),
                })
        }
    }

    fn row(district: &str, mdl: &str, pending: i64, total: i64) -> serde_json::Value {
        json!({
            "District": district,
            "MDL": mdl,
            "Title": format!("In re {mdl}"),
            "Judge": "Judge A",
            "Pending": pending,
            "Total": total,
        })
    }

    fn three_months() -> FakeSource {
        FakeSource::new(&[
            ("2024-01", json!([row("NJ", "1", 100, 120), row("MN", "2", 50, 60)])),
            ("2024-02", json!([row("NJ", "1", 120, 140), row("MN", "2", 40, 60)])),
            (
                "2024-03",
                json!([
                    row("NJ", "1", 150, 170),
                    row("MN", "2", 30, 60),
                    row("CA", "3", 10, 10)
                ]),
            ),
        ])
    }

    async fn open(source: FakeSource) -> Session {
        Session::open(Arc::new(source), DashboardConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn opens_on_latest_two_periods() {
        let session = open(three_months()).await;
        let selection = session.selection();
        assert_eq!(selection.start, PeriodKey::new("2024-02"));
        assert_eq!(selection.end, PeriodKey::new("2024-03"));
        assert!(session.districts().is_empty());
        assert_eq!(session.catalog().len(), 3);
    }

    #[tokio::test]
    async fn empty_catalog_is_an_error() {
        let result = Session::open(Arc::new(FakeSource::new(&[])), DashboardConfig::default()).await;
        assert!(matches!(result, Err(DashboardError::EmptyCatalog)));
    }

    #[tokio::test]
    async fn loads_district_names() {
        let mut source = three_months();
        source.districts = Some(json!([{ "abbreviation": "NJ", "name": "D.New Jersey" }]));
        let session = open(source).await;
        assert_eq!(session.districts().display_name("NJ"), "D. New Jersey");
    }

    #[tokio::test]
    async fn recompute_builds_the_view() {
        let session = open(three_months()).await;
        let view = session.recompute().await.unwrap();

        assert_eq!(view.summary.national.pending, 190);
        assert_eq!(view.summary.national.prior_pending, 160);
        assert_eq!(view.executive.national_delta, 30);
        assert_eq!(view.top_districts.rows[0].key, "NJ");
        assert_eq!(view.district_pending_movers.metric, DeltaMetric::Absolute);
        assert_eq!(view.district_pending_movers.rows[0].key, "NJ");

        let drivers = view.drivers.unwrap();
        assert_eq!(drivers.net_change, 30);
        assert_eq!(view.summary.new_districts.len(), 1);
    }

    #[tokio::test]
    async fn metric_toggle_picks_percentage_movers() {
        let session = open(three_months()).await;
        session.set_metric(EntityLevel::Group, DeltaMetric::Percentage);

        let view = session.recompute().await.unwrap();
        assert_eq!(view.metrics.group, DeltaMetric::Percentage);
        assert_eq!(view.group_pending_movers.metric, DeltaMetric::Percentage);
        assert_eq!(view.district_pending_movers.metric, DeltaMetric::Absolute);
    }

    #[tokio::test]
    async fn single_period_selection_has_no_drivers() {
        let session = open(three_months()).await;
        let march = PeriodKey::new("2024-03");
        session.select(&march, &march).unwrap();

        let view = session.recompute().await.unwrap();
        assert!(view.selection.is_single_period());
        assert!(view.drivers.is_none());
        assert_eq!(view.summary.national.pending_delta, 0);
    }

    #[tokio::test]
    async fn unknown_period_keeps_selection() {
        let session = open(three_months()).await;
        let before = session.selection();

        let err = session
            .select(&PeriodKey::new("1999-01"), &PeriodKey::new("2024-03"))
            .unwrap_err();
        assert!(matches!(err, DashboardError::UnknownPeriod { .. }));
        assert_eq!(session.selection(), before);
    }

    #[tokio::test]
    async fn selection_change_discards_in_flight_recompute() {
        let mut source = three_months();
        source.delay = Duration::from_millis(50);
        let session = open(source).await;

        let (stale, ()) = tokio::join!(session.recompute(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            session
                .select(&PeriodKey::new("2024-01"), &PeriodKey::new("2024-02"))
                .unwrap();
        });
        assert!(stale.is_none());

        let fresh = session.recompute().await.unwrap();
        assert_eq!(fresh.selection.end, PeriodKey::new("2024-02"));
        assert_eq!(fresh.summary.national.pending, 160);
    }

    #[tokio::test]
    async fn latest_changes_compares_last_two_periods() {
        let session = open(three_months()).await;
        session
            .select(&PeriodKey::new("2024-01"), &PeriodKey::new("2024-01"))
            .unwrap();

        let summary = session.latest_changes().await.unwrap();
        assert_eq!(summary.national.pending, 190);
        assert_eq!(summary.new_groups.len(), 1);
        assert_eq!(summary.new_groups[0].key, "3");
    }

    #[tokio::test]
    async fn latest_changes_needs_two_periods() {
        let session = open(FakeSource::new(&[("2024-01", json!([row("NJ", "1", 1, 1)]))])).await;
        assert!(session.latest_changes().await.is_none());
    }

    #[tokio::test]
    async fn history_views_cover_every_period() {
        let session = open(three_months()).await;

        let trends = session.trends_overview(TrendMode::Pending).await;
        assert_eq!(trends.points.len(), 3);
        assert_eq!(trends.points[0].pending, 150);

        let report = session.forecast_report().await;
        let aggregate = report.aggregate.unwrap();
        assert_eq!(aggregate.history.len(), 3);
        assert_eq!(report.window.len(), 3);

        let summaries = session.key_summaries().await;
        assert_eq!(summaries.period, PeriodKey::new("2024-03"));
        assert_eq!(summaries.judges[0].judge, "Judge A");
        assert_eq!(summaries.most_active_groups[0].key, "1");
    }

    #[tokio::test]
    async fn breakdown_uses_end_period() {
        let session = open(three_months()).await;
        let breakdown = session.district_breakdown("NJ").await;
        assert_eq!(breakdown.pending, 150);
        assert!(breakdown.groups_available);
        assert_eq!(breakdown.by_pending[0].key, "1");
    }
}
