//! Everything a front-end renders for one period selection.

use mdl_trends_analytics::drivers::compute_mom_drivers;
use mdl_trends_analytics::insights::executive_summary;
use mdl_trends_analytics::ranking::{TOP_N, leaders};
use mdl_trends_analytics::summary::compute_summary_from;
use mdl_trends_analytics_models::{
    DeltaMetric, EntityLevel, ExecutiveSummary, LeaderTable, Measure, MomDrivers, MoversTable,
    Summary,
};
use mdl_trends_records_models::{RawRecord, Selection};
use serde::{Deserialize, Serialize};

/// Absolute/percentage toggle of each movers table pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricToggles {
    /// District movers.
    pub district: DeltaMetric,
    /// Group movers.
    pub group: DeltaMetric,
}

impl MetricToggles {
    /// Metric of `level`.
    #[must_use]
    pub const fn get(&self, level: EntityLevel) -> DeltaMetric {
        match level {
            EntityLevel::District => self.district,
            EntityLevel::Group => self.group,
        }
    }

    /// Sets the metric of `level`.
    pub const fn set(&mut self, level: EntityLevel, metric: DeltaMetric) {
        match level {
            EntityLevel::District => self.district = metric,
            EntityLevel::Group => self.group = metric,
        }
    }
}

/// Result of one full recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// Periods compared.
    pub selection: Selection,
    /// Metric toggles the movers tables were picked with.
    pub metrics: MetricToggles,
    /// Headline figures.
    pub executive: ExecutiveSummary,
    /// Largest districts.
    pub top_districts: LeaderTable,
    /// Largest groups.
    pub top_groups: LeaderTable,
    /// District pending movers for the district metric.
    pub district_pending_movers: MoversTable,
    /// District total movers for the district metric.
    pub district_total_movers: MoversTable,
    /// Group pending movers for the group metric.
    pub group_pending_movers: MoversTable,
    /// Group total movers for the group metric.
    pub group_total_movers: MoversTable,
    /// Change attribution, absent for a single-period selection.
    pub drivers: Option<MomDrivers>,
    /// The full comparison.
    pub summary: Summary,
}

/// Builds the view of `selection` from both periods' records.
#[must_use]
pub fn build_view(
    selection: Selection,
    metrics: MetricToggles,
    start: &[RawRecord],
    end: &[RawRecord],
) -> DashboardView {
    let current = mdl_trends_analytics::aggregate::aggregate(end);
    let prior = mdl_trends_analytics::aggregate::aggregate(start);
    let summary = compute_summary_from(&current, &prior);

    let movers = |level: EntityLevel, measure: Measure| {
        summary
            .movers(level)
            .get(measure, metrics.get(level))
            .clone()
    };

    DashboardView {
        executive: executive_summary(&summary),
        top_districts: leaders(&current.districts, Measure::Pending, TOP_N),
        top_groups: leaders(&current.groups, Measure::Pending, TOP_N),
        district_pending_movers: movers(EntityLevel::District, Measure::Pending),
        district_total_movers: movers(EntityLevel::District, Measure::Total),
        group_pending_movers: movers(EntityLevel::Group, Measure::Pending),
        group_total_movers: movers(EntityLevel::Group, Measure::Total),
        drivers: compute_mom_drivers((&selection.start, start), (&selection.end, end)),
        selection,
        metrics,
        summary,
    }
}
