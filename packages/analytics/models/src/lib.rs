#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types of the MDL trend analytics engine.
//!
//! Everything here is derived data: built fresh by the engine from
//! [`RawRecord`](mdl_trends_records_models::RawRecord)s and never mutated
//! afterwards, apart from display re-ordering such as
//! [`MoversTable::sort_rows`].

use mdl_trends_records_models::PeriodKey;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Case count a table or series is built from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Measure {
    /// Actions still pending.
    #[default]
    Pending,
    /// Actions ever filed.
    Total,
}

/// How a change between two periods is expressed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeltaMetric {
    /// `current - prior`.
    #[default]
    Absolute,
    /// Percentage change, with the zero-prior convention.
    Percentage,
}

/// Aggregation level of an entity.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityLevel {
    /// Top-level entity (district).
    District,
    /// Case group within a district.
    Group,
}

/// Qualitative market concentration derived from the HHI.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum Concentration {
    /// HHI below 1000.
    Low,
    /// HHI from 1000 to 1800 inclusive.
    Moderate,
    /// HHI above 1800.
    High,
}

/// Qualitative label of a fitted trend slope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum Momentum {
    /// Slope above 150 per period.
    #[serde(rename = "Rapidly Rising")]
    #[strum(serialize = "Rapidly Rising")]
    RapidlyRising,
    /// Slope above 30.
    Rising,
    /// Slope above -30.
    Stable,
    /// Slope above -150.
    Declining,
    /// Anything lower.
    #[serde(rename = "Rapidly Declining")]
    #[strum(serialize = "Rapidly Declining")]
    RapidlyDeclining,
}

/// Column a movers table can be re-sorted by.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortColumn {
    /// Entity key.
    Name,
    /// Current-period value.
    Current,
    /// Prior-period value.
    Prior,
    /// Absolute change.
    Delta,
    /// Percentage change.
    PctDelta,
}

/// Sort direction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    #[default]
    Descending,
}

/// Which measure a trends overview is referenced against.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrendMode {
    /// Pending cases.
    #[default]
    Pending,
    /// Total cases.
    Total,
    /// Pending, total and terminated side by side (pending reference).
    All,
}

impl TrendMode {
    /// Measure dominance and the moving average are computed against.
    #[must_use]
    pub const fn reference(self) -> Measure {
        match self {
            Self::Total => Measure::Total,
            Self::Pending | Self::All => Measure::Pending,
        }
    }
}

/// Per-entity totals within one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    /// Entity or group key.
    pub key: String,
    /// Display title (groups only).
    pub title: Option<String>,
    /// Owning entity (groups only).
    pub parent: Option<String>,
    /// Summed pending actions.
    pub pending: i64,
    /// Summed total actions.
    pub total: i64,
    /// `pending / period-wide pending`, 0 when the period has none.
    pub share: f64,
}

impl Aggregate {
    /// Empty aggregate for `key`.
    #[must_use]
    pub fn empty(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: None,
            parent: None,
            pending: 0,
            total: 0,
            share: 0.0,
        }
    }

    /// Terminated actions (`total - pending`).
    #[must_use]
    pub const fn terminated(&self) -> i64 {
        self.total - self.pending
    }

    /// Value of `measure`.
    #[must_use]
    pub const fn value(&self, measure: Measure) -> i64 {
        match measure {
            Measure::Pending => self.pending,
            Measure::Total => self.total,
        }
    }
}

/// One entity's change between the prior and current period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    /// Entity or group key.
    pub key: String,
    /// Display title (groups only).
    pub title: Option<String>,
    /// Owning entity (groups only).
    pub parent: Option<String>,
    /// Current pending.
    pub pending: i64,
    /// Current total.
    pub total: i64,
    /// Prior pending.
    pub prior_pending: i64,
    /// Prior total.
    pub prior_total: i64,
    /// `pending - prior_pending`.
    pub pending_delta: i64,
    /// Percentage change of pending. 100 when prior is 0 and current is
    /// positive, 0 when both are 0.
    pub pending_pct_delta: f64,
    /// `total - prior_total`.
    pub total_delta: i64,
    /// Percentage change of total, same zero convention.
    pub total_pct_delta: f64,
    /// Current-period share of national pending.
    pub share: f64,
}

impl Delta {
    /// Current value of `measure`.
    #[must_use]
    pub const fn current(&self, measure: Measure) -> i64 {
        match measure {
            Measure::Pending => self.pending,
            Measure::Total => self.total,
        }
    }

    /// Prior value of `measure`.
    #[must_use]
    pub const fn prior(&self, measure: Measure) -> i64 {
        match measure {
            Measure::Pending => self.prior_pending,
            Measure::Total => self.prior_total,
        }
    }

    /// Absolute change of `measure`.
    #[must_use]
    pub const fn change(&self, measure: Measure) -> i64 {
        match measure {
            Measure::Pending => self.pending_delta,
            Measure::Total => self.total_delta,
        }
    }

    /// Percentage change of `measure`.
    #[must_use]
    pub const fn pct_change(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Pending => self.pending_pct_delta,
            Measure::Total => self.total_pct_delta,
        }
    }

    /// The delta field movers are ranked by.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn ranking_value(&self, measure: Measure, metric: DeltaMetric) -> f64 {
        match metric {
            DeltaMetric::Absolute => self.change(measure) as f64,
            DeltaMetric::Percentage => self.pct_change(measure),
        }
    }

    /// Current terminated actions.
    #[must_use]
    pub const fn terminated(&self) -> i64 {
        self.total - self.pending
    }
}

/// Period-wide totals and their change.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NationalTotals {
    /// Current pending.
    pub pending: i64,
    /// Prior pending.
    pub prior_pending: i64,
    /// `pending - prior_pending`.
    pub pending_delta: i64,
    /// Percentage change of pending (zero-prior convention).
    pub pending_pct_delta: f64,
    /// Current total.
    pub total: i64,
    /// Prior total.
    pub prior_total: i64,
    /// `total - prior_total`.
    pub total_delta: i64,
    /// Percentage change of total (zero-prior convention).
    pub total_pct_delta: f64,
}

/// One ranked row of a movers table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoverRow {
    /// Entity or group key.
    pub key: String,
    /// Display title (groups only).
    pub title: Option<String>,
    /// Owning entity (groups only).
    pub parent: Option<String>,
    /// Current value.
    pub current: i64,
    /// Prior value.
    pub prior: i64,
    /// `current - prior`.
    pub delta: i64,
    /// Percentage change (zero-prior convention).
    pub pct_delta: f64,
}

/// Summed "All Others" or "Total" row of a table.
///
/// Unlike per-entity rows, `pct_delta` here is `delta / prior * 100`
/// when `prior != 0` and plain 0 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRow {
    /// Number of entities summed.
    pub count: usize,
    /// Summed current value.
    pub current: i64,
    /// Summed prior value.
    pub prior: i64,
    /// Summed change.
    pub delta: i64,
    /// Percentage change of the sums.
    pub pct_delta: f64,
}

/// Top-10 movers with their "All Others" and "Total" rows.
///
/// `others` covers every entity not in `rows`, including entities with
/// zero or negative change, so `rows + others == total` for every column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoversTable {
    /// Measure the table is built from.
    pub measure: Measure,
    /// Delta field the top rows were selected by.
    pub metric: DeltaMetric,
    /// At most 10 entities with a strictly positive selected change.
    pub rows: Vec<MoverRow>,
    /// Sum over every entity not in `rows`.
    pub others: AggregateRow,
    /// Sum over every entity.
    pub total: AggregateRow,
}

impl MoversTable {
    /// Re-orders `rows` by a displayed column. Membership, `others` and
    /// `total` never change. Ties keep their current order.
    pub fn sort_rows(&mut self, column: SortColumn, direction: SortDirection) {
        self.rows.sort_by(|a, b| {
            let ordering = match column {
                SortColumn::Name => a.key.cmp(&b.key),
                SortColumn::Current => a.current.cmp(&b.current),
                SortColumn::Prior => a.prior.cmp(&b.prior),
                SortColumn::Delta => a.delta.cmp(&b.delta),
                SortColumn::PctDelta => a.pct_delta.total_cmp(&b.pct_delta),
            };
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
    }

    /// Returns `true` when no entity moved up.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The four movers tables of one aggregation level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoverSet {
    /// Ranked by absolute pending change.
    pub pending_absolute: MoversTable,
    /// Ranked by percentage pending change.
    pub pending_percentage: MoversTable,
    /// Ranked by absolute total change.
    pub total_absolute: MoversTable,
    /// Ranked by percentage total change.
    pub total_percentage: MoversTable,
}

impl MoverSet {
    /// Table for `measure` ranked by `metric`.
    #[must_use]
    pub const fn get(&self, measure: Measure, metric: DeltaMetric) -> &MoversTable {
        match (measure, metric) {
            (Measure::Pending, DeltaMetric::Absolute) => &self.pending_absolute,
            (Measure::Pending, DeltaMetric::Percentage) => &self.pending_percentage,
            (Measure::Total, DeltaMetric::Absolute) => &self.total_absolute,
            (Measure::Total, DeltaMetric::Percentage) => &self.total_percentage,
        }
    }
}

/// An entity that appeared or disappeared between two periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityChange {
    /// Entity or group key.
    pub key: String,
    /// Display title (groups only).
    pub title: Option<String>,
    /// Owning entity (groups only).
    pub parent: Option<String>,
    /// Pending in the period the entity exists in.
    pub pending: i64,
    /// Total in the period the entity exists in.
    pub total: i64,
}

/// Everything derived from one current/prior period pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Period-wide totals.
    pub national: NationalTotals,
    /// Herfindahl–Hirschman index of current district pending shares.
    pub hhi: i64,
    /// Label of `hhi`.
    pub concentration: Concentration,
    /// Combined share of the five largest districts by current pending.
    pub top5_share: f64,
    /// District deltas in encounter order.
    pub districts: Vec<Delta>,
    /// Group deltas in encounter order.
    pub groups: Vec<Delta>,
    /// District movers tables.
    pub district_movers: MoverSet,
    /// Group movers tables.
    pub group_movers: MoverSet,
    /// Districts only present in the current period.
    pub new_districts: Vec<EntityChange>,
    /// Districts only present in the prior period, with prior counts.
    pub removed_districts: Vec<EntityChange>,
    /// Groups only present in the current period.
    pub new_groups: Vec<EntityChange>,
    /// Groups only present in the prior period, with prior counts.
    pub removed_groups: Vec<EntityChange>,
}

impl Summary {
    /// Deltas of `level`.
    #[must_use]
    pub fn deltas(&self, level: EntityLevel) -> &[Delta] {
        match level {
            EntityLevel::District => &self.districts,
            EntityLevel::Group => &self.groups,
        }
    }

    /// Movers tables of `level`.
    #[must_use]
    pub const fn movers(&self, level: EntityLevel) -> &MoverSet {
        match level {
            EntityLevel::District => &self.district_movers,
            EntityLevel::Group => &self.group_movers,
        }
    }

    /// Looks up a district delta by key.
    #[must_use]
    pub fn district(&self, key: &str) -> Option<&Delta> {
        self.districts.iter().find(|d| d.key == key)
    }

    /// Looks up a group delta by key.
    #[must_use]
    pub fn group(&self, key: &str) -> Option<&Delta> {
        self.groups.iter().find(|d| d.key == key)
    }
}

/// One row of a leaders table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderRow {
    /// Entity or group key.
    pub key: String,
    /// Display title (groups only).
    pub title: Option<String>,
    /// Owning entity (groups only).
    pub parent: Option<String>,
    /// Current pending.
    pub pending: i64,
    /// Current terminated.
    pub terminated: i64,
    /// Current total.
    pub total: i64,
    /// Share of national pending.
    pub share: f64,
}

/// Summed leaders-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderTotals {
    /// Number of entities summed.
    pub count: usize,
    /// Summed pending.
    pub pending: i64,
    /// Summed terminated.
    pub terminated: i64,
    /// Summed total.
    pub total: i64,
}

/// Largest entities by current size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderTable {
    /// Measure the rows are ranked by.
    pub rank_by: Measure,
    /// Largest entities, descending.
    pub rows: Vec<LeaderRow>,
    /// Sum over everything not in `rows`.
    pub others: LeaderTotals,
    /// Sum over every entity.
    pub total: LeaderTotals,
}

/// The largest entity of a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    /// Entity or group key.
    pub key: String,
    /// Display title (groups only).
    pub title: Option<String>,
    /// Owning entity (groups only).
    pub parent: Option<String>,
    /// Current pending.
    pub pending: i64,
    /// Percentage of national pending.
    pub share_pct: f64,
}

/// The fastest-growing entity of a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grower {
    /// Entity or group key.
    pub key: String,
    /// Display title (groups only).
    pub title: Option<String>,
    /// Owning entity (groups only).
    pub parent: Option<String>,
    /// Absolute pending change.
    pub pending_delta: i64,
    /// Percentage pending change.
    pub pending_pct_delta: f64,
}

/// Headline figures for the selected period pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    /// Current national pending.
    pub national_pending: i64,
    /// Current national total.
    pub national_total: i64,
    /// Change in national pending.
    pub national_delta: i64,
    /// Percentage change in national pending.
    pub national_pct_delta: f64,
    /// Groups with at least one pending action.
    pub active_groups: usize,
    /// Districts with at least one pending action.
    pub active_districts: usize,
    /// Combined share of the five largest districts.
    pub top5_share: f64,
    /// HHI of district shares.
    pub hhi: i64,
    /// Label of `hhi`.
    pub concentration: Concentration,
    /// Largest district by pending.
    pub top_district: Option<Highlight>,
    /// Largest group by pending.
    pub top_group: Option<Highlight>,
    /// District with the largest absolute pending increase.
    pub fastest_growing_district: Option<Grower>,
    /// Group with the largest absolute pending increase.
    pub fastest_growing_group: Option<Grower>,
    /// Number of groups that appeared.
    pub new_group_count: usize,
    /// Number of groups that disappeared.
    pub removed_group_count: usize,
}

/// One contributor to a period-over-period pending change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    /// Entity or group key.
    pub key: String,
    /// Display title (groups only).
    pub title: Option<String>,
    /// Pending change.
    pub delta: i64,
    /// `delta / gross_movement * 100`.
    pub pct_of_movement: f64,
}

/// Contributors of one level, largest absolute change first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverTable {
    /// `Σ|delta|`, or 1 when nothing moved.
    pub gross_movement: i64,
    /// Every contributor, sorted by `|delta|` descending.
    pub items: Vec<Driver>,
}

/// Top contributors of a [`DriverTable`] with the remainder summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverBreakdown {
    /// Largest contributors.
    pub top: Vec<Driver>,
    /// Number of remaining contributors.
    pub others_count: usize,
    /// Summed change of the remaining contributors.
    pub others_delta: i64,
    /// `others_delta` as a percentage of gross movement.
    pub others_pct: f64,
    /// Net change.
    pub net_change: i64,
    /// Net change as a percentage of gross movement.
    pub net_pct: f64,
}

/// Attribution of the pending change between two periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomDrivers {
    /// Prior period.
    pub start: PeriodKey,
    /// Current period.
    pub end: PeriodKey,
    /// Sum of district changes.
    pub net_change: i64,
    /// District contributors.
    pub districts: DriverTable,
    /// Group contributors.
    pub groups: DriverTable,
}

impl MomDrivers {
    /// Contributors of `level`.
    #[must_use]
    pub const fn table(&self, level: EntityLevel) -> &DriverTable {
        match level {
            EntityLevel::District => &self.districts,
            EntityLevel::Group => &self.groups,
        }
    }
}

/// Group counts of one judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeActivity {
    /// Judge name, "Unknown" when not reported.
    pub judge: String,
    /// The judge's most frequent district in the current period.
    pub district: String,
    /// Distinct groups with pending actions in the current period.
    pub active: usize,
    /// `total - active`.
    pub not_active: usize,
    /// Distinct groups ever assigned across all periods.
    pub total: usize,
}

/// A group ranked by its pending/total ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGroup {
    /// Group key.
    pub key: String,
    /// Group title.
    pub title: String,
    /// Owning district.
    pub district: String,
    /// Pending actions.
    pub pending: i64,
    /// Total actions.
    pub total: i64,
    /// `pending / total`.
    pub ratio: f64,
}

/// Judge and group highlights for the current period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySummaries {
    /// Current period.
    pub period: PeriodKey,
    /// Judges, most active first.
    pub judges: Vec<JudgeActivity>,
    /// Groups with the highest pending/total ratio.
    pub most_active_groups: Vec<ActiveGroup>,
    /// Change attribution, absent when start and end are the same.
    pub drivers: Option<MomDrivers>,
}

/// A group accounting for a large share of one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DominantGroup {
    /// Group key.
    pub key: String,
    /// Group title.
    pub title: Option<String>,
    /// The group's value of the reference measure.
    pub value: i64,
    /// Percentage of the period's reference total.
    pub percentage: f64,
}

/// Period-wide totals of one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// The period.
    pub period: PeriodKey,
    /// Display label.
    pub label: String,
    /// Summed pending.
    pub pending: i64,
    /// Summed total.
    pub total: i64,
    /// `total - pending`.
    pub terminated: i64,
    /// Groups above 20% of the reference measure, largest first.
    pub dominant: Vec<DominantGroup>,
    /// Trailing 3-period mean of the reference measure.
    pub moving_average: Option<f64>,
}

/// Totals of every catalog period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsOverview {
    /// Reference mode.
    pub mode: TrendMode,
    /// One point per period, oldest first.
    pub points: Vec<TrendPoint>,
}

/// A group's share of one district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCount {
    /// Group key.
    pub key: String,
    /// Group title.
    pub title: String,
    /// Count of the listed measure.
    pub count: i64,
}

/// Groups of one district in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictBreakdown {
    /// District key.
    pub district: String,
    /// Groups with pending actions, largest first.
    pub by_pending: Vec<GroupCount>,
    /// Groups with any actions, largest first.
    pub by_total: Vec<GroupCount>,
    /// District pending.
    pub pending: i64,
    /// District total.
    pub total: i64,
    /// Whether any row of the district carried a group key.
    pub groups_available: bool,
}

/// Ordinary least-squares fit of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionModel {
    /// Change per period.
    pub slope: f64,
    /// Value at `x = 0`.
    pub intercept: f64,
    /// Coefficient of determination.
    pub r2: f64,
    /// Residual standard error.
    pub standard_error: f64,
    /// Mean of the x values.
    pub mean_x: f64,
    /// `Σ(x - mean_x)²`.
    pub sxx: f64,
    /// Number of points fitted.
    pub sample_size: usize,
}

/// A point prediction with its interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Predicted value, floored at 0.
    pub y_hat: f64,
    /// Lower bound, floored at 0.
    pub lower: f64,
    /// Upper bound, not floored.
    pub upper: f64,
}

/// A prediction for a future period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    /// The period, when the last key is a calendar month.
    pub period: Option<PeriodKey>,
    /// Display label.
    pub label: String,
    /// Series index the prediction was made at.
    pub index: usize,
    /// The prediction.
    pub prediction: Prediction,
}

/// One observed value of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// The period.
    pub period: PeriodKey,
    /// Observed value.
    pub value: i64,
}

/// Trend and projection of national pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateForecast {
    /// Observed national pending per period.
    pub history: Vec<SeriesPoint>,
    /// The fitted model.
    pub model: RegressionModel,
    /// Label of the model's slope.
    pub momentum: Momentum,
    /// Fitted value (floored at 0) for every history and horizon index.
    pub regression_line: Vec<f64>,
    /// Predictions for the periods after the last observed one.
    pub horizon: Vec<ForecastPoint>,
}

impl AggregateForecast {
    /// Prediction for the period right after the last observed one.
    #[must_use]
    pub fn next_period(&self) -> Option<&ForecastPoint> {
        self.horizon.first()
    }
}

/// Trend of one group over the trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMomentum {
    /// Group key.
    pub key: String,
    /// Group title.
    pub title: Option<String>,
    /// The fitted model.
    pub model: RegressionModel,
    /// Label of the slope.
    pub momentum: Momentum,
    /// Last observed pending.
    pub last_value: f64,
    /// Projected pending at the end of the horizon, floored at 0.
    pub projection: f64,
    /// `projection - last_value`.
    pub projected_delta: f64,
}

/// Trend of one district over the trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictMomentum {
    /// District key.
    pub key: String,
    /// The fitted model.
    pub model: RegressionModel,
    /// Label of the slope.
    pub momentum: Momentum,
}

/// Every forecast view over the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastReport {
    /// National series forecast, absent with too little history.
    pub aggregate: Option<AggregateForecast>,
    /// Periods the momentum rankings were computed over.
    pub window: Vec<PeriodKey>,
    /// Steepest rising groups.
    pub rising_groups: Vec<GroupMomentum>,
    /// Steepest declining groups, steepest first.
    pub declining_groups: Vec<GroupMomentum>,
    /// Fastest rising and declining districts, ascending by slope.
    pub districts: Vec<DistrictMomentum>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, current: i64, prior: i64, pct_delta: f64) -> MoverRow {
        MoverRow {
            key: key.to_string(),
            title: None,
            parent: None,
            current,
            prior,
            delta: current - prior,
            pct_delta,
        }
    }

    #[test]
    fn momentum_labels_round_trip() {
        assert_eq!(Momentum::RapidlyRising.to_string(), "Rapidly Rising");
        assert_eq!(
            "Rapidly Declining".parse::<Momentum>().unwrap(),
            Momentum::RapidlyDeclining
        );
        assert_eq!(
            serde_json::to_string(&Momentum::Stable).unwrap(),
            "\"Stable\""
        );
    }

    #[test]
    fn sort_rows_only_reorders() {
        let mut table = MoversTable {
            measure: Measure::Pending,
            metric: DeltaMetric::Absolute,
            rows: vec![row("B", 30, 10, 200.0), row("A", 15, 10, 50.0)],
            others: AggregateRow::default(),
            total: AggregateRow {
                count: 2,
                current: 45,
                prior: 20,
                delta: 25,
                pct_delta: 125.0,
            },
        };
        let total = table.total;

        table.sort_rows(SortColumn::Name, SortDirection::Ascending);
        assert_eq!(table.rows[0].key, "A");

        table.sort_rows(SortColumn::PctDelta, SortDirection::Descending);
        assert_eq!(table.rows[0].key, "B");
        assert_eq!(table.total, total);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn measure_parses_from_cli_text() {
        assert_eq!("total".parse::<Measure>().unwrap(), Measure::Total);
        assert_eq!(
            "percentage".parse::<DeltaMetric>().unwrap(),
            DeltaMetric::Percentage
        );
        assert_eq!(TrendMode::All.reference(), Measure::Pending);
    }
}
