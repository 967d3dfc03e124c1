//! Headline views derived from a summary or from raw period records.

use std::collections::{BTreeSet, HashMap};

use mdl_trends_analytics_models::{
    ActiveGroup, Delta, DistrictBreakdown, DominantGroup, ExecutiveSummary, GroupCount, Grower,
    Highlight, JudgeActivity, Measure, MoversTable, Summary, TrendMode, TrendPoint,
    TrendsOverview,
};
use mdl_trends_records_models::{PeriodKey, RawRecord};

use crate::aggregate::{aggregate, saturating_sum, share_of};

/// Judge name used when a row reports none.
pub const UNKNOWN_JUDGE: &str = "Unknown";

/// Smallest total a group needs to be ranked by activity.
const MIN_ACTIVE_TOTAL: i64 = 50;

/// Groups listed by [`most_active_groups`].
const MOST_ACTIVE_LEN: usize = 10;

/// Percentage of a period above which a group is dominant.
const DOMINANT_PCT: f64 = 20.0;

/// Periods in the trailing moving average.
const MOVING_AVERAGE_LEN: usize = 3;

/// Headline figures of a summary.
#[must_use]
pub fn executive_summary(summary: &Summary) -> ExecutiveSummary {
    let national = summary.national.pending;

    ExecutiveSummary {
        national_pending: national,
        national_total: summary.national.total,
        national_delta: summary.national.pending_delta,
        national_pct_delta: summary.national.pending_pct_delta,
        active_groups: summary.groups.iter().filter(|d| d.pending > 0).count(),
        active_districts: summary.districts.iter().filter(|d| d.pending > 0).count(),
        top5_share: summary.top5_share,
        hhi: summary.hhi,
        concentration: summary.concentration,
        top_district: largest(&summary.districts, national),
        top_group: largest(&summary.groups, national),
        fastest_growing_district: fastest(&summary.district_movers.pending_absolute),
        fastest_growing_group: fastest(&summary.group_movers.pending_absolute),
        new_group_count: summary.new_groups.len(),
        removed_group_count: summary.removed_groups.len(),
    }
}

fn largest(deltas: &[Delta], national: i64) -> Option<Highlight> {
    let mut top: Option<&Delta> = None;
    for delta in deltas {
        if top.is_none_or(|t| delta.pending > t.pending) {
            top = Some(delta);
        }
    }
    top.map(|d| Highlight {
        key: d.key.clone(),
        title: d.title.clone(),
        parent: d.parent.clone(),
        pending: d.pending,
        share_pct: share_of(d.pending, national) * 100.0,
    })
}

fn fastest(movers: &MoversTable) -> Option<Grower> {
    movers.rows.first().map(|row| Grower {
        key: row.key.clone(),
        title: row.title.clone(),
        parent: row.parent.clone(),
        pending_delta: row.delta,
        pending_pct_delta: row.pct_delta,
    })
}

fn judge_of(record: &RawRecord) -> &str {
    record
        .judge
        .as_deref()
        .filter(|j| !j.is_empty())
        .unwrap_or(UNKNOWN_JUDGE)
}

fn group_of(record: &RawRecord) -> &str {
    record.group_key.as_deref().unwrap_or_default()
}

/// Group counts per judge.
///
/// `active` counts distinct groups with pending actions in `end`;
/// `total` counts distinct groups assigned to the judge in any period of
/// `history`. Judges are listed most active first.
#[must_use]
pub fn judge_activity<R: AsRef<[RawRecord]>>(
    end: &[RawRecord],
    history: &[(PeriodKey, R)],
) -> Vec<JudgeActivity> {
    let mut active_groups: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    let mut districts: HashMap<&str, Vec<(&str, usize)>> = HashMap::new();

    for record in end {
        let judge = judge_of(record);
        let counts = districts.entry(judge).or_default();
        match counts.iter_mut().find(|(d, _)| *d == record.entity_key) {
            Some((_, n)) => *n += 1,
            None => counts.push((record.entity_key.as_str(), 1)),
        }
        if record.pending_count > 0 {
            active_groups
                .entry(judge)
                .or_default()
                .insert(group_of(record));
        }
    }

    let mut judges: Vec<&str> = Vec::new();
    let mut assigned: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for (_, records) in history {
        for record in records.as_ref() {
            let judge = judge_of(record);
            assigned
                .entry(judge)
                .or_insert_with(|| {
                    judges.push(judge);
                    BTreeSet::new()
                })
                .insert(group_of(record));
        }
    }

    let mut rows: Vec<JudgeActivity> = judges
        .into_iter()
        .map(|judge| {
            let total = assigned.get(judge).map_or(0, BTreeSet::len);
            let active = active_groups.get(judge).map_or(0, BTreeSet::len);
            let district = districts
                .get(judge)
                .and_then(|counts| {
                    let mut best: Option<(&str, usize)> = None;
                    for &(d, n) in counts {
                        if best.is_none_or(|(_, m)| n > m) {
                            best = Some((d, n));
                        }
                    }
                    best
                })
                .map(|(d, _)| d.to_string())
                .unwrap_or_default();
            JudgeActivity {
                judge: judge.to_string(),
                district,
                active,
                not_active: total.saturating_sub(active),
                total,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.active.cmp(&a.active));
    rows
}

/// Rows with at least 50 total and some pending actions, ranked by
/// `pending / total`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn most_active_groups(end: &[RawRecord]) -> Vec<ActiveGroup> {
    let mut rows: Vec<ActiveGroup> = end
        .iter()
        .filter(|r| r.total_count >= MIN_ACTIVE_TOTAL && r.pending_count > 0)
        .map(|r| ActiveGroup {
            key: group_of(r).to_string(),
            title: r.title.clone(),
            district: r.entity_key.clone(),
            pending: r.pending_count,
            total: r.total_count,
            ratio: r.pending_count as f64 / r.total_count as f64,
        })
        .collect();
    rows.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
    rows.truncate(MOST_ACTIVE_LEN);
    rows
}

/// Totals, dominant groups and a moving average for every period.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn trends_overview<R: AsRef<[RawRecord]>>(
    history: &[(PeriodKey, R)],
    mode: TrendMode,
) -> TrendsOverview {
    let reference = mode.reference();

    let mut points: Vec<TrendPoint> = history
        .iter()
        .map(|(period, records)| {
            let aggregates = aggregate(records.as_ref());
            let reference_total = match reference {
                Measure::Pending => aggregates.pending,
                Measure::Total => aggregates.total,
            };

            let mut dominant: Vec<DominantGroup> = if reference_total == 0 {
                Vec::new()
            } else {
                aggregates
                    .groups
                    .iter()
                    .filter_map(|g| {
                        let value = g.value(reference);
                        let percentage = share_of(value, reference_total) * 100.0;
                        (percentage > DOMINANT_PCT).then(|| DominantGroup {
                            key: g.key.clone(),
                            title: g.title.clone(),
                            value,
                            percentage,
                        })
                    })
                    .collect()
            };
            dominant.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));

            TrendPoint {
                period: period.clone(),
                label: period.label(),
                pending: aggregates.pending,
                total: aggregates.total,
                terminated: aggregates.total - aggregates.pending,
                dominant,
                moving_average: None,
            }
        })
        .collect();

    let values: Vec<i64> = points
        .iter()
        .map(|p| match reference {
            Measure::Pending => p.pending,
            Measure::Total => p.total,
        })
        .collect();
    for (i, point) in points.iter_mut().enumerate() {
        if i + 1 >= MOVING_AVERAGE_LEN {
            let sum = saturating_sum(values[i + 1 - MOVING_AVERAGE_LEN..=i].iter().copied());
            point.moving_average = Some(sum as f64 / MOVING_AVERAGE_LEN as f64);
        }
    }

    TrendsOverview { mode, points }
}

/// Groups of `district` in one period's records.
#[must_use]
pub fn district_breakdown(records: &[RawRecord], district: &str) -> DistrictBreakdown {
    let rows: Vec<&RawRecord> = records
        .iter()
        .filter(|r| r.entity_key == district)
        .collect();
    let groups_available = rows
        .iter()
        .any(|r| r.group_key.as_deref().is_some_and(|g| !g.is_empty()));

    let listed = |count: fn(&RawRecord) -> i64| {
        let mut list: Vec<GroupCount> = if groups_available {
            rows.iter()
                .filter(|r| count(r) > 0)
                .map(|r| GroupCount {
                    key: group_of(r).to_string(),
                    title: r.title.clone(),
                    count: count(r),
                })
                .collect()
        } else {
            Vec::new()
        };
        list.sort_by(|a, b| b.count.cmp(&a.count));
        list
    };

    DistrictBreakdown {
        district: district.to_string(),
        by_pending: listed(|r| r.pending_count),
        by_total: listed(|r| r.total_count),
        pending: saturating_sum(rows.iter().map(|r| r.pending_count)),
        total: saturating_sum(rows.iter().map(|r| r.total_count)),
        groups_available,
    }
}
