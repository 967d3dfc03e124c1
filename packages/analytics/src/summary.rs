//! The single synchronous entry point comparing two periods.

use mdl_trends_analytics_models::Summary;
use mdl_trends_records_models::RawRecord;

use crate::aggregate::{PeriodAggregates, aggregate};
use crate::delta::{concentration, hhi, join, national_totals, top_n_share};
use crate::ranking::{mover_set, new_entities, removed_entities};

/// Districts counted in the top-share figure.
const TOP_SHARE_COUNT: usize = 5;

/// Compares the current period's records against the prior period's.
///
/// Never fails: an empty side behaves as a period with all-zero counts.
#[must_use]
pub fn compute_summary(current: &[RawRecord], prior: &[RawRecord]) -> Summary {
    compute_summary_from(&aggregate(current), &aggregate(prior))
}

/// [`compute_summary`] over already aggregated periods.
#[must_use]
pub fn compute_summary_from(current: &PeriodAggregates, prior: &PeriodAggregates) -> Summary {
    let districts = join(&current.districts, &prior.districts);
    let groups = join(&current.groups, &prior.groups);
    let hhi = hhi(&current.districts);

    Summary {
        national: national_totals(current, prior),
        hhi,
        concentration: concentration(hhi),
        top5_share: top_n_share(&current.districts, TOP_SHARE_COUNT),
        district_movers: mover_set(&districts),
        group_movers: mover_set(&groups),
        new_districts: new_entities(&current.districts, &prior.districts),
        removed_districts: removed_entities(&current.districts, &prior.districts),
        new_groups: new_entities(&current.groups, &prior.groups),
        removed_groups: removed_entities(&current.groups, &prior.groups),
        districts,
        groups,
    }
}

#[cfg(test)]
mod tests {
    use mdl_trends_analytics_models::{Concentration, DeltaMetric, EntityLevel, Measure};

    use super::*;

    fn record(entity: &str, group: Option<&str>, pending: i64, total: i64) -> RawRecord {
        RawRecord {
            entity_key: entity.to_string(),
            group_key: group.map(str::to_string),
            title: String::new(),
            judge: None,
            pending_count: pending,
            total_count: total,
        }
    }

    #[test]
    fn two_district_scenario() {
        let summary = compute_summary(
            &[record("A", None, 100, 150), record("B", None, 0, 50)],
            &[record("A", None, 80, 140)],
        );

        assert_eq!(summary.national.pending, 100);
        assert_eq!(summary.national.pending_delta, 20);
        assert_eq!(summary.new_districts.len(), 1);
        assert_eq!(summary.new_districts[0].key, "B");
        assert_eq!(summary.new_districts[0].pending, 0);
        assert!(summary.removed_districts.is_empty());

        let a = summary.district("A").unwrap();
        assert!((a.pending_pct_delta - 25.0).abs() < 1e-12);
        let b = summary.district("B").unwrap();
        assert!(b.pending_pct_delta.abs() < f64::EPSILON);
        assert!((b.total_pct_delta - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn national_pending_has_no_drift() {
        let current: Vec<RawRecord> = (0..50)
            .map(|i| record(&format!("D{}", i % 7), None, i * 3 + 1, i * 5))
            .collect();
        let summary = compute_summary(&current, &[]);
        let sum: i64 = summary.districts.iter().map(|d| d.pending).sum();
        assert_eq!(sum, summary.national.pending);
    }

    #[test]
    fn oversized_counts_saturate() {
        let summary = compute_summary(
            &[record("NJ", Some("MDL-1"), i64::MAX, 0), record("MN", None, 5, 5)],
            &[record("NJ", Some("MDL-1"), 3, 3)],
        );

        assert_eq!(summary.national.pending, i64::MAX);
        assert_eq!(summary.national.pending_delta, i64::MAX - 3);
        assert_eq!(summary.district("MN").unwrap().pending, 5);
        assert_eq!(summary.concentration, Concentration::High);

        let movers = summary
            .movers(EntityLevel::District)
            .get(Measure::Pending, DeltaMetric::Absolute);
        assert_eq!(movers.rows[0].key, "NJ");
        assert_eq!(movers.total.current, i64::MAX);
    }

    #[test]
    fn identical_periods_round_trip() {
        let records = vec![
            record("A", Some("MDL-1"), 10, 12),
            record("B", Some("MDL-2"), 4, 40),
        ];
        let summary = compute_summary(&records, &records);

        assert_eq!(summary.national.pending_delta, 0);
        assert!(summary.new_districts.is_empty());
        assert!(summary.removed_districts.is_empty());
        assert!(summary.new_groups.is_empty());
        assert!(summary.removed_groups.is_empty());
        for level in [EntityLevel::District, EntityLevel::Group] {
            for measure in [Measure::Pending, Measure::Total] {
                for metric in [DeltaMetric::Absolute, DeltaMetric::Percentage] {
                    assert!(summary.movers(level).get(measure, metric).is_empty());
                }
            }
        }
    }

    #[test]
    fn hhi_uses_current_shares_only() {
        let summary = compute_summary(
            &[record("A", None, 60, 60), record("B", None, 40, 40)],
            &[record("C", None, 1000, 1000)],
        );
        assert_eq!(summary.hhi, 5200);
        assert_eq!(summary.concentration, Concentration::High);
        assert!((summary.top5_share - 1.0).abs() < 1e-12);
    }

    #[test]
    fn removed_groups_keep_prior_title_and_district() {
        let mut prior = record("NJ", Some("MDL-9"), 7, 20);
        prior.title = "Hernia Mesh".to_string();
        let summary = compute_summary(&[], &[prior, record("MN", Some("MDL-9"), 1, 1)]);

        let removed = &summary.removed_groups[0];
        assert_eq!(removed.key, "MDL-9");
        assert_eq!(removed.title.as_deref(), Some("Hernia Mesh"));
        assert_eq!(removed.parent.as_deref(), Some("NJ"));
        assert_eq!(removed.pending, 8);
    }

    #[test]
    fn empty_inputs_degrade_to_zero() {
        let summary = compute_summary(&[], &[]);
        assert_eq!(summary.national.pending, 0);
        assert_eq!(summary.hhi, 0);
        assert_eq!(summary.concentration, Concentration::Low);
        assert!(summary.districts.is_empty());
    }
}
