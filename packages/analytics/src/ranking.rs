//! Top-N movers, leader tables and new/removed entity detection.

use std::collections::HashSet;

use mdl_trends_analytics_models::{
    Aggregate, Delta, DeltaMetric, EntityChange, LeaderRow, LeaderTable, LeaderTotals, Measure,
    MoverRow, MoverSet, MoversTable,
};

use crate::delta::summed_row;

/// Rows shown in a movers or leaders table.
pub const TOP_N: usize = 10;

/// Ranks entities by the selected positive change.
///
/// Entities with a strictly positive `(measure, metric)` value are
/// sorted descending (stable) and the first [`TOP_N`] become `rows`.
/// `others` sums every entity outside that set, whatever its change, and
/// `total` sums every entity.
#[must_use]
pub fn movers(deltas: &[Delta], measure: Measure, metric: DeltaMetric) -> MoversTable {
    let mut positive: Vec<&Delta> = deltas
        .iter()
        .filter(|d| d.ranking_value(measure, metric) > 0.0)
        .collect();
    positive.sort_by(|a, b| {
        b.ranking_value(measure, metric)
            .total_cmp(&a.ranking_value(measure, metric))
    });
    positive.truncate(TOP_N);

    let top_keys: HashSet<&str> = positive.iter().map(|d| d.key.as_str()).collect();

    let others = summed_row(
        deltas
            .iter()
            .filter(|d| !top_keys.contains(d.key.as_str()))
            .map(|d| (d.current(measure), d.prior(measure))),
    );
    let total = summed_row(
        deltas
            .iter()
            .map(|d| (d.current(measure), d.prior(measure))),
    );

    MoversTable {
        measure,
        metric,
        rows: positive
            .into_iter()
            .map(|d| MoverRow {
                key: d.key.clone(),
                title: d.title.clone(),
                parent: d.parent.clone(),
                current: d.current(measure),
                prior: d.prior(measure),
                delta: d.change(measure),
                pct_delta: d.pct_change(measure),
            })
            .collect(),
        others,
        total,
    }
}

/// All four movers tables of one level.
#[must_use]
pub fn mover_set(deltas: &[Delta]) -> MoverSet {
    MoverSet {
        pending_absolute: movers(deltas, Measure::Pending, DeltaMetric::Absolute),
        pending_percentage: movers(deltas, Measure::Pending, DeltaMetric::Percentage),
        total_absolute: movers(deltas, Measure::Total, DeltaMetric::Absolute),
        total_percentage: movers(deltas, Measure::Total, DeltaMetric::Percentage),
    }
}

/// Entities in `current` whose key is absent from `prior`, with their
/// current counts.
#[must_use]
pub fn new_entities(current: &[Aggregate], prior: &[Aggregate]) -> Vec<EntityChange> {
    difference(current, prior)
}

/// Entities in `prior` whose key is absent from `current`, with their
/// prior counts.
#[must_use]
pub fn removed_entities(current: &[Aggregate], prior: &[Aggregate]) -> Vec<EntityChange> {
    difference(prior, current)
}

fn difference(from: &[Aggregate], without: &[Aggregate]) -> Vec<EntityChange> {
    let excluded: HashSet<&str> = without.iter().map(|a| a.key.as_str()).collect();
    from.iter()
        .filter(|a| !excluded.contains(a.key.as_str()))
        .map(|a| EntityChange {
            key: a.key.clone(),
            title: a.title.clone(),
            parent: a.parent.clone(),
            pending: a.pending,
            total: a.total,
        })
        .collect()
}

/// Largest entities of the current period by `rank_by`, with the
/// remainder summed. Ties keep encounter order.
#[must_use]
pub fn leaders(current: &[Aggregate], rank_by: Measure, limit: usize) -> LeaderTable {
    let mut ranked: Vec<&Aggregate> = current.iter().collect();
    ranked.sort_by(|a, b| b.value(rank_by).cmp(&a.value(rank_by)));

    let total = leader_totals(ranked.iter().copied());
    let others = leader_totals(ranked.iter().skip(limit).copied());

    LeaderTable {
        rank_by,
        rows: ranked
            .into_iter()
            .take(limit)
            .map(|a| LeaderRow {
                key: a.key.clone(),
                title: a.title.clone(),
                parent: a.parent.clone(),
                pending: a.pending,
                terminated: a.terminated(),
                total: a.total,
                share: a.share,
            })
            .collect(),
        others,
        total,
    }
}

fn leader_totals<'a>(aggregates: impl Iterator<Item = &'a Aggregate>) -> LeaderTotals {
    aggregates.fold(LeaderTotals::default(), |acc, a| LeaderTotals {
        count: acc.count + 1,
        pending: acc.pending.saturating_add(a.pending),
        terminated: acc.terminated.saturating_add(a.terminated()),
        total: acc.total.saturating_add(a.total),
    })
}

#[cfg(test)]
mod tests {
    use mdl_trends_analytics_models::{SortColumn, SortDirection};

    use super::*;
    use crate::delta::join;

    fn agg(key: &str, pending: i64, total: i64) -> Aggregate {
        Aggregate {
            pending,
            total,
            ..Aggregate::empty(key)
        }
    }

    /// Twelve rising entities, one flat and one falling.
    fn deltas() -> Vec<Delta> {
        let mut current: Vec<Aggregate> = (1..=12)
            .map(|i| agg(&format!("E{i}"), 100 + i * 10, 200 + i))
            .collect();
        current.push(agg("FLAT", 50, 50));
        current.push(agg("DOWN", 10, 60));
        let mut prior: Vec<Aggregate> = (1..=12)
            .map(|i| agg(&format!("E{i}"), 100, 200))
            .collect();
        prior.push(agg("FLAT", 50, 50));
        prior.push(agg("DOWN", 30, 60));
        join(&current, &prior)
    }

    #[test]
    fn top_ten_positive_movers_descending() {
        let table = movers(&deltas(), Measure::Pending, DeltaMetric::Absolute);
        assert_eq!(table.rows.len(), TOP_N);
        assert_eq!(table.rows[0].key, "E12");
        assert_eq!(table.rows[9].key, "E3");
        assert!(table.rows.iter().all(|r| r.delta > 0));
    }

    #[test]
    fn others_include_non_positive_entities() {
        let table = movers(&deltas(), Measure::Pending, DeltaMetric::Absolute);
        // E1, E2, FLAT, DOWN
        assert_eq!(table.others.count, 4);
        assert_eq!(table.others.current, 110 + 120 + 50 + 10);
        assert_eq!(table.total.count, 14);
    }

    #[test]
    fn rows_and_others_reconcile_to_total() {
        let all = deltas();
        for measure in [Measure::Pending, Measure::Total] {
            for metric in [DeltaMetric::Absolute, DeltaMetric::Percentage] {
                let table = movers(&all, measure, metric);
                let current: i64 = table.rows.iter().map(|r| r.current).sum();
                let prior: i64 = table.rows.iter().map(|r| r.prior).sum();
                let delta: i64 = table.rows.iter().map(|r| r.delta).sum();
                assert_eq!(current + table.others.current, table.total.current);
                assert_eq!(prior + table.others.prior, table.total.prior);
                assert_eq!(delta + table.others.delta, table.total.delta);

                let everything: i64 = all.iter().map(|d| d.current(measure)).sum();
                assert_eq!(table.total.current, everything);
            }
        }
    }

    #[test]
    fn resort_keeps_membership_and_totals() {
        let mut table = movers(&deltas(), Measure::Pending, DeltaMetric::Absolute);
        let before = table.clone();
        table.sort_rows(SortColumn::Prior, SortDirection::Ascending);

        let mut keys: Vec<&str> = table.rows.iter().map(|r| r.key.as_str()).collect();
        let mut original: Vec<&str> = before.rows.iter().map(|r| r.key.as_str()).collect();
        keys.sort_unstable();
        original.sort_unstable();
        assert_eq!(keys, original);
        assert_eq!(table.others, before.others);
        assert_eq!(table.total, before.total);
    }

    #[test]
    fn identical_periods_have_no_movers() {
        let current = vec![agg("A", 5, 9), agg("B", 3, 3)];
        let set = mover_set(&join(&current, &current));
        assert!(set.get(Measure::Pending, DeltaMetric::Absolute).is_empty());
        assert!(set.get(Measure::Total, DeltaMetric::Percentage).is_empty());
    }

    #[test]
    fn new_and_removed_are_disjoint() {
        let current = vec![agg("A", 1, 1), agg("B", 0, 50)];
        let prior = vec![agg("A", 1, 1), agg("C", 7, 9)];

        let new = new_entities(&current, &prior);
        let removed = removed_entities(&current, &prior);

        assert_eq!(new.len(), 1);
        assert_eq!(new[0].key, "B");
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].key, "C");
        assert_eq!(removed[0].pending, 7);
        assert!(new.iter().all(|n| removed.iter().all(|r| r.key != n.key)));
    }

    #[test]
    fn leaders_rank_by_current_size() {
        let current: Vec<Aggregate> = (1..=14)
            .map(|i| agg(&format!("E{i}"), i * 10, i * 10 + 5))
            .collect();
        let table = leaders(&current, Measure::Pending, 3);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].key, "E14");
        assert_eq!(table.rows[0].terminated, 5);
        assert_eq!(table.others.count, 11);
        assert_eq!(
            table.rows.iter().map(|r| r.pending).sum::<i64>() + table.others.pending,
            table.total.pending
        );
    }
}
