//! Current-vs-prior joins, national totals and concentration.

use std::collections::{HashMap, HashSet};

use mdl_trends_analytics_models::{Aggregate, AggregateRow, Concentration, Delta, NationalTotals};

use crate::aggregate::PeriodAggregates;

/// Percentage change from `prior` to `current`.
///
/// When `prior` is 0 the result is 100 if `current` is positive and 0
/// otherwise. This is a display convention, not a real percentage.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pct_change(current: i64, prior: i64) -> f64 {
    if prior == 0 {
        if current > 0 { 100.0 } else { 0.0 }
    } else {
        (current as f64 - prior as f64) / prior as f64 * 100.0
    }
}

/// Percentage change of summed table rows: `delta / prior * 100`, or 0
/// when `prior` is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summed_pct_change(delta: i64, prior: i64) -> f64 {
    if prior == 0 {
        0.0
    } else {
        delta as f64 / prior as f64 * 100.0
    }
}

/// Builds the "All Others"/"Total" row from `(current, prior)` pairs.
#[must_use]
pub fn summed_row(values: impl IntoIterator<Item = (i64, i64)>) -> AggregateRow {
    let (count, current, prior) = values
        .into_iter()
        .fold((0_usize, 0_i64, 0_i64), |(n, c, p), (current, prior)| {
            (n + 1, c.saturating_add(current), p.saturating_add(prior))
        });
    let delta = current.saturating_sub(prior);
    AggregateRow {
        count,
        current,
        prior,
        delta,
        pct_delta: summed_pct_change(delta, prior),
    }
}

/// Joins current and prior aggregates into one [`Delta`] per key.
///
/// Keys present on only one side get a zero aggregate for the other.
/// Output order is current encounter order followed by prior-only keys in
/// prior encounter order.
#[must_use]
pub fn join(current: &[Aggregate], prior: &[Aggregate]) -> Vec<Delta> {
    let prior_by_key: HashMap<&str, &Aggregate> =
        prior.iter().map(|a| (a.key.as_str(), a)).collect();
    let current_keys: HashSet<&str> = current.iter().map(|a| a.key.as_str()).collect();

    let mut deltas = Vec::with_capacity(current.len() + prior.len());

    for now in current {
        let before = prior_by_key.get(now.key.as_str()).copied();
        deltas.push(build_delta(Some(now), before));
    }
    for before in prior {
        if !current_keys.contains(before.key.as_str()) {
            deltas.push(build_delta(None, Some(before)));
        }
    }

    deltas
}

fn build_delta(current: Option<&Aggregate>, prior: Option<&Aggregate>) -> Delta {
    let named = current.or(prior);
    let (pending, total, share) = current.map_or((0, 0, 0.0), |a| (a.pending, a.total, a.share));
    let (prior_pending, prior_total) = prior.map_or((0, 0), |a| (a.pending, a.total));

    Delta {
        key: named.map(|a| a.key.clone()).unwrap_or_default(),
        title: named.and_then(|a| a.title.clone()),
        parent: named.and_then(|a| a.parent.clone()),
        pending,
        total,
        prior_pending,
        prior_total,
        pending_delta: pending.saturating_sub(prior_pending),
        pending_pct_delta: pct_change(pending, prior_pending),
        total_delta: total.saturating_sub(prior_total),
        total_pct_delta: pct_change(total, prior_total),
        share,
    }
}

/// Period-wide totals, summed from the raw records of each side.
#[must_use]
pub fn national_totals(current: &PeriodAggregates, prior: &PeriodAggregates) -> NationalTotals {
    NationalTotals {
        pending: current.pending,
        prior_pending: prior.pending,
        pending_delta: current.pending.saturating_sub(prior.pending),
        pending_pct_delta: pct_change(current.pending, prior.pending),
        total: current.total,
        prior_total: prior.total,
        total_delta: current.total.saturating_sub(prior.total),
        total_pct_delta: pct_change(current.total, prior.total),
    }
}

/// Herfindahl–Hirschman index: `round(Σ (share * 100)²)` over entities
/// with a positive share.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn hhi(aggregates: &[Aggregate]) -> i64 {
    let sum: f64 = aggregates
        .iter()
        .filter(|a| a.share > 0.0)
        .map(|a| (a.share * 100.0).powi(2))
        .sum();
    sum.round() as i64
}

/// Label of an HHI value.
#[must_use]
pub const fn concentration(hhi: i64) -> Concentration {
    if hhi < 1000 {
        Concentration::Low
    } else if hhi <= 1800 {
        Concentration::Moderate
    } else {
        Concentration::High
    }
}

/// Combined share of the `n` largest entities by pending. Ties keep
/// encounter order.
#[must_use]
pub fn top_n_share(aggregates: &[Aggregate], n: usize) -> f64 {
    let mut by_pending: Vec<&Aggregate> = aggregates.iter().collect();
    by_pending.sort_by(|a, b| b.pending.cmp(&a.pending));
    by_pending.iter().take(n).map(|a| a.share).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agg(key: &str, pending: i64, total: i64, share: f64) -> Aggregate {
        Aggregate {
            pending,
            total,
            share,
            ..Aggregate::empty(key)
        }
    }

    #[test]
    fn pct_change_zero_convention() {
        assert!((pct_change(0, 0)).abs() < f64::EPSILON);
        assert!((pct_change(5, 0) - 100.0).abs() < f64::EPSILON);
        assert!((pct_change(100, 80) - 25.0).abs() < 1e-12);
        assert!((pct_change(0, 40) + 100.0).abs() < 1e-12);
    }

    #[test]
    fn join_covers_union_of_keys() {
        let deltas = join(
            &[agg("A", 100, 150, 1.0), agg("B", 0, 50, 0.0)],
            &[agg("C", 4, 4, 0.5), agg("A", 80, 140, 0.5)],
        );
        let keys: Vec<&str> = deltas.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "C"]);

        let a = &deltas[0];
        assert_eq!(a.pending_delta, 20);
        assert!((a.pending_pct_delta - 25.0).abs() < 1e-12);
        assert_eq!(a.total_delta, 10);

        let c = &deltas[2];
        assert_eq!(c.pending, 0);
        assert_eq!(c.prior_pending, 4);
        assert_eq!(c.pending_delta, -4);
        assert!((c.pending_pct_delta + 100.0).abs() < 1e-12);
        assert!(c.share.abs() < f64::EPSILON);
    }

    #[test]
    fn measures_use_independent_zero_handling() {
        let deltas = join(&[agg("A", 0, 10, 0.0)], &[agg("A", 0, 0, 0.0)]);
        assert!(deltas[0].pending_pct_delta.abs() < f64::EPSILON);
        assert!((deltas[0].total_pct_delta - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn hhi_of_sixty_forty_is_high() {
        let value = hhi(&[agg("A", 60, 60, 0.6), agg("B", 40, 40, 0.4)]);
        assert_eq!(value, 5200);
        assert_eq!(concentration(value), Concentration::High);
    }

    #[test]
    fn concentration_boundaries() {
        assert_eq!(concentration(999), Concentration::Low);
        assert_eq!(concentration(1000), Concentration::Moderate);
        assert_eq!(concentration(1800), Concentration::Moderate);
        assert_eq!(concentration(1801), Concentration::High);
    }

    #[test]
    fn top_share_takes_largest_five() {
        let aggregates: Vec<Aggregate> = [1, 2, 3, 4, 5, 6, 7]
            .into_iter()
            .zip([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0])
            .map(|(i, weight)| agg(&i.to_string(), i, i, weight / 28.0))
            .collect();
        let share = top_n_share(&aggregates, 5);
        assert!((share - 25.0 / 28.0).abs() < 1e-12);
    }

    #[test]
    fn summed_row_uses_plain_percentage() {
        let row = summed_row([(10, 0), (5, 5)]);
        assert_eq!(row.count, 2);
        assert_eq!(row.delta, 10);
        assert!((row.pct_delta - 200.0).abs() < 1e-12);
        assert!(summed_row([(3, 0)]).pct_delta.abs() < f64::EPSILON);
    }
}
