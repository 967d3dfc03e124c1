//! Per-period aggregation of raw records by district and by case group.

use std::collections::HashMap;

use mdl_trends_analytics_models::Aggregate;
use mdl_trends_records_models::RawRecord;

/// District and group aggregates of one period, in encounter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodAggregates {
    /// One aggregate per distinct entity key.
    pub districts: Vec<Aggregate>,
    /// One aggregate per distinct group key. Rows without a group only
    /// count toward their district.
    pub groups: Vec<Aggregate>,
    /// Summed pending over every record.
    pub pending: i64,
    /// Summed total over every record.
    pub total: i64,
}

impl PeriodAggregates {
    /// Returns `true` if the period had no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }
}

/// Aggregates keyed by entity, preserving first-seen order.
#[derive(Default)]
struct OrderedAggregates {
    items: Vec<Aggregate>,
    index: HashMap<String, usize>,
}

impl OrderedAggregates {
    fn entry(&mut self, key: &str, init: impl FnOnce() -> Aggregate) -> &mut Aggregate {
        let idx = if let Some(&idx) = self.index.get(key) {
            idx
        } else {
            self.items.push(init());
            self.index.insert(key.to_string(), self.items.len() - 1);
            self.items.len() - 1
        };
        &mut self.items[idx]
    }

    fn into_items(self, period_pending: i64) -> Vec<Aggregate> {
        let mut items = self.items;
        for item in &mut items {
            item.share = share_of(item.pending, period_pending);
        }
        items
    }
}

/// Folds a period's records into district and group aggregates.
///
/// A group takes its title and owning district from the first row it
/// appears in. Sums saturate instead of overflowing.
#[must_use]
pub fn aggregate(records: &[RawRecord]) -> PeriodAggregates {
    let mut districts = OrderedAggregates::default();
    let mut groups = OrderedAggregates::default();
    let mut pending = 0_i64;
    let mut total = 0_i64;

    for record in records {
        pending = pending.saturating_add(record.pending_count);
        total = total.saturating_add(record.total_count);

        let district = districts.entry(&record.entity_key, || {
            Aggregate::empty(record.entity_key.as_str())
        });
        district.pending = district.pending.saturating_add(record.pending_count);
        district.total = district.total.saturating_add(record.total_count);

        if let Some(group_key) = record.group_key.as_deref().filter(|k| !k.is_empty()) {
            let group = groups.entry(group_key, || Aggregate {
                title: Some(record.title.clone()),
                parent: Some(record.entity_key.clone()),
                ..Aggregate::empty(group_key)
            });
            group.pending = group.pending.saturating_add(record.pending_count);
            group.total = group.total.saturating_add(record.total_count);
        }
    }

    PeriodAggregates {
        districts: districts.into_items(pending),
        groups: groups.into_items(pending),
        pending,
        total,
    }
}

/// Sum of `values`, saturating at the `i64` bounds.
#[must_use]
pub fn saturating_sum(values: impl IntoIterator<Item = i64>) -> i64 {
    values.into_iter().fold(0, i64::saturating_add)
}

/// `part / whole`, or 0 when `whole` is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn share_of(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
