//! Attribution of a period-over-period pending change to districts and
//! groups.

use std::collections::HashMap;

use mdl_trends_analytics_models::{Driver, DriverBreakdown, DriverTable, MomDrivers};
use mdl_trends_records_models::{PeriodKey, RawRecord};

use crate::aggregate::saturating_sum;

#[derive(Default)]
struct Contribution {
    title: Option<String>,
    end: i64,
    start: i64,
}

#[derive(Default)]
struct Contributions {
    order: Vec<String>,
    by_key: HashMap<String, Contribution>,
}

impl Contributions {
    fn add(&mut self, key: &str, title: Option<&str>, end: i64, start: i64) {
        let entry = self.by_key.entry(key.to_string()).or_insert_with(|| {
            self.order.push(key.to_string());
            Contribution {
                title: title.map(str::to_string),
                ..Contribution::default()
            }
        });
        entry.end = entry.end.saturating_add(end);
        entry.start = entry.start.saturating_add(start);
    }

    fn into_table(mut self) -> (i64, DriverTable) {
        let mut items: Vec<Driver> = self
            .order
            .iter()
            .filter_map(|key| {
                let c = self.by_key.remove(key)?;
                Some(Driver {
                    key: key.clone(),
                    title: c.title,
                    delta: c.end.saturating_sub(c.start),
                    pct_of_movement: 0.0,
                })
            })
            .collect();

        let net = saturating_sum(items.iter().map(|d| d.delta));
        let gross = match saturating_sum(items.iter().map(|d| d.delta.saturating_abs())) {
            0 => 1,
            gross => gross,
        };

        for item in &mut items {
            item.pct_of_movement = pct_of(item.delta, gross);
        }
        items.sort_by_key(|d| std::cmp::Reverse(d.delta.abs()));

        (
            net,
            DriverTable {
                gross_movement: gross,
                items,
            },
        )
    }
}

#[allow(clippy::cast_precision_loss)]
fn pct_of(delta: i64, gross: i64) -> f64 {
    delta as f64 / gross as f64 * 100.0
}

/// Pending change per district and per group between `start` and `end`.
///
/// Keys from both periods are included. Each item's percentage is its
/// change over the level's gross movement (`Σ|delta|`, at least 1).
/// Returns `None` when both periods are the same.
#[must_use]
pub fn compute_mom_drivers(
    start: (&PeriodKey, &[RawRecord]),
    end: (&PeriodKey, &[RawRecord]),
) -> Option<MomDrivers> {
    if start.0 == end.0 {
        return None;
    }

    let mut districts = Contributions::default();
    let mut groups = Contributions::default();

    for (records, is_end) in [(end.1, true), (start.1, false)] {
        for record in records {
            let (e, s) = if is_end {
                (record.pending_count, 0)
            } else {
                (0, record.pending_count)
            };
            districts.add(&record.entity_key, None, e, s);
            if let Some(group) = record.group_key.as_deref().filter(|g| !g.is_empty()) {
                groups.add(group, Some(&record.title), e, s);
            }
        }
    }

    let (net_change, districts) = districts.into_table();
    let (_, groups) = groups.into_table();

    Some(MomDrivers {
        start: start.0.clone(),
        end: end.0.clone(),
        net_change,
        districts,
        groups,
    })
}

/// The `n` largest contributors of `table` with the rest summed, against
/// the overall `net_change`.
#[must_use]
pub fn breakdown(table: &DriverTable, n: usize, net_change: i64) -> DriverBreakdown {
    let rest = table.items.iter().skip(n);
    let others_delta = saturating_sum(rest.clone().map(|d| d.delta));

    DriverBreakdown {
        top: table.items.iter().take(n).cloned().collect(),
        others_count: rest.count(),
        others_delta,
        others_pct: pct_of(others_delta, table.gross_movement),
        net_change,
        net_pct: pct_of(net_change, table.gross_movement),
    }
}
