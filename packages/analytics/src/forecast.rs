//! Linear trend fitting, prediction intervals and momentum rankings.

use std::collections::HashMap;

use mdl_trends_analytics_models::{
    AggregateForecast, DistrictMomentum, ForecastPoint, ForecastReport, GroupMomentum, Momentum,
    Prediction, RegressionModel, SeriesPoint,
};
use mdl_trends_records_models::{PeriodKey, RawRecord};

use crate::AnalyticsError;
use crate::aggregate::saturating_sum;

/// Fewest points a regression is defined for.
pub const MIN_POINTS: usize = 3;

/// z-score of a two-sided 95% interval.
pub const DEFAULT_Z: f64 = 1.96;

/// Rising and declining groups listed in a forecast report.
const GROUP_RANKING_LEN: usize = 10;

/// Rising and declining districts listed in a forecast report.
const DISTRICT_RANKING_LEN: usize = 8;

/// Tuning of forecasts and momentum eligibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumOptions {
    /// Periods projected past the last observed one.
    pub horizon: usize,
    /// Trailing periods momentum is computed over.
    pub window: usize,
    /// z-score of prediction intervals.
    pub z_score: f64,
    /// Observations a series needs within the window.
    pub min_observations: usize,
    /// Smallest last observed value a group needs.
    pub min_last_value: f64,
}

impl Default for MomentumOptions {
    fn default() -> Self {
        Self {
            horizon: 6,
            window: 12,
            z_score: DEFAULT_Z,
            min_observations: 6,
            min_last_value: 10.0,
        }
    }
}

/// Ordinary least-squares fit of `(x, y)` points.
///
/// The slope is 0 when the x values have (numerically) no variance. R² is
/// 1 when the y values have a total sum of squares below 1.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] for fewer than
/// [`MIN_POINTS`] points.
#[allow(clippy::cast_precision_loss)]
pub fn fit_linear_trend(points: &[(usize, f64)]) -> Result<RegressionModel, AnalyticsError> {
    let n = points.len();
    if n < MIN_POINTS {
        return Err(AnalyticsError::InsufficientData {
            points: n,
            required: MIN_POINTS,
        });
    }

    let count = n as f64;
    let mean_x = points.iter().map(|&(x, _)| x as f64).sum::<f64>() / count;
    let mean_y = points.iter().map(|&(_, y)| y).sum::<f64>() / count;

    let sxx: f64 = points.iter().map(|&(x, _)| (x as f64 - mean_x).powi(2)).sum();
    let sxy: f64 = points
        .iter()
        .map(|&(x, y)| (x as f64 - mean_x) * (y - mean_y))
        .sum();

    let slope = if sxx < 1e-9 { 0.0 } else { sxy / sxx };
    let intercept = slope.mul_add(-mean_x, mean_y);

    let ss_res: f64 = points
        .iter()
        .map(|&(x, y)| (y - slope.mul_add(x as f64, intercept)).powi(2))
        .sum();
    let ss_tot: f64 = points.iter().map(|&(_, y)| (y - mean_y).powi(2)).sum();

    let r2 = if ss_tot < 1.0 {
        1.0
    } else {
        (1.0 - ss_res / ss_tot).max(0.0)
    };

    Ok(RegressionModel {
        slope,
        intercept,
        r2,
        standard_error: (ss_res / (count - 2.0)).sqrt(),
        mean_x,
        sxx,
        sample_size: n,
    })
}

/// Prediction at `x` with a `z`-wide interval.
///
/// The margin is `z * se * sqrt(1 + 1/n + (x - mean_x)² / Sxx)`, with
/// `Sxx` replaced by 1 when it is 0. The prediction and lower bound are
/// floored at 0; the upper bound is taken from the unfloored prediction.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn predict_with_interval(model: &RegressionModel, x: f64, z: f64) -> Prediction {
    let y_hat = model.slope.mul_add(x, model.intercept);
    let sxx = if model.sxx == 0.0 { 1.0 } else { model.sxx };
    let leverage = 1.0 + 1.0 / model.sample_size as f64 + (x - model.mean_x).powi(2) / sxx;
    let margin = z * model.standard_error * leverage.sqrt();

    Prediction {
        y_hat: y_hat.max(0.0),
        lower: (y_hat - margin).max(0.0),
        upper: y_hat + margin,
    }
}

/// Label of a slope.
#[must_use]
pub fn classify_momentum(slope: f64) -> Momentum {
    if slope > 150.0 {
        Momentum::RapidlyRising
    } else if slope > 30.0 {
        Momentum::Rising
    } else if slope > -30.0 {
        Momentum::Stable
    } else if slope > -150.0 {
        Momentum::Declining
    } else {
        Momentum::RapidlyDeclining
    }
}

/// Fits national pending over every period and projects it forward.
///
/// Returns `None` when there are fewer than [`MIN_POINTS`] periods.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn forecast_aggregate<R: AsRef<[RawRecord]>>(
    history: &[(PeriodKey, R)],
    options: &MomentumOptions,
) -> Option<AggregateForecast> {
    let series: Vec<SeriesPoint> = history
        .iter()
        .map(|(period, records)| SeriesPoint {
            period: period.clone(),
            value: saturating_sum(records.as_ref().iter().map(|r| r.pending_count)),
        })
        .collect();

    let points: Vec<(usize, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, p)| (i, p.value as f64))
        .collect();

    let model = match fit_linear_trend(&points) {
        Ok(model) => model,
        Err(e) => {
            log::debug!("Omitting aggregate forecast: {e}");
            return None;
        }
    };

    let history_len = series.len();
    let last_period = series.last().map(|p| p.period.clone());

    let regression_line = (0..history_len + options.horizon)
        .map(|i| predict_with_interval(&model, i as f64, options.z_score).y_hat)
        .collect();

    let horizon = (0..options.horizon)
        .map(|step| {
            let index = history_len + step;
            let ahead = i32::try_from(step + 1).unwrap_or(i32::MAX);
            let period = last_period.as_ref().and_then(|p| p.shift_months(ahead));
            let label = period
                .as_ref()
                .map_or_else(|| format!("+{}", step + 1), PeriodKey::label);
            ForecastPoint {
                period,
                label,
                index,
                prediction: predict_with_interval(&model, index as f64, options.z_score),
            }
        })
        .collect();

    Some(AggregateForecast {
        history: series,
        momentum: classify_momentum(model.slope),
        model,
        regression_line,
        horizon,
    })
}

/// Per-group momentum over `window`, steepest rising first.
///
/// A group's value in a period is the sum of its rows there, or absent
/// when it has none. Groups with fewer than `min_observations` values or
/// a last value below `min_last_value` are left out.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn group_momentum<R: AsRef<[RawRecord]>>(
    window: &[(PeriodKey, R)],
    options: &MomentumOptions,
) -> Vec<GroupMomentum> {
    let mut order: Vec<(String, Option<String>)> = Vec::new();
    let mut series: HashMap<String, Vec<Option<f64>>> = HashMap::new();

    for (i, (_, records)) in window.iter().enumerate() {
        for record in records.as_ref() {
            let Some(key) = record.group_key.as_deref().filter(|k| !k.is_empty()) else {
                continue;
            };
            let values = series.entry(key.to_string()).or_insert_with(|| {
                order.push((key.to_string(), Some(record.title.clone())));
                vec![None; window.len()]
            });
            *values[i].get_or_insert(0.0) += record.pending_count as f64;
        }
    }

    // Measured from the periods actually in the window, so a history
    // shorter than `options.window` still projects `horizon` periods past
    // its last index. Equals `window + horizon` once the history is full.
    let projection_x = (window.len() + options.horizon) as f64;

    let mut ranked: Vec<GroupMomentum> = order
        .into_iter()
        .filter_map(|(key, title)| {
            let values = series.get(&key)?;
            let points: Vec<(usize, f64)> = values
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.map(|v| (i, v)))
                .collect();
            if points.len() < options.min_observations {
                log::debug!(
                    "Omitting group {key}: {} of {} observations",
                    points.len(),
                    options.min_observations
                );
                return None;
            }
            let model = fit_linear_trend(&points).ok()?;
            let last_value = points.last().map_or(0.0, |&(_, v)| v);
            if last_value < options.min_last_value {
                return None;
            }
            let projection = model.slope.mul_add(projection_x, model.intercept).max(0.0);
            Some(GroupMomentum {
                key,
                title,
                momentum: classify_momentum(model.slope),
                model,
                last_value,
                projection,
                projected_delta: projection - last_value,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.model.slope.total_cmp(&a.model.slope));
    ranked
}

/// Per-district momentum over `window`, steepest rising first.
///
/// Only periods where the district's summed pending is positive are
/// fitted.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn district_momentum<R: AsRef<[RawRecord]>>(
    window: &[(PeriodKey, R)],
    options: &MomentumOptions,
) -> Vec<DistrictMomentum> {
    let mut order: Vec<String> = Vec::new();
    let mut series: HashMap<String, Vec<i64>> = HashMap::new();

    for (i, (_, records)) in window.iter().enumerate() {
        for record in records.as_ref() {
            if record.entity_key.is_empty() {
                continue;
            }
            let values = series.entry(record.entity_key.clone()).or_insert_with(|| {
                order.push(record.entity_key.clone());
                vec![0; window.len()]
            });
            values[i] = values[i].saturating_add(record.pending_count);
        }
    }

    let mut ranked: Vec<DistrictMomentum> = order
        .into_iter()
        .filter_map(|key| {
            let points: Vec<(usize, f64)> = series
                .get(&key)?
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v > 0)
                .map(|(i, &v)| (i, v as f64))
                .collect();
            if points.len() < options.min_observations {
                return None;
            }
            let model = fit_linear_trend(&points).ok()?;
            Some(DistrictMomentum {
                key,
                momentum: classify_momentum(model.slope),
                model,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.model.slope.total_cmp(&a.model.slope));
    ranked
}

/// Builds every forecast view from the full period history.
#[must_use]
pub fn forecast_report<R: AsRef<[RawRecord]>>(
    history: &[(PeriodKey, R)],
    options: &MomentumOptions,
) -> ForecastReport {
    let window = &history[history.len().saturating_sub(options.window)..];

    let groups = group_momentum(window, options);
    let rising_groups: Vec<GroupMomentum> =
        groups.iter().take(GROUP_RANKING_LEN).cloned().collect();
    let declining_groups: Vec<GroupMomentum> =
        groups.iter().rev().take(GROUP_RANKING_LEN).cloned().collect();

    let districts = district_momentum(window, options);
    let rising: Vec<&DistrictMomentum> = districts.iter().take(DISTRICT_RANKING_LEN).collect();
    let mut shown: Vec<DistrictMomentum> = districts
        .iter()
        .rev()
        .take(DISTRICT_RANKING_LEN)
        .filter(|d| !rising.iter().any(|r| r.key == d.key))
        .chain(rising.iter().copied())
        .cloned()
        .collect();
    shown.sort_by(|a, b| a.model.slope.total_cmp(&b.model.slope));

    ForecastReport {
        aggregate: forecast_aggregate(history, options),
        window: window.iter().map(|(period, _)| period.clone()).collect(),
        rising_groups,
        declining_groups,
        districts: shown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn linear(n: usize, slope: f64, intercept: f64) -> Vec<(usize, f64)> {
        (0..n)
            .map(|x| (x, slope.mul_add(x as f64, intercept)))
            .collect()
    }

    fn record(entity: &str, group: &str, pending: i64) -> RawRecord {
        RawRecord {
            entity_key: entity.to_string(),
            group_key: Some(group.to_string()),
            title: format!("{group} title"),
            judge: None,
            pending_count: pending,
            total_count: pending,
        }
    }

    fn months(n: usize) -> Vec<PeriodKey> {
        (1..=n).map(|m| PeriodKey::new(format!("2024-{m:02}"))).collect()
    }

    #[test]
    fn two_points_are_insufficient() {
        let err = fit_linear_trend(&[(0, 1.0), (1, 2.0)]).unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::InsufficientData {
                points: 2,
                required: 3
            }
        );
    }

    #[test]
    fn three_collinear_points_fit_exactly() {
        let model = fit_linear_trend(&linear(3, 2.0, 1.0)).unwrap();
        assert!((model.slope - 2.0).abs() < 1e-12);
        assert!((model.intercept - 1.0).abs() < 1e-12);
        assert!((model.r2 - 1.0).abs() < 1e-12);
        assert!(model.standard_error.abs() < 1e-9);
        assert_eq!(model.sample_size, 3);
    }

    #[test]
    fn flat_series_has_unit_r2() {
        let model = fit_linear_trend(&[(0, 5.0), (1, 5.0), (2, 5.0)]).unwrap();
        assert!(model.slope.abs() < f64::EPSILON);
        assert!((model.r2 - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fit_is_deterministic() {
        let points = [(0, 3.0), (1, 9.0), (3, 4.0), (4, 12.0), (7, 8.0)];
        let a = fit_linear_trend(&points).unwrap();
        let b = fit_linear_trend(&points).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn identical_x_values_give_zero_slope() {
        let model = fit_linear_trend(&[(2, 1.0), (2, 5.0), (2, 9.0)]).unwrap();
        assert!(model.slope.abs() < f64::EPSILON);
        assert!((model.intercept - 5.0).abs() < 1e-12);
        let prediction = predict_with_interval(&model, 3.0, DEFAULT_Z);
        assert!(prediction.upper.is_finite());
    }

    #[test]
    fn prediction_floors_at_zero_but_upper_does_not() {
        let model = fit_linear_trend(&[(0, 30.0), (1, 21.0), (2, 9.0), (3, 0.0)]).unwrap();
        let prediction = predict_with_interval(&model, 10.0, DEFAULT_Z);
        assert!(prediction.y_hat.abs() < f64::EPSILON);
        assert!(prediction.lower.abs() < f64::EPSILON);
        let raw = model.slope.mul_add(10.0, model.intercept);
        assert!(raw < 0.0);
        assert!(prediction.upper > raw);
    }

    #[test]
    fn interval_widens_with_noise() {
        let model = fit_linear_trend(&[(0, 10.0), (1, 14.0), (2, 11.0), (3, 17.0)]).unwrap();
        let prediction = predict_with_interval(&model, 4.0, DEFAULT_Z);
        assert!(prediction.lower < prediction.y_hat);
        assert!(prediction.upper > prediction.y_hat);
    }

    #[test]
    fn momentum_thresholds() {
        assert_eq!(classify_momentum(200.0), Momentum::RapidlyRising);
        assert_eq!(classify_momentum(150.0), Momentum::Rising);
        assert_eq!(classify_momentum(31.0), Momentum::Rising);
        assert_eq!(classify_momentum(0.0), Momentum::Stable);
        assert_eq!(classify_momentum(-30.0), Momentum::Declining);
        assert_eq!(classify_momentum(-150.0), Momentum::RapidlyDeclining);
        assert_eq!(classify_momentum(-200.0), Momentum::RapidlyDeclining);
    }

    #[test]
    fn aggregate_forecast_projects_calendar_months() {
        let history: Vec<(PeriodKey, Vec<RawRecord>)> = months(4)
            .into_iter()
            .zip([100, 200, 300, 400])
            .map(|(p, v)| (p, vec![record("NJ", "MDL-1", v)]))
            .collect();

        let forecast = forecast_aggregate(&history, &MomentumOptions::default()).unwrap();
        assert!((forecast.model.slope - 100.0).abs() < 1e-9);
        assert_eq!(forecast.momentum, Momentum::Rising);
        assert_eq!(forecast.regression_line.len(), 10);
        assert_eq!(forecast.horizon.len(), 6);

        let next = forecast.next_period().unwrap();
        assert_eq!(next.period.as_ref().unwrap().as_str(), "2024-05-01");
        assert_eq!(next.label, "May 2024");
        assert!((next.prediction.y_hat - 500.0).abs() < 1e-6);
    }

    #[test]
    fn aggregate_forecast_needs_three_periods() {
        let history: Vec<(PeriodKey, Vec<RawRecord>)> = months(2)
            .into_iter()
            .map(|p| (p, vec![record("NJ", "MDL-1", 5)]))
            .collect();
        assert!(forecast_aggregate(&history, &MomentumOptions::default()).is_none());
    }

    #[test]
    fn group_momentum_eligibility() {
        let history: Vec<(PeriodKey, Vec<RawRecord>)> = months(8)
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let i = i64::try_from(i).unwrap();
                let mut rows = vec![
                    record("NJ", "GROWING", 100 + i * 50),
                    record("NJ", "SMALL", 5),
                ];
                if i >= 4 {
                    rows.push(record("MN", "YOUNG", 500));
                }
                (p, rows)
            })
            .collect();

        let ranked = group_momentum(&history, &MomentumOptions::default());
        assert_eq!(ranked.len(), 1);
        let growing = &ranked[0];
        assert_eq!(growing.key, "GROWING");
        assert!((growing.model.slope - 50.0).abs() < 1e-9);
        assert!((growing.last_value - 450.0).abs() < 1e-9);
        // x = 8 + 6 = 14 -> 100 + 14 * 50
        assert!((growing.projection - 800.0).abs() < 1e-6);
        assert!((growing.projected_delta - 350.0).abs() < 1e-6);
    }

    #[test]
    fn full_window_projects_window_plus_horizon() {
        let history: Vec<(PeriodKey, Vec<RawRecord>)> = months(14)
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let i = i64::try_from(i).unwrap();
                (p, vec![record("NJ", "GROWING", 100 + i * 50)])
            })
            .collect();

        let report = forecast_report(&history, &MomentumOptions::default());
        assert_eq!(report.window.len(), 12);
        let growing = &report.rising_groups[0];
        // Window starts at 200; x = 12 + 6 = 18 -> 200 + 18 * 50
        assert!((growing.last_value - 750.0).abs() < 1e-9);
        assert!((growing.projection - 1100.0).abs() < 1e-6);
    }

    #[test]
    fn district_momentum_skips_zero_periods() {
        let history: Vec<(PeriodKey, Vec<RawRecord>)> = months(8)
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let i = i64::try_from(i).unwrap();
                let pending = if i == 3 { 0 } else { 1000 - i * 200 };
                (p, vec![record("NJ", "G", pending.max(0))])
            })
            .collect();

        // Positive only at indices 0, 1, 2, 4: too few observations.
        assert!(district_momentum(&history, &MomentumOptions::default()).is_empty());

        let relaxed = MomentumOptions {
            min_observations: 3,
            ..MomentumOptions::default()
        };
        let ranked = district_momentum(&history, &relaxed);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].model.slope + 200.0).abs() < 1e-9);
        assert_eq!(ranked[0].momentum, Momentum::RapidlyDeclining);
    }

    #[test]
    fn report_uses_trailing_window() {
        let history: Vec<(PeriodKey, Vec<RawRecord>)> = months(12)
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let i = i64::try_from(i).unwrap();
                (
                    p,
                    vec![
                        record("NJ", "UP", 100 + i * 40),
                        record("MN", "DOWN", 1000 - i * 40),
                    ],
                )
            })
            .collect();
        let options = MomentumOptions {
            window: 8,
            ..MomentumOptions::default()
        };

        let report = forecast_report(&history, &options);
        assert_eq!(report.window.len(), 8);
        assert_eq!(report.window[0].as_str(), "2024-05");
        assert!(report.aggregate.is_some());
        assert_eq!(report.rising_groups[0].key, "UP");
        assert_eq!(report.declining_groups[0].key, "DOWN");
        assert_eq!(report.districts.len(), 2);
        assert_eq!(report.districts[0].key, "MN");
        assert_eq!(report.districts[1].key, "NJ");
    }
}
