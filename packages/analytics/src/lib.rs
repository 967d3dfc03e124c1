#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Time-series aggregation and comparison engine for MDL case counts.
//!
//! Every function here is a synchronous, pure function of the records it
//! is given. Record fetching, caching and selection state live in the
//! callers; this crate never performs I/O and never fails on malformed or
//! missing data. The one exception is [`forecast::fit_linear_trend`],
//! which reports [`AnalyticsError::InsufficientData`] so a series with too
//! little history is omitted rather than drawn as a flat line.

pub mod aggregate;
pub mod delta;
pub mod drivers;
pub mod forecast;
pub mod insights;
pub mod ranking;
pub mod summary;

pub use forecast::{classify_momentum, fit_linear_trend, predict_with_interval};
pub use summary::compute_summary;

use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    /// A regression was requested over too few points.
    #[error("Insufficient data: {points} points, at least {required} required")]
    InsufficientData {
        /// Points supplied.
        points: usize,
        /// Minimum points needed.
        required: usize,
    },
}
