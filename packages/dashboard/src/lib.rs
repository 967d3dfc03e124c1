#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard session for MDL trends.
//!
//! A [`session::Session`] holds everything a front-end needs between
//! interactions: the record source and its period cache, the period
//! catalog, the district directory, and the current selection and metric
//! toggles. Any change to the selection or toggles invalidates in-flight
//! recomputes; their results are dropped instead of applied.

pub mod config;
pub mod session;
pub mod view;

use mdl_trends_records::RecordError;
use mdl_trends_records::catalog::UnknownPeriod;
use mdl_trends_records_models::PeriodKey;

pub use config::DashboardConfig;
pub use session::Session;
pub use view::{DashboardView, MetricToggles};

/// Errors that can occur while opening or driving a dashboard session.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// Record source failure.
    #[error(transparent)]
    Records(#[from] RecordError),

    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration file is not valid TOML.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error (configuration file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Selected period is not in the catalog.
    #[error("Unknown period: {period}")]
    UnknownPeriod {
        /// The requested period.
        period: PeriodKey,
    },

    /// The source publishes no periods.
    #[error("No periods are published")]
    EmptyCatalog,
}

impl From<UnknownPeriod> for DashboardError {
    fn from(err: UnknownPeriod) -> Self {
        Self::UnknownPeriod { period: err.0 }
    }
}
