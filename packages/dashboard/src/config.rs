//! Dashboard configuration.
//!
//! Loaded from a TOML file where every section is optional:
//!
//! ```toml
//! [source]
//! kind = "http"
//! base_url = "https://example.org/data"
//! max_retries = 3
//!
//! [forecast]
//! horizon = 6
//! window = 12
//!
//! [fields]
//! group = ["MDL", "MDL Name", "Case Name"]
//! ```
//!
//! `MDL_TRENDS_DATA_URL` and `MDL_TRENDS_DATA_DIR` override the source.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mdl_trends_analytics::forecast::{DEFAULT_Z, MomentumOptions};
use mdl_trends_records::RecordSource;
use mdl_trends_records::directory::DirectoryRecordSource;
use mdl_trends_records::http::HttpRecordSource;
use mdl_trends_records::normalize::FieldMapping;
use mdl_trends_records::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

use crate::DashboardError;

/// Environment variable selecting an HTTP source.
pub const DATA_URL_ENV: &str = "MDL_TRENDS_DATA_URL";

/// Environment variable selecting a directory source.
pub const DATA_DIR_ENV: &str = "MDL_TRENDS_DATA_DIR";

/// Where period records are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A published HTTP data tree.
    Http {
        /// Root URL of the tree.
        base_url: String,
        /// Retries of a failed request; 0 disables retrying.
        #[serde(default = "default_max_retries")]
        max_retries: u32,
    },
    /// A local copy of the data tree.
    Directory {
        /// Root directory of the tree.
        #[serde(default = "default_directory")]
        directory: PathBuf,
    },
}

impl SourceConfig {
    /// An HTTP source with the default retry count.
    #[must_use]
    pub fn http(base_url: impl Into<String>) -> Self {
        Self::Http {
            base_url: base_url.into(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Directory {
            directory: default_directory(),
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("data")
}

const fn default_max_retries() -> u32 {
    3
}

/// Backoff policy for `max_retries` retries.
#[must_use]
pub fn retry_policy(max_retries: u32) -> RetryPolicy {
    match max_retries {
        0 => RetryPolicy::none(),
        max_retries => RetryPolicy {
            max_retries,
            ..RetryPolicy::default()
        },
    }
}

/// Forecast horizon and momentum eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Periods projected past the last one.
    pub horizon: usize,
    /// Trailing periods momentum rankings cover.
    pub window: usize,
    /// z-score of prediction intervals.
    pub z_score: f64,
    /// Observations a series needs within the window.
    pub min_observations: usize,
    /// Smallest last value a group needs.
    pub min_last_value: f64,
}

impl Default for ForecastConfig {
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

impl From<ForecastConfig> for MomentumOptions {
    fn from(config: ForecastConfig) -> Self {
        Self {
            horizon: config.horizon,
            window: config.window,
            z_score: config.z_score,
            min_observations: config.min_observations,
            min_last_value: config.min_last_value,
        }
    }
}

/// Top-level dashboard configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Record source.
    pub source: SourceConfig,
    /// Forecast tuning.
    pub forecast: ForecastConfig,
    /// Record field names.
    pub fields: FieldMapping,
}

impl DashboardConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Toml`] if the document is invalid.
    pub fn from_toml_str(text: &str) -> Result<Self, DashboardError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Io`] if the file cannot be read, or
    /// [`DashboardError::Toml`] if it is invalid.
    pub fn load(path: &Path) -> Result<Self, DashboardError> {
        log::debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Applies `MDL_TRENDS_DATA_URL` / `MDL_TRENDS_DATA_DIR`.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies source overrides looked up by environment variable name.
    /// A directory override wins over a URL override.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = non_empty(DATA_URL_ENV) {
            log::debug!("{DATA_URL_ENV} set; reading records from {base_url}");
            self.source = match self.source {
                SourceConfig::Http { max_retries, .. } => SourceConfig::Http {
                    base_url,
                    max_retries,
                },
                SourceConfig::Directory { .. } => SourceConfig::http(base_url),
            };
        }
        if let Some(directory) = non_empty(DATA_DIR_ENV) {
            log::debug!("{DATA_DIR_ENV} set; reading records from {directory}");
            self.source = SourceConfig::Directory {
                directory: PathBuf::from(directory),
            };
        }
        self
    }

    /// Momentum options for the analytics engine.
    #[must_use]
    pub fn momentum_options(&self) -> MomentumOptions {
        self.forecast.into()
    }

    /// Builds the configured record source.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Config`] for an empty base URL, or
    /// [`DashboardError::Records`] if the HTTP client cannot be built.
    pub fn build_source(&self) -> Result<Arc<dyn RecordSource>, DashboardError> {
        match &self.source {
            SourceConfig::Http {
                base_url,
                max_retries,
            } => {
                if base_url.trim().is_empty() {
                    return Err(DashboardError::Config {
                        message: "source.base_url must not be empty".to_string(),
                    });
                }
                let source =
                    HttpRecordSource::new(base_url)?.with_retry_policy(retry_policy(*max_retries));
                Ok(Arc::new(source))
            }
            SourceConfig::Directory { directory } => {
                Ok(Arc::new(DirectoryRecordSource::new(directory.clone())))
            }
        }
    }
}
