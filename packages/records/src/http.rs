//! Record source backed by a static HTTP data tree.
//!
//! Expects the layout published alongside the dashboard:
//!
//! ```text
//! {base}/mdl/index.json      period index
//! {base}/mdl/{period}.json   rows for one period
//! {base}/districts.json      district directory
//! ```

use std::time::Duration;

use async_trait::async_trait;
use mdl_trends_records_models::PeriodKey;

use crate::retry::{self, RetryPolicy};
use crate::{RecordError, RecordSource, expect_rows, parse_period_index};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Reads the report tree over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRecordSource {
    client: reqwest::Client,
    base_url: String,
    policy: RetryPolicy,
}

impl HttpRecordSource {
    /// Creates a source rooted at `base_url` (e.g.
    /// `"https://example.org/data"`).
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, RecordError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::default(),
        })
    }

    /// Overrides the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// URL of the period index.
    #[must_use]
    pub fn index_url(&self) -> String {
        format!("{}/mdl/index.json", self.base_url)
    }

    /// URL of one period's rows.
    #[must_use]
    pub fn period_url(&self, period: &PeriodKey) -> String {
        format!("{}/mdl/{period}.json", self.base_url)
    }

    /// URL of the district directory.
    #[must_use]
    pub fn districts_url(&self) -> String {
        format!("{}/districts.json", self.base_url)
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, RecordError> {
        log::debug!("GET {url}");
        retry::send_json(|| self.client.get(url), self.policy).await
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn list_periods(&self) -> Result<Vec<PeriodKey>, RecordError> {
        let document = self.get_json(&self.index_url()).await?;
        parse_period_index(document)
    }

    async fn fetch_period_rows(
        &self,
        period: &PeriodKey,
    ) -> Result<Vec<serde_json::Value>, RecordError> {
        let document = self.get_json(&self.period_url(period)).await?;
        expect_rows(document, period.as_str())
    }

    async fn fetch_districts(&self) -> Result<serde_json::Value, RecordError> {
        self.get_json(&self.districts_url()).await
    }
}
