//! Record source backed by a local copy of the report tree.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mdl_trends_records_models::PeriodKey;

use crate::{RecordError, RecordSource, expect_rows, parse_period_index};

/// Reads `mdl/index.json`, `mdl/{period}.json` and `districts.json` from a
/// directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryRecordSource {
    root: PathBuf,
}

impl DirectoryRecordSource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_json(&self, relative: &Path) -> Result<serde_json::Value, RecordError> {
        let path = self.root.join(relative);
        log::debug!("Reading {}", path.display());
        let bytes = tokio::fs::read(&path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl RecordSource for DirectoryRecordSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn list_periods(&self) -> Result<Vec<PeriodKey>, RecordError> {
        let document = self.read_json(Path::new("mdl/index.json")).await?;
        parse_period_index(document)
    }

    async fn fetch_period_rows(
        &self,
        period: &PeriodKey,
    ) -> Result<Vec<serde_json::Value>, RecordError> {
        let relative = PathBuf::from("mdl").join(format!("{period}.json"));
        let document = self.read_json(&relative).await?;
        expect_rows(document, period.as_str())
    }

    async fn fetch_districts(&self) -> Result<serde_json::Value, RecordError> {
        self.read_json(Path::new("districts.json")).await
    }
}
