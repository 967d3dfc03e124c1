//! District code to display-name resolution.
//!
//! Report rows carry short district codes (`"NJ"`). The directory maps
//! those codes, and the court names themselves, to a readable name. The
//! analytics engine never needs this; only front-ends do.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use mdl_trends_records_models::DistrictEntry;
use regex::Regex;

use crate::{RecordError, RecordSource};

/// Matches a leading `D.` glued to the next token (`"D.N.J."`).
static LEADING_D_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^D\.([^ \t])").expect("valid regex"));

/// Lookup table from district code (or court name) to display name.
#[derive(Debug, Clone, Default)]
pub struct DistrictDirectory {
    names: BTreeMap<String, String>,
}

impl DistrictDirectory {
    /// Builds a directory from entries.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = DistrictEntry>) -> Self {
        let mut names = BTreeMap::new();
        for entry in entries {
            names.insert(entry.name.clone(), entry.name.clone());
            names.insert(entry.abbreviation, entry.name);
        }
        Self { names }
    }

    /// Parses a `districts.json` document: either an array of
    /// `{abbreviation, name}` objects or an object keyed by abbreviation
    /// whose values carry a `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if the document has neither shape.
    pub fn from_json(document: serde_json::Value) -> Result<Self, RecordError> {
        match document {
            serde_json::Value::Array(_) => {
                let entries: Vec<DistrictEntry> = serde_json::from_value(document)?;
                Ok(Self::new(entries))
            }
            serde_json::Value::Object(map) => {
                let entries = map
                    .into_iter()
                    .filter_map(|(abbreviation, value)| {
                        let name = value.get("name")?.as_str()?.to_string();
                        Some(DistrictEntry { abbreviation, name })
                    })
                    .collect::<Vec<_>>();
                Ok(Self::new(entries))
            }
            _ => Err(RecordError::Normalization {
                message: "districts: expected an array or an object".to_string(),
            }),
        }
    }

    /// Loads the directory from `source`, falling back to an empty
    /// directory (codes display as-is) when it is unavailable.
    pub async fn load_or_empty(source: &dyn RecordSource) -> Self {
        match source.fetch_districts().await.and_then(Self::from_json) {
            Ok(directory) => {
                log::debug!("Loaded {} district names", directory.len());
                directory
            }
            Err(e) => {
                log::warn!("District directory unavailable ({e}); showing raw district codes");
                Self::default()
            }
        }
    }

    /// Number of resolvable keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if nothing resolves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Display name for `key`, with a space after a leading `D.`
    /// (`"D.N.J."` → `"D. N.J."`). Unknown keys come back unchanged.
    #[must_use]
    pub fn display_name(&self, key: &str) -> String {
        self.names.get(key).map_or_else(
            || key.to_string(),
            |name| LEADING_D_RE.replace(name, "D. $1").into_owned(),
        )
    }
}
