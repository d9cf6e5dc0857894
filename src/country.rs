use std::fs;

use camino::Utf8Path;
use serde::Deserialize;

use crate::error::CollectorError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CountryCodeEntry {
    #[serde(rename = "alpha-3")]
    pub alpha3: String,
    #[serde(rename = "alpha-2")]
    pub alpha2: String,
}

/// ISO 3166 alpha-3 to alpha-2 lookup table.
#[derive(Debug, Clone, Default)]
pub struct CountryCodes {
    entries: Vec<CountryCodeEntry>,
}

impl CountryCodes {
    pub fn new(entries: Vec<CountryCodeEntry>) -> Self {
        Self { entries }
    }

    pub fn load(path: &Utf8Path) -> Result<Self, CollectorError> {
        if !path.as_std_path().exists() {
            return Err(CollectorError::MissingReference(path.to_path_buf()));
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| CollectorError::Filesystem(format!("read {path}: {err}")))?;
        Self::from_json(&content).map_err(|message| CollectorError::ReferenceParse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        let entries: Vec<CountryCodeEntry> =
            serde_json::from_str(content).map_err(|err| err.to_string())?;
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the alpha-2 code of the first entry matching `alpha3`, or
    /// `alpha3` itself when the table has no match.
    pub fn resolve<'a>(&'a self, alpha3: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|entry| entry.alpha3 == alpha3)
            .map(|entry| entry.alpha2.as_str())
            .unwrap_or(alpha3)
    }
}
