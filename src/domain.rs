use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CollectorError;

pub const TESTS_PERFORMED: &str = "tests performed";
pub const SERIES_TYPE: &str = "pcr_tests_100k";
pub const REPORT_TO_CASE_DELAY_DAYS: u32 = 5;
pub const ARTIFACT_FILENAME: &str = "tests-OWID.json";
pub const LICENSE_NAME: &str = "Attribution 4.0 International (CC BY 4.0)";
pub const LICENSE_URL: &str = "https://creativecommons.org/licenses/by/4.0/";
pub const OWID_SOURCE_URL: &str = "https://raw.githubusercontent.com/owid/covid-19-data/master/public/data/testing/covid-testing-all-observations.csv";

/// An OWID entity label of the form `"<Country> - <DataType>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityLabel {
    pub country: String,
    pub data_type: String,
}

impl EntityLabel {
    pub fn is_tests_performed(&self) -> bool {
        self.data_type == TESTS_PERFORMED
    }
}

impl FromStr for EntityLabel {
    type Err = CollectorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (country, data_type) = value
            .split_once(" - ")
            .ok_or_else(|| CollectorError::InvalidEntity(value.to_string()))?;
        Ok(Self {
            country: country.to_string(),
            data_type: data_type.to_string(),
        })
    }
}

/// Lowercased country code used as directory name and manifest region path.
///
/// Usually an ISO 3166 alpha-2 code; unresolved entries keep the raw OWID code
/// (e.g. `owid_wrl`), which is never a region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(code: &str) -> Self {
        Self(code.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_region(&self) -> bool {
        self.0.chars().count() == 2
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Converts an OWID "short-term tests per case" cell into positive tests per
/// 100k tests. Empty, non-numeric, zero and non-finite values yield `None`.
pub fn positive_tests_per_100k(tests_per_case: &str) -> Option<f64> {
    let value = tests_per_case.trim();
    if value.is_empty() {
        return None;
    }
    let tests_per_case: f64 = value.parse().ok()?;
    if tests_per_case == 0.0 || !tests_per_case.is_finite() {
        return None;
    }
    Some(100_000.0 / tests_per_case)
}
