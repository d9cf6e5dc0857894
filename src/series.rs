use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::aggregate::CountryAggregate;
use crate::domain::{LICENSE_NAME, LICENSE_URL, REPORT_TO_CASE_DELAY_DAYS, SERIES_TYPE};
use crate::error::CollectorError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A gap-free daily series starting at `start_date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseSeries {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub values: Vec<i64>,
}

impl DenseSeries {
    /// Number of days between first and last observation.
    pub fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSource {
    pub name: String,
    pub url: String,
    pub license: String,
    pub license_url: String,
}

/// The JSON document written as `tests-OWID.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestsArtifact {
    pub start_date: String,
    pub version_date: String,
    #[serde(rename = "type")]
    pub series_type: String,
    pub average_report_to_case_delay_in_days: u32,
    pub source: SeriesSource,
    pub data: Vec<i64>,
}

/// Expands the sparse per-date values of `aggregate` into one value per
/// calendar day, rounding half away from zero and filling gaps with 0.
pub fn densify(entity: &str, aggregate: &CountryAggregate) -> Result<DenseSeries, CollectorError> {
    let dates = &aggregate.positive_tests_for_date;
    let (Some((first, _)), Some((last, _))) = (dates.first_key_value(), dates.last_key_value())
    else {
        return Err(CollectorError::EmptySeries(entity.to_string()));
    };
    let start_date = parse_date(entity, first)?;
    let end_date = parse_date(entity, last)?;

    let mut values = Vec::new();
    let mut date = start_date;
    while date <= end_date {
        let key = date.format(DATE_FORMAT).to_string();
        let value = dates.get(&key).map(|value| value.round() as i64).unwrap_or(0);
        values.push(value);
        date = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| CollectorError::InvalidDate {
                entity: entity.to_string(),
                date: key,
            })?;
    }

    Ok(DenseSeries {
        start_date,
        end_date,
        values,
    })
}

pub fn build_artifact(aggregate: &CountryAggregate, series: &DenseSeries) -> TestsArtifact {
    let name = match aggregate.source.as_deref() {
        Some(source) => format!("Data collected by OWID from {source}"),
        None => "Data collected by OWID".to_string(),
    };
    TestsArtifact {
        start_date: series.start_date.format(DATE_FORMAT).to_string(),
        version_date: aggregate.version_date.clone(),
        series_type: SERIES_TYPE.to_string(),
        average_report_to_case_delay_in_days: REPORT_TO_CASE_DELAY_DAYS,
        source: SeriesSource {
            name,
            url: aggregate.source_url.clone().unwrap_or_default(),
            license: LICENSE_NAME.to_string(),
            license_url: LICENSE_URL.to_string(),
        },
        data: series.values.clone(),
    }
}

fn parse_date(entity: &str, value: &str) -> Result<NaiveDate, CollectorError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| CollectorError::InvalidDate {
        entity: entity.to_string(),
        date: value.to_string(),
    })
}
