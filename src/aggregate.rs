//! Groups OWID testing observations into per-entity aggregates.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;

use camino::Utf8Path;
use csv::StringRecord;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::country::CountryCodes;
use crate::domain::{CountryCode, EntityLabel, positive_tests_per_100k};
use crate::error::CollectorError;

pub const COLUMN_ENTITY: &str = "Entity";
pub const COLUMN_ISO_CODE: &str = "ISO code";
pub const COLUMN_DATE: &str = "Date";
pub const COLUMN_TESTS_PER_CASE: &str = "Short-term tests per case";
pub const COLUMN_SOURCE_URL: &str = "Source URL";
pub const COLUMN_SOURCE_LABEL: &str = "Source label";

#[derive(Debug, Clone, PartialEq)]
pub struct CountryAggregate {
    pub country: String,
    pub country_code: CountryCode,
    /// Positive tests per 100k keyed by `YYYY-MM-DD`. Later rows overwrite.
    pub positive_tests_for_date: BTreeMap<String, f64>,
    pub source_url: Option<String>,
    pub source: Option<String>,
    /// Date of the last matching row in file order, not the latest date.
    pub version_date: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub skipped_data_type: usize,
    pub skipped_rate: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Keyed by entity label, in order of first appearance.
    pub countries: IndexMap<String, CountryAggregate>,
    pub stats: RowStats,
}

struct Columns {
    entity: usize,
    iso_code: usize,
    date: usize,
    tests_per_case: usize,
    source_url: usize,
    source_label: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord, path: &Utf8Path) -> Result<Self, CollectorError> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|name| name == column)
                .ok_or_else(|| CollectorError::MissingColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
        };
        Ok(Self {
            entity: find(COLUMN_ENTITY)?,
            iso_code: find(COLUMN_ISO_CODE)?,
            date: find(COLUMN_DATE)?,
            tests_per_case: find(COLUMN_TESTS_PER_CASE)?,
            source_url: find(COLUMN_SOURCE_URL)?,
            source_label: find(COLUMN_SOURCE_LABEL)?,
        })
    }
}

pub fn aggregate_file(path: &Utf8Path, codes: &CountryCodes) -> Result<Aggregation, CollectorError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| CollectorError::Filesystem(format!("open {path}: {err}")))?;
    aggregate_reader(file, path, codes)
}

/// Reads CSV observations from `reader`; `path` is only used in errors.
pub fn aggregate_reader<R: Read>(
    reader: R,
    path: &Utf8Path,
    codes: &CountryCodes,
) -> Result<Aggregation, CollectorError> {
    // Rows are checked per required column, so ragged rows that are skipped
    // anyway do not abort the run.
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|err| CollectorError::MalformedRow {
            path: path.to_path_buf(),
            line: 1,
            message: err.to_string(),
        })?
        .clone();
    // UTF-8 BOM on the first header would hide the `Entity` column.
    let headers: StringRecord = headers
        .iter()
        .map(|name| name.trim_start_matches('\u{feff}'))
        .collect();
    let columns = Columns::from_headers(&headers, path)?;

    let mut aggregation = Aggregation::default();
    let mut record = StringRecord::new();
    loop {
        let has_record = reader
            .read_record(&mut record)
            .map_err(|err| CollectorError::MalformedRow {
                path: path.to_path_buf(),
                line: err.position().map(|pos| pos.line()).unwrap_or_default(),
                message: err.to_string(),
            })?;
        if !has_record {
            break;
        }
        aggregation.stats.rows_read += 1;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let field = |idx: usize, column: &str| {
            record.get(idx).ok_or_else(|| CollectorError::MalformedRow {
                path: path.to_path_buf(),
                line,
                message: format!("missing value for column `{column}`"),
            })
        };

        let entity = field(columns.entity, COLUMN_ENTITY)?;
        let label = match entity.parse::<EntityLabel>() {
            Ok(label) if label.is_tests_performed() => label,
            _ => {
                aggregation.stats.skipped_data_type += 1;
                continue;
            }
        };

        let Some(positive_tests) =
            positive_tests_per_100k(field(columns.tests_per_case, COLUMN_TESTS_PER_CASE)?)
        else {
            debug!(entity, line, "skipping row without usable tests per case");
            aggregation.stats.skipped_rate += 1;
            continue;
        };

        let date = field(columns.date, COLUMN_DATE)?;
        let iso_code = field(columns.iso_code, COLUMN_ISO_CODE)?;
        let source_url = field(columns.source_url, COLUMN_SOURCE_URL)?;
        let source_label = field(columns.source_label, COLUMN_SOURCE_LABEL)?;

        let aggregate = aggregation
            .countries
            .entry(entity.to_string())
            .or_insert_with(|| {
                let resolved = codes.resolve(iso_code);
                if resolved == iso_code {
                    warn!(entity, iso_code, "no alpha-2 code, using raw code");
                }
                CountryAggregate {
                    country: label.country.clone(),
                    country_code: CountryCode::new(resolved),
                    positive_tests_for_date: BTreeMap::new(),
                    source_url: None,
                    source: None,
                    version_date: String::new(),
                }
            });

        if !source_url.is_empty() {
            aggregate.source_url = Some(source_url.to_string());
        }
        if !source_label.is_empty() {
            aggregate.source = Some(source_label.to_string());
        }
        aggregate
            .positive_tests_for_date
            .insert(date.to_string(), positive_tests);
        aggregate.version_date = date.to_string();
        aggregation.stats.rows_kept += 1;
    }

    info!(
        rows_read = aggregation.stats.rows_read,
        rows_kept = aggregation.stats.rows_kept,
        countries = aggregation.countries.len(),
        "aggregated observations"
    );
    Ok(aggregation)
}
