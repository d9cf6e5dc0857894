//! The shared `dataset.json` manifest listing datasets per region.
//!
//! Loading and persisting are kept apart from [`merge_manifest`], which is a
//! pure transform so the merge rules can be exercised without a filesystem.
//! The manifest is held as an ordered JSON object: only regions' `path` and
//! descriptors' `title` are interpreted, everything else is carried through
//! with its original key order.

use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::domain::{ARTIFACT_FILENAME, CountryCode};
use crate::error::CollectorError;
use crate::store::Store;

pub const OWID_DATASET_TITLE: &str = "Positive results per 100k PCR tests (OWID)";
pub const OWID_DATASET_DESCRIPTION: &str = "Positive SARS-CoV-2 PCR Tests per 100'000 tests. Based on data collected by 'Our World in Data'.";

const REGIONS: &str = "regions";
const DATASETS: &str = "datasets";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct DatasetManifest(Map<String, Value>);

impl DatasetManifest {
    pub fn from_json(content: &str) -> Result<Self, String> {
        let manifest: Self = serde_json::from_str(content).map_err(|err| err.to_string())?;
        if !manifest.0.get(REGIONS).is_some_and(Value::is_array) {
            return Err("`regions` must be an array".to_string());
        }
        Ok(manifest)
    }

    pub fn regions(&self) -> &[Value] {
        self.0
            .get(REGIONS)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetDescriptor {
    pub title: String,
    pub description: String,
    pub filename: String,
}

impl DatasetDescriptor {
    pub fn owid_tests() -> Self {
        Self {
            title: OWID_DATASET_TITLE.to_string(),
            description: OWID_DATASET_DESCRIPTION.to_string(),
            filename: ARTIFACT_FILENAME.to_string(),
        }
    }

    fn to_object(&self) -> Map<String, Value> {
        let mut object = Map::new();
        object.insert("title".to_string(), Value::from(self.title.as_str()));
        object.insert("description".to_string(), Value::from(self.description.as_str()));
        object.insert("filename".to_string(), Value::from(self.filename.as_str()));
        object
    }
}

/// A region the collector produced data for. `name` is the OWID entity label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionEntry {
    pub name: String,
    pub code: CountryCode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestChanges {
    pub regions_added: usize,
    pub datasets_added: usize,
    pub datasets_updated: usize,
    pub skipped_codes: Vec<String>,
}

pub fn load_manifest(path: &Utf8Path) -> Result<DatasetManifest, CollectorError> {
    if !path.as_std_path().exists() {
        return Err(CollectorError::MissingManifest(path.to_path_buf()));
    }
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| CollectorError::Filesystem(format!("read {path}: {err}")))?;
    DatasetManifest::from_json(&content).map_err(|message| CollectorError::ManifestParse {
        path: path.to_path_buf(),
        message,
    })
}

pub fn save_manifest(path: &Utf8Path, manifest: &DatasetManifest) -> Result<(), CollectorError> {
    Store::write_json_atomic(path, manifest)?;
    info!(path = %path, regions = manifest.regions().len(), "wrote manifest");
    Ok(())
}

/// Registers `descriptor` for every two-letter region in `entries`.
///
/// New regions are appended, existing descriptors with the same title get
/// the descriptor's keys assigned in place. Applying the same input twice is
/// a no-op.
pub fn merge_manifest(
    mut manifest: DatasetManifest,
    entries: &[RegionEntry],
    descriptor: &DatasetDescriptor,
) -> Result<(DatasetManifest, ManifestChanges), CollectorError> {
    let mut changes = ManifestChanges::default();
    let fields = descriptor.to_object();
    let regions = manifest
        .0
        .entry(REGIONS)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| CollectorError::ManifestShape("`regions` is not an array".to_string()))?;

    for entry in entries {
        if !entry.code.is_region() {
            debug!(code = %entry.code, "skipping non-region code");
            changes.skipped_codes.push(entry.code.to_string());
            continue;
        }

        let Some(index) = regions
            .iter()
            .position(|region| region.get("path").and_then(Value::as_str) == Some(entry.code.as_str()))
        else {
            let mut region = Map::new();
            region.insert("name".to_string(), Value::from(entry.name.as_str()));
            region.insert("path".to_string(), Value::from(entry.code.as_str()));
            region.insert(
                DATASETS.to_string(),
                Value::Array(vec![Value::Object(fields.clone())]),
            );
            regions.push(Value::Object(region));
            changes.regions_added += 1;
            continue;
        };

        let region = regions[index].as_object_mut().ok_or_else(|| {
            CollectorError::ManifestShape(format!("region `{}` is not an object", entry.code))
        })?;
        let datasets = region
            .entry(DATASETS)
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| {
                CollectorError::ManifestShape(format!(
                    "`datasets` of region `{}` is not an array",
                    entry.code
                ))
            })?;

        match datasets
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|dataset| dataset.get("title").and_then(Value::as_str) == Some(descriptor.title.as_str()))
        {
            Some(existing) => {
                for (key, value) in &fields {
                    existing.insert(key.clone(), value.clone());
                }
                changes.datasets_updated += 1;
            }
            None => {
                datasets.push(Value::Object(fields.clone()));
                changes.datasets_added += 1;
            }
        }
    }

    Ok((manifest, changes))
}
