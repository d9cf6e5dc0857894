use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tempfile::Builder;

use crate::domain::{ARTIFACT_FILENAME, CountryCode};
use crate::error::CollectorError;

/// Output tree: one directory per country code below `output_root`.
#[derive(Debug, Clone)]
pub struct Store {
    output_root: Utf8PathBuf,
}

impl Store {
    pub fn new(output_root: Utf8PathBuf) -> Self {
        Self { output_root }
    }

    pub fn output_root(&self) -> &Utf8Path {
        &self.output_root
    }

    pub fn country_dir(&self, code: &CountryCode) -> Utf8PathBuf {
        self.output_root.join(code.as_str())
    }

    pub fn artifact_path(&self, code: &CountryCode) -> Utf8PathBuf {
        self.country_dir(code).join(ARTIFACT_FILENAME)
    }

    pub fn ensure_country_dir(&self, code: &CountryCode) -> Result<Utf8PathBuf, CollectorError> {
        let dir = self.country_dir(code);
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| CollectorError::Filesystem(format!("create {dir}: {err}")))?;
        Ok(dir)
    }

    /// Writes `value` as four-space indented JSON, replacing `path` atomically.
    pub fn write_json_atomic<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), CollectorError> {
        let content = to_json_pretty(value)?;
        Self::write_bytes_atomic(path, &content)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), CollectorError> {
        let parent = path
            .parent()
            .ok_or_else(|| CollectorError::InvalidPath(path.to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| CollectorError::Filesystem(format!("create {parent}: {err}")))?;
        let mut temp = Builder::new()
            .prefix(".collect-tests")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| CollectorError::Filesystem(format!("temp file in {parent}: {err}")))?;
        temp.write_all(content)
            .map_err(|err| CollectorError::Filesystem(format!("write {path}: {err}")))?;
        temp.persist(path.as_std_path())
            .map_err(|err| CollectorError::Filesystem(format!("persist {path}: {err}")))?;
        Ok(())
    }
}

pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>, CollectorError> {
    let mut content = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut content, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|err| CollectorError::Filesystem(err.to_string()))?;
    Ok(content)
}
