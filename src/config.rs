use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::OWID_SOURCE_URL;
use crate::error::CollectorError;

pub const DEFAULT_CONFIG_FILE: &str = "collect-tests-owid.json";
pub const DEFAULT_INPUT_FILE: &str = "OWID-COVID-19-testing-all-observations.csv";
pub const DEFAULT_REFERENCE_FILE: &str = "../ISO-3166-Countries-with-Regional-Codes.json";
pub const DEFAULT_OUTPUT_BASE_DIR: &str = "../../docs/assets/data/SARS-CoV-2";
pub const MANIFEST_FILE: &str = "dataset.json";

/// Optional on-disk overrides. Relative paths are resolved against the base
/// directory; `manifest_path` defaults to `dataset.json` in the output dir.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CollectorConfig {
    #[serde(default)]
    pub input_file: Option<Utf8PathBuf>,
    #[serde(default)]
    pub reference_file: Option<Utf8PathBuf>,
    #[serde(default)]
    pub output_base_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub manifest_path: Option<Utf8PathBuf>,
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub input_file: Utf8PathBuf,
    pub reference_file: Utf8PathBuf,
    pub output_base_dir: Utf8PathBuf,
    pub manifest_path: Utf8PathBuf,
    pub source_url: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(
        base_dir: &Utf8Path,
        config_path: Option<&Utf8Path>,
    ) -> Result<ResolvedConfig, CollectorError> {
        let (path, required) = match config_path {
            Some(path) => (join_base(base_dir, path), true),
            None => (base_dir.join(DEFAULT_CONFIG_FILE), false),
        };

        if !path.as_std_path().exists() {
            if required {
                return Err(CollectorError::MissingConfig(path));
            }
            return Ok(Self::resolve_config(base_dir, CollectorConfig::default()));
        }

        let content = fs::read_to_string(path.as_std_path()).map_err(|err| {
            CollectorError::ConfigParse {
                path: path.clone(),
                message: err.to_string(),
            }
        })?;
        let config: CollectorConfig =
            serde_json::from_str(&content).map_err(|err| CollectorError::ConfigParse {
                path: path.clone(),
                message: err.to_string(),
            })?;

        Ok(Self::resolve_config(base_dir, config))
    }

    pub fn resolve_config(base_dir: &Utf8Path, config: CollectorConfig) -> ResolvedConfig {
        let input_file = join_base(
            base_dir,
            config
                .input_file
                .as_deref()
                .unwrap_or(Utf8Path::new(DEFAULT_INPUT_FILE)),
        );
        let reference_file = join_base(
            base_dir,
            config
                .reference_file
                .as_deref()
                .unwrap_or(Utf8Path::new(DEFAULT_REFERENCE_FILE)),
        );
        let output_base_dir = join_base(
            base_dir,
            config
                .output_base_dir
                .as_deref()
                .unwrap_or(Utf8Path::new(DEFAULT_OUTPUT_BASE_DIR)),
        );
        let manifest_path = match config.manifest_path.as_deref() {
            Some(path) => join_base(base_dir, path),
            None => output_base_dir.join(MANIFEST_FILE),
        };

        ResolvedConfig {
            input_file,
            reference_file,
            output_base_dir,
            manifest_path,
            source_url: config
                .source_url
                .unwrap_or_else(|| OWID_SOURCE_URL.to_string()),
        }
    }
}

fn join_base(base_dir: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
