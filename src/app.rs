use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{RowStats, aggregate_file};
use crate::artifact::write_artifact;
use crate::config::ResolvedConfig;
use crate::country::CountryCodes;
use crate::error::CollectorError;
use crate::manifest::{
    DatasetDescriptor, ManifestChanges, RegionEntry, load_manifest, merge_manifest, save_manifest,
};
use crate::series::{build_artifact, densify};
use crate::source::{SourceClient, ensure_source};
use crate::store::Store;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub refresh: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub source_downloaded: bool,
    pub rows: RowStats,
    pub countries: Vec<CountrySummary>,
    pub manifest: ManifestChanges,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountrySummary {
    pub entity: String,
    pub country_code: String,
    pub start_date: String,
    pub version_date: String,
    pub days: usize,
    pub artifact_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn emit(sink: &dyn ProgressSink, message: String) {
    sink.event(ProgressEvent { message });
}

pub struct Collector<S: SourceClient> {
    config: ResolvedConfig,
    source: S,
}

impl<S: SourceClient> Collector<S> {
    pub fn new(config: ResolvedConfig, source: S) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn run(&self, options: &RunOptions, sink: &dyn ProgressSink) -> Result<RunSummary, CollectorError> {
        let codes = CountryCodes::load(&self.config.reference_file)?;
        info!(entries = codes.len(), "loaded country codes");

        let source_downloaded = ensure_source(
            &self.source,
            &self.config.input_file,
            &self.config.source_url,
            options.refresh,
        )?;
        if source_downloaded {
            emit(sink, format!("Downloaded {}", self.config.input_file));
        }

        emit(sink, "processing data...".to_string());
        let aggregation = aggregate_file(&self.config.input_file, &codes)?;

        let store = Store::new(self.config.output_base_dir.clone());
        let mut countries = Vec::with_capacity(aggregation.countries.len());
        for (entity, aggregate) in &aggregation.countries {
            let series = densify(entity, aggregate)?;
            emit(
                sink,
                format!(
                    "{}: data is from {} and spans {} days",
                    entity,
                    aggregate.version_date,
                    series.span_days()
                ),
            );

            let artifact = build_artifact(aggregate, &series);
            let artifact_path = if aggregate.country_code.as_str().is_empty() {
                warn!(entity = %entity, "no country code, not writing artifact");
                None
            } else {
                let path = write_artifact(&store, &aggregate.country_code, &artifact)?;
                emit(sink, format!("Writing results to {path}"));
                Some(path.to_string())
            };

            countries.push(CountrySummary {
                entity: entity.clone(),
                country_code: aggregate.country_code.to_string(),
                start_date: artifact.start_date,
                version_date: artifact.version_date,
                days: series.values.len(),
                artifact_path,
            });
        }

        emit(sink, format!("Updating datasets {}", aggregation.countries.len()));
        let manifest = load_manifest(&self.config.manifest_path)?;
        let entries = aggregation
            .countries
            .iter()
            .map(|(entity, aggregate)| RegionEntry {
                name: entity.clone(),
                code: aggregate.country_code.clone(),
            })
            .collect::<Vec<_>>();
        let (manifest, changes) =
            merge_manifest(manifest, &entries, &DatasetDescriptor::owid_tests())?;
        emit(sink, format!("Writing datasets to {}", self.config.manifest_path));
        save_manifest(&self.config.manifest_path, &manifest)?;

        Ok(RunSummary {
            source_downloaded,
            rows: aggregation.stats,
            countries,
            manifest: changes,
        })
    }
}
