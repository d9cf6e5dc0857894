use std::cell::Cell;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};

use owid_tests_collector::app::{Collector, RunOptions};
use owid_tests_collector::config::{CollectorConfig, ConfigLoader, ResolvedConfig};
use owid_tests_collector::error::CollectorError;
use owid_tests_collector::output::JsonOutput;
use owid_tests_collector::source::SourceClient;

const COUNTRY_CODES: &str = r#"[
    {"name": "Germany", "alpha-2": "DE", "alpha-3": "DEU"},
    {"name": "France", "alpha-2": "FR", "alpha-3": "FRA"}
]"#;

const OBSERVATIONS: &str = "\
Entity,ISO code,Date,Source URL,Source label,Notes,Short-term tests per case
Germany - tests performed,DEU,2021-01-01,https://rki.de,Robert Koch Institut,,50000
Germany - tests performed,DEU,2021-01-03,,,,25000
Germany - samples tested,DEU,2021-01-02,,,,10
France - tests performed,FRA,2021-01-01,,Santé publique France,,
France - tests performed,FRA,2021-01-02,https://sante.fr,Santé publique France,,20
Kosovo - tests performed,OWID_KOS,2021-01-01,,,,10
";

struct MockSource {
    body: &'static str,
    calls: Cell<usize>,
}

impl MockSource {
    fn new(body: &'static str) -> Self {
        Self {
            body,
            calls: Cell::new(0),
        }
    }
}

impl SourceClient for MockSource {
    fn download(&self, _url: &str, destination: &mut dyn io::Write) -> Result<u64, CollectorError> {
        self.calls.set(self.calls.get() + 1);
        destination
            .write_all(self.body.as_bytes())
            .map_err(|err| CollectorError::Filesystem(err.to_string()))?;
        Ok(self.body.len() as u64)
    }
}

fn workspace(root: &Utf8Path) -> ResolvedConfig {
    let config = CollectorConfig {
        input_file: Some("owid.csv".into()),
        reference_file: Some("countries.json".into()),
        output_base_dir: Some("data".into()),
        manifest_path: None,
        source_url: Some("https://example.org/owid.csv".to_string()),
    };
    std::fs::write(root.join("countries.json"), COUNTRY_CODES).unwrap();
    std::fs::create_dir_all(root.join("data")).unwrap();
    std::fs::write(root.join("data").join("dataset.json"), r#"{"regions": []}"#).unwrap();
    ConfigLoader::resolve_config(root, config)
}

fn read_json(path: Utf8PathBuf) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path.as_std_path()).unwrap()).unwrap()
}

#[test]
fn run_writes_artifacts_and_manifest() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let config = workspace(&root);
    let collector = Collector::new(config, MockSource::new(OBSERVATIONS));

    let summary = collector.run(&RunOptions::default(), &JsonOutput).unwrap();
    assert!(summary.source_downloaded);
    assert_eq!(summary.countries.len(), 3);
    assert_eq!(summary.rows.rows_read, 6);
    assert_eq!(summary.rows.skipped_data_type, 1);
    assert_eq!(summary.rows.skipped_rate, 1);

    let germany = read_json(root.join("data/de/tests-OWID.json"));
    assert_eq!(germany["startDate"], "2021-01-01");
    assert_eq!(germany["versionDate"], "2021-01-03");
    assert_eq!(germany["data"], serde_json::json!([2, 0, 4]));
    assert_eq!(germany["source"]["name"], "Data collected by OWID from Robert Koch Institut");
    assert_eq!(germany["source"]["url"], "https://rki.de");

    let france = read_json(root.join("data/fr/tests-OWID.json"));
    assert_eq!(france["startDate"], "2021-01-02");
    assert_eq!(france["data"], serde_json::json!([5000]));

    let raw = std::fs::read_to_string(root.join("data/fr/tests-OWID.json")).unwrap();
    assert!(raw.contains("Santé publique France"));

    assert!(root.join("data/owid_kos/tests-OWID.json").exists());

    let manifest = read_json(root.join("data/dataset.json"));
    let paths = manifest["regions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|region| region["path"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(paths, vec!["de", "fr"]);
    // New regions are named after the OWID entity label, as the manifest
    // consumers have always received them.
    assert_eq!(manifest["regions"][0]["name"], "Germany - tests performed");
    assert_eq!(manifest["regions"][1]["name"], "France - tests performed");
    assert_eq!(summary.manifest.skipped_codes, vec!["owid_kos".to_string()]);
}

#[test]
fn second_run_is_byte_identical() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let config = workspace(&root);
    let source = MockSource::new(OBSERVATIONS);
    let collector = Collector::new(config, source);

    collector.run(&RunOptions::default(), &JsonOutput).unwrap();
    let first = std::fs::read(root.join("data/dataset.json")).unwrap();
    let summary = collector.run(&RunOptions::default(), &JsonOutput).unwrap();
    let second = std::fs::read(root.join("data/dataset.json")).unwrap();

    assert_eq!(first, second);
    assert!(!summary.source_downloaded);
    assert_eq!(summary.manifest.regions_added, 0);
    assert_eq!(summary.manifest.datasets_updated, 2);
}

#[test]
fn missing_manifest_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let config = workspace(&root);
    std::fs::remove_file(root.join("data/dataset.json")).unwrap();
    let collector = Collector::new(config, MockSource::new(OBSERVATIONS));

    let err = collector.run(&RunOptions::default(), &JsonOutput).unwrap_err();
    assert!(matches!(err, CollectorError::MissingManifest(_)));
}

#[test]
fn missing_reference_aborts_before_download() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let config = workspace(&root);
    std::fs::remove_file(root.join("countries.json")).unwrap();
    let source = MockSource::new(OBSERVATIONS);
    let collector = Collector::new(config, source);

    let err = collector.run(&RunOptions::default(), &JsonOutput).unwrap_err();
    assert!(matches!(err, CollectorError::MissingReference(_)));
    assert!(!root.join("owid.csv").exists());
}
