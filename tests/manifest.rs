use camino::Utf8PathBuf;

use owid_tests_collector::domain::CountryCode;
use owid_tests_collector::manifest::{
    DatasetDescriptor, RegionEntry, load_manifest, merge_manifest, save_manifest,
};

const SEED: &str = r#"{
    "regions": [
        {
            "name": "Schweiz",
            "path": "ch",
            "datasets": [
                {
                    "title": "Cases (BAG)",
                    "description": "Confirmed cases",
                    "filename": "cases-BAG.json"
                }
            ]
        }
    ]
}"#;

#[test]
fn save_and_reload_preserves_existing_regions() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("dataset.json")).unwrap();
    std::fs::write(path.as_std_path(), SEED).unwrap();

    let entries = vec![
        RegionEntry {
            name: "Switzerland - tests performed".to_string(),
            code: CountryCode::new("CH"),
        },
        RegionEntry {
            name: "Österreich - tests performed".to_string(),
            code: CountryCode::new("AT"),
        },
    ];
    let descriptor = DatasetDescriptor::owid_tests();

    let (merged, changes) = merge_manifest(load_manifest(&path).unwrap(), &entries, &descriptor).unwrap();
    assert_eq!(changes.datasets_added, 1);
    assert_eq!(changes.regions_added, 1);
    save_manifest(&path, &merged).unwrap();
    let first = std::fs::read_to_string(path.as_std_path()).unwrap();
    assert!(first.contains("\"name\": \"Österreich - tests performed\""));

    let (merged, _) = merge_manifest(load_manifest(&path).unwrap(), &entries, &descriptor).unwrap();
    save_manifest(&path, &merged).unwrap();
    let second = std::fs::read_to_string(path.as_std_path()).unwrap();
    assert_eq!(first, second);

    let reloaded = load_manifest(&path).unwrap();
    assert_eq!(reloaded.regions()[0]["name"], "Schweiz");
    assert_eq!(reloaded.regions()[0]["datasets"].as_array().unwrap().len(), 2);
    assert_eq!(reloaded.regions()[1]["path"], "at");
}

#[test]
fn foreign_descriptor_without_description_survives_run() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("dataset.json")).unwrap();
    std::fs::write(
        path.as_std_path(),
        r#"{"version": 2, "regions": [{"path": "ch", "name": "Schweiz", "datasets": [{"title": "Map", "filename": "map.json"}]}]}"#,
    )
    .unwrap();

    let entries = vec![RegionEntry {
        name: "Switzerland - tests performed".to_string(),
        code: CountryCode::new("CH"),
    }];
    let (merged, changes) = merge_manifest(
        load_manifest(&path).unwrap(),
        &entries,
        &DatasetDescriptor::owid_tests(),
    )
    .unwrap();
    assert_eq!(changes.datasets_added, 1);
    save_manifest(&path, &merged).unwrap();

    let written = std::fs::read_to_string(path.as_std_path()).unwrap();
    let version = written.find("\"version\"").unwrap();
    let regions = written.find("\"regions\"").unwrap();
    assert!(version < regions);
    let region_path = written.find("\"path\": \"ch\"").unwrap();
    let region_name = written.find("\"name\": \"Schweiz\"").unwrap();
    assert!(region_path < region_name);

    let reloaded: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(
        reloaded["regions"][0]["datasets"][0],
        serde_json::json!({"title": "Map", "filename": "map.json"})
    );
}
