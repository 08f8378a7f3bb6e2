//! Integration tests for the configuration and ignore-filter documents

use hostward_config::{Config, IgnoreFilterStore, parse_filter};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_points_store_at_configured_document() {
    let temp = TempDir::new().unwrap();
    let diagnosis_yml = temp.path().join("diagnosis.yml");
    let config_path = temp.path().join("config.toml");

    fs::write(
        &config_path,
        format!(
            "[paths]\ndiagnosis_config = \"{}\"\n",
            diagnosis_yml.display()
        ),
    )
    .unwrap();

    let config = Config::load_or_default(Some(&config_path)).unwrap();
    let store = IgnoreFilterStore::new(&config.paths.diagnosis_config);

    let (category, criteria) = parse_filter(&["dnsrecords", "domain=example.org"]).unwrap();
    assert!(store.add(&category, criteria.clone()).unwrap());

    // A fresh store over the same file sees the filter
    let reopened = IgnoreFilterStore::new(&diagnosis_yml);
    assert_eq!(reopened.filters_for("dnsrecords").unwrap(), vec![criteria]);
}

#[test]
fn test_hand_written_document_round_trips_through_edits() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("diagnosis.yml");
    fs::write(
        &path,
        r"# edited by hand
ignore_filters:
  ports:
    - port: 25
    - port: 587
  basesystem:
    - {}
",
    )
    .unwrap();

    let store = IgnoreFilterStore::new(&path);
    let (category, criteria) = parse_filter(&["ports", "port=25"]).unwrap();
    store.remove(&category, &criteria).unwrap();

    let filters = store.filters().unwrap();
    assert_eq!(filters["ports"].len(), 1);
    assert_eq!(filters["ports"][0]["port"], "587");
    assert_eq!(filters["basesystem"].len(), 1);
    assert!(filters["basesystem"][0].is_empty());
}
