use dots_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
struct WatchSettings {
    debounce_secs: u64,
    auto_sync: bool,
}

#[test]
fn test_load_toml() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("config.toml");
    fs::write(&file_path, "debounce_secs = 5\nauto_sync = true").unwrap();

    let config: WatchSettings = ConfigStore::new()
        .load(&NormalizedPath::new(&file_path))
        .unwrap();

    assert_eq!(
        config,
        WatchSettings {
            debounce_secs: 5,
            auto_sync: true
        }
    );
}

#[test]
fn test_load_yaml() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("config.yml");
    fs::write(&file_path, "debounce_secs: 2\nauto_sync: false").unwrap();

    let config: WatchSettings = ConfigStore::new()
        .load(&NormalizedPath::new(&file_path))
        .unwrap();

    assert_eq!(config.debounce_secs, 2);
    assert!(!config.auto_sync);
}

#[test]
fn test_save_then_load_json() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("state.json"));
    let store = ConfigStore::new();

    let config = WatchSettings {
        debounce_secs: 9,
        auto_sync: true,
    };
    store.save(&path, &config).unwrap();

    let raw = fs::read_to_string(path.to_native()).unwrap();
    assert!(raw.contains("\"debounce_secs\": 9"));
    let loaded: WatchSettings = store.load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_or_default_missing_file() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("absent.toml"));

    let config: WatchSettings = ConfigStore::new().load_or_default(&path).unwrap();

    assert_eq!(config, WatchSettings::default());
}

#[test]
fn test_malformed_toml_reports_parse_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("config.toml");
    fs::write(&file_path, "debounce_secs = [").unwrap();

    let result: dots_fs::Result<WatchSettings> =
        ConfigStore::new().load(&NormalizedPath::new(&file_path));

    assert!(matches!(result, Err(dots_fs::Error::ConfigParse { .. })));
}

#[test]
fn test_unsupported_extension() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("config.ini");
    fs::write(&file_path, "x=1").unwrap();

    let result: dots_fs::Result<WatchSettings> =
        ConfigStore::new().load(&NormalizedPath::new(&file_path));

    match result {
        Err(dots_fs::Error::UnsupportedFormat { extension }) => assert_eq!(extension, "ini"),
        other => panic!("Expected UnsupportedFormat, got {:?}", other),
    }
}
