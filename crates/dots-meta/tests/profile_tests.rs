//! Sync profile selection rules

use std::path::PathBuf;

use chrono::Utc;
use dots_meta::{AppConfig, Category, Priority, ProviderKind, SyncProfile, TrackedFile};
use dots_fs::NormalizedPath;
use pretty_assertions::assert_eq;
use uuid::Uuid;

fn file(relative: &str, category: Category) -> TrackedFile {
    let filename = relative.rsplit('/').next().unwrap_or(relative).to_string();
    TrackedFile {
        id: Uuid::new_v4(),
        path: PathBuf::from("/home/me").join(relative),
        relative_path: relative.to_string(),
        filename,
        category,
        size: 1,
        modified: Utc::now(),
        checksum: String::new(),
        is_safe: true,
        priority: Priority::Low,
        is_directory: false,
    }
}

#[test]
fn minimal_profile_keeps_shell_and_git_only() {
    let profile = SyncProfile::minimal();
    assert!(profile.includes(&file(".zshrc", Category::Shell)));
    assert!(profile.includes(&file(".gitconfig", Category::Git)));
    assert!(!profile.includes(&file(".vimrc", Category::Editor)));
}

#[test]
fn exclude_beats_include_beats_category() {
    let profile = SyncProfile::minimal()
        .including(".vimrc")
        .including(".bashrc")
        .excluding(".bashrc");

    assert!(profile.includes(&file(".vimrc", Category::Editor)));
    assert!(!profile.includes(&file(".bashrc", Category::Shell)));
}

#[test]
fn builtin_lookup_is_case_insensitive() {
    let names: Vec<String> = SyncProfile::builtin().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Full", "Minimal", "Work", "Home"]);
    assert_eq!(SyncProfile::builtin_named("work").map(|p| p.name), Some("Work".to_string()));
    assert!(SyncProfile::builtin_named("travel").is_none());
}

#[test]
fn app_config_round_trips_through_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = NormalizedPath::new(dir.path().join("config.toml"));

    let mut config = AppConfig::default();
    config.provider = Some(dots_meta::ProviderConfig {
        kind: ProviderKind::Azure,
        bucket: "dotfiles".into(),
        account: Some("myaccount".into()),
        ..Default::default()
    });
    config.watcher.auto_sync = true;
    config.save(&path).unwrap();

    let loaded = AppConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_config_file_loads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = NormalizedPath::new(dir.path().join("absent.toml"));
    assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());
}

#[test]
fn partial_toml_fills_defaults() {
    let raw = r#"
        active_profile = "Work"

        [provider]
        kind = "s3"
        bucket = "my-dots"
        region = "eu-west-1"
    "#;
    let config: AppConfig = toml::from_str(raw).unwrap();
    let provider = config.provider.unwrap();
    assert_eq!(provider.kind, ProviderKind::S3);
    assert_eq!(provider.root_folder, "dot-sync");
    assert_eq!(provider.region_or_default(), "eu-west-1");
    assert_eq!(config.watcher.debounce_secs, 5);
}
