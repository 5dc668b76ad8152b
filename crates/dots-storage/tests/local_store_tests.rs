//! Local ubiquity-container store against a temporary directory

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use dots_fs::compute_bytes_checksum;
use dots_meta::{Category, Priority, ProviderConfig, ProviderKind, TrackedFile};
use dots_storage::{Error, LocalStoreBackend, StorageBackend};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use uuid::Uuid;

fn tracked(filename: &str, category: Category, is_safe: bool) -> TrackedFile {
    TrackedFile {
        id: Uuid::new_v4(),
        path: PathBuf::from("/home/me").join(filename),
        relative_path: filename.to_string(),
        filename: filename.to_string(),
        category,
        size: 0,
        modified: Utc::now(),
        checksum: String::new(),
        is_safe,
        priority: Priority::Medium,
        is_directory: false,
    }
}

fn store(container: &Path) -> LocalStoreBackend {
    let config = ProviderConfig {
        kind: ProviderKind::LocalStore,
        container: Some(container.to_path_buf()),
        ..ProviderConfig::default()
    };
    LocalStoreBackend::new(&config, Some("identity".into()))
        .with_materialize_wait(Duration::from_millis(600))
}

#[tokio::test]
async fn upload_then_download_is_byte_exact() {
    let dir = TempDir::new().unwrap();
    let backend = store(dir.path());
    let file = tracked(".zshrc", Category::Shell, true);
    let bytes = b"export PATH=$HOME/bin:$PATH\n\x00\xff".to_vec();

    backend.upload(&file, &bytes).await.unwrap();

    assert!(dir.path().join("dot-sync/configs/shell/.zshrc").is_file());
    assert_eq!(backend.download(&file).await.unwrap(), bytes);
}

#[tokio::test]
async fn listing_uses_shared_key_layout_and_skips_artifacts() {
    let dir = TempDir::new().unwrap();
    let backend = store(dir.path());
    backend
        .upload(&tracked(".gitconfig", Category::Git, true), b"[user]\n")
        .await
        .unwrap();
    backend
        .upload(&tracked(".zshrc", Category::Shell, true), b"alias g=git\n")
        .await
        .unwrap();
    fs::write(dir.path().join("dot-sync/configs/shell/..vimrc.icloud"), b"").unwrap();

    let objects = backend.list_files().await.unwrap();
    let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["dot-sync/configs/git/.gitconfig", "dot-sync/configs/shell/.zshrc"]
    );
    assert_eq!(
        objects[0].checksum.as_deref(),
        Some(compute_bytes_checksum(b"[user]\n").as_str())
    );
    assert_eq!(objects[1].size, 12);
}

#[tokio::test]
async fn stored_copy_keeps_source_mtime() {
    let dir = TempDir::new().unwrap();
    let backend = store(dir.path());
    let mut file = tracked(".zshrc", Category::Shell, true);
    file.modified = Utc::now() - chrono::Duration::minutes(10);

    backend.upload(&file, b"alias g=git\n").await.unwrap();

    let remote = backend.get_metadata(&file).await.unwrap().unwrap();
    assert_eq!(remote.modified.timestamp(), file.modified.timestamp());
    let listed = backend.list_files().await.unwrap();
    assert_eq!(listed[0].modified.timestamp(), file.modified.timestamp());
}

#[tokio::test]
async fn empty_container_lists_nothing() {
    let dir = TempDir::new().unwrap();
    assert!(store(dir.path()).list_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn unsafe_file_is_refused_without_writing() {
    let dir = TempDir::new().unwrap();
    let backend = store(dir.path());
    let file = tracked(".npmrc", Category::Language, false);

    let err = backend.upload(&file, b"//registry:_authToken=x").await.unwrap_err();

    assert!(matches!(err, Error::ContainsCredentials { .. }));
    assert!(!dir.path().join("dot-sync/configs/language/.npmrc").exists());
}

#[tokio::test]
async fn delete_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let backend = store(dir.path());
    let file = tracked(".vimrc", Category::Editor, true);

    backend.upload(&file, b"set number\n").await.unwrap();
    backend.delete(&file).await.unwrap();
    backend.delete(&file).await.unwrap();

    assert!(backend.get_metadata(&file).await.unwrap().is_none());
}

#[tokio::test]
async fn metadata_reports_size_and_checksum() {
    let dir = TempDir::new().unwrap();
    let backend = store(dir.path());
    let file = tracked(".vimrc", Category::Editor, true);
    backend.upload(&file, b"syntax on\n").await.unwrap();

    let meta = backend.get_metadata(&file).await.unwrap().unwrap();

    assert_eq!(meta.key, "dot-sync/configs/editor/.vimrc");
    assert_eq!(meta.size, 10);
    assert_eq!(meta.checksum, Some(compute_bytes_checksum(b"syntax on\n")));
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = store(dir.path())
        .download(&tracked(".tmux.conf", Category::Shell, true))
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn placeholder_that_never_materializes_times_out() {
    let dir = TempDir::new().unwrap();
    let shell_dir = dir.path().join("dot-sync/configs/shell");
    fs::create_dir_all(&shell_dir).unwrap();
    fs::write(shell_dir.join("..zshrc.icloud"), b"").unwrap();

    let err = store(dir.path())
        .download(&tracked(".zshrc", Category::Shell, true))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DownloadFailed { .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn placeholder_download_waits_for_materialization() {
    let dir = TempDir::new().unwrap();
    let shell_dir = dir.path().join("dot-sync/configs/shell");
    fs::create_dir_all(&shell_dir).unwrap();
    fs::write(shell_dir.join("..zshrc.icloud"), b"").unwrap();

    let backend = store(dir.path()).with_materialize_wait(Duration::from_secs(10));
    let daemon_dir = shell_dir.clone();
    let daemon = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        fs::write(daemon_dir.join(".zshrc"), b"materialized\n").unwrap();
        fs::remove_file(daemon_dir.join("..zshrc.icloud")).unwrap();
    });

    let bytes = backend
        .download(&tracked(".zshrc", Category::Shell, true))
        .await
        .unwrap();
    daemon.await.unwrap();

    assert_eq!(bytes, b"materialized\n");
}

#[tokio::test]
async fn connection_test_requires_identity_token() {
    let dir = TempDir::new().unwrap();
    let config = ProviderConfig {
        kind: ProviderKind::LocalStore,
        container: Some(dir.path().to_path_buf()),
        ..ProviderConfig::default()
    };

    assert!(!LocalStoreBackend::new(&config, None).test_connection().await);
    assert!(!LocalStoreBackend::new(&config, Some(String::new())).test_connection().await);
    assert!(LocalStoreBackend::new(&config, Some("identity".into())).test_connection().await);

    let leftovers: Vec<_> = fs::read_dir(dir.path().join("dot-sync/configs"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".dotsync-probe-"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn unconfigured_store_reports_not_configured() {
    let backend = LocalStoreBackend::new(&ProviderConfig::default(), Some("identity".into()));
    assert!(!backend.is_configured());
    assert!(matches!(
        backend.list_files().await,
        Err(Error::NotConfigured { .. })
    ));
}
