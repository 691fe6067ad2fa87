//! On-disk layout: JSON records and cached build artifacts.
//!
//! ```text
//! <storage>/pt_solidity_build_version
//! <storage>/<kind_plural>/<name>.json
//! <storage>/<kind_plural>/build/<name>.{sol,bin,abi}
//! ```

use crate::core::records::{ArtifactKind, Record};
use crate::{debug, info, warn};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Version of the generated contract templates. Changing it invalidates
/// every cached binary.
pub const BUILD_VERSION: &str = "ctor-v1";

pub const BUILD_VERSION_FILE: &str = "pt_solidity_build_version";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("directory {0} does not exist")]
    MissingDirectory(PathBuf),
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

pub fn records_dir(storage: &Path, kind: ArtifactKind) -> PathBuf {
    storage.join(kind.plural())
}

pub fn build_dir(storage: &Path, kind: ArtifactKind) -> PathBuf {
    records_dir(storage, kind).join("build")
}

/// Creates `<kind>/build` for every kind.
pub async fn ensure_layout(storage: &Path) -> io::Result<()> {
    for kind in ArtifactKind::ALL {
        tokio::fs::create_dir_all(build_dir(storage, kind)).await?;
    }
    Ok(())
}

/// Writes `record` to `<storage>/<kind>/<name>.json`.
pub async fn save_record<R: Record>(storage: &Path, record: &R) -> Result<(), StorageError> {
    let dir = records_dir(storage, R::KIND);
    if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
        return Err(StorageError::MissingDirectory(dir));
    }
    let json = serde_json::to_string_pretty(record)?;
    tokio::fs::write(dir.join(format!("{}.json", record.name())), json).await?;
    Ok(())
}

/// Reads every `*.json` record of one kind, keyed by file stem.
///
/// Files that cannot be read or parsed are logged and skipped.
pub async fn load_records<R: Record>(storage: &Path) -> io::Result<BTreeMap<String, R>> {
    let dir = records_dir(storage, R::KIND);
    let mut records = BTreeMap::new();
    let mut entries = tokio::fs::read_dir(&dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        debug!("Found JSON file: {}", path.display());
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to open {}: {}", path.display(), e);
                continue;
            }
        };
        match serde_json::from_str::<R>(&text) {
            Ok(record) => {
                records.insert(stem.to_string(), record);
            }
            Err(e) => warn!("Skipping unparsable record {}: {}", path.display(), e),
        }
    }
    Ok(records)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != io::ErrorKind::NotFound
    {
        debug!("Failed to remove '{}': {}", path.display(), e);
    }
}

/// Deletes the cached `.bin` and `.abi` of `name`.
pub async fn remove_build_artifacts(build_dir: &Path, name: &str) {
    remove_quietly(&build_dir.join(format!("{}.bin", name))).await;
    remove_quietly(&build_dir.join(format!("{}.abi", name))).await;
}

pub async fn remove_file(path: &Path) {
    remove_quietly(path).await;
}

/// Clears stale cached binaries when the template version changed.
///
/// Returns whether anything had to be cleaned.
pub async fn ensure_build_version(storage: &Path) -> io::Result<bool> {
    let marker = storage.join(BUILD_VERSION_FILE);
    let current = tokio::fs::read_to_string(&marker)
        .await
        .map(|s| s.lines().next().unwrap_or_default().to_string())
        .unwrap_or_default();
    if current == BUILD_VERSION {
        debug!("Build cache version is up-to-date: {}", BUILD_VERSION);
        return Ok(false);
    }
    info!(
        "Build cache version changed from '{}' to '{}', cleaning stale artifacts",
        if current.is_empty() { "<none>" } else { &current },
        BUILD_VERSION
    );

    for kind in ArtifactKind::ALL {
        let dir = build_dir(storage, kind);
        let mut removed = 0usize;
        if tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let ext = path.extension().and_then(|e| e.to_str());
                if matches!(ext, Some("bin" | "abi")) && entry.file_type().await?.is_file() {
                    tokio::fs::remove_file(&path).await?;
                    removed += 1;
                }
            }
        }
        info!("Build cleanup '{}': removed {} cached artifacts", kind.plural(), removed);
    }

    tokio::fs::create_dir_all(storage).await?;
    tokio::fs::write(&marker, BUILD_VERSION).await?;
    Ok(true)
}
