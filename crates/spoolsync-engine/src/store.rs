//! Artifact output: where rendered configs end up
//!
//! The engine only ever overwrites or removes whole files, so the store
//! seam is two calls wide. `FsStore` is the real one; tests plug in
//! recorders.

use async_trait::async_trait;
use spoolsync_core::{Result, SuffixSet};
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Replace the file at `path` with `content`, creating parent directories.
    async fn write(&self, path: &Path, content: &str) -> Result<()>;

    /// Remove the file at `path`. Removing a file that is already gone is not an error.
    async fn remove(&self, path: &Path) -> Result<()>;
}

/// Writes artifacts straight to the local filesystem.
#[derive(Clone, Debug, Default)]
pub struct FsStore;

#[async_trait]
impl ArtifactStore for FsStore {
    async fn write(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;
        debug!("write: {} ({} bytes)", path.display(), content.len());
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} was already gone", path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Delete every file in `dir` whose extension belongs to `suffixes`.
/// Returns how many files were removed. A missing directory counts as empty.
pub async fn purge_dir(dir: &Path, suffixes: &SuffixSet) -> Result<usize> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if !suffixes.matches_file(&name.to_string_lossy()) {
            continue;
        }
        let path = entry.path();
        info!("Deleting: {}", path.display());
        fs::remove_file(&path).await?;
        removed += 1;
    }
    Ok(removed)
}
