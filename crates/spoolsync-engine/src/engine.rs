//! Reconciliation engine: keeps the output directory in step with filaments
//!
//! State:
//!   filenames  ArtifactKey -> file it was last materialized to (one per key)
//!   refcounts  file -> number of keys currently mapped to it
//!   contents   ArtifactKey -> (file, text) last written for that key
//!
//! A file exists on disk exactly while its refcount is at least one. The
//! only exception is `retire(.., is_rename = true)`, which keeps a file whose
//! refcount drops to zero when the update is about to write the very same
//! filename again.
//!
//! Every write goes through prepare (render, no state touched) and commit
//! (write, then bind). A key is only ever bound to a file that was written.

use crate::store::ArtifactStore;
use crate::templates::TemplateSet;
use spoolsync_core::{ArtifactKey, Error, Filament, FilamentId, Result, Suffix, SuffixSet};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
struct Written {
    path: PathBuf,
    text: String,
}

pub struct Reconciler {
    suffixes: SuffixSet,
    output_dir: PathBuf,
    templates: TemplateSet,
    store: Arc<dyn ArtifactStore>,
    filenames: HashMap<ArtifactKey, PathBuf>,
    refcounts: HashMap<PathBuf, usize>,
    contents: HashMap<ArtifactKey, Written>,
}

impl Reconciler {
    pub fn new(
        suffixes: SuffixSet,
        output_dir: impl Into<PathBuf>,
        templates: TemplateSet,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            suffixes,
            output_dir: output_dir.into(),
            templates,
            store,
            filenames: HashMap::new(),
            refcounts: HashMap::new(),
            contents: HashMap::new(),
        }
    }

    pub fn suffixes(&self) -> &SuffixSet {
        &self.suffixes
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Number of artifact keys currently mapped to `path`.
    pub fn refcount(&self, path: &Path) -> usize {
        self.refcounts.get(path).copied().unwrap_or(0)
    }

    pub fn filename_for(&self, key: &ArtifactKey) -> Option<&Path> {
        self.filenames.get(key).map(PathBuf::as_path)
    }

    /// Whether any artifact of this filament is currently materialized.
    pub fn is_tracked(&self, filament: FilamentId) -> bool {
        self.filenames.keys().any(|k| k.filament == filament)
    }

    /// All files the engine believes exist, sorted.
    pub fn tracked_files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = self.refcounts.keys().map(PathBuf::as_path).collect();
        files.sort();
        files
    }

    /// Output path for `filament` rendered as `suffix`.
    pub fn resolve_path(&self, filament: &Filament, suffix: &Suffix) -> Result<PathBuf> {
        let name = self.templates.filename(filament, suffix)?;
        Ok(self.output_dir.join(name))
    }

    /// Make sure the artifact for (`filament`, `suffix`) exists with current content.
    ///
    /// Writes at most once; an unchanged filename and unchanged text is a no-op.
    pub async fn materialize(&mut self, filament: &Filament, suffix: &Suffix) -> Result<()> {
        let (key, next) = self.prepare(filament, suffix)?;
        self.commit(key, next).await
    }

    /// Drop the artifact for (`filament`, `suffix`).
    ///
    /// No-op when nothing is cached for the key. The file is deleted once no
    /// other key references it, unless `is_rename` is set and `filament` would
    /// be written to that same file again.
    pub async fn retire(
        &mut self,
        filament: &Filament,
        suffix: &Suffix,
        is_rename: bool,
    ) -> Result<()> {
        self.check_suffix(suffix)?;
        let key = ArtifactKey::new(filament.id, suffix.clone());
        let Some(path) = self.filenames.get(&key).cloned() else {
            debug!("Nothing materialized for {}", key);
            return Ok(());
        };

        let keep = is_rename && self.resolve_path(filament, suffix)? == path;
        self.filenames.remove(&key);
        self.release(&path, keep).await
    }

    /// Update protocol. The replacement is rendered and written before the
    /// old artifact is released, so a failed render or write leaves the
    /// previous file and its binding untouched. A changed filename moves the
    /// file; an unchanged one overwrites in place or does nothing.
    pub async fn reconcile(&mut self, filament: &Filament, suffix: &Suffix) -> Result<()> {
        let (key, next) = self.prepare(filament, suffix)?;
        if let Some(old) = self.filenames.get(&key).filter(|old| **old != next.path) {
            debug!("{} moves from {} to {}", key, old.display(), next.path.display());
        }
        self.commit(key, next).await
    }

    pub async fn materialize_all(&mut self, filament: &Filament) -> Result<()> {
        for suffix in self.suffix_list() {
            self.materialize(filament, &suffix).await?;
        }
        Ok(())
    }

    pub async fn retire_all(&mut self, filament: &Filament) -> Result<()> {
        for suffix in self.suffix_list() {
            self.retire(filament, &suffix, false).await?;
        }
        Ok(())
    }

    pub async fn reconcile_all(&mut self, filament: &Filament) -> Result<()> {
        for suffix in self.suffix_list() {
            self.reconcile(filament, &suffix).await?;
        }
        Ok(())
    }

    fn suffix_list(&self) -> Vec<Suffix> {
        self.suffixes.iter().cloned().collect()
    }

    fn check_suffix(&self, suffix: &Suffix) -> Result<()> {
        if self.suffixes.contains(suffix) {
            Ok(())
        } else {
            Err(Error::unknown_suffix(suffix.as_str()))
        }
    }

    /// Everything fallible that does not touch state: suffix check, filename, text.
    fn prepare(&self, filament: &Filament, suffix: &Suffix) -> Result<(ArtifactKey, Written)> {
        self.check_suffix(suffix)?;
        let path = self.resolve_path(filament, suffix)?;
        let text = self.templates.render(filament, suffix)?;
        Ok((ArtifactKey::new(filament.id, suffix.clone()), Written { path, text }))
    }

    /// Write `next` unless the memo already has it, then bind `key` to its
    /// file. Nothing is bound or released until the write has succeeded.
    async fn commit(&mut self, key: ArtifactKey, next: Written) -> Result<()> {
        let path = next.path.clone();
        if self.contents.get(&key) == Some(&next) {
            debug!("Unchanged: {}", path.display());
        } else {
            info!("Writing to: {}", path.display());
            self.store.write(&next.path, &next.text).await?;
            // Whatever other keys last wrote to this file is gone now.
            self.contents.retain(|k, w| k == &key || w.path != path);
            self.contents.insert(key.clone(), next);
        }
        self.bind(&key, &path).await
    }

    /// Map `key` to `path`, moving its reference off any previous file.
    async fn bind(&mut self, key: &ArtifactKey, path: &Path) -> Result<()> {
        let previous = self.filenames.insert(key.clone(), path.to_path_buf());
        if previous.as_deref() == Some(path) {
            return Ok(());
        }

        *self.refcounts.entry(path.to_path_buf()).or_insert(0) += 1;
        self.warn_on_collision(key, path);

        // Rename, or a usage event that reached the key before the rename.
        if let Some(previous) = previous {
            self.release(&previous, false).await?;
        }
        Ok(())
    }

    /// Drop one reference to `path`, deleting the file at zero unless `keep`.
    async fn release(&mut self, path: &Path, keep: bool) -> Result<()> {
        let remaining = match self.refcounts.get_mut(path) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if remaining > 0 {
            debug!("{} still used by {} artifact(s)", path.display(), remaining);
            return Ok(());
        }

        self.refcounts.remove(path);
        if keep {
            debug!("Keeping {} for rewrite", path.display());
            return Ok(());
        }

        info!("Deleting: {}", path.display());
        self.contents.retain(|_, w| w.path != path);
        self.store.remove(path).await
    }

    fn warn_on_collision(&self, key: &ArtifactKey, path: &Path) {
        let other = self
            .filenames
            .iter()
            .find(|(k, p)| k.filament != key.filament && p.as_path() == path)
            .map(|(k, _)| k.filament);
        if let Some(other) = other {
            warn!(
                "Filaments {} and {} both map to {}; the last write wins",
                other,
                key.filament,
                path.display()
            );
        }
    }
}
