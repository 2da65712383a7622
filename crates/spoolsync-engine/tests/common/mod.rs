//! Shared fixtures for engine tests: template dirs, filaments, a recording store

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use spoolsync_core::{Filament, Result, Spool, SuffixSet};
use spoolsync_engine::{ArtifactStore, ProgramInfo, Reconciler, TemplateSet};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const OUT: &str = "/out";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Write(PathBuf),
    Remove(PathBuf),
}

/// In-memory store that records every write and removal.
#[derive(Default)]
pub struct RecordingStore {
    files: Mutex<BTreeMap<PathBuf, String>>,
    ops: Mutex<Vec<Op>>,
    fail_writes: AtomicBool,
}

impl RecordingStore {
    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    /// Make every following write fail until switched off again.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn clear_ops(&self) {
        self.ops.lock().unwrap().clear();
    }

    pub fn writes(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, Op::Write(_)))
            .count()
    }

    pub fn removes(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, Op::Remove(_)))
            .count()
    }

    pub fn files(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn content(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    async fn write(&self, path: &Path, content: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        self.ops.lock().unwrap().push(Op::Write(path.to_path_buf()));
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        self.ops.lock().unwrap().push(Op::Remove(path.to_path_buf()));
        Ok(())
    }
}

/// Templates used by most tests: an ini and a json/info default plus a PLA ini.
pub const STANDARD_TEMPLATES: &[(&str, &str)] = &[
    ("default.ini.template", "name = {{ vendor.name }} {{ name }}\nmaterial = {{ material }}"),
    ("PLA.ini.template", "; PLA\nname = {{ vendor.name }} {{ name }}\ntemp = {{ extruder_temp }}"),
    ("default.json.template", "{\"name\": \"{{ name }}\"}"),
    ("default.info.template", "id = {{ id }}"),
];

pub fn template_dir(templates: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, source) in templates {
        std::fs::write(dir.path().join(name), source).unwrap();
    }
    dir
}

pub fn template_set(dir: &TempDir) -> TemplateSet {
    TemplateSet::from_dir(dir.path(), ProgramInfo::new("spoolsync", "0.1.0"))
}

pub fn engine(dir: &TempDir, suffixes: &[&str]) -> (Reconciler, Arc<RecordingStore>) {
    let store = Arc::new(RecordingStore::default());
    let engine = Reconciler::new(
        SuffixSet::new(suffixes.iter().copied()),
        OUT,
        template_set(dir),
        store.clone(),
    );
    (engine, store)
}

pub fn filament(id: u64, vendor: &str, name: &str, material: Option<&str>) -> Filament {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "vendor": { "id": 1, "name": vendor },
        "material": material,
        "extruder_temp": 210,
    }))
    .unwrap()
}

pub fn spool(id: u64, filament: &Filament) -> Spool {
    Spool {
        id,
        filament: filament.clone(),
        attributes: Default::default(),
    }
}

pub fn out(name: &str) -> PathBuf {
    Path::new(OUT).join(name)
}
