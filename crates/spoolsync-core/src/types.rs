//! Core types for Spoolsync

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

pub type FilamentId = u64;
pub type SpoolId = u64;

/// Filament manufacturer as reported by Spoolman.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A filament record. Only the fields the sync logic looks at are typed;
/// everything else is kept in `attributes` so templates can use it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filament {
    pub id: FilamentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<Vendor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Filament {
    pub fn vendor_name(&self) -> Option<&str> {
        self.vendor.as_ref().map(|v| v.name.as_str())
    }

    /// Short human label for log lines, e.g. "Acme PLA Red (#7)".
    pub fn label(&self) -> String {
        match (self.vendor_name(), self.name.as_deref()) {
            (Some(vendor), Some(name)) => format!("{} {} (#{})", vendor, name, self.id),
            (None, Some(name)) => format!("{} (#{})", name, self.id),
            _ => format!("filament #{}", self.id),
        }
    }
}

/// A spool: one physical roll of some filament.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spool {
    pub id: SpoolId,
    pub filament: Filament,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Output artifact kind, doubling as the file extension - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Suffix(Arc<str>);

impl Suffix {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Suffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Suffix {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Suffix {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The artifact kinds every filament must be rendered into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuffixSet(Vec<Suffix>);

impl SuffixSet {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Suffix>,
    {
        let mut set: Vec<Suffix> = Vec::new();
        for suffix in suffixes {
            let suffix = suffix.into();
            if !set.contains(&suffix) {
                set.push(suffix);
            }
        }
        Self(set)
    }

    pub fn contains(&self, suffix: &Suffix) -> bool {
        self.0.contains(suffix)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Suffix> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `file_name` ends in `.<suffix>` for some member.
    pub fn matches_file(&self, file_name: &str) -> bool {
        self.0.iter().any(|s| {
            file_name
                .strip_suffix(s.as_str())
                .is_some_and(|stem| stem.ends_with('.'))
        })
    }
}

/// One output file slot: a filament rendered for one suffix.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ArtifactKey {
    pub filament: FilamentId,
    pub suffix: Suffix,
}

impl ArtifactKey {
    pub fn new(filament: FilamentId, suffix: Suffix) -> Self {
        Self { filament, suffix }
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.filament, self.suffix)
    }
}
