//! Spoolsync configuration
//!
//! The slicer choice fixes which artifact kinds are produced. Tuning knobs
//! (timeouts, reconnect backoff, queue size) live in an optional TOML file
//! and fall back to defaults when it is missing or unreadable.

use serde::{Deserialize, Serialize};
use spoolsync_client::ReconnectPolicy;
use spoolsync_core::{Error, SuffixSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Slicers the output can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Slicer {
    Orcaslicer,
    Prusaslicer,
    Slic3r,
    Superslicer,
}

impl Slicer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orcaslicer => "orcaslicer",
            Self::Prusaslicer => "prusaslicer",
            Self::Slic3r => "slic3r",
            Self::Superslicer => "superslicer",
        }
    }

    /// Artifact kinds written for every filament.
    pub fn suffix_set(&self) -> spoolsync_core::Result<SuffixSet> {
        match self {
            Self::Superslicer | Self::Prusaslicer => Ok(SuffixSet::new(["ini"])),
            Self::Orcaslicer => Ok(SuffixSet::new(["json", "info"])),
            Self::Slic3r => Err(Error::UnsupportedSlicer(self.as_str().to_string())),
        }
    }

    pub fn default_template_dir(&self) -> PathBuf {
        PathBuf::from(format!("templates-{}", self.as_str()))
    }
}

impl std::fmt::Display for Slicer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning loaded from `--config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub http: HttpConfig,
    /// Backoff between websocket reconnect attempts.
    pub reconnect: ReconnectPolicy,
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout for the initial inventory fetch, in seconds.
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Events buffered between the streams and the reconciliation worker.
    pub capacity: usize,
}

// ============================================================
// Defaults
// ============================================================

impl Default for HttpConfig {
    fn default() -> Self {
        Self { fetch_timeout_secs: 10 }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

// ============================================================
// Loading
// ============================================================

impl SyncConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Render as TOML (for `--dump-config`).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.http.fetch_timeout_secs)
    }

    /// Channel capacity, never zero.
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity.max(1)
    }
}
