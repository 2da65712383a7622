//! Spoolsync Engine - Reconciles slicer filament configs with Spoolman state
//!
//! `Reconciler` owns the filename cache, refcounts and content memo.
//! `EventRouter` classifies spool/filament events and drives it from a
//! single-consumer queue.

pub mod engine;
pub mod router;
pub mod store;
pub mod templates;

pub use engine::Reconciler;
pub use router::{EventRouter, Inbound};
pub use store::{purge_dir, ArtifactStore, FsStore};
pub use templates::{ProgramInfo, TemplateSet};
