//! spoolsync: keep slicer filament configs in step with a Spoolman inventory
//!
//! The binary is a thin shell over these modules so the startup pieces can
//! be tested without a live Spoolman.

pub mod app;
pub mod config;

pub use app::{prepare, run, RunOptions};
pub use config::{Slicer, SyncConfig};
