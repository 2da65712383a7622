//! Spoolsync Client - Spoolman inventory fetch and change-stream subscriptions

pub mod error;
pub mod http;
pub mod stream;

pub use error::{ClientError, ClientResult};
pub use http::{ws_url, SpoolmanClient, FILAMENT_PATH, SPOOL_PATH};
pub use stream::{subscribe, ReconnectPolicy};
