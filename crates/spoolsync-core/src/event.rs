//! Spoolman change events
//!
//! Wire format (both `/api/v1/spool` and `/api/v1/filament` streams):
//!
//!   { "type": "added" | "updated" | "deleted", "payload": { ...record... } }
//!
//! The `type` string is decoded once, here. Anything past this boundary
//! matches on [`Event`] instead of comparing strings.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// A change to a Spoolman record of type `T`.
#[derive(Clone, Debug, PartialEq)]
pub enum Event<T> {
    Added(T),
    Updated(T),
    Deleted(T),
    /// A `type` this build does not know. The payload is not decoded.
    Unknown { kind: String },
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl<T: DeserializeOwned> Event<T> {
    /// Decode a websocket text frame.
    pub fn decode(text: &str) -> Result<Self> {
        let raw: RawEvent = serde_json::from_str(text)
            .map_err(|e| Error::InvalidMessage(format!("not an event: {}", e)))?;
        Self::from_parts(&raw.kind, raw.payload)
    }

    pub fn from_parts(kind: &str, payload: Value) -> Result<Self> {
        let parse = |payload: Value| -> Result<T> {
            serde_json::from_value(payload)
                .map_err(|e| Error::InvalidMessage(format!("bad {} payload: {}", kind, e)))
        };
        Ok(match kind {
            "added" => Self::Added(parse(payload)?),
            "updated" => Self::Updated(parse(payload)?),
            "deleted" => Self::Deleted(parse(payload)?),
            other => Self::Unknown {
                kind: other.to_string(),
            },
        })
    }
}

impl<T> Event<T> {
    pub fn kind(&self) -> &str {
        match self {
            Self::Added(_) => "added",
            Self::Updated(_) => "updated",
            Self::Deleted(_) => "deleted",
            Self::Unknown { kind } => kind,
        }
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            Self::Added(p) | Self::Updated(p) | Self::Deleted(p) => Some(p),
            Self::Unknown { .. } => None,
        }
    }
}
