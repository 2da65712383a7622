//! Spoolman change streams over WebSocket
//!
//! Each stream runs as its own producer: connect, decode frames into
//! `Event<T>`, push them onto the shared queue in arrival order. Dropped
//! connections are retried forever with exponential backoff; nothing is
//! replayed, the consumer just sees the next event after the gap.

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use spoolsync_core::Event;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMsg};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reconnect backoff for the change streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// First delay after a drop, in milliseconds.
    pub base_ms: u64,
    pub multiplier: f64,
    /// Delay ceiling, in milliseconds.
    pub max_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_ms: 1_000,
            multiplier: 1.5,
            max_ms: 30_000,
        }
    }
}

impl ReconnectPolicy {
    pub fn initial(&self) -> Duration {
        Duration::from_millis(self.base_ms.min(self.max_ms))
    }

    pub fn next(&self, current: Duration) -> Duration {
        let grown = current.as_millis() as f64 * self.multiplier.max(1.0);
        Duration::from_millis((grown as u64).min(self.max_ms))
    }
}

/// Why one connection ended.
enum Ended {
    Cancelled,
    QueueClosed,
    Dropped,
}

/// Follow the stream at `url` until `cancel` fires or the queue closes.
/// Every decoded event is wrapped with `wrap` and sent on `tx`.
pub async fn subscribe<T, M>(
    url: String,
    policy: ReconnectPolicy,
    tx: mpsc::Sender<M>,
    wrap: fn(Event<T>) -> M,
    cancel: CancellationToken,
) where
    T: DeserializeOwned + Send + 'static,
    M: Send + 'static,
{
    let mut delay = policy.initial();
    loop {
        let connected = tokio::select! {
            result = connect_async(url.as_str()) => result,
            _ = cancel.cancelled() => return,
        };

        match connected {
            Ok((mut ws, _)) => {
                info!("Connected to {}", url);
                delay = policy.initial();

                let ended = loop {
                    let frame = tokio::select! {
                        frame = ws.next() => frame,
                        _ = cancel.cancelled() => break Ended::Cancelled,
                    };
                    match frame {
                        Some(Ok(WsMsg::Text(text))) => match Event::<T>::decode(&text) {
                            Ok(event) => {
                                debug!("{} event from {}", event.kind(), url);
                                if tx.send(wrap(event)).await.is_err() {
                                    break Ended::QueueClosed;
                                }
                            }
                            Err(e) => warn!("Discarding message from {}: {}", url, e),
                        },
                        Some(Ok(WsMsg::Close(_))) | None => break Ended::Dropped,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Stream error on {}: {}", url, e);
                            break Ended::Dropped;
                        }
                    }
                };

                match ended {
                    Ended::Cancelled => return,
                    Ended::QueueClosed => {
                        info!("Update queue closed, leaving {}", url);
                        return;
                    }
                    Ended::Dropped => warn!("Lost connection to {}", url),
                }
            }
            Err(e) => warn!("Could not connect to {}: {}", url, e),
        }

        debug!("Reconnecting to {} in {:?}", url, delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return,
        }
        delay = policy.next(delay);
    }
}
