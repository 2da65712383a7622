//! Spoolman REST client: one-shot inventory fetch

use crate::error::{ClientError, ClientResult};
use reqwest::Client;
use spoolsync_core::Spool;
use std::time::Duration;
use tracing::{debug, error};

pub const SPOOL_PATH: &str = "/api/v1/spool";
pub const FILAMENT_PATH: &str = "/api/v1/filament";

pub struct SpoolmanClient {
    client: Client,
    base_url: String,
}

impl SpoolmanClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let base_url = base_url.into();
        ws_url(&base_url, "")?;
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Websocket URL for one of the Spoolman change streams.
    pub fn ws_endpoint(&self, path: &str) -> ClientResult<String> {
        ws_url(&self.base_url, path)
    }

    /// Fetch every spool, each with its filament embedded.
    pub async fn fetch_spools(&self) -> ClientResult<Vec<Spool>> {
        let url = self.endpoint(SPOOL_PATH);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Unreachable {
                url: self.base_url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Spoolman error {}: {}", status, error_text);
            return Err(ClientError::RequestFailed(format!("{}: {}", status, error_text)));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

/// `http(s)://host[:port]` + path -> `ws(s)://host[:port]` + path.
pub fn ws_url(base_url: &str, path: &str) -> ClientResult<String> {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        return Err(ClientError::InvalidUrl(base_url.to_string()));
    };
    Ok(format!("{}{}", ws_base, path))
}
