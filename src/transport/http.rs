use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

use super::Transport;
use crate::kernel::error::TransportError;
use crate::kernel::telemetry::event::TelemetryEvent;

const TIMEOUT_MS: u64 = 5_000;

/// Posts batches as a JSON array to the events endpoint of a collector.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    access_token: String,
    enabled: AtomicBool,
}

impl HttpTransport {
    /// Fails if the HTTP client cannot be built with the request timeout.
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(TIMEOUT_MS))
            .build()
            .map_err(|e| TransportError::ClientSetup(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            access_token: access_token.into(),
            enabled: AtomicBool::new(false),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(TIMEOUT_MS)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/events/v2?access_token={}",
            self.base_url.trim_end_matches('/'),
            self.access_token
        )
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn enable(&self) -> bool {
        self.enabled.store(true, Ordering::Release);
        info!("HTTP Transport Enabled: {}", self.base_url);
        true
    }

    async fn push(&self, batch: &[TelemetryEvent]) -> Result<(), TransportError> {
        if !self.enabled.load(Ordering::Acquire) {
            return Err(TransportError::Disabled);
        }

        let response = self
            .client
            .post(self.endpoint())
            .json(batch)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
