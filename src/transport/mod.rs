//! Outbound boundary: where finished payloads leave the telemetry core.

pub mod flusher;
pub mod http;

use async_trait::async_trait;
use tracing::info;

use crate::kernel::error::TransportError;
use crate::kernel::telemetry::event::TelemetryEvent;

/// Collector sink for batched navigation events.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Called once at initialization.
    fn enable(&self) -> bool;

    /// Delivers one batch, oldest event first. An error leaves the batch queued.
    async fn push(&self, batch: &[TelemetryEvent]) -> Result<(), TransportError>;
}

/// Side channel for one-off usage metrics (turnstile, initial GPS latency).
/// Must not block.
pub trait MetricsReporter: Send + Sync {
    fn add_event(&self, event: TelemetryEvent);
}

/// Sink that only writes to the log.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    fn enable(&self) -> bool {
        info!("Log Transport Enabled");
        true
    }

    async fn push(&self, batch: &[TelemetryEvent]) -> Result<(), TransportError> {
        for event in batch {
            let json = serde_json::to_string(event)
                .map_err(|e| TransportError::Serialization(e.to_string()))?;
            info!("[PUSH] {}", json);
        }
        Ok(())
    }
}

impl MetricsReporter for LogTransport {
    fn add_event(&self, event: TelemetryEvent) {
        info!("[METRIC] {}", event.name());
    }
}
