use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("A valid access token must be passed in when first initializing telemetry")]
    InvalidCredential,
    #[error("Telemetry must be initialized before calling this method")]
    Uninitialized,
    #[error("No payload builder for event '{0}'")]
    UnsupportedEvent(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Telemetry actor is no longer running")]
    ActorClosed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Collector rejected batch: HTTP {status}")]
    Rejected { status: u16 },
    #[error("Network failure: {0}")]
    Network(String),
    #[error("Batch serialization failed: {0}")]
    Serialization(String),
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
    #[error("Transport is disabled")]
    Disabled,
}
