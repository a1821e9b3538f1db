pub mod kernel;
pub mod transport;

// Re-export the service surface for convenient access
pub use kernel::config::TelemetryConfig;
pub use kernel::error::{TelemetryError, TransportError};
pub use kernel::service::{Collaborators, NavigationTelemetry};
pub use kernel::telemetry::event::{TelemetryEvent, TelemetryRequest};
pub use transport::{MetricsReporter, Transport};
