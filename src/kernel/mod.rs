pub mod config;
pub mod error;
pub mod geo;
pub mod location;
pub mod phone;
pub mod progress;
pub mod reactor;
pub mod service;
pub mod session;
pub mod telemetry;
pub mod time;
