//! Navigation telemetry payloads and the pieces that produce them.
//!
//! # SAFETY INVARIANT
//! Telemetry is a side-effect layer. Nothing in here may block or fail the
//! navigation session it instruments: build errors are logged and the event dropped.
//!
//! # CONSISTENCY INVARIANT
//! Builders only ever see a snapshot the actor took between two commands, so
//! session, progress and location history in one payload always agree.

pub mod builder;
pub mod event;
pub mod gps;
pub mod recorder;
