use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::TelemetryConfig;
use super::location::{BufferCommand, LocationRingBuffer, LocationSubscription, PartitionedLocations};
use super::phone::{PhoneState, PhoneStateProvider};
use super::progress::{RouteProgressState, TimestampedProgress};
use super::session::{LocationEngineDescriptor, Route, SessionState};
use super::telemetry::builder::{self, EventContext};
use super::telemetry::event::{PerformanceMetadata, TelemetryRequest};
use super::telemetry::gps::InitialGpsLatencyTracker;
use super::telemetry::recorder::OutboundQueue;
use crate::transport::flusher::FlushJob;

/// Everything the actor can be asked to do. Processed strictly in arrival order.
#[derive(Debug)]
pub enum Command {
    Buffer(BufferCommand),
    StartSession {
        route: Route,
        engine: LocationEngineDescriptor,
        started_at_millis: i64,
    },
    EndSession,
    Post {
        request: TelemetryRequest,
        at_millis: i64,
    },
    DisplayMetrics {
        percent_foreground: u8,
        percent_portrait: u8,
    },
    InspectSession(oneshot::Sender<Option<SessionState>>),
    DumpPending(oneshot::Sender<String>),
    /// Resolves after all earlier commands and their deliveries.
    Barrier(oneshot::Sender<()>),
}

/// Single owner of all mutable telemetry state.
pub struct TelemetryActor {
    config: TelemetryConfig,
    receiver: mpsc::Receiver<Command>,
    progress: watch::Receiver<TimestampedProgress>,
    buffer: LocationRingBuffer,
    queue: OutboundQueue,
    session: Option<SessionState>,
    phone: Arc<dyn PhoneStateProvider>,
    gps: Arc<InitialGpsLatencyTracker>,
    flush_tx: mpsc::UnboundedSender<FlushJob>,
    cancel: CancellationToken,
}

impl TelemetryActor {
    pub fn new(
        config: TelemetryConfig,
        receiver: mpsc::Receiver<Command>,
        progress: watch::Receiver<TimestampedProgress>,
        phone: Arc<dyn PhoneStateProvider>,
        gps: Arc<InitialGpsLatencyTracker>,
        flush_tx: mpsc::UnboundedSender<FlushJob>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            buffer: LocationRingBuffer::new(config.location_buffer_capacity),
            queue: OutboundQueue::new(config.flush_threshold),
            config,
            receiver,
            progress,
            session: None,
            phone,
            gps,
            flush_tx,
            cancel,
        }
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn buffer(&self) -> &LocationRingBuffer {
        &self.buffer
    }

    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    /// Synchronous step: applies one command. Never awaits.
    pub fn handle(&mut self, command: Command) {
        match command {
            Command::Buffer(cmd) => self.apply_buffer(cmd),
            Command::StartSession {
                route,
                engine,
                started_at_millis,
            } => self.start_session(route, engine, started_at_millis),
            Command::EndSession => self.end_session(),
            Command::Post { request, at_millis } => self.post(request, at_millis),
            Command::DisplayMetrics {
                percent_foreground,
                percent_portrait,
            } => {
                if let Some(session) = self.session.as_mut() {
                    session.set_display_metrics(percent_foreground, percent_portrait);
                }
            }
            Command::InspectSession(reply) => {
                let _ = reply.send(self.session.clone());
            }
            Command::DumpPending(reply) => {
                let _ = reply.send(self.queue.to_json());
            }
            Command::Barrier(reply) => {
                // Routed through the flush worker so it also waits for deliveries.
                if let Err(mpsc::error::SendError(FlushJob::Barrier(reply))) =
                    self.flush_tx.send(FlushJob::Barrier(reply))
                {
                    let _ = reply.send(());
                }
            }
        }
    }

    /// Latest progress snapshot; watches for arrival.
    pub fn observe_progress(&mut self) {
        let latest = self.progress.borrow_and_update().clone();
        self.record_arrival_if_arrived(&latest);
    }

    fn record_arrival_if_arrived(&mut self, latest: &TimestampedProgress) {
        if latest.progress.current_state != RouteProgressState::Arrived {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if session.record_arrival(latest.received_at_millis) {
                info!("Arrival Recorded: session {}", session.session_id);
            }
        }
    }

    fn apply_buffer(&mut self, cmd: BufferCommand) {
        let is_add = matches!(cmd, BufferCommand::Add(_));
        if is_add {
            self.gps.gps_received(self.performance_metadata());
        }
        if let Some(evicted) = self.buffer.apply(cmd) {
            if is_add {
                debug!("Location Evicted: ts {}", evicted.timestamp_millis);
            }
        }
    }

    fn start_session(&mut self, route: Route, engine: LocationEngineDescriptor, started_at_millis: i64) {
        if self.session.is_some() {
            warn!("Session still open at start. Ending it first");
            self.end_session();
        }

        let mut session = SessionState::start(
            route,
            &engine,
            &self.config.mock_location_engine,
            started_at_millis,
        );
        let latest = self.progress.borrow().clone();
        if latest.progress.current_state == RouteProgressState::Arrived {
            session.record_arrival(latest.received_at_millis);
        }

        self.gps.reset();
        self.gps.session_started(&session.session_id);
        info!(
            "Session Started: {} (trip {}, engine {})",
            session.session_id, session.trip_id, session.location_engine_name
        );
        self.session = Some(session);
    }

    fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            info!(
                "Session Ended: {} ({} reroutes, {} queued events)",
                session.session_id,
                session.reroute_count(),
                self.queue.len()
            );
        }
        self.gps.reset();
        self.flush();
    }

    fn post(&mut self, request: TelemetryRequest, at_millis: i64) {
        let progress = self.progress.borrow().progress.clone();
        let detached;
        let session = match (&self.session, &request) {
            (Some(session), _) => session,
            (None, TelemetryRequest::Feedback(_)) => {
                detached = SessionState::default();
                &detached
            }
            (None, _) => {
                warn!("No Active Session. Dropping {}", request.name());
                return;
            }
        };

        let locations = match &request {
            TelemetryRequest::Reroute(_) | TelemetryRequest::Feedback(_) => {
                self.buffer.partition_at(at_millis)
            }
            _ => PartitionedLocations::default(),
        };
        let seconds_since_last_reroute = session.seconds_since_last_reroute(at_millis);

        let ctx = EventContext {
            session,
            progress: &progress,
            phone: PhoneState::capture(self.phone.as_ref(), &self.config.user_id),
            location: self.buffer.latest(),
            sdk_identifier: &self.config.sdk_identifier,
            sdk_version: &self.config.sdk_version,
        };

        let event = match builder::build(&request, &ctx, locations, seconds_since_last_reroute) {
            Ok(event) => event,
            Err(e) => {
                warn!("{}. Event dropped", e);
                return;
            }
        };

        if let Some(session) = self.session.as_mut() {
            match &request {
                TelemetryRequest::Reroute(r) => {
                    session.apply_reroute(r.new_route.clone(), progress.distance_traveled, at_millis);
                }
                TelemetryRequest::Arrive => {
                    session.record_arrival(at_millis);
                }
                _ => {}
            }
        }

        debug!("Event Queued: {}", event.name());
        if self.queue.enqueue(event) {
            self.flush();
        }
    }

    /// Hands the whole queue to the flush worker as one batch. An empty batch still
    /// goes out: it is the retry trigger for anything the worker is holding back.
    fn flush(&mut self) {
        let batch = self.queue.take_batch();
        if batch.is_empty() {
            debug!("Flush Trigger: nothing queued");
        } else {
            info!("Flushing Batch: {} events", batch.len());
        }
        if self.flush_tx.send(FlushJob::Batch(batch)).is_err() {
            error!("Flush Worker Gone. Batch lost");
        }
    }

    fn performance_metadata(&self) -> PerformanceMetadata {
        PerformanceMetadata {
            sdk_identifier: self.config.sdk_identifier.clone(),
            sdk_version: self.config.sdk_version.clone(),
            device: self.config.device.clone(),
        }
    }

    /// Async driver loop. `subscription` lives exactly as long as this future.
    pub async fn run(mut self, subscription: LocationSubscription) {
        let _subscription = subscription;
        info!(
            "Telemetry Actor Started. Buffer: {}, flush at {}",
            self.buffer.capacity(),
            self.config.flush_threshold
        );

        let mut progress_open = true;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                command = self.receiver.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                changed = self.progress.changed(), if progress_open => match changed {
                    Ok(()) => self.observe_progress(),
                    Err(_) => {
                        debug!("Route Progress Source Closed");
                        progress_open = false;
                    }
                },
            }
        }

        // Commands accepted before shutdown still apply.
        self.receiver.close();
        while let Ok(command) = self.receiver.try_recv() {
            self.handle(command);
        }
        self.flush();
        info!("Telemetry Actor Stopped.");
    }
}
