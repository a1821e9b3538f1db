use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::TelemetryConfig;
use super::error::TelemetryError;
use super::location::{BufferCommand, LocationSample, LocationSink, LocationSource, LocationSubscription};
use super::phone::PhoneStateProvider;
use super::progress::{progress_channel, RouteProgressSource};
use super::reactor::{Command, TelemetryActor};
use super::session::{LocationEngineDescriptor, Route, SessionControl, SessionState};
use super::telemetry::builder::build_turnstile;
use super::telemetry::event::TelemetryRequest;
use super::telemetry::gps::InitialGpsLatencyTracker;
use super::time::now_millis;
use crate::transport::flusher::FlushWorker;
use crate::transport::{MetricsReporter, Transport};

/// External collaborators wired in at initialization.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub metrics: Arc<dyn MetricsReporter>,
    pub route_progress: Arc<dyn RouteProgressSource>,
    pub locations: Arc<dyn LocationSource>,
    pub phone_state: Arc<dyn PhoneStateProvider>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LatchState {
    Uninitialized = 0,
    Initialized = 1,
}

/// Running pieces behind the latch. Immutable once built.
struct Runtime {
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    actor: Mutex<Option<JoinHandle<()>>>,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl Runtime {
    async fn send(&self, command: Command) -> Result<(), TelemetryError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TelemetryError::ActorClosed)
    }

    async fn ask<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, TelemetryError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        rx.await.map_err(|_| TelemetryError::ActorClosed)
    }
}

/// Credential must be non-empty and carry a public or secret token prefix.
pub fn validate_access_token(token: &str) -> Result<(), TelemetryError> {
    let lower = token.to_ascii_lowercase();
    if token.is_empty() || !(lower.starts_with("pk.") || lower.starts_with("sk.")) {
        return Err(TelemetryError::InvalidCredential);
    }
    Ok(())
}

/// Navigation telemetry service. Construct one per navigation owner and pass it around.
///
/// `initialize` spawns the actor and flush worker, so it must run inside a Tokio runtime.
pub struct NavigationTelemetry {
    config: TelemetryConfig,
    latch: AtomicU8,
    runtime: RwLock<Option<Arc<Runtime>>>,
    session_control: SessionControl,
}

impl NavigationTelemetry {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            config,
            latch: AtomicU8::new(LatchState::Uninitialized as u8),
            runtime: RwLock::new(None),
            session_control: SessionControl::new(),
        }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn latch_state(&self) -> LatchState {
        match self.latch.load(Ordering::Acquire) {
            1 => LatchState::Initialized,
            _ => LatchState::Uninitialized,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.runtime.read().is_some()
    }

    /// One-time setup. `Ok(true)` on the call that initialized, `Ok(false)` on every later one.
    pub fn initialize(&self, access_token: &str, collaborators: Collaborators) -> Result<bool, TelemetryError> {
        if self.latch_state() == LatchState::Initialized {
            debug!("Telemetry Already Initialized. Ignoring");
            return Ok(false);
        }
        validate_access_token(access_token)?;

        // Latch and runtime are published together: a caller that sees the latch set
        // and then asks for the runtime blocks on this lock until it is installed.
        let mut slot = self.runtime.write();
        if self
            .latch
            .compare_exchange(
                LatchState::Uninitialized as u8,
                LatchState::Initialized as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Ok(false);
        }

        let previous_actor = slot.take().and_then(|previous| {
            previous.cancel.cancel();
            let actor = previous.actor.lock().take();
            actor
        });
        *slot = Some(Arc::new(self.start_runtime(collaborators, previous_actor)));
        drop(slot);

        info!(
            "Telemetry Initialized. SDK: {} {}",
            self.config.sdk_identifier, self.config.sdk_version
        );
        Ok(true)
    }

    fn start_runtime(&self, collaborators: Collaborators, previous_actor: Option<JoinHandle<()>>) -> Runtime {
        let Collaborators {
            transport,
            metrics,
            route_progress,
            locations,
            phone_state,
        } = collaborators;

        let (commands, receiver) = mpsc::channel(self.config.command_channel_capacity.max(1));
        let (observer, progress_rx) = progress_channel();
        let (flush_tx, flusher) = FlushWorker::spawn(transport.clone(), self.config.max_push_attempts);
        let cancel = CancellationToken::new();
        let gps = Arc::new(InitialGpsLatencyTracker::new(metrics.clone()));

        transport.enable();
        route_progress.register_progress_observer(observer);

        let actor = TelemetryActor::new(
            self.config.clone(),
            receiver,
            progress_rx,
            phone_state,
            gps,
            flush_tx,
            cancel.clone(),
        );
        let sink = LocationSink::new(commands.clone());
        let actor = match previous_actor {
            None => {
                locations.request_location_updates(sink);
                let subscription = LocationSubscription::new(locations);
                tokio::spawn(actor.run(subscription))
            }
            // The old actor's guard unsubscribes on exit, so subscribe only after it is gone.
            Some(previous) => tokio::spawn(async move {
                if let Err(e) = previous.await {
                    warn!("Previous Telemetry Actor Exited Abnormally: {}", e);
                }
                locations.request_location_updates(sink);
                let subscription = LocationSubscription::new(locations);
                actor.run(subscription).await;
            }),
        };

        metrics.add_event(build_turnstile(
            &self.config.sdk_identifier,
            &self.config.sdk_version,
            &self.config.user_id,
        ));

        Runtime {
            commands,
            cancel,
            actor: Mutex::new(Some(actor)),
            flusher: Mutex::new(Some(flusher)),
        }
    }

    fn runtime(&self) -> Result<Arc<Runtime>, TelemetryError> {
        self.runtime.read().clone().ok_or(TelemetryError::Uninitialized)
    }

    /// Starts a session. An unended previous session is closed first.
    pub async fn start_session(
        &self,
        route: Route,
        engine: LocationEngineDescriptor,
    ) -> Result<(), TelemetryError> {
        let runtime = self.runtime()?;
        if !self.session_control.try_start() {
            warn!("endSession() not called. Calling it by default");
            runtime.send(Command::EndSession).await?;
        }
        runtime
            .send(Command::StartSession {
                route,
                engine,
                started_at_millis: now_millis(),
            })
            .await
    }

    /// Ends the current session and drains the outbound queue. Idempotent.
    pub async fn end_session(&self) -> Result<(), TelemetryError> {
        if !self.session_control.try_end() {
            return Ok(());
        }
        match self.runtime() {
            Ok(runtime) => runtime.send(Command::EndSession).await,
            Err(_) => Ok(()),
        }
    }

    pub async fn post_telemetry_event(&self, request: TelemetryRequest) -> Result<(), TelemetryError> {
        let runtime = self.runtime()?;
        runtime
            .send(Command::Post {
                request,
                at_millis: now_millis(),
            })
            .await
    }

    /// Direct producer path for fixes that do not come through a [`LocationSource`].
    pub async fn submit_location(&self, sample: LocationSample) -> Result<(), TelemetryError> {
        self.runtime()?
            .send(Command::Buffer(BufferCommand::Add(sample)))
            .await
    }

    pub async fn remove_oldest_location(&self) -> Result<(), TelemetryError> {
        self.runtime()?.send(Command::Buffer(BufferCommand::Remove)).await
    }

    pub async fn clear_locations(&self) -> Result<(), TelemetryError> {
        self.runtime()?.send(Command::Buffer(BufferCommand::Clear)).await
    }

    /// Buffered fixes matching `predicate`, read in order with all earlier commands.
    pub async fn read_locations<F>(&self, predicate: F) -> Result<Vec<LocationSample>, TelemetryError>
    where
        F: Fn(&LocationSample) -> bool + Send + 'static,
    {
        self.runtime()?
            .ask(|reply| {
                Command::Buffer(BufferCommand::Read {
                    predicate: Box::new(predicate),
                    reply,
                })
            })
            .await
    }

    pub async fn report_display_metrics(
        &self,
        percent_foreground: u8,
        percent_portrait: u8,
    ) -> Result<(), TelemetryError> {
        self.runtime()?
            .send(Command::DisplayMetrics {
                percent_foreground,
                percent_portrait,
            })
            .await
    }

    pub async fn current_session(&self) -> Result<Option<SessionState>, TelemetryError> {
        self.runtime()?.ask(Command::InspectSession).await
    }

    /// Resolves once every earlier command is processed and every batch it produced
    /// has had its delivery attempt.
    pub async fn drain(&self) -> Result<(), TelemetryError> {
        self.runtime()?.ask(Command::Barrier).await
    }

    /// Test hook: `true` re-arms the one-time initializer, `false` disarms it.
    #[doc(hidden)]
    pub fn pause_telemetry(&self, paused: bool) {
        let state = if paused {
            LatchState::Uninitialized
        } else {
            LatchState::Initialized
        };
        self.latch.store(state as u8, Ordering::Release);
    }

    /// Test hook: the outbound queue as a JSON array.
    #[doc(hidden)]
    pub async fn dump_pending_payload_as_json(&self) -> Result<String, TelemetryError> {
        self.runtime()?.ask(Command::DumpPending).await
    }

    /// Stops the actor and flush worker. Queued events get one last delivery attempt.
    pub async fn terminate(&self) {
        let runtime = self.runtime.write().take();
        let Some(runtime) = runtime else {
            return;
        };
        runtime.cancel.cancel();

        let actor = runtime.actor.lock().take();
        if let Some(actor) = actor {
            if let Err(e) = actor.await {
                warn!("Telemetry Actor Exited Abnormally: {}", e);
            }
        }
        let flusher = runtime.flusher.lock().take();
        if let Some(flusher) = flusher {
            if let Err(e) = flusher.await {
                warn!("Flush Worker Exited Abnormally: {}", e);
            }
        }

        self.session_control.try_end();
        self.latch.store(LatchState::Uninitialized as u8, Ordering::Release);
        info!("Telemetry Terminated.");
    }
}

impl Drop for NavigationTelemetry {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.cancel.cancel();
        }
    }
}
