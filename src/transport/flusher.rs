use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::Transport;
use crate::kernel::telemetry::event::TelemetryEvent;

/// Work handed from the actor to the flush worker.
#[derive(Debug)]
pub enum FlushJob {
    /// May be empty; it still triggers delivery of held-back batches.
    Batch(Vec<TelemetryEvent>),
    /// Answered once every earlier batch has had its delivery attempt.
    Barrier(oneshot::Sender<()>),
}

#[derive(Debug)]
struct PendingBatch {
    events: Vec<TelemetryEvent>,
    attempts: u32,
}

/// Pushes batches to the transport on its own task so the actor never waits on I/O.
/// A failed batch stays at the head of the line and is retried on the next trigger.
pub struct FlushWorker {
    transport: Arc<dyn Transport>,
    rx: mpsc::UnboundedReceiver<FlushJob>,
    pending: VecDeque<PendingBatch>,
    max_attempts: u32,
}

impl FlushWorker {
    pub fn spawn(
        transport: Arc<dyn Transport>,
        max_attempts: u32,
    ) -> (mpsc::UnboundedSender<FlushJob>, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Self {
            transport,
            rx,
            pending: VecDeque::new(),
            max_attempts: max_attempts.max(1),
        };
        (tx, tokio::spawn(worker.run()))
    }

    async fn run(mut self) {
        info!("Flush Worker Started. Max attempts: {}", self.max_attempts);

        while let Some(job) = self.rx.recv().await {
            match job {
                FlushJob::Batch(events) => {
                    if !events.is_empty() {
                        self.pending.push_back(PendingBatch { events, attempts: 0 });
                    }
                    self.deliver().await;
                }
                FlushJob::Barrier(reply) => {
                    let _ = reply.send(());
                }
            }
        }

        // Actor gone: one last try for anything still waiting.
        self.deliver().await;
        let stranded: usize = self.pending.iter().map(|b| b.events.len()).sum();
        if stranded > 0 {
            warn!("Flush Worker Stopped. Dropping {} undelivered events", stranded);
        } else {
            info!("Flush Worker Stopped.");
        }
    }

    async fn deliver(&mut self) {
        while let Some(batch) = self.pending.front_mut() {
            match self.transport.push(&batch.events).await {
                Ok(()) => {
                    debug!("Batch Delivered: {} events", batch.events.len());
                    self.pending.pop_front();
                }
                Err(e) => {
                    batch.attempts += 1;
                    if batch.attempts >= self.max_attempts {
                        error!(
                            "Batch Dropped after {} attempts ({} events): {}",
                            batch.attempts,
                            batch.events.len(),
                            e
                        );
                        self.pending.pop_front();
                    } else {
                        warn!(
                            "Batch Push Failed (attempt {}/{}): {}. Retrying on next flush",
                            batch.attempts, self.max_attempts, e
                        );
                        break;
                    }
                }
            }
        }
    }
}
