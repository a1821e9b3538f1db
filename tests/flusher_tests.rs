use async_trait::async_trait;
use navtelemetry::kernel::telemetry::builder::build_turnstile;
use navtelemetry::transport::flusher::{FlushJob, FlushWorker};
use navtelemetry::{TelemetryEvent, Transport, TransportError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Fails the next `fail_next` pushes, records the rest.
#[derive(Default)]
struct FlakyTransport {
    fail_next: AtomicU32,
    attempts: AtomicU32,
    delivered: Mutex<Vec<Vec<TelemetryEvent>>>,
}

#[async_trait]
impl Transport for FlakyTransport {
    fn enable(&self) -> bool {
        true
    }

    async fn push(&self, batch: &[TelemetryEvent]) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::Network("unreachable".to_string()));
        }
        self.delivered.lock().push(batch.to_vec());
        Ok(())
    }
}

fn batch(user: &str) -> Vec<TelemetryEvent> {
    vec![build_turnstile("sdk", "0.1.0", user)]
}

fn user_of(batch: &[TelemetryEvent]) -> String {
    match &batch[0] {
        TelemetryEvent::AppUserTurnstile(t) => t.user_id.clone(),
        other => other.name().to_string(),
    }
}

async fn barrier(tx: &tokio::sync::mpsc::UnboundedSender<FlushJob>) {
    let (reply, done) = oneshot::channel();
    tx.send(FlushJob::Barrier(reply)).expect("Worker alive");
    done.await.expect("Barrier answered");
}

#[tokio::test]
async fn test_failed_batch_retried_in_order() {
    let transport = Arc::new(FlakyTransport::default());
    transport.fail_next.store(1, Ordering::SeqCst);
    let (tx, _worker) = FlushWorker::spawn(transport.clone(), 3);

    // 1. First batch fails, stays at the head
    tx.send(FlushJob::Batch(batch("one"))).expect("Worker alive");
    barrier(&tx).await;
    assert!(transport.delivered.lock().is_empty());

    // 2. Next trigger delivers the retried batch before the new one
    tx.send(FlushJob::Batch(batch("two"))).expect("Worker alive");
    barrier(&tx).await;

    let order: Vec<String> = transport.delivered.lock().iter().map(|b| user_of(b)).collect();
    assert_eq!(order, vec!["one".to_string(), "two".to_string()]);
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_batch_dropped_after_max_attempts() {
    let transport = Arc::new(FlakyTransport::default());
    transport.fail_next.store(3, Ordering::SeqCst);
    let (tx, _worker) = FlushWorker::spawn(transport.clone(), 2);

    // one: attempt 1 fails
    tx.send(FlushJob::Batch(batch("one"))).expect("Worker alive");
    barrier(&tx).await;
    // one: attempt 2 fails -> dropped; two: attempt 1 fails
    tx.send(FlushJob::Batch(batch("two"))).expect("Worker alive");
    barrier(&tx).await;
    assert!(transport.delivered.lock().is_empty());

    // two and three go out in order
    tx.send(FlushJob::Batch(batch("three"))).expect("Worker alive");
    barrier(&tx).await;

    let order: Vec<String> = transport.delivered.lock().iter().map(|b| user_of(b)).collect();
    assert_eq!(order, vec!["two".to_string(), "three".to_string()]);
}

#[tokio::test]
async fn test_pending_batch_flushed_on_close() {
    let transport = Arc::new(FlakyTransport::default());
    transport.fail_next.store(1, Ordering::SeqCst);
    let (tx, worker) = FlushWorker::spawn(transport.clone(), 3);

    tx.send(FlushJob::Batch(batch("late"))).expect("Worker alive");
    drop(tx);
    worker.await.expect("Worker exits cleanly");

    assert_eq!(transport.delivered.lock().len(), 1, "Final attempt on shutdown");
}
