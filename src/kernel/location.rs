use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use super::reactor::Command;

pub const LOCATION_BUFFER_MAX_SIZE: usize = 40;

/// A single location fix as delivered by the location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_millis: i64,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, timestamp_millis: i64) -> Self {
        Self { latitude, longitude, timestamp_millis }
    }
}

pub type LocationPredicate = Box<dyn Fn(&LocationSample) -> bool + Send>;

/// Commands the actor applies to its location buffer. Nothing else touches the buffer.
pub enum BufferCommand {
    Add(LocationSample),
    Remove,
    Clear,
    Read {
        predicate: LocationPredicate,
        reply: oneshot::Sender<Vec<LocationSample>>,
    },
}

impl std::fmt::Debug for BufferCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferCommand::Add(sample) => f.debug_tuple("Add").field(sample).finish(),
            BufferCommand::Remove => f.write_str("Remove"),
            BufferCommand::Clear => f.write_str("Clear"),
            BufferCommand::Read { .. } => f.write_str("Read"),
        }
    }
}

/// Samples on either side of an event instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionedLocations {
    pub before: Vec<LocationSample>,
    pub after: Vec<LocationSample>,
}

/// Bounded FIFO of recent fixes. Overflow drops the oldest sample.
pub struct LocationRingBuffer {
    inner: HeapRb<LocationSample>,
}

impl LocationRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: HeapRb::new(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }

    pub fn len(&self) -> usize {
        self.inner.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Appends at the tail. Returns the evicted head when the buffer was full.
    pub fn push(&mut self, sample: LocationSample) -> Option<LocationSample> {
        self.inner.push_overwrite(sample)
    }

    pub fn pop_oldest(&mut self) -> Option<LocationSample> {
        self.inner.try_pop()
    }

    pub fn clear(&mut self) {
        Consumer::clear(&mut self.inner);
    }

    pub fn latest(&self) -> Option<LocationSample> {
        self.inner.iter().last().copied()
    }

    pub fn to_vec(&self) -> Vec<LocationSample> {
        self.inner.iter().copied().collect()
    }

    pub fn read<F>(&self, predicate: F) -> Vec<LocationSample>
    where
        F: Fn(&LocationSample) -> bool,
    {
        self.inner.iter().filter(|s| predicate(*s)).copied().collect()
    }

    /// Splits the current contents around `timestamp_millis`.
    /// Samples strictly earlier land in `before`, everything else in `after`.
    pub fn partition_at(&self, timestamp_millis: i64) -> PartitionedLocations {
        let (before, after): (Vec<_>, Vec<_>) = self
            .inner
            .iter()
            .copied()
            .partition(|s| s.timestamp_millis < timestamp_millis);
        PartitionedLocations { before, after }
    }

    /// Applies one command. Evictions are reported back for logging.
    pub fn apply(&mut self, command: BufferCommand) -> Option<LocationSample> {
        match command {
            BufferCommand::Add(sample) => self.push(sample),
            BufferCommand::Remove => self.pop_oldest(),
            BufferCommand::Clear => {
                self.clear();
                None
            }
            BufferCommand::Read { predicate, reply } => {
                let _ = reply.send(self.read(predicate));
                None
            }
        }
    }
}

impl Default for LocationRingBuffer {
    fn default() -> Self {
        Self::new(LOCATION_BUFFER_MAX_SIZE)
    }
}

impl std::fmt::Debug for LocationRingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationRingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

/// Producer handle for location fixes. Every fix becomes an ADD command on the
/// actor's channel, so the producer never touches the buffer itself.
#[derive(Debug, Clone)]
pub struct LocationSink {
    tx: mpsc::Sender<Command>,
}

impl LocationSink {
    pub(crate) fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    /// Waits for room in the channel. False once the actor is gone.
    pub async fn send(&self, sample: LocationSample) -> bool {
        self.tx
            .send(Command::Buffer(BufferCommand::Add(sample)))
            .await
            .is_ok()
    }

    /// Non-blocking hand-off for callback producers. False if the channel is full or closed.
    pub fn offer(&self, sample: LocationSample) -> bool {
        self.tx
            .try_send(Command::Buffer(BufferCommand::Add(sample)))
            .is_ok()
    }
}

/// Location hardware side. Subscribed once at initialization, released at teardown.
pub trait LocationSource: Send + Sync {
    fn request_location_updates(&self, sink: LocationSink);
    fn remove_location_updates(&self);
}

/// Held by the actor task for its whole life; unsubscribes on every exit path.
pub struct LocationSubscription {
    source: Arc<dyn LocationSource>,
}

impl LocationSubscription {
    pub fn new(source: Arc<dyn LocationSource>) -> Self {
        Self { source }
    }
}

impl Drop for LocationSubscription {
    fn drop(&mut self) {
        self.source.remove_location_updates();
        info!("Location Updates Removed");
    }
}
