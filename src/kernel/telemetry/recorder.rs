use std::collections::VecDeque;

use super::event::TelemetryEvent;

/// Outbound events awaiting hand-off to the flush worker, in enqueue order.
#[derive(Debug)]
pub struct OutboundQueue {
    buffer: VecDeque<TelemetryEvent>,
    flush_threshold: usize,
}

impl OutboundQueue {
    pub fn new(flush_threshold: usize) -> Self {
        Self {
            buffer: VecDeque::new(),
            flush_threshold: flush_threshold.max(1),
        }
    }

    /// Appends an event. True once the queue has reached the flush threshold.
    pub fn enqueue(&mut self, event: TelemetryEvent) -> bool {
        self.buffer.push_back(event);
        self.buffer.len() >= self.flush_threshold
    }

    /// Takes everything queued so far, oldest first.
    pub fn take_batch(&mut self) -> Vec<TelemetryEvent> {
        self.buffer.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.buffer.iter()
    }

    pub fn to_json(&self) -> String {
        let events: Vec<&TelemetryEvent> = self.buffer.iter().collect();
        serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())
    }
}
