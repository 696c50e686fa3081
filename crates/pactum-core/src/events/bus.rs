//! Event bus using tokio broadcast channel
//!
//! Provides non-blocking event emission with multiple subscribers.
//! Slow subscribers will miss events rather than blocking senders.

use tokio::sync::broadcast;

use crate::events::JobEvent;

/// Default channel capacity
const DEFAULT_CAPACITY: usize = 1024;

/// Event bus for job lifecycle events
///
/// Events are fire-and-forget; if no subscribers are listening, events are
/// simply dropped.
#[derive(Clone)]
pub struct JobEventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl JobEventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events emitted after this call.
    pub fn subscribe(&self) -> JobEventSubscriber {
        JobEventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    /// Emit an event to all subscribers. Never blocks and never fails.
    pub fn emit(&self, event: JobEvent) {
        tracing::trace!(job_id = %event.job_id, event = event.event_type(), progress = event.progress, "Job event");
        let _ = self.sender.send(event);
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JobEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber to the job event bus
pub struct JobEventSubscriber {
    receiver: broadcast::Receiver<JobEvent>,
}

impl JobEventSubscriber {
    /// Receive the next event
    ///
    /// Returns None if the bus was dropped. Lagged events are skipped.
    pub async fn recv(&mut self) -> Option<JobEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Job event subscriber lagged by {} events", n);
                    continue;
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Option<JobEvent> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next event of one job.
    pub async fn recv_for(&mut self, job_id: &str) -> Option<JobEvent> {
        while let Some(event) = self.recv().await {
            if event.job_id == job_id {
                return Some(event);
            }
        }
        None
    }
}
