use super::types::{AppEvent, AppEventPayload, EventSequence};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

pub type EventReceiver = broadcast::Receiver<AppEvent>;
pub type EventSender = broadcast::Sender<AppEvent>;

pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Event bus for distributing app events to the UI layer
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: EventSender,
    sequence: Arc<AtomicU64>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Publish an event and return its sequence number.
    /// Events published while nobody listens are dropped.
    pub fn publish(&self, payload: AppEventPayload) -> EventSequence {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        let event = AppEvent {
            sequence,
            timestamp: Utc::now(),
            payload,
        };

        if self.sender.send(event).is_err() {
            tracing::trace!(sequence, "event dropped, no subscribers");
        }

        sequence
    }

    pub fn alert(&self, message: impl Into<String>) -> EventSequence {
        self.publish(AppEventPayload::Alert {
            message: message.into(),
        })
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn current_sequence(&self) -> EventSequence {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
