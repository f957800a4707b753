//! In-process event bus: hands events to a consumer on another thread or task.

use std::sync::mpsc::{channel, Receiver, Sender};

use parking_lot::Mutex;
use tracing::trace;

use crate::events::event::{SequencedEvent, SuiteEnvelope, SuiteEvent};
use crate::events::sink::EventSink;

pub struct EventBus {
    sender: Mutex<Sender<SuiteEnvelope>>,
}

impl EventBus {
    pub fn new_pair() -> (Self, Receiver<SuiteEnvelope>) {
        let (sender, receiver) = channel();
        (
            Self {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl EventSink for EventBus {
    fn handle(&self, event: &SuiteEvent) {
        let envelope = SuiteEnvelope::with_now(event.clone());
        if self.sender.lock().send(envelope).is_err() {
            trace!(event = event.name(), "Event bus receiver dropped");
        }
    }
}

/// Drains a bus receiver into sequenced events.
pub struct EventLog {
    receiver: Receiver<SuiteEnvelope>,
    next_seq: u64,
    events: Vec<SequencedEvent>,
}

impl EventLog {
    pub fn new(receiver: Receiver<SuiteEnvelope>) -> Self {
        Self {
            receiver,
            next_seq: 1,
            events: Vec::new(),
        }
    }

    /// Move everything currently queued into the log. Returns how many were added.
    pub fn drain(&mut self) -> usize {
        let mut added = 0;
        while let Ok(envelope) = self.receiver.try_recv() {
            self.events
                .push(SequencedEvent::from_envelope(envelope, self.next_seq));
            self.next_seq += 1;
            added += 1;
        }
        added
    }

    pub fn events(&self) -> &[SequencedEvent] {
        &self.events
    }
}
