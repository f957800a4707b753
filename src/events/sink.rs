//! Event listeners.

use crate::events::event::{SequencedEvent, SuiteEnvelope, SuiteEvent};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Anything that receives lifecycle events.
///
/// Sinks are called synchronously from the runner. A sink that panics is
/// isolated: the panic is logged and the run continues.
pub trait EventSink: Send + Sync {
    fn handle(&self, event: &SuiteEvent);
}

impl<F> EventSink for F
where
    F: Fn(&SuiteEvent) + Send + Sync,
{
    fn handle(&self, event: &SuiteEvent) {
        self(event)
    }
}

/// Keeps every event in memory.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<SuiteEvent>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SuiteEvent> {
        self.events.lock().clone()
    }

    /// Event names in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(SuiteEvent::name).collect()
    }

    /// `name(subject)` labels, e.g. `test:start(adds)`.
    pub fn labels(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| match event.subject() {
                Some(subject) => format!("{}({})", event.name(), subject),
                None => event.name().to_string(),
            })
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for Recorder {
    fn handle(&self, event: &SuiteEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn handle(&self, event: &SuiteEvent) {
        match event {
            SuiteEvent::TestFailure(data) | SuiteEvent::TestError(data) | SuiteEvent::TestTimeout(data) => {
                warn!(
                    event = event.name(),
                    test = %data.name,
                    kind = %data.error.kind,
                    message = %data.error.message,
                    "Test did not pass"
                );
            }
            SuiteEvent::UncaughtException(data) => {
                warn!(kind = %data.error.kind, message = %data.error.message, "Uncaught exception");
            }
            SuiteEvent::SuiteEnd(stats) => {
                info!(
                    ok = stats.ok,
                    contexts = stats.contexts,
                    tests = stats.tests,
                    assertions = stats.assertions,
                    failures = stats.failures,
                    errors = stats.errors,
                    timeouts = stats.timeouts,
                    deferred = stats.deferred,
                    "Suite finished"
                );
            }
            other => {
                debug!(event = other.name(), subject = ?other.subject(), "Suite event");
            }
        }
    }
}

/// Writes one JSON object per event.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
    seq: Mutex<u64>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            seq: Mutex::new(0),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn handle(&self, event: &SuiteEvent) {
        let seq = {
            let mut seq = self.seq.lock();
            *seq += 1;
            *seq
        };
        let line = SequencedEvent::from_envelope(SuiteEnvelope::with_now(event.clone()), seq);
        let mut writer = self.writer.lock();
        let written = serde_json::to_writer(&mut *writer, &line)
            .map_err(std::io::Error::from)
            .and_then(|_| writer.write_all(b"\n"));
        if let Err(err) = written {
            warn!(error = %err, "Failed to write event line");
        }
    }
}
