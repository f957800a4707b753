//! Lifecycle events: typed schema, listener trait and transports.

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::{EventBus, EventLog};
pub use event::{
    ConfigurationData, ContextData, DeferredData, FailureData, RuntimeInfo, SequencedEvent,
    SuccessData, SuiteEnvelope, SuiteEvent, TestData, UncaughtData, UnsupportedData,
};
pub use sink::{EventSink, JsonLinesSink, Recorder, TracingSink};
