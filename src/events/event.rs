//! Lifecycle event schema.

use crate::fixture::Fixture;
use crate::runner::outcome::ErrorReport;
use crate::runner::stats::RunStatistics;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Everything the runner tells its listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum SuiteEvent {
    #[serde(rename = "suite:start")]
    SuiteStart,
    #[serde(rename = "suite:configuration")]
    SuiteConfiguration(ConfigurationData),
    #[serde(rename = "context:start")]
    ContextStart(ContextData),
    #[serde(rename = "context:end")]
    ContextEnd(ContextData),
    #[serde(rename = "context:unsupported")]
    ContextUnsupported(UnsupportedData),
    #[serde(rename = "test:setUp")]
    TestSetUp(TestData),
    #[serde(rename = "test:tearDown")]
    TestTearDown(TestData),
    #[serde(rename = "test:start")]
    TestStart(TestData),
    #[serde(rename = "test:async")]
    TestAsync(TestData),
    #[serde(rename = "test:success")]
    TestSuccess(SuccessData),
    #[serde(rename = "test:failure")]
    TestFailure(FailureData),
    #[serde(rename = "test:error")]
    TestError(FailureData),
    #[serde(rename = "test:timeout")]
    TestTimeout(FailureData),
    #[serde(rename = "test:deferred")]
    TestDeferred(DeferredData),
    #[serde(rename = "runner:focus")]
    RunnerFocus,
    #[serde(rename = "uncaughtException")]
    UncaughtException(UncaughtData),
    #[serde(rename = "suite:end")]
    SuiteEnd(RunStatistics),
}

impl SuiteEvent {
    /// Wire name of the event, e.g. `test:success`.
    pub fn name(&self) -> &'static str {
        match self {
            SuiteEvent::SuiteStart => "suite:start",
            SuiteEvent::SuiteConfiguration(_) => "suite:configuration",
            SuiteEvent::ContextStart(_) => "context:start",
            SuiteEvent::ContextEnd(_) => "context:end",
            SuiteEvent::ContextUnsupported(_) => "context:unsupported",
            SuiteEvent::TestSetUp(_) => "test:setUp",
            SuiteEvent::TestTearDown(_) => "test:tearDown",
            SuiteEvent::TestStart(_) => "test:start",
            SuiteEvent::TestAsync(_) => "test:async",
            SuiteEvent::TestSuccess(_) => "test:success",
            SuiteEvent::TestFailure(_) => "test:failure",
            SuiteEvent::TestError(_) => "test:error",
            SuiteEvent::TestTimeout(_) => "test:timeout",
            SuiteEvent::TestDeferred(_) => "test:deferred",
            SuiteEvent::RunnerFocus => "runner:focus",
            SuiteEvent::UncaughtException(_) => "uncaughtException",
            SuiteEvent::SuiteEnd(_) => "suite:end",
        }
    }

    /// Name of the test or context the event is about, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            SuiteEvent::ContextStart(data) | SuiteEvent::ContextEnd(data) => Some(&data.name),
            SuiteEvent::ContextUnsupported(data) => Some(&data.name),
            SuiteEvent::TestSetUp(data)
            | SuiteEvent::TestTearDown(data)
            | SuiteEvent::TestStart(data)
            | SuiteEvent::TestAsync(data) => Some(&data.name),
            SuiteEvent::TestSuccess(data) => Some(&data.name),
            SuiteEvent::TestFailure(data)
            | SuiteEvent::TestError(data)
            | SuiteEvent::TestTimeout(data) => Some(&data.name),
            SuiteEvent::TestDeferred(data) => Some(&data.name),
            _ => None,
        }
    }

    /// True for the events that conclude a test.
    pub fn is_test_outcome(&self) -> bool {
        matches!(
            self,
            SuiteEvent::TestSuccess(_)
                | SuiteEvent::TestFailure(_)
                | SuiteEvent::TestError(_)
                | SuiteEvent::TestTimeout(_)
                | SuiteEvent::TestDeferred(_)
        )
    }
}

/// Runtime description supplied by the embedding harness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationData {
    pub runtime: RuntimeInfo,
    pub tests: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextData {
    pub name: String,
    /// Enclosing context names, outermost first.
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsupportedData {
    pub name: String,
    pub path: Vec<String>,
    pub unsupported: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestData {
    pub name: String,
    pub path: Vec<String>,
    /// The test case instance the hooks and body share.
    #[serde(skip)]
    pub fixture: Option<Fixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessData {
    pub name: String,
    pub path: Vec<String>,
    pub assertions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureData {
    pub name: String,
    pub path: Vec<String>,
    pub error: ErrorReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeferredData {
    pub name: String,
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncaughtData {
    pub error: ErrorReport,
}

/// An event stamped at emission time.
#[derive(Debug, Clone)]
pub struct SuiteEnvelope {
    pub ts: String,
    pub event: SuiteEvent,
}

impl SuiteEnvelope {
    pub fn with_now(event: SuiteEvent) -> Self {
        Self {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event,
        }
    }
}

/// An event with its position in the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub ts: String,
    pub seq: u64,
    #[serde(flatten)]
    pub event: SuiteEvent,
}

impl SequencedEvent {
    pub fn from_envelope(envelope: SuiteEnvelope, seq: u64) -> Self {
        Self {
            ts: envelope.ts,
            seq,
            event: envelope.event,
        }
    }
}
