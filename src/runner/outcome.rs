//! Failure taxonomy and outcome classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The operation a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "setUp")]
    SetUp,
    #[serde(rename = "test function")]
    TestFunction,
    #[serde(rename = "tearDown")]
    TearDown,
    #[serde(rename = "contextSetUp")]
    ContextSetUp,
    #[serde(rename = "contextTearDown")]
    ContextTearDown,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::SetUp => "setUp",
            Phase::TestFunction => "test function",
            Phase::TearDown => "tearDown",
            Phase::ContextSetUp => "contextSetUp",
            Phase::ContextTearDown => "contextTearDown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected-vs-actual mismatch, including the synthesized assertion-count failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AssertionError {
    pub message: String,
}

impl AssertionError {
    pub const KIND: &'static str = "AssertionError";

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn no_assertions() -> Self {
        Self::new("No assertions!")
    }

    pub(crate) fn wrong_count(expected: usize, actual: usize) -> Self {
        Self::new(format!(
            "Expected {} assertions, ran {}",
            expected, actual
        ))
    }
}

/// An operation exceeded its time budget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{phase} timed out after {}ms", .after.as_millis())]
pub struct TimeoutError {
    pub phase: Phase,
    pub after: Duration,
}

impl TimeoutError {
    pub const KIND: &'static str = "TimeoutError";
}

/// Why an operation did not succeed.
#[derive(Debug)]
pub enum Failure {
    Assertion(AssertionError),
    Timeout(TimeoutError),
    Error { error: anyhow::Error, phase: Phase },
}

impl Failure {
    /// Classify an error returned by a hook or test body.
    pub fn classify(error: anyhow::Error, phase: Phase) -> Self {
        if let Some(assertion) = error.downcast_ref::<AssertionError>() {
            return Failure::Assertion(assertion.clone());
        }
        if let Some(timeout) = error.downcast_ref::<TimeoutError>() {
            return Failure::Timeout(timeout.clone());
        }
        Failure::Error { error, phase }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Failure::Timeout(_))
    }

    pub fn report(&self) -> ErrorReport {
        match self {
            Failure::Assertion(err) => ErrorReport {
                kind: AssertionError::KIND.to_string(),
                message: err.message.clone(),
                stack: None,
                source: None,
            },
            Failure::Timeout(err) => ErrorReport {
                kind: TimeoutError::KIND.to_string(),
                message: err.to_string(),
                stack: None,
                source: Some(err.phase),
            },
            Failure::Error { error, phase } => {
                let causes: Vec<String> = error.chain().skip(1).map(|c| c.to_string()).collect();
                ErrorReport {
                    kind: "Error".to_string(),
                    message: error.to_string(),
                    stack: if causes.is_empty() {
                        None
                    } else {
                        Some(format!("Caused by: {}", causes.join("\nCaused by: ")))
                    },
                    source: Some(*phase),
                }
            }
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Assertion(err) => write!(f, "{}", err),
            Failure::Timeout(err) => write!(f, "{}", err),
            Failure::Error { error, phase } => write!(f, "{} ({})", error, phase),
        }
    }
}

/// Serializable error payload carried by failure events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Phase>,
}
