//! Error types for the suite runner.
//!
//! Failures *inside* a run (assertion failures, timeouts, hook errors) are not
//! errors of this crate: they are classified and reported as events. The types
//! here cover misuse of the builder and of the configuration layer.

use thiserror::Error;

/// Errors raised while turning a description into a context tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Context name must be a non-empty string")]
    EmptyContextName,

    #[error("Test name in context '{0}' is empty after stripping markers")]
    EmptyTestName(String),

    #[error("Description for context '{0}' must be a mapping or a description callback")]
    InvalidDescription(String),

    #[error("Hook '{hook}' in context '{context}' must be a function")]
    InvalidHook { context: String, hook: String },

    #[error("'{key}' in context '{context}' must map requirement names to predicates")]
    InvalidRequirements { context: String, key: String },

    #[error("Description callback for context '{0}' was dropped without finishing")]
    Unfinished(String),
}

/// Configuration and logging errors
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for SuiteError {
    fn from(err: config::ConfigError) -> Self {
        SuiteError::ConfigError(err.to_string())
    }
}
