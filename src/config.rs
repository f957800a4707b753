//! Configuration System
//!
//! Layered runner configuration: built-in defaults, then the workspace
//! configuration files, then `SUITE_RUNNER__*` environment variables. The
//! result is validated before it is handed to a [`Runner`](crate::runner::Runner).

use crate::context::filter::NameFilter;
use crate::error::SuiteError;
use crate::logging::LoggingConfig;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

mod merge_policy;
mod sources;

pub use sources::workspace_file::{BASE_CONFIG_FILE, ENV_VAR as CONFIG_ENV_VAR};

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Default budget for every timeboxed operation, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Fail tests that run no assertions.
    #[serde(default = "default_true")]
    pub fail_on_no_assertions: bool,

    /// Shuffle sibling contexts and tests.
    #[serde(default = "default_true")]
    pub random: bool,

    /// Seed for the shuffle; drawn at random when absent.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

pub(crate) fn default_timeout_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            fail_on_no_assertions: true,
            random: true,
            random_seed: None,
        }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Run siblings in declaration order.
    pub fn sequential(mut self) -> Self {
        self.random = false;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random = true;
        self.random_seed = Some(seed);
        self
    }

    pub fn fail_on_no_assertions(mut self, enabled: bool) -> Self {
        self.fail_on_no_assertions = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteConfig {
    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Name patterns; a test runs when any of them matches.
    #[serde(default)]
    pub filter: Vec<String>,
}

impl SuiteConfig {
    pub fn validate(&self) -> Result<(), SuiteError> {
        self.runner.validate().map_err(SuiteError::Validation)
    }

    pub fn name_filter(&self) -> NameFilter {
        if self.filter.is_empty() {
            NameFilter::All
        } else {
            NameFilter::any_of(&self.filter)
        }
    }
}

/// Loads [`SuiteConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the workspace at `root`.
    pub fn load(root: &Path) -> Result<SuiteConfig, SuiteError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = sources::workspace_file::add_to_builder(builder, root)?;
        let builder = sources::environment::add_to_builder(builder);
        let config: SuiteConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(root = %root.display(), ?config.runner, "Configuration loaded");
        Ok(config)
    }

    /// Load a single file over the defaults, without environment overrides.
    pub fn load_from_file(path: &Path) -> Result<SuiteConfig, SuiteError> {
        let config: SuiteConfig = merge_policy::builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Result<SuiteConfig, SuiteError> {
        Ok(Config::builder().build()?.try_deserialize()?)
    }
}
