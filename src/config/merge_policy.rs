//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("runner.timeout_ms", super::default_timeout_ms())?
        .set_default("runner.fail_on_no_assertions", true)?
        .set_default("runner.random", true)?
        .set_default("logging.level", "info")
}
