//! Workspace config file source: suite-runner.toml and suite-runner.{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;
use tracing::debug;

pub const BASE_CONFIG_FILE: &str = "suite-runner.toml";

/// Selects the environment-specific file.
pub const ENV_VAR: &str = "SUITE_RUNNER_ENV";

/// Add workspace config files to builder.
/// Precedence: suite-runner.toml (base) then suite-runner.{SUITE_RUNNER_ENV}.toml.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = builder;

    let base_config_path = workspace_root.join(BASE_CONFIG_FILE);
    if base_config_path.exists() {
        debug!(path = %base_config_path.display(), "Adding base config file");
        builder = builder.add_source(File::from(base_config_path).required(false));
    }

    if let Ok(env_name) = std::env::var(ENV_VAR) {
        let env_config_path = workspace_root.join(format!("suite-runner.{}.toml", env_name));
        if env_config_path.exists() {
            debug!(path = %env_config_path.display(), "Adding environment config file");
            builder = builder.add_source(File::from(env_config_path).required(false));
        }
    }

    Ok(builder)
}
