//! Runtime utilities
//!
//! This module is only used by the main binary. It reads configuration and sets up logging.

mod config;
mod logging;

use std::path::Path;

pub use config::Config;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use tracing_appender::non_blocking::WorkerGuard;

/// Separator to use when drilling down into nested options in the env figment
const ENV_NESTED_SEPARATOR: &str = "__";

/// Read configuration from environment variables only (when no config file is provided)
#[allow(clippy::result_large_err)]
pub fn read_config_from_env() -> Result<Config, figment::Error> {
    Figment::new()
        .join(twenty_env())
        .join(log_level_env())
        .extract()
}

/// Read in a config from a YAML file, filling in any missing values from the environment
#[allow(clippy::result_large_err)]
pub fn read_config(yaml_path: impl AsRef<Path>) -> Result<Config, figment::Error> {
    Figment::new()
        .join(twenty_env())
        .join(log_level_env())
        .join(Yaml::file(yaml_path))
        .extract()
}

/// Sets up logging as configured
pub fn setup_logging(config: &Config) -> Result<Option<WorkerGuard>, anyhow::Error> {
    config.logging.init()
}

/// `TWENTY_*` variables. The workspaces document is JSON and is read separately.
fn twenty_env() -> Env {
    Env::prefixed("TWENTY_")
        .ignore(&["workspaces", "log_level"])
        .split(ENV_NESTED_SEPARATOR)
}

/// `TWENTY_LOG_LEVEL` as a shorthand for `TWENTY_LOGGING__LEVEL`
fn log_level_env() -> Env {
    Env::raw()
        .only(&["TWENTY_LOG_LEVEL"])
        .map(|_| "logging.level".into())
}
