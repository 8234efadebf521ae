//! Logging configuration and subscriber setup
//!
//! Logs go to stderr, since stdout carries the stdio transport, or to a rolling file when a
//! path is configured.

mod defaults;
mod log_rotation_kind;

use std::path::{Path, PathBuf};

pub use log_rotation_kind::LogRotationKind;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Logging related options
#[derive(Debug, Deserialize, JsonSchema)]
pub struct Logging {
    /// The log level to use for tracing
    #[serde(default = "defaults::log_level", deserialize_with = "level_from_str")]
    #[schemars(schema_with = "level")]
    pub level: Level,

    /// A directory to write log files to, instead of stderr
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Log file rotation period when a path is set
    /// [default: daily]
    #[serde(default = "defaults::default_rotation")]
    pub rotation: LogRotationKind,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            path: None,
            rotation: defaults::default_rotation(),
        }
    }
}

impl Logging {
    /// `RUST_LOG` directives plus the configured level. The MCP library is quieted at INFO.
    pub fn env_filter(&self) -> Result<EnvFilter, anyhow::Error> {
        let mut env_filter = EnvFilter::from_default_env().add_directive(self.level.into());
        if self.level == Level::INFO {
            env_filter = env_filter.add_directive("rmcp=warn".parse()?);
        }
        Ok(env_filter)
    }

    /// Install the global subscriber. The returned guard must be held for file logs to flush.
    pub fn init(&self) -> Result<Option<WorkerGuard>, anyhow::Error> {
        let env_filter = self.env_filter()?;

        let (writer, guard, with_ansi) = match self.path.as_deref().and_then(|path| {
            file_appender(path, self.rotation.clone())
                .inspect_err(|e| eprintln!("Log file setup failed, falling back to stderr: {e}"))
                .ok()
        }) {
            Some(appender) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                (BoxMakeWriter::new(non_blocking), Some(guard), false)
            }
            None => (BoxMakeWriter::new(std::io::stderr), None, true),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(with_ansi)
                    .with_target(false),
            )
            .try_init()?;

        Ok(guard)
    }
}

fn file_appender(
    path: &Path,
    rotation: LogRotationKind,
) -> Result<RollingFileAppender, anyhow::Error> {
    std::fs::create_dir_all(path)?;
    Ok(RollingFileAppender::builder()
        .rotation(rotation.into())
        .filename_prefix("twenty_mcp_server")
        .filename_suffix("log")
        .build(path)?)
}

fn level_from_str<'de, D>(deserializer: D) -> Result<Level, D::Error>
where
    D: Deserializer<'de>,
{
    let level = String::deserialize(deserializer)?;
    level.parse().map_err(serde::de::Error::custom)
}

fn level(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    /// Log level
    #[derive(JsonSchema)]
    #[schemars(rename_all = "lowercase")]
    #[allow(dead_code)]
    enum Level {
        Trace,
        Debug,
        Info,
        Warn,
        Error,
    }

    Level::json_schema(generator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"level": "debug"}"#, Level::DEBUG)]
    #[case(r#"{"level": "WARN"}"#, Level::WARN)]
    #[case("{}", Level::INFO)]
    fn parses_level(#[case] input: &str, #[case] expected: Level) {
        let logging: Logging = serde_json::from_str(input).unwrap();
        assert_eq!(logging.level, expected);
        assert_eq!(logging.rotation, LogRotationKind::Daily);
    }

    #[test]
    fn rejects_unknown_level() {
        assert!(serde_json::from_str::<Logging>(r#"{"level": "loud"}"#).is_err());
    }

    #[test]
    fn file_appender_creates_directory() {
        let dir = std::env::temp_dir().join(format!("twenty-mcp-logs-{}", std::process::id()));

        file_appender(&dir, LogRotationKind::Never).unwrap();

        assert!(dir.is_dir());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
