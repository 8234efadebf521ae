use std::time::Duration;

use schemars::JsonSchema;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use twenty_mcp_server::errors::ServerError;
use twenty_mcp_server::server::Transport;
use twenty_mcp_server::workspace::{
    Workspace, WorkspaceEntry, parse_workspaces_document, resolve_workspaces,
};

use super::logging::Logging;

/// Environment variable holding a `{"workspaces": [...]}` JSON document
pub const WORKSPACES_ENV: &str = "TWENTY_WORKSPACES";

mod defaults {
    pub(super) const fn timeout() -> u64 {
        30
    }
}

/// Configuration for the MCP server
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// The base URL of a single Twenty instance, used when no workspaces are listed
    pub base_url: Option<String>,

    /// The API key for `base_url`
    #[schemars(with = "Option<String>")]
    pub api_key: Option<SecretString>,

    /// Named workspaces. The first one is the default.
    pub workspaces: Vec<WorkspaceEntry>,

    /// Timeout for each request to Twenty, in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout: u64,

    /// Logging configuration
    pub logging: Logging,

    /// The type of server transport to use
    pub transport: Transport,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            workspaces: Vec::new(),
            timeout: defaults::timeout(),
            logging: Logging::default(),
            transport: Transport::default(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Resolve the workspaces to serve.
    ///
    /// A `TWENTY_WORKSPACES` document replaces any configured list. When no list is given the
    /// base URL and API key make a single workspace named `default`.
    pub fn workspaces(&self) -> Result<Vec<Workspace>, ServerError> {
        let entries = match std::env::var(WORKSPACES_ENV) {
            Ok(document) if !document.trim().is_empty() => parse_workspaces_document(&document)?,
            _ => self.workspaces.clone(),
        };

        resolve_workspaces(
            entries,
            self.base_url.as_deref(),
            self.api_key.as_ref().map(|key| key.expose_secret()),
        )
    }
}
