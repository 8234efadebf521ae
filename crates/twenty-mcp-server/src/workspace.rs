//! Twenty workspaces and the per-workspace client registry

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use schemars::JsonSchema;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::errors::{ServerError, WorkspaceError};
use crate::graphql::TwentyClient;

/// The name given to a workspace that does not name itself
pub const DEFAULT_WORKSPACE_NAME: &str = "default";

/// Connection details for one Twenty CRM tenant
#[derive(Debug)]
pub struct Workspace {
    name: String,
    base_url: String,
    api_key: SecretString,
}

impl Workspace {
    /// Create a workspace, removing any trailing slashes from the base URL
    pub fn new(
        name: impl Into<String>,
        base_url: impl AsRef<str>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            api_key: SecretString::from(api_key.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    /// The GraphQL endpoint of this workspace
    pub fn graphql_endpoint(&self) -> String {
        format!("{}/graphql", self.base_url)
    }

    /// A workspace is usable only when every field is set and the base URL is an HTTP(S) URL
    pub fn is_valid(&self) -> bool {
        let http_scheme = |url: Url| matches!(url.scheme(), "http" | "https");
        !self.name.is_empty()
            && !self.api_key.expose_secret().is_empty()
            && Url::parse(&self.base_url).is_ok_and(http_scheme)
    }
}

/// A workspace as written in configuration, before validation
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct WorkspaceEntry {
    /// The workspace name [default: default]
    pub name: Option<String>,

    /// The base URL of the Twenty instance
    pub base_url: Option<String>,

    /// The API key used as a bearer token
    pub api_key: Option<String>,
}

impl From<WorkspaceEntry> for Workspace {
    fn from(entry: WorkspaceEntry) -> Self {
        Workspace::new(
            entry
                .name
                .unwrap_or_else(|| DEFAULT_WORKSPACE_NAME.to_string()),
            entry.base_url.unwrap_or_default(),
            entry.api_key.unwrap_or_default(),
        )
    }
}

#[derive(Deserialize)]
struct WorkspacesDocument {
    workspaces: Vec<serde_json::Value>,
}

/// Parse a `{"workspaces": [...]}` document. Entries that cannot be read are skipped with a
/// warning.
pub fn parse_workspaces_document(json: &str) -> Result<Vec<WorkspaceEntry>, ServerError> {
    let document: serde_json::Value = serde_json::from_str(json)?;
    let document: WorkspacesDocument =
        serde_json::from_value(document).map_err(|_| ServerError::WorkspacesFormat)?;

    Ok(document
        .workspaces
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(index, "Skipping unreadable workspace entry: {e}");
                None
            }
        })
        .collect())
}

/// Decide which workspaces to serve.
///
/// A non-empty list of entries wins. Otherwise a base URL and API key make a single workspace
/// named `default`.
pub fn resolve_workspaces(
    entries: Vec<WorkspaceEntry>,
    base_url: Option<&str>,
    api_key: Option<&str>,
) -> Result<Vec<Workspace>, ServerError> {
    if !entries.is_empty() {
        return Ok(entries.into_iter().map(Workspace::from).collect());
    }

    match (
        base_url.filter(|url| !url.is_empty()),
        api_key.filter(|key| !key.is_empty()),
    ) {
        (Some(base_url), Some(api_key)) => Ok(vec![Workspace::new(
            DEFAULT_WORKSPACE_NAME,
            base_url,
            api_key,
        )]),
        _ => Err(ServerError::MissingWorkspaceConfig),
    }
}

/// Resolves workspace names to shared clients.
///
/// The first workspace is the default. Clients are created on first use and reused for the
/// life of the registry.
pub struct WorkspaceRegistry {
    workspaces: Vec<Arc<Workspace>>,
    timeout: Duration,
    clients: Mutex<HashMap<String, Arc<TwentyClient>>>,
}

impl WorkspaceRegistry {
    /// Build a registry from configured workspaces. Invalid workspaces are dropped, and a later
    /// workspace with an existing name replaces the earlier one in place.
    pub fn new(workspaces: Vec<Workspace>, timeout: Duration) -> Result<Self, WorkspaceError> {
        let mut valid: Vec<Arc<Workspace>> = Vec::new();
        for workspace in workspaces {
            if !workspace.is_valid() {
                warn!(name = %workspace.name(), "Skipping workspace with a missing name or api_key, or an invalid base_url");
                continue;
            }
            let workspace = Arc::new(workspace);
            match valid.iter_mut().find(|w| w.name() == workspace.name()) {
                Some(existing) => *existing = workspace,
                None => valid.push(workspace),
            }
        }

        if valid.is_empty() {
            return Err(WorkspaceError::NoWorkspaces);
        }

        Ok(Self {
            workspaces: valid,
            timeout,
            clients: Mutex::new(HashMap::new()),
        })
    }

    /// The default workspace name
    pub fn default_name(&self) -> &str {
        self.workspaces
            .first()
            .map(|workspace| workspace.name())
            .unwrap_or(DEFAULT_WORKSPACE_NAME)
    }

    /// All workspace names, default first
    pub fn names(&self) -> Vec<String> {
        self.workspaces
            .iter()
            .map(|workspace| workspace.name().to_string())
            .collect()
    }

    /// Look up a workspace by name, or the default when no name is given
    pub fn workspace(&self, name: Option<&str>) -> Result<Arc<Workspace>, WorkspaceError> {
        let name = name.unwrap_or_else(|| self.default_name());
        self.workspaces
            .iter()
            .find(|workspace| workspace.name() == name)
            .cloned()
            .ok_or_else(|| WorkspaceError::NotFound {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// The client for a workspace, created on first use
    pub fn client(&self, name: Option<&str>) -> Result<Arc<TwentyClient>, WorkspaceError> {
        let workspace = self.workspace(name)?;
        let mut clients = self.clients.lock();
        match clients.entry(workspace.name().to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                debug!(workspace = %workspace.name(), "Creating Twenty client");
                let name = workspace.name().to_string();
                let client = TwentyClient::new(workspace, self.timeout)
                    .map_err(|source| WorkspaceError::Client { name, source })?;
                Ok(entry.insert(Arc::new(client)).clone())
            }
        }
    }
}
