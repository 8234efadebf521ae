use tokio::task::JoinError;

/// A failed call to the Twenty GraphQL API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TwentyApiError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request timeout - API took too long to respond")]
    Timeout,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQL(Vec<String>),
}

impl TwentyApiError {
    /// The HTTP status code, only known for non-success responses
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Timeout | Self::Transport(_) | Self::GraphQL(_) => None,
        }
    }
}

/// An error resolving a workspace or its client
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("No valid workspaces are configured")]
    NoWorkspaces,

    #[error("Workspace '{name}' not found. Available: {}", .available.join(", "))]
    NotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("Failed to create client for workspace '{name}': {source}")]
    Client {
        name: String,
        source: reqwest::Error,
    },
}

/// A tool call that reached the CRM layer but could not be completed
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Api(#[from] TwentyApiError),
}

/// An error in server initialization
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Either TWENTY_WORKSPACES or both TWENTY_BASE_URL and TWENTY_API_KEY must be set")]
    MissingWorkspaceConfig,

    #[error("Invalid JSON in TWENTY_WORKSPACES: {0}")]
    WorkspacesJson(#[from] serde_json::Error),

    #[error("Invalid TWENTY_WORKSPACES format: expected an object with a `workspaces` list")]
    WorkspacesFormat,

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("Failed to initialize MCP server: {0}")]
    McpInitialize(String),

    #[error("Could not bind server: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start server")]
    StartupError(#[from] JoinError),
}

/// An MCP tool error
pub type McpError = rmcp::model::ErrorData;
