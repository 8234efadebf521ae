use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use bon::bon;
use rmcp::ServiceExt as _;
use rmcp::transport::sse_server::SseServerConfig;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::{SseServer, StreamableHttpService, stdio};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::errors::ServerError;
use crate::server_handler::TwentyServerHandler;
use crate::workspace::WorkspaceRegistry;

/// The MCP transport to serve on
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transport {
    /// Serve over standard input and output
    #[default]
    Stdio,

    /// Serve with Server-Sent Events at `/sse`, receiving messages at `/message`
    #[serde(rename = "sse")]
    SSE {
        /// The IP address to bind to
        #[serde(default = "defaults::address")]
        address: IpAddr,

        /// The port to bind to
        #[serde(default = "defaults::port")]
        port: u16,
    },

    /// Serve with the Streamable HTTP transport at `/mcp`
    StreamableHttp {
        /// The IP address to bind to
        #[serde(default = "defaults::address")]
        address: IpAddr,

        /// The port to bind to
        #[serde(default = "defaults::port")]
        port: u16,
    },
}

pub mod defaults {
    use super::*;

    pub fn address() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    pub const fn port() -> u16 {
        8000
    }
}

/// A Twenty CRM MCP server
pub struct Server {
    transport: Transport,
    registry: Arc<WorkspaceRegistry>,
}

#[bon]
impl Server {
    #[builder]
    pub fn new(transport: Transport, registry: WorkspaceRegistry) -> Self {
        Self {
            transport,
            registry: Arc::new(registry),
        }
    }

    /// Serve until the transport closes or a shutdown signal arrives
    pub async fn start(self) -> Result<(), ServerError> {
        let handler = TwentyServerHandler::new(self.registry);

        match self.transport {
            Transport::StreamableHttp { address, port } => {
                info!(port = ?port, address = ?address, "Starting MCP server in Streamable HTTP mode");
                let listen_address = SocketAddr::new(address, port);
                let service = StreamableHttpService::new(
                    move || Ok(handler.clone()),
                    LocalSessionManager::default().into(),
                    Default::default(),
                );
                let router = axum::Router::new().nest_service("/mcp", service);
                let tcp_listener = tokio::net::TcpListener::bind(listen_address).await?;
                axum::serve(tcp_listener, router)
                    .with_graceful_shutdown(shutdown_signal())
                    .await?;
            }
            Transport::SSE { address, port } => {
                info!(port = ?port, address = ?address, "Starting MCP server in SSE mode");
                let cancellation_token = CancellationToken::new();
                let server = SseServer::serve_with_config(SseServerConfig {
                    bind: SocketAddr::new(address, port),
                    sse_path: "/sse".to_string(),
                    post_path: "/message".to_string(),
                    ct: cancellation_token.clone(),
                    sse_keep_alive: None,
                })
                .await?;
                let ct = server.with_service(move || handler.clone());

                shutdown_signal().await;
                info!("Shutting down MCP server");
                ct.cancel();
                cancellation_token.cancel();
            }
            Transport::Stdio => {
                info!("Starting MCP server in stdio mode");
                let service = handler
                    .serve(stdio())
                    .await
                    .inspect_err(|e| {
                        error!("serving error: {:?}", e);
                    })
                    .map_err(|e| ServerError::McpInitialize(e.to_string()))?;
                service.waiting().await.map_err(ServerError::StartupError)?;
            }
        }

        Ok(())
    }
}

#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!({"type": "stdio"}), Transport::Stdio)]
    #[case(
        json!({"type": "sse", "port": 9000}),
        Transport::SSE { address: defaults::address(), port: 9000 }
    )]
    #[case(
        json!({"type": "streamable_http", "address": "0.0.0.0"}),
        Transport::StreamableHttp { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 8000 }
    )]
    fn parses_transport(#[case] input: serde_json::Value, #[case] expected: Transport) {
        assert_eq!(
            serde_json::from_value::<Transport>(input).unwrap(),
            expected
        );
    }

    #[test]
    fn defaults_to_stdio() {
        assert_eq!(Transport::default(), Transport::Stdio);
    }
}
