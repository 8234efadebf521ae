use std::net::IpAddr;
use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, ValueEnum};
use runtime::Config;
use tracing::{info, warn};
use twenty_mcp_server::server::{Server, Transport, defaults};
use twenty_mcp_server::workspace::WorkspaceRegistry;

mod runtime;

/// Clap styling
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Arguments to the MCP server
#[derive(Debug, clap::Parser)]
#[command(
    version,
    styles = STYLES,
    about = "Twenty MCP Server - manage Twenty CRM records from an AI agent",
)]
struct Args {
    /// Path to the config file
    config: Option<PathBuf>,

    /// The transport to serve on, overriding the config file
    #[arg(long, value_enum)]
    transport: Option<TransportKind>,

    /// The IP address to bind to for SSE and HTTP
    ///
    /// [default: 127.0.0.1]
    #[arg(long)]
    host: Option<IpAddr>,

    /// The port to bind to for SSE and HTTP
    ///
    /// [default: 8000]
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    Stdio,
    Sse,
    /// Alias of streamable-http
    Http,
    StreamableHttp,
}

impl Args {
    /// The configured transport with any command line overrides applied
    fn transport(&self, configured: Transport) -> Transport {
        let (configured_address, configured_port) = match &configured {
            Transport::Stdio => (None, None),
            Transport::SSE { address, port } | Transport::StreamableHttp { address, port } => {
                (Some(*address), Some(*port))
            }
        };
        let address = self
            .host
            .or(configured_address)
            .unwrap_or_else(defaults::address);
        let port = self.port.or(configured_port).unwrap_or_else(defaults::port);

        match self.transport {
            None => match configured {
                Transport::Stdio => Transport::Stdio,
                Transport::SSE { .. } => Transport::SSE { address, port },
                Transport::StreamableHttp { .. } => Transport::StreamableHttp { address, port },
            },
            Some(TransportKind::Stdio) => Transport::Stdio,
            Some(TransportKind::Sse) => Transport::SSE { address, port },
            Some(TransportKind::Http | TransportKind::StreamableHttp) => {
                Transport::StreamableHttp { address, port }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config: Config = match &args.config {
        Some(config_path) => runtime::read_config(config_path)?,
        None => runtime::read_config_from_env()?,
    };

    let _guard = runtime::setup_logging(&config)?;

    info!(
        "Twenty MCP Server v{} // Licensed under MIT",
        std::env!("CARGO_PKG_VERSION")
    );

    let transport = args.transport(config.transport.clone());
    if matches!(transport, Transport::Stdio) && (args.host.is_some() || args.port.is_some()) {
        warn!("--host and --port are ignored with the stdio transport");
    }

    let registry = WorkspaceRegistry::new(config.workspaces()?, config.timeout())?;
    info!(
        default = %registry.default_name(),
        "Twenty MCP Server initialized with {} workspace(s)",
        registry.names().len()
    );

    Ok(Server::builder()
        .transport(transport)
        .registry(registry)
        .build()
        .start()
        .await?)
}
