use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, PaginatedRequestParam, ReadResourceRequestParam,
    ReadResourceResult, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};

use crate::errors::McpError;
use crate::resources::CrmResources;
use crate::tools::CrmTools;
use crate::workspace::WorkspaceRegistry;

const INSTRUCTIONS: &str = "Tools and resources for the Twenty CRM. Every tool accepts an \
optional `workspace` argument; the default workspace is used when it is omitted.";

#[derive(Clone)]
pub struct TwentyServerHandler {
    tools: CrmTools,
    resources: CrmResources,
}

impl TwentyServerHandler {
    pub fn new(registry: Arc<WorkspaceRegistry>) -> Self {
        Self {
            tools: CrmTools::new(registry.clone()),
            resources: CrmResources::new(registry),
        }
    }
}

impl ServerHandler for TwentyServerHandler {
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.tools.call(&request.name, request.arguments).await
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: self.tools.tools(),
        })
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            next_cursor: None,
            resources: self.resources.resources(),
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(ListResourceTemplatesResult {
            next_cursor: None,
            resource_templates: self.resources.templates(),
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.resources.read(&request.uri).await
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "Twenty CRM MCP Server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }
}
