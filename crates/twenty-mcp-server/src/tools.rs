//! MCP tools over the Twenty CRM
//!
//! Every object gets get, list, create, update and delete tools. People, companies and
//! opportunities also get basic and complex search. Workspace and metadata tools complete the set.
//! All tools take an optional `workspace` argument naming the workspace to call.

use std::str::FromStr;
use std::sync::Arc;

use rmcp::model::{CallToolResult, Content, ErrorCode, Tool};
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error};
use twenty_query::{Filter, ListQuery, OrderBy, OrderDirection};

use crate::errors::{McpError, ToolError};
use crate::graphql::{JsonObject, TwentyClient};
use crate::objects::CrmObject;
use crate::workspace::WorkspaceRegistry;

/// Page size when the caller does not give one
const DEFAULT_LIMIT: u32 = 20;

const LIST_WORKSPACES_TOOL_NAME: &str = "list_workspaces";
const WORKSPACE_INFO_TOOL_NAME: &str = "get_workspace_info";
const OBJECTS_TOOL_NAME: &str = "get_objects";
const OBJECT_SCHEMA_TOOL_NAME: &str = "get_object_schema";
const FIELDS_TOOL_NAME: &str = "get_fields";

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_order_direction() -> String {
    "ASC".to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetInput {
    /// The record ID
    id: String,

    /// Workspace name (uses default if not specified)
    workspace: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListInput {
    /// Maximum number of records to return (default: 20)
    #[serde(default = "default_limit")]
    limit: u32,

    /// Cursor to continue from, taken from `pageInfo.endCursor` of a previous page
    cursor: Option<String>,

    /// Filter conditions, all of which must match
    #[serde(default)]
    filters: Vec<Filter>,

    /// Field to order by
    order_by: Option<String>,

    /// Order direction: ASC, DESC, AscNullsFirst, AscNullsLast, DescNullsFirst or DescNullsLast
    /// (default: ASC)
    #[serde(default = "default_order_direction")]
    order_direction: String,

    /// Workspace name (uses default if not specified)
    workspace: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateInput {
    /// Field values of the new record
    data: JsonObject,

    /// Workspace name (uses default if not specified)
    workspace: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateInput {
    /// The record ID
    id: String,

    /// Fields to update
    data: JsonObject,

    /// Workspace name (uses default if not specified)
    workspace: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchInput {
    /// Text to look for in the record name
    query: String,

    /// Maximum number of results (default: 20)
    #[serde(default = "default_limit")]
    limit: u32,

    /// Workspace name (uses default if not specified)
    workspace: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ComplexSearchInput {
    /// Filter conditions. Each has a field, an operator and a value, for example
    /// `{"field": "city", "operator": "eq", "value": "New York"}`. Conditions can be grouped with
    /// `{"or": [...]}` and `{"and": [...]}`.
    filters: Vec<Filter>,

    /// Maximum number of results (default: 20)
    #[serde(default = "default_limit")]
    limit: u32,

    /// Field to order by
    order_by: Option<String>,

    /// Order direction: ASC or DESC (default: ASC)
    #[serde(default = "default_order_direction")]
    order_direction: String,

    /// Workspace name (uses default if not specified)
    workspace: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WorkspaceInput {
    /// Workspace name (uses default if not specified)
    workspace: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoInput {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ObjectInput {
    /// Singular name of the object (e.g., person, company, opportunity)
    object_name: String,

    /// Workspace name (uses default if not specified)
    workspace: Option<String>,
}

/// What a tool does when called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolKind {
    Get(CrmObject),
    List(CrmObject),
    Create(CrmObject),
    Update(CrmObject),
    Delete(CrmObject),
    SearchBasic(CrmObject),
    SearchComplex(CrmObject),
    ListWorkspaces,
    WorkspaceInfo,
    Objects,
    ObjectSchema,
    Fields,
}

impl ToolKind {
    fn all() -> Vec<ToolKind> {
        let mut kinds = Vec::new();
        for object in CrmObject::ALL {
            kinds.extend([
                ToolKind::Get(object),
                ToolKind::List(object),
                ToolKind::Create(object),
                ToolKind::Update(object),
                ToolKind::Delete(object),
            ]);
            if object.searchable() {
                kinds.extend([
                    ToolKind::SearchBasic(object),
                    ToolKind::SearchComplex(object),
                ]);
            }
        }
        kinds.extend([
            ToolKind::ListWorkspaces,
            ToolKind::WorkspaceInfo,
            ToolKind::Objects,
            ToolKind::ObjectSchema,
            ToolKind::Fields,
        ]);
        kinds
    }

    fn name(self) -> String {
        match self {
            ToolKind::Get(object) => format!("get_{}", object.noun()),
            ToolKind::List(object) => format!("get_{}", object.plural()),
            ToolKind::Create(object) => format!("create_{}", object.noun()),
            ToolKind::Update(object) => format!("update_{}", object.noun()),
            ToolKind::Delete(object) => format!("delete_{}", object.noun()),
            ToolKind::SearchBasic(object) => format!("search_{}_basic", object.plural()),
            ToolKind::SearchComplex(object) => format!("search_{}_complex", object.plural()),
            ToolKind::ListWorkspaces => LIST_WORKSPACES_TOOL_NAME.to_string(),
            ToolKind::WorkspaceInfo => WORKSPACE_INFO_TOOL_NAME.to_string(),
            ToolKind::Objects => OBJECTS_TOOL_NAME.to_string(),
            ToolKind::ObjectSchema => OBJECT_SCHEMA_TOOL_NAME.to_string(),
            ToolKind::Fields => FIELDS_TOOL_NAME.to_string(),
        }
    }

    fn description(self) -> String {
        match self {
            ToolKind::Get(object) => format!("Get a {} by ID from Twenty CRM", object.noun()),
            ToolKind::List(object) => format!(
                "List {} from Twenty CRM with cursor pagination, optional filters and ordering",
                object.plural()
            ),
            ToolKind::Create(object) => format!(
                "Create a new {} in Twenty CRM. Example data: {}",
                object.noun(),
                object.example_data()
            ),
            ToolKind::Update(object) => format!(
                "Update an existing {} in Twenty CRM. Only the given fields change.",
                object.noun()
            ),
            ToolKind::Delete(object) => format!("Delete a {} from Twenty CRM", object.noun()),
            ToolKind::SearchBasic(object) => {
                format!("Basic text search for {} in Twenty CRM", object.plural())
            }
            ToolKind::SearchComplex(object) => format!(
                "Advanced search for {} with filters. Operators: eq, neq, like, ilike, contains, gt, gte, lt, lte, in, isNull, isNotNull",
                object.plural()
            ),
            ToolKind::ListWorkspaces => "List all configured workspaces".to_string(),
            ToolKind::WorkspaceInfo => "Get information about a specific workspace".to_string(),
            ToolKind::Objects => "Get all objects in the Twenty CRM workspace".to_string(),
            ToolKind::ObjectSchema => {
                "Get the schema of a specific object in Twenty CRM".to_string()
            }
            ToolKind::Fields => "Get the fields of a specific object in Twenty CRM".to_string(),
        }
    }

    fn input_schema(self) -> Arc<JsonObject> {
        match self {
            ToolKind::Get(_) | ToolKind::Delete(_) => input_schema::<GetInput>(),
            ToolKind::List(_) => input_schema::<ListInput>(),
            ToolKind::Create(_) => input_schema::<CreateInput>(),
            ToolKind::Update(_) => input_schema::<UpdateInput>(),
            ToolKind::SearchBasic(_) => input_schema::<SearchInput>(),
            ToolKind::SearchComplex(_) => input_schema::<ComplexSearchInput>(),
            ToolKind::ListWorkspaces => input_schema::<NoInput>(),
            ToolKind::WorkspaceInfo | ToolKind::Objects => input_schema::<WorkspaceInput>(),
            ToolKind::ObjectSchema | ToolKind::Fields => input_schema::<ObjectInput>(),
        }
    }

    /// The action named in failure messages
    fn action(self) -> String {
        match self {
            ToolKind::Get(object) => format!("get {}", object.noun()),
            ToolKind::List(object) => format!("get {}", object.plural()),
            ToolKind::Create(object) => format!("create {}", object.noun()),
            ToolKind::Update(object) => format!("update {}", object.noun()),
            ToolKind::Delete(object) => format!("delete {}", object.noun()),
            ToolKind::SearchBasic(object) | ToolKind::SearchComplex(object) => {
                format!("search {}", object.plural())
            }
            ToolKind::ListWorkspaces => "list workspaces".to_string(),
            ToolKind::WorkspaceInfo => "get workspace info".to_string(),
            ToolKind::Objects => "get objects".to_string(),
            ToolKind::ObjectSchema => "get object schema".to_string(),
            ToolKind::Fields => "get fields".to_string(),
        }
    }
}

fn json_content(value: &Value) -> Content {
    Content::json(value).unwrap_or_else(|_| Content::text(value.to_string()))
}

fn input_schema<T: JsonSchema>() -> Arc<JsonObject> {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(schema)) => Arc::new(schema),
        _ => Arc::new(JsonObject::new()),
    }
}

/// The full set of CRM tools, bound to a workspace registry
#[derive(Clone)]
pub struct CrmTools {
    registry: Arc<WorkspaceRegistry>,
    tools: Vec<(ToolKind, Tool)>,
}

impl CrmTools {
    pub fn new(registry: Arc<WorkspaceRegistry>) -> Self {
        let tools = ToolKind::all()
            .into_iter()
            .map(|kind| {
                let tool = Tool::new(kind.name(), kind.description(), kind.input_schema());
                (kind, tool)
            })
            .collect();
        Self { registry, tools }
    }

    /// Every tool definition, in a stable order
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|(_, tool)| tool.clone()).collect()
    }

    /// Call a tool by name.
    ///
    /// Unknown tools and malformed arguments are protocol errors. Failures of the CRM call itself
    /// are returned as a tool result flagged as an error.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let kind = self
            .tools
            .iter()
            .find(|(_, tool)| tool.name == name)
            .map(|(kind, _)| *kind)
            .ok_or_else(|| tool_not_found(name))?;

        debug!(tool = name, "Calling tool");

        let result = match kind {
            ToolKind::Get(object) => self.get(object, convert_arguments(arguments)?).await,
            ToolKind::List(object) => {
                let input: ListInput = convert_arguments(arguments)?;
                let order_by = order_by(input.order_by.as_deref(), &input.order_direction)?;
                self.list(object, input, order_by).await
            }
            ToolKind::Create(object) => self.create(object, convert_arguments(arguments)?).await,
            ToolKind::Update(object) => self.update(object, convert_arguments(arguments)?).await,
            ToolKind::Delete(object) => self.delete(object, convert_arguments(arguments)?).await,
            ToolKind::SearchBasic(object) => {
                self.search(object, convert_arguments(arguments)?).await
            }
            ToolKind::SearchComplex(object) => {
                let input: ComplexSearchInput = convert_arguments(arguments)?;
                let order_by = order_by(input.order_by.as_deref(), &input.order_direction)?;
                self.search_complex(object, input, order_by).await
            }
            ToolKind::ListWorkspaces => {
                let _: NoInput = convert_arguments(arguments)?;
                Ok(self.list_workspaces())
            }
            ToolKind::WorkspaceInfo => self.workspace_info(convert_arguments(arguments)?),
            ToolKind::Objects => self.objects(convert_arguments(arguments)?).await,
            ToolKind::ObjectSchema => self.object_schema(convert_arguments(arguments)?).await,
            ToolKind::Fields => self.fields(convert_arguments(arguments)?).await,
        };

        Ok(match result {
            Ok(value) => CallToolResult {
                content: vec![json_content(&value)],
                is_error: None,
            },
            Err(e) => {
                let message = format!("Failed to {}: {e}", kind.action());
                error!(tool = name, "{message}");
                CallToolResult {
                    content: vec![Content::text(message)],
                    is_error: Some(true),
                }
            }
        })
    }

    fn client(&self, workspace: Option<&str>) -> Result<Arc<TwentyClient>, ToolError> {
        Ok(self.registry.client(workspace)?)
    }

    async fn get(&self, object: CrmObject, input: GetInput) -> Result<Value, ToolError> {
        let record = self
            .client(input.workspace.as_deref())?
            .get_record(object.plural(), &input.id, &[])
            .await?;
        Ok(json!({ "success": true, (object.noun()): record }))
    }

    async fn list(
        &self,
        object: CrmObject,
        input: ListInput,
        order_by: Option<OrderBy>,
    ) -> Result<Value, ToolError> {
        let query = ListQuery::builder()
            .object(object.plural())
            .limit(input.limit)
            .maybe_after(input.cursor)
            .filter(input.filters)
            .maybe_order_by(order_by)
            .build();
        let records = self
            .client(input.workspace.as_deref())?
            .get_records(&query)
            .await?;
        Ok(json!({ "success": true, (object.plural()): records }))
    }

    async fn create(&self, object: CrmObject, input: CreateInput) -> Result<Value, ToolError> {
        let record = self
            .client(input.workspace.as_deref())?
            .create_record(object.plural(), &input.data)
            .await?;
        Ok(json!({
            "success": true,
            "message": format!("{} created successfully", object.label()),
            (object.noun()): record,
        }))
    }

    async fn update(&self, object: CrmObject, input: UpdateInput) -> Result<Value, ToolError> {
        let record = self
            .client(input.workspace.as_deref())?
            .update_record(object.plural(), &input.id, &input.data)
            .await?;
        Ok(json!({
            "success": true,
            "message": format!("{} {} updated successfully", object.label(), input.id),
            (object.noun()): record,
        }))
    }

    async fn delete(&self, object: CrmObject, input: GetInput) -> Result<Value, ToolError> {
        self.client(input.workspace.as_deref())?
            .delete_record(object.plural(), &input.id)
            .await?;
        Ok(json!({
            "success": true,
            "message": format!("{} {} deleted successfully", object.label(), input.id),
        }))
    }

    async fn search(&self, object: CrmObject, input: SearchInput) -> Result<Value, ToolError> {
        let results = self
            .client(input.workspace.as_deref())?
            .search_records(object.plural(), &input.query, input.limit)
            .await?;
        Ok(json!({ "success": true, "results": results }))
    }

    async fn search_complex(
        &self,
        object: CrmObject,
        input: ComplexSearchInput,
        order_by: Option<OrderBy>,
    ) -> Result<Value, ToolError> {
        let results = self
            .client(input.workspace.as_deref())?
            .search_records_complex(object.plural(), input.filters, order_by, input.limit)
            .await?;
        Ok(json!({ "success": true, "results": results }))
    }

    fn list_workspaces(&self) -> Value {
        json!({
            "workspaces": self.registry.names(),
            "default": self.registry.default_name(),
        })
    }

    fn workspace_info(&self, input: WorkspaceInput) -> Result<Value, ToolError> {
        let workspace = self.registry.workspace(input.workspace.as_deref())?;
        Ok(json!({
            "name": workspace.name(),
            "base_url": workspace.base_url(),
            "is_default": workspace.name() == self.registry.default_name(),
        }))
    }

    async fn objects(&self, input: WorkspaceInput) -> Result<Value, ToolError> {
        let objects = self.client(input.workspace.as_deref())?.get_objects().await?;
        Ok(json!({ "success": true, "objects": objects }))
    }

    async fn object_schema(&self, input: ObjectInput) -> Result<Value, ToolError> {
        let schema = self
            .client(input.workspace.as_deref())?
            .get_object_schema(&input.object_name)
            .await?;
        Ok(json!({ "success": true, "schema": schema }))
    }

    async fn fields(&self, input: ObjectInput) -> Result<Value, ToolError> {
        let fields = self
            .client(input.workspace.as_deref())?
            .get_fields(&input.object_name)
            .await?;
        Ok(json!({ "success": true, "fields": fields }))
    }
}

/// Parse the ordering arguments. The direction only matters when a field is given.
fn order_by(field: Option<&str>, direction: &str) -> Result<Option<OrderBy>, McpError> {
    field
        .map(|field| {
            OrderDirection::from_str(direction)
                .map(|direction| OrderBy::new(field, direction))
                .map_err(|e| McpError::new(ErrorCode::INVALID_PARAMS, e.to_string(), None))
        })
        .transpose()
}

pub(crate) fn tool_not_found(name: &str) -> McpError {
    McpError::new(
        ErrorCode::METHOD_NOT_FOUND,
        format!("Tool {name} not found"),
        None,
    )
}

fn convert_arguments<T: DeserializeOwned>(arguments: Option<JsonObject>) -> Result<T, McpError> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default())).map_err(|e| {
        McpError::new(
            ErrorCode::INVALID_PARAMS,
            format!("Invalid input: {e}"),
            None,
        )
    })
}
