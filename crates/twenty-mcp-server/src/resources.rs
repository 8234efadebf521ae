//! Read-only MCP resources rendering CRM data as plain text
//!
//! `people://list`, `companies://list` and `opportunities://list` summarise up to 100 records,
//! `<plural>://{id}` describes one record and `schema://objects` lists the workspace objects.
//! Resources always read from the default workspace.

use std::sync::Arc;

use rmcp::model::{
    AnnotateAble, ErrorCode, RawResource, RawResourceTemplate, ReadResourceResult, Resource,
    ResourceContents, ResourceTemplate,
};
use serde_json::Value;
use tracing::error;
use twenty_query::ListQuery;

use crate::errors::{McpError, ToolError};
use crate::graphql::JsonObject;
use crate::objects::CrmObject;
use crate::workspace::WorkspaceRegistry;

const SCHEMA_OBJECTS_URI: &str = "schema://objects";
const LIST_PATH: &str = "list";
const MIME_TYPE: &str = "text/plain";

/// How many records a list resource shows
const LIST_LIMIT: u32 = 100;

/// Objects with list and detail resources
const RESOURCE_OBJECTS: [CrmObject; 3] = [
    CrmObject::People,
    CrmObject::Companies,
    CrmObject::Opportunities,
];

/// Fields selected for display, in the Twenty data model
fn display_fields(object: CrmObject) -> Vec<String> {
    let fields: &[&str] = match object {
        CrmObject::People => &[
            "name { firstName lastName }",
            "emails { primaryEmail }",
            "phones { primaryPhoneNumber }",
            "city",
            "createdAt",
            "company { name }",
        ],
        CrmObject::Companies => &[
            "name",
            "domainName { primaryLinkUrl }",
            "employees",
            "address { addressCity }",
            "createdAt",
        ],
        CrmObject::Opportunities => &[
            "name",
            "stage",
            "amount { amountMicros currencyCode }",
            "closeDate",
            "createdAt",
            "company { name }",
        ],
        CrmObject::Notes | CrmObject::Tasks => &["title", "createdAt"],
    };
    fields.iter().map(ToString::to_string).collect()
}

/// A resource address
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    List(CrmObject),
    Record(CrmObject, String),
    Objects,
}

impl Target {
    fn parse(uri: &str) -> Option<Self> {
        if uri == SCHEMA_OBJECTS_URI {
            return Some(Target::Objects);
        }
        let (scheme, path) = uri.split_once("://")?;
        let object = CrmObject::from_plural(scheme)
            .filter(|object| RESOURCE_OBJECTS.contains(object))?;
        match path {
            "" => None,
            LIST_PATH => Some(Target::List(object)),
            id => Some(Target::Record(object, id.to_string())),
        }
    }
}

/// The CRM resources, read from the default workspace
#[derive(Clone)]
pub struct CrmResources {
    registry: Arc<WorkspaceRegistry>,
}

impl CrmResources {
    pub fn new(registry: Arc<WorkspaceRegistry>) -> Self {
        Self { registry }
    }

    pub fn resources(&self) -> Vec<Resource> {
        RESOURCE_OBJECTS
            .into_iter()
            .map(|object| {
                text_resource(
                    format!("{}://{LIST_PATH}", object.plural()),
                    format!("{} directory", object.label()),
                    format!("A list of {} in the default workspace", object.plural()),
                )
            })
            .chain(std::iter::once(text_resource(
                SCHEMA_OBJECTS_URI.to_string(),
                "Workspace schema".to_string(),
                "All objects defined in the default workspace".to_string(),
            )))
            .collect()
    }

    pub fn templates(&self) -> Vec<ResourceTemplate> {
        RESOURCE_OBJECTS
            .into_iter()
            .map(|object| {
                RawResourceTemplate {
                    uri_template: format!("{}://{{id}}", object.plural()),
                    name: format!("{} profile", object.label()),
                    description: Some(format!("Detailed {} information", object.noun())),
                    mime_type: Some(MIME_TYPE.to_string()),
                }
                .no_annotation()
            })
            .collect()
    }

    /// Read a resource. CRM failures are rendered into the text rather than returned as errors.
    pub async fn read(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        let target = Target::parse(uri).ok_or_else(|| {
            McpError::new(
                ErrorCode::RESOURCE_NOT_FOUND,
                format!("Resource {uri} not found"),
                None,
            )
        })?;

        let text = match &target {
            Target::List(object) => match self.list(*object).await {
                Ok(text) => text,
                Err(e) => failure(&format!("Error retrieving {}", object.plural()), e),
            },
            Target::Record(object, id) => match self.record(*object, id).await {
                Ok(text) => text,
                Err(e) => failure(&format!("Error retrieving {} {id}", object.noun()), e),
            },
            Target::Objects => match self.objects().await {
                Ok(text) => text,
                Err(e) => failure("Error retrieving schema", e),
            },
        };

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }

    async fn list(&self, object: CrmObject) -> Result<String, ToolError> {
        let query = ListQuery::builder()
            .object(object.plural())
            .limit(LIST_LIMIT)
            .fields(display_fields(object))
            .build();
        let connection = self.registry.client(None)?.get_records(&query).await?;
        Ok(render_list(object, &nodes(&connection)))
    }

    async fn record(&self, object: CrmObject, id: &str) -> Result<String, ToolError> {
        let record = self
            .registry
            .client(None)?
            .get_record(object.plural(), id, &display_fields(object))
            .await?;
        Ok(render_record(object, id, &record))
    }

    async fn objects(&self) -> Result<String, ToolError> {
        let connection = self.registry.client(None)?.get_objects().await?;
        Ok(render_objects(&nodes(&connection)))
    }
}

fn text_resource(uri: String, name: String, description: String) -> Resource {
    let mut resource = RawResource::new(uri, name);
    resource.description = Some(description);
    resource.mime_type = Some(MIME_TYPE.to_string());
    resource.no_annotation()
}

fn failure(context: &str, error: ToolError) -> String {
    error!("{context}: {error}");
    format!("{context}: {error}")
}

/// The nodes of every edge in a connection
fn nodes(connection: &JsonObject) -> Vec<JsonObject> {
    connection
        .get("edges")
        .and_then(Value::as_array)
        .map(|edges| {
            edges
                .iter()
                .filter_map(|edge| edge.get("node").and_then(Value::as_object).cloned())
                .collect()
        })
        .unwrap_or_default()
}

/// Display text of a possibly nested field; empty strings and nulls count as absent
fn text_at(record: &JsonObject, path: &[&str]) -> Option<String> {
    let (first, rest) = path.split_first()?;
    let value = rest
        .iter()
        .try_fold(record.get(*first)?, |value, key| value.get(key))?;
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn person_name(record: &JsonObject) -> String {
    [
        text_at(record, &["name", "firstName"]),
        text_at(record, &["name", "lastName"]),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}

fn record_name(object: CrmObject, record: &JsonObject) -> String {
    match object {
        CrmObject::People => person_name(record),
        CrmObject::Notes | CrmObject::Tasks => {
            text_at(record, &["title"]).unwrap_or_else(|| "Unknown".to_string())
        }
        CrmObject::Companies | CrmObject::Opportunities => {
            text_at(record, &["name"]).unwrap_or_else(|| "Unknown".to_string())
        }
    }
}

/// The amount in currency units, from the stored micros. The API may send micros as a number
/// or, for large values, as a decimal string.
fn amount(record: &JsonObject) -> String {
    text_at(record, &["amount", "amountMicros"])
        .and_then(|micros| micros.parse::<f64>().ok())
        .map(|micros| (micros / 1_000_000.0).to_string())
        .unwrap_or_else(|| "0".to_string())
}

fn currency(record: &JsonObject) -> String {
    text_at(record, &["amount", "currencyCode"]).unwrap_or_else(|| "USD".to_string())
}

fn render_list(object: CrmObject, records: &[JsonObject]) -> String {
    if records.is_empty() {
        return format!("No {} found in the workspace.", object.plural());
    }

    let entries: Vec<String> = records
        .iter()
        .map(|record| {
            let name = record_name(object, record);
            let id = text_at(record, &["id"]).unwrap_or_else(|| "Unknown".to_string());
            match object {
                CrmObject::People => format!(
                    "• {name} ({})\n  ID: {id}, City: {}",
                    text_at(record, &["emails", "primaryEmail"])
                        .unwrap_or_else(|| "No email".to_string()),
                    text_at(record, &["city"]).unwrap_or_else(|| "No city".to_string()),
                ),
                CrmObject::Companies => format!(
                    "• {name} ({})\n  ID: {id}, City: {}",
                    text_at(record, &["domainName", "primaryLinkUrl"])
                        .unwrap_or_else(|| "No domain".to_string()),
                    text_at(record, &["address", "addressCity"])
                        .unwrap_or_else(|| "No city".to_string()),
                ),
                CrmObject::Opportunities => format!(
                    "• {name} ({} {})\n  ID: {id}, Stage: {}",
                    currency(record),
                    amount(record),
                    text_at(record, &["stage"]).unwrap_or_else(|| "No stage".to_string()),
                ),
                CrmObject::Notes | CrmObject::Tasks => format!("• {name}\n  ID: {id}"),
            }
        })
        .collect();

    format!(
        "{} Directory ({} records):\n\n{}",
        plural_label(object),
        records.len(),
        entries.join("\n\n")
    )
}

fn plural_label(object: CrmObject) -> &'static str {
    match object {
        CrmObject::People => "People",
        CrmObject::Companies => "Companies",
        CrmObject::Opportunities => "Opportunities",
        CrmObject::Notes => "Notes",
        CrmObject::Tasks => "Tasks",
    }
}

fn field_or_unset(record: &JsonObject, path: &[&str]) -> String {
    text_at(record, path).unwrap_or_else(|| "Not specified".to_string())
}

fn render_record(object: CrmObject, id: &str, record: &JsonObject) -> String {
    if record.is_empty() {
        return format!("{} {id} not found.", object.label());
    }

    let field = |path: &[&str]| field_or_unset(record, path);
    let mut lines = vec![
        format!("{} Profile - {}", object.label(), record_name(object, record)),
        format!(
            "ID: {}",
            text_at(record, &["id"]).unwrap_or_else(|| "Unknown".to_string())
        ),
    ];
    match object {
        CrmObject::People => lines.extend([
            format!("Email: {}", field(&["emails", "primaryEmail"])),
            format!("Phone: {}", field(&["phones", "primaryPhoneNumber"])),
            format!("City: {}", field(&["city"])),
        ]),
        CrmObject::Companies => lines.extend([
            format!("Domain: {}", field(&["domainName", "primaryLinkUrl"])),
            format!("City: {}", field(&["address", "addressCity"])),
            format!("Employees: {}", field(&["employees"])),
        ]),
        CrmObject::Opportunities => lines.extend([
            format!("Stage: {}", field(&["stage"])),
            format!("Amount: {} {}", amount(record), currency(record)),
            format!("Expected Close: {}", field(&["closeDate"])),
        ]),
        CrmObject::Notes | CrmObject::Tasks => {}
    }
    lines.push(format!(
        "Created: {}",
        text_at(record, &["createdAt"]).unwrap_or_else(|| "Unknown".to_string())
    ));
    if let Some(company) = text_at(record, &["company", "name"]) {
        lines.push(String::new());
        lines.push(format!("Company: {company}"));
    }

    lines.join("\n")
}

fn render_objects(objects: &[JsonObject]) -> String {
    if objects.is_empty() {
        return "No objects found in the workspace.".to_string();
    }

    let entries: Vec<String> = objects
        .iter()
        .map(|object| {
            let unknown = || "Unknown".to_string();
            format!(
                "• {} ({})\n  Plural: {}\n  Description: {}",
                text_at(object, &["nameSingular"]).unwrap_or_else(unknown),
                text_at(object, &["labelSingular"]).unwrap_or_else(unknown),
                text_at(object, &["namePlural"]).unwrap_or_else(unknown),
                text_at(object, &["description"]).unwrap_or_else(|| "No description".to_string()),
            )
        })
        .collect();

    format!(
        "Workspace Schema - Objects ({} total):\n\n{}",
        objects.len(),
        entries.join("\n\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Workspace;
    use insta::assert_snapshot;
    use rstest::rstest;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(object) => object,
            _ => JsonObject::new(),
        }
    }

    fn resources_for(server: &MockServer) -> CrmResources {
        let registry = WorkspaceRegistry::new(
            vec![Workspace::new("main", server.uri(), "main_key")],
            Duration::from_secs(5),
        )
        .unwrap();
        CrmResources::new(Arc::new(registry))
    }

    fn text(result: &ReadResourceResult) -> String {
        match result.contents.first() {
            Some(ResourceContents::TextResourceContents { text, .. }) => text.clone(),
            _ => String::new(),
        }
    }

    #[rstest]
    #[case("people://list", Some(Target::List(CrmObject::People)))]
    #[case("companies://c-1", Some(Target::Record(CrmObject::Companies, "c-1".to_string())))]
    #[case("schema://objects", Some(Target::Objects))]
    #[case("notes://list", None)]
    #[case("people://", None)]
    #[case("people", None)]
    fn parses_uris(#[case] uri: &str, #[case] expected: Option<Target>) {
        assert_eq!(Target::parse(uri), expected);
    }

    #[test]
    fn reads_nested_text() {
        let record = object(json!({
            "name": {"firstName": "Ada", "lastName": ""},
            "employees": 12,
            "city": null
        }));

        assert_eq!(
            text_at(&record, &["name", "firstName"]),
            Some("Ada".to_string())
        );
        assert_eq!(text_at(&record, &["name", "lastName"]), None);
        assert_eq!(text_at(&record, &["employees"]), Some("12".to_string()));
        assert_eq!(text_at(&record, &["city"]), None);
        assert_eq!(text_at(&record, &["missing", "deeper"]), None);
    }

    #[test]
    fn renders_people_list() {
        let records = vec![
            object(json!({
                "id": "p-1",
                "name": {"firstName": "Ada", "lastName": "Lovelace"},
                "emails": {"primaryEmail": "ada@example.com"},
                "city": "London"
            })),
            object(json!({"id": "p-2", "name": {"firstName": "Grace"}})),
        ];

        assert_snapshot!(render_list(CrmObject::People, &records), @r"
        People Directory (2 records):

        • Ada Lovelace (ada@example.com)
          ID: p-1, City: London

        • Grace (No email)
          ID: p-2, City: No city
        ");
    }

    #[test]
    fn renders_opportunity_amounts_in_units() {
        let records = vec![object(json!({
            "id": "o-1",
            "name": "Big deal",
            "stage": "PROPOSAL",
            "amount": {"amountMicros": 1250500000, "currencyCode": "EUR"}
        }))];

        assert_snapshot!(render_list(CrmObject::Opportunities, &records), @r"
        Opportunities Directory (1 records):

        • Big deal (EUR 1250.5)
          ID: o-1, Stage: PROPOSAL
        ");
    }

    #[rstest]
    #[case(json!({"amountMicros": 1250500000, "currencyCode": "EUR"}), "1250.5")]
    #[case(json!({"amountMicros": "98000000000000000", "currencyCode": "USD"}), "98000000000")]
    #[case(json!({"amountMicros": null, "currencyCode": "USD"}), "0")]
    #[case(json!({"amountMicros": "lots"}), "0")]
    fn amounts_in_units(#[case] amount_field: Value, #[case] units: &str) {
        let record = object(json!({"id": "o-1", "amount": amount_field}));

        assert_eq!(amount(&record), units);
    }

    #[test]
    fn renders_empty_list() {
        assert_eq!(
            render_list(CrmObject::Companies, &[]),
            "No companies found in the workspace."
        );
    }

    #[test]
    fn renders_company_profile() {
        let record = object(json!({
            "id": "c-1",
            "name": "Acme",
            "domainName": {"primaryLinkUrl": "https://acme.com"},
            "employees": 50,
            "createdAt": "2024-01-01T00:00:00.000Z"
        }));

        assert_snapshot!(render_record(CrmObject::Companies, "c-1", &record), @r"
        Company Profile - Acme
        ID: c-1
        Domain: https://acme.com
        City: Not specified
        Employees: 50
        Created: 2024-01-01T00:00:00.000Z
        ");
    }

    #[test]
    fn renders_person_company() {
        let record = object(json!({
            "id": "p-1",
            "name": {"firstName": "Ada", "lastName": "Lovelace"},
            "company": {"name": "Analytical Engines"}
        }));

        assert_snapshot!(render_record(CrmObject::People, "p-1", &record), @r"
        Person Profile - Ada Lovelace
        ID: p-1
        Email: Not specified
        Phone: Not specified
        City: Not specified
        Created: Unknown

        Company: Analytical Engines
        ");
    }

    #[test]
    fn missing_record_is_not_found() {
        assert_eq!(
            render_record(CrmObject::Opportunities, "o-9", &JsonObject::new()),
            "Opportunity o-9 not found."
        );
    }

    #[test]
    fn renders_objects() {
        let objects = vec![object(json!({
            "nameSingular": "person",
            "namePlural": "people",
            "labelSingular": "Person",
            "description": null
        }))];

        assert_snapshot!(render_objects(&objects), @r"
        Workspace Schema - Objects (1 total):

        • person (Person)
          Plural: people
          Description: No description
        ");
    }

    #[test]
    fn lists_resources_and_templates() {
        let registry = WorkspaceRegistry::new(
            vec![Workspace::new("main", "https://crm.example.com", "key")],
            Duration::from_secs(5),
        )
        .unwrap();
        let resources = CrmResources::new(Arc::new(registry));

        let uris: Vec<String> = resources
            .resources()
            .iter()
            .map(|resource| resource.uri.clone())
            .collect();
        let templates: Vec<String> = resources
            .templates()
            .iter()
            .map(|template| template.uri_template.clone())
            .collect();

        assert_eq!(
            uris,
            vec![
                "people://list",
                "companies://list",
                "opportunities://list",
                "schema://objects"
            ]
        );
        assert_eq!(
            templates,
            vec!["people://{id}", "companies://{id}", "opportunities://{id}"]
        );
    }

    #[tokio::test]
    async fn reads_record_from_default_workspace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"companies": {"edges": []}}
            })))
            .mount(&server)
            .await;

        let result = resources_for(&server)
            .read("companies://c-404")
            .await
            .unwrap();

        assert_eq!(text(&result), "Company c-404 not found.");
    }

    #[tokio::test]
    async fn failures_are_rendered_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let result = resources_for(&server).read("people://list").await.unwrap();

        assert_eq!(
            text(&result),
            "Error retrieving people: HTTP 401: Unauthorized"
        );
    }

    #[tokio::test]
    async fn unknown_resource_is_an_error() {
        let server = MockServer::start().await;

        let error = resources_for(&server)
            .read("tasks://list")
            .await
            .unwrap_err();

        assert_eq!(error.code, ErrorCode::RESOURCE_NOT_FOUND);
    }
}
