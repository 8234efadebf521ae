//! Execute GraphQL operations against a Twenty workspace

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error};
use twenty_query::{
    CompiledOperation, Filter, ListQuery, MutationKind, OrderBy, compile_get_query,
    compile_list_query, compile_mutation, compile_object_schema_query, compile_objects_query,
    compile_search_query,
};

use crate::errors::TwentyApiError;
use crate::workspace::Workspace;

/// A JSON object as returned by the API
pub type JsonObject = Map<String, Value>;

/// How many characters of an operation are logged
const LOGGED_OPERATION_CHARS: usize = 100;

/// The top-level GraphQL response
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<JsonObject>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
}

/// A client for one workspace's GraphQL API
#[derive(Debug)]
pub struct TwentyClient {
    workspace: Arc<Workspace>,
    endpoint: String,
    http: reqwest::Client,
}

impl TwentyClient {
    /// Create a client whose requests are bounded by `timeout`
    pub fn new(workspace: Arc<Workspace>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: workspace.graphql_endpoint(),
            workspace,
            http,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Execute a query or mutation and return the response `data`.
    ///
    /// Any entry in the response `errors` fails the call, even when `data` is also present.
    pub async fn execute(
        &self,
        operation: &str,
        variables: Option<JsonObject>,
    ) -> Result<JsonObject, TwentyApiError> {
        let mut body = JsonObject::new();
        body.insert("query".to_string(), Value::String(operation.to_string()));
        if let Some(variables) = variables.filter(|variables| !variables.is_empty()) {
            body.insert("variables".to_string(), Value::Object(variables));
        }

        debug!(
            workspace = %self.workspace.name(),
            "Executing GraphQL operation: {}...",
            operation.chars().take(LOGGED_OPERATION_CHARS).collect::<String>()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.workspace.api_key().expose_secret())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            error!(status = status.as_u16(), "HTTP error for GraphQL operation");
            return Err(TwentyApiError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: Envelope = serde_json::from_str(&text).map_err(|e| {
            error!("Invalid GraphQL response body: {e}");
            TwentyApiError::Transport(format!("Invalid response body: {e}"))
        })?;

        match envelope.errors.filter(|errors| !errors.is_empty()) {
            Some(errors) => {
                let messages: Vec<String> = errors.iter().map(error_message).collect();
                error!("GraphQL errors: {}", messages.join("; "));
                Err(TwentyApiError::GraphQL(messages))
            }
            None => Ok(envelope.data.unwrap_or_default()),
        }
    }

    /// Execute a compiled operation and take its result out of the response data
    async fn execute_compiled(
        &self,
        operation: &CompiledOperation,
    ) -> Result<JsonObject, TwentyApiError> {
        let mut data = self.execute(&operation.text, None).await?;
        Ok(take_object(&mut data, &operation.result_key))
    }

    /// A page of records, as the `{edges, pageInfo, totalCount}` connection
    pub async fn get_records(&self, query: &ListQuery) -> Result<JsonObject, TwentyApiError> {
        self.execute_compiled(&compile_list_query(query)).await
    }

    /// One record by id. A missing record is an empty object, not an error.
    pub async fn get_record(
        &self,
        object_name: &str,
        id: &str,
        fields: &[String],
    ) -> Result<JsonObject, TwentyApiError> {
        let connection = self
            .execute_compiled(&compile_get_query(object_name, id, fields))
            .await?;
        Ok(first_node(&connection))
    }

    pub async fn create_record(
        &self,
        object_name: &str,
        data: &JsonObject,
    ) -> Result<JsonObject, TwentyApiError> {
        self.execute_compiled(&compile_mutation(
            MutationKind::Create,
            object_name,
            None,
            Some(data),
        ))
        .await
    }

    pub async fn update_record(
        &self,
        object_name: &str,
        id: &str,
        data: &JsonObject,
    ) -> Result<JsonObject, TwentyApiError> {
        self.execute_compiled(&compile_mutation(
            MutationKind::Update,
            object_name,
            Some(id),
            Some(data),
        ))
        .await
    }

    pub async fn delete_record(
        &self,
        object_name: &str,
        id: &str,
    ) -> Result<JsonObject, TwentyApiError> {
        self.execute_compiled(&compile_mutation(
            MutationKind::Delete,
            object_name,
            Some(id),
            None,
        ))
        .await
    }

    /// Records whose name contains the search text
    pub async fn search_records(
        &self,
        object_name: &str,
        search: &str,
        limit: u32,
    ) -> Result<JsonObject, TwentyApiError> {
        self.execute_compiled(&compile_search_query(object_name, search, limit))
            .await
    }

    /// Records matching every filter, in the requested order
    pub async fn search_records_complex(
        &self,
        object_name: &str,
        filters: Vec<Filter>,
        order_by: Option<OrderBy>,
        limit: u32,
    ) -> Result<JsonObject, TwentyApiError> {
        let query = ListQuery::builder()
            .object(object_name)
            .limit(limit)
            .filter(filters)
            .maybe_order_by(order_by)
            .build();
        self.get_records(&query).await
    }

    /// All objects defined in the workspace
    pub async fn get_objects(&self) -> Result<JsonObject, TwentyApiError> {
        self.execute_compiled(&compile_objects_query()).await
    }

    /// The metadata of one object, including its fields
    pub async fn get_object_schema(
        &self,
        name_singular: &str,
    ) -> Result<JsonObject, TwentyApiError> {
        self.execute_compiled(&compile_object_schema_query(name_singular))
            .await
    }

    /// The fields connection of one object
    pub async fn get_fields(&self, name_singular: &str) -> Result<JsonObject, TwentyApiError> {
        let mut schema = self.get_object_schema(name_singular).await?;
        Ok(take_object(&mut schema, "fields"))
    }
}

fn request_error(error: reqwest::Error) -> TwentyApiError {
    if error.is_timeout() {
        error!("Timeout error for GraphQL operation");
        TwentyApiError::Timeout
    } else {
        error!("Request error for GraphQL operation: {error}");
        TwentyApiError::Transport(error.to_string())
    }
}

fn error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .unwrap_or_else(|| error.to_string())
}

fn take_object(data: &mut JsonObject, key: &str) -> JsonObject {
    match data.remove(key) {
        Some(Value::Object(object)) => object,
        _ => JsonObject::new(),
    }
}

/// The node of the first edge in a connection
fn first_node(connection: &JsonObject) -> JsonObject {
    connection
        .get("edges")
        .and_then(Value::as_array)
        .and_then(|edges| edges.first())
        .and_then(|edge| edge.get("node"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use twenty_query::{FilterOperator, OrderDirection};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> TwentyClient {
        client_with_timeout(server, Duration::from_secs(5)).await
    }

    async fn client_with_timeout(server: &MockServer, timeout: Duration) -> TwentyClient {
        let workspace = Workspace::new("test", format!("{}/", server.uri()), "test_key");
        TwentyClient::new(Arc::new(workspace), timeout).unwrap()
    }

    async fn respond_with(body: Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn sends_authenticated_json_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer test_key"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(json!({
                "query": "query { a }",
                "variables": {"id": "1"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"a": 1}})))
            .expect(1)
            .mount(&server)
            .await;

        let mut variables = JsonObject::new();
        variables.insert("id".to_string(), json!("1"));
        let data = client_for(&server)
            .await
            .execute("query { a }", Some(variables))
            .await
            .unwrap();

        assert_eq!(Value::Object(data), json!({"a": 1}));
    }

    #[tokio::test]
    async fn empty_variables_are_not_sent() {
        let server = respond_with(json!({"data": {}})).await;

        client_for(&server)
            .await
            .execute("query { a }", Some(JsonObject::new()))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap_or_default();
        let body: Value = requests
            .first()
            .map(|request| serde_json::from_slice(&request.body).unwrap())
            .unwrap_or_default();
        assert_eq!(body, json!({"query": "query { a }"}));
    }

    #[tokio::test]
    async fn graphql_errors_take_precedence_over_data() {
        let server = respond_with(json!({
            "data": {"people": {"edges": []}},
            "errors": [{"message": "Field unknown"}, {"code": 42}]
        }))
        .await;

        let error = client_for(&server)
            .await
            .execute("query { people }", None)
            .await
            .unwrap_err();

        assert_eq!(
            error,
            TwentyApiError::GraphQL(vec![
                "Field unknown".to_string(),
                r#"{"code":42}"#.to_string()
            ])
        );
        assert_eq!(error.status_code(), None);
    }

    #[tokio::test]
    async fn empty_errors_array_is_success() {
        let server = respond_with(json!({"data": {"a": true}, "errors": []})).await;

        let data = client_for(&server)
            .await
            .execute("query { a }", None)
            .await
            .unwrap();

        assert_eq!(data.get("a"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn missing_data_is_empty() {
        let server = respond_with(json!({})).await;

        let data = client_for(&server)
            .await
            .execute("query { a }", None)
            .await
            .unwrap();

        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn http_failure_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such route"))
            .mount(&server)
            .await;

        let error = client_for(&server)
            .await
            .execute("query { a }", None)
            .await
            .unwrap_err();

        assert_eq!(
            error,
            TwentyApiError::Http {
                status: 404,
                body: "no such route".to_string()
            }
        );
        assert_eq!(error.status_code(), Some(404));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {}}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let error = client_with_timeout(&server, Duration::from_millis(100))
            .await
            .execute("query { a }", None)
            .await
            .unwrap_err();

        assert_eq!(error, TwentyApiError::Timeout);
        assert_eq!(error.status_code(), None);
    }

    #[tokio::test]
    async fn connection_failure_is_a_transport_error() {
        let workspace = Workspace::new("test", "http://127.0.0.1:1", "test_key");
        let client = TwentyClient::new(Arc::new(workspace), Duration::from_secs(5)).unwrap();

        let error = client.execute("query { a }", None).await.unwrap_err();

        assert!(matches!(error, TwentyApiError::Transport(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let error = client_for(&server)
            .await
            .execute("query { a }", None)
            .await
            .unwrap_err();

        assert!(matches!(error, TwentyApiError::Transport(_)));
    }

    #[tokio::test]
    async fn get_record_returns_first_node() {
        let server = respond_with(json!({
            "data": {"people": {"edges": [
                {"node": {"id": "123", "__typename": "Person"}, "cursor": "a"}
            ]}}
        }))
        .await;

        let record = client_for(&server)
            .await
            .get_record("people", "123", &[])
            .await
            .unwrap();

        assert_eq!(
            Value::Object(record),
            json!({"id": "123", "__typename": "Person"})
        );
    }

    #[tokio::test]
    async fn get_record_without_edges_is_empty() {
        let server = respond_with(json!({"data": {"people": {"edges": []}}})).await;

        let record = client_for(&server)
            .await
            .get_record("people", "missing", &[])
            .await
            .unwrap();

        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn get_records_sends_compiled_query() {
        let large = Filter::condition("employees", FilterOperator::Gte, json!(50));
        let query = ListQuery::builder()
            .object("companies")
            .limit(20)
            .after("c1")
            .filter(vec![large])
            .order_by(OrderBy::new("createdAt", OrderDirection::DescNullsFirst))
            .build();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "query": compile_list_query(&query).text
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"companies": {"edges": [], "totalCount": 0}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let connection = client_for(&server).await.get_records(&query).await.unwrap();

        assert_eq!(connection.get("totalCount"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn search_records_matches_the_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "query": compile_search_query("people", "Jo", 5).text
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"people": {"edges": [{"node": {"id": "p-1"}}]}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = client_for(&server)
            .await
            .search_records("people", "Jo", 5)
            .await
            .unwrap();

        assert!(
            compile_search_query("people", "Jo", 5)
                .text
                .contains(r#"people(first: 5, filter: {name: {ilike: "%Jo%"}}) {"#)
        );
        assert_eq!(
            Value::Object(results),
            json!({"edges": [{"node": {"id": "p-1"}}]})
        );
    }

    #[tokio::test]
    async fn create_record_returns_mutation_result() {
        let server = respond_with(json!({
            "data": {"createPerson": {"id": "new-id", "__typename": "Person"}}
        }))
        .await;
        let mut data = JsonObject::new();
        data.insert("city".to_string(), json!("Paris"));

        let created = client_for(&server)
            .await
            .create_record("people", &data)
            .await
            .unwrap();

        assert_eq!(created.get("id"), Some(&json!("new-id")));
    }

    #[tokio::test]
    async fn delete_record_reads_delete_key() {
        let server = respond_with(json!({"data": {"deleteTask": {"id": "t-1"}}})).await;

        let deleted = client_for(&server)
            .await
            .delete_record("tasks", "t-1")
            .await
            .unwrap();

        assert_eq!(deleted.get("id"), Some(&json!("t-1")));
    }

    #[tokio::test]
    async fn get_fields_reads_schema_fields() {
        let server = respond_with(json!({
            "data": {"object": {
                "nameSingular": "person",
                "fields": {"edges": [{"node": {"name": "city"}}]}
            }}
        }))
        .await;

        let fields = client_for(&server)
            .await
            .get_fields("person")
            .await
            .unwrap();

        assert_eq!(
            Value::Object(fields),
            json!({"edges": [{"node": {"name": "city"}}]})
        );
    }
}
