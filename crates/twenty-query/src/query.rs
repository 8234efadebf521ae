//! Query text generation for reading CRM records and workspace metadata

use std::fmt;
use std::str::FromStr;

use bon::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QueryError;
use crate::filter::{Filter, FilterOperator, compile_filter};
use crate::render::quoted;

const PAGE_INFO_FIELDS: &[&str] = &["hasNextPage", "hasPreviousPage", "startCursor", "endCursor"];
const OBJECT_METADATA_FIELDS: &[&str] = &[
    "id",
    "nameSingular",
    "namePlural",
    "labelSingular",
    "labelPlural",
    "description",
];
const FIELD_METADATA_FIELDS: &[&str] = &["id", "name", "label", "type", "description"];

/// A generated GraphQL document together with the key of its result in the response `data`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledOperation {
    pub text: String,
    pub result_key: String,
}

impl CompiledOperation {
    pub(crate) fn new(text: String, result_key: impl Into<String>) -> Self {
        Self {
            text,
            result_key: result_key.into(),
        }
    }
}

/// Sort direction, including where nulls are placed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum OrderDirection {
    #[default]
    AscNullsFirst,
    AscNullsLast,
    DescNullsFirst,
    DescNullsLast,
}

impl FromStr for OrderDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AscNullsFirst" => Ok(Self::AscNullsFirst),
            "AscNullsLast" => Ok(Self::AscNullsLast),
            "DescNullsFirst" => Ok(Self::DescNullsFirst),
            "DescNullsLast" => Ok(Self::DescNullsLast),
            other if other.eq_ignore_ascii_case("asc") => Ok(Self::AscNullsFirst),
            other if other.eq_ignore_ascii_case("desc") => Ok(Self::DescNullsLast),
            other => Err(QueryError::InvalidOrderDirection(other.to_string())),
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AscNullsFirst => "AscNullsFirst",
            Self::AscNullsLast => "AscNullsLast",
            Self::DescNullsFirst => "DescNullsFirst",
            Self::DescNullsLast => "DescNullsLast",
        })
    }
}

/// Ordering on a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: OrderDirection,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: OrderDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Describes a paginated read of one CRM object collection
#[derive(Debug, Clone, Builder)]
pub struct ListQuery {
    /// The plural object name, which is also the query root field
    #[builder(into)]
    pub object: String,

    /// Page size; omitted from the query when absent
    pub limit: Option<u32>,

    /// Cursor to continue after
    #[builder(into)]
    pub after: Option<String>,

    /// Conjunctive filters
    #[builder(default)]
    pub filter: Vec<Filter>,

    pub order_by: Option<OrderBy>,

    /// Extra fields selected on each node, after `id` and `__typename`
    #[builder(default)]
    pub fields: Vec<String>,
}

impl ListQuery {
    /// The argument clause entries, in the fixed order first, after, filter, orderBy
    fn arguments(&self) -> Vec<String> {
        let mut arguments = Vec::new();
        if let Some(limit) = self.limit {
            arguments.push(format!("first: {limit}"));
        }
        if let Some(after) = &self.after {
            arguments.push(format!("after: {}", quoted(after)));
        }
        if let Some(filter) = compile_filter(&self.filter) {
            arguments.push(format!("filter: {filter}"));
        }
        if let Some(order_by) = &self.order_by {
            let OrderBy { field, direction } = order_by;
            arguments.push(format!("orderBy: {{{field}: {direction}}}"));
        }
        arguments
    }
}

/// Build the connection query for a list descriptor
pub fn compile_list_query(query: &ListQuery) -> CompiledOperation {
    let node_fields: Vec<&str> = ["id", "__typename"]
        .into_iter()
        .chain(query.fields.iter().map(String::as_str))
        .collect();

    let arguments = argument_clause(&query.arguments());
    let mut lines = vec![
        "query {".to_string(),
        format!("  {}{arguments} {{", query.object),
        "    edges {".to_string(),
        "      node {".to_string(),
    ];
    lines.extend(selection(&node_fields, 8));
    lines.extend([
        "      }".to_string(),
        "      cursor".to_string(),
        "    }".to_string(),
        "    pageInfo {".to_string(),
    ]);
    lines.extend(selection(PAGE_INFO_FIELDS, 6));
    lines.extend([
        "    }".to_string(),
        "    totalCount".to_string(),
        "  }".to_string(),
        "}".to_string(),
    ]);

    CompiledOperation::new(lines.join("\n"), query.object.clone())
}

/// Build a lookup of a single record as a list query filtered on `id`.
///
/// The record is the first edge's node of the result; no edges means no record.
pub fn compile_get_query(object_name: &str, id: &str, fields: &[String]) -> CompiledOperation {
    let by_id = Filter::condition("id", FilterOperator::Eq, Value::String(id.to_string()));
    let query = ListQuery::builder()
        .object(object_name)
        .filter(vec![by_id])
        .fields(fields.to_vec())
        .build();
    compile_list_query(&query)
}

/// Build a basic text search, matching the search text anywhere in the record name
pub fn compile_search_query(object_name: &str, search: &str, limit: u32) -> CompiledOperation {
    let text = Value::String(search.to_string());
    let by_name = Filter::condition("name", FilterOperator::Contains, text);
    let query = ListQuery::builder()
        .object(object_name)
        .limit(limit)
        .filter(vec![by_name])
        .build();
    compile_list_query(&query)
}

/// Build the query listing every object defined in the workspace
pub fn compile_objects_query() -> CompiledOperation {
    let mut lines = vec![
        "query {".to_string(),
        "  objects {".to_string(),
        "    edges {".to_string(),
        "      node {".to_string(),
    ];
    lines.extend(selection(OBJECT_METADATA_FIELDS, 8));
    lines.extend([
        "      }".to_string(),
        "    }".to_string(),
        "  }".to_string(),
        "}".to_string(),
    ]);
    CompiledOperation::new(lines.join("\n"), "objects")
}

/// Build the query describing one object and its fields, addressed by singular name
pub fn compile_object_schema_query(name_singular: &str) -> CompiledOperation {
    let mut lines = vec![
        "query {".to_string(),
        format!("  object(nameSingular: {}) {{", quoted(name_singular)),
    ];
    lines.extend(selection(OBJECT_METADATA_FIELDS, 4));
    lines.extend([
        "    fields {".to_string(),
        "      edges {".to_string(),
        "        node {".to_string(),
    ]);
    lines.extend(selection(FIELD_METADATA_FIELDS, 10));
    lines.extend([
        "        }".to_string(),
        "      }".to_string(),
        "    }".to_string(),
        "  }".to_string(),
        "}".to_string(),
    ]);
    CompiledOperation::new(lines.join("\n"), "object")
}

pub(crate) fn argument_clause(arguments: &[String]) -> String {
    if arguments.is_empty() {
        String::new()
    } else {
        format!("({})", arguments.join(", "))
    }
}

pub(crate) fn selection(fields: &[&str], indent: usize) -> Vec<String> {
    fields
        .iter()
        .map(|field| format!("{:indent$}{field}", ""))
        .collect()
}
