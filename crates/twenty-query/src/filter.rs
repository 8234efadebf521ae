//! Filter descriptors and their compilation to GraphQL filter arguments
//!
//! A list of filters is conjunctive: one filter is rendered bare, two or more are wrapped in a
//! single `{and: [...]}` group and an empty list produces no filter argument at all. Explicit
//! `or` groups may be nested anywhere in the tree.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::render::{bare_text, quoted, render_value};

/// A node in a filter tree
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Filter {
    /// All nested filters must match
    And { and: Vec<Filter> },

    /// At least one nested filter must match
    Or { or: Vec<Filter> },

    /// A single field predicate
    Condition(FilterCondition),
}

impl Filter {
    /// A single predicate on a field
    pub fn condition(
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<Option<Value>>,
    ) -> Self {
        Self::Condition(FilterCondition::new(field, operator, value))
    }

    /// Render this node as GraphQL input syntax
    pub fn compile(&self) -> String {
        match self {
            Self::Condition(condition) => condition.compile(),
            Self::And { and } => conjunction(and).unwrap_or_else(|| "{and: []}".to_string()),
            Self::Or { or } => format!("{{or: [{}]}}", compile_all(or)),
        }
    }
}

/// A predicate on a single field
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct FilterCondition {
    /// The field to filter on
    pub field: String,

    /// The comparison operator: eq, neq, like, ilike, contains, gt, gte, lt, lte, in, isNull or
    /// isNotNull. Other operator names are passed to the CRM unchanged.
    #[serde(default)]
    #[schemars(with = "String")]
    pub operator: FilterOperator,

    /// The value to compare against (not needed for isNull and isNotNull)
    #[serde(default)]
    pub value: Option<Value>,
}

impl FilterCondition {
    pub fn new(
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<Option<Value>>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Render as `{field: {operator: value}}`
    pub fn compile(&self) -> String {
        let predicate = match &self.operator {
            FilterOperator::IsNull => format!("{{is: {}}}", quoted("NULL")),
            FilterOperator::IsNotNull => format!("{{is: {}}}", quoted("NOT_NULL")),
            FilterOperator::Like | FilterOperator::Ilike | FilterOperator::Contains => {
                let text = self.value.as_ref().map(bare_text).unwrap_or_default();
                format!("{{ilike: {}}}", quoted(&format!("%{text}%")))
            }
            operator => {
                let value = match &self.value {
                    Some(value) => render_value(value),
                    None => "null".to_string(),
                };
                format!("{{{}: {value}}}", operator.keyword())
            }
        };
        format!("{{{}: {predicate}}}", self.field)
    }
}

/// Comparison operators understood by the compiler
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOperator {
    #[default]
    Eq,
    Neq,
    Like,
    Ilike,
    Contains,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    IsNull,
    IsNotNull,
    /// Any other operator, rendered verbatim
    Other(String),
}

impl FilterOperator {
    /// The GraphQL keyword this operator compiles to
    pub fn keyword(&self) -> &str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Like | Self::Ilike | Self::Contains => "ilike",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::IsNull | Self::IsNotNull => "is",
            Self::Other(name) => name,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Like => "like",
            Self::Contains => "contains",
            Self::IsNull => "isNull",
            Self::IsNotNull => "isNotNull",
            other => other.keyword(),
        }
    }
}

impl FromStr for FilterOperator {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "like" => Self::Like,
            "ilike" => Self::Ilike,
            "contains" => Self::Contains,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "in" => Self::In,
            "isNull" => Self::IsNull,
            "isNotNull" => Self::IsNotNull,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for FilterOperator {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(operator) => operator,
            Err(never) => match never {},
        }
    }
}

impl From<FilterOperator> for String {
    fn from(value: FilterOperator) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compile a conjunctive list of filters into a GraphQL filter argument value.
///
/// Returns `None` when there is nothing to filter on.
pub fn compile_filter(filters: &[Filter]) -> Option<String> {
    conjunction(filters)
}

fn conjunction(filters: &[Filter]) -> Option<String> {
    match filters {
        [] => None,
        [single] => Some(single.compile()),
        many => Some(format!("{{and: [{}]}}", compile_all(many))),
    }
}

fn compile_all(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(Filter::compile)
        .collect::<Vec<_>>()
        .join(", ")
}
