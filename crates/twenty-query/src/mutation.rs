//! Mutation text generation for creating, updating and deleting records

use serde_json::{Map, Value};

use crate::naming::mutation_token;
use crate::query::{CompiledOperation, argument_clause, selection};
use crate::render::quoted;

/// The kind of write to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Build a mutation on a CRM object.
///
/// The mutation field is the kind prefix followed by the object's mutation token, e.g.
/// `createPerson`, which is also the result key. `id` is sent for updates and deletes, `data` is
/// JSON-encoded for creates and updates. A missing `id` is left out of the arguments and missing
/// `data` is sent as an empty object.
pub fn compile_mutation(
    kind: MutationKind,
    object_name: &str,
    id: Option<&str>,
    data: Option<&Map<String, Value>>,
) -> CompiledOperation {
    let field = format!("{}{}", kind.prefix(), mutation_token(object_name));

    let mut arguments = Vec::new();
    if let Some(id) = id.filter(|_| kind != MutationKind::Create) {
        arguments.push(format!("id: {}", quoted(id)));
    }
    if kind != MutationKind::Delete {
        let data = data
            .map(|data| Value::Object(data.clone()))
            .unwrap_or_else(|| Value::Object(Map::new()));
        arguments.push(format!("data: {data}"));
    }

    let returned: &[&str] = match kind {
        MutationKind::Delete => &["id"],
        MutationKind::Create | MutationKind::Update => &["id", "__typename"],
    };

    let mut lines = vec![
        "mutation {".to_string(),
        format!("  {field}{} {{", argument_clause(&arguments)),
    ];
    lines.extend(selection(returned, 4));
    lines.extend(["  }".to_string(), "}".to_string()]);

    CompiledOperation::new(lines.join("\n"), field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn create_person() {
        let data = data(json!({"firstName": "John", "city": "New York"}));
        let compiled = compile_mutation(MutationKind::Create, "people", None, Some(&data));

        assert_eq!(compiled.result_key, "createPerson");
        assert_snapshot!(compiled.text, @r#"
        mutation {
          createPerson(data: {"firstName":"John","city":"New York"}) {
            id
            __typename
          }
        }
        "#);
    }

    #[test]
    fn update_carries_id_and_data() {
        let data = data(json!({"stage": "WON"}));
        let kind = MutationKind::Update;
        let compiled = compile_mutation(kind, "opportunities", Some("opp-1"), Some(&data));

        assert_eq!(compiled.result_key, "updateOpportunity");
        assert!(
            compiled
                .text
                .contains(r#"updateOpportunity(id: "opp-1", data: {"stage":"WON"}) {"#)
        );
    }

    #[test]
    fn delete_selects_only_id() {
        let compiled = compile_mutation(MutationKind::Delete, "tasks", Some("t-9"), None);

        assert_eq!(compiled.result_key, "deleteTask");
        assert_snapshot!(compiled.text, @r#"
        mutation {
          deleteTask(id: "t-9") {
            id
          }
        }
        "#);
    }

    #[test]
    fn unknown_object_uses_fallback_token() {
        let compiled = compile_mutation(MutationKind::Create, "invoices", None, None);

        assert_eq!(compiled.result_key, "createInvoice");
        assert!(compiled.text.contains("createInvoice(data: {}) {"));
    }
}
