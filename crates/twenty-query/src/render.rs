//! Rendering of JSON values as GraphQL literals

use serde_json::Value;

/// Render a value as GraphQL input syntax.
///
/// Strings are wrapped in double quotes without escaping, so a string containing a quote
/// produces invalid GraphQL. Object keys are emitted bare, in insertion order.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quoted(s),
        Value::Array(items) => {
            let items: Vec<_> = items.iter().map(render_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let fields: Vec<_> = map.iter().map(render_field).collect();
            format!("{{{}}}", fields.join(", "))
        }
    }
}

fn render_field((key, value): (&String, &Value)) -> String {
    format!("{key}: {}", render_value(value))
}

/// Wrap text in double quotes, as is
pub(crate) fn quoted(text: &str) -> String {
    format!("\"{text}\"")
}

/// The text of a value without string quoting, used inside wildcard patterns
pub(crate) fn bare_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => render_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!("Acme"), r#""Acme""#)]
    #[case(json!(true), "true")]
    #[case(json!(false), "false")]
    #[case(json!(30), "30")]
    #[case(json!(-7), "-7")]
    #[case(json!(2.5), "2.5")]
    #[case(json!(null), "null")]
    #[case(json!([]), "[]")]
    #[case(json!({}), "{}")]
    fn renders_scalars(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(render_value(&value), expected);
    }

    #[test]
    fn renders_nested_structures_in_insertion_order() {
        let value = json!({
            "zeta": [1, "two", {"three": false}],
            "alpha": {"gte": 30.5},
        });

        assert_eq!(
            render_value(&value),
            r#"{zeta: [1, "two", {three: false}], alpha: {gte: 30.5}}"#
        );
    }

    #[test]
    fn does_not_escape_embedded_quotes() {
        assert_eq!(render_value(&json!("say \"hi\"")), r#""say "hi"""#);
    }

    #[test]
    fn bare_text_strips_string_quotes_only() {
        assert_eq!(bare_text(&json!("Acme")), "Acme");
        assert_eq!(bare_text(&json!(42)), "42");
        assert_eq!(bare_text(&json!(true)), "true");
    }
}
