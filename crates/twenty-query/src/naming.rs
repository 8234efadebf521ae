//! Mapping of plural CRM object names to the tokens used in mutation field names

/// Irregular or camel-cased object names with a known mutation token
const MUTATION_TOKENS: &[(&str, &str)] = &[
    ("people", "Person"),
    ("companies", "Company"),
    ("opportunities", "Opportunity"),
    ("notes", "Note"),
    ("tasks", "Task"),
    ("noteTargets", "NoteTarget"),
    ("taskTargets", "TaskTarget"),
    ("attachments", "Attachment"),
    ("activities", "Activity"),
    ("favorites", "Favorite"),
    ("workspaceMembers", "WorkspaceMember"),
    ("timelineActivities", "TimelineActivity"),
    ("messages", "Message"),
    ("calendarEvents", "CalendarEvent"),
];

/// Resolve the capitalised singular token for an object, e.g. `people` -> `Person`.
///
/// Names outside the table fall back to dropping one trailing `s` and upper-casing the first
/// character. The fallback is naive about irregular plurals, which is why the table exists.
pub fn mutation_token(object_name: &str) -> String {
    MUTATION_TOKENS
        .iter()
        .find(|(plural, _)| *plural == object_name)
        .map(|(_, token)| (*token).to_string())
        .unwrap_or_else(|| capitalize(object_name.strip_suffix('s').unwrap_or(object_name)))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("people", "Person")]
    #[case("companies", "Company")]
    #[case("opportunities", "Opportunity")]
    #[case("notes", "Note")]
    #[case("tasks", "Task")]
    #[case("workspaceMembers", "WorkspaceMember")]
    fn known_objects_use_the_table(#[case] object: &str, #[case] token: &str) {
        assert_eq!(mutation_token(object), token);
    }

    #[rstest]
    #[case("invoices", "Invoice")]
    #[case("pets", "Pet")]
    #[case("rocketShips", "RocketShip")]
    #[case("address", "Addres")]
    #[case("sheep", "Sheep")]
    #[case("s", "")]
    #[case("", "")]
    fn unknown_objects_use_the_fallback(#[case] object: &str, #[case] token: &str) {
        assert_eq!(mutation_token(object), token);
    }

    #[test]
    fn resolution_is_stable() {
        for (plural, token) in MUTATION_TOKENS {
            assert_eq!(mutation_token(plural), *token);
            assert_eq!(mutation_token(plural), mutation_token(plural));
        }
    }
}
