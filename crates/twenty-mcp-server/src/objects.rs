//! The CRM objects exposed as tools

/// A first-class Twenty object with its own set of tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrmObject {
    People,
    Companies,
    Opportunities,
    Notes,
    Tasks,
}

impl CrmObject {
    pub const ALL: [CrmObject; 5] = [
        CrmObject::People,
        CrmObject::Companies,
        CrmObject::Opportunities,
        CrmObject::Notes,
        CrmObject::Tasks,
    ];

    /// The collection name, used as the query root field
    pub fn plural(self) -> &'static str {
        match self {
            CrmObject::People => "people",
            CrmObject::Companies => "companies",
            CrmObject::Opportunities => "opportunities",
            CrmObject::Notes => "notes",
            CrmObject::Tasks => "tasks",
        }
    }

    /// The singular noun used in tool names and result keys
    pub fn noun(self) -> &'static str {
        match self {
            CrmObject::People => "person",
            CrmObject::Companies => "company",
            CrmObject::Opportunities => "opportunity",
            CrmObject::Notes => "note",
            CrmObject::Tasks => "task",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CrmObject::People => "Person",
            CrmObject::Companies => "Company",
            CrmObject::Opportunities => "Opportunity",
            CrmObject::Notes => "Note",
            CrmObject::Tasks => "Task",
        }
    }

    /// Whether basic and complex search tools are offered
    pub fn searchable(self) -> bool {
        matches!(
            self,
            CrmObject::People | CrmObject::Companies | CrmObject::Opportunities
        )
    }

    /// Typical fields, shown to the agent in the create tool description
    pub(crate) fn example_data(self) -> &'static str {
        match self {
            CrmObject::People => {
                r#"{"name": {"firstName": "John", "lastName": "Doe"}, "emails": {"primaryEmail": "john.doe@example.com"}, "city": "New York"}"#
            }
            CrmObject::Companies => {
                r#"{"name": "Acme Corp", "domainName": {"primaryLinkUrl": "https://acme.com"}, "employees": 50}"#
            }
            CrmObject::Opportunities => {
                r#"{"name": "Enterprise deal", "stage": "NEW", "amount": {"amountMicros": 50000000000, "currencyCode": "USD"}}"#
            }
            CrmObject::Notes => r#"{"title": "Meeting notes"}"#,
            CrmObject::Tasks => {
                r#"{"title": "Follow up with client", "status": "TODO", "dueAt": "2024-12-31T23:59:59.000Z"}"#
            }
        }
    }

    /// Find an object by its collection name
    pub fn from_plural(plural: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|object| object.plural() == plural)
    }
}
