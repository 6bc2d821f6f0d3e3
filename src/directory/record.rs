use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Organizational attributes of one directory entry.
///
/// Multi-valued attributes keep their first non-empty value only; `memberOf` is
/// the exception and keeps every group DN.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub title: Option<String>,
    pub mail: Option<String>,
    pub groups: Vec<String>,
}

impl DirectoryRecord {
    /// Build a record from raw entry attributes. Attribute names match case-insensitively.
    #[must_use]
    pub fn from_attributes(attrs: &HashMap<String, Vec<String>>) -> Self {
        Self {
            given_name: first_value(attrs, "givenName"),
            surname: first_value(attrs, "sn"),
            title: first_value(attrs, "title"),
            mail: first_value(attrs, "mail"),
            groups: values(attrs, "memberOf")
                .iter()
                .filter(|dn| !dn.is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Exact match against the stored group DNs.
    #[must_use]
    pub fn is_member_of(&self, group_dn: &str) -> bool {
        self.groups.iter().any(|dn| dn == group_dn)
    }
}

fn values<'a>(attrs: &'a HashMap<String, Vec<String>>, name: &str) -> &'a [String] {
    attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, values)| values.as_slice())
        .unwrap_or_default()
}

fn first_value(attrs: &HashMap<String, Vec<String>>, name: &str) -> Option<String> {
    values(attrs, name)
        .iter()
        .find(|value| !value.is_empty())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(key, values)| {
                (
                    (*key).to_string(),
                    values.iter().map(|v| (*v).to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn first_value_wins_for_single_valued_fields() {
        let record = DirectoryRecord::from_attributes(&attrs(&[
            ("givenName", &["Jane", "Janet"]),
            ("sn", &["Doe"]),
            ("mail", &["jane@example.com", "jdoe@example.com"]),
        ]));

        assert_eq!(record.given_name.as_deref(), Some("Jane"));
        assert_eq!(record.surname.as_deref(), Some("Doe"));
        assert_eq!(record.mail.as_deref(), Some("jane@example.com"));
        assert!(record.title.is_none());
    }

    #[test]
    fn attribute_names_are_case_insensitive() {
        let record = DirectoryRecord::from_attributes(&attrs(&[
            ("givenname", &["Jane"]),
            ("MEMBEROF", &["CN=Staff,DC=example,DC=com"]),
        ]));

        assert_eq!(record.given_name.as_deref(), Some("Jane"));
        assert_eq!(record.groups, vec!["CN=Staff,DC=example,DC=com"]);
    }

    #[test]
    fn empty_values_are_skipped() {
        let record = DirectoryRecord::from_attributes(&attrs(&[
            ("title", &["", "Nurse"]),
            ("mail", &[""]),
            ("memberOf", &["", "CN=A,DC=example,DC=com"]),
        ]));

        assert_eq!(record.title.as_deref(), Some("Nurse"));
        assert!(record.mail.is_none());
        assert_eq!(record.groups.len(), 1);
    }

    #[test]
    fn group_membership_is_exact() {
        let record = DirectoryRecord::from_attributes(&attrs(&[(
            "memberOf",
            &["CN=Locked,OU=Groups,DC=example,DC=com"],
        )]));

        assert!(record.is_member_of("CN=Locked,OU=Groups,DC=example,DC=com"));
        assert!(!record.is_member_of("cn=locked,ou=groups,dc=example,dc=com"));
        assert!(!record.is_member_of("CN=Locked"));
    }
}
