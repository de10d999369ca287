//! Directory entry representation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A directory object as returned to clients: `dn` plus its attributes.
/// Single-valued attributes are strings, multi-valued ones arrays of strings.
pub type Entry = Map<String, Value>;

/// Distinguished name of an entry
pub fn entry_dn(entry: &Entry) -> Option<&str> {
    entry.get("dn").and_then(Value::as_str)
}

/// All string values of an attribute, matched case-insensitively by name
pub fn attr_values<'a>(entry: &'a Entry, name: &str) -> Vec<&'a str> {
    let value = entry
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v);

    match value {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// First string value of an attribute
pub fn first_attr<'a>(entry: &'a Entry, name: &str) -> Option<&'a str> {
    attr_values(entry, name).into_iter().next()
}

/// Build an entry from raw multi-valued attributes
pub fn entry_from_attrs<I, V>(dn: &str, attrs: I) -> Entry
where
    I: IntoIterator<Item = (String, V)>,
    V: IntoIterator<Item = String>,
{
    let mut entry = Map::new();
    entry.insert("dn".to_string(), Value::String(dn.to_string()));

    let mut sorted: Vec<(String, Vec<String>)> = attrs
        .into_iter()
        .map(|(k, v)| (k, v.into_iter().collect()))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, mut values) in sorted {
        let value = match values.len() {
            0 => continue,
            1 => Value::String(values.remove(0)),
            _ => Value::Array(values.into_iter().map(Value::String).collect()),
        };
        entry.insert(name, value);
    }

    entry
}

/// Response of `GET /all`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllEntries {
    pub users: Vec<Entry>,
    pub groups: Vec<Entry>,
    pub ous: Vec<Entry>,
    pub other: Vec<Entry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_from_attrs() {
        let entry = entry_from_attrs(
            "CN=Jane Doe,CN=Users,DC=example,DC=com",
            vec![
                ("sAMAccountName".to_string(), vec!["jdoe".to_string()]),
                (
                    "memberOf".to_string(),
                    vec!["CN=Ops,DC=example,DC=com".to_string(), "CN=Dev,DC=example,DC=com".to_string()],
                ),
                ("description".to_string(), vec![]),
            ],
        );

        assert_eq!(entry_dn(&entry), Some("CN=Jane Doe,CN=Users,DC=example,DC=com"));
        assert_eq!(entry["sAMAccountName"], json!("jdoe"));
        assert_eq!(attr_values(&entry, "memberof").len(), 2);
        assert!(!entry.contains_key("description"));
    }

    #[test]
    fn test_first_attr_case_insensitive() {
        let entry = json!({ "dn": "CN=x", "Mail": "x@example.com" });
        let entry = entry.as_object().unwrap();
        assert_eq!(first_attr(entry, "mail"), Some("x@example.com"));
        assert_eq!(first_attr(entry, "title"), None);
    }
}
