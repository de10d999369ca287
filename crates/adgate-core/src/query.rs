//! Query-string translation
//!
//! Turns `?fields=cn,mail&sort=cn&title=Eng*` into [`QueryOptions`], which
//! backends use both to build an LDAP filter and to post-process results.

use crate::types::{attr_values, first_attr, Entry};
use serde_json::Value;
use std::cmp::Ordering;

/// Parameters with a fixed meaning; everything else is an attribute filter
const RESERVED: &[&str] = &["fields", "q", "sort", "order", "start", "limit"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Attributes to return (`dn` is always kept)
    pub fields: Option<Vec<String>>,
    /// Attribute equality filters, `*` acts as a wildcard
    pub filters: Vec<(String, String)>,
    /// Free-text search over all string attributes
    pub q: Option<String>,
    pub sort: Option<String>,
    pub descending: bool,
    pub start: usize,
    pub limit: Option<usize>,
}

impl QueryOptions {
    /// Parse a raw query string; malformed input yields the empty query
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs: Vec<(String, String)> = raw
            .and_then(|q| serde_urlencoded::from_str(q).ok())
            .unwrap_or_default();

        Self::from_pairs(pairs)
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut options = QueryOptions::default();

        for (key, value) in pairs {
            match key.as_str() {
                "fields" => {
                    let fields: Vec<String> = value
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(String::from)
                        .collect();
                    if !fields.is_empty() {
                        options.fields = Some(fields);
                    }
                }
                "q" if !value.is_empty() => options.q = Some(value),
                "sort" if !value.is_empty() => options.sort = Some(value),
                "order" => options.descending = value.eq_ignore_ascii_case("desc"),
                "start" => options.start = value.parse().unwrap_or(0),
                "limit" => options.limit = value.parse().ok(),
                k if RESERVED.contains(&k) => {}
                k if is_attribute_name(k) && !value.is_empty() => {
                    options.filters.push((key, value));
                }
                _ => {}
            }
        }

        options
    }

    /// LDAP rendering of the attribute filters
    pub fn ldap_filter(&self) -> Option<String> {
        let parts: Vec<String> = self
            .filters
            .iter()
            .map(|(k, v)| format!("({}={})", k, escape_filter_value(v)))
            .collect();

        match parts.len() {
            0 => None,
            1 => parts.into_iter().next(),
            _ => Some(format!("(&{})", parts.concat())),
        }
    }

    /// AND `base` with the attribute filters
    pub fn combine_filter(&self, base: &str) -> String {
        match self.ldap_filter() {
            Some(extra) => format!("(&{}{})", base, extra),
            None => base.to_string(),
        }
    }

    /// Attributes to request from the server
    pub fn requested_attributes(&self) -> Vec<String> {
        match &self.fields {
            Some(fields) => fields.clone(),
            None => vec!["*".to_string()],
        }
    }

    /// Whether an entry satisfies the attribute filters
    pub fn matches_filters(&self, entry: &Entry) -> bool {
        self.filters.iter().all(|(attr, pattern)| {
            attr_values(entry, attr)
                .iter()
                .any(|v| wildcard_match(pattern, v))
        })
    }

    fn matches_text(&self, entry: &Entry) -> bool {
        let needle = match &self.q {
            Some(q) => q.to_lowercase(),
            None => return true,
        };

        entry.values().any(|value| match value {
            Value::String(s) => s.to_lowercase().contains(&needle),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .any(|s| s.to_lowercase().contains(&needle)),
            _ => false,
        })
    }

    /// Free-text search, sort, paging and projection
    pub fn apply(&self, mut entries: Vec<Entry>) -> Vec<Entry> {
        entries.retain(|e| self.matches_text(e));

        if let Some(sort) = &self.sort {
            entries.sort_by(|a, b| {
                let ordering = compare_attr(a, b, sort);
                if self.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let limit = self.limit.unwrap_or(usize::MAX);
        entries
            .into_iter()
            .skip(self.start)
            .take(limit)
            .map(|e| self.project(e))
            .collect()
    }

    /// Keep only the requested fields
    pub fn project(&self, entry: Entry) -> Entry {
        let fields = match &self.fields {
            Some(fields) => fields,
            None => return entry,
        };

        entry
            .into_iter()
            .filter(|(k, _)| k == "dn" || fields.iter().any(|f| f.eq_ignore_ascii_case(k)))
            .collect()
    }
}

fn compare_attr(a: &Entry, b: &Entry, attr: &str) -> Ordering {
    match (first_attr(a, attr), first_attr(b, attr)) {
        (Some(x), Some(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Attribute descriptions: letters, digits, `-`, `.` and `;` options
pub fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ';' || c == '.')
}

/// RFC 4515 escaping that leaves `*` as a wildcard
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

/// Case-insensitive glob match supporting `*`
pub fn wildcard_match(pattern: &str, value: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let value = value.to_lowercase();

    if !pattern.contains('*') {
        return pattern == value;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let mut rest = value.as_str();

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(idx) => rest = &rest[idx + part.len()..],
                None => return false,
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: Value) -> Entry {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_query() {
        let options = QueryOptions::parse(Some(
            "fields=cn,mail&sAMAccountName=jo*&sort=cn&order=desc&start=1&limit=5&q=doe",
        ));

        assert_eq!(options.fields, Some(vec!["cn".to_string(), "mail".to_string()]));
        assert_eq!(
            options.filters,
            vec![("sAMAccountName".to_string(), "jo*".to_string())]
        );
        assert_eq!(options.sort.as_deref(), Some("cn"));
        assert!(options.descending);
        assert_eq!(options.start, 1);
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.q.as_deref(), Some("doe"));
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert_eq!(QueryOptions::parse(None), QueryOptions::default());
        assert_eq!(QueryOptions::parse(Some("")), QueryOptions::default());

        // keys that could break out of a filter are dropped
        let options = QueryOptions::parse(Some("cn)(objectClass=*=x"));
        assert!(options.filters.is_empty());
    }

    #[test]
    fn test_ldap_filter() {
        let options = QueryOptions::parse(Some("sAMAccountName=jo*"));
        assert_eq!(options.ldap_filter().as_deref(), Some("(sAMAccountName=jo*)"));

        let options = QueryOptions::parse(Some("cn=a(b)&title=Eng"));
        assert_eq!(
            options.ldap_filter().as_deref(),
            Some("(&(cn=a\\28b\\29)(title=Eng))")
        );

        assert_eq!(
            options.combine_filter("(objectClass=group)"),
            "(&(objectClass=group)(&(cn=a\\28b\\29)(title=Eng)))"
        );
        assert_eq!(QueryOptions::default().combine_filter("(x=y)"), "(x=y)");
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("jo*", "John"));
        assert!(wildcard_match("*doe", "jdoe"));
        assert!(wildcard_match("j*d*e", "jane doe"));
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("JDOE", "jdoe"));
        assert!(!wildcard_match("jo*", "jane"));
        assert!(!wildcard_match("*doe", "doex"));
    }

    #[test]
    fn test_apply_sort_page_project() {
        let entries = vec![
            entry(json!({ "dn": "CN=b", "cn": "Bravo", "mail": "b@x" })),
            entry(json!({ "dn": "CN=a", "cn": "alpha", "mail": "a@x" })),
            entry(json!({ "dn": "CN=c", "cn": "Charlie", "mail": "c@x" })),
        ];

        let options = QueryOptions::parse(Some("sort=cn&start=1&limit=1&fields=cn"));
        let result = options.apply(entries.clone());
        assert_eq!(result, vec![entry(json!({ "dn": "CN=b", "cn": "Bravo" }))]);

        let options = QueryOptions::parse(Some("sort=cn&order=desc"));
        let result = options.apply(entries.clone());
        assert_eq!(result[0]["cn"], json!("Charlie"));

        let options = QueryOptions::parse(Some("q=ALPHA"));
        assert_eq!(options.apply(entries).len(), 1);
    }

    #[test]
    fn test_matches_filters() {
        let e = entry(json!({
            "dn": "CN=Jane,DC=x",
            "sAMAccountName": "jdoe",
            "memberOf": ["CN=Ops,DC=x", "CN=Dev,DC=x"]
        }));

        assert!(QueryOptions::parse(Some("samaccountname=jd*")).matches_filters(&e));
        assert!(QueryOptions::parse(Some("memberOf=CN=Dev,DC=x")).matches_filters(&e));
        assert!(!QueryOptions::parse(Some("memberOf=CN=QA*")).matches_filters(&e));
    }
}
