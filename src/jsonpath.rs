//! Subset of the Kubernetes JSONPath dialect.
//!
//! Supported syntax:
//! - optional `{...}` template braces and leading `$`
//! - child access with `.field` or `['field']`
//! - array indexing with `[0]`, counting from the end with `[-1]`
//! - wildcards with `.*` or `[*]`
//! - filters on array items: `[?(@.type=="Ready")]`, `[?(@.type!='Ready')]` and `[?(@.name)]`
//!
//! Recursive descent (`..`), slices and unions are rejected at parse time.

use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Comparison {
    Exists,
    Equal(String),
    NotEqual(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(i64),
    Wildcard,
    Filter {
        path: Vec<String>,
        comparison: Comparison,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonPath {
    expression: String,
    segments: Vec<Segment>,
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl FromStr for JsonPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        JsonPath::parse(s)
    }
}

fn invalid(expression: &str, reason: impl fmt::Display) -> Error {
    Error::JsonPathError(format!("invalid expression {expression:?}: {reason}"))
}

fn unquote(value: &str) -> Option<&str> {
    let value = value.trim();
    let quoted = value.len() >= 2
        && ((value.starts_with('\'') && value.ends_with('\''))
            || (value.starts_with('"') && value.ends_with('"')));
    quoted.then(|| &value[1..value.len() - 1])
}

fn parse_filter(expression: &str, inner: &str) -> Result<Segment> {
    let inner = inner
        .strip_prefix("?(")
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| invalid(expression, "filter must look like ?(...)"))?;

    let (left, comparison) = match comparison_operator(inner) {
        Some((at, "!=")) => (&inner[..at], Comparison::NotEqual(literal(&inner[at + 2..]))),
        Some((at, _)) => (&inner[..at], Comparison::Equal(literal(&inner[at + 2..]))),
        None => (inner, Comparison::Exists),
    };

    let path = left
        .trim()
        .strip_prefix('@')
        .ok_or_else(|| invalid(expression, "filter must start with @"))?
        .split('.')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();

    Ok(Segment::Filter { path, comparison })
}

/// Byte offset of the first `==` or `!=` outside a quoted literal
fn comparison_operator(s: &str) -> Option<(usize, &'static str)> {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '=' | '!') if s[i + 1..].starts_with('=') => {
                return Some((i, if c == '!' { "!=" } else { "==" }));
            }
            _ => {}
        }
    }
    None
}

fn literal(value: &str) -> String {
    match unquote(value) {
        Some(unquoted) => unquoted.to_string(),
        None => value.trim().to_string(),
    }
}

fn parse_bracket(expression: &str, inner: &str) -> Result<Segment> {
    let inner = inner.trim();
    if inner == "*" {
        return Ok(Segment::Wildcard);
    }
    if inner.starts_with('?') {
        return parse_filter(expression, inner);
    }
    if let Some(field) = unquote(inner) {
        return Ok(Segment::Field(field.to_string()));
    }
    inner
        .parse::<i64>()
        .map(Segment::Index)
        .map_err(|_| invalid(expression, format!("unsupported subscript [{inner}]")))
}

impl JsonPath {
    pub fn parse(expression: &str) -> Result<Self> {
        let mut rest = expression.trim();
        if let Some(inner) = rest.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            rest = inner.trim();
        }
        rest = rest.strip_prefix('$').unwrap_or(rest);

        let mut segments = vec![];
        let mut first = true;
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let end = closing_bracket(after)
                    .ok_or_else(|| invalid(expression, "unterminated ["))?;
                segments.push(parse_bracket(expression, &after[..end])?);
                rest = &after[end + 1..];
            } else {
                let after = match rest.strip_prefix('.') {
                    Some(after) => after,
                    None if first => rest,
                    None => return Err(invalid(expression, format!("unexpected {rest:?}"))),
                };
                if after.starts_with('.') {
                    return Err(invalid(expression, "recursive descent is not supported"));
                }
                let end = after.find(['.', '[']).unwrap_or(after.len());
                let name = &after[..end];
                match name {
                    "" => return Err(invalid(expression, "empty field name")),
                    "*" => segments.push(Segment::Wildcard),
                    _ => segments.push(Segment::Field(name.to_string())),
                }
                rest = &after[end..];
            }
            first = false;
        }

        Ok(JsonPath {
            expression: expression.to_string(),
            segments,
        })
    }

    /// Every value the expression selects, in document order.
    pub fn query<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![document];
        for segment in &self.segments {
            current = current
                .into_iter()
                .flat_map(|value| select(segment, value))
                .collect();
        }
        current
    }
}

fn closing_bracket(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn select<'a>(segment: &Segment, value: &'a Value) -> Vec<&'a Value> {
    match (segment, value) {
        (Segment::Field(name), Value::Object(map)) => map.get(name).into_iter().collect(),
        (Segment::Index(index), Value::Array(items)) => {
            let len = items.len() as i64;
            let index = if *index < 0 { len + index } else { *index };
            usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i))
                .into_iter()
                .collect()
        }
        (Segment::Wildcard, Value::Array(items)) => items.iter().collect(),
        (Segment::Wildcard, Value::Object(map)) => map.values().collect(),
        (Segment::Filter { path, comparison }, Value::Array(items)) => items
            .iter()
            .filter(|item| matches_filter(item, path, comparison))
            .collect(),
        _ => vec![],
    }
}

fn matches_filter(item: &Value, path: &[String], comparison: &Comparison) -> bool {
    let found = path
        .iter()
        .try_fold(item, |value, field| value.get(field.as_str()));
    match (found, comparison) {
        (Some(value), Comparison::Exists) => !value.is_null(),
        (Some(value), Comparison::Equal(expected)) => render(value) == *expected,
        (Some(value), Comparison::NotEqual(expected)) => render(value) != *expected,
        (None, Comparison::NotEqual(_)) => true,
        (None, _) => false,
    }
}

/// Text form of a selected value, the way `kubectl -o jsonpath` prints it.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_account() -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "ServiceAccount",
            "metadata": {
                "name": "builder",
                "namespace": "ci",
                "labels": {"app.kubernetes.io/name": "builder"},
                "uid": "4a7f"
            },
            "automountServiceAccountToken": false,
            "secrets": [
                {"name": "builder-token", "kind": "Secret"},
                {"name": "builder-dockercfg", "kind": "Secret", "namespace": "ci"}
            ]
        })
    }

    fn first(expression: &str) -> Option<String> {
        let doc = service_account();
        JsonPath::parse(expression)
            .unwrap()
            .query(&doc)
            .first()
            .map(|v| render(v))
    }

    #[test]
    fn dotted_fields_with_and_without_root() {
        assert_eq!(first("$.metadata.name").as_deref(), Some("builder"));
        assert_eq!(first(".metadata.namespace").as_deref(), Some("ci"));
        assert_eq!(first("metadata.uid").as_deref(), Some("4a7f"));
        assert_eq!(first("{.kind}").as_deref(), Some("ServiceAccount"));
        assert_eq!(first("$.automountServiceAccountToken").as_deref(), Some("false"));
        assert_eq!(first("$.metadata.missing"), None);
    }

    #[test]
    fn bracket_fields_allow_dots_in_keys() {
        assert_eq!(
            first("$.metadata.labels['app.kubernetes.io/name']").as_deref(),
            Some("builder")
        );
        assert_eq!(
            first(r#"$["metadata"]["name"]"#).as_deref(),
            Some("builder")
        );
    }

    #[test]
    fn indexes_and_wildcards() {
        assert_eq!(first("$.secrets[0].name").as_deref(), Some("builder-token"));
        assert_eq!(first("$.secrets[-1].name").as_deref(), Some("builder-dockercfg"));
        assert_eq!(first("$.secrets[5].name"), None);

        let doc = service_account();
        let names: Vec<_> = JsonPath::parse("$.secrets[*].name")
            .unwrap()
            .query(&doc)
            .into_iter()
            .map(render)
            .collect();
        assert_eq!(names, vec!["builder-token", "builder-dockercfg"]);
    }

    #[test]
    fn filters() {
        assert_eq!(
            first(r#"$.secrets[?(@.name=="builder-dockercfg")].namespace"#).as_deref(),
            Some("ci")
        );
        assert_eq!(
            first("$.secrets[?(@.name != 'builder-token')].name").as_deref(),
            Some("builder-dockercfg")
        );
        assert_eq!(first("$.secrets[?(@.namespace)].name").as_deref(), Some("builder-dockercfg"));
        assert_eq!(first(r#"$.secrets[?(@.name=="nope")].name"#), None);
    }

    #[test]
    fn filter_literals_may_contain_operators() {
        let doc = json!({"items": [{"name": "a!=b", "v": "hit"}, {"name": "x", "v": "miss"}]});
        let query = |expression: &str| -> Vec<String> {
            JsonPath::parse(expression)
                .unwrap()
                .query(&doc)
                .into_iter()
                .map(render)
                .collect()
        };
        assert_eq!(query(r#"$.items[?(@.name=="a!=b")].v"#), vec!["hit"]);
        assert_eq!(query("$.items[?(@.name!='a==b')].v"), vec!["hit", "miss"]);
        assert_eq!(query("$.items[?(@.name != 'a!=b')].v"), vec!["miss"]);
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(JsonPath::parse("$..name").is_err());
        assert!(JsonPath::parse("$.secrets[0").is_err());
        assert!(JsonPath::parse("$.secrets[0:2]").is_err());
        assert!(JsonPath::parse("$.metadata.").is_err());
        assert!(JsonPath::parse("$.secrets[?@.name]").is_err());
    }
}
