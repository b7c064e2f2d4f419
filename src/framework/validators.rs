use super::Diagnostics;
use crate::jsonpath::JsonPath;
use serde::Serialize;
use serde_json::Value;

const DNS1123_LABEL_MAX_LENGTH: usize = 63;
const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const QUALIFIED_NAME_MAX_LENGTH: usize = 63;
const LABEL_VALUE_MAX_LENGTH: usize = 63;

const DNS1123_LABEL_ERROR: &str = "a lowercase RFC 1123 label must consist of lower case alphanumeric characters or '-', and must start and end with an alphanumeric character";
const DNS1123_SUBDOMAIN_ERROR: &str = "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character";
const QUALIFIED_NAME_ERROR: &str = "name part must consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character";

/// Checks attached to a schema attribute, run against configured values only.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "argument", rename_all = "snake_case")]
pub enum Validator {
    Dns1123Subdomain,
    Dns1123Label,
    /// Map keys must be qualified names (`prefix/name`)
    QualifiedNameKeys,
    /// Map values must be valid label values
    LabelValues,
    LengthAtLeast(usize),
    AtLeast(i64),
    /// Expression must parse as a supported JSONPath
    JsonPath,
}

impl Validator {
    pub fn validate(&self, path: &str, value: &Value, diags: &mut Diagnostics) {
        let errors = match (self, value) {
            (Validator::Dns1123Subdomain, Value::String(s)) => is_dns1123_subdomain(s),
            (Validator::Dns1123Label, Value::String(s)) => is_dns1123_label(s),
            (Validator::QualifiedNameKeys, Value::Object(map)) => map
                .keys()
                .flat_map(|k| {
                    is_qualified_name(k)
                        .into_iter()
                        .map(move |e| format!("key {k:?}: {e}"))
                })
                .collect(),
            (Validator::LabelValues, Value::Object(map)) => map
                .iter()
                .flat_map(|(k, v)| {
                    let errors = match v.as_str() {
                        Some(v) => is_label_value(v),
                        None => vec!["must be a string".to_string()],
                    };
                    errors.into_iter().map(move |e| format!("value of {k:?}: {e}"))
                })
                .collect(),
            (Validator::LengthAtLeast(min), Value::String(s)) => {
                let length = s.chars().count();
                if length < *min {
                    vec![format!("string length must be at least {min}, got: {length}")]
                } else {
                    vec![]
                }
            }
            (Validator::AtLeast(min), Value::Number(n)) => match n.as_i64() {
                Some(n) if n >= *min => vec![],
                _ => vec![format!("value must be at least {min}, got: {n}")],
            },
            (Validator::JsonPath, Value::String(s)) => match JsonPath::parse(s) {
                Ok(_) => vec![],
                Err(e) => vec![format!("must be a supported JSONPath expression: {e}")],
            },
            // type mismatches are reported by the schema walk
            _ => vec![],
        };

        for error in errors {
            diags.add_attribute_error(
                path,
                "Invalid Attribute Value",
                format!("Attribute {path} {error}"),
            );
        }
    }
}

fn is_alphanumeric_lower(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

pub fn is_dns1123_label(value: &str) -> Vec<String> {
    let mut errors = vec![];
    if value.len() > DNS1123_LABEL_MAX_LENGTH {
        errors.push(format!(
            "must be no more than {DNS1123_LABEL_MAX_LENGTH} characters"
        ));
    }
    let valid = !value.is_empty()
        && value.chars().all(|c| is_alphanumeric_lower(c) || c == '-')
        && value.starts_with(is_alphanumeric_lower)
        && value.ends_with(is_alphanumeric_lower);
    if !valid {
        errors.push(DNS1123_LABEL_ERROR.to_string());
    }
    errors
}

pub fn is_dns1123_subdomain(value: &str) -> Vec<String> {
    let mut errors = vec![];
    if value.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        errors.push(format!(
            "must be no more than {DNS1123_SUBDOMAIN_MAX_LENGTH} characters"
        ));
    }
    let valid = !value.is_empty()
        && value.split('.').all(|part| {
            !part.is_empty()
                && part.chars().all(|c| is_alphanumeric_lower(c) || c == '-')
                && part.starts_with(is_alphanumeric_lower)
                && part.ends_with(is_alphanumeric_lower)
        });
    if !valid {
        errors.push(DNS1123_SUBDOMAIN_ERROR.to_string());
    }
    errors
}

fn is_name_part(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && value.starts_with(|c: char| c.is_ascii_alphanumeric())
        && value.ends_with(|c: char| c.is_ascii_alphanumeric())
}

pub fn is_qualified_name(value: &str) -> Vec<String> {
    let mut errors = vec![];
    let (prefix, name) = match value.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, value),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() {
            errors.push("prefix part must be non-empty".to_string());
        } else {
            errors.extend(
                is_dns1123_subdomain(prefix)
                    .into_iter()
                    .map(|e| format!("prefix part {e}")),
            );
        }
    }

    if name.len() > QUALIFIED_NAME_MAX_LENGTH {
        errors.push(format!(
            "name part must be no more than {QUALIFIED_NAME_MAX_LENGTH} characters"
        ));
    }
    if !is_name_part(name) {
        errors.push(QUALIFIED_NAME_ERROR.to_string());
    }
    errors
}

pub fn is_label_value(value: &str) -> Vec<String> {
    let mut errors = vec![];
    if value.len() > LABEL_VALUE_MAX_LENGTH {
        errors.push(format!(
            "must be no more than {LABEL_VALUE_MAX_LENGTH} characters"
        ));
    }
    if !value.is_empty() && !is_name_part(value) {
        errors.push("a valid label must be an empty string or consist of alphanumeric characters, '-', '_' or '.', and must start and end with an alphanumeric character".to_string());
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dns1123_label() {
        assert!(is_dns1123_label("kube-system").is_empty());
        assert!(is_dns1123_label("a").is_empty());
        assert!(!is_dns1123_label("").is_empty());
        assert!(!is_dns1123_label("Kube").is_empty());
        assert!(!is_dns1123_label("-leading").is_empty());
        assert!(!is_dns1123_label("trailing-").is_empty());
        assert!(!is_dns1123_label("with.dot").is_empty());
        assert!(!is_dns1123_label(&"a".repeat(64)).is_empty());
    }

    #[test]
    fn dns1123_subdomain() {
        assert!(is_dns1123_subdomain("builder").is_empty());
        assert!(is_dns1123_subdomain("my.service-account.example").is_empty());
        assert!(!is_dns1123_subdomain("double..dot").is_empty());
        assert!(!is_dns1123_subdomain(".leading").is_empty());
        assert!(!is_dns1123_subdomain("UPPER").is_empty());
        assert!(!is_dns1123_subdomain(&"a".repeat(254)).is_empty());
    }

    #[test]
    fn qualified_names() {
        assert!(is_qualified_name("app").is_empty());
        assert!(is_qualified_name("app.kubernetes.io/name").is_empty());
        assert!(is_qualified_name("Some_Key").is_empty());
        assert!(!is_qualified_name("/name").is_empty());
        assert!(!is_qualified_name("Example.com/name").is_empty());
        assert!(!is_qualified_name("example.com/").is_empty());
        assert!(!is_qualified_name("bad key").is_empty());
    }

    #[test]
    fn label_values() {
        assert!(is_label_value("").is_empty());
        assert!(is_label_value("v1.2_3-x").is_empty());
        assert!(!is_label_value("-x").is_empty());
        assert!(!is_label_value(&"a".repeat(64)).is_empty());
    }

    #[test]
    fn validator_reports_attribute_path() {
        let mut diags = Diagnostics::new();
        Validator::Dns1123Label.validate("metadata.namespace", &json!("Not_Valid"), &mut diags);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.attribute.as_deref(), Some("metadata.namespace"));
        assert_eq!(diag.summary, "Invalid Attribute Value");
        assert!(diag.detail.contains("RFC 1123 label"));
    }

    #[test]
    fn map_validators_check_each_entry() {
        let mut diags = Diagnostics::new();
        let labels = json!({"app": "web", "bad key": "ok", "tier": "-nope"});
        Validator::QualifiedNameKeys.validate("metadata.labels", &labels, &mut diags);
        Validator::LabelValues.validate("metadata.labels", &labels, &mut diags);
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn scalar_validators() {
        let mut diags = Diagnostics::new();
        Validator::LengthAtLeast(1).validate("field_manager", &json!(""), &mut diags);
        Validator::AtLeast(1).validate("timeout", &json!(0), &mut diags);
        Validator::JsonPath.validate("wait_for[0].jsonpath", &json!("$..name"), &mut diags);
        assert_eq!(diags.len(), 3);

        let mut diags = Diagnostics::new();
        Validator::LengthAtLeast(3).validate("field_manager", &json!("éé"), &mut diags);
        let detail = &diags.iter().next().unwrap().detail;
        assert!(detail.ends_with("got: 2"), "{detail}");

        let mut diags = Diagnostics::new();
        Validator::AtLeast(1).validate("timeout", &json!(30), &mut diags);
        Validator::JsonPath.validate("wait_for[0].jsonpath", &json!("$.secrets[0].name"), &mut diags);
        assert!(diags.is_empty());
    }
}
