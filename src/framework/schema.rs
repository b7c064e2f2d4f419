use super::{Diagnostics, Validator};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Required,
    Optional,
    Computed,
    OptionalComputed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanModifier {
    /// A change of the value destroys and recreates the resource
    RequiresReplace,
    /// Keep the prior state value when the configuration leaves it unset
    UseStateForUnknown,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "attributes", rename_all = "snake_case")]
pub enum AttributeKind {
    String,
    Bool,
    Int64,
    StringMap,
    Object(Vec<Attribute>),
    ObjectList(Vec<Attribute>),
}

impl AttributeKind {
    fn type_name(&self) -> &'static str {
        match self {
            AttributeKind::String => "string",
            AttributeKind::Bool => "bool",
            AttributeKind::Int64 => "number",
            AttributeKind::StringMap => "map of string",
            AttributeKind::Object(_) => "object",
            AttributeKind::ObjectList(_) => "list of object",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
    pub mode: Mode,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plan_modifiers: Vec<PlanModifier>,
}

impl Attribute {
    fn new(name: &str, kind: AttributeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            mode: Mode::Optional,
            description: String::new(),
            default: None,
            validators: vec![],
            plan_modifiers: vec![],
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeKind::String)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeKind::Bool)
    }

    pub fn int64(name: &str) -> Self {
        Self::new(name, AttributeKind::Int64)
    }

    pub fn string_map(name: &str) -> Self {
        Self::new(name, AttributeKind::StringMap)
    }

    pub fn object(name: &str, attributes: Vec<Attribute>) -> Self {
        Self::new(name, AttributeKind::Object(attributes))
    }

    pub fn object_list(name: &str, attributes: Vec<Attribute>) -> Self {
        Self::new(name, AttributeKind::ObjectList(attributes))
    }

    pub fn required(mut self) -> Self {
        self.mode = Mode::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.mode = Mode::Optional;
        self
    }

    pub fn computed(mut self) -> Self {
        self.mode = Mode::Computed;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.mode = Mode::OptionalComputed;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn plan_modifier(mut self, modifier: PlanModifier) -> Self {
        self.plan_modifiers.push(modifier);
        self
    }

    fn has_modifier(&self, modifier: PlanModifier) -> bool {
        self.plan_modifiers.contains(&modifier)
    }
}

/// Declared shape of a resource's configuration and state documents.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Schema {
    pub description: String,
    pub attributes: Vec<Attribute>,
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn present<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    object.get(name).filter(|v| !v.is_null())
}

impl Schema {
    /// Look up an attribute by dotted path, e.g. `metadata.name`
    pub fn attribute(&self, path: &str) -> Option<&Attribute> {
        let mut attributes: &[Attribute] = self.attributes.as_slice();
        let mut found = None;
        for part in path.split('.') {
            let attribute = attributes.iter().find(|a| a.name == part)?;
            attributes = match &attribute.kind {
                AttributeKind::Object(nested) | AttributeKind::ObjectList(nested) => {
                    nested.as_slice()
                }
                _ => &[],
            };
            found = Some(attribute);
        }
        found
    }

    pub fn validate(&self, config: &Value, diags: &mut Diagnostics) {
        match config.as_object() {
            Some(object) => validate_object(&self.attributes, object, "", diags),
            None => diags.add_error(
                "Invalid configuration",
                "The resource configuration must be an object.",
            ),
        }
    }

    /// Fill absent attributes that declare a default, recursing into nested objects.
    pub fn apply_defaults(&self, config: &mut Value) {
        apply_defaults(&self.attributes, config);
    }

    /// Planned state: configuration plus defaults, with unset computed values
    /// carried over from the prior state where the attribute asks for it.
    pub fn plan(&self, config: &Value, prior_state: Option<&Value>) -> Value {
        let mut planned = config.clone();
        self.apply_defaults(&mut planned);
        if let Some(prior) = prior_state {
            use_state_for_unknown(&self.attributes, &mut planned, prior);
        }
        planned
    }

    /// Attribute paths whose change forces the resource to be replaced.
    pub fn requires_replace(&self, prior_state: &Value, planned: &Value) -> Vec<String> {
        let mut paths = vec![];
        collect_replacements(&self.attributes, prior_state, planned, "", &mut paths);
        paths
    }
}

fn validate_object(
    attributes: &[Attribute],
    object: &Map<String, Value>,
    parent: &str,
    diags: &mut Diagnostics,
) {
    for key in object.keys() {
        if !attributes.iter().any(|a| &a.name == key) {
            diags.add_attribute_error(
                join(parent, key),
                "Unsupported argument",
                format!("An argument named {key:?} is not expected here."),
            );
        }
    }

    for attribute in attributes {
        let path = join(parent, &attribute.name);
        match (present(object, &attribute.name), attribute.mode) {
            (None, Mode::Required) => diags.add_attribute_error(
                &path,
                "Missing Configuration for Required Attribute",
                format!(
                    "Must set a configuration value for the {path} attribute as the provider has marked it as required."
                ),
            ),
            (None, _) => {}
            (Some(_), Mode::Computed) => diags.add_attribute_error(
                &path,
                "Invalid Configuration for Read-Only Attribute",
                format!(
                    "Cannot set value for this attribute as the provider has marked it as read-only. Remove the configuration line setting the value. Attribute: {path}"
                ),
            ),
            (Some(value), _) => validate_value(attribute, value, &path, diags),
        }
    }
}

fn validate_value(attribute: &Attribute, value: &Value, path: &str, diags: &mut Diagnostics) {
    let type_ok = match &attribute.kind {
        AttributeKind::String => value.is_string(),
        AttributeKind::Bool => value.is_boolean(),
        AttributeKind::Int64 => value.is_i64() || value.is_u64(),
        AttributeKind::StringMap => value
            .as_object()
            .is_some_and(|m| m.values().all(Value::is_string)),
        AttributeKind::Object(_) => value.is_object(),
        AttributeKind::ObjectList(_) => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_object)),
    };
    if !type_ok {
        diags.add_attribute_error(
            path,
            "Incorrect attribute value type",
            format!(
                "Inappropriate value for attribute {:?}: {} required.",
                attribute.name,
                attribute.kind.type_name()
            ),
        );
        return;
    }

    for validator in &attribute.validators {
        validator.validate(path, value, diags);
    }

    match (&attribute.kind, value) {
        (AttributeKind::Object(nested), Value::Object(object)) => {
            validate_object(nested, object, path, diags)
        }
        (AttributeKind::ObjectList(nested), Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                if let Value::Object(object) = item {
                    validate_object(nested, object, &format!("{path}[{index}]"), diags);
                }
            }
        }
        _ => {}
    }
}

fn apply_defaults(attributes: &[Attribute], value: &mut Value) {
    let Value::Object(object) = value else {
        return;
    };

    for attribute in attributes {
        if present(object, &attribute.name).is_none() {
            if let Some(default) = &attribute.default {
                object.insert(attribute.name.clone(), default.clone());
            }
            continue;
        }

        match (&attribute.kind, object.get_mut(&attribute.name)) {
            (AttributeKind::Object(nested), Some(child)) => apply_defaults(nested, child),
            (AttributeKind::ObjectList(nested), Some(Value::Array(items))) => {
                for item in items.iter_mut() {
                    apply_defaults(nested, item);
                }
            }
            _ => {}
        }
    }
}

fn use_state_for_unknown(attributes: &[Attribute], planned: &mut Value, prior: &Value) {
    let (Value::Object(planned), Value::Object(prior)) = (planned, prior) else {
        return;
    };

    for attribute in attributes {
        if let AttributeKind::Object(nested) = &attribute.kind {
            if let (Some(child), Some(prior_child)) =
                (planned.get_mut(&attribute.name), prior.get(&attribute.name))
            {
                use_state_for_unknown(nested, child, prior_child);
            }
            continue;
        }

        if present(planned, &attribute.name).is_some() {
            continue;
        }
        let computed = matches!(attribute.mode, Mode::Computed | Mode::OptionalComputed);
        if computed && attribute.has_modifier(PlanModifier::UseStateForUnknown) {
            if let Some(prior_value) = present(prior, &attribute.name) {
                planned.insert(attribute.name.clone(), prior_value.clone());
            }
        }
    }
}

fn collect_replacements(
    attributes: &[Attribute],
    prior: &Value,
    planned: &Value,
    parent: &str,
    paths: &mut Vec<String>,
) {
    for attribute in attributes {
        let path = join(parent, &attribute.name);
        let before = prior.get(attribute.name.as_str()).unwrap_or(&Value::Null);
        let after = planned.get(attribute.name.as_str()).unwrap_or(&Value::Null);

        if attribute.has_modifier(PlanModifier::RequiresReplace) && before != after {
            paths.push(path);
            continue;
        }

        if let AttributeKind::Object(nested) = &attribute.kind {
            collect_replacements(nested, before, after, &path, paths);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema {
            description: "test".into(),
            attributes: vec![
                Attribute::string("id")
                    .computed()
                    .plan_modifier(PlanModifier::UseStateForUnknown),
                Attribute::string("field_manager")
                    .optional_computed()
                    .default_value("manager"),
                Attribute::object(
                    "metadata",
                    vec![
                        Attribute::string("name")
                            .required()
                            .validator(Validator::Dns1123Subdomain)
                            .plan_modifier(PlanModifier::RequiresReplace),
                        Attribute::string_map("labels"),
                    ],
                )
                .required(),
                Attribute::object_list(
                    "wait_for",
                    vec![
                        Attribute::string("jsonpath").required(),
                        Attribute::int64("timeout").default_value(30),
                    ],
                ),
            ],
        }
    }

    #[test]
    fn valid_configuration_has_no_diagnostics() {
        let mut diags = Diagnostics::new();
        schema().validate(
            &json!({"metadata": {"name": "sa", "labels": {"a": "b"}}}),
            &mut diags,
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn reports_missing_unsupported_and_read_only() {
        let mut diags = Diagnostics::new();
        schema().validate(&json!({"id": "x", "extra": 1}), &mut diags);
        let paths: Vec<_> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert_eq!(paths, vec!["extra", "id", "metadata"]);
    }

    #[test]
    fn reports_type_mismatch_and_nested_paths() {
        let mut diags = Diagnostics::new();
        schema().validate(
            &json!({
                "metadata": {"name": "Bad_Name", "labels": {"a": 1}},
                "wait_for": [{"timeout": 5}]
            }),
            &mut diags,
        );
        let paths: Vec<_> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert_eq!(
            paths,
            vec!["metadata.name", "metadata.labels", "wait_for[0].jsonpath"]
        );
    }

    #[test]
    fn non_object_configuration_is_rejected() {
        let mut diags = Diagnostics::new();
        schema().validate(&json!("nope"), &mut diags);
        assert!(diags.has_error());
    }

    #[test]
    fn plan_applies_defaults_and_keeps_computed_state() {
        let config = json!({"metadata": {"name": "sa"}, "wait_for": [{"jsonpath": "$.x"}]});
        let prior = json!({"id": "default/sa", "field_manager": "other", "metadata": {"name": "sa"}});
        let planned = schema().plan(&config, Some(&prior));
        assert_eq!(
            planned,
            json!({
                "id": "default/sa",
                "field_manager": "manager",
                "metadata": {"name": "sa"},
                "wait_for": [{"jsonpath": "$.x", "timeout": 30}]
            })
        );
    }

    #[test]
    fn requires_replace_on_name_change() {
        let prior = json!({"metadata": {"name": "a", "labels": {"x": "1"}}});
        let planned = json!({"metadata": {"name": "b", "labels": {"x": "2"}}});
        assert_eq!(schema().requires_replace(&prior, &planned), vec!["metadata.name"]);
        assert!(schema().requires_replace(&prior, &prior).is_empty());
    }

    #[test]
    fn attribute_lookup_by_path() {
        let schema = schema();
        assert_eq!(schema.attribute("metadata.name").unwrap().mode, Mode::Required);
        assert!(schema.attribute("metadata.missing").is_none());
        assert!(schema.attribute("id.id").is_none());
        assert_eq!(
            schema.attribute("wait_for.timeout").unwrap().default,
            Some(json!(30))
        );
    }

    #[test]
    fn serializes_kinds_with_type_tag() {
        let attribute = Attribute::object_list("refs", vec![Attribute::string("name")]);
        assert_eq!(
            serde_json::to_value(&attribute.kind).unwrap(),
            json!({
                "type": "object_list",
                "attributes": [{
                    "name": "name",
                    "kind": {"type": "string"},
                    "mode": "optional",
                    "description": ""
                }]
            })
        );
    }
}
