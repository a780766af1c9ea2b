//! Resource schemas: the attribute shapes the diff engine and validator need.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    provider::data::{AttributeMap, ResourceData},
    sdk::{
        datatypes::parse_data_type,
        identifier::{IdentifierKind, parse_identifier},
    },
};

pub const BOOL_DEFAULT: &str = "default";
pub const BOOL_UNSET: &str = "";
pub const INT_UNSET: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Int,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Object(IndexMap<String, AttributeType>),
    /// Any JSON value. Used by flattened SHOW and DESCRIBE outputs.
    Dynamic,
}

impl AttributeType {
    pub fn list(element: AttributeType) -> Self {
        AttributeType::List(Box::new(element))
    }

    pub fn set(element: AttributeType) -> Self {
        AttributeType::Set(Box::new(element))
    }

    pub fn object<const N: usize>(fields: [(&str, AttributeType); N]) -> Self {
        AttributeType::Object(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// The value an absent attribute compares as.
    pub fn zero_value(&self) -> Value {
        match self {
            AttributeType::String => Value::String(String::new()),
            AttributeType::Int => Value::from(0),
            AttributeType::Bool => Value::Bool(false),
            AttributeType::List(_) | AttributeType::Set(_) => Value::Array(Vec::new()),
            AttributeType::Object(_) => Value::Object(AttributeMap::new()),
            AttributeType::Dynamic => Value::Null,
        }
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (_, Value::Null) | (AttributeType::Dynamic, _) => Ok(()),
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Number(n)) if n.is_i64() => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),
            (AttributeType::List(element) | AttributeType::Set(element), Value::Array(items)) => {
                items.iter().enumerate().try_for_each(|(i, item)| {
                    element.check(item).map_err(|e| format!("element {i}: {e}"))
                })
            }
            (AttributeType::Object(fields), Value::Object(map)) => {
                for key in map.keys() {
                    if !fields.contains_key(key) {
                        return Err(format!("unexpected field `{key}`"));
                    }
                }
                fields.iter().try_for_each(|(name, ty)| match map.get(name) {
                    Some(v) => ty.check(v).map_err(|e| format!("field `{name}`: {e}")),
                    None => Ok(()),
                })
            }
            (expected, got) => Err(format!("expected {}, got {}", expected.describe(), crate::sdk::record::json_kind(got))),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Int => "integer",
            AttributeType::Bool => "bool",
            AttributeType::List(_) => "list",
            AttributeType::Set(_) => "set",
            AttributeType::Object(_) => "object",
            AttributeType::Dynamic => "any value",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeFlags {
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
}

pub type ValidateFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Decides that a difference between the prior and the planned value is not a change.
/// Arguments: attribute name, prior value, planned value, the data being diffed.
pub type DiffSuppressFn = Arc<dyn Fn(&str, &Value, &Value, &ResourceData) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Attribute {
    pub attr_type: AttributeType,
    pub flags: AttributeFlags,
    pub description: Option<String>,
    /// A change replaces the object.
    pub force_new: bool,
    /// Only the create call reads this attribute; later changes are not diffed.
    pub ignore_after_creation: bool,
    pub default: Option<Value>,
    pub validator: Option<ValidateFn>,
    pub diff_suppress: Option<DiffSuppressFn>,
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("attr_type", &self.attr_type)
            .field("flags", &self.flags)
            .field("force_new", &self.force_new)
            .field("ignore_after_creation", &self.ignore_after_creation)
            .field("default", &self.default)
            .field("validator", &self.validator.is_some())
            .field("diff_suppress", &self.diff_suppress.is_some())
            .finish()
    }
}

impl Attribute {
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Attribute {
            attr_type,
            flags,
            description: None,
            force_new: false,
            ignore_after_creation: false,
            default: None,
            validator: None,
            diff_suppress: None,
        }
    }

    pub fn required(attr_type: AttributeType) -> Self {
        Attribute::new(
            attr_type,
            AttributeFlags {
                required: true,
                ..Default::default()
            },
        )
    }

    pub fn optional(attr_type: AttributeType) -> Self {
        Attribute::new(
            attr_type,
            AttributeFlags {
                optional: true,
                ..Default::default()
            },
        )
    }

    pub fn computed(attr_type: AttributeType) -> Self {
        Attribute::new(
            attr_type,
            AttributeFlags {
                computed: true,
                ..Default::default()
            },
        )
    }

    /// Settable, but Snowflake fills it in when left out.
    pub fn optional_computed(attr_type: AttributeType) -> Self {
        Attribute::new(
            attr_type,
            AttributeFlags {
                optional: true,
                computed: true,
                ..Default::default()
            },
        )
    }

    /// String-encoded three-valued boolean: `""`, `"true"`, `"false"` or `"default"`.
    pub fn bool_tristate() -> Self {
        Attribute::optional(AttributeType::String)
            .with_default(Value::String(BOOL_UNSET.to_string()))
            .with_validator(validate_bool_string)
    }

    /// Integer where `-1` stands for the account default.
    pub fn int_with_sentinel() -> Self {
        Attribute::optional(AttributeType::Int)
            .with_default(Value::from(INT_UNSET))
            .with_validator(validate_int_sentinel)
    }

    pub fn identifier(kind: IdentifierKind) -> Self {
        Attribute::required(AttributeType::String).with_validator(move |v| match v.as_str() {
            Some(s) => parse_identifier(kind, s).map(|_| ()).map_err(|e| e.to_string()),
            None => Ok(()),
        })
    }

    /// One flattened SHOW or DESCRIBE row, stored as a single-element list.
    pub fn output() -> Self {
        Attribute::computed(AttributeType::list(AttributeType::Dynamic))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_ignore_after_creation(mut self) -> Self {
        self.ignore_after_creation = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_validator(mut self, f: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static) -> Self {
        self.validator = Some(Arc::new(f));
        self
    }

    pub fn with_diff_suppress(mut self, f: DiffSuppressFn) -> Self {
        self.diff_suppress = Some(f);
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }

    /// Config can set this attribute.
    pub fn is_configurable(&self) -> bool {
        self.flags.required || self.flags.optional
    }

    /// What an absent value compares as: the default, else the type's zero value.
    pub fn effective_default(&self) -> Value {
        self.default.clone().unwrap_or_else(|| self.attr_type.zero_value())
    }
}

pub fn validate_bool_string(v: &Value) -> Result<(), String> {
    match v.as_str() {
        Some("" | "true" | "false" | BOOL_DEFAULT) | None => Ok(()),
        Some(other) => Err(format!(
            "expected \"true\", \"false\" or \"{BOOL_DEFAULT}\", got \"{other}\""
        )),
    }
}

pub fn validate_int_sentinel(v: &Value) -> Result<(), String> {
    match v.as_i64() {
        Some(n) if n < INT_UNSET => Err(format!("expected a value >= {INT_UNSET}, got {n}")),
        _ => Ok(()),
    }
}

pub fn validate_data_type(v: &Value) -> Result<(), String> {
    match v.as_str() {
        Some(s) => parse_data_type(s).map(|_| ()).map_err(|e| e.to_string()),
        None => Ok(()),
    }
}

pub fn validate_one_of(allowed: &'static [&'static str]) -> impl Fn(&Value) -> Result<(), String> + Send + Sync {
    move |v| match v.as_str() {
        Some(s) if !allowed.iter().any(|a| a.eq_ignore_ascii_case(s)) => {
            Err(format!("expected one of {}, got \"{s}\"", allowed.join(", ")))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub version: u64,
    pub attributes: IndexMap<String, Attribute>,
}

impl Schema {
    pub fn new(version: u64) -> Self {
        Schema {
            version,
            attributes: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Checks a configuration against the schema. Never fails; problems come back as error diagnostics.
    pub fn validate(&self, config: &AttributeMap) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for (name, attr) in &self.attributes {
            let value = config.get(name).filter(|v| !v.is_null());
            match value {
                None if attr.flags.required => {
                    diagnostics.push(Diagnostic::error("missing required attribute").with_attribute(name));
                }
                None => {}
                Some(_) if !attr.is_configurable() => {
                    diagnostics.push(
                        Diagnostic::error("attribute is computed and cannot be set").with_attribute(name),
                    );
                }
                Some(v) => {
                    if let Err(e) = attr.attr_type.check(v) {
                        diagnostics.push(Diagnostic::error("invalid attribute type").with_detail(e).with_attribute(name));
                    } else if let Some(validator) = &attr.validator
                        && let Err(e) = validator(v)
                    {
                        diagnostics.push(Diagnostic::error("invalid attribute value").with_detail(e).with_attribute(name));
                    }
                }
            }
        }

        for name in config.keys() {
            if name != "id" && !self.attributes.contains_key(name) {
                diagnostics.push(Diagnostic::error("unknown attribute").with_attribute(name));
            }
        }

        diagnostics
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>) -> Self {
        Diagnostic {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Diagnostic {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn schema() -> Schema {
        Schema::new(0)
            .with_attribute("name", Attribute::identifier(IdentifierKind::Account).with_force_new())
            .with_attribute("auto_resume", Attribute::bool_tristate())
            .with_attribute("auto_suspend_secs", Attribute::int_with_sentinel())
            .with_attribute(
                "argument",
                Attribute::required(AttributeType::list(AttributeType::object([
                    ("name", AttributeType::String),
                    ("type", AttributeType::String),
                ]))),
            )
            .with_attribute("show_output", Attribute::output())
    }

    fn config(value: Value) -> AttributeMap {
        value.as_object().cloned().unwrap()
    }

    fn failing_attributes(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().filter_map(|d| d.attribute.as_deref()).collect()
    }

    #[test]
    fn test_valid_config() {
        let diagnostics = schema().validate(&config(json!({
            "name": "p",
            "auto_resume": "default",
            "auto_suspend_secs": -1,
            "argument": [{"name": "A", "type": "VARCHAR"}],
        })));
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_bool_strings_are_checked() {
        let diagnostics = schema().validate(&config(json!({
            "name": "p",
            "auto_resume": "yes",
            "argument": [],
        })));
        assert_eq!(failing_attributes(&diagnostics), vec!["auto_resume"]);
    }

    #[test]
    fn test_structural_errors() {
        let diagnostics = schema().validate(&config(json!({
            "name": "a..b",
            "auto_suspend_secs": -2,
            "argument": [{"name": 1}],
            "show_output": [],
            "bogus": true,
        })));
        assert_eq!(
            failing_attributes(&diagnostics),
            vec!["name", "auto_suspend_secs", "argument", "show_output", "bogus"]
        );
        assert!(diagnostics.iter().all(Diagnostic::is_error));
    }

    #[test]
    fn test_missing_required() {
        let diagnostics = schema().validate(&AttributeMap::new());
        assert_eq!(failing_attributes(&diagnostics), vec!["name", "argument"]);
    }

    #[test]
    fn test_one_of() {
        let family = validate_one_of(&["CPU_X64_XS", "CPU_X64_S"]);
        assert!(family(&json!("cpu_x64_xs")).is_ok());
        assert!(family(&json!("GPU")).is_err());
    }
}
