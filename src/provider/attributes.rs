//! Typed access to three-valued attributes, and the shared drift helpers.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    error::{ProviderError, Result},
    provider::{
        data::{ResourceData, SHOW_OUTPUT},
        diff::CustomDiff,
        schema::{BOOL_DEFAULT, DiffSuppressFn, INT_UNSET},
    },
    sdk::identifier::{AccountObjectIdentifier, SchemaObjectIdentifier},
};

/// An attribute that may be left to Snowflake (`Unset`), explicitly reset
/// (`Default`) or given a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tristate<T> {
    Unset,
    Default,
    Value(T),
}

impl<T> Tristate<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Tristate::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Tristate::Value(_))
    }
}

/// Conversion between an attribute's JSON encoding and a typed value.
pub trait AttributeValue: Sized {
    fn from_attribute(attr: &str, value: &Value) -> Result<Tristate<Self>>;
    fn to_attribute(&self) -> Value;
}

fn invalid(attr: &str, expected: &str, value: &Value) -> ProviderError {
    ProviderError::Validation(format!("attribute `{attr}`: expected {expected}, got {value}"))
}

impl AttributeValue for bool {
    fn from_attribute(attr: &str, value: &Value) -> Result<Tristate<Self>> {
        match value {
            Value::Null => Ok(Tristate::Unset),
            Value::Bool(b) => Ok(Tristate::Value(*b)),
            Value::String(s) => match s.as_str() {
                "" => Ok(Tristate::Unset),
                BOOL_DEFAULT => Ok(Tristate::Default),
                "true" => Ok(Tristate::Value(true)),
                "false" => Ok(Tristate::Value(false)),
                _ => Err(invalid(attr, "\"true\", \"false\" or \"default\"", value)),
            },
            _ => Err(invalid(attr, "a boolean string", value)),
        }
    }

    fn to_attribute(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl AttributeValue for i64 {
    fn from_attribute(attr: &str, value: &Value) -> Result<Tristate<Self>> {
        match value {
            Value::Null => Ok(Tristate::Unset),
            Value::Number(n) => match n.as_i64() {
                Some(INT_UNSET) => Ok(Tristate::Unset),
                Some(n) if n >= 0 => Ok(Tristate::Value(n)),
                _ => Err(invalid(attr, "an integer >= -1", value)),
            },
            _ => Err(invalid(attr, "an integer", value)),
        }
    }

    fn to_attribute(&self) -> Value {
        Value::from(*self)
    }
}

impl AttributeValue for String {
    fn from_attribute(attr: &str, value: &Value) -> Result<Tristate<Self>> {
        match value {
            Value::Null => Ok(Tristate::Unset),
            Value::String(s) if s.is_empty() => Ok(Tristate::Unset),
            Value::String(s) => Ok(Tristate::Value(s.clone())),
            _ => Err(invalid(attr, "a string", value)),
        }
    }

    fn to_attribute(&self) -> Value {
        Value::String(self.clone())
    }
}

/// A set of strings; the empty set is unset.
impl AttributeValue for Vec<String> {
    fn from_attribute(attr: &str, value: &Value) -> Result<Tristate<Self>> {
        match value {
            Value::Null => Ok(Tristate::Unset),
            Value::Array(items) if items.is_empty() => Ok(Tristate::Unset),
            Value::Array(items) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid(attr, "a list of strings", value))
                })
                .collect::<Result<Vec<_>>>()
                .map(Tristate::Value),
            _ => Err(invalid(attr, "a list of strings", value)),
        }
    }

    fn to_attribute(&self) -> Value {
        Value::Array(self.iter().cloned().map(Value::String).collect())
    }
}

impl AttributeValue for AccountObjectIdentifier {
    fn from_attribute(attr: &str, value: &Value) -> Result<Tristate<Self>> {
        match String::from_attribute(attr, value)? {
            Tristate::Value(s) => Ok(Tristate::Value(AccountObjectIdentifier::parse(&s)?)),
            Tristate::Default => Ok(Tristate::Default),
            Tristate::Unset => Ok(Tristate::Unset),
        }
    }

    fn to_attribute(&self) -> Value {
        Value::String(crate::sdk::identifier::ObjectIdentifier::fully_qualified_name(self))
    }
}

impl AttributeValue for SchemaObjectIdentifier {
    fn from_attribute(attr: &str, value: &Value) -> Result<Tristate<Self>> {
        match String::from_attribute(attr, value)? {
            Tristate::Value(s) => Ok(Tristate::Value(SchemaObjectIdentifier::parse(&s)?)),
            Tristate::Default => Ok(Tristate::Default),
            Tristate::Unset => Ok(Tristate::Unset),
        }
    }

    fn to_attribute(&self) -> Value {
        Value::String(crate::sdk::identifier::ObjectIdentifier::fully_qualified_name(self))
    }
}

pub fn get_tristate<T: AttributeValue>(d: &ResourceData, attr: &str) -> Result<Tristate<T>> {
    T::from_attribute(attr, &d.get(attr))
}

/// Calls `with_fn` when the attribute has a real value; sentinels are left out of the request.
pub fn create_builder<T: AttributeValue>(d: &ResourceData, attr: &str, with_fn: impl FnOnce(T)) -> Result<()> {
    if let Tristate::Value(v) = get_tristate(d, attr)? {
        with_fn(v);
    }
    Ok(())
}

/// On change, a value goes to `set_fn` and a sentinel to `unset_fn`.
pub fn update_set_unset<T: AttributeValue>(
    d: &ResourceData,
    attr: &str,
    set_fn: impl FnOnce(T),
    unset_fn: impl FnOnce(),
) -> Result<()> {
    if !d.has_change(attr) {
        return Ok(());
    }
    match get_tristate(d, attr)? {
        Tristate::Value(v) => set_fn(v),
        Tristate::Unset | Tristate::Default => unset_fn(),
    }
    Ok(())
}

/// Writes the remote value unless state holds a sentinel and the remote value is the default.
pub fn read_set<T: AttributeValue + PartialEq>(d: &mut ResourceData, attr: &str, remote: T, default: &T) -> Result<()> {
    if get_tristate::<T>(d, attr)?.is_sentinel() && &remote == default {
        return Ok(());
    }
    d.set(attr, remote.to_attribute());
    Ok(())
}

/// Value of `field` in the prior `show_output`, if there is one.
pub fn show_output_value(d: &ResourceData, field: &str) -> Option<Value> {
    d.get_single(SHOW_OUTPUT)?.get(field).cloned().filter(|v| !v.is_null())
}

fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Diff suppression for three-valued attributes backed by a SHOW column.
///
/// Suppresses when the planned value is a sentinel and Snowflake currently
/// reports `account_default`, or when the planned value is exactly what
/// Snowflake reports already.
pub fn ignore_change_to_current_value_in_show(field: &'static str, account_default: Value) -> DiffSuppressFn {
    Arc::new(move |_, _, new, d| {
        if d.id().is_none() {
            return false;
        }
        let Some(current) = show_output_value(d, field) else {
            return false;
        };
        let new_is_sentinel = match new {
            Value::Null => true,
            Value::String(s) => s.is_empty() || s == BOOL_DEFAULT,
            Value::Number(n) => n.as_i64() == Some(INT_UNSET),
            _ => false,
        };
        if new_is_sentinel {
            as_text(&current).eq_ignore_ascii_case(&as_text(&account_default))
        } else {
            as_text(&current).eq_ignore_ascii_case(&as_text(new))
        }
    })
}

/// Suppresses any diff once the object exists.
pub fn ignore_after_creation() -> DiffSuppressFn {
    Arc::new(|_, _, _, d| d.id().is_some())
}

/// Case-insensitive comparison, for enum-like values Snowflake upper-cases.
pub fn ignore_case() -> DiffSuppressFn {
    Arc::new(|_, old, new, _| match (old.as_str(), new.as_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    })
}

/// Maps one SHOW column onto one state attribute.
#[derive(Debug, Clone)]
pub struct ShowMapping {
    pub output_field: &'static str,
    pub attr: &'static str,
    /// The column as SHOW returns it now.
    pub current: Value,
    /// The same value in the attribute's own encoding.
    pub normalized: Value,
}

impl ShowMapping {
    pub fn new(output_field: &'static str, attr: &'static str, current: impl Into<Value>, normalized: impl Into<Value>) -> Self {
        ShowMapping {
            output_field,
            attr,
            current: current.into(),
            normalized: normalized.into(),
        }
    }
}

/// Turns changes made outside the provider into state, so the next plan proposes reverting them.
///
/// A column counts as externally changed when it differs from the previous
/// `show_output`. Without a previous `show_output` (first read after import)
/// only attributes missing from state are filled in. Must run before
/// `show_output` itself is overwritten.
pub fn handle_external_changes_in_show(d: &mut ResourceData, mappings: &[ShowMapping]) {
    let previous = d.get_single(SHOW_OUTPUT);
    for mapping in mappings {
        match &previous {
            Some(previous) => {
                let before = previous.get(mapping.output_field).cloned().unwrap_or(Value::Null);
                if before != mapping.current {
                    tracing::info!(
                        "{} changed outside of the provider: {} -> {}",
                        mapping.output_field,
                        before,
                        mapping.current
                    );
                    d.set(mapping.attr, mapping.normalized.clone());
                }
            }
            None if d.get_raw(mapping.attr).is_none() => d.set(mapping.attr, mapping.normalized.clone()),
            None => {}
        }
    }
}

/// Custom-diff helper: when any of `attrs` change, `computed` is unknown until apply.
pub fn computed_if_any_attribute_changed(d: &ResourceData, diff: &mut CustomDiff, computed: &str, attrs: &[&str]) {
    if d.has_changes(attrs) {
        diff.set_new_computed(computed);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::provider::{
        data::AttributeMap,
        schema::{Attribute, AttributeType, Schema},
    };

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(0)
                .with_attribute(
                    "auto_resume",
                    Attribute::bool_tristate().with_diff_suppress(ignore_change_to_current_value_in_show(
                        "auto_resume",
                        json!("true"),
                    )),
                )
                .with_attribute("auto_suspend_secs", Attribute::int_with_sentinel())
                .with_attribute("comment", Attribute::optional(AttributeType::String))
                .with_attribute(SHOW_OUTPUT, Attribute::output()),
        )
    }

    fn map(value: Value) -> AttributeMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_tristate_decoding() {
        assert_eq!(bool::from_attribute("a", &json!("")).unwrap(), Tristate::Unset);
        assert_eq!(bool::from_attribute("a", &json!("default")).unwrap(), Tristate::Default);
        assert_eq!(bool::from_attribute("a", &json!("false")).unwrap(), Tristate::Value(false));
        assert!(bool::from_attribute("a", &json!("maybe")).is_err());
        assert_eq!(i64::from_attribute("a", &json!(-1)).unwrap(), Tristate::Unset);
        assert_eq!(i64::from_attribute("a", &json!(0)).unwrap(), Tristate::Value(0));
        assert!(i64::from_attribute("a", &json!(-5)).is_err());
        assert_eq!(String::from_attribute("a", &json!("")).unwrap(), Tristate::Unset);
    }

    #[test]
    fn test_create_builder_skips_sentinels() {
        let d = ResourceData::for_create(schema(), &map(json!({"auto_resume": "", "auto_suspend_secs": 300})));
        let mut resume = None;
        let mut suspend = None;
        create_builder(&d, "auto_resume", |v: bool| resume = Some(v)).unwrap();
        create_builder(&d, "auto_suspend_secs", |v: i64| suspend = Some(v)).unwrap();
        assert_eq!(resume, None);
        assert_eq!(suspend, Some(300));
    }

    #[test]
    fn test_update_set_unset() {
        let prior = map(json!({"id": "P", "auto_suspend_secs": 300, "comment": "a"}));
        let d = ResourceData::for_update(schema(), &prior, &map(json!({"auto_suspend_secs": -1, "comment": "b"})));

        let mut unset_suspend = false;
        update_set_unset(&d, "auto_suspend_secs", |_: i64| panic!("no set expected"), || unset_suspend = true).unwrap();
        assert!(unset_suspend);

        let mut comment = None;
        update_set_unset(&d, "comment", |v: String| comment = Some(v), || panic!("no unset expected")).unwrap();
        assert_eq!(comment.as_deref(), Some("b"));
    }

    #[test]
    fn test_read_set_keeps_sentinel_at_default() {
        let mut d = ResourceData::for_read(schema(), &map(json!({"id": "P", "auto_suspend_secs": -1})));
        read_set(&mut d, "auto_suspend_secs", 3600, &3600).unwrap();
        assert_eq!(d.get("auto_suspend_secs"), json!(-1));
        read_set(&mut d, "auto_suspend_secs", 120, &3600).unwrap();
        assert_eq!(d.get("auto_suspend_secs"), json!(120));
    }

    #[test]
    fn test_sentinel_against_account_default_plans_empty() {
        let prior = map(json!({"id": "P", "auto_resume": "true", "show_output": [{"auto_resume": true}]}));
        let d = ResourceData::for_update(schema(), &prior, &map(json!({"auto_resume": ""})));
        assert!(!d.has_change("auto_resume"));

        let prior = map(json!({"id": "P", "auto_resume": "false", "show_output": [{"auto_resume": false}]}));
        let d = ResourceData::for_update(schema(), &prior, &map(json!({"auto_resume": ""})));
        assert!(d.has_change("auto_resume"));
    }

    #[test]
    fn test_external_change_lands_in_state() {
        let prior = map(json!({"id": "R", "comment": "", "show_output": [{"comment": ""}]}));
        let mut d = ResourceData::for_read(schema(), &prior);
        handle_external_changes_in_show(&mut d, &[ShowMapping::new("comment", "comment", "foo", "foo")]);
        assert_eq!(d.get("comment"), json!("foo"));

        let prior = map(json!({"id": "R", "comment": "", "show_output": [{"comment": "foo"}]}));
        let mut d = ResourceData::for_read(schema(), &prior);
        handle_external_changes_in_show(&mut d, &[ShowMapping::new("comment", "comment", "foo", "foo")]);
        assert_eq!(d.get("comment"), json!(""));
    }

    #[test]
    fn test_external_change_fills_imported_state() {
        let mut d = ResourceData::for_import(schema(), "R");
        handle_external_changes_in_show(&mut d, &[ShowMapping::new("comment", "comment", "foo", "foo")]);
        assert_eq!(d.get("comment"), json!("foo"));
    }
}
