use std::sync::Arc;

use serde_json::Value;

use crate::provider::schema::{AttributeType, Diagnostic, Schema};

pub type AttributeMap = serde_json::Map<String, Value>;

pub const ID: &str = "id";
pub const FULLY_QUALIFIED_NAME: &str = "fully_qualified_name";
pub const SHOW_OUTPUT: &str = "show_output";
pub const DESCRIBE_OUTPUT: &str = "describe_output";

/// One object's attributes as a lifecycle call sees them.
///
/// `old` is the prior state. `new` starts as the planned state (config merged
/// over prior computed values) and is what the call leaves behind as the next
/// state. During a read both start out as the prior state.
#[derive(Debug, Clone)]
pub struct ResourceData {
    schema: Arc<Schema>,
    old: AttributeMap,
    new: AttributeMap,
    persisted: AttributeMap,
    diagnostics: Vec<Diagnostic>,
    is_new: bool,
}

impl ResourceData {
    pub fn for_create(schema: Arc<Schema>, config: &AttributeMap) -> Self {
        let new = planned_state(&schema, None, config);
        ResourceData {
            schema,
            old: AttributeMap::new(),
            new,
            persisted: AttributeMap::new(),
            diagnostics: Vec::new(),
            is_new: true,
        }
    }

    pub fn for_update(schema: Arc<Schema>, state: &AttributeMap, config: &AttributeMap) -> Self {
        let new = planned_state(&schema, Some(state), config);
        ResourceData {
            schema,
            old: state.clone(),
            new,
            persisted: AttributeMap::new(),
            diagnostics: Vec::new(),
            is_new: false,
        }
    }

    pub fn for_read(schema: Arc<Schema>, state: &AttributeMap) -> Self {
        ResourceData {
            schema,
            old: state.clone(),
            new: state.clone(),
            persisted: AttributeMap::new(),
            diagnostics: Vec::new(),
            is_new: false,
        }
    }

    /// Empty data carrying only the id the user passed to import.
    pub fn for_import(schema: Arc<Schema>, id: &str) -> Self {
        let mut new = AttributeMap::new();
        new.insert(ID.to_string(), Value::String(id.to_string()));
        ResourceData {
            schema,
            old: AttributeMap::new(),
            new,
            persisted: AttributeMap::new(),
            diagnostics: Vec::new(),
            is_new: false,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn id(&self) -> Option<&str> {
        self.new
            .get(ID)
            .or_else(|| self.old.get(ID))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = Value::String(id.into());
        self.new.insert(ID.to_string(), id.clone());
        self.persisted.insert(ID.to_string(), id);
    }

    /// The object is gone; the state is dropped.
    pub fn clear(&mut self) {
        self.new.clear();
    }

    pub fn is_cleared(&self) -> bool {
        self.new.is_empty()
    }

    /// Raw value, `None` when absent or null.
    pub fn get_raw(&self, attr: &str) -> Option<&Value> {
        self.new.get(attr).filter(|v| !v.is_null())
    }

    pub fn get_old_raw(&self, attr: &str) -> Option<&Value> {
        self.old.get(attr).filter(|v| !v.is_null())
    }

    /// Current value, falling back to the schema default, then to the type's zero value.
    pub fn get(&self, attr: &str) -> Value {
        self.effective(self.get_raw(attr), attr)
    }

    pub fn get_old(&self, attr: &str) -> Value {
        self.effective(self.get_old_raw(attr), attr)
    }

    pub fn get_str(&self, attr: &str) -> String {
        match self.get(attr) {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn get_old_str(&self, attr: &str) -> String {
        match self.get_old(attr) {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn get_i64(&self, attr: &str) -> Option<i64> {
        self.get(attr).as_i64()
    }

    pub fn get_list(&self, attr: &str) -> Vec<Value> {
        match self.get(attr) {
            Value::Array(items) => items,
            _ => Vec::new(),
        }
    }

    pub fn get_old_list(&self, attr: &str) -> Vec<Value> {
        match self.get_old(attr) {
            Value::Array(items) => items,
            _ => Vec::new(),
        }
    }

    /// First element of a single-element list attribute such as `show_output`.
    pub fn get_single(&self, attr: &str) -> Option<AttributeMap> {
        self.get_raw(attr)?.as_array()?.first()?.as_object().cloned()
    }

    fn effective(&self, value: Option<&Value>, attr: &str) -> Value {
        match (value, self.schema.attribute(attr)) {
            (Some(v), _) => v.clone(),
            (None, Some(a)) => a.effective_default(),
            (None, None) => Value::Null,
        }
    }

    pub fn set(&mut self, attr: &str, value: impl Into<Value>) {
        self.new.insert(attr.to_string(), value.into());
    }

    /// Single-element list, the layout of `show_output` and `describe_output`.
    pub fn set_single(&mut self, attr: &str, value: Value) {
        self.set(attr, Value::Array(vec![value]));
    }

    /// Marks the current value of `attr` as committed remotely, so a partial
    /// state returned after a later failure carries it.
    pub fn persist(&mut self, attr: &str) {
        if let Some(v) = self.new.get(attr) {
            self.persisted.insert(attr.to_string(), v.clone());
        }
    }

    pub fn get_change(&self, attr: &str) -> (Value, Value) {
        (self.get_old(attr), self.get(attr))
    }

    /// Whether `attr` differs between prior and planned state, honoring set
    /// semantics, attributes ignored after creation and diff-suppress functions.
    pub fn has_change(&self, attr: &str) -> bool {
        let Some(schema_attr) = self.schema.attribute(attr) else {
            return self.get_old_raw(attr) != self.get_raw(attr);
        };
        if schema_attr.ignore_after_creation && !self.is_new {
            return false;
        }

        let (old, new) = self.get_change(attr);
        let differs = match &schema_attr.attr_type {
            AttributeType::Set(_) => sorted(&old) != sorted(&new),
            _ => old != new,
        };
        if !differs {
            return false;
        }
        match &schema_attr.diff_suppress {
            Some(suppress) => !suppress(attr, &old, &new, self),
            None => true,
        }
    }

    pub fn has_changes(&self, attrs: &[&str]) -> bool {
        attrs.iter().any(|a| self.has_change(a))
    }

    pub fn warn(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        let summary = summary.into();
        let detail = detail.into();
        tracing::warn!("{summary}: {detail}");
        self.diagnostics.push(Diagnostic::warning(summary).with_detail(detail));
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn state(&self) -> &AttributeMap {
        &self.new
    }

    pub fn into_state(self) -> Option<AttributeMap> {
        if self.new.is_empty() { None } else { Some(self.new) }
    }

    /// Prior state plus whatever was persisted before a failure.
    pub fn partial_state(&self) -> AttributeMap {
        let mut state = self.old.clone();
        for (k, v) in &self.persisted {
            state.insert(k.clone(), v.clone());
        }
        state
    }
}

fn sorted(v: &Value) -> Vec<String> {
    let mut items: Vec<String> = match v {
        Value::Array(items) => items.iter().map(Value::to_string).collect(),
        _ => Vec::new(),
    };
    items.sort();
    items
}

/// What the state is expected to look like once config is applied.
///
/// Config wins where it has a value. Otherwise computed attributes keep their
/// prior value and the rest take the schema default. Attributes ignored after
/// creation keep their prior value whenever there is a prior state.
pub fn planned_state(schema: &Schema, prior: Option<&AttributeMap>, config: &AttributeMap) -> AttributeMap {
    let mut planned = AttributeMap::new();

    if let Some(id) = prior.and_then(|p| p.get(ID)) {
        planned.insert(ID.to_string(), id.clone());
    }

    for (name, attr) in &schema.attributes {
        let configured = config.get(name).filter(|v| !v.is_null());
        let previous = prior.and_then(|p| p.get(name)).filter(|v| !v.is_null());
        let value = match (configured, previous) {
            (_, Some(p)) if attr.ignore_after_creation => Some(p.clone()),
            (Some(c), _) if attr.is_configurable() => Some(c.clone()),
            (_, Some(p)) if attr.flags.computed => Some(p.clone()),
            _ => attr.default.clone(),
        };
        if let Some(value) = value {
            planned.insert(name.clone(), value);
        }
    }

    planned
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::provider::schema::{Attribute, AttributeType};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(0)
                .with_attribute("name", Attribute::required(AttributeType::String))
                .with_attribute("auto_resume", Attribute::bool_tristate())
                .with_attribute("max_nodes", Attribute::required(AttributeType::Int))
                .with_attribute("initially_suspended", Attribute::bool_tristate().with_ignore_after_creation())
                .with_attribute("integrations", Attribute::optional(AttributeType::set(AttributeType::String)))
                .with_attribute(
                    "comment",
                    Attribute::optional(AttributeType::String).with_diff_suppress(Arc::new(|_, old, new, _| {
                        old.as_str().map(str::trim) == new.as_str().map(str::trim)
                    })),
                )
                .with_attribute(SHOW_OUTPUT, Attribute::output()),
        )
    }

    fn map(value: Value) -> AttributeMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_planned_state() {
        let prior = map(json!({
            "id": "P",
            "name": "P",
            "max_nodes": 2,
            "initially_suspended": "true",
            "show_output": [{"name": "P"}],
        }));
        let config = map(json!({"name": "P", "max_nodes": 3, "initially_suspended": "false"}));
        let planned = planned_state(&schema(), Some(&prior), &config);
        assert_eq!(planned["id"], "P");
        assert_eq!(planned["max_nodes"], 3);
        assert_eq!(planned["auto_resume"], "");
        assert_eq!(planned["initially_suspended"], "true");
        assert_eq!(planned["show_output"], json!([{"name": "P"}]));
        assert!(!planned.contains_key("comment"));
    }

    #[test]
    fn test_has_change_uses_effective_values() {
        let prior = map(json!({"id": "P", "name": "P", "max_nodes": 2}));
        let config = map(json!({"name": "P", "max_nodes": 2, "auto_resume": ""}));
        let d = ResourceData::for_update(schema(), &prior, &config);
        assert!(!d.has_change("auto_resume"));
        assert!(!d.has_change("max_nodes"));
        assert!(!d.has_change("comment"));
    }

    #[test]
    fn test_has_change_honors_suppress_and_sets() {
        let prior = map(json!({"id": "P", "comment": "x ", "integrations": ["A", "B"], "initially_suspended": "true"}));
        let config = map(json!({"comment": "x", "integrations": ["B", "A"], "initially_suspended": "false"}));
        let d = ResourceData::for_update(schema(), &prior, &config);
        assert!(!d.has_change("comment"));
        assert!(!d.has_change("integrations"));
        assert!(!d.has_change("initially_suspended"));

        let config = map(json!({"comment": "y", "integrations": ["A"]}));
        let d = ResourceData::for_update(schema(), &prior, &config);
        assert!(d.has_change("comment"));
        assert!(d.has_change("integrations"));
    }

    #[test]
    fn test_partial_state_carries_persisted_attributes() {
        let prior = map(json!({"id": "OLD", "name": "OLD", "max_nodes": 2}));
        let config = map(json!({"name": "NEW", "max_nodes": 5}));
        let mut d = ResourceData::for_update(schema(), &prior, &config);
        d.set_id("NEW");
        d.persist("name");

        let partial = d.partial_state();
        assert_eq!(partial["id"], "NEW");
        assert_eq!(partial["name"], "NEW");
        assert_eq!(partial["max_nodes"], 2);
    }

    #[test]
    fn test_clear_drops_state() {
        let mut d = ResourceData::for_read(schema(), &map(json!({"id": "X"})));
        assert_eq!(d.id(), Some("X"));
        d.clear();
        assert!(d.is_cleared());
        assert!(d.into_state().is_none());
    }
}
