//! Pieces every kind's lifecycle shares: identifiers from state, output flattening, drift warnings.

use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{ProviderError, Result},
    provider::{
        attributes::show_output_value,
        data::{FULLY_QUALIFIED_NAME, ResourceData},
        lifecycle::LifecycleState,
        schema::{Attribute, AttributeType},
    },
    sdk::identifier::{
        AccountObjectIdentifier, IdentifierKind, ObjectIdentifier, SchemaObjectIdentifier, parse_identifier,
    },
};

pub const NAME: &str = "name";
pub const DATABASE: &str = "database";
pub const SCHEMA: &str = "schema";
pub const COMMENT: &str = "comment";

/// A single, unquoted identifier part such as `name` or `database`.
pub fn name_part() -> Attribute {
    Attribute::required(AttributeType::String).with_validator(|v| match v.as_str() {
        Some(s) if s.is_empty() => Err("must not be empty".to_string()),
        _ => Ok(()),
    })
}

/// An optional reference to another object, e.g. the share a listing publishes.
pub fn optional_reference(kind: IdentifierKind) -> Attribute {
    Attribute::optional(AttributeType::String).with_validator(move |v| match v.as_str() {
        Some(s) if !s.is_empty() => parse_identifier(kind, s).map(|_| ()).map_err(|e| e.to_string()),
        _ => Ok(()),
    })
}

pub fn fully_qualified_name() -> Attribute {
    Attribute::computed(AttributeType::String)
}

pub fn comment() -> Attribute {
    Attribute::optional(AttributeType::String)
}

/// Inline service specifications and listing manifests must be YAML mappings.
pub fn validate_yaml_mapping(v: &Value) -> std::result::Result<(), String> {
    let Some(text) = v.as_str() else {
        return Ok(());
    };
    match serde_yaml::from_str::<serde_yaml::Value>(text) {
        Ok(serde_yaml::Value::Mapping(_)) => Ok(()),
        Ok(_) => Err("expected a YAML mapping".to_string()),
        Err(e) => Err(format!("invalid YAML: {e}")),
    }
}

/// `Ok(None)` when the object is gone; every other error is kept.
pub fn found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => {
            tracing::debug!("{e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub fn set_identifiers(d: &mut ResourceData, id: &impl ObjectIdentifier) {
    let fqn = id.fully_qualified_name();
    d.set_id(fqn.clone());
    d.set(FULLY_QUALIFIED_NAME, fqn);
}

/// Stores one SHOW or DESCRIBE row as a single-element list.
pub fn set_output(d: &mut ResourceData, attr: &str, row: &impl Serialize) -> Result<()> {
    let value = serde_json::to_value(row)?;
    d.set_single(attr, value);
    Ok(())
}

pub fn persist_all(d: &mut ResourceData, attrs: &[&str]) {
    for attr in attrs {
        d.persist(attr);
    }
}

fn state_id(d: &ResourceData) -> Result<&str> {
    d.id()
        .ok_or_else(|| ProviderError::Validation("resource has no id in state".to_string()))
}

pub fn account_object_id(d: &ResourceData) -> Result<AccountObjectIdentifier> {
    Ok(AccountObjectIdentifier::parse(state_id(d)?)?)
}

pub fn schema_object_id(d: &ResourceData) -> Result<SchemaObjectIdentifier> {
    Ok(SchemaObjectIdentifier::parse(state_id(d)?)?)
}

pub fn account_object_id_from_config(d: &ResourceData) -> AccountObjectIdentifier {
    AccountObjectIdentifier::new(d.get_str(NAME))
}

pub fn schema_object_id_from_config(d: &ResourceData) -> SchemaObjectIdentifier {
    SchemaObjectIdentifier::new(d.get_str(DATABASE), d.get_str(SCHEMA), d.get_str(NAME))
}

pub fn import_account_object(id: &str, d: &mut ResourceData) -> Result<()> {
    let id = AccountObjectIdentifier::parse(id)?;
    d.set(NAME, id.name());
    set_identifiers(d, &id);
    Ok(())
}

pub fn import_schema_object(id: &str, d: &mut ResourceData) -> Result<()> {
    let id = SchemaObjectIdentifier::parse(id)?;
    d.set(DATABASE, id.database_name());
    d.set(SCHEMA, id.schema_name());
    d.set(NAME, id.name());
    set_identifiers(d, &id);
    Ok(())
}

/// Warns when a suspendable object was suspended or resumed outside of the
/// provider since the last read. Must run before `show_output` is replaced.
pub fn warn_on_external_transition(d: &mut ResourceData, status_field: &str, current: &str) {
    let Some(previous) = show_output_value(d, status_field) else {
        return;
    };
    let previous = match &previous {
        Value::String(s) => LifecycleState::from_remote(s),
        _ => return,
    };
    let current = LifecycleState::from_remote(current);
    if LifecycleState::is_external_transition(previous, current) {
        let id = d.id().unwrap_or_default().to_string();
        d.warn(
            "state changed outside of the provider",
            format!("{id} went from {previous} to {current}"),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::provider::{
        data::{AttributeMap, SHOW_OUTPUT},
        schema::Schema,
    };

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(0)
                .with_attribute(DATABASE, name_part())
                .with_attribute(SCHEMA, name_part())
                .with_attribute(NAME, name_part())
                .with_attribute(FULLY_QUALIFIED_NAME, fully_qualified_name())
                .with_attribute(SHOW_OUTPUT, Attribute::output()),
        )
    }

    #[test]
    fn test_import_schema_object() {
        let mut d = ResourceData::for_import(schema(), "DB.SCH.\"svc\"");
        import_schema_object("DB.SCH.\"svc\"", &mut d).unwrap();
        assert_eq!(d.get_str(NAME), "svc");
        assert_eq!(d.get_str(FULLY_QUALIFIED_NAME), "DB.SCH.\"svc\"");
        assert_eq!(schema_object_id(&d).unwrap(), SchemaObjectIdentifier::new("DB", "SCH", "svc"));
    }

    #[test]
    fn test_external_transition_warns() {
        let state: AttributeMap = json!({"id": "P", "show_output": [{"state": "ACTIVE"}]})
            .as_object()
            .cloned()
            .unwrap();
        let mut d = ResourceData::for_read(schema(), &state);
        warn_on_external_transition(&mut d, "state", "SUSPENDED");
        assert_eq!(d.diagnostics().len(), 1);

        let mut d = ResourceData::for_read(schema(), &state);
        warn_on_external_transition(&mut d, "state", "IDLE");
        assert!(d.diagnostics().is_empty());
    }

    #[test]
    fn test_validate_yaml_mapping() {
        let spec = "spec:\n  containers:\n  - name: main\n    image: /db/sch/repo/app:latest\n";
        assert!(validate_yaml_mapping(&Value::String(spec.into())).is_ok());
        assert!(validate_yaml_mapping(&Value::String("- a\n- b\n".into())).is_err());
        assert!(validate_yaml_mapping(&Value::String("spec: [unclosed".into())).is_err());
        assert!(validate_yaml_mapping(&Value::Null).is_ok());
    }

    #[test]
    fn test_found() {
        assert_eq!(found(Ok(1)).unwrap(), Some(1));
        assert_eq!(found::<i32>(Err(ProviderError::ObjectNotFound("x".into()))).unwrap(), None);
        assert!(found::<i32>(Err(ProviderError::Transport("boom".into()))).is_err());
    }
}
