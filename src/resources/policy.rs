//! What masking and row access policies share: typed arguments, body comparison and the v0 state layout.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use similar::TextDiff;
use sqlparser::{
    dialect::SnowflakeDialect,
    tokenizer::{Token, Tokenizer, Whitespace},
};

use crate::{
    error::{ProviderError, Result},
    provider::{
        data::{AttributeMap, ResourceData},
        schema::{Attribute, AttributeType, DiffSuppressFn},
    },
    sdk::{
        datatypes::{are_the_same, is_a_change, parse_data_type},
        policies::{PolicyArgument, SignatureArgument},
    },
};

pub(crate) const ARGUMENT: &str = "argument";
pub(crate) const BODY: &str = "body";

const ARGUMENT_NAME: &str = "name";
const ARGUMENT_TYPE: &str = "type";

/// `[{name, type}, ...]`. Any change to the list replaces the policy.
pub(crate) fn argument() -> Attribute {
    Attribute::required(AttributeType::list(AttributeType::object([
        (ARGUMENT_NAME, AttributeType::String),
        (ARGUMENT_TYPE, AttributeType::String),
    ])))
    .with_force_new()
    .with_validator(validate_arguments)
    .with_diff_suppress(suppress_equivalent_arguments())
}

pub(crate) fn body() -> Attribute {
    Attribute::required(AttributeType::String)
        .with_validator(|v| match v.as_str() {
            Some(s) if s.trim().is_empty() => Err("must not be empty".to_string()),
            _ => Ok(()),
        })
        .with_diff_suppress(suppress_equivalent_bodies())
}

fn validate_arguments(v: &Value) -> std::result::Result<(), String> {
    let Some(items) = v.as_array() else {
        return Ok(());
    };
    if items.is_empty() {
        return Err("at least one argument is required".to_string());
    }
    for (i, item) in items.iter().enumerate() {
        let name = item.get(ARGUMENT_NAME).and_then(Value::as_str).unwrap_or_default();
        if name.is_empty() {
            return Err(format!("argument {i}: name must not be empty"));
        }
        let data_type = item.get(ARGUMENT_TYPE).and_then(Value::as_str).unwrap_or_default();
        parse_data_type(data_type).map_err(|e| format!("argument {i}: {e}"))?;
    }
    Ok(())
}

fn argument_parts(item: &Value) -> Option<(&str, &str)> {
    Some((
        item.get(ARGUMENT_NAME)?.as_str()?,
        item.get(ARGUMENT_TYPE)?.as_str()?,
    ))
}

/// Same count, same names (case-sensitive) and the same types once defaults are filled in.
pub(crate) fn arguments_equivalent(old: &Value, new: &Value) -> bool {
    let (Some(old), Some(new)) = (old.as_array(), new.as_array()) else {
        return false;
    };
    old.len() == new.len()
        && old.iter().zip(new).all(|(o, n)| match (argument_parts(o), argument_parts(n)) {
            (Some((old_name, old_type)), Some((new_name, new_type))) => {
                old_name == new_name && types_equivalent(old_type, new_type)
            }
            _ => false,
        })
}

pub(crate) fn types_equivalent(old: &str, new: &str) -> bool {
    match (parse_data_type(old), parse_data_type(new)) {
        (Ok(old), Ok(new)) => are_the_same(&new, &old),
        _ => old == new,
    }
}

fn suppress_equivalent_arguments() -> DiffSuppressFn {
    Arc::new(|_, old, new, _| arguments_equivalent(old, new))
}

/// For return types: equal once defaults are filled in.
pub(crate) fn suppress_equivalent_types() -> DiffSuppressFn {
    Arc::new(|_, old, new, _| match (old.as_str(), new.as_str()) {
        (Some(old), Some(new)) => types_equivalent(old, new),
        _ => false,
    })
}

pub(crate) fn policy_arguments(d: &ResourceData) -> Result<Vec<PolicyArgument>> {
    d.get_list(ARGUMENT)
        .iter()
        .map(|item| {
            let (name, data_type) = argument_parts(item)
                .ok_or_else(|| ProviderError::Validation(format!("malformed argument: {item}")))?;
            Ok(PolicyArgument::new(name, parse_data_type(data_type)?))
        })
        .collect()
}

/// The text to keep in state for a type Snowflake reports as `remote`.
///
/// State keeps its own spelling unless `remote` is a change against it: a
/// signature that leaves parameters out cannot contradict an explicit state type.
pub(crate) fn reconciled_type(state: Option<&str>, remote: &str) -> String {
    let Some(state) = state else {
        return remote.to_string();
    };
    match (parse_data_type(remote), parse_data_type(state)) {
        (Ok(remote_type), Ok(state_type)) if !is_a_change(&remote_type, &state_type) => state.to_string(),
        _ => remote.to_string(),
    }
}

/// Arguments as Snowflake reports them, spelled the way state has them where equivalent.
pub(crate) fn reconciled_arguments(state: &[Value], remote: &[SignatureArgument]) -> Value {
    let arguments = remote
        .iter()
        .enumerate()
        .map(|(i, argument)| {
            let state_type = state
                .get(i)
                .and_then(argument_parts)
                .filter(|(name, _)| *name == argument.name)
                .map(|(_, data_type)| data_type);
            json!({
                ARGUMENT_NAME: argument.name,
                ARGUMENT_TYPE: reconciled_type(state_type, &argument.data_type),
            })
        })
        .collect();
    Value::Array(arguments)
}

fn significant_tokens(body: &str) -> Option<Vec<Token>> {
    let tokens = Tokenizer::new(&SnowflakeDialect, body).tokenize().ok()?;
    Some(
        tokens
            .into_iter()
            .filter(|t| !matches!(t, Token::Whitespace(Whitespace::Space | Whitespace::Newline | Whitespace::Tab)))
            .collect(),
    )
}

fn collapse_whitespace(body: &str) -> String {
    body.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Bodies compare equal when only the whitespace between tokens differs.
pub(crate) fn bodies_equivalent(a: &str, b: &str) -> bool {
    if a.trim_end_matches('\n') == b.trim_end_matches('\n') {
        return true;
    }
    match (significant_tokens(a), significant_tokens(b)) {
        (Some(a), Some(b)) => a == b,
        _ => collapse_whitespace(a) == collapse_whitespace(b),
    }
}

fn suppress_equivalent_bodies() -> DiffSuppressFn {
    Arc::new(|_, old, new, _| match (old.as_str(), new.as_str()) {
        (Some(old), Some(new)) => bodies_equivalent(old, new),
        _ => false,
    })
}

pub(crate) fn log_body_change(id: &str, old: &str, new: &str) {
    let diff = TextDiff::from_lines(old, new);
    tracing::info!(
        "body of {id} changes:\n{}",
        diff.unified_diff().context_radius(2).header("state", "config")
    );
}

/// State keeps its body unless Snowflake's differs by more than whitespace.
pub(crate) fn reconciled_body(state: Option<&str>, remote: &str) -> String {
    match state {
        Some(state) if bodies_equivalent(state, remote) => state.to_string(),
        _ => remote.to_string(),
    }
}

fn argument_value(name: &str, data_type: &Value) -> Value {
    json!({ARGUMENT_NAME: name, ARGUMENT_TYPE: data_type})
}

/// v0 masking policies kept arguments as `signature = [{column = [{name, type}]}]`
/// and the body as `masking_expression`.
pub(crate) fn upgrade_masking_policy_v0(mut state: AttributeMap) -> Result<AttributeMap> {
    if let Some(signature) = state.remove("signature") {
        let columns = signature
            .as_array()
            .and_then(|blocks| blocks.first())
            .and_then(|block| block.get("column"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let arguments = columns
            .iter()
            .map(|column| {
                let name = column.get("name").and_then(Value::as_str).ok_or_else(|| {
                    ProviderError::Validation(format!("signature column without a name: {column}"))
                })?;
                Ok(argument_value(name, column.get("type").unwrap_or(&Value::Null)))
            })
            .collect::<Result<Vec<_>>>()?;
        state.insert(ARGUMENT.to_string(), Value::Array(arguments));
    }
    if let Some(body) = state.remove("masking_expression") {
        state.insert(BODY.to_string(), body);
    }
    Ok(state)
}

/// v0 row access policies kept arguments as a `name -> type` map and the body
/// as `row_access_expression`.
pub(crate) fn upgrade_row_access_policy_v0(mut state: AttributeMap) -> Result<AttributeMap> {
    if let Some(signature) = state.remove("signature") {
        let signature: Map<String, Value> = match signature {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ProviderError::Validation(format!(
                    "expected signature to be a map of argument types, got {other}"
                )));
            }
        };
        let arguments = signature
            .iter()
            .map(|(name, data_type)| argument_value(name, data_type))
            .collect();
        state.insert(ARGUMENT.to_string(), Value::Array(arguments));
    }
    if let Some(body) = state.remove("row_access_expression") {
        state.insert(BODY.to_string(), body);
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(value: Value) -> AttributeMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_arguments_equivalent() {
        let varchar = json!([{"name": "A", "type": "VARCHAR"}]);
        assert!(arguments_equivalent(&varchar, &json!([{"name": "A", "type": "VARCHAR(16777216)"}])));
        assert!(arguments_equivalent(&varchar, &json!([{"name": "A", "type": "string"}])));
        assert!(!arguments_equivalent(&varchar, &json!([{"name": "A", "type": "VARCHAR(100)"}])));
        assert!(!arguments_equivalent(&varchar, &json!([{"name": "a", "type": "VARCHAR"}])));
        assert!(!arguments_equivalent(&varchar, &json!([{"name": "A", "type": "NUMBER"}])));
        assert!(!arguments_equivalent(
            &varchar,
            &json!([{"name": "A", "type": "VARCHAR"}, {"name": "B", "type": "NUMBER"}])
        ));
    }

    #[test]
    fn test_reconciled_type() {
        // A remote signature without parameters cannot contradict state.
        assert_eq!(reconciled_type(Some("VARCHAR(100)"), "VARCHAR"), "VARCHAR(100)");
        assert_eq!(reconciled_type(Some("VARCHAR"), "VARCHAR(16777216)"), "VARCHAR");
        assert_eq!(reconciled_type(Some("VARCHAR"), "VARCHAR(100)"), "VARCHAR(100)");
        assert_eq!(reconciled_type(Some("NUMBER"), "VARCHAR"), "VARCHAR");
        assert_eq!(reconciled_type(None, "NUMBER(38,0)"), "NUMBER(38,0)");
    }

    #[test]
    fn test_reconciled_arguments_follow_remote_names() {
        let state = vec![json!({"name": "A", "type": "VARCHAR"})];
        let remote = vec![
            SignatureArgument {
                name: "A".into(),
                data_type: "VARCHAR(16777216)".into(),
            },
            SignatureArgument {
                name: "B".into(),
                data_type: "NUMBER(38,0)".into(),
            },
        ];
        assert_eq!(
            reconciled_arguments(&state, &remote),
            json!([{"name": "A", "type": "VARCHAR"}, {"name": "B", "type": "NUMBER(38,0)"}])
        );
    }

    #[test]
    fn test_bodies_equivalent() {
        let config = "case\n  when current_role() in ('ANALYST') then true\n  else false\nend";
        let remote = "case when current_role() in ('ANALYST')\n\tthen true else false end";
        assert!(bodies_equivalent(config, remote));
        assert!(bodies_equivalent("'***'\n", "'***'"));
        assert!(!bodies_equivalent("'***'", "'###'"));
        assert!(!bodies_equivalent(
            "case when current_role() in ('ANALYST') then true else false end",
            "case when current_role() in ('ADMIN') then true else false end"
        ));
    }

    #[test]
    fn test_reconciled_body() {
        assert_eq!(reconciled_body(Some("val\n"), "val"), "val\n");
        assert_eq!(reconciled_body(Some("val"), "'***'"), "'***'");
        assert_eq!(reconciled_body(None, "'***'"), "'***'");
    }

    #[test]
    fn test_upgrade_masking_policy_v0() {
        let state = map(json!({
            "id": "DB.SCH.P",
            "signature": [{"column": [{"name": "VAL", "type": "VARCHAR"}, {"name": "N", "type": "NUMBER"}]}],
            "masking_expression": "'***'",
        }));
        let upgraded = upgrade_masking_policy_v0(state).unwrap();
        assert_eq!(
            upgraded["argument"],
            json!([{"name": "VAL", "type": "VARCHAR"}, {"name": "N", "type": "NUMBER"}])
        );
        assert_eq!(upgraded["body"], "'***'");
        assert!(!upgraded.contains_key("signature"));
        assert_eq!(upgrade_masking_policy_v0(upgraded.clone()).unwrap(), upgraded);
    }

    #[test]
    fn test_upgrade_row_access_policy_v0() {
        let state = map(json!({
            "id": "DB.SCH.P",
            "signature": {"REGION": "VARCHAR"},
            "row_access_expression": "true",
        }));
        let upgraded = upgrade_row_access_policy_v0(state).unwrap();
        assert_eq!(upgraded["argument"], json!([{"name": "REGION", "type": "VARCHAR"}]));
        assert_eq!(upgraded["body"], "true");
        assert_eq!(upgrade_row_access_policy_v0(upgraded.clone()).unwrap(), upgraded);

        let malformed = map(json!({"signature": "REGION VARCHAR"}));
        assert!(upgrade_row_access_policy_v0(malformed).is_err());
    }

    #[test]
    fn test_validate_arguments() {
        assert!(validate_arguments(&json!([{"name": "A", "type": "VARCHAR(10)"}])).is_ok());
        assert!(validate_arguments(&json!([])).is_err());
        assert!(validate_arguments(&json!([{"name": "", "type": "VARCHAR"}])).is_err());
        assert!(validate_arguments(&json!([{"name": "A", "type": "NOT A TYPE"}])).is_err());
    }
}
