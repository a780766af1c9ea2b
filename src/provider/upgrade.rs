use crate::{error::Result, provider::data::AttributeMap};

/// Rewrites state saved under schema `version` into the layout of `version + 1`.
#[derive(Debug, Clone, Copy)]
pub struct StateUpgrader {
    pub version: u64,
    pub upgrade: fn(AttributeMap) -> Result<AttributeMap>,
}

/// Runs every upgrader from `version` on, in order.
pub fn upgrade_state(upgraders: &[StateUpgrader], version: u64, mut state: AttributeMap) -> Result<AttributeMap> {
    let mut chain: Vec<&StateUpgrader> = upgraders.iter().filter(|u| u.version >= version).collect();
    chain.sort_by_key(|u| u.version);
    for upgrader in chain {
        tracing::debug!("upgrading state from schema version {}", upgrader.version);
        state = (upgrader.upgrade)(state)?;
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn rename_a_to_b(mut state: AttributeMap) -> Result<AttributeMap> {
        if let Some(v) = state.remove("a") {
            state.insert("b".into(), v);
        }
        Ok(state)
    }

    fn rename_b_to_c(mut state: AttributeMap) -> Result<AttributeMap> {
        if let Some(v) = state.remove("b") {
            state.insert("c".into(), v);
        }
        Ok(state)
    }

    fn map(value: Value) -> AttributeMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_chain_runs_from_saved_version() {
        let upgraders = [
            StateUpgrader {
                version: 1,
                upgrade: rename_b_to_c,
            },
            StateUpgrader {
                version: 0,
                upgrade: rename_a_to_b,
            },
        ];
        assert_eq!(upgrade_state(&upgraders, 0, map(json!({"a": 1}))).unwrap(), map(json!({"c": 1})));
        assert_eq!(upgrade_state(&upgraders, 1, map(json!({"b": 1}))).unwrap(), map(json!({"c": 1})));
        assert_eq!(upgrade_state(&upgraders, 2, map(json!({"b": 1}))).unwrap(), map(json!({"b": 1})));
    }
}
