use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider::data::{AttributeMap, ResourceData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    Noop,
    Create,
    Update,
    Replace,
    Delete,
}

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub path: String,
    pub before: Option<Value>,
    /// `None` when the value is only known after apply.
    pub after: Option<Value>,
    pub requires_replace: bool,
}

impl AttributeChange {
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        AttributeChange {
            path: path.into(),
            before: Some(before),
            after: Some(after),
            requires_replace: false,
        }
    }

    pub fn known_after_apply(path: impl Into<String>, before: Option<Value>) -> Self {
        AttributeChange {
            path: path.into(),
            before,
            after: None,
            requires_replace: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub action: PlanAction,
    pub planned_state: Option<AttributeMap>,
    pub changes: Vec<AttributeChange>,
    /// Attributes whose change forces destroy-then-create.
    pub replace_reasons: Vec<String>,
}

impl PlanResult {
    pub fn no_change(state: AttributeMap) -> Self {
        PlanResult {
            action: PlanAction::Noop,
            planned_state: Some(state),
            changes: Vec::new(),
            replace_reasons: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.action == PlanAction::Noop
    }

    pub fn requires_replace(&self) -> bool {
        self.action == PlanAction::Replace
    }
}

/// Every configurable attribute that changes, plus the extra paths a
/// custom diff flagged. Sorted into update or replace.
pub fn diff_resource(d: &ResourceData, supports_update: bool, custom: &CustomDiff) -> PlanResult {
    let mut changes = Vec::new();
    let mut replace_reasons = Vec::new();

    for (name, attr) in &d.schema().attributes {
        if !attr.is_configurable() || !d.has_change(name) {
            continue;
        }
        let (before, after) = d.get_change(name);
        let mut change = AttributeChange::modified(name.clone(), before, after);
        if attr.force_new || custom.force_new.iter().any(|f| f == name) || !supports_update {
            change.requires_replace = true;
            replace_reasons.push(name.clone());
        }
        changes.push(change);
    }

    let mut planned = d.state().clone();
    if !changes.is_empty() {
        for computed in &custom.new_computed {
            let before = planned.remove(computed);
            changes.push(AttributeChange::known_after_apply(computed.clone(), before));
        }
    }

    let action = if changes.is_empty() {
        PlanAction::Noop
    } else if !replace_reasons.is_empty() {
        PlanAction::Replace
    } else {
        PlanAction::Update
    };

    PlanResult {
        action,
        planned_state: Some(planned),
        changes,
        replace_reasons,
    }
}

/// What a kind's custom diff hook adds to the plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomDiff {
    pub force_new: Vec<String>,
    /// Computed attributes that become unknown when anything else changes.
    pub new_computed: Vec<String>,
}

impl CustomDiff {
    pub fn force_new(&mut self, attr: impl Into<String>) {
        self.force_new.push(attr.into());
    }

    pub fn set_new_computed(&mut self, attr: impl Into<String>) {
        self.new_computed.push(attr.into());
    }
}
