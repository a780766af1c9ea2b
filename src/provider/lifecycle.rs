use std::fmt;

/// Running state of a suspendable object (compute pools, services).
///
/// The provider only ever moves an object out of `Initial` (create) and into
/// `Gone` (drop). `Running` and `Suspended` flip outside of it and show up as
/// drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Initial,
    Running,
    Suspended,
    Gone,
}

impl LifecycleState {
    pub fn after_create(initially_suspended: bool) -> Self {
        if initially_suspended {
            LifecycleState::Suspended
        } else {
            LifecycleState::Running
        }
    }

    /// From the `state`/`status` column of SHOW. Anything not suspended counts as running.
    pub fn from_remote(status: &str) -> Self {
        match status.to_uppercase().as_str() {
            "SUSPENDED" | "SUSPENDING" => LifecycleState::Suspended,
            "DELETED" | "DELETING" => LifecycleState::Gone,
            _ => LifecycleState::Running,
        }
    }

    pub fn after_drop(self) -> Self {
        LifecycleState::Gone
    }

    /// A flip the provider never issues itself.
    pub fn is_external_transition(from: LifecycleState, to: LifecycleState) -> bool {
        matches!(
            (from, to),
            (LifecycleState::Running, LifecycleState::Suspended) | (LifecycleState::Suspended, LifecycleState::Running)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Initial => "initial",
            LifecycleState::Running => "running",
            LifecycleState::Suspended => "suspended",
            LifecycleState::Gone => "gone",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert_eq!(LifecycleState::after_create(false), LifecycleState::Running);
        assert_eq!(LifecycleState::after_create(true), LifecycleState::Suspended);
        assert_eq!(LifecycleState::Running.after_drop(), LifecycleState::Gone);
        assert_eq!(LifecycleState::Suspended.after_drop(), LifecycleState::Gone);
    }

    #[test]
    fn test_from_remote() {
        assert_eq!(LifecycleState::from_remote("ACTIVE"), LifecycleState::Running);
        assert_eq!(LifecycleState::from_remote("IDLE"), LifecycleState::Running);
        assert_eq!(LifecycleState::from_remote("STARTING"), LifecycleState::Running);
        assert_eq!(LifecycleState::from_remote("suspended"), LifecycleState::Suspended);
    }

    #[test]
    fn test_external_transitions() {
        assert!(LifecycleState::is_external_transition(
            LifecycleState::Running,
            LifecycleState::Suspended
        ));
        assert!(LifecycleState::is_external_transition(
            LifecycleState::Suspended,
            LifecycleState::Running
        ));
        assert!(!LifecycleState::is_external_transition(
            LifecycleState::Initial,
            LifecycleState::Running
        ));
        assert!(!LifecycleState::is_external_transition(
            LifecycleState::Running,
            LifecycleState::Running
        ));
    }
}
