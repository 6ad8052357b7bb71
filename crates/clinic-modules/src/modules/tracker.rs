use serde::Serialize;

use super::domain::{ActivationSet, ModuleId};

/// Whether the working set differs from the persisted baseline.
pub fn has_changes(working: &ActivationSet, persisted: &ActivationSet) -> bool {
    working != persisted
}

/// Fresh copy of the baseline to replace the working set on cancel.
pub fn revert(persisted: &ActivationSet) -> ActivationSet {
    persisted.clone()
}

/// Modules a save would switch on and off, both sorted.
pub fn diff(working: &ActivationSet, persisted: &ActivationSet) -> ChangeSummary {
    ChangeSummary {
        enabled: working.difference(persisted).cloned().collect(),
        disabled: persisted.difference(working).cloned().collect(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub enabled: Vec<ModuleId>,
    pub disabled: Vec<ModuleId>,
}

impl ChangeSummary {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty() && self.disabled.is_empty()
    }
}
