use serde::Serialize;
use tracing::{debug, error, info};

use super::catalog::{CatalogError, ModuleCatalog};
use super::domain::{ActivationSet, ModuleId};
use super::graph::DependencyGraph;

/// Computes cascaded activation sets and validates candidate configurations.
///
/// The graph is derived once from the catalog; only activation sets change
/// between calls. Every operation is pure with respect to its inputs.
#[derive(Debug, Clone)]
pub struct ActivationEngine {
    catalog: ModuleCatalog,
    graph: DependencyGraph,
}

impl ActivationEngine {
    pub fn new(catalog: ModuleCatalog) -> Result<Self, CatalogError> {
        match DependencyGraph::build(&catalog) {
            Ok(graph) => {
                info!(modules = catalog.len(), "module dependency graph ready");
                Ok(Self { catalog, graph })
            }
            Err(err) => {
                error!(error = %err, "rejecting module catalog");
                Err(err)
            }
        }
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn is_required(&self, id: &ModuleId) -> bool {
        self.catalog.get(id).is_some_and(|module| module.required)
    }

    /// Required modules together with everything they depend on.
    pub fn baseline(&self) -> ActivationSet {
        let mut baseline = ActivationSet::new();
        for id in self.catalog.required_ids() {
            baseline.insert(id.clone());
            for dependency in self.graph.dependency_closure(id) {
                baseline.insert(dependency);
            }
        }
        baseline
    }

    /// Applies one toggle and returns the cascaded set. Refused toggles return
    /// `current` unchanged.
    pub fn toggle(
        &self,
        current: &ActivationSet,
        target: &ModuleId,
        enable: bool,
    ) -> ActivationSet {
        self.preview(current, target, enable).next
    }

    /// Same as [`ActivationEngine::toggle`], also reporting what cascaded and why a
    /// toggle was refused.
    pub fn preview(
        &self,
        current: &ActivationSet,
        target: &ModuleId,
        enable: bool,
    ) -> ToggleOutcome {
        let module = match self.catalog.get(target) {
            Some(module) => module,
            None if enable => {
                return ToggleOutcome::refused(
                    current,
                    ToggleRefusal::UnknownModule {
                        module: target.clone(),
                    },
                );
            }
            None => {
                // Ids retired from the catalog have no dependents to cascade.
                debug!(module = %target, "dropping module missing from catalog");
                return ToggleOutcome::between(current, current.without(target));
            }
        };

        let outcome = if enable {
            let mut next = current.clone();
            next.insert(target.clone());
            for dependency in self.graph.dependency_closure(target) {
                next.insert(dependency);
            }
            for id in self.baseline() {
                next.insert(id);
            }
            ToggleOutcome::between(current, next)
        } else {
            if module.required {
                return ToggleOutcome::refused(
                    current,
                    ToggleRefusal::RequiredModule {
                        module: target.clone(),
                    },
                );
            }

            // Catalog construction guarantees no required module sits in this closure.
            let cascade = self.graph.dependent_closure(target);
            let mut next = current.clone();
            next.remove(target);
            for dependent in &cascade {
                next.remove(dependent);
            }
            ToggleOutcome::between(current, next)
        };

        debug!(
            module = %target,
            enable,
            enabled = outcome.enabled.len(),
            disabled = outcome.disabled.len(),
            "computed module toggle"
        );
        outcome
    }

    /// Checks required-module and dependency constraints, reporting every
    /// violation in catalog order.
    pub fn validate(&self, candidate: &ActivationSet) -> ValidationResult {
        let mut violations = Vec::new();

        for id in self.catalog.required_ids() {
            if !candidate.contains(id) {
                violations.push(Violation::MissingRequired { module: id.clone() });
            }
        }

        for module in self.catalog.modules() {
            if !candidate.contains(&module.id) {
                continue;
            }
            let missing: Vec<ModuleId> = self
                .graph
                .dependencies_of(&module.id)
                .into_iter()
                .filter(|dependency| !candidate.contains(dependency))
                .cloned()
                .collect();
            if !missing.is_empty() {
                violations.push(Violation::MissingDependencies {
                    module: module.id.clone(),
                    missing,
                });
            }
        }

        for id in candidate {
            if !self.graph.contains(id) {
                violations.push(Violation::UnknownModule { module: id.clone() });
            }
        }

        ValidationResult::from_violations(violations)
    }

    /// Per-module view for the configuration screen, in catalog order.
    pub fn module_states(&self, active: &ActivationSet) -> Vec<ModuleStateView> {
        self.catalog
            .modules()
            .iter()
            .map(|module| {
                let is_active = active.contains(&module.id);
                ModuleStateView {
                    id: module.id.clone(),
                    name: module.display_name().to_string(),
                    description: module.description.clone(),
                    required: module.required,
                    active: is_active,
                    dependencies: self
                        .graph
                        .dependencies_of(&module.id)
                        .into_iter()
                        .cloned()
                        .collect(),
                    dependents: self
                        .graph
                        .dependents_of(&module.id)
                        .into_iter()
                        .cloned()
                        .collect(),
                    can_enable: !is_active,
                    can_disable: is_active && !module.required,
                }
            })
            .collect()
    }
}

/// Result of one toggle: the next set plus the cascade that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub next: ActivationSet,
    pub enabled: Vec<ModuleId>,
    pub disabled: Vec<ModuleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal: Option<ToggleRefusal>,
}

impl ToggleOutcome {
    fn between(current: &ActivationSet, next: ActivationSet) -> Self {
        let enabled = next.difference(current).cloned().collect();
        let disabled = current.difference(&next).cloned().collect();
        Self {
            next,
            enabled,
            disabled,
            refusal: None,
        }
    }

    fn refused(current: &ActivationSet, refusal: ToggleRefusal) -> Self {
        Self {
            next: current.clone(),
            enabled: Vec::new(),
            disabled: Vec::new(),
            refusal: Some(refusal),
        }
    }

    pub fn changed(&self) -> bool {
        !self.enabled.is_empty() || !self.disabled.is_empty()
    }
}

/// Why a toggle left the activation set untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ToggleRefusal {
    #[error("module '{module}' is required and cannot be disabled")]
    RequiredModule { module: ModuleId },
    #[error("module '{module}' is not part of the catalog")]
    UnknownModule { module: ModuleId },
}

/// One broken constraint in a candidate activation set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    MissingRequired {
        module: ModuleId,
    },
    MissingDependencies {
        module: ModuleId,
        missing: Vec<ModuleId>,
    },
    UnknownModule {
        module: ModuleId,
    },
}

impl Violation {
    pub fn message(&self) -> String {
        match self {
            Violation::MissingRequired { module } => {
                format!("required module '{module}' must be active")
            }
            Violation::MissingDependencies { module, missing } => {
                let missing = missing
                    .iter()
                    .map(ModuleId::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("module '{module}' requires inactive modules: {missing}")
            }
            Violation::UnknownModule { module } => {
                format!("module '{module}' is not part of the catalog")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(Violation::message).collect()
    }
}

/// Presentation-ready state of one module for a given activation set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleStateView {
    pub id: ModuleId,
    pub name: String,
    pub description: String,
    pub required: bool,
    pub active: bool,
    pub dependencies: Vec<ModuleId>,
    pub dependents: Vec<ModuleId>,
    pub can_enable: bool,
    pub can_disable: bool,
}
