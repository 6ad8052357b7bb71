use serde::{Deserialize, Serialize};
use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

/// Stable identifier of a product module, used as the graph key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub String);

impl ModuleId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ModuleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Tenant (clinic) whose module configuration is being edited.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One optional product capability as declared by the module registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub id: ModuleId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub dependencies: Vec<ModuleId>,
}

impl ModuleDefinition {
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: ModuleId::from(id),
            name: name.to_string(),
            description: description.to_string(),
            required: false,
            dependencies: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.dependencies.extend(ids.iter().map(|id| ModuleId::from(*id)));
        self
    }

    /// Falls back to the id when the registry did not supply a display name.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// Set of module ids enabled for one tenant at a point in time.
///
/// Iteration is always in sorted id order, which is also the order sent to the
/// persistence gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivationSet(BTreeSet<ModuleId>);

impl ActivationSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, ModuleId> {
        self.0.iter()
    }

    pub fn to_sorted_vec(&self) -> Vec<ModuleId> {
        self.0.iter().cloned().collect()
    }

    /// Returns a new set with `id` added.
    pub fn with(&self, id: ModuleId) -> Self {
        let mut next = self.0.clone();
        next.insert(id);
        Self(next)
    }

    /// Returns a new set with `id` removed.
    pub fn without(&self, id: &ModuleId) -> Self {
        let mut next = self.0.clone();
        next.remove(id);
        Self(next)
    }

    pub fn difference<'a>(
        &'a self,
        other: &'a ActivationSet,
    ) -> impl Iterator<Item = &'a ModuleId> {
        self.0.difference(&other.0)
    }

    pub(crate) fn insert(&mut self, id: ModuleId) -> bool {
        self.0.insert(id)
    }

    pub(crate) fn remove(&mut self, id: &ModuleId) -> bool {
        self.0.remove(id)
    }
}

impl FromIterator<ModuleId> for ActivationSet {
    fn from_iter<I: IntoIterator<Item = ModuleId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for ActivationSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(ModuleId::from).collect())
    }
}

impl<'a> IntoIterator for &'a ActivationSet {
    type Item = &'a ModuleId;
    type IntoIter = btree_set::Iter<'a, ModuleId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for ActivationSet {
    type Item = ModuleId;
    type IntoIter = btree_set::IntoIter<ModuleId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
