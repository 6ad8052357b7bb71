//! Bidirectional dependency lookup derived once from a [`ModuleCatalog`].
//!
//! Nodes live in an arena indexed by catalog position. Forward edges are the
//! declared dependencies; reverse edges (dependents) are computed by inverting
//! the catalog at construction and never recomputed afterwards.

use std::collections::{BTreeSet, HashMap, VecDeque};

use super::catalog::{CatalogError, ModuleCatalog};
use super::domain::ModuleId;

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    ids: Vec<ModuleId>,
    index: HashMap<ModuleId, usize>,
    dependencies: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitMark {
    Unvisited,
    Visiting,
    Done,
}

impl DependencyGraph {
    /// Builds the graph, rejecting dangling references and cycles.
    pub fn build(catalog: &ModuleCatalog) -> Result<Self, CatalogError> {
        let ids: Vec<ModuleId> = catalog
            .modules()
            .iter()
            .map(|module| module.id.clone())
            .collect();
        let index: HashMap<ModuleId, usize> = ids
            .iter()
            .enumerate()
            .map(|(position, id)| (id.clone(), position))
            .collect();

        let mut dependencies = Vec::with_capacity(ids.len());
        let mut dependents = vec![Vec::new(); ids.len()];

        for (position, module) in catalog.modules().iter().enumerate() {
            let mut edges = Vec::with_capacity(module.dependencies.len());
            for dependency in &module.dependencies {
                let target = index.get(dependency).copied().ok_or_else(|| {
                    CatalogError::UnknownDependency {
                        module: module.id.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                edges.push(target);
                dependents[target].push(position);
            }
            dependencies.push(edges);
        }

        let graph = Self {
            ids,
            index,
            dependencies,
            dependents,
        };

        if let Some(cycle) = graph.find_cycle() {
            return Err(CatalogError::CyclicDependency { cycle });
        }

        Ok(graph)
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.index.contains_key(id)
    }

    /// Direct dependencies in declared order; empty for unknown ids.
    pub fn dependencies_of(&self, id: &ModuleId) -> Vec<&ModuleId> {
        self.neighbours(id, &self.dependencies)
    }

    /// Modules that declare `id` as a direct dependency, in catalog order.
    pub fn dependents_of(&self, id: &ModuleId) -> Vec<&ModuleId> {
        self.neighbours(id, &self.dependents)
    }

    /// Every module reachable by following dependencies from `id`, excluding `id`.
    pub fn dependency_closure(&self, id: &ModuleId) -> BTreeSet<ModuleId> {
        self.closure(id, &self.dependencies)
    }

    /// Every module that directly or transitively depends on `id`, excluding `id`.
    pub fn dependent_closure(&self, id: &ModuleId) -> BTreeSet<ModuleId> {
        self.closure(id, &self.dependents)
    }

    /// All ids with each dependency ahead of its dependents; ties keep catalog order.
    pub fn activation_order(&self) -> Vec<&ModuleId> {
        let mut remaining: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut emitted = vec![false; self.ids.len()];
        let mut order = Vec::with_capacity(self.ids.len());

        while order.len() < self.ids.len() {
            let ready = (0..self.ids.len()).find(|&node| !emitted[node] && remaining[node] == 0);
            let Some(next) = ready else {
                break;
            };
            emitted[next] = true;
            order.push(&self.ids[next]);
            for &dependent in &self.dependents[next] {
                remaining[dependent] -= 1;
            }
        }

        order
    }

    fn neighbours<'a>(&'a self, id: &ModuleId, edges: &[Vec<usize>]) -> Vec<&'a ModuleId> {
        self.index
            .get(id)
            .map(|&node| edges[node].iter().map(|&next| &self.ids[next]).collect())
            .unwrap_or_default()
    }

    fn closure(&self, id: &ModuleId, edges: &[Vec<usize>]) -> BTreeSet<ModuleId> {
        let mut reached = BTreeSet::new();
        let Some(&start) = self.index.get(id) else {
            return reached;
        };

        let mut seen = vec![false; self.ids.len()];
        seen[start] = true;
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for &next in &edges[node] {
                if !seen[next] {
                    seen[next] = true;
                    reached.insert(self.ids[next].clone());
                    queue.push_back(next);
                }
            }
        }

        reached
    }

    fn find_cycle(&self) -> Option<Vec<ModuleId>> {
        let mut marks = vec![VisitMark::Unvisited; self.ids.len()];
        let mut path = Vec::new();

        for node in 0..self.ids.len() {
            if marks[node] == VisitMark::Unvisited {
                if let Some(cycle) = self.visit(node, &mut marks, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }

    fn visit(
        &self,
        node: usize,
        marks: &mut [VisitMark],
        path: &mut Vec<usize>,
    ) -> Option<Vec<ModuleId>> {
        marks[node] = VisitMark::Visiting;
        path.push(node);

        for &next in &self.dependencies[node] {
            match marks[next] {
                VisitMark::Visiting => {
                    let start = path.iter().position(|&entry| entry == next).unwrap_or(0);
                    let mut cycle: Vec<ModuleId> =
                        path[start..].iter().map(|&entry| self.ids[entry].clone()).collect();
                    cycle.push(self.ids[next].clone());
                    return Some(cycle);
                }
                VisitMark::Unvisited => {
                    if let Some(cycle) = self.visit(next, marks, path) {
                        return Some(cycle);
                    }
                }
                VisitMark::Done => {}
            }
        }

        path.pop();
        marks[node] = VisitMark::Done;
        None
    }
}
