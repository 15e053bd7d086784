// src/graph.rs

//! Package dependency graph for install ordering
//!
//! Edges point from a package to the packages it requires (required and
//! optional alike). The graph is expected to be a DAG; [`DependencyGraph::topological_sort`]
//! returns leaves first and reports a cycle, by package name, as a resolution
//! error.
//!
//! # Example
//!
//! ```ignore
//! let graph = DependencyGraph::from_registry(&registry);
//! for id in graph.topological_sort()? {
//!     // every dependency of `id` has already been visited
//! }
//! ```

use crate::error::{Error, Result};
use crate::package::PackageId;
use crate::registry::PackageRegistry;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Directed graph of package requirements
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// package -> packages it depends on
    edges: BTreeMap<PackageId, BTreeSet<PackageId>>,
    /// package -> packages that depend on it
    reverse_edges: BTreeMap<PackageId, BTreeSet<PackageId>>,
    /// Display names for error messages
    names: BTreeMap<PackageId, String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from every declared package in a registry
    pub fn from_registry(registry: &PackageRegistry) -> Self {
        let mut graph = Self::new();
        for package in registry.iter() {
            let deps: Vec<PackageId> = package
                .dependencies
                .as_ref()
                .map(|set| set.all().collect())
                .unwrap_or_default();
            graph.add_package(package.id, &deps);
            graph.set_name(package.id, &package.spec.name);
        }
        graph
    }

    fn set_name(&mut self, id: PackageId, name: &str) {
        self.names.insert(id, name.to_string());
    }

    fn name(&self, id: PackageId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("#{}", id.index()))
    }

    /// Add a package with its dependencies, merging with existing edges
    pub fn add_package(&mut self, id: PackageId, dependencies: &[PackageId]) {
        self.edges.entry(id).or_default();
        self.reverse_edges.entry(id).or_default();

        for &dep in dependencies {
            self.edges.entry(dep).or_default();
            self.reverse_edges.entry(dep).or_default().insert(id);
            self.edges.entry(id).or_default().insert(dep);
        }
    }

    /// Kahn's algorithm; dependencies come before their dependents
    ///
    /// Ties are broken by package id so the order is stable across runs.
    pub fn topological_sort(&self) -> Result<Vec<PackageId>> {
        let mut in_degrees: BTreeMap<PackageId, usize> = self
            .edges
            .iter()
            .map(|(id, deps)| (*id, deps.len()))
            .collect();
        let mut result = Vec::with_capacity(self.edges.len());

        let mut queue: VecDeque<PackageId> = in_degrees
            .iter()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(id, _)| *id)
            .collect();

        while let Some(node) = queue.pop_front() {
            result.push(node);

            if let Some(dependents) = self.reverse_edges.get(&node) {
                for dependent in dependents {
                    if let Some(deg) = in_degrees.get_mut(dependent) {
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            queue.push_back(*dependent);
                        }
                    }
                }
            }
        }

        if result.len() != self.edges.len() {
            let cycles: Vec<String> = self
                .find_cycles()
                .iter()
                .map(|cycle| {
                    let mut names: Vec<String> = cycle.iter().map(|&id| self.name(id)).collect();
                    names.push(self.name(cycle[0]));
                    names.join(" -> ")
                })
                .collect();

            return Err(Error::ResolutionError(format!(
                "Circular dependency detected: {}",
                cycles.join("; ")
            )));
        }

        Ok(result)
    }

    /// Find cycles with a depth-first walk
    fn find_cycles(&self) -> Vec<Vec<PackageId>> {
        let mut cycles = Vec::new();
        let mut visited = BTreeSet::new();
        let mut on_stack = BTreeSet::new();
        let mut path = Vec::new();

        for &start in self.edges.keys() {
            if !visited.contains(&start) {
                self.find_cycles_dfs(start, &mut visited, &mut on_stack, &mut path, &mut cycles);
            }
        }

        cycles
    }

    fn find_cycles_dfs(
        &self,
        node: PackageId,
        visited: &mut BTreeSet<PackageId>,
        on_stack: &mut BTreeSet<PackageId>,
        path: &mut Vec<PackageId>,
        cycles: &mut Vec<Vec<PackageId>>,
    ) {
        visited.insert(node);
        on_stack.insert(node);
        path.push(node);

        if let Some(deps) = self.edges.get(&node) {
            for &dep in deps {
                if !visited.contains(&dep) {
                    self.find_cycles_dfs(dep, visited, on_stack, path, cycles);
                } else if on_stack.contains(&dep) {
                    if let Some(start) = path.iter().position(|&x| x == dep) {
                        cycles.push(path[start..].to_vec());
                    }
                }
            }
        }

        path.pop();
        on_stack.remove(&node);
    }

    /// Everything `id` depends on, directly or not
    pub fn transitive_dependencies(&self, id: PackageId) -> BTreeSet<PackageId> {
        let mut deps = BTreeSet::new();
        let mut queue: VecDeque<PackageId> = self
            .edges
            .get(&id)
            .map(|d| d.iter().copied().collect())
            .unwrap_or_default();

        while let Some(dep) = queue.pop_front() {
            if deps.insert(dep) {
                if let Some(indirect) = self.edges.get(&dep) {
                    queue.extend(indirect.iter().filter(|i| !deps.contains(i)));
                }
            }
        }

        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: usize) -> PackageId {
        PackageId(n)
    }

    #[test]
    fn test_leaves_first() {
        // moab(0) -> mpi(1), blaslapack(2); hdf5(3) -> mpi(1)
        let mut graph = DependencyGraph::new();
        graph.add_package(id(0), &[id(1), id(2), id(3)]);
        graph.add_package(id(3), &[id(1)]);
        graph.add_package(id(1), &[]);
        graph.add_package(id(2), &[]);

        let order = graph.topological_sort().unwrap();
        let pos = |n: usize| order.iter().position(|&x| x == id(n)).unwrap();

        assert_eq!(order.len(), 4);
        assert!(pos(1) < pos(3));
        assert!(pos(3) < pos(0));
        assert!(pos(2) < pos(0));
        assert_eq!(order.last(), Some(&id(0)));
    }

    #[test]
    fn test_order_is_stable() {
        let mut graph = DependencyGraph::new();
        graph.add_package(id(0), &[id(3), id(1), id(2)]);
        assert_eq!(
            graph.topological_sort().unwrap(),
            vec![id(1), id(2), id(3), id(0)]
        );
    }

    #[test]
    fn test_cycle_is_an_error() {
        let mut graph = DependencyGraph::new();
        graph.add_package(id(0), &[id(1)]);
        graph.add_package(id(1), &[id(2)]);
        graph.add_package(id(2), &[id(0)]);
        graph.add_package(id(3), &[]);
        graph.set_name(id(0), "MOAB");
        graph.set_name(id(1), "HDF5");
        graph.set_name(id(2), "NetCDF");
        graph.set_name(id(3), "MPI");

        let err = graph.topological_sort().unwrap_err();
        assert!(matches!(err, Error::ResolutionError(_)));
        assert!(
            err.to_string().contains("MOAB -> HDF5 -> NetCDF -> MOAB"),
            "{err}"
        );
        assert!(!err.to_string().contains("MPI"));
    }

    #[test]
    fn test_transitive_dependencies() {
        let mut graph = DependencyGraph::new();
        graph.add_package(id(0), &[id(1)]);
        graph.add_package(id(1), &[id(2)]);
        graph.add_package(id(3), &[]);

        let deps = graph.transitive_dependencies(id(0));
        assert!(deps.contains(&id(1)));
        assert!(deps.contains(&id(2)));
        assert!(!deps.contains(&id(3)));
    }
}
