// src/registry.rs

//! Per-run package registry
//!
//! The registry owns every [`Package`] instance of one configure run. Packages
//! are stored in an arena and addressed by [`PackageId`]; a key is
//! instantiated at most once, so two recipes requiring `mpi` share the same
//! instance. New instances are created from the [`Catalog`].

use crate::error::{Error, Result};
use crate::package::{
    Catalog, DependencySet, Package, PackageId, PackageState, Requirer,
};
use std::collections::HashMap;
use tracing::debug;

/// Arena of packages for one configure run
#[derive(Debug)]
pub struct PackageRegistry {
    catalog: Catalog,
    packages: Vec<Package>,
    by_key: HashMap<String, PackageId>,
}

impl PackageRegistry {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            packages: Vec::new(),
            by_key: HashMap::new(),
        }
    }

    /// Registry backed by the built-in package catalog
    pub fn with_builtins() -> Self {
        Self::new(Catalog::with_builtins())
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get the package for `key`, instantiating it on first request
    pub fn require(&mut self, key: &str) -> Result<PackageId> {
        let key = key.to_lowercase();
        if let Some(&id) = self.by_key.get(&key) {
            return Ok(id);
        }

        let recipe = self.catalog.create(&key)?;
        let id = PackageId(self.packages.len());
        let package = Package::new(id, recipe);
        debug!("Registered package {} as #{}", package.name(), id.index());

        self.by_key.insert(key, id);
        self.packages.push(package);
        Ok(id)
    }

    /// Run a package's dependency declaration and record the result
    ///
    /// Declaring again re-runs the recipe; since `require` deduplicates, the
    /// resulting set has the same members in the same order.
    pub fn declare(&mut self, id: PackageId) -> Result<DependencySet> {
        let recipe = self.get(id)?.recipe().clone();
        let dependencies = {
            let mut requirer = Requirer::new(self, id);
            recipe.setup_dependencies(&mut requirer)?
        };

        let package = self.get_mut(id)?;
        package.advance(PackageState::DependenciesDeclared)?;
        package.dependencies = Some(dependencies.clone());
        Ok(dependencies)
    }

    /// Declare every package until no undeclared package remains
    ///
    /// Declaring can register new packages, so this loops to a fixpoint.
    pub fn declare_all(&mut self) -> Result<()> {
        let mut next = 0;
        while next < self.packages.len() {
            let id = PackageId(next);
            if self.packages[next].state == PackageState::Unconfigured {
                self.declare(id)?;
            }
            next += 1;
        }
        Ok(())
    }

    pub fn get(&self, id: PackageId) -> Result<&Package> {
        self.packages
            .get(id.index())
            .ok_or_else(|| Error::UnknownPackage(format!("#{}", id.index())))
    }

    pub fn get_mut(&mut self, id: PackageId) -> Result<&mut Package> {
        self.packages
            .get_mut(id.index())
            .ok_or_else(|| Error::UnknownPackage(format!("#{}", id.index())))
    }

    pub fn id_of(&self, key: &str) -> Option<PackageId> {
        self.by_key.get(&key.to_lowercase()).copied()
    }

    pub fn by_key(&self, key: &str) -> Option<&Package> {
        self.id_of(key).and_then(|id| self.packages.get(id.index()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_twice_returns_same_id() {
        let mut registry = PackageRegistry::with_builtins();
        let first = registry.require("mpi").unwrap();
        let size = registry.len();
        let second = registry.require("MPI").unwrap();

        assert_eq!(first, second);
        assert_eq!(registry.len(), size);
    }

    #[test]
    fn test_require_unknown_key() {
        let mut registry = PackageRegistry::with_builtins();
        let err = registry.require("no-such-package").unwrap_err();
        assert!(matches!(err, Error::UnknownPackage(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_declare_is_idempotent() {
        let mut registry = PackageRegistry::with_builtins();
        let moab = registry.require("moab").unwrap();

        let first = registry.declare(moab).unwrap();
        let size = registry.len();
        let second = registry.declare(moab).unwrap();

        assert_eq!(first, second);
        assert_eq!(registry.len(), size);
        assert_eq!(
            registry.get(moab).unwrap().state,
            PackageState::DependenciesDeclared
        );
    }

    #[test]
    fn test_shared_dependency_is_one_instance() {
        let mut registry = PackageRegistry::with_builtins();
        let moab = registry.require("moab").unwrap();
        let scalapack = registry.require("scalapack").unwrap();
        let moab_deps = registry.declare(moab).unwrap();
        let scalapack_deps = registry.declare(scalapack).unwrap();

        let mpi = registry.id_of("mpi").unwrap();
        assert!(moab_deps.is_required(mpi));
        assert!(scalapack_deps.is_required(mpi));
        assert_eq!(registry.iter().filter(|p| p.key() == "mpi").count(), 1);
    }

    #[test]
    fn test_declare_all_reaches_fixpoint() {
        let mut registry = PackageRegistry::with_builtins();
        registry.require("mmg").unwrap();
        registry.declare_all().unwrap();

        assert!(registry.by_key("ptscotch").is_some());
        assert!(registry.by_key("mathlib").is_some());
        assert!(registry
            .iter()
            .all(|p| p.state == PackageState::DependenciesDeclared));
    }
}
