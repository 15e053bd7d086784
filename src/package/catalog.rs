// src/package/catalog.rs

//! Known package recipes, by key

use super::{PackageRecipe, mmg, moab, scalapack, slepc, upstream};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Map from package key to its recipe
///
/// Recipes hold no per-run state, so the registry shares them by `Arc`.
pub struct Catalog {
    recipes: BTreeMap<String, Arc<dyn PackageRecipe>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            recipes: BTreeMap::new(),
        }
    }

    /// Catalog with every built-in package
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register_builtins();
        catalog
    }

    fn register_builtins(&mut self) {
        self.register(Arc::new(moab::Moab));
        self.register(Arc::new(mmg::Mmg));
        self.register(Arc::new(scalapack::Scalapack));
        self.register(Arc::new(slepc::Slepc));
        for recipe in upstream::builtins() {
            self.register(recipe);
        }
    }

    /// Register a recipe under its spec key, replacing any previous one
    pub fn register(&mut self, recipe: Arc<dyn PackageRecipe>) {
        let key = recipe.spec().key.to_lowercase();
        self.recipes.insert(key, recipe);
    }

    /// Recipe for `key`
    pub fn create(&self, key: &str) -> Result<Arc<dyn PackageRecipe>> {
        self.recipes
            .get(&key.to_lowercase())
            .cloned()
            .ok_or_else(|| Error::UnknownPackage(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.recipes.contains_key(&key.to_lowercase())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.recipes.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let catalog = Catalog::with_builtins();
        for key in ["moab", "mmg", "scalapack", "slepc", "mpi", "blaslapack", "ptscotch"] {
            assert!(catalog.contains(key), "missing {key}");
        }
        assert!(catalog.create("MOAB").is_ok());
        assert!(matches!(
            catalog.create("petsc4py"),
            Err(Error::UnknownPackage(_))
        ));
    }
}
