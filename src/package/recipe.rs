// src/package/recipe.rs

//! Per-package behaviour
//!
//! Everything a package does beyond its static [`PackageSpec`] goes through
//! [`PackageRecipe`]. The defaults cover the common case: no dependencies, the
//! flavor's base arguments, the flavor's default install procedure and the
//! standard header/library probe.

use super::{DependencySet, Package, PackageId, PackageSpec, ProbeState};
use crate::args::ArgumentList;
use crate::config::{ConfigureOptions, Toolchain};
use crate::error::{Error, Result};
use crate::install::InstallPlan;
use crate::probe;
use crate::registry::PackageRegistry;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Behaviour of one external package
pub trait PackageRecipe: fmt::Debug + Send + Sync {
    /// Static identity of the package
    fn spec(&self) -> PackageSpec;

    /// Require other packages and report which are mandatory
    fn setup_dependencies(&self, _requirer: &mut Requirer<'_>) -> Result<DependencySet> {
        Ok(DependencySet::default())
    }

    /// Append package specific arguments after the flavor's base arguments
    fn extend_arguments(&self, _ctx: &FormContext<'_>, _args: &mut ArgumentList) -> Result<()> {
        Ok(())
    }

    /// Full argument list for the package's build tool
    fn form_arguments(&self, ctx: &FormContext<'_>) -> Result<ArgumentList> {
        let mut args = ctx.package.spec.flavor.base_arguments(ctx);
        self.extend_arguments(ctx, &mut args)?;
        Ok(args)
    }

    /// Steps and generated files that build and install the package
    fn install_plan(&self, ctx: &FormContext<'_>, args: &ArgumentList) -> Result<InstallPlan> {
        ctx.package.spec.flavor.default_plan(ctx, args)
    }

    /// Contribution to the generated makefile when the package is not downloaded
    fn alternate_plan(&self, _ctx: &FormContext<'_>) -> Option<InstallPlan> {
        None
    }

    /// Package specific places to look before the standard prefixes
    ///
    /// An empty path stands for the compiler's default search locations.
    fn search_directories(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Programs needed to build from a git checkout (no `configure` yet)
    fn git_prerequisites(&self) -> &'static [&'static str] {
        &[]
    }

    /// Look for an existing install in the given prefixes
    fn probe(&self, spec: &PackageSpec, ctx: &probe::ProbeContext<'_>) -> ProbeState {
        probe::probe_directories(spec, ctx)
    }
}

/// Handle a recipe uses to require other packages
pub struct Requirer<'a> {
    registry: &'a mut PackageRegistry,
    requester: PackageId,
}

impl<'a> Requirer<'a> {
    pub(crate) fn new(registry: &'a mut PackageRegistry, requester: PackageId) -> Self {
        Self {
            registry,
            requester,
        }
    }

    /// Require `key`, instantiating it if this run has not seen it yet
    pub fn require(&mut self, key: &str) -> Result<PackageId> {
        let id = self.registry.require(key)?;
        debug!("#{} requires {} (#{})", self.requester.index(), key, id.index());
        Ok(id)
    }

    pub fn requester(&self) -> PackageId {
        self.requester
    }
}

/// Read-only view used while forming arguments and install plans
pub struct FormContext<'a> {
    pub package: &'a Package,
    pub registry: &'a PackageRegistry,
    pub toolchain: &'a Toolchain,
    pub options: &'a ConfigureOptions,
}

impl<'a> FormContext<'a> {
    pub fn new(
        registry: &'a PackageRegistry,
        id: PackageId,
        toolchain: &'a Toolchain,
        options: &'a ConfigureOptions,
    ) -> Result<Self> {
        Ok(Self {
            package: registry.get(id)?,
            registry,
            toolchain,
            options,
        })
    }

    /// A declared dependency of the package being formed
    ///
    /// Asking for a package that was never declared is a recipe bug and
    /// fails with [`Error::MissingDependency`].
    pub fn dependency(&self, key: &str) -> Result<&'a Package> {
        let missing = || Error::MissingDependency {
            package: self.package.spec.name.clone(),
            dependency: key.to_string(),
        };
        let id = self.registry.id_of(key).ok_or_else(missing)?;
        let declared = self
            .package
            .dependencies
            .as_ref()
            .is_some_and(|set| set.contains(id));
        if !declared {
            return Err(missing());
        }
        self.registry.get(id)
    }

    /// Where the package installs to
    pub fn install_dir(&self) -> PathBuf {
        self.package
            .install_dir
            .clone()
            .unwrap_or_else(|| self.options.default_install_dir())
    }

    pub fn library_dir(&self) -> PathBuf {
        self.install_dir().join("lib")
    }

    /// Unpacked sources, or where they will be unpacked
    pub fn source_dir(&self) -> PathBuf {
        match self.package.source_dir() {
            Some(dir) => dir.to_path_buf(),
            None => {
                let name = self
                    .package
                    .spec
                    .download_dir_names
                    .first()
                    .cloned()
                    .unwrap_or_else(|| format!("git.{}", self.package.key()));
                self.options.external_packages_dir().join(name)
            }
        }
    }

    /// Directory for install records (`pkg.conf.<key>`)
    pub fn record_dir(&self) -> PathBuf {
        self.install_dir().join("lib").join("petsc").join("conf")
    }

    /// Command prefix for writing into the install location
    pub fn sudo(&self) -> String {
        match &self.options.install_sudo {
            Some(sudo) if !sudo.is_empty() => format!("{} ", sudo),
            _ => String::new(),
        }
    }

    pub fn source_has(&self, file: impl AsRef<Path>) -> bool {
        self.source_dir().join(file).exists()
    }
}
