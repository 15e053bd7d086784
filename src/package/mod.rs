// src/package/mod.rs

//! External package descriptions
//!
//! A [`PackageSpec`] is the static description of one external dependency:
//! where to download it, which commit to pin, which headers and libraries
//! prove it is usable, and which build tool family installs it. Behaviour that
//! differs per package (declaring dependencies, extra configure arguments,
//! custom install steps) lives behind the [`PackageRecipe`] trait.
//!
//! A [`Package`] is the per-run instance owned by the
//! [`PackageRegistry`](crate::registry::PackageRegistry): the spec plus the
//! mutable state filled in while the run progresses.

pub mod catalog;
pub mod flavor;
mod mmg;
mod moab;
pub mod recipe;
mod scalapack;
mod slepc;
mod upstream;

pub use catalog::Catalog;
pub use flavor::BuildFlavor;
pub use recipe::{FormContext, PackageRecipe, Requirer};

use crate::args::ArgumentList;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Index of a package inside its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageId(pub(crate) usize);

impl PackageId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Source languages a package may need compilers for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    C,
    Cxx,
    Fortran,
    Sycl,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::C => "C",
            Self::Cxx => "C++",
            Self::Fortran => "Fortran",
            Self::Sycl => "SYCL",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Floating point precision of the host library build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Single,
    #[default]
    Double,
    #[serde(rename = "__float128")]
    Quad,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Quad => "__float128",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single" => Ok(Self::Single),
            "double" => Ok(Self::Double),
            "__float128" | "quad" => Ok(Self::Quad),
            other => Err(Error::InvalidOption(format!("unknown precision: {}", other))),
        }
    }
}

/// Scalar type of the host library build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    #[default]
    Real,
    Complex,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::Complex => "complex",
        }
    }
}

impl FromStr for ScalarType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "real" => Ok(Self::Real),
            "complex" => Ok(Self::Complex),
            other => Err(Error::InvalidOption(format!("unknown scalar type: {}", other))),
        }
    }
}

/// Symbols linked against to verify a build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeFunctions {
    pub names: Vec<String>,
    /// Language the symbols are looked up in (drives Fortran mangling and
    /// C++ namespace handling)
    pub language: Option<Language>,
}

/// Static description of one external package
#[derive(Debug, Clone, Serialize)]
pub struct PackageSpec {
    /// Registry identity, lowercase (`moab`, `ptscotch`)
    pub key: String,
    /// Display name (`MOAB`, `PTScotch`)
    pub name: String,
    pub flavor: BuildFlavor,
    /// Commit hash or tag the download is pinned to
    pub git_commit: Option<String>,
    /// Download locations in order of preference
    pub download: Vec<String>,
    /// Directory names the unpacked source may have
    pub download_dir_names: Vec<String>,
    /// Macro in the package headers holding its version
    pub version_name: Option<String>,
    pub functions: ProbeFunctions,
    pub includes: Vec<String>,
    /// Acceptable library combinations, first complete set wins
    pub liblist: Vec<Vec<String>>,
    pub precisions: Vec<Precision>,
    pub needs_cxx: bool,
    pub needs_fortran: bool,
    pub has_tests: bool,
    pub download_on_windows: bool,
    /// Package is skipped when only `--with-<pkg>` options are given
    pub skip_with_options: bool,
    /// Host library calls into the package directly
    pub used_directly: bool,
    /// Host library links against the package
    pub linked_by_host: bool,
    /// Package is built with the host library, after it
    pub built_after_host: bool,
}

impl PackageSpec {
    pub fn new(key: impl Into<String>, name: impl Into<String>, flavor: BuildFlavor) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            flavor,
            git_commit: None,
            download: Vec::new(),
            download_dir_names: Vec::new(),
            version_name: None,
            functions: ProbeFunctions::default(),
            includes: Vec::new(),
            liblist: Vec::new(),
            precisions: vec![Precision::Single, Precision::Double, Precision::Quad],
            needs_cxx: false,
            needs_fortran: false,
            has_tests: false,
            download_on_windows: false,
            skip_with_options: false,
            used_directly: true,
            linked_by_host: true,
            built_after_host: false,
        }
    }

    /// Whether the package can be fetched and built by this run
    pub fn is_downloadable(&self) -> bool {
        !self.download.is_empty()
    }

    /// Check that the requested precision is supported
    pub fn check_precision(&self, precision: Precision) -> Result<()> {
        if self.precisions.contains(&precision) {
            Ok(())
        } else {
            Err(Error::UnsupportedPrecision {
                package: self.name.clone(),
                precision: precision.to_string(),
            })
        }
    }
}

/// Probe results, filled in by resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeState {
    pub found: bool,
    /// Install prefix the package was found in
    pub directory: Option<PathBuf>,
    /// Include directories
    pub include: Vec<PathBuf>,
    /// Libraries to link, as full paths or raw linker flags
    pub libraries: Vec<String>,
    pub version: Option<String>,
    /// Interpreter or tool located for program-style packages
    pub executable: Option<PathBuf>,
}

impl ProbeState {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn found_in(directory: impl Into<PathBuf>) -> Self {
        Self {
            found: true,
            directory: Some(directory.into()),
            ..Self::default()
        }
    }
}

/// Required and optional dependencies of one package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencySet {
    /// Configuration fails if any of these is unresolved
    pub deps: Vec<PackageId>,
    /// Absence only disables features
    pub odeps: Vec<PackageId>,
}

impl DependencySet {
    pub fn new(deps: Vec<PackageId>, odeps: Vec<PackageId>) -> Self {
        Self { deps, odeps }
    }

    pub fn all(&self) -> impl Iterator<Item = PackageId> + '_ {
        self.deps.iter().chain(self.odeps.iter()).copied()
    }

    pub fn is_required(&self, id: PackageId) -> bool {
        self.deps.contains(&id)
    }

    pub fn contains(&self, id: PackageId) -> bool {
        self.deps.contains(&id) || self.odeps.contains(&id)
    }
}

/// Lifecycle of a package within one configure run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PackageState {
    #[default]
    Unconfigured,
    DependenciesDeclared,
    ArgumentsFormed,
    Installing,
    Installed,
    Failed,
}

impl PackageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::DependenciesDeclared => "dependencies-declared",
            Self::ArgumentsFormed => "arguments-formed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Failed => "failed",
        }
    }

    /// Whether `self -> next` is a legal step
    ///
    /// Re-declaring and re-forming are allowed so those steps stay idempotent.
    pub fn can_advance_to(&self, next: PackageState) -> bool {
        use PackageState::*;
        matches!(
            (self, next),
            (Unconfigured, DependenciesDeclared)
                | (DependenciesDeclared, DependenciesDeclared)
                | (DependenciesDeclared, ArgumentsFormed)
                | (ArgumentsFormed, ArgumentsFormed)
                | (ArgumentsFormed, Installing)
                | (Installing, Installed)
                | (Installing, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Installed | Self::Failed)
    }
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One package instance in a configure run
#[derive(Debug)]
pub struct Package {
    pub id: PackageId,
    pub spec: PackageSpec,
    pub(crate) recipe: Arc<dyn PackageRecipe>,
    pub dependencies: Option<DependencySet>,
    pub probe: ProbeState,
    pub state: PackageState,
    pub arguments: Option<ArgumentList>,
    /// Where the package is (or will be) installed
    pub install_dir: Option<PathBuf>,
    /// Unpacked source tree
    pub source_dir: Option<PathBuf>,
}

impl Package {
    pub(crate) fn new(id: PackageId, recipe: Arc<dyn PackageRecipe>) -> Self {
        let spec = recipe.spec();
        Self {
            id,
            spec,
            recipe,
            dependencies: None,
            probe: ProbeState::default(),
            state: PackageState::Unconfigured,
            arguments: None,
            install_dir: None,
            source_dir: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.spec.key
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn found(&self) -> bool {
        self.probe.found
    }

    /// Install prefix as a string, empty when unknown
    pub fn directory(&self) -> String {
        self.probe
            .directory
            .as_deref()
            .map(|d| d.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn recipe(&self) -> &Arc<dyn PackageRecipe> {
        &self.recipe
    }

    /// Move to `next`, rejecting illegal transitions
    pub fn advance(&mut self, next: PackageState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::InvalidTransition {
                package: self.spec.name.clone(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Record where the package was found
    pub fn mark_found(&mut self, probe: ProbeState) {
        self.probe = probe;
    }

    /// Libraries as linker flags (`-L<dir> -l<name>`)
    pub fn link_string(&self) -> String {
        crate::probe::link_string(&self.probe.libraries)
    }

    /// Include directories as `-I<dir>` flags
    pub fn include_string(&self) -> String {
        crate::probe::include_string(&self.probe.include)
    }

    pub fn library_dir(&self) -> Option<PathBuf> {
        self.install_dir.as_deref().map(|d| d.join("lib"))
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::ProbeState;
    use crate::config::{ConfigureOptions, Toolchain};
    use crate::registry::PackageRegistry;
    use std::path::PathBuf;

    /// Options with every tool pinned so nothing depends on the host
    pub(crate) fn options() -> ConfigureOptions {
        ConfigureOptions::from_args([
            "PETSC_DIR=/work/petsc",
            "PETSC_ARCH=arch-test",
            "CC=mpicc",
            "CXX=mpicxx",
            "FC=mpif90",
            "MAKE=make",
            "CMAKE=cmake",
            "AR=ar",
            "RANLIB=ranlib",
            "COPTFLAGS=-O2",
            "CXXOPTFLAGS=-O2",
            "FOPTFLAGS=-O2",
            "LDFLAGS=",
            "--with-make-np=4",
        ])
        .unwrap()
    }

    pub(crate) fn toolchain(options: &ConfigureOptions) -> Toolchain {
        Toolchain::from_options(options)
    }

    /// Registry with `roots` required and everything declared
    pub(crate) fn declared(roots: &[&str]) -> PackageRegistry {
        let mut registry = PackageRegistry::with_builtins();
        for key in roots {
            registry.require(key).unwrap();
        }
        registry.declare_all().unwrap();
        registry
    }

    pub(crate) fn set_found(registry: &mut PackageRegistry, key: &str, dir: &str, libs: &[&str]) {
        let id = registry.id_of(key).unwrap();
        let mut probe = ProbeState::found_in(PathBuf::from(dir));
        probe.include = vec![PathBuf::from(dir).join("include")];
        probe.libraries = libs.iter().map(|l| l.to_string()).collect();
        registry.get_mut(id).unwrap().mark_found(probe);
    }
}
