// src/session.rs

//! One configure run over the external packages
//!
//! A session instantiates the requested packages, declares dependencies until
//! nothing new is required, orders the graph leaves first and then walks it:
//! downloaded packages are fetched, built and installed, everything else is
//! probed for on the system. The generated make rules, header defines and the
//! configure log are written at the end.

use crate::args::ArgumentList;
use crate::buildlog::BuildLog;
use crate::config::{ConfigureOptions, Toolchain};
use crate::error::{Error, Result};
use crate::fetch::{self, Fetcher};
use crate::graph::DependencyGraph;
use crate::install::{InstallOutcome, InstallPlan, InstallRunner, MakefileFragment};
use crate::package::{FormContext, PackageId, PackageState, ProbeState};
use crate::prefix_cache::PrefixCache;
use crate::probe::{self, ProbeContext};
use crate::registry::PackageRegistry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Makefile holding rules contributed by packages
pub const MAKEFILE_NAME: &str = "extpkg.mk";

/// Header holding defines contributed by packages
pub const HEADER_NAME: &str = "extpkgconf.h";

pub const LOG_NAME: &str = "configure.log";

/// Prefix of the generated preprocessor defines
pub const DEFINE_PREFIX: &str = "PETSC_";

/// What happened to one package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageOutcome {
    /// Found on the system
    Found,
    NotFound,
    /// Turned off with `--with-<pkg>=0`
    Excluded,
    /// Only takes part when downloaded
    Skipped,
    /// Built and installed in this run
    Installed,
    /// Recorded configuration unchanged, build skipped
    UpToDate,
    /// Completed install found in the package prefix cache
    Reused,
    /// Dry run
    Planned,
}

/// Summary line for one package
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub key: String,
    pub name: String,
    pub state: PackageState,
    pub outcome: PackageOutcome,
    pub found: bool,
    pub directory: Option<PathBuf>,
    pub version: Option<String>,
}

/// Result of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionReport {
    /// Packages in the order they were configured
    pub packages: Vec<PackageReport>,
    /// Files written at the end of the run
    pub generated: Vec<PathBuf>,
}

impl SessionReport {
    pub fn package(&self, key: &str) -> Option<&PackageReport> {
        self.packages.iter().find(|p| p.key == key)
    }
}

/// A configure run
pub struct ConfigureSession {
    options: ConfigureOptions,
    toolchain: Toolchain,
    registry: PackageRegistry,
    log: BuildLog,
    fragment: MakefileFragment,
    outcomes: BTreeMap<PackageId, PackageOutcome>,
    dry_run: bool,
}

impl ConfigureSession {
    pub fn new(options: ConfigureOptions, toolchain: Toolchain) -> Self {
        Self::with_registry(options, toolchain, PackageRegistry::with_builtins())
    }

    pub fn with_registry(
        options: ConfigureOptions,
        toolchain: Toolchain,
        registry: PackageRegistry,
    ) -> Self {
        Self {
            options,
            toolchain,
            registry,
            log: BuildLog::new(),
            fragment: MakefileFragment::new(),
            outcomes: BTreeMap::new(),
            dry_run: false,
        }
    }

    /// Plan without downloading, building or writing anything
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn options(&self) -> &ConfigureOptions {
        &self.options
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    pub fn registry(&self) -> &PackageRegistry {
        &self.registry
    }

    pub fn log(&self) -> &BuildLog {
        &self.log
    }

    /// Rules, macros and defines gathered so far
    pub fn fragment(&self) -> &MakefileFragment {
        &self.fragment
    }

    /// Instantiate the requested packages and declare their dependencies
    ///
    /// Returns the configure order: every package after its dependencies.
    /// Packages that only build on request (SLEPc) are always instantiated so
    /// their make rules exist either way.
    pub fn declare(&mut self) -> Result<Vec<PackageId>> {
        for key in self.options.requested_packages() {
            if self.registry.catalog().contains(&key) {
                self.registry.require(&key)?;
            } else if self.options.wants_download(&key) {
                return Err(Error::UnknownPackage(key));
            } else {
                // --with-<x>-dir for something configured elsewhere
                warn!("No external package recipe for {}, leaving it to configure", key);
            }
        }

        let umbrella: Vec<String> = self
            .registry
            .catalog()
            .keys()
            .filter(|key| {
                self.registry
                    .catalog()
                    .create(key)
                    .is_ok_and(|recipe| recipe.spec().skip_with_options)
            })
            .map(str::to_string)
            .collect();
        for key in umbrella {
            self.registry.require(&key)?;
        }

        self.registry.declare_all()?;
        let order = DependencyGraph::from_registry(&self.registry).topological_sort()?;
        let names: Vec<&str> = order
            .iter()
            .filter_map(|id| self.registry.get(*id).ok().map(|p| p.name()))
            .collect();
        info!("Configure order: {}", names.join(", "));
        self.log.line(&format!("Configure order: {}", names.join(", ")));
        Ok(order)
    }

    /// Configure every package, then write the generated files
    pub fn run(&mut self) -> Result<SessionReport> {
        let order = self.declare()?;
        for id in &order {
            self.configure_package(*id)?;
        }
        self.collect_alternate_plans(&order)?;

        let mut report = SessionReport::default();
        for id in &order {
            let package = self.registry.get(*id)?;
            report.packages.push(PackageReport {
                key: package.key().to_string(),
                name: package.name().to_string(),
                state: package.state,
                outcome: self
                    .outcomes
                    .get(id)
                    .copied()
                    .unwrap_or(PackageOutcome::NotFound),
                found: package.found(),
                directory: package.probe.directory.clone(),
                version: package.probe.version.clone(),
            });
        }
        if !self.dry_run {
            report.generated = self.write_outputs()?;
        }
        Ok(report)
    }

    fn configure_package(&mut self, id: PackageId) -> Result<()> {
        let package = self.registry.get(id)?;
        let key = package.key().to_string();
        let skip_with_options = package.spec.skip_with_options;

        let outcome = if self.options.is_excluded(&key) {
            info!("{} disabled on request", package.name());
            PackageOutcome::Excluded
        } else if self.options.wants_download(&key) {
            self.install_package(id)?
        } else if skip_with_options {
            PackageOutcome::Skipped
        } else {
            self.probe_package(id)?
        };
        self.outcomes.insert(id, outcome);
        Ok(())
    }

    /// Look for an existing install
    ///
    /// An explicit `--with-<pkg>-dir` is the only place searched and must
    /// contain the package.
    pub fn probe_package(&mut self, id: PackageId) -> Result<PackageOutcome> {
        let package = self.registry.get(id)?;
        let recipe = package.recipe().clone();
        let spec = package.spec.clone();
        let explicit = self.options.with_dir.get(&spec.key).cloned();

        let directories = match &explicit {
            Some(dir) => vec![dir.clone()],
            None => {
                let mut dirs = recipe.search_directories();
                dirs.push(PathBuf::new());
                dirs
            }
        };
        let ctx = ProbeContext {
            directories: &directories,
            mangling: self.toolchain.fortran_mangling,
        };
        let state = recipe.probe(&spec, &ctx);

        if let Some(dir) = explicit.filter(|_| !state.found) {
            return Err(Error::ResolutionError(format!(
                "--with-{}-dir={} does not contain a usable {}",
                spec.key,
                dir.display(),
                spec.name
            )));
        }

        let outcome = if state.found {
            let where_ = state
                .directory
                .as_deref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "the default search path".to_string());
            info!("Found {} in {}", spec.name, where_);
            self.log.line(&format!("{}: found in {}", spec.name, where_));
            PackageOutcome::Found
        } else {
            info!("{} not found", spec.name);
            self.log.line(&format!("{}: not found", spec.name));
            PackageOutcome::NotFound
        };
        self.registry.get_mut(id)?.mark_found(state);
        Ok(outcome)
    }

    /// Fail when a required dependency of `id` was not found
    fn check_required(&self, id: PackageId) -> Result<()> {
        let package = self.registry.get(id)?;
        let Some(deps) = &package.dependencies else {
            return Ok(());
        };
        for dep in &deps.deps {
            let dep = self.registry.get(*dep)?;
            if !dep.found() {
                return Err(Error::RequiredDependencyMissing {
                    package: package.name().to_string(),
                    dependency: dep.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Declare `key` and probe what it depends on, without installing
    pub fn prepare(&mut self, key: &str) -> Result<PackageId> {
        let id = self.registry.require(key)?;
        let order = self.declare()?;
        let deps = DependencyGraph::from_registry(&self.registry).transitive_dependencies(id);
        for dep in order.into_iter().filter(|d| deps.contains(d)) {
            if !self.options.is_excluded(self.registry.get(dep)?.key()) {
                self.probe_package(dep)?;
            }
        }
        Ok(id)
    }

    /// The install plan `id` would run with the current state
    pub fn install_plan(&self, id: PackageId) -> Result<InstallPlan> {
        let args = self.form_arguments(id)?;
        Ok(self.plan(id, &args)?.0)
    }

    pub fn form_arguments(&self, id: PackageId) -> Result<ArgumentList> {
        let ctx = FormContext::new(&self.registry, id, &self.toolchain, &self.options)?;
        ctx.package.recipe().form_arguments(&ctx)
    }

    fn plan(&self, id: PackageId, args: &ArgumentList) -> Result<(InstallPlan, PathBuf)> {
        let ctx = FormContext::new(&self.registry, id, &self.toolchain, &self.options)?;
        let plan = ctx.package.recipe().install_plan(&ctx, args)?;
        Ok((plan, ctx.install_dir()))
    }

    /// Download, build and install one package
    pub fn install_package(&mut self, id: PackageId) -> Result<PackageOutcome> {
        let spec = self.registry.get(id)?.spec.clone();
        if !spec.is_downloadable() {
            return Err(Error::NotSupported(format!(
                "{} cannot be downloaded, install it and use --with-{}-dir",
                spec.name, spec.key
            )));
        }
        spec.check_precision(self.options.precision)?;
        self.toolchain.check_languages(&spec)?;
        self.check_required(id)?;

        let root = self.options.external_packages_dir();
        if let Some(existing) = fetch::existing_source(&spec, &root) {
            info!("Using existing {} sources in {}", spec.name, existing.display());
            self.registry.get_mut(id)?.source_dir = Some(existing);
        }

        let cache = self
            .options
            .package_prefix_hash
            .as_ref()
            .map(|root| PrefixCache::new(root.clone()));
        if let Some(cache) = &cache {
            // identity arguments name the cache root, not this host tree
            self.registry.get_mut(id)?.install_dir = Some(cache.root().to_path_buf());
        }
        let mut args = self.form_arguments(id)?;
        if let Some(cache) = &cache {
            let prefix = cache.prefix_for(&spec, &args);
            self.registry.get_mut(id)?.install_dir = Some(prefix.clone());
            args = self.form_arguments(id)?;

            if cache.is_complete(&prefix) {
                if let Some(state) = self.probe_install(id, &prefix)? {
                    info!("Reusing {} from {}", spec.name, prefix.display());
                    self.log
                        .line(&format!("{}: reusing {}", spec.name, prefix.display()));
                    let package = self.registry.get_mut(id)?;
                    package.arguments = Some(args);
                    package.advance(PackageState::ArgumentsFormed)?;
                    package.advance(PackageState::Installing)?;
                    package.advance(PackageState::Installed)?;
                    package.mark_found(state);
                    return Ok(PackageOutcome::Reused);
                }
            }
        }

        {
            let package = self.registry.get_mut(id)?;
            package.arguments = Some(args.clone());
            package.advance(PackageState::ArgumentsFormed)?;
        }

        if self.registry.get(id)?.source_dir.is_none() && !self.dry_run {
            let locations = match self.options.download_urls.get(&spec.key) {
                Some(url) => vec![url.clone()],
                None => spec.download.clone(),
            };
            let dir = Fetcher::new(&root).fetch(&spec, &locations)?;
            self.registry.get_mut(id)?.source_dir = Some(dir);
        }

        let (plan, install_dir) = self.plan(id, &args)?;
        self.fragment.merge(&plan.fragment);

        self.registry.get_mut(id)?.advance(PackageState::Installing)?;
        let result = InstallRunner::new(&mut self.log)
            .dry_run(self.dry_run)
            .run(&spec.name, &plan);
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.registry.get_mut(id)?.advance(PackageState::Failed)?;
                return Err(e);
            }
        };

        // Built after the host library: nothing to probe for yet
        let state = if spec.built_after_host || self.dry_run {
            Some(ProbeState::found_in(&install_dir))
        } else {
            self.probe_install(id, &install_dir)?
        };
        let Some(state) = state else {
            self.registry.get_mut(id)?.advance(PackageState::Failed)?;
            return Err(Error::InstallFailed {
                package: spec.name.clone(),
                message: format!(
                    "Downloaded {} could not be used. Please check install in {}",
                    spec.name,
                    install_dir.display()
                ),
            });
        };
        self.registry.get_mut(id)?.advance(PackageState::Installed)?;
        self.registry.get_mut(id)?.mark_found(state);

        if let Some(cache) = cache.filter(|_| !self.dry_run) {
            cache.mark_complete(&spec, &install_dir)?;
        }

        Ok(match outcome {
            InstallOutcome::Installed => PackageOutcome::Installed,
            InstallOutcome::UpToDate => PackageOutcome::UpToDate,
            InstallOutcome::Planned => PackageOutcome::Planned,
        })
    }

    fn probe_install(&self, id: PackageId, dir: &std::path::Path) -> Result<Option<ProbeState>> {
        let spec = &self.registry.get(id)?.spec;
        Ok(probe::probe_directory(
            spec,
            dir,
            self.toolchain.fortran_mangling,
        ))
    }

    /// Make rules from packages that were not downloaded
    fn collect_alternate_plans(&mut self, order: &[PackageId]) -> Result<()> {
        for id in order {
            let package = self.registry.get(*id)?;
            if self.options.wants_download(package.key()) {
                continue;
            }
            let ctx = FormContext::new(&self.registry, *id, &self.toolchain, &self.options)?;
            if let Some(plan) = package.recipe().alternate_plan(&ctx) {
                self.fragment.merge(&plan.fragment);
            }
        }
        Ok(())
    }

    /// Write the makefile, the header and the configure log
    pub fn write_outputs(&self) -> Result<Vec<PathBuf>> {
        let conf_dir = self.options.conf_dir();
        fs::create_dir_all(&conf_dir)?;

        let makefile = conf_dir.join(MAKEFILE_NAME);
        fs::write(&makefile, self.fragment.render_makefile())?;
        let header = conf_dir.join(HEADER_NAME);
        fs::write(&header, self.fragment.render_header(DEFINE_PREFIX))?;
        let log = conf_dir.join(LOG_NAME);
        self.log.write_to(&log)?;

        info!("Wrote {}", makefile.display());
        Ok(vec![makefile, header, log])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::fixtures;
    use std::path::Path;
    use tempfile::TempDir;

    fn options_in(dir: &Path, extra: &[&str]) -> ConfigureOptions {
        let mut options = fixtures::options();
        options.petsc_dir = dir.to_path_buf();
        options.apply_args(extra).unwrap();
        options
    }

    fn fake_prefix(root: &Path, libs: &[&str], headers: &[&str]) -> PathBuf {
        for lib in libs {
            let path = root.join("lib").join(lib);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"").unwrap();
        }
        for header in headers {
            let path = root.join("include").join(header);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"").unwrap();
        }
        root.to_path_buf()
    }

    #[test]
    fn test_declare_orders_leaves_first() {
        let tmp = TempDir::new().unwrap();
        let options = options_in(tmp.path(), &["--download-mmg"]);
        let toolchain = fixtures::toolchain(&options);
        let mut session = ConfigureSession::new(options, toolchain);

        let order = session.declare().unwrap();
        let keys: Vec<&str> = order
            .iter()
            .map(|id| session.registry().get(*id).unwrap().key())
            .collect();
        let pos = |k: &str| keys.iter().position(|x| *x == k).unwrap();
        assert!(pos("mpi") < pos("ptscotch"));
        assert!(pos("ptscotch") < pos("mmg"));
        assert!(pos("mathlib") < pos("mmg"));
        assert!(pos("python") < pos("slepc"));
    }

    #[test]
    fn test_unknown_download_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let options = options_in(tmp.path(), &["--download-nosuchpkg"]);
        let toolchain = fixtures::toolchain(&options);
        let mut session = ConfigureSession::new(options, toolchain);
        assert!(matches!(session.declare(), Err(Error::UnknownPackage(_))));
    }

    #[test]
    fn test_foreign_with_dir_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let options = options_in(tmp.path(), &["--with-cuda-dir=/usr/local/cuda-11.0"]);
        let toolchain = fixtures::toolchain(&options);
        let mut session = ConfigureSession::new(options, toolchain);
        session.declare().unwrap();
        assert!(session.registry().by_key("cuda").is_none());
    }

    #[test]
    fn test_explicit_dir_must_contain_package() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("empty");
        fs::create_dir_all(&empty).unwrap();
        let options = options_in(
            tmp.path(),
            &[format!("--with-metis-dir={}", empty.display()).as_str()],
        );
        let toolchain = fixtures::toolchain(&options);
        let mut session = ConfigureSession::new(options, toolchain);
        let order = session.declare().unwrap();
        let metis = session.registry().id_of("metis").unwrap();
        assert!(order.contains(&metis));

        let err = session.probe_package(metis).unwrap_err();
        assert!(err.to_string().contains("--with-metis-dir"));
    }

    #[test]
    fn test_explicit_dir_is_probed() {
        let tmp = TempDir::new().unwrap();
        let prefix = fake_prefix(&tmp.path().join("metis"), &["libmetis.a"], &["metis.h"]);
        let options = options_in(
            tmp.path(),
            &[format!("--with-metis-dir={}", prefix.display()).as_str()],
        );
        let toolchain = fixtures::toolchain(&options);
        let mut session = ConfigureSession::new(options, toolchain);
        session.declare().unwrap();
        let metis = session.registry().id_of("metis").unwrap();

        assert_eq!(session.probe_package(metis).unwrap(), PackageOutcome::Found);
        assert_eq!(
            session.registry().get(metis).unwrap().directory(),
            prefix.display().to_string()
        );
    }

    #[test]
    fn test_required_dependency_missing() {
        let tmp = TempDir::new().unwrap();
        let options = options_in(tmp.path(), &["--download-scalapack"]);
        let toolchain = fixtures::toolchain(&options);
        let mut session = ConfigureSession::new(options, toolchain).dry_run(true);
        session.declare().unwrap();
        let scalapack = session.registry().id_of("scalapack").unwrap();

        let err = session.install_package(scalapack).unwrap_err();
        assert!(matches!(err, Error::RequiredDependencyMissing { .. }));
        assert_eq!(
            session.registry().get(scalapack).unwrap().state,
            PackageState::DependenciesDeclared
        );
    }

    #[test]
    fn test_dry_run_plans_download() {
        let tmp = TempDir::new().unwrap();
        let options = options_in(tmp.path(), &["--download-slepc"]);
        let toolchain = fixtures::toolchain(&options);
        let mut session = ConfigureSession::new(options, toolchain).dry_run(true);
        session.declare().unwrap();
        let python = session.registry().id_of("python").unwrap();
        let mut probe = ProbeState::found_in("/usr");
        probe.executable = Some(PathBuf::from("/usr/bin/python3"));
        session.registry.get_mut(python).unwrap().mark_found(probe);

        let slepc = session.registry().id_of("slepc").unwrap();
        assert_eq!(
            session.install_package(slepc).unwrap(),
            PackageOutcome::Planned
        );
        assert_eq!(
            session.registry().get(slepc).unwrap().state,
            PackageState::Installed
        );
        assert_eq!(
            session.fragment().rule("slepc-build").unwrap().prerequisites,
            "slepcbuild slepcinstall"
        );
    }

    #[test]
    fn test_skipped_package_contributes_empty_rules() {
        let tmp = TempDir::new().unwrap();
        let options = options_in(tmp.path(), &[]);
        let toolchain = fixtures::toolchain(&options);
        let mut session = ConfigureSession::new(options, toolchain);

        let report = session.run().unwrap();
        assert_eq!(
            report.package("slepc").unwrap().outcome,
            PackageOutcome::Skipped
        );
        let makefile = fs::read_to_string(&report.generated[0]).unwrap();
        assert!(makefile.contains("slepc-build:"));
        assert!(makefile.contains("slepc-install:"));
        assert!(session.fragment().macro_value("SLEPC").is_none());
    }

    #[test]
    fn test_excluded_package() {
        let tmp = TempDir::new().unwrap();
        let options = options_in(tmp.path(), &["--download-mmg", "--with-mmg=0"]);
        let toolchain = fixtures::toolchain(&options);
        let mut session = ConfigureSession::new(options, toolchain).dry_run(true);

        let report = session.run().unwrap();
        assert_eq!(report.package("mmg").unwrap().outcome, PackageOutcome::Excluded);
        assert!(report.generated.is_empty());
    }
}
