// src/config.rs

//! Configure options and the resolved toolchain
//!
//! Options arrive the way the host configure script receives them: a flat
//! list of `--download-<pkg>`, `--with-<pkg>-dir=<path>`, `--prefix=...` and
//! `KEY=value` tokens, either on the command line or from a TOML preset
//! holding the same list (see `demos/`). [`Toolchain`] is the compiler side of
//! the configuration: compilers, flags, archiver and make, with environment
//! and `PATH` fallbacks.

use crate::error::{Error, Result};
use crate::mangling::FortranMangling;
use crate::package::{Language, PackageSpec, Precision, ScalarType};
use crate::prefix_cache;
use crate::probe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default name of the build architecture directory
pub const DEFAULT_ARCH: &str = "arch-extpkg";

/// Options for one configure run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigureOptions {
    /// `--prefix`: final install location of the host library
    pub prefix: Option<PathBuf>,
    /// `--package-prefix-hash`: shared cache of built packages
    pub package_prefix_hash: Option<PathBuf>,
    /// `PETSC_DIR`: host source tree
    pub petsc_dir: PathBuf,
    /// `PETSC_ARCH`
    pub arch: String,
    /// Packages to download and build, in request order
    pub download: Vec<String>,
    /// `--download-<pkg>=<url>` overrides
    pub download_urls: BTreeMap<String, String>,
    /// `--with-<pkg>-dir=<path>`
    pub with_dir: BTreeMap<String, PathBuf>,
    /// `--with-<pkg>=0`
    pub without: Vec<String>,
    pub debugging: bool,
    pub shared_libraries: bool,
    pub scalar_type: ScalarType,
    pub precision: Precision,
    pub make_np: Option<u32>,
    pub fortran_mangling: Option<FortranMangling>,
    /// Command prefix used when the install prefix needs elevated rights
    pub install_sudo: Option<String>,
    /// `--download-slepc-configure-arguments`
    pub slepc_configure_arguments: Option<String>,
    /// `KEY=value` compiler and tool settings (`CC`, `COPTFLAGS`, `SYCLCXX`)
    pub tools: BTreeMap<String, String>,
    /// Options not interpreted here, kept for the host configure
    pub extra: BTreeMap<String, String>,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            package_prefix_hash: None,
            petsc_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            arch: DEFAULT_ARCH.to_string(),
            download: Vec::new(),
            download_urls: BTreeMap::new(),
            with_dir: BTreeMap::new(),
            without: Vec::new(),
            debugging: true,
            shared_libraries: true,
            scalar_type: ScalarType::Real,
            precision: Precision::Double,
            make_np: None,
            fortran_mangling: None,
            install_sudo: None,
            slepc_configure_arguments: None,
            tools: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// A saved list of configure options, as in a CI arch script
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigurePreset {
    #[serde(default)]
    pub configure_options: Vec<String>,
}

impl ConfigurePreset {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!("Failed to read preset {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }
}

fn parse_bool(option: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(Error::InvalidOption(format!(
            "{} expects a boolean, got '{}'",
            option, value
        ))),
    }
}

fn parse_count(option: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| Error::InvalidOption(format!("{} expects a number, got '{}'", option, value)))
}

/// Expand a leading `~` and `$HOME`
fn expand_home(value: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (value, home) {
        (v, Some(home)) if v == "~" || v == "$HOME" => home,
        (v, Some(home)) if v.starts_with("~/") => home.join(&v[2..]),
        (v, Some(home)) if v.starts_with("$HOME/") => home.join(&v[6..]),
        (v, _) => PathBuf::from(v),
    }
}

impl ConfigureOptions {
    /// Build options from a token list
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        options.apply_args(args)?;
        Ok(options)
    }

    /// Load a preset file and apply its options
    pub fn from_preset(path: &Path) -> Result<Self> {
        let preset = ConfigurePreset::from_file(path)?;
        Self::from_args(&preset.configure_options)
    }

    /// Apply tokens on top of the current options, later tokens win
    pub fn apply_args<I, S>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.apply_arg(arg.as_ref())?;
        }
        Ok(())
    }

    fn apply_arg(&mut self, arg: &str) -> Result<()> {
        let Some(option) = arg.strip_prefix("--") else {
            // KEY=value tool settings
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                Error::InvalidOption(format!("expected --option or KEY=value, got '{}'", arg))
            })?;
            match key {
                "PETSC_ARCH" => self.arch = value.to_string(),
                "PETSC_DIR" => self.petsc_dir = expand_home(value),
                _ => {
                    self.tools.insert(key.to_string(), value.to_string());
                }
            }
            return Ok(());
        };

        let (name, value) = match option.split_once('=') {
            Some((n, v)) => (n, Some(v)),
            None => (option, None),
        };
        debug!("configure option {} = {:?}", name, value);

        match (name, value) {
            ("prefix", Some(v)) => self.prefix = Some(expand_home(v)),
            ("package-prefix-hash", Some(v)) => self.package_prefix_hash = Some(expand_home(v)),
            ("package-prefix-hash", None) => {
                self.package_prefix_hash = Some(prefix_cache::default_root())
            }
            ("with-debugging", Some(v)) => self.debugging = parse_bool(name, v)?,
            ("with-shared-libraries", Some(v)) => self.shared_libraries = parse_bool(name, v)?,
            ("with-scalar-type", Some(v)) => self.scalar_type = v.parse()?,
            ("with-precision", Some(v)) => self.precision = v.parse()?,
            ("with-make-np", Some(v)) => self.make_np = Some(parse_count(name, v)?),
            ("with-fortran-mangling", Some(v)) => self.fortran_mangling = Some(v.parse()?),
            ("with-sudo", Some(v)) => self.install_sudo = Some(v.to_string()),
            ("download-slepc-configure-arguments", Some(v)) => {
                self.slepc_configure_arguments = Some(v.to_string())
            }
            (n, v) if n.starts_with("download-") => {
                let package = n["download-".len()..].to_lowercase();
                if package.is_empty() {
                    return Err(Error::InvalidOption(format!("--{n}: missing package name")));
                }
                match v {
                    None => self.request_download(&package),
                    Some(v) if parse_bool(n, v).is_ok() => {
                        if parse_bool(n, v)? {
                            self.request_download(&package);
                        } else {
                            self.download.retain(|p| p != &package);
                        }
                    }
                    Some(url) => {
                        self.request_download(&package);
                        self.download_urls.insert(package, url.to_string());
                    }
                }
            }
            (n, Some(v)) if n.starts_with("with-") && n.ends_with("-dir") => {
                let package = n
                    .strip_prefix("with-")
                    .and_then(|rest| rest.strip_suffix("-dir"))
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| Error::InvalidOption(format!("--{n}: missing package name")))?
                    .to_lowercase();
                self.with_dir.insert(package, expand_home(v));
            }
            (n, Some(v)) if n.starts_with("with-") && matches!(parse_bool(n, v), Ok(false)) => {
                let package = n["with-".len()..].to_lowercase();
                if !self.without.contains(&package) {
                    self.without.push(package);
                }
            }
            (n, v) => {
                self.extra
                    .insert(n.to_string(), v.unwrap_or_default().to_string());
            }
        }
        Ok(())
    }

    fn request_download(&mut self, package: &str) {
        if !self.download.iter().any(|p| p == package) {
            self.download.push(package.to_string());
        }
    }

    pub fn wants_download(&self, key: &str) -> bool {
        self.download.iter().any(|p| p == key)
    }

    pub fn is_excluded(&self, key: &str) -> bool {
        self.without.iter().any(|p| p == key)
    }

    /// Packages the run starts from: downloads, then explicit directories
    pub fn requested_packages(&self) -> Vec<String> {
        let mut roots = self.download.clone();
        for key in self.with_dir.keys() {
            if !roots.contains(key) {
                roots.push(key.clone());
            }
        }
        roots
    }

    /// Installing into a final prefix (not a hashed package cache)
    pub fn installs_to_prefix(&self) -> bool {
        self.prefix.is_some() && self.package_prefix_hash.is_none()
    }

    /// Where built packages land unless a prefix hash redirects them
    pub fn default_install_dir(&self) -> PathBuf {
        match &self.prefix {
            Some(prefix) => prefix.clone(),
            None => self.petsc_dir.join(&self.arch),
        }
    }

    /// Directory holding downloaded package sources
    pub fn external_packages_dir(&self) -> PathBuf {
        self.petsc_dir.join(&self.arch).join("externalpackages")
    }

    /// Directory holding generated configuration (`lib/petsc/conf`)
    pub fn conf_dir(&self) -> PathBuf {
        self.petsc_dir.join(&self.arch).join("lib").join("petsc").join("conf")
    }
}

/// Compilers, flags and build tools for one run
#[derive(Debug, Clone, Serialize)]
pub struct Toolchain {
    pub cc: String,
    pub cxx: Option<String>,
    pub fc: Option<String>,
    pub cflags: String,
    pub cxxflags: String,
    pub fflags: String,
    pub ldflags: String,
    pub ar: String,
    pub ar_flags: String,
    pub ar_lib_suffix: String,
    pub ranlib: String,
    pub make: String,
    pub make_np: u32,
    pub cmake: String,
    pub debugging: bool,
    pub shared_libraries: bool,
    pub fortran_mangling: FortranMangling,
    /// Raw `KEY=value` settings, consulted by the compiler adapters
    pub settings: BTreeMap<String, String>,
}

fn find_program(candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find(|c| which::which(c).is_ok())
        .map(|c| c.to_string())
}

impl Toolchain {
    /// Resolve the toolchain and detect the Fortran mangling unless it was given
    pub fn detect(options: &ConfigureOptions) -> Self {
        let mut toolchain = Self::from_options(options);
        if options.fortran_mangling.is_none() {
            toolchain.fortran_mangling =
                toolchain.detect_fortran_mangling(probe::fortran_check_symbols);
        }
        toolchain
    }

    /// Mangling of the check routine compiled by `fc`, the default if that fails
    pub fn detect_fortran_mangling<F>(&self, symbols: F) -> FortranMangling
    where
        F: FnOnce(&str, &str, &str) -> Result<Vec<String>>,
    {
        let Some(fc) = self.fc.as_deref() else {
            debug!("No Fortran compiler, using {} mangling", FortranMangling::default());
            return FortranMangling::default();
        };
        let detected = symbols(fc, &self.fflags, &self.ar)
            .map(|found| probe::mangling_from_symbols(&found));
        match detected {
            Ok(Some(mangling)) => {
                info!("Fortran compiler {} uses {} mangling", fc, mangling);
                mangling
            }
            Ok(None) => {
                warn!(
                    "Could not identify the Fortran mangling of {}, assuming {}",
                    fc,
                    FortranMangling::default()
                );
                FortranMangling::default()
            }
            Err(e) => {
                warn!(
                    "Fortran mangling check with {} failed ({}), assuming {}",
                    fc,
                    e,
                    FortranMangling::default()
                );
                FortranMangling::default()
            }
        }
    }

    /// Resolve the toolchain from options, environment and `PATH`
    ///
    /// The Fortran mangling is the configured one or the default; [`Toolchain::detect`]
    /// compiles a check routine instead.
    pub fn from_options(options: &ConfigureOptions) -> Self {
        let lookup = |key: &str| -> Option<String> {
            options
                .tools
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok().filter(|v| !v.is_empty()))
        };
        let default_opt = if options.debugging { "-g" } else { "-O" };

        let cc = lookup("CC")
            .or_else(|| find_program(&["mpicc", "gcc", "clang", "cc"]))
            .unwrap_or_else(|| "cc".to_string());
        let cxx = lookup("CXX").or_else(|| find_program(&["mpicxx", "g++", "clang++", "c++"]));
        let fc = lookup("FC").or_else(|| find_program(&["mpif90", "gfortran", "flang"]));
        let make = lookup("MAKE")
            .or_else(|| find_program(&["gmake", "make"]))
            .unwrap_or_else(|| "make".to_string());
        let make_np = options.make_np.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .unwrap_or(2)
        });

        Self {
            cc,
            cxx,
            fc,
            cflags: lookup("COPTFLAGS")
                .or_else(|| lookup("CFLAGS"))
                .unwrap_or_else(|| default_opt.to_string()),
            cxxflags: lookup("CXXOPTFLAGS")
                .or_else(|| lookup("CXXFLAGS"))
                .unwrap_or_else(|| default_opt.to_string()),
            fflags: lookup("FOPTFLAGS")
                .or_else(|| lookup("FFLAGS"))
                .unwrap_or_else(|| default_opt.to_string()),
            ldflags: lookup("LDFLAGS").unwrap_or_default(),
            ar: lookup("AR").unwrap_or_else(|| "ar".to_string()),
            ar_flags: lookup("ARFLAGS").unwrap_or_else(|| "cr".to_string()),
            ar_lib_suffix: "a".to_string(),
            ranlib: lookup("RANLIB").unwrap_or_else(|| "ranlib".to_string()),
            make,
            make_np,
            cmake: lookup("CMAKE")
                .or_else(|| find_program(&["cmake"]))
                .unwrap_or_else(|| "cmake".to_string()),
            debugging: options.debugging,
            shared_libraries: options.shared_libraries,
            fortran_mangling: options.fortran_mangling.unwrap_or_default(),
            settings: options.tools.clone(),
        }
    }

    pub fn compiler(&self, language: Language) -> Option<&str> {
        match language {
            Language::C => Some(&self.cc),
            Language::Cxx => self.cxx.as_deref(),
            Language::Fortran => self.fc.as_deref(),
            Language::Sycl => self.settings.get("SYCLCXX").map(String::as_str),
        }
    }

    pub fn compiler_flags(&self, language: Language) -> &str {
        match language {
            Language::C => &self.cflags,
            Language::Cxx | Language::Sycl => &self.cxxflags,
            Language::Fortran => &self.fflags,
        }
    }

    /// Linker driver for a language (the compiler itself)
    pub fn linker(&self, language: Language) -> Option<&str> {
        self.compiler(language)
    }

    pub fn linker_flags(&self) -> &str {
        &self.ldflags
    }

    /// `make` with parallel jobs
    pub fn make_jnp(&self) -> String {
        format!("{} -j{}", self.make, self.make_np)
    }

    /// Flag that disables optimisation for sources that miscompile otherwise
    pub fn no_opt_flag(&self) -> &'static str {
        "-O0"
    }

    /// Position independent code flag when building shared libraries
    pub fn shared_flag(&self) -> &'static str {
        if self.shared_libraries { "-fPIC" } else { "" }
    }

    /// Raw tool setting, falling back to the environment
    pub fn setting(&self, key: &str) -> Option<String> {
        self.settings
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    }

    /// Fail early when a package needs a compiler that is not configured
    pub fn check_languages(&self, spec: &PackageSpec) -> Result<()> {
        let missing = if spec.needs_cxx && self.cxx.is_none() {
            Some(Language::Cxx)
        } else if spec.needs_fortran && self.fc.is_none() {
            Some(Language::Fortran)
        } else {
            None
        };
        match missing {
            Some(language) => Err(Error::MissingCompiler {
                package: spec.name.clone(),
                language: language.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::BuildFlavor;

    #[test]
    fn test_parse_ci_style_options() {
        let options = ConfigureOptions::from_args([
            "--package-prefix-hash=/tmp/hash-pkgs",
            "--with-make-test-np=2",
            "COPTFLAGS=-g -O",
            "--with-scalar-type=complex",
            "--with-precision=single",
            "--with-cuda-dir=/usr/local/cuda-11.0",
            "--with-mpi-f90module-visibility=0",
        ])
        .unwrap();

        assert_eq!(options.package_prefix_hash, Some(PathBuf::from("/tmp/hash-pkgs")));
        // test-harness options pass through to the host configure
        assert_eq!(options.extra.get("with-make-test-np").map(String::as_str), Some("2"));
        assert_eq!(options.tools.get("COPTFLAGS").unwrap(), "-g -O");
        assert_eq!(options.scalar_type, ScalarType::Complex);
        assert_eq!(options.precision, Precision::Single);
        assert_eq!(options.with_dir.get("cuda").unwrap(), &PathBuf::from("/usr/local/cuda-11.0"));
        assert!(options.is_excluded("mpi-f90module-visibility"));
    }

    #[test]
    fn test_option_without_package_name_is_rejected() {
        for token in ["--with-dir=/x", "--with--dir=/x", "--download-"] {
            let err = ConfigureOptions::from_args([token]).unwrap_err();
            assert!(matches!(err, Error::InvalidOption(_)), "{token}: {err}");
        }
    }

    #[test]
    fn test_bare_package_prefix_hash_uses_home_root() {
        let options = ConfigureOptions::from_args(["--package-prefix-hash"]).unwrap();
        assert_eq!(options.package_prefix_hash, Some(prefix_cache::default_root()));
        assert!(!options.extra.contains_key("package-prefix-hash"));
    }

    #[test]
    fn test_download_forms() {
        let options = ConfigureOptions::from_args([
            "--download-moab",
            "--download-mmg=1",
            "--download-scalapack=https://example.com/scalapack.tar.gz",
            "--download-mmg=no",
            "--download-moab",
        ])
        .unwrap();

        assert_eq!(options.download, vec!["moab", "scalapack"]);
        assert_eq!(
            options.download_urls.get("scalapack").unwrap(),
            "https://example.com/scalapack.tar.gz"
        );
    }

    #[test]
    fn test_with_dir_and_without() {
        let options = ConfigureOptions::from_args([
            "--with-hdf5-dir=/opt/hdf5",
            "--with-netcdf=0",
            "--with-debugging=no",
            "--download-slepc-configure-arguments=--with-slepc4py",
        ])
        .unwrap();

        assert_eq!(options.with_dir.get("hdf5").unwrap(), &PathBuf::from("/opt/hdf5"));
        assert!(options.is_excluded("netcdf"));
        assert!(!options.debugging);
        assert_eq!(options.slepc_configure_arguments.as_deref(), Some("--with-slepc4py"));
        assert!(options.download.is_empty());
    }

    #[test]
    fn test_invalid_options() {
        assert!(ConfigureOptions::from_args(["--with-debugging=maybe"]).is_err());
        assert!(ConfigureOptions::from_args(["--with-precision=half"]).is_err());
        assert!(ConfigureOptions::from_args(["bare-token"]).is_err());
    }

    #[test]
    fn test_requested_packages_order() {
        let options = ConfigureOptions::from_args([
            "--download-slepc",
            "--with-hdf5-dir=/opt/hdf5",
            "--download-moab",
        ])
        .unwrap();
        assert_eq!(options.requested_packages(), vec!["slepc", "moab", "hdf5"]);
    }

    #[test]
    fn test_install_locations() {
        let mut options = ConfigureOptions::from_args(["PETSC_DIR=/src/petsc", "PETSC_ARCH=arch-test"])
            .unwrap();
        assert_eq!(options.default_install_dir(), PathBuf::from("/src/petsc/arch-test"));
        assert_eq!(
            options.external_packages_dir(),
            PathBuf::from("/src/petsc/arch-test/externalpackages")
        );
        assert!(!options.installs_to_prefix());

        options.apply_args(["--prefix=/opt/petsc"]).unwrap();
        assert_eq!(options.default_install_dir(), PathBuf::from("/opt/petsc"));
        assert!(options.installs_to_prefix());

        options.apply_args(["--package-prefix-hash=/tmp/h"]).unwrap();
        assert!(!options.installs_to_prefix());
    }

    #[test]
    fn test_preset_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arch.toml");
        fs::write(
            &path,
            "configure_options = ['--with-precision=single', '--download-mmg', 'FOPTFLAGS=-g -O']\n",
        )
        .unwrap();

        let options = ConfigureOptions::from_preset(&path).unwrap();
        assert_eq!(options.precision, Precision::Single);
        assert!(options.wants_download("mmg"));
        assert_eq!(options.tools.get("FOPTFLAGS").unwrap(), "-g -O");
    }

    #[test]
    fn test_toolchain_respects_settings() {
        let options = ConfigureOptions::from_args([
            "CC=my-cc",
            "CXX=my-cxx",
            "FC=my-fc",
            "COPTFLAGS=-O3",
            "AR=my-ar",
            "MAKE=my-make",
            "--with-make-np=7",
            "--with-fortran-mangling=caps",
        ])
        .unwrap();
        let toolchain = Toolchain::from_options(&options);

        assert_eq!(toolchain.cc, "my-cc");
        assert_eq!(toolchain.compiler(Language::Cxx), Some("my-cxx"));
        assert_eq!(toolchain.compiler(Language::Fortran), Some("my-fc"));
        assert_eq!(toolchain.cflags, "-O3");
        assert_eq!(toolchain.ar, "my-ar");
        assert_eq!(toolchain.make_jnp(), "my-make -j7");
        assert_eq!(toolchain.fortran_mangling, FortranMangling::Caps);
    }

    #[test]
    fn test_mangling_detected_from_compiled_symbols() {
        let options = ConfigureOptions::from_args(["FC=fake-fc", "FOPTFLAGS=-O2", "AR=fake-ar"]).unwrap();
        let toolchain = Toolchain::from_options(&options);

        let mangling = toolchain.detect_fortran_mangling(|fc, fflags, ar| {
            assert_eq!((fc, fflags, ar), ("fake-fc", "-O2", "fake-ar"));
            Ok(vec!["d1_chk__".to_string()])
        });
        assert_eq!(mangling, FortranMangling::DoubleUnderscore);
        assert_eq!(
            toolchain.detect_fortran_mangling(|_, _, _| Ok(vec!["D1_CHK".to_string()])),
            FortranMangling::Caps
        );
    }

    #[test]
    fn test_mangling_falls_back_when_check_fails() {
        let options = ConfigureOptions::from_args(["FC=fake-fc"]).unwrap();
        let mut toolchain = Toolchain::from_options(&options);

        let failed = toolchain.detect_fortran_mangling(|_, _, _| {
            Err(Error::ToolNotFound("fake-fc".to_string()))
        });
        assert_eq!(failed, FortranMangling::Underscore);
        let unknown = toolchain.detect_fortran_mangling(|_, _, _| Ok(vec!["main".to_string()]));
        assert_eq!(unknown, FortranMangling::Underscore);

        toolchain.fc = None;
        let no_compiler = toolchain.detect_fortran_mangling(|_, _, _| -> Result<Vec<String>> {
            panic!("no compiler to run")
        });
        assert_eq!(no_compiler, FortranMangling::Underscore);
    }

    #[test]
    fn test_configured_mangling_skips_detection() {
        let options = ConfigureOptions::from_args(["FC=/nonexistent/fc", "--with-fortran-mangling=caps"]).unwrap();
        assert_eq!(Toolchain::detect(&options).fortran_mangling, FortranMangling::Caps);
    }

    #[test]
    fn test_check_languages() {
        let options = ConfigureOptions::from_args(["CC=cc", "CXX=c++", "FC=gfortran"]).unwrap();
        let mut toolchain = Toolchain::from_options(&options);
        let mut spec = PackageSpec::new("scalapack", "SCALAPACK", BuildFlavor::Make);
        spec.needs_fortran = true;
        assert!(toolchain.check_languages(&spec).is_ok());

        toolchain.fc = None;
        let err = toolchain.check_languages(&spec).unwrap_err();
        assert!(matches!(err, Error::MissingCompiler { .. }));
    }
}
