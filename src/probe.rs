// src/probe.rs

//! Locating existing package installs
//!
//! A package counts as found in a prefix when all of its headers exist under
//! `<prefix>/include` (or its multiarch subdirectory) and one of its candidate
//! library sets exists under `<prefix>/lib`, `<prefix>/lib64` or
//! `<prefix>/lib/<triplet>` on Debian-style systems. Static archives are additionally
//! checked for the probe functions by reading their symbol table; archives
//! without a readable symbol table are accepted on presence alone.

use crate::command::{CommandChain, ShellCommand};
use crate::error::{Error, Result};
use crate::mangling::FortranMangling;
use crate::package::{Language, PackageSpec, ProbeFunctions, ProbeState};
use regex::Regex;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Library subdirectories searched inside every prefix
const LIBRARY_DIRS: [&str; 2] = ["lib", "lib64"];

/// Fortran routine compiled to find the mangling; the underscore tells f2c apart
pub const MANGLING_CHECK_ROUTINE: &str = "d1_chk";

const MANGLING_CHECK_TIMEOUT: Duration = Duration::from_secs(60);

/// Debian multiarch triplet of the host (`x86_64-linux-gnu`)
pub fn multiarch_triplet() -> Option<&'static str> {
    if !cfg!(target_os = "linux") {
        return None;
    }
    match std::env::consts::ARCH {
        "x86_64" => Some("x86_64-linux-gnu"),
        "aarch64" => Some("aarch64-linux-gnu"),
        "x86" => Some("i386-linux-gnu"),
        "powerpc64" if cfg!(target_endian = "little") => Some("powerpc64le-linux-gnu"),
        "riscv64" => Some("riscv64-linux-gnu"),
        "s390x" => Some("s390x-linux-gnu"),
        _ => None,
    }
}

fn library_subdirs() -> Vec<String> {
    let mut dirs: Vec<String> = LIBRARY_DIRS.iter().map(|d| d.to_string()).collect();
    if let Some(triplet) = multiarch_triplet() {
        dirs.push(format!("lib/{}", triplet));
    }
    dirs
}

/// Header directories of a prefix, plain `include` first
pub fn include_dirs(dir: &Path) -> Vec<PathBuf> {
    let include = dir.join("include");
    let mut dirs = vec![include.clone()];
    if let Some(triplet) = multiarch_triplet() {
        dirs.push(include.join(triplet));
    }
    dirs
}

/// Inputs for probing one package
#[derive(Debug, Clone)]
pub struct ProbeContext<'a> {
    /// Prefixes in search order; an empty path expands to the standard ones
    pub directories: &'a [PathBuf],
    pub mangling: FortranMangling,
}

/// Prefixes the compiler searches when nothing else is given
pub fn standard_prefixes() -> Vec<PathBuf> {
    ["/usr/local", "/usr", "/opt/local"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

/// Replace empty entries with the standard prefixes, dropping duplicates
pub fn expand_search_directories(directories: &[PathBuf]) -> Vec<PathBuf> {
    let mut expanded: Vec<PathBuf> = Vec::new();
    for dir in directories {
        let entries = if dir.as_os_str().is_empty() {
            standard_prefixes()
        } else {
            vec![dir.clone()]
        };
        for entry in entries {
            if !expanded.contains(&entry) {
                expanded.push(entry);
            }
        }
    }
    expanded
}

/// Probe each prefix in order, first match wins
pub fn probe_directories(spec: &PackageSpec, ctx: &ProbeContext<'_>) -> ProbeState {
    for dir in expand_search_directories(ctx.directories) {
        if let Some(state) = probe_directory(spec, &dir, ctx.mangling) {
            debug!("Found {} in {}", spec.name, dir.display());
            return state;
        }
    }
    debug!("{} not found", spec.name);
    ProbeState::not_found()
}

/// Check a single prefix
pub fn probe_directory(
    spec: &PackageSpec,
    dir: &Path,
    mangling: FortranMangling,
) -> Option<ProbeState> {
    let include = if spec.includes.is_empty() {
        Vec::new()
    } else {
        let include_dir = include_dirs(dir)
            .into_iter()
            .find(|d| spec.includes.iter().all(|h| d.join(h).is_file()))?;
        vec![include_dir]
    };

    let mut state = ProbeState::found_in(dir);
    state.include = include;

    if !spec.liblist.is_empty() {
        let libraries = spec
            .liblist
            .iter()
            .filter_map(|set| find_library_set(dir, set))
            .find(|paths| defines_functions(paths, &spec.functions, mangling))?;
        state.libraries = libraries
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
    } else if spec.includes.is_empty() {
        // Nothing to look for, the prefix has to exist at least
        if !dir.is_dir() {
            return None;
        }
    }

    if let Some(macro_name) = &spec.version_name {
        state.version = read_version(&state.include, &spec.includes, macro_name);
    }
    Some(state)
}

/// Candidate file names for a library given as `libfoo.a`
fn library_variants(name: &str) -> Vec<String> {
    let stem = name.strip_suffix(".a").unwrap_or(name);
    let mut variants = vec![name.to_string()];
    if stem != name {
        variants.push(format!("{}.so", stem));
        variants.push(format!("{}.so.*", stem));
        variants.push(format!("{}.dylib", stem));
    }
    variants
}

/// Find one library inside a prefix
pub fn find_library(dir: &Path, name: &str) -> Option<PathBuf> {
    for libdir in library_subdirs() {
        let base = glob::Pattern::escape(&dir.join(libdir).to_string_lossy());
        for variant in library_variants(name) {
            let pattern = format!("{}/{}", base, variant);
            let Ok(paths) = glob::glob(&pattern) else {
                continue;
            };
            if let Some(path) = paths.filter_map(|p| p.ok()).find(|p| p.is_file()) {
                return Some(path);
            }
        }
    }
    None
}

/// All libraries of one candidate set, or `None` if any is missing
pub fn find_library_set(dir: &Path, set: &[String]) -> Option<Vec<PathBuf>> {
    set.iter().map(|name| find_library(dir, name)).collect()
}

/// Symbol table of a static archive
pub fn archive_symbols(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let mut archive = ar::Archive::new(file);
    let symbols = archive
        .symbols()
        .map_err(|e| Error::ParseError(format!("{}: {}", path.display(), e)))?;
    Ok(symbols
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect())
}

/// Compile the mangling check routine with `fc` and return its symbols
///
/// The object is wrapped in a static archive so the symbol table can be read
/// the same way probed libraries are.
pub fn fortran_check_symbols(fc: &str, fflags: &str, ar: &str) -> Result<Vec<String>> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("manglingcheck.f");
    fs::write(
        &source,
        format!(
            "      subroutine {}()\n      return\n      end\n",
            MANGLING_CHECK_ROUTINE
        ),
    )?;
    let object = dir.path().join("manglingcheck.o");
    let archive = dir.path().join("libmanglingcheck.a");

    CommandChain::of(
        ShellCommand::new(fc)
            .args(fflags.split_whitespace())
            .arg("-c")
            .path(&source)
            .arg("-o")
            .path(&object),
    )
    .then(ShellCommand::new(ar).arg("crs").path(&archive).path(&object))
    .current_dir(dir.path())
    .timeout(MANGLING_CHECK_TIMEOUT)
    .execute()?;

    archive_symbols(&archive)
}

/// Mangling implied by the symbols the check routine compiled to
pub fn mangling_from_symbols<I, S>(symbols: I) -> Option<FortranMangling>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symbols
        .into_iter()
        .find_map(|s| FortranMangling::detect(MANGLING_CHECK_ROUTINE, s.as_ref()))
}

/// Whether `symbol` is the compiled form of `function` in `language`
pub fn symbol_matches(function: &str, symbol: &str, language: Option<Language>) -> bool {
    // Mach-O adds a leading underscore; C++ manglings start with `_Z` anyway
    let symbol = if symbol.starts_with("_Z") {
        symbol
    } else {
        symbol.strip_prefix('_').filter(|s| !s.is_empty()).unwrap_or(symbol)
    };
    match language {
        Some(Language::Fortran) => FortranMangling::candidates(function)
            .iter()
            .any(|candidate| candidate == symbol),
        Some(Language::Cxx) | Some(Language::Sycl) => {
            symbol.starts_with("_Z") && symbol.contains(&format!("{}{}", function.len(), function))
        }
        Some(Language::C) | None => symbol == function,
    }
}

fn defines_functions(
    libraries: &[PathBuf],
    functions: &ProbeFunctions,
    mangling: FortranMangling,
) -> bool {
    if functions.names.is_empty() {
        return true;
    }

    let mut symbols = Vec::new();
    for lib in libraries.iter().filter(|p| p.extension().is_some_and(|e| e == "a")) {
        match archive_symbols(lib) {
            Ok(found) => symbols.extend(found),
            Err(e) => debug!("No symbol table in {}: {}", lib.display(), e),
        }
    }
    if symbols.is_empty() {
        return true;
    }

    functions.names.iter().all(|function| {
        let Some(symbol) = symbols
            .iter()
            .find(|s| symbol_matches(function, s, functions.language))
        else {
            debug!("{} not defined in {:?}", function, libraries);
            return false;
        };
        if functions.language == Some(Language::Fortran) {
            if let Some(found) = FortranMangling::detect(function, symbol) {
                if found != mangling && found.mangle(function) != mangling.mangle(function) {
                    warn!(
                        "{} uses {} Fortran mangling, the toolchain is configured for {}",
                        function, found, mangling
                    );
                }
            }
        }
        true
    })
}

/// Read `#define <macro> <value>` from the package headers
pub fn read_version(include_dirs: &[PathBuf], headers: &[String], macro_name: &str) -> Option<String> {
    let pattern = format!(r"#define\s+{}\s+(\S+)", regex::escape(macro_name));
    let re = Regex::new(&pattern).ok()?;
    for dir in include_dirs {
        for header in headers {
            let Ok(content) = fs::read_to_string(dir.join(header)) else {
                continue;
            };
            if let Some(caps) = re.captures(&content) {
                return Some(caps[1].trim_matches('"').to_string());
            }
        }
    }
    None
}

/// Library name without `lib` prefix and archive/shared suffix
fn library_name(file_name: &str) -> &str {
    let name = file_name.strip_prefix("lib").unwrap_or(file_name);
    if let Some(stem) = name.strip_suffix(".a").or_else(|| name.strip_suffix(".dylib")) {
        return stem;
    }
    match name.find(".so") {
        Some(pos) => &name[..pos],
        None => name,
    }
}

/// Render libraries as `-L<dir> -l<name>`, each `-L` once
pub fn link_string(libraries: &[String]) -> String {
    let mut flags: Vec<String> = Vec::new();
    for lib in libraries {
        if lib.starts_with('-') {
            if !flags.contains(lib) {
                flags.push(lib.clone());
            }
            continue;
        }
        let path = Path::new(lib);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            let flag = format!("-L{}", dir.display());
            if !flags.contains(&flag) {
                flags.push(flag);
            }
        }
        let file_name = path.file_name().map(|f| f.to_string_lossy()).unwrap_or_default();
        flags.push(format!("-l{}", library_name(&file_name)));
    }
    flags.join(" ")
}

/// Render include directories as `-I<dir>`
pub fn include_string(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| format!("-I{}", d.display()))
        .collect::<Vec<_>>()
        .join(" ")
}
