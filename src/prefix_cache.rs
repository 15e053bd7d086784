// src/prefix_cache.rs

//! Shared install prefixes keyed by a hash of the build
//!
//! With `--package-prefix-hash=<root>` each downloaded package installs into
//! `<root>/<digest>`, where the digest covers the package key, the version pin
//! and the rendered configure arguments. A marker file written after a
//! successful install lets later runs, from any host tree, reuse the prefix.

use crate::args::ArgumentList;
use crate::error::Result;
use crate::package::PackageSpec;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File written into a hashed prefix once its install completed
pub const COMPLETE_MARKER: &str = ".extpkg-complete";

/// Default root of the shared prefixes: `~/petsc-hash-pkgs`
pub fn default_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("petsc-hash-pkgs")
}

/// Hashed install prefixes under one root
#[derive(Debug, Clone)]
pub struct PrefixCache {
    root: PathBuf,
}

impl PrefixCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Hex SHA-256 identifying one build of `spec` with `args`
    pub fn digest(spec: &PackageSpec, args: &ArgumentList) -> String {
        let mut hasher = Sha256::new();
        hasher.update(spec.key.as_bytes());
        hasher.update([0]);
        hasher.update(spec.git_commit.as_deref().unwrap_or("").as_bytes());
        for arg in args.render() {
            hasher.update([0]);
            hasher.update(arg.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Install prefix for one build
    pub fn prefix_for(&self, spec: &PackageSpec, args: &ArgumentList) -> PathBuf {
        self.root.join(Self::digest(spec, args))
    }

    pub fn is_complete(&self, prefix: &Path) -> bool {
        prefix.join(COMPLETE_MARKER).is_file()
    }

    /// Record that the install into `prefix` finished
    pub fn mark_complete(&self, spec: &PackageSpec, prefix: &Path) -> Result<()> {
        fs::create_dir_all(prefix)?;
        let contents = format!(
            "{} {}\n",
            spec.key,
            spec.git_commit.as_deref().unwrap_or("-")
        );
        fs::write(prefix.join(COMPLETE_MARKER), contents)?;
        debug!("Marked {} complete in {}", spec.name, prefix.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Arg;
    use crate::package::BuildFlavor;
    use tempfile::TempDir;

    fn spec(commit: &str) -> PackageSpec {
        let mut spec = PackageSpec::new("mmg", "mmg", BuildFlavor::CMake);
        spec.git_commit = Some(commit.to_string());
        spec
    }

    fn args(values: &[&str]) -> ArgumentList {
        values.iter().map(|v| Arg::raw(*v)).collect()
    }

    #[test]
    fn test_digest_is_deterministic() {
        let a = PrefixCache::digest(&spec("abc"), &args(&["-DUSE_VTK=OFF"]));
        let b = PrefixCache::digest(&spec("abc"), &args(&["-DUSE_VTK=OFF"]));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_digest_changes_with_pin_and_arguments() {
        let base = PrefixCache::digest(&spec("abc"), &args(&["-DUSE_VTK=OFF"]));
        assert_ne!(base, PrefixCache::digest(&spec("abd"), &args(&["-DUSE_VTK=OFF"])));
        assert_ne!(base, PrefixCache::digest(&spec("abc"), &args(&["-DUSE_VTK=ON"])));
        // token boundaries are part of the identity
        assert_ne!(
            PrefixCache::digest(&spec("abc"), &args(&["ab", "c"])),
            PrefixCache::digest(&spec("abc"), &args(&["a", "bc"]))
        );
    }

    #[test]
    fn test_completion_marker() {
        let tmp = TempDir::new().unwrap();
        let cache = PrefixCache::new(tmp.path());
        let prefix = cache.prefix_for(&spec("abc"), &ArgumentList::new());

        assert!(prefix.starts_with(tmp.path()));
        assert!(!cache.is_complete(&prefix));
        cache.mark_complete(&spec("abc"), &prefix).unwrap();
        assert!(cache.is_complete(&prefix));
    }

    #[test]
    fn test_default_root() {
        assert!(default_root().ends_with("petsc-hash-pkgs"));
    }
}
