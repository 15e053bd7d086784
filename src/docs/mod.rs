// src/docs/mod.rs

//! Documentation build support: version strings and builder hooks

pub mod hooks;
pub mod version;

pub use hooks::{Builder, DocsApp, RecordingApp, TeamTableGenerator, setup};
pub use version::{DocVersion, VersionHeader, git_describe};

use crate::error::Result;
use std::path::Path;

pub const PROJECT: &str = "PETSc";
pub const AUTHOR: &str = "The PETSc Development Team";

/// Version strings for the docs under `<root>/doc`
///
/// Reads `<root>/include/petscversion.h`; development builds describe the
/// checkout at `root`.
pub fn project_version(root: &Path) -> Result<DocVersion> {
    let header = VersionHeader::from_file(&root.join("include").join("petscversion.h"))?;
    header.doc_version(|| git_describe(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_project_version_reads_header() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("include")).unwrap();
        fs::write(
            tmp.path().join("include/petscversion.h"),
            "#define PETSC_VERSION_RELEASE 1\n#define PETSC_VERSION_MAJOR 3\n\
             #define PETSC_VERSION_MINOR 16\n#define PETSC_VERSION_SUBMINOR 0\n\
             #define PETSC_VERSION_PATCH 0\n",
        )
        .unwrap();

        let version = project_version(tmp.path()).unwrap();
        assert_eq!(version.version, "3.16");
        assert_eq!(version.release, "3.16.0");
    }

    #[test]
    fn test_missing_header() {
        let tmp = TempDir::new().unwrap();
        assert!(project_version(tmp.path()).is_err());
    }
}
