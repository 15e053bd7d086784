// src/docs/version.rs

//! Documentation version from `petscversion.h`

use crate::command::{CommandChain, ShellCommand};
use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Numbers read from the version header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionHeader {
    pub release: bool,
    pub major: u32,
    pub minor: u32,
    pub subminor: u32,
    pub patch: u32,
}

/// `version` (short) and `release` (full) strings shown in the docs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocVersion {
    pub version: String,
    pub release: String,
}

fn field(buf: &str, name: &str) -> Result<u32> {
    let pattern = format!(r"#define\s+PETSC_VERSION_{}\s+([0-9]+)", name);
    let re = Regex::new(&pattern).map_err(|e| Error::ParseError(e.to_string()))?;
    let caps = re
        .captures(buf)
        .ok_or_else(|| Error::ParseError(format!("PETSC_VERSION_{} not found", name)))?;
    caps[1]
        .parse()
        .map_err(|_| Error::ParseError(format!("PETSC_VERSION_{} is not a number", name)))
}

impl VersionHeader {
    pub fn parse(buf: &str) -> Result<Self> {
        Ok(Self {
            release: field(buf, "RELEASE")? != 0,
            major: field(buf, "MAJOR")?,
            minor: field(buf, "MINOR")?,
            subminor: field(buf, "SUBMINOR")?,
            patch: field(buf, "PATCH")?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let buf = fs::read_to_string(path)
            .map_err(|e| Error::IoError(format!("{}: {}", path.display(), e)))?;
        Self::parse(&buf)
    }

    /// Release builds use the header numbers, development builds `describe`
    pub fn doc_version(&self, describe: impl FnOnce() -> Result<String>) -> Result<DocVersion> {
        if self.release {
            Ok(DocVersion {
                version: format!("{}.{}", self.major, self.minor),
                release: format!("{}.{}.{}", self.major, self.minor, self.subminor),
            })
        } else {
            let described = describe()?;
            Ok(DocVersion {
                version: described.clone(),
                release: described,
            })
        }
    }
}

/// `git describe --always` in `dir`
pub fn git_describe(dir: &Path) -> Result<String> {
    let output = CommandChain::of(ShellCommand::new("git").args(["describe", "--always"]))
        .current_dir(dir)
        .timeout(Duration::from_secs(60))
        .execute()?;
    Ok(output.stdout.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "\
#if !defined(PETSCVERSION_H)
#define PETSCVERSION_H

#define PETSC_VERSION_RELEASE    1
#define PETSC_VERSION_MAJOR      3
#define PETSC_VERSION_MINOR      15
#define PETSC_VERSION_SUBMINOR   2
#define PETSC_VERSION_PATCH      0
#define PETSC_VERSION_DATE       \"Jul 10, 2021\"
";

    #[test]
    fn test_parse_header() {
        let header = VersionHeader::parse(HEADER).unwrap();
        assert!(header.release);
        assert_eq!((header.major, header.minor, header.subminor), (3, 15, 2));
        assert_eq!(header.patch, 0);
    }

    #[test]
    fn test_release_version() {
        let header = VersionHeader::parse(HEADER).unwrap();
        let version = header
            .doc_version(|| panic!("release builds do not describe"))
            .unwrap();
        assert_eq!(version.version, "3.15");
        assert_eq!(version.release, "3.15.2");
    }

    #[test]
    fn test_development_version() {
        let buf = HEADER.replace("RELEASE    1", "RELEASE    0");
        let header = VersionHeader::parse(&buf).unwrap();
        let version = header
            .doc_version(|| Ok("v3.15.2-431-g1b2c3d4".to_string()))
            .unwrap();
        assert_eq!(version.version, "v3.15.2-431-g1b2c3d4");
        assert_eq!(version.release, version.version);
    }

    #[test]
    fn test_missing_field() {
        let err = VersionHeader::parse("#define PETSC_VERSION_MAJOR 3\n").unwrap_err();
        assert!(err.to_string().contains("PETSC_VERSION_RELEASE"));
    }
}
