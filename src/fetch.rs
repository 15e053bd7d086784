// src/fetch.rs

//! Downloading package sources
//!
//! Download locations are tried in order and the first one that works wins.
//! A `git://<url>` location is cloned and checked out at the pinned commit;
//! anything else is a gzipped tarball fetched over HTTP(S) (or read from a
//! `file://` URL) and unpacked into the external packages directory.

use crate::command::{CommandChain, ShellCommand};
use crate::error::{Error, Result};
use crate::package::PackageSpec;
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tar::Archive;
use tracing::{debug, info, warn};
use url::Url;

/// Timeout for HTTP requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for `git clone`
const CLONE_TIMEOUT: Duration = Duration::from_secs(1800);

/// Where a package source can be obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Repository to clone, from a `git://` prefixed location
    Git(String),
    /// Gzipped tarball
    Archive(Url),
}

impl SourceLocation {
    pub fn parse(location: &str) -> Result<Self> {
        if let Some(repo) = location.strip_prefix("git://") {
            return Ok(Self::Git(repo.to_string()));
        }
        let url = Url::parse(location)
            .map_err(|e| Error::DownloadError(format!("invalid download URL {}: {}", location, e)))?;
        Ok(Self::Archive(url))
    }
}

/// Source directory name a git checkout is cloned into
pub fn git_dir_name(spec: &PackageSpec) -> String {
    format!("git.{}", spec.key)
}

/// An already unpacked source tree for `spec` under `root`, if any
pub fn existing_source(spec: &PackageSpec, root: &Path) -> Option<PathBuf> {
    let mut names: Vec<String> = vec![git_dir_name(spec)];
    names.extend(spec.download_dir_names.iter().cloned());
    names.push(spec.key.clone());
    names
        .iter()
        .map(|name| root.join(name))
        .find(|dir| dir.is_dir())
}

/// Fetches package sources into one directory
pub struct Fetcher {
    root: PathBuf,
    client: Option<Client>,
}

impl Fetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            client: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Try every location in order, returning the unpacked source directory
    pub fn fetch(&mut self, spec: &PackageSpec, locations: &[String]) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let mut failures = Vec::new();

        for location in locations {
            info!("Trying to download {} for {}", location, spec.name);
            let attempt = SourceLocation::parse(location).and_then(|source| match source {
                SourceLocation::Git(repo) => self.clone_git(spec, &repo),
                SourceLocation::Archive(url) => self.fetch_archive(spec, &url),
            });
            match attempt {
                Ok(dir) => {
                    info!("Downloaded {} into {}", spec.name, dir.display());
                    return Ok(dir);
                }
                Err(e) => {
                    warn!("Download of {} from {} failed: {}", spec.name, location, e);
                    failures.push(format!("  {}: {}", location, e));
                }
            }
        }

        Err(Error::DownloadError(format!(
            "Unable to download {} from any location:\n{}",
            spec.name,
            failures.join("\n")
        )))
    }

    fn clone_git(&self, spec: &PackageSpec, repo: &str) -> Result<PathBuf> {
        which::which("git").map_err(|_| Error::ToolNotFound("git".to_string()))?;
        let dest = self.root.join(git_dir_name(spec));
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }

        let mut chain = CommandChain::of(
            ShellCommand::new("git").arg("clone").arg(repo).path(&dest),
        )
        .timeout(CLONE_TIMEOUT);
        if let Some(commit) = &spec.git_commit {
            chain = chain.then(
                ShellCommand::new("git")
                    .arg("-C")
                    .path(&dest)
                    .args(["checkout", "-f", commit.as_str()]),
            );
        }
        if let Err(e) = chain.execute() {
            let _ = fs::remove_dir_all(&dest);
            return Err(e);
        }
        Ok(dest)
    }

    fn client(&mut self) -> Result<&Client> {
        if self.client.is_none() {
            let client = Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;
            self.client = Some(client);
        }
        self.client
            .as_ref()
            .ok_or_else(|| Error::DownloadError("HTTP client unavailable".to_string()))
    }

    fn open(&mut self, url: &Url) -> Result<Box<dyn Read>> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| Error::DownloadError(format!("invalid file URL {}", url)))?;
                Ok(Box::new(File::open(path)?))
            }
            "http" | "https" => {
                let response = self
                    .client()?
                    .get(url.as_str())
                    .send()
                    .map_err(|e| Error::DownloadError(format!("{}: {}", url, e)))?;
                if !response.status().is_success() {
                    return Err(Error::DownloadError(format!(
                        "{}: HTTP {}",
                        url,
                        response.status()
                    )));
                }
                Ok(Box::new(response))
            }
            other => Err(Error::NotSupported(format!("{} downloads", other))),
        }
    }

    fn fetch_archive(&mut self, spec: &PackageSpec, url: &Url) -> Result<PathBuf> {
        let name = url.path().rsplit('/').next().unwrap_or_default().to_string();
        if !(name.ends_with(".tar.gz") || name.ends_with(".tgz")) {
            return Err(Error::NotSupported(format!("archive format of {}", name)));
        }

        let reader = self.open(url)?;
        let staging = tempfile::Builder::new()
            .prefix(".extpkg-unpack-")
            .tempdir_in(&self.root)?;
        unpack_tar_gz(reader, staging.path())?;

        let top = single_top_level_dir(staging.path())?;
        let dir_name = spec
            .download_dir_names
            .first()
            .cloned()
            .unwrap_or_else(|| spec.key.clone());
        let dest = self.root.join(dir_name);
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }
        fs::rename(&top, &dest)?;
        Ok(dest)
    }
}

/// Unpack a gzipped tarball into `dest`
pub fn unpack_tar_gz(reader: impl Read, dest: &Path) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    archive
        .unpack(dest)
        .map_err(|e| Error::DownloadError(format!("Failed to unpack archive: {}", e)))
}

/// The one directory a source tarball unpacks to, or `dir` itself
fn single_top_level_dir(dir: &Path) -> io::Result<PathBuf> {
    let entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    match entries.as_slice() {
        [only] if only.is_dir() => {
            debug!("Archive top-level directory {}", only.display());
            Ok(only.clone())
        }
        _ => Ok(dir.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::BuildFlavor;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn make_tarball(path: &Path) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let data = b"lib:\n\ttouch libscalapack.a\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "pkg-scalapack-v2/Makefile.parallel", &data[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn spec() -> PackageSpec {
        let mut spec = PackageSpec::new("scalapack", "SCALAPACK", BuildFlavor::Make);
        spec.download_dir_names = vec!["petsc-pkg-scalapack".to_string()];
        spec
    }

    #[test]
    fn test_parse_locations() {
        assert_eq!(
            SourceLocation::parse("git://https://github.com/prj-/mmg.git").unwrap(),
            SourceLocation::Git("https://github.com/prj-/mmg.git".to_string())
        );
        assert!(matches!(
            SourceLocation::parse("https://example.com/a.tar.gz").unwrap(),
            SourceLocation::Archive(_)
        ));
        assert!(SourceLocation::parse("not a url").is_err());
    }

    #[test]
    fn test_fetch_local_archive() {
        let tmp = TempDir::new().unwrap();
        let tarball = tmp.path().join("scalapack.tar.gz");
        make_tarball(&tarball);
        let url = Url::from_file_path(&tarball).unwrap().to_string();

        let mut fetcher = Fetcher::new(tmp.path().join("externalpackages"));
        let dir = fetcher.fetch(&spec(), &[url]).unwrap();

        assert_eq!(dir, tmp.path().join("externalpackages/petsc-pkg-scalapack"));
        assert!(dir.join("Makefile.parallel").is_file());
        assert_eq!(existing_source(&spec(), fetcher.root()), Some(dir));
    }

    #[test]
    fn test_first_success_wins_and_failures_are_listed() {
        let tmp = TempDir::new().unwrap();
        let tarball = tmp.path().join("scalapack.tar.gz");
        make_tarball(&tarball);
        let good = Url::from_file_path(&tarball).unwrap().to_string();
        let missing = Url::from_file_path(tmp.path().join("missing.tar.gz"))
            .unwrap()
            .to_string();

        let mut fetcher = Fetcher::new(tmp.path().join("ext"));
        assert!(fetcher.fetch(&spec(), &[missing.clone(), good]).is_ok());

        let err = fetcher
            .fetch(&spec(), &[missing, "ftp://ftp.example.com/x.tar.gz".to_string()])
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("missing.tar.gz"));
        assert!(message.contains("ftp://ftp.example.com/x.tar.gz"));
    }
}
