// tests/common/mod.rs

//! Shared helpers for integration tests: pinned options and fake installs.

#![allow(dead_code)]

use extpkg::ConfigureOptions;
use std::fs;
use std::path::{Path, PathBuf};

/// Options rooted at `petsc_dir` with every tool pinned, plus `extra`
pub fn options(petsc_dir: &Path, extra: &[String]) -> ConfigureOptions {
    let mut options = ConfigureOptions::from_args([
        "PETSC_ARCH=arch-test",
        "CC=mpicc",
        "CXX=mpicxx",
        "FC=mpif90",
        "MAKE=make",
        "AR=ar",
        "RANLIB=ranlib",
        "COPTFLAGS=-O2",
        "CXXOPTFLAGS=-O2",
        "FOPTFLAGS=-O2",
        "LDFLAGS=",
        "--with-make-np=2",
    ])
    .unwrap();
    options.petsc_dir = petsc_dir.to_path_buf();
    options.apply_args(extra).unwrap();
    options
}

/// A prefix holding empty `lib/<lib>` and `include/<header>` files
pub fn fake_prefix(root: &Path, libs: &[&str], headers: &[&str]) -> PathBuf {
    for lib in libs {
        touch(&root.join("lib").join(lib));
    }
    for header in headers {
        touch(&root.join("include").join(header));
    }
    root.to_path_buf()
}

pub fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

/// Unpacked ScaLAPACK sources whose makefile only produces an empty library
///
/// `cleanlib` always fails so the tolerated cleanup path is exercised.
pub fn fake_scalapack_source(petsc_dir: &Path) -> PathBuf {
    let source = petsc_dir
        .join("arch-test")
        .join("externalpackages")
        .join("petsc-pkg-scalapack");
    fs::create_dir_all(&source).unwrap();
    fs::write(
        source.join("Makefile.parallel"),
        "include SLmake.inc\n\ncleanlib:\n\tfalse\n\nlib:\n\ttouch $(SCALAPACKLIB)\n",
    )
    .unwrap();
    source
}

/// MPI and BLAS/LAPACK prefixes as configure arguments
pub fn mpi_and_blas(root: &Path) -> Vec<String> {
    let mpi = fake_prefix(&root.join("mpi"), &["libmpi.a"], &["mpi.h"]);
    let blas = fake_prefix(&root.join("blas"), &["libopenblas.a"], &[]);
    vec![
        format!("--with-mpi-dir={}", mpi.display()),
        format!("--with-blaslapack-dir={}", blas.display()),
    ]
}

pub fn have(program: &str) -> bool {
    which::which(program).is_ok()
}
