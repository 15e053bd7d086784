// src/lib.rs

//! extpkg: external packages for the PETSc configure system
//!
//! Each external dependency (MOAB, mmg, ScaLAPACK, SLEPc and the packages
//! they need) is a [`package::PackageRecipe`] in a [`package::Catalog`]. A
//! configure run ([`session::ConfigureSession`]) instantiates the requested
//! packages in a [`registry::PackageRegistry`], declares their dependencies,
//! orders them with [`graph::DependencyGraph`] and then probes for or builds
//! each one.
//!
//! # Architecture
//!
//! - Arguments: typed [`args::Arg`] tokens, base lists per build flavor
//! - Install: [`install::InstallPlan`]s of tolerated and fatal shell steps
//! - Toolchain: compiler/linker stages such as the SYCL ones in [`toolchain`]
//! - Docs: version strings and builder hooks for the documentation build

pub mod args;
pub mod buildlog;
pub mod command;
pub mod config;
pub mod docs;
mod error;
pub mod fetch;
pub mod graph;
pub mod install;
pub mod mangling;
pub mod package;
pub mod prefix_cache;
pub mod probe;
pub mod registry;
pub mod session;
pub mod toolchain;

pub use config::{ConfigureOptions, Toolchain};
pub use error::{Error, Result};
pub use package::{Package, PackageId, PackageSpec, PackageState};
pub use registry::PackageRegistry;
pub use session::ConfigureSession;
