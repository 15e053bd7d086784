// src/package/upstream.rs

//! Packages this layer only locates, never builds
//!
//! These are the prerequisites of the downloadable packages: MPI, BLAS/LAPACK,
//! the partitioners and I/O libraries. They are found in a prefix, provided by
//! the system (`libm`, the Fortran runtime) or located on `PATH` (python).

use super::{
    BuildFlavor, DependencySet, FormContext, Language, PackageRecipe, PackageSpec, ProbeFunctions,
    ProbeState, Requirer,
};
use crate::args::ArgumentList;
use crate::error::{Error, Result};
use crate::install::InstallPlan;
use crate::probe::{self, ProbeContext};
use std::path::Path;
use std::sync::Arc;

/// How an upstream package is located
#[derive(Debug, Clone, Copy)]
enum Discovery {
    /// Headers and libraries under an install prefix
    Prefix,
    /// Always available, linked with these flags
    System(&'static [&'static str]),
    /// An executable on `PATH`, first name found wins
    Program(&'static [&'static str]),
}

#[derive(Debug)]
pub(crate) struct Upstream {
    key: &'static str,
    name: &'static str,
    includes: &'static [&'static str],
    liblist: &'static [&'static [&'static str]],
    functions: &'static [&'static str],
    language: Option<Language>,
    deps: &'static [&'static str],
    odeps: &'static [&'static str],
    discovery: Discovery,
}

impl Upstream {
    const fn prefix(key: &'static str, name: &'static str) -> Self {
        Self {
            key,
            name,
            includes: &[],
            liblist: &[],
            functions: &[],
            language: None,
            deps: &[],
            odeps: &[],
            discovery: Discovery::Prefix,
        }
    }
}

const UPSTREAM: &[Upstream] = &[
    Upstream {
        includes: &["mpi.h"],
        liblist: &[&["libmpi.a"]],
        functions: &["MPI_Init"],
        language: Some(Language::C),
        ..Upstream::prefix("mpi", "MPI")
    },
    Upstream {
        liblist: &[
            &["libopenblas.a"],
            &["libflexiblas.a"],
            &["liblapack.a", "libblas.a"],
        ],
        functions: &["dgetrs"],
        language: Some(Language::Fortran),
        ..Upstream::prefix("blaslapack", "BlasLapack")
    },
    Upstream {
        includes: &["hdf5.h"],
        liblist: &[&["libhdf5_hl.a", "libhdf5.a"], &["libhdf5.a"]],
        odeps: &["mpi"],
        ..Upstream::prefix("hdf5", "HDF5")
    },
    Upstream {
        includes: &["netcdf.h"],
        liblist: &[&["libnetcdf.a"]],
        odeps: &["hdf5"],
        ..Upstream::prefix("netcdf", "NetCDF")
    },
    Upstream {
        includes: &["eigen3/Eigen/Core"],
        ..Upstream::prefix("eigen", "Eigen")
    },
    Upstream {
        includes: &["metis.h"],
        liblist: &[&["libmetis.a"]],
        ..Upstream::prefix("metis", "METIS")
    },
    Upstream {
        includes: &["parmetis.h"],
        liblist: &[&["libparmetis.a"]],
        deps: &["mpi", "metis"],
        ..Upstream::prefix("parmetis", "ParMETIS")
    },
    Upstream {
        includes: &["ptscotch.h"],
        liblist: &[
            &[
                "libptesmumps.a",
                "libptscotchparmetis.a",
                "libptscotch.a",
                "libptscotcherr.a",
                "libesmumps.a",
                "libscotch.a",
                "libscotcherr.a",
            ],
            &["libptscotch.a", "libptscotcherr.a", "libscotch.a", "libscotcherr.a"],
        ],
        deps: &["mpi"],
        ..Upstream::prefix("ptscotch", "PTScotch")
    },
    Upstream {
        includes: &["zoltan.h"],
        liblist: &[&["libzoltan.a"]],
        deps: &["mpi"],
        odeps: &["parmetis", "ptscotch"],
        ..Upstream::prefix("zoltan", "Zoltan")
    },
    Upstream {
        discovery: Discovery::System(&["-lm"]),
        ..Upstream::prefix("mathlib", "mathlib")
    },
    Upstream {
        discovery: Discovery::System(&["-lgfortran"]),
        ..Upstream::prefix("flibs", "flibs")
    },
    Upstream {
        discovery: Discovery::Program(&["python3", "python"]),
        ..Upstream::prefix("python", "Python")
    },
];

/// Recipes for every upstream package
pub(crate) fn builtins() -> Vec<Arc<dyn PackageRecipe>> {
    UPSTREAM
        .iter()
        .map(|u| Arc::new(UpstreamRecipe(u)) as Arc<dyn PackageRecipe>)
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug)]
struct UpstreamRecipe(&'static Upstream);

impl PackageRecipe for UpstreamRecipe {
    fn spec(&self) -> PackageSpec {
        let u = self.0;
        let mut spec = PackageSpec::new(u.key, u.name, BuildFlavor::Autotools);
        spec.includes = strings(u.includes);
        spec.liblist = u.liblist.iter().map(|set| strings(set)).collect();
        spec.functions = ProbeFunctions {
            names: strings(u.functions),
            language: u.language,
        };
        spec
    }

    fn setup_dependencies(&self, requirer: &mut Requirer<'_>) -> Result<DependencySet> {
        let deps = self
            .0
            .deps
            .iter()
            .map(|key| requirer.require(key))
            .collect::<Result<Vec<_>>>()?;
        let odeps = self
            .0
            .odeps
            .iter()
            .map(|key| requirer.require(key))
            .collect::<Result<Vec<_>>>()?;
        Ok(DependencySet::new(deps, odeps))
    }

    fn install_plan(&self, ctx: &FormContext<'_>, _args: &ArgumentList) -> Result<InstallPlan> {
        Err(Error::NotSupported(format!(
            "{} cannot be downloaded here, point --with-{}-dir at an existing install",
            ctx.package.name(),
            ctx.package.key()
        )))
    }

    fn probe(&self, spec: &PackageSpec, ctx: &ProbeContext<'_>) -> ProbeState {
        match self.0.discovery {
            Discovery::Prefix => probe::probe_directories(spec, ctx),
            Discovery::System(flags) => ProbeState {
                found: true,
                libraries: strings(flags),
                ..ProbeState::default()
            },
            Discovery::Program(names) => {
                let Some(executable) = names.iter().find_map(|n| which::which(n).ok()) else {
                    return ProbeState::not_found();
                };
                // <prefix>/bin/python3 -> <prefix>
                let prefix = executable
                    .parent()
                    .and_then(Path::parent)
                    .map(Path::to_path_buf);
                ProbeState {
                    found: true,
                    directory: prefix,
                    executable: Some(executable),
                    ..ProbeState::default()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mangling::FortranMangling;

    fn recipe(key: &str) -> UpstreamRecipe {
        UpstreamRecipe(UPSTREAM.iter().find(|u| u.key == key).unwrap())
    }

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<&str> = UPSTREAM.iter().map(|u| u.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), UPSTREAM.len());
    }

    #[test]
    fn test_system_library_always_found() {
        let mathlib = recipe("mathlib");
        let ctx = ProbeContext {
            directories: &[],
            mangling: FortranMangling::Underscore,
        };
        let state = mathlib.probe(&mathlib.spec(), &ctx);
        assert!(state.found);
        assert_eq!(state.libraries, vec!["-lm"]);
    }

    #[test]
    fn test_eigen_is_header_only() {
        let spec = recipe("eigen").spec();
        assert!(spec.liblist.is_empty());
        assert_eq!(spec.includes, vec!["eigen3/Eigen/Core"]);
        assert!(!spec.is_downloadable());
    }

    #[test]
    fn test_blaslapack_probes_fortran_symbols() {
        let spec = recipe("blaslapack").spec();
        assert_eq!(spec.functions.language, Some(Language::Fortran));
        assert_eq!(spec.liblist[0], vec!["libopenblas.a"]);
    }
}
