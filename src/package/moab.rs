// src/package/moab.rs

//! MOAB, the mesh-oriented database (autotools)

use super::{
    BuildFlavor, DependencySet, FormContext, Language, PackageRecipe, PackageSpec, Precision,
    ProbeFunctions, Requirer,
};
use crate::args::{Arg, ArgumentList};
use crate::error::Result;

/// Optional dependencies that switch a MOAB feature on with `--with-<flag>`
/// only when found: (package key, configure flag)
const OPTIONAL_FEATURES: [(&str, &str); 5] = [
    ("eigen", "eigen3"),
    ("metis", "metis"),
    ("parmetis", "parmetis"),
    ("ptscotch", "scotch"),
    ("zoltan", "zoltan"),
];

#[derive(Debug)]
pub(crate) struct Moab;

impl PackageRecipe for Moab {
    fn spec(&self) -> PackageSpec {
        let mut spec = PackageSpec::new("moab", "MOAB", BuildFlavor::Autotools);
        // June 09, 2017, MOAB 5.0 release tag
        spec.git_commit = Some("c4eed56fd6d2".to_string());
        spec.download = vec![
            "git://https://bitbucket.org/fathomteam/moab.git".to_string(),
            "ftp://ftp.mcs.anl.gov/pub/fathom/moab-5.0.0.tar.gz".to_string(),
        ];
        spec.download_dir_names = vec!["moab".to_string()];
        spec.functions = ProbeFunctions {
            names: vec!["Core".to_string()],
            language: Some(Language::Cxx),
        };
        spec.includes = vec!["moab/Core.hpp".to_string()];
        spec.liblist = vec![
            vec!["libiMesh.a".to_string(), "libMOAB.a".to_string()],
            vec!["libMOAB.a".to_string()],
        ];
        spec.needs_cxx = true;
        spec.precisions = vec![Precision::Single, Precision::Double];
        spec.has_tests = true;
        spec
    }

    fn setup_dependencies(&self, requirer: &mut Requirer<'_>) -> Result<DependencySet> {
        let blaslapack = requirer.require("blaslapack")?;
        let mpi = requirer.require("mpi")?;
        let eigen = requirer.require("eigen")?;
        let hdf5 = requirer.require("hdf5")?;
        let netcdf = requirer.require("netcdf")?;
        let metis = requirer.require("metis")?;
        let parmetis = requirer.require("parmetis")?;
        let ptscotch = requirer.require("ptscotch")?;
        let zoltan = requirer.require("zoltan")?;

        Ok(DependencySet::new(
            vec![mpi, blaslapack],
            vec![eigen, hdf5, netcdf, metis, parmetis, ptscotch, zoltan],
        ))
    }

    fn git_prerequisites(&self) -> &'static [&'static str] {
        &["autoreconf", "libtoolize"]
    }

    fn extend_arguments(&self, ctx: &FormContext<'_>, args: &mut ArgumentList) -> Result<()> {
        if ctx.toolchain.debugging {
            args.push(Arg::enable("debug"));
        } else {
            args.push(Arg::enable("optimize"));
        }

        let mpi = ctx.dependency("mpi")?;
        args.push(Arg::with("mpi", mpi.directory()));

        let blas = ctx.dependency("blaslapack")?.link_string();
        args.push(Arg::with("blas", &blas));
        args.push(Arg::with("lapack", &blas));

        args.push(Arg::enable("tools"));
        args.push(Arg::enable("imesh"));

        for key in ["hdf5", "netcdf"] {
            let dep = ctx.dependency(key)?;
            if dep.found() {
                args.push(Arg::with(key, dep.directory()));
            } else {
                args.push(Arg::without(key));
            }
        }

        for (key, flag) in OPTIONAL_FEATURES {
            let dep = ctx.dependency(key)?;
            if dep.found() {
                args.push(Arg::with(flag, dep.directory()));
            }
        }
        Ok(())
    }
}
