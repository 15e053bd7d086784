// src/package/mmg.rs

//! mmg, anisotropic remeshing (CMake)

use super::{
    BuildFlavor, DependencySet, FormContext, PackageRecipe, PackageSpec, Precision,
    ProbeFunctions, Requirer,
};
use crate::args::{Arg, ArgumentList, CMakeType};
use crate::error::Result;

const COMMIT: &str = "501a243bac53f6af8e5e1f278ead64a61c7d5080";

#[derive(Debug)]
pub(crate) struct Mmg;

impl PackageRecipe for Mmg {
    fn spec(&self) -> PackageSpec {
        let mut spec = PackageSpec::new("mmg", "mmg", BuildFlavor::CMake);
        spec.git_commit = Some(COMMIT.to_string());
        spec.download = vec![
            "git://https://github.com/prj-/mmg.git".to_string(),
            format!("https://github.com/prj-/mmg/archive/{}.tar.gz", COMMIT),
        ];
        spec.version_name = Some("MMG_VERSION_RELEASE".to_string());
        spec.includes = vec!["mmg/libmmg.h".to_string()];
        spec.liblist = vec![vec!["libmmg.a".to_string(), "libmmg3d.a".to_string()]];
        spec.functions = ProbeFunctions {
            names: vec!["MMG5_paramUsage1".to_string()],
            language: None,
        };
        spec.precisions = vec![Precision::Double];
        spec
    }

    fn setup_dependencies(&self, requirer: &mut Requirer<'_>) -> Result<DependencySet> {
        let mathlib = requirer.require("mathlib")?;
        let ptscotch = requirer.require("ptscotch")?;
        Ok(DependencySet::new(vec![mathlib, ptscotch], Vec::new()))
    }

    fn extend_arguments(&self, ctx: &FormContext<'_>, args: &mut ArgumentList) -> Result<()> {
        // ELAS and VTK stay off regardless of what is installed
        args.push(Arg::switch("USE_ELAS", false));
        args.push(Arg::switch("USE_VTK", false));
        let ptscotch = ctx.dependency("ptscotch")?;
        args.push(Arg::define_quoted(
            "SCOTCH_DIR",
            Some(CMakeType::String),
            ptscotch.directory(),
        ));
        Ok(())
    }
}
