// src/package/scalapack.rs

//! ScaLAPACK, built from plain makefiles configured by `SLmake.inc`

use super::{
    BuildFlavor, DependencySet, FormContext, Language, PackageRecipe, PackageSpec, Precision,
    ProbeFunctions, Requirer,
};
use crate::args::ArgumentList;
use crate::command::{CLEANUP_TIMEOUT, CommandChain, DEFAULT_TIMEOUT, ShellCommand};
use crate::error::{Error, Result};
use crate::install::{ConfigFragment, InstallPlan, InstallStep, RecordedConfig};
use std::path::PathBuf;

/// Include file the ScaLAPACK makefiles read their settings from
pub const SLMAKE_INC: &str = "SLmake.inc";

/// Tag carrying the fix that avoids calling zdotc and zladiv on macOS
const COMMIT: &str = "v2.1.0-p2";

#[derive(Debug)]
pub(crate) struct Scalapack;

fn with_shared_flag(flags: &str, shared: &str) -> String {
    if shared.is_empty() || flags.split_whitespace().any(|f| f == shared) {
        flags.to_string()
    } else {
        format!("{} {}", flags, shared).trim().to_string()
    }
}

impl Scalapack {
    /// Contents of `SLmake.inc`
    pub(crate) fn slmake_inc(&self, ctx: &FormContext<'_>) -> Result<ConfigFragment> {
        let tc = ctx.toolchain;
        let blaslapack = ctx.dependency("blaslapack")?;
        let mpi = ctx.dependency("mpi")?;
        let fc = tc.compiler(Language::Fortran).ok_or_else(|| Error::MissingCompiler {
            package: ctx.package.name().to_string(),
            language: Language::Fortran.to_string(),
        })?;
        let shared = tc.shared_flag();

        let mut inc = ConfigFragment::new();
        inc.set("SCALAPACKLIB", format!("libscalapack.{}", tc.ar_lib_suffix))
            .set("LIBS", blaslapack.link_string())
            .set("MPIINC", mpi.include_string())
            // covers both BLAS and the Fortran compiler, so it comes from the toolchain
            .set("CDEFS", tc.fortran_mangling.cdefs())
            .set("FC", fc)
            .set("FCFLAGS", with_shared_flag(&tc.fflags, shared))
            .set("FCLOADER", tc.linker(Language::Fortran).unwrap_or(fc))
            .set("FCLOADFLAGS", tc.linker_flags())
            .set("CC", &tc.cc)
            .set(
                "CCFLAGS",
                format!("{} $(MPIINC)", with_shared_flag(&tc.cflags, shared)),
            )
            .set(
                "CFLAGS",
                format!("{} {}", tc.no_opt_flag(), shared).trim_end().to_string(),
            )
            .set("CCLOADER", tc.linker(Language::C).unwrap_or(&tc.cc))
            .set("CCLOADFLAGS", tc.linker_flags())
            .set("ARCH", &tc.ar)
            .set("ARCHFLAGS", &tc.ar_flags)
            .set("RANLIB", &tc.ranlib);
        Ok(inc)
    }
}

impl PackageRecipe for Scalapack {
    fn spec(&self) -> PackageSpec {
        let mut spec = PackageSpec::new("scalapack", "SCALAPACK", BuildFlavor::Make);
        spec.git_commit = Some(COMMIT.to_string());
        spec.download = vec![
            "git://https://bitbucket.org/petsc/pkg-scalapack".to_string(),
            format!("https://bitbucket.org/petsc/pkg-scalapack/get/{}.tar.gz", COMMIT),
        ];
        spec.download_dir_names = vec!["petsc-pkg-scalapack".to_string(), "scalapack".to_string()];
        spec.liblist = std::iter::once(vec!["libscalapack.a".to_string()])
            .chain(["intelmpi", "mpich", "sgimpt", "openmpi"].iter().map(|mpi| {
                vec![
                    "libmkl_scalapack_lp64.a".to_string(),
                    format!("libmkl_blacs_{}_lp64.a", mpi),
                ]
            }))
            .collect();
        spec.functions = ProbeFunctions {
            names: vec!["pssytrd".to_string()],
            language: Some(Language::Fortran),
        };
        spec.needs_fortran = true;
        spec.precisions = vec![Precision::Single, Precision::Double];
        spec.download_on_windows = true;
        spec
    }

    fn setup_dependencies(&self, requirer: &mut Requirer<'_>) -> Result<DependencySet> {
        let flibs = requirer.require("flibs")?;
        let blaslapack = requirer.require("blaslapack")?;
        let mpi = requirer.require("mpi")?;
        Ok(DependencySet::new(vec![mpi, blaslapack, flibs], Vec::new()))
    }

    fn search_directories(&self) -> Vec<PathBuf> {
        let mut dirs = vec![PathBuf::new()];
        if let Some(mkl) = std::env::var_os("MKLROOT").filter(|v| !v.is_empty()) {
            dirs.push(PathBuf::from(mkl));
        }
        dirs
    }

    fn install_plan(&self, ctx: &FormContext<'_>, _args: &ArgumentList) -> Result<InstallPlan> {
        let source = ctx.source_dir();
        let tc = ctx.toolchain;
        let sudo = ctx.sudo();
        let lib_dir = ctx.library_dir();
        let generated = source.join(SLMAKE_INC);

        let mut plan = InstallPlan::new();
        plan.write_file(&generated, self.slmake_inc(ctx)?.render());
        plan.record(RecordedConfig::new(
            generated,
            ctx.record_dir().join("pkg.conf.scalapack"),
        ));

        plan.step(InstallStep::tolerated(
            "cleanlib",
            CommandChain::of(ShellCommand::new(&tc.make).args(["-f", "Makefile.parallel", "cleanlib"]))
                .current_dir(&source)
                .timeout(CLEANUP_TIMEOUT),
        ));
        plan.step(
            InstallStep::fatal(
                "lib",
                CommandChain::of(
                    ShellCommand::new(tc.make_jnp()).args(["-f", "Makefile.parallel", "lib"]),
                )
                .then(ShellCommand::new(format!("{}mkdir", sudo)).arg("-p").path(&lib_dir))
                .then(
                    ShellCommand::new(format!("{}cp", sudo))
                        .arg("libscalapack.*")
                        .path(&lib_dir),
                )
                .current_dir(&source)
                .timeout(DEFAULT_TIMEOUT),
            )
            .with_banner("Compiling and installing Scalapack; this may take several minutes")
            .with_failure_message("Error running make on SCALAPACK"),
        );
        Ok(plan)
    }
}
