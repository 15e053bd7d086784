// src/package/flavor.rs

//! Build tool families
//!
//! Every package is built by exactly one tool family. The flavor supplies the
//! arguments every package of that family gets and the install procedure used
//! when a recipe does not provide its own.

use super::FormContext;
use crate::args::{Arg, ArgumentList, CMakeType};
use crate::command::{CLEANUP_TIMEOUT, CommandChain, ShellCommand};
use crate::error::{Error, Result};
use crate::install::{InstallPlan, InstallStep, RecordedConfig};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

const CONFIGURE_TIMEOUT: Duration = Duration::from_secs(2000);
const MAKE_TIMEOUT: Duration = Duration::from_secs(6000);
const INSTALL_TIMEOUT: Duration = Duration::from_secs(1000);

/// Directory CMake builds run in, inside the source tree
pub const CMAKE_BUILD_DIR: &str = "petsc-build";

/// Tool family that configures and builds a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BuildFlavor {
    /// `./configure && make && make install`
    Autotools,
    /// `cmake` in a separate build directory
    CMake,
    /// Plain makefiles driven by a generated include file
    Make,
}

impl BuildFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Autotools => "autotools",
            Self::CMake => "cmake",
            Self::Make => "make",
        }
    }

    /// Arguments every package of this flavor is configured with
    pub fn base_arguments(&self, ctx: &FormContext<'_>) -> ArgumentList {
        match self {
            Self::Autotools => autotools_arguments(ctx),
            Self::CMake => cmake_arguments(ctx),
            Self::Make => ArgumentList::new(),
        }
    }

    /// Install procedure used unless the recipe overrides it
    pub fn default_plan(&self, ctx: &FormContext<'_>, args: &ArgumentList) -> Result<InstallPlan> {
        match self {
            Self::Autotools => autotools_plan(ctx, args),
            Self::CMake => cmake_plan(ctx, args),
            Self::Make => Err(Error::NotSupported(format!(
                "{} has no generic make install procedure",
                ctx.package.name()
            ))),
        }
    }
}

impl fmt::Display for BuildFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn autotools_arguments(ctx: &FormContext<'_>) -> ArgumentList {
    let tc = ctx.toolchain;
    let spec = &ctx.package.spec;
    let install = ctx.install_dir();

    let mut args = ArgumentList::new();
    args.push(Arg::option("prefix", install.display().to_string()));
    args.push(Arg::option("libdir", install.join("lib").display().to_string()));
    args.push(Arg::assign("MAKE", &tc.make));
    args.push(Arg::assign("CC", &tc.cc));
    args.push(Arg::assign("CFLAGS", &tc.cflags));
    if spec.needs_cxx {
        if let Some(cxx) = &tc.cxx {
            args.push(Arg::assign("CXX", cxx));
            args.push(Arg::assign("CXXFLAGS", &tc.cxxflags));
        }
    }
    if spec.needs_fortran {
        if let Some(fc) = &tc.fc {
            args.push(Arg::assign("FC", fc));
            args.push(Arg::assign("FCFLAGS", &tc.fflags));
        }
    }
    args.push(Arg::assign("AR", &tc.ar));
    args.push(Arg::assign("ARFLAGS", &tc.ar_flags));
    if tc.shared_libraries {
        args.push(Arg::enable("shared"));
    } else {
        args.push(Arg::disable("shared"));
    }
    args
}

fn cmake_arguments(ctx: &FormContext<'_>) -> ArgumentList {
    let tc = ctx.toolchain;
    let spec = &ctx.package.spec;
    let install = ctx.install_dir();

    let mut args = ArgumentList::new();
    args.push(Arg::define("CMAKE_INSTALL_PREFIX", None, install.display().to_string()));
    args.push(Arg::define_quoted(
        "CMAKE_INSTALL_NAME_DIR",
        Some(CMakeType::String),
        install.join("lib").display().to_string(),
    ));
    args.push(Arg::define("CMAKE_VERBOSE_MAKEFILE", None, "1"));
    args.push(Arg::define(
        "CMAKE_BUILD_TYPE",
        None,
        if tc.debugging { "Debug" } else { "Release" },
    ));
    args.push(Arg::define_quoted("CMAKE_C_COMPILER", None, &tc.cc));
    args.push(Arg::define_quoted("CMAKE_C_FLAGS", Some(CMakeType::String), &tc.cflags));
    if spec.needs_cxx {
        if let Some(cxx) = &tc.cxx {
            args.push(Arg::define_quoted("CMAKE_CXX_COMPILER", None, cxx));
            args.push(Arg::define_quoted(
                "CMAKE_CXX_FLAGS",
                Some(CMakeType::String),
                &tc.cxxflags,
            ));
        }
    }
    if spec.needs_fortran {
        if let Some(fc) = &tc.fc {
            args.push(Arg::define_quoted("CMAKE_Fortran_COMPILER", None, fc));
            args.push(Arg::define_quoted(
                "CMAKE_Fortran_FLAGS",
                Some(CMakeType::String),
                &tc.fflags,
            ));
        }
    }
    args.push(Arg::define("CMAKE_AR", None, &tc.ar));
    args.push(Arg::define("CMAKE_RANLIB", None, &tc.ranlib));
    args.push(Arg::define(
        "BUILD_SHARED_LIBS",
        Some(CMakeType::Bool),
        if tc.shared_libraries { "ON" } else { "OFF" },
    ));
    args
}

/// Arguments file kept in the source tree and compared on the next run
fn record_arguments(ctx: &FormContext<'_>, args: &ArgumentList, plan: &mut InstallPlan) {
    let key = ctx.package.key();
    let generated = ctx.source_dir().join(format!("extpkg.{}.conf", key));
    let mut contents = args.render().join("\n");
    contents.push('\n');
    plan.write_file(&generated, contents);
    plan.record(RecordedConfig::new(
        generated,
        ctx.record_dir().join(format!("pkg.conf.{}", key)),
    ));
}

fn autotools_plan(ctx: &FormContext<'_>, args: &ArgumentList) -> Result<InstallPlan> {
    let name = ctx.package.name();
    let source = ctx.source_dir();
    let tc = ctx.toolchain;
    let mut plan = InstallPlan::new();
    record_arguments(ctx, args, &mut plan);

    if !ctx.source_has("configure") {
        // git checkouts ship configure.ac only
        for program in ctx.package.recipe().git_prerequisites() {
            which::which(program).map_err(|_| {
                Error::ToolNotFound(format!("{} (needed to build {} from git)", program, name))
            })?;
        }
        plan.step(
            InstallStep::fatal(
                "autoreconf",
                CommandChain::of(ShellCommand::new("autoreconf").arg("-fi"))
                    .current_dir(&source)
                    .timeout(CONFIGURE_TIMEOUT),
            )
            .with_failure_message(format!("Error running autoreconf on {}", name)),
        );
    }

    plan.step(
        InstallStep::fatal(
            "configure",
            CommandChain::of(ShellCommand::new("./configure").args(args.render()))
                .current_dir(&source)
                .timeout(CONFIGURE_TIMEOUT),
        )
        .with_banner(format!("Running configure on {}; this may take several minutes", name))
        .with_failure_message(format!("Error running configure on {}", name)),
    );
    plan.step(InstallStep::tolerated(
        "clean",
        CommandChain::of(ShellCommand::new(&tc.make).arg("clean"))
            .current_dir(&source)
            .timeout(CLEANUP_TIMEOUT),
    ));
    plan.step(
        InstallStep::fatal(
            "make",
            CommandChain::of(ShellCommand::new(tc.make_jnp()))
                .current_dir(&source)
                .timeout(MAKE_TIMEOUT),
        )
        .with_banner(format!("Running make on {}; this may take several minutes", name))
        .with_failure_message(format!("Error running make on {}", name)),
    );
    plan.step(
        InstallStep::fatal(
            "make install",
            CommandChain::of(ShellCommand::new(format!("{}{}", ctx.sudo(), tc.make)).arg("install"))
                .current_dir(&source)
                .timeout(INSTALL_TIMEOUT),
        )
        .with_failure_message(format!("Error running make install on {}", name)),
    );
    Ok(plan)
}

fn cmake_plan(ctx: &FormContext<'_>, args: &ArgumentList) -> Result<InstallPlan> {
    let name = ctx.package.name();
    let source = ctx.source_dir();
    let tc = ctx.toolchain;
    let mut plan = InstallPlan::new();
    record_arguments(ctx, args, &mut plan);

    plan.step(InstallStep::tolerated(
        "remove stale build directory",
        CommandChain::of(ShellCommand::new("rm").args(["-rf", CMAKE_BUILD_DIR]))
            .current_dir(&source)
            .timeout(CLEANUP_TIMEOUT),
    ));
    plan.step(
        InstallStep::fatal(
            "cmake",
            CommandChain::of(ShellCommand::new("mkdir").args(["-p", CMAKE_BUILD_DIR]))
                .then(ShellCommand::new("cd").arg(CMAKE_BUILD_DIR))
                .then(ShellCommand::new(&tc.cmake).arg("..").args(args.render()))
                .current_dir(&source)
                .timeout(CONFIGURE_TIMEOUT),
        )
        .with_banner(format!("Configuring {} with cmake; this may take several minutes", name))
        .with_failure_message(format!("Error configuring {} with cmake", name)),
    );
    plan.step(
        InstallStep::fatal(
            "make",
            CommandChain::of(ShellCommand::new("cd").arg(CMAKE_BUILD_DIR))
                .then(ShellCommand::new(tc.make_jnp()))
                .current_dir(&source)
                .timeout(MAKE_TIMEOUT),
        )
        .with_banner(format!("Compiling and installing {}; this may take several minutes", name))
        .with_failure_message(format!("Error running make on {}", name)),
    );
    plan.step(
        InstallStep::fatal(
            "make install",
            CommandChain::of(ShellCommand::new("cd").arg(CMAKE_BUILD_DIR))
                .then(ShellCommand::new(format!("{}{}", ctx.sudo(), tc.make)).arg("install"))
                .current_dir(&source)
                .timeout(INSTALL_TIMEOUT),
        )
        .with_failure_message(format!("Error running make install on {}", name)),
    );
    Ok(plan)
}
