// src/package/slepc.rs

//! SLEPc, built after the host library through generated make rules
//!
//! SLEPc configures against the installed host library, so nothing runs at
//! configure time. The recipe emits `slepcbuild`/`slepcinstall` rules and wires
//! them into either `slepc-build` (in-tree builds, hashed package prefixes) or
//! `slepc-install` (`--prefix` installs, where the host libraries must be in
//! their final location first).

use super::{
    BuildFlavor, DependencySet, FormContext, PackageRecipe, PackageSpec, Requirer, ScalarType,
};
use crate::args::ArgumentList;
use crate::error::Result;
use crate::install::{InstallPlan, MakeRule, MakefileFragment};
use std::path::{Path, PathBuf};

const COMMIT: &str = "7aec77e6cef135754b22df29b71280107e1fd2d7";

const ERROR_RULE: &str = "**************************ERROR*************************************";
const ERROR_END: &str = "********************************************************************";

#[derive(Debug)]
pub(crate) struct Slepc;

/// Architecture name used for builds against an installed host library
fn installed_arch(scalar_type: ScalarType) -> String {
    let native = format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH);
    let mut arch = format!("installed-{}", native.replace("linux-", "linux2-"));
    if scalar_type != ScalarType::Real {
        arch.push('-');
        arch.push_str(scalar_type.as_str());
    }
    arch
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

impl Slepc {
    fn empty_rules(fragment: &mut MakefileFragment) {
        fragment.add_rule(MakeRule::new("slepc-build", ""));
        fragment.add_rule(MakeRule::new("slepc-install", ""));
    }
}

impl PackageRecipe for Slepc {
    fn spec(&self) -> PackageSpec {
        let mut spec = PackageSpec::new("slepc", "SLEPc", BuildFlavor::Make);
        spec.git_commit = Some(COMMIT.to_string());
        spec.download = vec![
            "git://https://gitlab.com/slepc/slepc.git".to_string(),
            format!(
                "https://gitlab.com/slepc/slepc/-/archive/{0}/slepc-{0}.tar.gz",
                COMMIT
            ),
        ];
        spec.skip_with_options = true;
        spec.used_directly = false;
        spec.linked_by_host = false;
        spec.built_after_host = true;
        spec
    }

    fn setup_dependencies(&self, requirer: &mut Requirer<'_>) -> Result<DependencySet> {
        let python = requirer.require("python")?;
        Ok(DependencySet::new(vec![python], Vec::new()))
    }

    fn install_plan(&self, ctx: &FormContext<'_>, _args: &ArgumentList) -> Result<InstallPlan> {
        let options = ctx.options;
        let package_dir = ctx.source_dir().display().to_string();
        let python = ctx
            .dependency("python")?
            .probe
            .executable
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "python3".to_string());

        // superuser installs go back to the invoking user for the build
        let new_user = match &options.install_sudo {
            Some(sudo) if !sudo.is_empty() => format!("{} -u $${{SUDO_USER}} ", sudo),
            _ => String::new(),
        };

        let at_prefix = options.installs_to_prefix();
        let (mut carg, barg, prefix) = match options.prefix.as_deref().filter(|_| at_prefix) {
            Some(prefix) => {
                let prefix = absolute(prefix).display().to_string();
                let iarch = installed_arch(options.scalar_type);
                (
                    format!("SLEPC_DIR={} PETSC_DIR={} PETSC_ARCH=\"\" ", package_dir, prefix),
                    format!("SLEPC_DIR={} PETSC_DIR={} PETSC_ARCH={} ", package_dir, prefix, iarch),
                    prefix,
                )
            }
            None => (
                format!(" SLEPC_DIR={} ", package_dir),
                format!(" SLEPC_DIR={} ", package_dir),
                options.petsc_dir.join(&options.arch).display().to_string(),
            ),
        };

        let config_args = options
            .slepc_configure_arguments
            .clone()
            .unwrap_or_default();
        if config_args.contains("--with-slepc4py") {
            carg.push_str(&format!(
                " PYTHONPATH={}:${{PYTHONPATH}} ",
                ctx.install_dir().join("lib").display()
            ));
        }

        let mut fragment = MakefileFragment::new();
        fragment.add_define("HAVE_SLEPC", "1");
        fragment.add_macro("SLEPC", "yes");
        fragment.add_rule(MakeRule::new("slepcbuild", "").with_recipe(vec![
            "@echo \"*** Building SLEPc ***\"".to_string(),
            "@${RM} -f ${PETSC_ARCH}/lib/petsc/conf/slepc.errorflg".to_string(),
            format!(
                "@(cd {pkg} && \\\n\
                 \t   {carg}{python} ./configure --with-clean --prefix={prefix} {config_args} && \\\n\
                 \t   {barg}${{OMAKE}} {barg}) || \\\n\
                 \t     (echo \"{ERROR_RULE}\" && \\\n\
                 \t     echo \"Error building SLEPc.\" && \\\n\
                 \t     echo \"{ERROR_END}\" && \\\n\
                 \t     touch ${{PETSC_ARCH}}/lib/petsc/conf/slepc.errorflg && \\\n\
                 \t     exit 1)",
                pkg = package_dir,
            ),
        ]));
        fragment.add_rule(MakeRule::new("slepcinstall", "").with_recipe(vec![
            "@echo \"*** Installing SLEPc ***\"".to_string(),
            format!(
                "@(cd {pkg} && \\\n\
                 \t   {new_user}{barg}${{OMAKE}} install {barg})  || \\\n\
                 \t     (echo \"{ERROR_RULE}\" && \\\n\
                 \t     echo \"Error building SLEPc.\" && \\\n\
                 \t     echo \"{ERROR_END}\" && \\\n\
                 \t     exit 1)",
                pkg = package_dir,
            ),
        ]));

        let slepc_dir = if at_prefix {
            // the host shared libraries must be in place before SLEPc builds
            fragment.add_rule(MakeRule::new("slepc-build", ""));
            fragment.add_rule(MakeRule::new("slepc-install", "slepcbuild slepcinstall"));
            prefix.clone()
        } else {
            fragment.add_rule(MakeRule::new("slepc-build", "slepcbuild slepcinstall"));
            fragment.add_rule(MakeRule::new("slepc-install", ""));
            format!("${{PETSC_DIR}}/{}", options.arch)
        };

        let mut plan = InstallPlan::new();
        plan.fragment = fragment;
        plan.notice(format!(
            "SLEPc examples are available at ${{PETSC_DIR}}/{}/externalpackages/git.slepc\n\
             export SLEPC_DIR={}",
            options.arch, slepc_dir
        ));
        Ok(plan)
    }

    fn alternate_plan(&self, _ctx: &FormContext<'_>) -> Option<InstallPlan> {
        let mut plan = InstallPlan::new();
        Self::empty_rules(&mut plan.fragment);
        Some(plan)
    }
}
