// src/toolchain/sycl.rs

//! SYCL stages
//!
//! SYCL sources are C++ with extensions, kept apart under the `.sycl.cxx`
//! suffix because the compiler is slow and behaves like a separate language.
//! Only the preprocessor, compiler and linker differ; the static, shared and
//! dynamic linkers are the C++ ones reported as SYCL.

use super::{Processor, ProcessorRole, cxx};
use crate::package::Language;

pub const SOURCE_SUFFIX: &str = ".sycl.cxx";

pub fn preprocessor() -> Processor {
    Processor::new(
        Language::Sycl,
        ProcessorRole::Preprocessor,
        "SYCLPP",
        &["SYCLPPFLAGS"],
        SOURCE_SUFFIX,
        SOURCE_SUFFIX,
    )
}

/// The compiler, optionally passing the preprocessor flags as well
pub fn compiler(use_preprocessor_flags: bool) -> Processor {
    let mut compiler = Processor::new(
        Language::Sycl,
        ProcessorRole::Compiler,
        "SYCLCXX",
        &["SYCLCXXFLAGS"],
        SOURCE_SUFFIX,
        ".o",
    );
    compiler.required_flags = vec!["-c".to_string()];
    compiler.output_flag = Some("-o".to_string());
    compiler.skips_headers = true;
    if use_preprocessor_flags {
        compiler.flags_names.extend(preprocessor().flags_names);
    }
    compiler
}

/// Links with the compiler driver
pub fn linker(extra_arguments: &[String]) -> Processor {
    let compiler = compiler(false);
    let mut linker = Processor::new(
        Language::Sycl,
        ProcessorRole::Linker,
        &compiler.name,
        &["SYCLCXX_LINKER_FLAGS"],
        ".o",
        ".a",
    );
    linker.output_flag = Some("-o".to_string());
    linker.extra_arguments = extra_arguments.to_vec();
    linker
}

pub fn static_linker(lib_suffix: &str) -> Processor {
    cxx::static_linker(lib_suffix).tagged(Language::Sycl)
}

pub fn shared_linker() -> Processor {
    cxx::shared_linker().tagged(Language::Sycl)
}

pub fn dynamic_linker() -> Processor {
    cxx::dynamic_linker().tagged(Language::Sycl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::NOOP_COMMAND;
    use crate::config::{ConfigureOptions, Toolchain};

    fn toolchain() -> Toolchain {
        let options = ConfigureOptions::from_args([
            "CC=mpicc",
            "CXX=mpicxx",
            "AR=ar",
            "SYCLCXX=icpx",
            "SYCLCXXFLAGS=-fsycl -O2",
            "SYCLPP=icpx -E",
            "SYCLPPFLAGS=-DUSE_SYCL",
            "SYCLCXX_LINKER_FLAGS=-fsycl",
        ])
        .unwrap();
        Toolchain::from_options(&options)
    }

    #[test]
    fn test_headers_have_no_target() {
        let compiler = compiler(false);
        assert_eq!(compiler.get_target("foo.h"), None);
        assert_eq!(compiler.get_target("foo.hh"), None);
        assert_eq!(compiler.get_target("foo.hpp"), None);
    }

    #[test]
    fn test_source_suffix_is_replaced() {
        let compiler = compiler(false);
        assert_eq!(compiler.get_target("foo.sycl.cxx"), Some("foo.o".to_string()));
        assert_eq!(
            compiler.get_target("src/vec/impls/veckok.cxx"),
            Some("src/vec/impls/veckok.o".to_string())
        );
        assert_eq!(
            preprocessor().get_target("foo.sycl.cxx"),
            Some("foo.sycl.cxx".to_string())
        );
        assert_eq!(linker(&[]).get_target("foo.o"), Some("foo.a".to_string()));
    }

    #[test]
    fn test_no_output_is_noop() {
        let toolchain = toolchain();
        let compiler = compiler(true);
        assert_eq!(
            compiler.get_command(&toolchain, &[], None).unwrap(),
            NOOP_COMMAND
        );
        assert_eq!(
            compiler
                .get_command(&toolchain, &["a.sycl.cxx", "b.sycl.cxx"], None)
                .unwrap(),
            "true"
        );
    }

    #[test]
    fn test_compile_command() {
        let toolchain = toolchain();
        assert_eq!(
            compiler(false)
                .get_command(&toolchain, &["foo.sycl.cxx"], Some("foo.o"))
                .unwrap(),
            "icpx -fsycl -O2 -c -o foo.o foo.sycl.cxx"
        );
        assert_eq!(
            compiler(true)
                .get_command(&toolchain, &["foo.sycl.cxx"], Some("foo.o"))
                .unwrap(),
            "icpx -fsycl -O2 -DUSE_SYCL -c -o foo.o foo.sycl.cxx"
        );
    }

    #[test]
    fn test_linker_uses_compiler_driver() {
        let toolchain = toolchain();
        let linker = linker(&["-lsycl".to_string()]);
        assert_eq!(linker.name, "SYCLCXX");
        assert_eq!(
            linker
                .get_command(&toolchain, &["a.o"], Some("libx.a"))
                .unwrap(),
            "icpx -fsycl -o libx.a a.o -lsycl"
        );
    }

    #[test]
    fn test_borrowed_linkers_are_tagged() {
        for linker in [static_linker("a"), shared_linker(), dynamic_linker()] {
            assert_eq!(linker.language, Language::Sycl);
        }
        assert_eq!(shared_linker().name, "CXX");
        assert_eq!(static_linker("a").name, "AR");
        assert_eq!(dynamic_linker().role, ProcessorRole::DynamicLinker);
    }
}
