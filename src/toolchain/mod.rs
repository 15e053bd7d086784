// src/toolchain/mod.rs

//! Compiler and linker adapters
//!
//! A [`Processor`] is one toolchain stage: it knows which setting names the
//! program and its flags, which source suffix it consumes and which target
//! suffix it produces. Commands are rendered, never run here; the caller
//! decides what to do with them.

pub mod sycl;

use crate::command::{NOOP_COMMAND, ShellCommand};
use crate::config::Toolchain;
use crate::error::{Error, Result};
use crate::package::Language;
use std::fmt;
use std::path::Path;

/// Header suffixes that produce no compiled output
pub const HEADER_SUFFIXES: [&str; 3] = [".h", ".hh", ".hpp"];

/// What a toolchain stage does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorRole {
    Preprocessor,
    Compiler,
    Linker,
    StaticLinker,
    SharedLinker,
    DynamicLinker,
}

impl ProcessorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preprocessor => "preprocessor",
            Self::Compiler => "compiler",
            Self::Linker => "linker",
            Self::StaticLinker => "static linker",
            Self::SharedLinker => "shared linker",
            Self::DynamicLinker => "dynamic linker",
        }
    }
}

/// One toolchain stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processor {
    pub language: Language,
    pub role: ProcessorRole,
    /// Setting holding the program (`SYCLCXX`)
    pub name: String,
    /// Settings holding flags, concatenated in order
    pub flags_names: Vec<String>,
    pub source_suffix: String,
    pub target_suffix: String,
    pub required_flags: Vec<String>,
    /// Token preceding the output file; `None` puts the output first
    pub output_flag: Option<String>,
    /// Arguments appended after the sources
    pub extra_arguments: Vec<String>,
    /// Whether header inputs are skipped by [`Processor::get_target`]
    pub skips_headers: bool,
}

impl Processor {
    pub fn new(
        language: Language,
        role: ProcessorRole,
        name: &str,
        flags_names: &[&str],
        source_suffix: &str,
        target_suffix: &str,
    ) -> Self {
        Self {
            language,
            role,
            name: name.to_string(),
            flags_names: flags_names.iter().map(|s| s.to_string()).collect(),
            source_suffix: source_suffix.to_string(),
            target_suffix: target_suffix.to_string(),
            required_flags: Vec::new(),
            output_flag: None,
            extra_arguments: Vec::new(),
            skips_headers: false,
        }
    }

    /// The same stage reported under another language
    pub fn tagged(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Output path for `source`, or `None` when the input is a header
    ///
    /// The stage's own source suffix is replaced as a whole, so
    /// `foo.sycl.cxx` maps to `foo.o`; otherwise only the last extension is.
    pub fn get_target(&self, source: &str) -> Option<String> {
        if self.skips_headers && HEADER_SUFFIXES.iter().any(|h| source.ends_with(h)) {
            return None;
        }
        let base = match source.strip_suffix(self.source_suffix.as_str()) {
            Some(base) if !self.source_suffix.is_empty() => base,
            _ => strip_extension(source),
        };
        Some(format!("{}{}", base, self.target_suffix))
    }

    /// Program for this stage from the toolchain settings or environment
    pub fn program(&self, toolchain: &Toolchain) -> Result<String> {
        lookup(toolchain, &self.name)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::ToolNotFound(format!("{} ({})", self.name, self)))
    }

    /// Flag tokens from every flags setting, in order
    pub fn flags(&self, toolchain: &Toolchain) -> Vec<String> {
        self.flags_names
            .iter()
            .filter_map(|name| lookup(toolchain, name))
            .flat_map(|value| {
                value
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Command producing `output` from `sources`
    ///
    /// Without an output file nothing should run, and the no-op command is
    /// returned whatever the sources are.
    pub fn get_command(
        &self,
        toolchain: &Toolchain,
        sources: &[&str],
        output: Option<&str>,
    ) -> Result<String> {
        let Some(output) = output else {
            return Ok(NOOP_COMMAND.to_string());
        };
        let mut command = ShellCommand::new(self.program(toolchain)?)
            .args(self.flags(toolchain))
            .args(self.required_flags.iter().cloned());
        if let Some(flag) = &self.output_flag {
            command = command.arg(flag.as_str());
        }
        command = command
            .arg(output)
            .args(sources.iter().copied())
            .args(self.extra_arguments.iter().cloned());
        Ok(command.render())
    }
}

impl fmt::Display for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.language, self.role.as_str())
    }
}

fn strip_extension(source: &str) -> &str {
    match Path::new(source).extension() {
        Some(ext) => &source[..source.len() - ext.len() - 1],
        None => source,
    }
}

/// Resolved toolchain values first, then raw settings and environment
fn lookup(toolchain: &Toolchain, key: &str) -> Option<String> {
    let resolved = match key {
        "CC" => Some(toolchain.cc.clone()),
        "CXX" => toolchain.cxx.clone(),
        "FC" => toolchain.fc.clone(),
        "CFLAGS" => Some(toolchain.cflags.clone()),
        "CXXFLAGS" => Some(toolchain.cxxflags.clone()),
        "AR" => Some(toolchain.ar.clone()),
        "AR_FLAGS" => Some(toolchain.ar_flags.clone()),
        "LDFLAGS" => Some(toolchain.ldflags.clone()),
        _ => None,
    };
    resolved.or_else(|| toolchain.setting(key))
}

/// The C++ stages other languages borrow their linkers from
pub mod cxx {
    use super::{Processor, ProcessorRole};
    use crate::package::Language;

    pub fn static_linker(lib_suffix: &str) -> Processor {
        Processor::new(
            Language::Cxx,
            ProcessorRole::StaticLinker,
            "AR",
            &["AR_FLAGS"],
            ".o",
            &format!(".{}", lib_suffix),
        )
    }

    pub fn shared_linker() -> Processor {
        let mut linker = Processor::new(
            Language::Cxx,
            ProcessorRole::SharedLinker,
            "CXX",
            &["LDFLAGS"],
            ".o",
            ".so",
        );
        linker.required_flags = vec!["-shared".to_string()];
        linker.output_flag = Some("-o".to_string());
        linker
    }

    pub fn dynamic_linker() -> Processor {
        let mut linker = shared_linker();
        linker.role = ProcessorRole::DynamicLinker;
        linker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::fixtures;

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("dir/foo.c"), "dir/foo");
        assert_eq!(strip_extension("foo"), "foo");
        assert_eq!(strip_extension("a.b/foo"), "a.b/foo");
    }

    #[test]
    fn test_static_linker_command() {
        let options = fixtures::options();
        let toolchain = fixtures::toolchain(&options);
        let linker = cxx::static_linker(&toolchain.ar_lib_suffix);

        assert_eq!(linker.get_target("vec.o"), Some("vec.a".to_string()));
        assert_eq!(
            linker
                .get_command(&toolchain, &["a.o", "b.o"], Some("libx.a"))
                .unwrap(),
            "ar cr libx.a a.o b.o"
        );
    }

    #[test]
    fn test_missing_program() {
        let options = fixtures::options();
        let toolchain = fixtures::toolchain(&options);
        let mut p = Processor::new(
            Language::C,
            ProcessorRole::Compiler,
            "EXTPKG_TEST_NO_SUCH_TOOL",
            &[],
            ".c",
            ".o",
        );
        p.output_flag = Some("-o".to_string());
        let err = p.get_command(&toolchain, &["x.c"], Some("x.o")).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }
}
