// src/args.rs

//! Typed argument tokens for external build tool invocations
//!
//! Packages build their `configure`/`cmake` command lines as an ordered
//! [`ArgumentList`] of [`Arg`] tokens instead of concatenating strings. The
//! token shapes follow the conventions of the tools being driven:
//!
//! - autotools: `--with-X="path"`, `--without-X`, `--enable-X`, `NAME="value"`
//! - CMake: `-DNAME:TYPE=value`
//!
//! Rendering is separate from execution so the exact command line can be
//! inspected and tested without spawning anything.

use serde::Serialize;
use std::fmt;

/// CMake cache entry types used in `-DNAME:TYPE=value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CMakeType {
    String,
    Bool,
    Path,
    FilePath,
}

impl CMakeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Bool => "BOOL",
            Self::Path => "PATH",
            Self::FilePath => "FILEPATH",
        }
    }
}

/// Value of a `-D` definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DefineValue {
    /// Rendered as `ON` / `OFF`
    Switch(bool),
    /// Rendered inside double quotes
    Quoted(String),
    /// Rendered verbatim
    Plain(String),
}

impl fmt::Display for DefineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Switch(true) => f.write_str("ON"),
            Self::Switch(false) => f.write_str("OFF"),
            Self::Quoted(v) => write!(f, "\"{}\"", v),
            Self::Plain(v) => f.write_str(v),
        }
    }
}

/// One command-line token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Arg {
    /// Verbatim token
    Raw(String),
    /// `--enable-<feature>`
    Enable(String),
    /// `--disable-<feature>`
    Disable(String),
    /// `--with-<name>="<value>"`
    With { name: String, value: String },
    /// `--without-<name>`
    Without(String),
    /// `--<name>=<value>`, unquoted
    Option { name: String, value: String },
    /// `NAME="value"` environment-style assignment passed to configure
    Assign { name: String, value: String },
    /// `-DNAME[:TYPE]=value`
    Define {
        name: String,
        ty: Option<CMakeType>,
        value: DefineValue,
    },
}

impl Arg {
    pub fn raw(token: impl Into<String>) -> Self {
        Self::Raw(token.into())
    }

    pub fn enable(feature: impl Into<String>) -> Self {
        Self::Enable(feature.into())
    }

    pub fn disable(feature: impl Into<String>) -> Self {
        Self::Disable(feature.into())
    }

    pub fn with(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::With {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn without(name: impl Into<String>) -> Self {
        Self::Without(name.into())
    }

    pub fn option(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Option {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn assign(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Assign {
            name: name.into(),
            value: value.into(),
        }
    }

    /// `-DNAME=ON|OFF`
    pub fn switch(name: impl Into<String>, on: bool) -> Self {
        Self::Define {
            name: name.into(),
            ty: None,
            value: DefineValue::Switch(on),
        }
    }

    /// `-DNAME:TYPE=value` with the value rendered verbatim
    pub fn define(name: impl Into<String>, ty: Option<CMakeType>, value: impl Into<String>) -> Self {
        Self::Define {
            name: name.into(),
            ty,
            value: DefineValue::Plain(value.into()),
        }
    }

    /// `-DNAME:TYPE="value"`
    pub fn define_quoted(
        name: impl Into<String>,
        ty: Option<CMakeType>,
        value: impl Into<String>,
    ) -> Self {
        Self::Define {
            name: name.into(),
            ty,
            value: DefineValue::Quoted(value.into()),
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(token) => f.write_str(token),
            Self::Enable(feature) => write!(f, "--enable-{}", feature),
            Self::Disable(feature) => write!(f, "--disable-{}", feature),
            Self::With { name, value } => write!(f, "--with-{}=\"{}\"", name, value),
            Self::Without(name) => write!(f, "--without-{}", name),
            Self::Option { name, value } => write!(f, "--{}={}", name, value),
            Self::Assign { name, value } => write!(f, "{}=\"{}\"", name, value),
            Self::Define { name, ty, value } => match ty {
                Some(ty) => write!(f, "-D{}:{}={}", name, ty.as_str(), value),
                None => write!(f, "-D{}={}", name, value),
            },
        }
    }
}

/// Ordered list of arguments for one tool invocation
///
/// Order is significant and duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArgumentList {
    args: Vec<Arg>,
}

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, arg: Arg) {
        self.args.push(arg);
    }

    pub fn extend(&mut self, args: impl IntoIterator<Item = Arg>) {
        self.args.extend(args);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.args.iter()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Render every token to its command-line string
    pub fn render(&self) -> Vec<String> {
        self.args.iter().map(|a| a.to_string()).collect()
    }

    /// Check whether a rendered token is present
    pub fn contains(&self, token: &str) -> bool {
        self.args.iter().any(|a| a.to_string() == token)
    }

    /// Position of a rendered token
    pub fn position(&self, token: &str) -> Option<usize> {
        self.args.iter().position(|a| a.to_string() == token)
    }
}

impl fmt::Display for ArgumentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render().join(" "))
    }
}

impl FromIterator<Arg> for ArgumentList {
    fn from_iter<I: IntoIterator<Item = Arg>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ArgumentList {
    type Item = Arg;
    type IntoIter = std::vec::IntoIter<Arg>;

    fn into_iter(self) -> Self::IntoIter {
        self.args.into_iter()
    }
}
