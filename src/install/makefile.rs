// src/install/makefile.rs

//! Generated build-system fragments
//!
//! [`ConfigFragment`] is a `KEY = value` include file such as ScaLAPACK's
//! `SLmake.inc`. [`MakefileFragment`] collects the make macros, rules and
//! preprocessor defines packages contribute to the host build.

use serde::Serialize;
use std::fmt::Write as _;

/// Ordered `KEY = value` lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigFragment {
    entries: Vec<(String, String)>,
}

impl ConfigFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; keys may repeat
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Last value recorded for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Keys padded to a common column, one entry per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            let _ = writeln!(out, "{:<12} = {}", key, value);
        }
        out
    }
}

/// One make rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MakeRule {
    pub target: String,
    pub prerequisites: String,
    /// Recipe lines, written tab-indented
    pub recipe: Vec<String>,
}

impl MakeRule {
    pub fn new(target: impl Into<String>, prerequisites: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            prerequisites: prerequisites.into(),
            recipe: Vec::new(),
        }
    }

    pub fn with_recipe(mut self, lines: Vec<String>) -> Self {
        self.recipe = lines;
        self
    }

    pub fn render(&self) -> String {
        let mut out = format!("{}: {}\n", self.target, self.prerequisites);
        for line in &self.recipe {
            let _ = writeln!(out, "\t{}", line);
        }
        out
    }
}

/// Macros, rules and defines a package adds to the host build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MakefileFragment {
    macros: Vec<(String, String)>,
    rules: Vec<MakeRule>,
    defines: Vec<(String, String)>,
}

impl MakefileFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a make macro, replacing an earlier value
    pub fn add_macro(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.macros.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.macros.push((name, value)),
        }
    }

    /// Add a rule; a later rule for the same target replaces the earlier one
    pub fn add_rule(&mut self, rule: MakeRule) {
        match self.rules.iter_mut().find(|r| r.target == rule.target) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    /// Add a preprocessor define (name without the `PETSC_` prefix)
    pub fn add_define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.defines.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.defines.push((name, value)),
        }
    }

    pub fn rule(&self, target: &str) -> Option<&MakeRule> {
        self.rules.iter().find(|r| r.target == target)
    }

    pub fn rules(&self) -> &[MakeRule] {
        &self.rules
    }

    pub fn macro_value(&self, name: &str) -> Option<&str> {
        self.macros
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn define(&self, name: &str) -> Option<&str> {
        self.defines
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty() && self.rules.is_empty() && self.defines.is_empty()
    }

    /// Fold another fragment into this one
    pub fn merge(&mut self, other: &MakefileFragment) {
        for (name, value) in &other.macros {
            self.add_macro(name.clone(), value.clone());
        }
        for rule in &other.rules {
            self.add_rule(rule.clone());
        }
        for (name, value) in &other.defines {
            self.add_define(name.clone(), value.clone());
        }
    }

    /// Macros followed by rules
    pub fn render_makefile(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.macros {
            let _ = writeln!(out, "{} = {}", name, value);
        }
        for rule in &self.rules {
            out.push('\n');
            out.push_str(&rule.render());
        }
        out
    }

    /// Defines as a C header with `prefix` prepended to each name
    pub fn render_header(&self, prefix: &str) -> String {
        let mut out = String::new();
        for (name, value) in &self.defines {
            let _ = writeln!(out, "#ifndef {prefix}{name}");
            let _ = writeln!(out, "#define {prefix}{name} {value}");
            let _ = writeln!(out, "#endif");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_fragment_alignment() {
        let mut inc = ConfigFragment::new();
        inc.set("SCALAPACKLIB", "libscalapack.a ");
        inc.set("LIBS", "-lopenblas");
        assert_eq!(
            inc.render(),
            "SCALAPACKLIB = libscalapack.a \nLIBS         = -lopenblas\n"
        );
        assert_eq!(inc.get("LIBS"), Some("-lopenblas"));
    }

    #[test]
    fn test_rules_replace_by_target() {
        let mut fragment = MakefileFragment::new();
        fragment.add_rule(MakeRule::new("slepc-build", "slepcbuild slepcinstall"));
        fragment.add_rule(MakeRule::new("slepc-install", ""));
        fragment.add_rule(MakeRule::new("slepc-build", ""));

        assert_eq!(fragment.rules().len(), 2);
        assert_eq!(fragment.rule("slepc-build").unwrap().prerequisites, "");
    }

    #[test]
    fn test_render_makefile_and_header() {
        let mut fragment = MakefileFragment::new();
        fragment.add_macro("SLEPC", "yes");
        fragment.add_define("HAVE_SLEPC", "1");
        fragment.add_rule(
            MakeRule::new("slepcbuild", "").with_recipe(vec!["@echo \"*** Building SLEPc ***\"".into()]),
        );

        assert_eq!(
            fragment.render_makefile(),
            "SLEPC = yes\n\nslepcbuild: \n\t@echo \"*** Building SLEPc ***\"\n"
        );
        assert!(fragment
            .render_header("PETSC_")
            .contains("#define PETSC_HAVE_SLEPC 1"));
    }

    #[test]
    fn test_merge() {
        let mut a = MakefileFragment::new();
        a.add_macro("SLEPC", "no");
        let mut b = MakefileFragment::new();
        b.add_macro("SLEPC", "yes");
        b.add_rule(MakeRule::new("slepc-install", ""));

        a.merge(&b);
        assert_eq!(a.macro_value("SLEPC"), Some("yes"));
        assert!(a.rule("slepc-install").is_some());
    }
}
