// src/mangling.rs

//! Fortran name mangling conventions
//!
//! C code that calls Fortran-compiled routines has to know how the Fortran
//! compiler decorates symbol names. The convention is detected once per run
//! and turned into the preprocessor define that C sources such as ScaLAPACK's
//! expect.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Symbol decoration applied by the Fortran compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FortranMangling {
    /// f2c style: `name__` for names containing an underscore
    DoubleUnderscore,
    /// `name_`
    #[default]
    Underscore,
    /// `NAME`
    Caps,
    /// `name`
    Unchanged,
}

impl FortranMangling {
    pub const ALL: [FortranMangling; 4] = [
        Self::DoubleUnderscore,
        Self::Underscore,
        Self::Caps,
        Self::Unchanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DoubleUnderscore => "double-underscore",
            Self::Underscore => "underscore",
            Self::Caps => "caps",
            Self::Unchanged => "unchanged",
        }
    }

    /// C preprocessor defines selecting the matching calling convention
    pub fn cdefs(&self) -> &'static str {
        match self {
            Self::DoubleUnderscore => "-Df77IsF2C -DFortranIsF2C",
            Self::Underscore => "-DAdd_",
            Self::Caps => "-DUpCase",
            Self::Unchanged => "-DNoChange",
        }
    }

    /// Apply the convention to a routine name
    pub fn mangle(&self, routine: &str) -> String {
        match self {
            Self::DoubleUnderscore if routine.contains('_') => format!("{}__", routine),
            Self::DoubleUnderscore | Self::Underscore => format!("{}_", routine),
            Self::Caps => routine.to_uppercase(),
            Self::Unchanged => routine.to_string(),
        }
    }

    /// Infer the convention from the symbol a known routine compiled to
    ///
    /// `routine` should contain an underscore so the f2c double underscore
    /// form can be told apart from the plain trailing underscore.
    pub fn detect(routine: &str, symbol: &str) -> Option<Self> {
        // Mach-O prefixes every C-visible symbol with an underscore
        Self::classify(routine, symbol)
            .or_else(|| symbol.strip_prefix('_').and_then(|s| Self::classify(routine, s)))
    }

    fn classify(routine: &str, symbol: &str) -> Option<Self> {
        if symbol == format!("{}__", routine) {
            Some(Self::DoubleUnderscore)
        } else if symbol == format!("{}_", routine) {
            Some(Self::Underscore)
        } else if symbol == routine.to_uppercase() && symbol != routine {
            Some(Self::Caps)
        } else if symbol == routine {
            Some(Self::Unchanged)
        } else {
            None
        }
    }

    /// Every spelling a Fortran routine may have in an object file
    pub fn candidates(routine: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for mangling in Self::ALL {
            let name = mangling.mangle(routine);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        let plain_double = format!("{}__", routine);
        if !names.contains(&plain_double) {
            names.push(plain_double);
        }
        names
    }
}

impl fmt::Display for FortranMangling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FortranMangling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "double-underscore" | "doubleunderscore" | "f2c" => Ok(Self::DoubleUnderscore),
            "underscore" | "single-underscore" => Ok(Self::Underscore),
            "caps" | "uppercase" => Ok(Self::Caps),
            "unchanged" | "none" => Ok(Self::Unchanged),
            other => Err(Error::InvalidOption(format!(
                "unknown Fortran mangling: {} (expected double-underscore, underscore, caps or unchanged)",
                other
            ))),
        }
    }
}
