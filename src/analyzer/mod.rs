//! Structural extraction of source files
//!
//! The analyzer turns one file's bytes into a [`ModuleOutline`]: the
//! classes, functions and name bindings found at the top level of the file.
//! Files that cannot be decoded or parsed are not errors; they come back as
//! [`FileOutcome::Skipped`] and the caller moves on to the next file.

pub mod python;

pub use python::PythonAnalyzer;

use std::fmt;

/// Result of analyzing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file parsed; its structure is ready to be stored
    Parsed(ModuleOutline),
    /// The file was skipped and produces no records
    Skipped(SkipReason),
}

/// Why a file produced no module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Content is not valid UTF-8
    Decode { valid_up_to: usize },
    /// Content is not valid Python 3, including Python 2 `print`/`exec`
    /// statements; `line` is the first offending line (1-indexed)
    Syntax { line: u32 },
    /// The parser produced no tree at all
    NoTree,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Decode { valid_up_to } => {
                write!(f, "not valid UTF-8 after byte {}", valid_up_to)
            }
            SkipReason::Syntax { line } => write!(f, "syntax error at line {}", line),
            SkipReason::NoTree => write!(f, "parser produced no tree"),
        }
    }
}

/// Top-level structure of one parsed file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleOutline {
    /// Module name: the slash-joined path of the file
    pub name: String,
    /// Top-level classes, in source order
    pub classes: Vec<ClassOutline>,
    /// Top-level functions, in source order
    pub functions: Vec<FunctionOutline>,
    /// Top-level name bindings, in source order
    pub attributes: Vec<String>,
}

impl ModuleOutline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A top-level class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassOutline {
    pub name: String,
    /// First line of the `class` statement (1-indexed)
    pub start_lineno: u32,
    /// Last line of the class body (1-indexed, inclusive)
    pub end_lineno: u32,
    /// Instance attributes assigned through the instance in the class's methods
    pub instance_attributes: Vec<String>,
    /// Names of functions defined directly in the class body
    pub methods: Vec<String>,
}

/// A top-level function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionOutline {
    pub name: String,
    pub start_lineno: u32,
    pub end_lineno: u32,
}
