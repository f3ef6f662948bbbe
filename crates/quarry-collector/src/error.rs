//! Error and warning types for a collection run.
//!
//! Errors abort the run. Warnings are values: they are logged as they
//! happen, collected in the context's `Diagnostics`, and returned next to
//! the repository.

use quarry_core::ParseWarning;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Invalid configuration. Raised before any filesystem walk.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid include/exclude format: '{arg}'. Expected 'EXTS:PATH' or '*:PATTERN'.")]
    MissingSeparator { arg: String },

    #[error("No extensions specified in '{arg}'. Use '*' for all.")]
    NoExtensions { arg: String },

    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Config file not found: '{}'", path.display())]
    NotFound { path: PathBuf },

    #[error("Could not read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing TOML config file '{}': {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: 'pattern' missing in top-level exclude #{index}")]
    MissingPattern { index: usize },
}

/// A join key that should exist does not. Always a programming error.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("no analysis result for {}", .0.display())]
    MissingAnalysis(PathBuf),

    #[error("analysis result for {} has no file record", .0.display())]
    UnknownFile(PathBuf),
}

/// Fatal errors of a collection run.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid invocation root '{}': {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error("collection cancelled")]
    Cancelled,
}

/// A source root or entry that could not be walked.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{}: {reason}", path.display())]
pub struct DiscoveryWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl DiscoveryWarning {
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Something went wrong but the run continued.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    #[error("discovery: {0}")]
    Discovery(DiscoveryWarning),

    #[error("parse: {0}")]
    Parse(ParseWarning),

    #[error("No files found matching the specified criteria.")]
    EmptyResult,
}

impl From<DiscoveryWarning> for Warning {
    fn from(warning: DiscoveryWarning) -> Self {
        Warning::Discovery(warning)
    }
}

impl From<ParseWarning> for Warning {
    fn from(warning: ParseWarning) -> Self {
        Warning::Parse(warning)
    }
}
