//! Error types for source parsing.
//!
//! `ParseError` is what the parsing layer returns. Callers that must keep
//! going after a bad file turn it into a `ParseWarning`, which is a plain
//! value that can be collected and reported later.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for parsing operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while reading or parsing a source file.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tree-sitter could not be configured or returned no tree.
    #[error("parser error: {0}")]
    ParserError(String),

    /// The source is not valid for the dialect.
    #[error("syntax error in {} at line {line}, column {column}", path.display())]
    Syntax {
        path: PathBuf,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    /// Wraps an I/O error with the path that caused it.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Downgrades the error to a non-fatal warning about `path`.
    pub fn into_warning(self, path: &Path) -> ParseWarning {
        ParseWarning {
            path: path.to_path_buf(),
            reason: self.to_string(),
        }
    }
}

/// A per-file failure that does not stop the run.
///
/// The file stays in the repository, but contributes no outline data and
/// no metrics.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{}: {reason}", path.display())]
pub struct ParseWarning {
    pub path: PathBuf,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_message() {
        let err = ParseError::Syntax {
            path: PathBuf::from("pkg/broken.py"),
            line: 3,
            column: 7,
        };
        assert_eq!(
            err.to_string(),
            "syntax error in pkg/broken.py at line 3, column 7"
        );
    }

    #[test]
    fn test_into_warning_keeps_path_and_reason() {
        let err = ParseError::io(
            "missing.py",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let warning = err.into_warning(Path::new("/abs/missing.py"));

        assert_eq!(warning.path, PathBuf::from("/abs/missing.py"));
        assert!(warning.reason.contains("failed to read missing.py"));
    }
}
