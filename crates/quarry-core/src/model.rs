//! Core data types produced by discovery and parsing.
//!
//! A `FileRecord` is created once per discovered file. A `ComponentOutline`
//! is the structural summary a `SourceParser` extracts from it. Both are
//! plain data: every field is serializable and nothing here touches a
//! syntax tree.

use crate::error::{ParseError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Files
// ─────────────────────────────────────────────────────────────────────────────

/// Filesystem facts about one discovered file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute, canonical path. Unique within a run.
    pub path: PathBuf,

    /// Lowercase extension with its leading dot (`.py`), or empty.
    pub extension: String,

    /// Size on disk in bytes.
    pub size_bytes: u64,

    /// Number of text lines.
    pub line_count: usize,

    /// Last modification time, when the platform reports it.
    pub modified: Option<DateTime<Utc>>,

    /// Creation time, when the platform reports it.
    pub created: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Creates a record without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let extension = extension_of(&path);
        Self {
            path,
            extension,
            size_bytes,
            line_count: 0,
            modified: None,
            created: None,
        }
    }

    /// Sets the line count.
    pub fn with_line_count(mut self, line_count: usize) -> Self {
        self.line_count = line_count;
        self
    }

    /// Sets both timestamps.
    pub fn with_timestamps(
        mut self,
        modified: Option<DateTime<Utc>>,
        created: Option<DateTime<Utc>>,
    ) -> Self {
        self.modified = modified;
        self.created = created;
        self
    }

    /// Reads metadata and counts lines for an existing file.
    ///
    /// Only missing metadata is an error. Content that cannot be read gives
    /// a line count of 0; content that is not valid UTF-8 is decoded lossily.
    pub fn read(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| ParseError::io(path, e))?;
        let line_count = match fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).lines().count(),
            Err(e) => {
                debug!("Could not read {} to count lines: {}", path.display(), e);
                0
            }
        };

        let modified: Option<DateTime<Utc>> = metadata.modified().ok().map(DateTime::from);
        // Some filesystems report a creation time later than the last write;
        // never claim a file was created after it was modified.
        let created = metadata
            .created()
            .ok()
            .map(DateTime::<Utc>::from)
            .map(|created| match modified {
                Some(modified) if modified < created => modified,
                _ => created,
            });

        Ok(Self::new(path, metadata.len())
            .with_line_count(line_count)
            .with_timestamps(modified, created))
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }

    /// File name including its extension.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }
}

/// Lowercase `.ext` for a path, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// Imports
// ─────────────────────────────────────────────────────────────────────────────

/// Whether a reference names a module from the top of the project or
/// relative to the importing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Absolute,
    Relative,
}

/// A name pulled in by a `from ... import` style statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// One raw, unresolved module reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReference {
    pub kind: ImportKind,

    /// Relative depth (number of leading dots). Zero for absolute imports.
    pub level: usize,

    /// The dotted module path split on dots. May be empty for `from . import x`.
    pub module_parts: Vec<String>,

    /// Names bound by a `from` import. Empty for plain module imports.
    pub imported_names: Vec<ImportedName>,

    /// Alias of a plain module import (`import numpy as np`).
    pub alias: Option<String>,

    /// 1-based line of the statement.
    pub line: u32,
}

impl ImportReference {
    /// A plain `import a.b.c` reference.
    pub fn module(module: &str, line: u32) -> Self {
        Self {
            kind: ImportKind::Absolute,
            level: 0,
            module_parts: split_dotted(module),
            imported_names: Vec::new(),
            alias: None,
            line,
        }
    }

    /// A `from <dots><module> import names` reference.
    pub fn from_import(level: usize, module: &str, names: Vec<ImportedName>, line: u32) -> Self {
        Self {
            kind: if level == 0 {
                ImportKind::Absolute
            } else {
                ImportKind::Relative
            },
            level,
            module_parts: split_dotted(module),
            imported_names: names,
            alias: None,
            line,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The dotted module path (`a.b.c`), without leading dots.
    pub fn module_path(&self) -> String {
        self.module_parts.join(".")
    }

    /// Canonical statement text with aliases dropped.
    ///
    /// Two imports that bind the same things under different local names
    /// render identically.
    pub fn statement(&self) -> String {
        if self.imported_names.is_empty() {
            return format!("import {}", self.module_path());
        }
        let names: Vec<&str> = self
            .imported_names
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        format!(
            "from {}{} import {}",
            ".".repeat(self.level),
            self.module_path(),
            names.join(", ")
        )
    }
}

fn split_dotted(module: &str) -> Vec<String> {
    module
        .split('.')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Declarations
// ─────────────────────────────────────────────────────────────────────────────

/// A top-level type (class) and the names of its direct members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredType {
    pub name: String,
    pub docstring: Option<String>,
    pub member_names: Vec<String>,
}

/// A top-level function and its parameter names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredFunction {
    pub name: String,
    pub docstring: Option<String>,
    pub param_names: Vec<String>,
}

/// Everything a dialect can report about a file's structure.
///
/// Dialects emit these; `ComponentOutline::push` consumes them, so adding a
/// variant forces every consumer to handle it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Type(DeclaredType),
    Function(DeclaredFunction),
    Import(ImportReference),
}

/// Structural summary of one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentOutline {
    pub docstring: Option<String>,
    pub types: Vec<DeclaredType>,
    pub functions: Vec<DeclaredFunction>,
    pub imports: Vec<ImportReference>,
}

impl ComponentOutline {
    /// Appends a declaration, keeping each list in source order.
    pub fn push(&mut self, declaration: Declaration) {
        match declaration {
            Declaration::Type(declared) => self.types.push(declared),
            Declaration::Function(declared) => self.functions.push(declared),
            Declaration::Import(reference) => self.imports.push(reference),
        }
    }

    /// True when nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.docstring.is_none()
            && self.types.is_empty()
            && self.functions.is_empty()
            && self.imports.is_empty()
    }
}

impl FromIterator<Declaration> for ComponentOutline {
    fn from_iter<I: IntoIterator<Item = Declaration>>(iter: I) -> Self {
        let mut outline = Self::default();
        for declaration in iter {
            outline.push(declaration);
        }
        outline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_extension_is_lowercase_with_dot() {
        assert_eq!(extension_of(Path::new("/a/B.PY")), ".py");
        assert_eq!(extension_of(Path::new("/a/Makefile")), "");
    }

    #[test]
    fn test_read_counts_lines() {
        let mut file = tempfile::Builder::new().suffix(".py").tempfile().unwrap();
        write!(file, "import os\n\nprint(os.name)\n").unwrap();

        let record = FileRecord::read(file.path()).unwrap();
        assert_eq!(record.line_count, 3);
        assert_eq!(record.size_bytes, 26);
        assert_eq!(record.extension, ".py");
        assert!(record.modified.is_some());
    }

    #[test]
    fn test_unreadable_content_keeps_the_record() {
        // metadata succeeds on a directory but reading it as a file fails
        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked.py");
        fs::create_dir(&locked).unwrap();

        let record = FileRecord::read(&locked).unwrap();
        assert_eq!(record.line_count, 0);
        assert_eq!(record.extension, ".py");

        assert!(FileRecord::read(&dir.path().join("missing.py")).is_err());
    }

    #[test]
    fn test_statement_drops_aliases() {
        let plain = ImportReference::module("numpy", 1).with_alias("np");
        assert_eq!(plain.statement(), "import numpy");

        let from = ImportReference::from_import(
            2,
            "core.models",
            vec![
                ImportedName::new("User").with_alias("U"),
                ImportedName::new("Group"),
            ],
            4,
        );
        assert_eq!(from.kind, ImportKind::Relative);
        assert_eq!(from.module_parts, vec!["core", "models"]);
        assert_eq!(from.statement(), "from ..core.models import User, Group");
    }

    #[test]
    fn test_outline_collects_declarations_in_order() {
        let outline: ComponentOutline = vec![
            Declaration::Function(DeclaredFunction {
                name: "first".into(),
                docstring: None,
                param_names: vec![],
            }),
            Declaration::Import(ImportReference::module("os", 1)),
            Declaration::Function(DeclaredFunction {
                name: "second".into(),
                docstring: None,
                param_names: vec!["x".into()],
            }),
        ]
        .into_iter()
        .collect();

        assert_eq!(outline.functions.len(), 2);
        assert_eq!(outline.functions[1].name, "second");
        assert_eq!(outline.imports.len(), 1);
        assert!(!outline.is_empty());
        assert!(ComponentOutline::default().is_empty());
    }
}
