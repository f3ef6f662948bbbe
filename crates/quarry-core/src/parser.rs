//! The pluggable parsing capability.
//!
//! A `SourceParser` knows one dialect: which extensions it owns, which
//! tree-sitter grammar reads it, and how to turn the resulting tree into
//! declarations and quality facts. The `ParserRegistry` maps extensions to
//! parsers so the rest of the pipeline never names a dialect directly.

use crate::error::{ParseError, Result};
use crate::languages::PythonParser;
use crate::metrics::QualityFacts;
use crate::model::{ComponentOutline, Declaration};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};
use tree_sitter::{Language, Node, Parser, Tree};

/// A source dialect.
///
/// Implementations are stateless; a fresh tree-sitter `Parser` is created
/// per file so one instance can serve every worker thread.
pub trait SourceParser: Send + Sync {
    /// Short display name ("python").
    fn name(&self) -> &'static str;

    /// The tree-sitter grammar for this dialect.
    fn language(&self) -> Language;

    /// Extensions handled, lowercase and without the leading dot.
    fn extensions(&self) -> &[&str];

    /// File stem that turns a directory into an importable package.
    fn package_marker(&self) -> Option<&str> {
        None
    }

    /// The cleaned leading docstring of the module, if any.
    fn module_docstring(&self, tree: &Tree, source: &str) -> Option<String>;

    /// Top-level types and functions plus every import reference in the
    /// file, in source order.
    fn extract_declarations(&self, tree: &Tree, source: &str) -> Vec<Declaration>;

    /// Counts the metrics calculator needs.
    fn quality_facts(&self, tree: &Tree, source: &str) -> QualityFacts;

    /// Builds the full outline for a parsed file.
    fn outline(&self, tree: &Tree, source: &str) -> ComponentOutline {
        let mut outline: ComponentOutline =
            self.extract_declarations(tree, source).into_iter().collect();
        outline.docstring = self.module_docstring(tree, source);
        outline
    }
}

/// Maps file extensions to the parser that owns them.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: Vec<Arc<dyn SourceParser>>,
    by_extension: HashMap<String, usize>,
}

impl ParserRegistry {
    /// An empty registry. Every file is unsupported.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in dialect.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PythonParser);
        registry
    }

    /// Registers a parser. Later registrations win for shared extensions.
    pub fn register(&mut self, parser: impl SourceParser + 'static) {
        let index = self.parsers.len();
        for ext in parser.extensions() {
            self.by_extension.insert(ext.to_lowercase(), index);
        }
        self.parsers.push(Arc::new(parser));
    }

    /// Looks up a parser by extension, with or without the leading dot.
    pub fn for_extension(&self, ext: &str) -> Option<&dyn SourceParser> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.by_extension
            .get(&ext)
            .map(|&index| self.parsers[index].as_ref())
    }

    /// Looks up the parser for a path by its extension.
    pub fn for_path(&self, path: &Path) -> Option<&dyn SourceParser> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| self.for_extension(ext))
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.parsers.iter().map(|p| p.name()).collect();
        f.debug_struct("ParserRegistry")
            .field("parsers", &names)
            .finish()
    }
}

/// Reads a source file, replacing invalid UTF-8 sequences.
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| ParseError::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// A successfully parsed file: the source, its tree and the dialect that
/// produced it.
pub struct ParsedSource<'p> {
    pub parser: &'p dyn SourceParser,
    pub source: String,
    pub tree: Tree,
}

impl<'p> ParsedSource<'p> {
    /// Parses `source` with `parser`.
    ///
    /// Tree-sitter always produces a tree, even for broken input. A tree that
    /// contains error or missing nodes is rejected so callers never see
    /// half-extracted declarations.
    pub fn parse(parser: &'p dyn SourceParser, path: &Path, source: String) -> Result<Self> {
        let mut ts = Parser::new();
        ts.set_language(&parser.language())
            .map_err(|e| ParseError::ParserError(format!("Failed to set language: {}", e)))?;

        let tree = ts
            .parse(&source, None)
            .ok_or_else(|| ParseError::ParserError("Tree-sitter returned no tree".into()))?;

        let root = tree.root_node();
        if root.has_error() {
            let bad = first_error(root).unwrap_or(root);
            let position = bad.start_position();
            debug!(
                "rejecting {}: {} node at {}:{}",
                path.display(),
                bad.kind(),
                position.row + 1,
                position.column + 1
            );
            return Err(ParseError::Syntax {
                path: path.to_path_buf(),
                line: position.row + 1,
                column: position.column + 1,
            });
        }

        trace!("parsed {} as {}", path.display(), parser.name());
        Ok(Self {
            parser,
            source,
            tree,
        })
    }

    /// Reads and parses a file.
    pub fn from_file(parser: &'p dyn SourceParser, path: &Path) -> Result<Self> {
        let source = read_source(path)?;
        Self::parse(parser, path, source)
    }

    pub fn outline(&self) -> ComponentOutline {
        self.parser.outline(&self.tree, &self.source)
    }

    pub fn quality_facts(&self) -> QualityFacts {
        self.parser.quality_facts(&self.tree, &self.source)
    }
}

/// Depth-first search for the first error or missing node.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}
