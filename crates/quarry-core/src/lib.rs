//! Quarry Core - parsing and per-file analysis
//!
//! This crate turns source files into plain data: a `FileRecord` of
//! filesystem facts, a `ComponentOutline` of declarations and imports, and
//! `FileMetrics` describing code quality. Dialects plug in through the
//! `SourceParser` trait and are looked up by extension in a
//! `ParserRegistry`.
//!
//! # Example
//!
//! ```no_run
//! use quarry_core::{MetricsCalculator, ParsedSource, ParserRegistry};
//! use std::path::Path;
//!
//! let registry = ParserRegistry::with_defaults();
//! let path = Path::new("src/app.py");
//! let parser = registry.for_path(path).expect("python is built in");
//!
//! let parsed = ParsedSource::from_file(parser, path)?;
//! let outline = parsed.outline();
//! let metrics = MetricsCalculator::default().calculate(&parsed, path);
//! println!("{} functions, rank {}", outline.functions.len(), metrics.complexity.rank);
//! # Ok::<(), quarry_core::ParseError>(())
//! ```

pub mod error;
pub mod languages;
pub mod metrics;
pub mod model;
pub mod parser;

pub use error::{ParseError, ParseWarning, Result};
pub use languages::PythonParser;
pub use metrics::{
    CodeSmell, ComplexityScore, FileMetrics, FunctionComplexity, FunctionFacts, HalsteadCounts,
    MaintainabilityScore, MetricsCalculator, MetricsThresholds, QualityFacts, Rank, RawMetrics,
    SmellKind,
};
pub use model::{
    extension_of, ComponentOutline, Declaration, DeclaredFunction, DeclaredType, FileRecord,
    ImportKind, ImportReference, ImportedName,
};
pub use parser::{read_source, ParsedSource, ParserRegistry, SourceParser};
