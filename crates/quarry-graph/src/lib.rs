//! Quarry Graph - file dependency management
//!
//! This crate turns raw import references into a file-to-file dependency
//! graph and ranks files by how central they are to the repository.
//!
//! # Architecture
//!
//! The graph uses petgraph internally. Building it is two passes:
//! - Module map: every supported file gets a dotted module path
//! - Resolution: each import is matched against the map (absolute) or
//!   the importing file's location (relative)
//!
//! # Example
//!
//! ```no_run
//! use quarry_core::{ImportReference, ParserRegistry};
//! use quarry_graph::{DependencyGraphBuilder, KeyFileScorer, SourceImports};
//! use std::path::{Path, PathBuf};
//!
//! let registry = ParserRegistry::with_defaults();
//! let files = vec![PathBuf::from("/repo/app.py"), PathBuf::from("/repo/db.py")];
//! let imports = vec![ImportReference::module("db", 1)];
//!
//! let graph = DependencyGraphBuilder::new("/repo", &registry).build(
//!     &files,
//!     &[SourceImports { path: Path::new("/repo/app.py"), imports: &imports }],
//! );
//! assert_eq!(graph.edge_count(), 1);
//! ```

mod builder;
mod edge;
mod graph;
mod module_map;
mod ranking;

pub use builder::{DependencyGraphBuilder, SourceImports};
pub use edge::{DependencyEdge, ImportSite, UnresolvedCause, UnresolvedCounts};
pub use graph::{DependencyGraph, NodeId};
pub use module_map::{module_name, ModuleMap};
pub use ranking::{key_file_count, KeyFile, KeyFileScore, KeyFileScorer};
