//! Quarry Collector - from include rules to a Repository
//!
//! This crate drives a whole analysis run on top of `quarry-core` and
//! `quarry-graph`:
//!
//! 1. `FileSetResolver` expands include/exclude rules into a file set
//! 2. `SourceAnalyzer` parses each file into an outline and metrics
//! 3. `DependencyGraphBuilder` links files through their imports
//! 4. `KeyFileScorer` picks the central files
//! 5. `RepositoryAssembler` joins it all into a `Repository`
//!
//! # Example
//!
//! ```no_run
//! use quarry_collector::{collect, AnalysisContext, CollectConfig};
//!
//! let config = CollectConfig::merge(&["py:src"], &["*:tests"], Some("demo"), None)?;
//! let ctx = AnalysisContext::new(".")?;
//! let outcome = collect(&config, &ctx)?;
//!
//! println!("{}", outcome.repository.statistics());
//! # Ok::<(), quarry_collector::CollectError>(())
//! ```

mod analyzer;
mod assembler;
mod config;
mod context;
mod discovery;
mod error;
mod patterns;
mod pipeline;
mod repository;

pub use analyzer::{AnalyzedFile, SourceAnalysis, SourceAnalyzer};
pub use assembler::RepositoryAssembler;
pub use config::{
    parse_exclude_args, parse_source_args, CollectConfig, ExcludeRule, ExtensionSet, FileConfig,
    SourceSpec, DEFAULT_INCLUDE_SPEC, DEFAULT_REPOSITORY_NAME,
};
pub use context::{AnalysisContext, CancellationToken, Diagnostics};
pub use discovery::{FileSetResolver, ResolvedFiles};
pub use error::{AssemblyError, CollectError, ConfigError, DiscoveryWarning, Warning};
pub use patterns::{detect_patterns, ImportCount, PatternSummary};
pub use pipeline::{collect, collect_with, CollectOutcome};
pub use repository::{QualitySummary, Repository, RepositoryFile, StatisticsSummary};
