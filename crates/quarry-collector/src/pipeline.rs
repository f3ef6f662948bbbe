//! The full collection run: discover, analyze, link, rank, assemble.

use crate::analyzer::SourceAnalyzer;
use crate::assembler::RepositoryAssembler;
use crate::config::CollectConfig;
use crate::context::AnalysisContext;
use crate::discovery::FileSetResolver;
use crate::error::{CollectError, Warning};
use crate::repository::Repository;
use quarry_core::{MetricsCalculator, ParserRegistry};
use quarry_graph::{DependencyGraphBuilder, KeyFileScorer, SourceImports};
use std::time::Instant;
use tracing::info;

/// A finished run.
#[derive(Debug)]
pub struct CollectOutcome {
    pub repository: Repository,
    /// Every non-fatal problem, in the order it was found.
    pub warnings: Vec<Warning>,
    pub duration_ms: u64,
}

/// Runs the pipeline with the built-in parsers.
pub fn collect(config: &CollectConfig, ctx: &AnalysisContext) -> Result<CollectOutcome, CollectError> {
    collect_with(config, ctx, &ParserRegistry::with_defaults())
}

/// Runs the pipeline with a caller-supplied parser registry.
pub fn collect_with(
    config: &CollectConfig,
    ctx: &AnalysisContext,
    registry: &ParserRegistry,
) -> Result<CollectOutcome, CollectError> {
    let start = Instant::now();

    let resolved = FileSetResolver::new(&config.sources, &config.excludes).resolve(ctx)?;
    if resolved.is_empty() {
        ctx.diagnostics().push(Warning::EmptyResult);
    }
    let paths = resolved.paths();

    let calculator = config
        .compute_metrics
        .then(|| MetricsCalculator::new(config.thresholds.clone()));
    let analyzed = SourceAnalyzer::new(registry, calculator).analyze_all(ctx, &paths)?;

    let builder = DependencyGraphBuilder::new(ctx.root(), registry);
    let module_map = builder.module_map(&paths);
    ctx.check_cancelled()?;

    let sources: Vec<SourceImports<'_>> = analyzed
        .iter()
        .filter_map(|a| {
            a.outline.as_ref().map(|outline| SourceImports {
                path: &a.path,
                imports: &outline.imports,
            })
        })
        .collect();
    let graph = builder.resolve(&module_map, &paths, &sources);
    ctx.check_cancelled()?;

    let key_files = KeyFileScorer::new(ctx.root()).rank(&resolved.records, &graph);

    let repository = RepositoryAssembler::new(config.name.clone(), ctx.root())
        .assemble(resolved, analyzed, &graph, key_files)?;

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Collected {} file(s) and {} edge(s) in {}ms",
        repository.files().len(),
        repository.statistics().edge_count,
        duration_ms
    );

    Ok(CollectOutcome {
        repository,
        warnings: ctx.diagnostics().take(),
        duration_ms,
    })
}
