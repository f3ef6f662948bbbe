//! Joins discovery, analysis, graph and ranking output into a Repository.
//!
//! No I/O happens here. The only failure is a join key missing on one
//! side, which means an earlier stage dropped or invented a file.

use crate::analyzer::AnalyzedFile;
use crate::discovery::{relative_slash_path, ResolvedFiles};
use crate::error::AssemblyError;
use crate::patterns::detect_patterns;
use crate::repository::{QualitySummary, Repository, RepositoryFile, StatisticsSummary};
use quarry_graph::{DependencyGraph, KeyFile};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::debug;

pub struct RepositoryAssembler {
    name: String,
    root: PathBuf,
}

impl RepositoryAssembler {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn assemble(
        &self,
        resolved: ResolvedFiles,
        analyzed: Vec<AnalyzedFile>,
        graph: &DependencyGraph,
        key_files: Vec<KeyFile>,
    ) -> Result<Repository, AssemblyError> {
        let mut by_path: HashMap<PathBuf, AnalyzedFile> = analyzed
            .into_iter()
            .map(|a| (a.path.clone(), a))
            .collect();

        let mut used_by_map = graph.used_by_map();
        let mut files = Vec::with_capacity(resolved.records.len());
        let mut extension_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_lines = 0;

        for (i, record) in resolved.records.into_iter().enumerate() {
            let analysis = by_path
                .remove(&record.path)
                .ok_or_else(|| AssemblyError::MissingAnalysis(record.path.clone()))?;

            total_lines += record.line_count;
            *extension_counts.entry(record.extension.clone()).or_default() += 1;

            let relative_path = relative_slash_path(&self.root, &record.path)
                .unwrap_or_else(|| record.path.to_string_lossy().replace('\\', "/"));
            let depends_on = graph.depends_on(&record.path);
            let used_by = used_by_map.remove(&record.path).unwrap_or_default();

            files.push(RepositoryFile::new(
                format!("file_{}", i),
                record,
                relative_path,
                analysis.outline,
                analysis.metrics,
                depends_on,
                used_by,
            ));
        }

        if let Some(extra) = by_path.into_keys().min() {
            return Err(AssemblyError::UnknownFile(extra));
        }

        let patterns = detect_patterns(
            files
                .iter()
                .filter_map(|f| f.outline().map(|outline| (f.path(), outline))),
        );

        let statistics = StatisticsSummary {
            file_count: files.len(),
            total_lines,
            extensions: resolved.extensions,
            extension_counts,
            edge_count: graph.edge_count(),
            unresolved_imports: graph
                .unresolved()
                .iter()
                .map(|(cause, count)| (cause.to_string(), count))
                .collect(),
            quality: QualitySummary::from_metrics(files.iter().filter_map(|f| f.metrics())),
        };
        debug!(
            "Assembled {} file(s), {} edge(s), {} key file(s)",
            statistics.file_count,
            statistics.edge_count,
            key_files.len()
        );

        Ok(Repository::new(
            self.name.clone(),
            self.root.clone(),
            statistics,
            files,
            key_files,
            patterns,
        ))
    }
}
