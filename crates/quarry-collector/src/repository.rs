//! The Repository aggregate.
//!
//! Built once per run by the assembler and read-only afterwards: fields are
//! private and only accessors are exposed. The whole aggregate serializes
//! to JSON with stable snake_case names and reads back to an equal value.

use crate::patterns::PatternSummary;
use quarry_core::{ComponentOutline, FileMetrics, FileRecord, Rank};
use quarry_graph::{DependencyEdge, KeyFile};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

const DESCRIPTION_LIMIT: usize = 150;

/// One file and everything known about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryFile {
    id: String,
    record: FileRecord,
    relative_path: String,
    outline: Option<ComponentOutline>,
    metrics: Option<FileMetrics>,
    depends_on: BTreeSet<PathBuf>,
    used_by: BTreeSet<PathBuf>,
}

impl RepositoryFile {
    pub(crate) fn new(
        id: String,
        record: FileRecord,
        relative_path: String,
        outline: Option<ComponentOutline>,
        metrics: Option<FileMetrics>,
        depends_on: BTreeSet<PathBuf>,
        used_by: BTreeSet<PathBuf>,
    ) -> Self {
        Self {
            id,
            record,
            relative_path,
            outline,
            metrics,
            depends_on,
            used_by,
        }
    }

    /// Stable identifier, `file_<n>` in path order.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.record.path
    }

    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    /// Path relative to the invocation root with forward slashes, or the
    /// absolute path for files outside it.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn outline(&self) -> Option<&ComponentOutline> {
        self.outline.as_ref()
    }

    pub fn metrics(&self) -> Option<&FileMetrics> {
        self.metrics.as_ref()
    }

    /// Files this one imports.
    pub fn depends_on(&self) -> &BTreeSet<PathBuf> {
        &self.depends_on
    }

    /// Files that import this one.
    pub fn used_by(&self) -> &BTreeSet<PathBuf> {
        &self.used_by
    }

    /// A one-line summary: the first docstring line, or the file location.
    pub fn description(&self) -> String {
        let docstring = self
            .outline
            .as_ref()
            .and_then(|o| o.docstring.as_deref())
            .map(str::trim)
            .filter(|d| !d.is_empty());

        match docstring {
            Some(doc) => {
                let first_line = doc.lines().next().unwrap_or_default();
                let mut description: String =
                    first_line.chars().take(DESCRIPTION_LIMIT).collect();
                if doc.chars().count() > DESCRIPTION_LIMIT {
                    description.push_str("...");
                }
                description
            }
            None => format!("File at {}", self.relative_path),
        }
    }
}

/// Aggregate code quality over the files that have metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub files_measured: usize,
    pub average_complexity: f64,
    /// Rank letter to file count, every rank present.
    pub complexity_distribution: BTreeMap<String, usize>,
    pub average_maintainability: f64,
    pub maintainability_distribution: BTreeMap<String, usize>,
    pub total_smells: usize,
}

impl QualitySummary {
    /// `None` when no file has metrics.
    pub fn from_metrics<'a, I>(metrics: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a FileMetrics>,
    {
        let mut complexity_distribution = empty_distribution();
        let mut maintainability_distribution = empty_distribution();
        let mut complexity_sum = 0.0;
        let mut maintainability_sum = 0.0;
        let mut total_smells = 0;
        let mut files_measured = 0;

        for m in metrics {
            files_measured += 1;
            complexity_sum += m.complexity.average;
            maintainability_sum += m.maintainability.value;
            total_smells += m.smells.len();
            *complexity_distribution
                .entry(m.complexity.rank.to_string())
                .or_default() += 1;
            *maintainability_distribution
                .entry(m.maintainability.rank.to_string())
                .or_default() += 1;
        }

        if files_measured == 0 {
            return None;
        }
        Some(Self {
            files_measured,
            average_complexity: complexity_sum / files_measured as f64,
            complexity_distribution,
            average_maintainability: maintainability_sum / files_measured as f64,
            maintainability_distribution,
            total_smells,
        })
    }
}

fn empty_distribution() -> BTreeMap<String, usize> {
    Rank::ALL.iter().map(|rank| (rank.to_string(), 0)).collect()
}

fn format_distribution(distribution: &BTreeMap<String, usize>) -> String {
    distribution
        .iter()
        .map(|(rank, count)| format!("{}: {}", rank, count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Repository-wide counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub file_count: usize,
    pub total_lines: usize,
    /// Extensions present, with leading dot.
    pub extensions: BTreeSet<String>,
    /// Files per extension. Files without one are counted under `""`.
    pub extension_counts: BTreeMap<String, usize>,
    pub edge_count: usize,
    /// Import references that produced no edge, by cause.
    pub unresolved_imports: BTreeMap<String, usize>,
    pub quality: Option<QualitySummary>,
}

impl fmt::Display for StatisticsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file_count == 0 {
            return write!(f, "No files found matching the specified criteria.");
        }

        let extensions: Vec<&str> = self.extensions.iter().map(String::as_str).collect();
        writeln!(f, "- Extensions analyzed: {}", extensions.join(", "))?;
        writeln!(f, "- Number of files analyzed: {}", self.file_count)?;
        writeln!(f, "- Total lines of code (approx): {}", self.total_lines)?;
        write!(f, "- Dependency edges: {}", self.edge_count)?;

        if let Some(quality) = &self.quality {
            writeln!(f)?;
            writeln!(
                f,
                "- Average cyclomatic complexity: {:.2}",
                quality.average_complexity
            )?;
            writeln!(
                f,
                "- Complexity distribution: {}",
                format_distribution(&quality.complexity_distribution)
            )?;
            writeln!(
                f,
                "- Average maintainability index: {:.2}",
                quality.average_maintainability
            )?;
            writeln!(
                f,
                "- Maintainability distribution: {}",
                format_distribution(&quality.maintainability_distribution)
            )?;
            write!(f, "- Total code smells detected: {}", quality.total_smells)?;
        }
        Ok(())
    }
}

/// The analysis result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    name: String,
    root: PathBuf,
    statistics: StatisticsSummary,
    files: Vec<RepositoryFile>,
    key_files: Vec<KeyFile>,
    patterns: PatternSummary,
}

impl Repository {
    pub(crate) fn new(
        name: String,
        root: PathBuf,
        statistics: StatisticsSummary,
        files: Vec<RepositoryFile>,
        key_files: Vec<KeyFile>,
        patterns: PatternSummary,
    ) -> Self {
        Self {
            name,
            root,
            statistics,
            files,
            key_files,
            patterns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The invocation root, absolute.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn statistics(&self) -> &StatisticsSummary {
        &self.statistics
    }

    /// All files, ordered by path.
    pub fn files(&self) -> &[RepositoryFile] {
        &self.files
    }

    pub fn file(&self, path: &Path) -> Option<&RepositoryFile> {
        self.files
            .binary_search_by(|f| f.path().cmp(path))
            .ok()
            .map(|i| &self.files[i])
    }

    /// Best first.
    pub fn key_files(&self) -> &[KeyFile] {
        &self.key_files
    }

    pub fn patterns(&self) -> &PatternSummary {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Every dependency edge, sorted.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.files
            .iter()
            .flat_map(|file| {
                file.depends_on
                    .iter()
                    .map(move |to| DependencyEdge::new(file.path(), to))
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with_docstring(docstring: Option<&str>) -> RepositoryFile {
        let outline = ComponentOutline {
            docstring: docstring.map(str::to_string),
            ..Default::default()
        };
        RepositoryFile::new(
            "file_0".into(),
            FileRecord::new("/repo/pkg/mod.py", 10),
            "pkg/mod.py".into(),
            Some(outline),
            None,
            BTreeSet::new(),
            BTreeSet::new(),
        )
    }

    #[test]
    fn test_description() {
        assert_eq!(
            file_with_docstring(Some("Loads things.\n\nMore detail.")).description(),
            "Loads things."
        );
        assert_eq!(file_with_docstring(None).description(), "File at pkg/mod.py");
        assert_eq!(file_with_docstring(Some("   ")).description(), "File at pkg/mod.py");

        let long = "x".repeat(200);
        let description = file_with_docstring(Some(&long)).description();
        assert_eq!(description.len(), 153);
        assert!(description.ends_with("..."));

        let short_first_line = format!("Short.\n{}", "y".repeat(200));
        assert_eq!(
            file_with_docstring(Some(&short_first_line)).description(),
            "Short...."
        );
    }

    #[test]
    fn test_empty_statistics_render() {
        assert_eq!(
            StatisticsSummary::default().to_string(),
            "No files found matching the specified criteria."
        );
    }

    #[test]
    fn test_statistics_render_without_quality() {
        let stats = StatisticsSummary {
            file_count: 2,
            total_lines: 30,
            extensions: [".md".to_string(), ".py".to_string()].into(),
            edge_count: 1,
            ..Default::default()
        };
        assert_eq!(
            stats.to_string(),
            "- Extensions analyzed: .md, .py\n\
             - Number of files analyzed: 2\n\
             - Total lines of code (approx): 30\n\
             - Dependency edges: 1"
        );
    }

    #[test]
    fn test_quality_summary_requires_metrics() {
        assert!(QualitySummary::from_metrics(std::iter::empty()).is_none());
    }
}
