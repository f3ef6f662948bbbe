//! Per-file source analysis.
//!
//! Each supported file is parsed once; the tree feeds both the outline and
//! the metrics. Files are independent, so they are processed on a rayon
//! pool and collected back in input order.

use crate::context::AnalysisContext;
use crate::error::CollectError;
use quarry_core::{
    ComponentOutline, FileMetrics, MetricsCalculator, ParseWarning, ParsedSource, ParserRegistry,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outline and metrics of one successfully parsed file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAnalysis {
    pub outline: ComponentOutline,
    /// `None` when metrics are disabled.
    pub metrics: Option<FileMetrics>,
}

/// The analysis of one file as it enters assembly.
///
/// `outline` is `None` only for unsupported extensions. A supported file
/// that failed to read or parse has an empty outline and no metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedFile {
    pub path: PathBuf,
    pub outline: Option<ComponentOutline>,
    pub metrics: Option<FileMetrics>,
}

pub struct SourceAnalyzer<'r> {
    registry: &'r ParserRegistry,
    calculator: Option<MetricsCalculator>,
}

impl<'r> SourceAnalyzer<'r> {
    /// `calculator` is `None` to skip metrics.
    pub fn new(registry: &'r ParserRegistry, calculator: Option<MetricsCalculator>) -> Self {
        Self {
            registry,
            calculator,
        }
    }

    /// Analyzes one file. `None` means no parser handles its extension.
    pub fn analyze(&self, path: &Path) -> Option<Result<SourceAnalysis, ParseWarning>> {
        let parser = self.registry.for_path(path)?;
        let result = ParsedSource::from_file(parser, path)
            .map(|parsed| SourceAnalysis {
                outline: parsed.outline(),
                metrics: self
                    .calculator
                    .as_ref()
                    .map(|calculator| calculator.calculate(&parsed, path)),
            })
            .map_err(|e| e.into_warning(path));
        Some(result)
    }

    /// Analyzes every file on the context's worker pool.
    ///
    /// Results follow the order of `paths`. Parse failures are pushed to the
    /// context's diagnostics in that same order.
    pub fn analyze_all(
        &self,
        ctx: &AnalysisContext,
        paths: &[PathBuf],
    ) -> Result<Vec<AnalyzedFile>, CollectError> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(jobs) = ctx.jobs() {
            builder = builder.num_threads(jobs);
        }
        let pool = builder.build()?;
        debug!(
            "Analyzing {} file(s) on {} worker(s)",
            paths.len(),
            pool.current_num_threads()
        );

        let outcomes: Vec<Option<Option<Result<SourceAnalysis, ParseWarning>>>> =
            pool.install(|| {
                paths
                    .par_iter()
                    .map(|path| {
                        if ctx.cancellation().is_cancelled() {
                            None
                        } else {
                            Some(self.analyze(path))
                        }
                    })
                    .collect()
            });

        let mut analyzed = Vec::with_capacity(paths.len());
        for (path, outcome) in paths.iter().zip(outcomes) {
            let Some(outcome) = outcome else {
                return Err(CollectError::Cancelled);
            };
            let (outline, metrics) = match outcome {
                None => (None, None),
                Some(Ok(analysis)) => (Some(analysis.outline), analysis.metrics),
                Some(Err(warning)) => {
                    ctx.diagnostics().push(warning);
                    (Some(ComponentOutline::default()), None)
                }
            };
            analyzed.push(AnalyzedFile {
                path: path.clone(),
                outline,
                metrics,
            });
        }
        ctx.check_cancelled()?;
        Ok(analyzed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Warning;
    use std::fs;

    const GOOD: &str = r#""""Utilities."""
import os


def helper(a, b=2):
    if a:
        return b
    return a
"#;

    #[test]
    fn test_analyze_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.py");
        let text = dir.path().join("notes.txt");
        fs::write(&good, GOOD).unwrap();
        fs::write(&text, "plain").unwrap();

        let registry = ParserRegistry::with_defaults();
        let analyzer = SourceAnalyzer::new(&registry, Some(MetricsCalculator::default()));

        let analysis = analyzer.analyze(&good).unwrap().unwrap();
        assert_eq!(analysis.outline.docstring.as_deref(), Some("Utilities."));
        assert_eq!(analysis.outline.functions[0].param_names, vec!["a", "b"]);
        assert_eq!(analysis.metrics.unwrap().complexity.total, 2);

        assert!(analyzer.analyze(&text).is_none());

        let without_metrics = SourceAnalyzer::new(&registry, None);
        assert!(without_metrics.analyze(&good).unwrap().unwrap().metrics.is_none());
    }

    #[test]
    fn test_unreadable_file_degrades_to_warning() {
        let dir = tempfile::tempdir().unwrap();
        let unreadable = dir.path().join("locked.py");
        fs::create_dir(&unreadable).unwrap();

        let registry = ParserRegistry::with_defaults();
        let analyzer = SourceAnalyzer::new(&registry, Some(MetricsCalculator::default()));

        let warning = analyzer.analyze(&unreadable).unwrap().unwrap_err();
        assert_eq!(warning.path, unreadable);
        assert!(warning.reason.starts_with("failed to read"));
    }

    #[test]
    fn test_analyze_all_keeps_order_and_degrades_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..8 {
            let path = dir.path().join(format!("m{}.py", i));
            fs::write(&path, GOOD).unwrap();
            paths.push(path);
        }
        let broken = dir.path().join("broken.py");
        fs::write(&broken, "def broken(:\n    pass\n").unwrap();
        paths.insert(3, broken.clone());
        paths.push(dir.path().join("data.csv"));
        fs::write(dir.path().join("data.csv"), "a,b\n").unwrap();

        let ctx = AnalysisContext::new(dir.path()).unwrap().with_jobs(Some(2));
        let registry = ParserRegistry::with_defaults();
        let analyzer = SourceAnalyzer::new(&registry, Some(MetricsCalculator::default()));

        let analyzed = analyzer.analyze_all(&ctx, &paths).unwrap();

        let order: Vec<&PathBuf> = analyzed.iter().map(|a| &a.path).collect();
        assert_eq!(order, paths.iter().collect::<Vec<_>>());

        assert_eq!(analyzed[3].outline, Some(ComponentOutline::default()));
        assert!(analyzed[3].metrics.is_none());
        assert!(analyzed[0].metrics.is_some());
        assert!(analyzed[9].outline.is_none());

        let warnings = ctx.diagnostics().snapshot();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(&warnings[0], Warning::Parse(w) if w.path == broken));
    }

    #[test]
    fn test_cancelled_analysis_discards_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, GOOD).unwrap();

        let ctx = AnalysisContext::new(dir.path()).unwrap();
        ctx.cancellation().cancel();
        let registry = ParserRegistry::with_defaults();

        let result = SourceAnalyzer::new(&registry, None).analyze_all(&ctx, &[path]);
        assert!(matches!(result, Err(CollectError::Cancelled)));
    }
}
