//! Key file ranking.
//!
//! Files are scored on four independent signals and the best few are
//! reported as the files a reader should look at first:
//!
//! - naming: conventional entry-point stems (`main`, `app`, `core`, ...)
//! - depth: files near the root
//! - size: log-scaled, capped
//! - dependents: how many files import this one, weighted highest

use crate::graph::DependencyGraph;
use quarry_core::FileRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const KEY_STEMS: [&str; 7] = ["main", "app", "core", "index", "server", "engine", "controller"];

const EXACT_STEM: f64 = 5.0;
const PARTIAL_STEM: f64 = 2.0;
const PACKAGE_MARKER: f64 = 1.0;
const ENTRY_POINT: f64 = 3.0;
const MAX_SIZE_SCORE: f64 = 3.0;
const PER_DEPENDENT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyFileScore {
    pub naming_score: f64,
    pub depth_score: f64,
    pub size_score: f64,
    pub dependent_score: f64,
    pub total: f64,
}

/// A file selected as key, with its score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFile {
    pub path: PathBuf,
    pub score: KeyFileScore,
}

#[derive(Debug, Clone)]
pub struct KeyFileScorer {
    root: PathBuf,
}

impl KeyFileScorer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scores one file. Pure in its inputs.
    pub fn score(&self, record: &FileRecord, dependents: usize) -> KeyFileScore {
        let naming_score = naming_score(&record.stem().to_lowercase());
        let depth_score = self.depth_score(&record.path);
        let size_score = size_score(record.size_bytes);
        let dependent_score = PER_DEPENDENT * dependents as f64;

        KeyFileScore {
            naming_score,
            depth_score,
            size_score,
            dependent_score,
            total: naming_score + depth_score + size_score + dependent_score,
        }
    }

    fn depth_score(&self, path: &Path) -> f64 {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return 0.0;
        };
        match relative.components().count() {
            depth @ 1..=2 => 3.0 / depth as f64,
            _ => 0.0,
        }
    }

    /// Scores every file and returns the top ones, best first.
    ///
    /// Ties keep the order of `records`.
    pub fn rank(&self, records: &[FileRecord], graph: &DependencyGraph) -> Vec<KeyFile> {
        let mut scored: Vec<KeyFile> = records
            .iter()
            .map(|record| KeyFile {
                path: record.path.clone(),
                score: self.score(record, graph.used_by(&record.path).len()),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total.total_cmp(&a.score.total));
        scored.truncate(key_file_count(records.len()));
        scored
    }
}

/// Number of key files to report: 10% of the files, at least 3 and at
/// most 10, never more than exist.
pub fn key_file_count(file_count: usize) -> usize {
    (file_count / 10).clamp(3, 10).min(file_count)
}

fn naming_score(stem: &str) -> f64 {
    let mut score = 0.0;
    for key in KEY_STEMS {
        if stem == key {
            score += EXACT_STEM;
        } else if stem.contains(key) {
            score += PARTIAL_STEM;
        }
    }
    match stem {
        "__init__" => score + PACKAGE_MARKER,
        "__main__" => score + ENTRY_POINT,
        _ => score,
    }
}

fn size_score(size: u64) -> f64 {
    if size == 0 {
        return 0.0;
    }
    ((size as f64).ln() / 3.0).min(MAX_SIZE_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord::new(path, size)
    }

    #[test]
    fn test_naming_scores_accumulate() {
        assert_eq!(naming_score("main"), 5.0);
        assert_eq!(naming_score("app_server"), 4.0);
        assert_eq!(naming_score("__main__"), 5.0);
        assert_eq!(naming_score("__init__"), 1.0);
        assert_eq!(naming_score("utils"), 0.0);
    }

    #[test]
    fn test_depth_and_size() {
        let scorer = KeyFileScorer::new("/repo");

        let top = scorer.score(&record("/repo/setup.py", 0), 0);
        assert_eq!(top.depth_score, 3.0);
        assert_eq!(top.size_score, 0.0);

        let nested = scorer.score(&record("/repo/pkg/mod.py", 1), 0);
        assert_eq!(nested.depth_score, 1.5);
        assert_eq!(nested.size_score, 0.0);

        let deep = scorer.score(&record("/repo/a/b/c.py", 1_000_000_000), 0);
        assert_eq!(deep.depth_score, 0.0);
        assert_eq!(deep.size_score, 3.0);

        let outside = scorer.score(&record("/elsewhere/x.py", 20), 0);
        assert_eq!(outside.depth_score, 0.0);
        assert!((outside.size_score - 20f64.ln() / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_key_file_count_bounds() {
        assert_eq!(key_file_count(0), 0);
        assert_eq!(key_file_count(2), 2);
        assert_eq!(key_file_count(5), 3);
        assert_eq!(key_file_count(45), 4);
        assert_eq!(key_file_count(500), 10);
    }

    #[test]
    fn test_rank_prefers_dependents_and_keeps_ties_stable() {
        let records = vec![
            record("/repo/a/b/one.py", 0),
            record("/repo/a/b/two.py", 0),
            record("/repo/a/b/three.py", 0),
            record("/repo/a/b/four.py", 0),
        ];
        let mut graph =
            DependencyGraph::with_files(records.iter().map(|r| r.path.clone()));
        graph.add_edge(
            Path::new("/repo/a/b/one.py"),
            Path::new("/repo/a/b/four.py"),
            1,
        );

        let ranked = KeyFileScorer::new("/repo").rank(&records, &graph);
        let names: Vec<&str> = ranked
            .iter()
            .map(|k| k.path.file_name().and_then(|n| n.to_str()).unwrap())
            .collect();

        assert_eq!(names, vec!["four.py", "one.py", "two.py"]);
        assert_eq!(ranked[0].score.dependent_score, 2.0);
    }
}
