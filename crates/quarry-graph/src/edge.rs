//! Edge types for the dependency graph.
//!
//! An edge means "file A imports something that lives in file B". Edges
//! carry no weight; the line of the first import that produced one is kept
//! for diagnostics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A resolved file-to-file dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The importing file.
    pub from: PathBuf,
    /// The imported file.
    pub to: PathBuf,
}

impl DependencyEdge {
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Edge weight stored in the petgraph graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSite {
    /// Line of the first import statement that produced the edge.
    pub line: u32,
}

/// Why an import reference produced no edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedCause {
    /// No prefix of an absolute module path is in the module map.
    NotInModuleMap,
    /// No file exists where a relative import points.
    RelativeTargetMissing,
    /// The reference resolved to the importing file.
    ResolvedToSelf,
}

impl fmt::Display for UnresolvedCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotInModuleMap => "not_in_module_map",
            Self::RelativeTargetMissing => "relative_target_missing",
            Self::ResolvedToSelf => "resolved_to_self",
        };
        write!(f, "{}", s)
    }
}

/// Per-cause counts of dropped import references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedCounts {
    counts: BTreeMap<UnresolvedCause, usize>,
}

impl UnresolvedCounts {
    pub fn record(&mut self, cause: UnresolvedCause) {
        *self.counts.entry(cause).or_insert(0) += 1;
    }

    pub fn get(&self, cause: UnresolvedCause) -> usize {
        self.counts.get(&cause).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnresolvedCause, usize)> + '_ {
        self.counts.iter().map(|(cause, count)| (*cause, *count))
    }
}
