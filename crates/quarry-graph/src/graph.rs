//! Core graph data structure.
//!
//! The DependencyGraph wraps petgraph with one node per discovered file
//! and one edge per resolved file-to-file import.

use crate::edge::{DependencyEdge, ImportSite, UnresolvedCounts};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Unique identifier for a file in the graph.
pub type NodeId = NodeIndex;

/// The file dependency graph.
///
/// Every node is a member of the resolved file set, so every edge endpoint
/// is too. Edges are deduplicated and never loop back to their source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    graph: DiGraph<PathBuf, ImportSite>,

    /// Maps file paths to graph node indexes.
    index: HashMap<PathBuf, NodeId>,

    /// References that produced no edge, by cause.
    unresolved: UnresolvedCounts,
}

impl DependencyGraph {
    /// Creates a graph with one node per file, in the given order.
    pub fn with_files<I>(files: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut graph = Self::default();
        for file in files {
            graph.add_file(file);
        }
        graph
    }

    /// Adds a file node. Adding a known file returns its existing id.
    pub fn add_file(&mut self, file: PathBuf) -> NodeId {
        if let Some(&id) = self.index.get(&file) {
            return id;
        }
        let id = self.graph.add_node(file.clone());
        self.index.insert(file, id);
        id
    }

    /// Adds an edge between two known files.
    ///
    /// Returns false (and adds nothing) for self-edges, duplicates, and
    /// endpoints outside the graph.
    pub fn add_edge(&mut self, from: &Path, to: &Path, line: u32) -> bool {
        let (Some(&from_id), Some(&to_id)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        if from_id == to_id || self.graph.find_edge(from_id, to_id).is_some() {
            return false;
        }
        self.graph.add_edge(from_id, to_id, ImportSite { line });
        true
    }

    pub(crate) fn set_unresolved(&mut self, unresolved: UnresolvedCounts) {
        self.unresolved = unresolved;
    }

    /// Counts of import references that were dropped, by cause.
    pub fn unresolved(&self) -> &UnresolvedCounts {
        &self.unresolved
    }

    /// Files this file imports.
    pub fn depends_on(&self, file: &Path) -> BTreeSet<PathBuf> {
        self.neighbors(file, Direction::Outgoing)
    }

    /// Files that import this file.
    pub fn used_by(&self, file: &Path) -> BTreeSet<PathBuf> {
        self.neighbors(file, Direction::Incoming)
    }

    fn neighbors(&self, file: &Path, direction: Direction) -> BTreeSet<PathBuf> {
        let Some(&id) = self.index.get(file) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(id, direction)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect()
    }

    /// The inverted map: for every file, the files that import it.
    pub fn used_by_map(&self) -> BTreeMap<PathBuf, BTreeSet<PathBuf>> {
        self.graph
            .node_indices()
            .filter_map(|id| {
                let file = self.graph.node_weight(id)?;
                Some((file.clone(), self.used_by(file)))
            })
            .collect()
    }

    /// All edges, sorted by (from, to).
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .graph
            .edge_references()
            .filter_map(|edge_ref| {
                let from = self.graph.node_weight(edge_ref.source())?;
                let to = self.graph.node_weight(edge_ref.target())?;
                Some(DependencyEdge::new(from.clone(), to.clone()))
            })
            .collect();
        edges.sort();
        edges
    }

    /// Line of the import that produced the edge `from -> to`.
    pub fn import_line(&self, from: &Path, to: &Path) -> Option<u32> {
        let edge = self
            .graph
            .find_edge(*self.index.get(from)?, *self.index.get(to)?)?;
        self.graph.edge_weight(edge).map(|site| site.line)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> DependencyGraph {
        DependencyGraph::with_files(
            ["/r/a.py", "/r/b.py", "/r/c.py"]
                .into_iter()
                .map(PathBuf::from),
        )
    }

    #[test]
    fn test_edges_are_deduplicated() {
        let mut g = graph();
        assert!(g.add_edge(Path::new("/r/a.py"), Path::new("/r/b.py"), 3));
        assert!(!g.add_edge(Path::new("/r/a.py"), Path::new("/r/b.py"), 9));

        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.import_line(Path::new("/r/a.py"), Path::new("/r/b.py")), Some(3));
    }

    #[test]
    fn test_rejects_self_and_unknown_endpoints() {
        let mut g = graph();
        assert!(!g.add_edge(Path::new("/r/a.py"), Path::new("/r/a.py"), 1));
        assert!(!g.add_edge(Path::new("/r/a.py"), Path::new("/r/zzz.py"), 1));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_used_by_is_inverse_of_depends_on() {
        let mut g = graph();
        g.add_edge(Path::new("/r/a.py"), Path::new("/r/c.py"), 1);
        g.add_edge(Path::new("/r/b.py"), Path::new("/r/c.py"), 1);

        let used_by = g.used_by(Path::new("/r/c.py"));
        assert_eq!(used_by.len(), 2);
        assert!(used_by.contains(Path::new("/r/a.py")));
        assert!(g.depends_on(Path::new("/r/c.py")).is_empty());

        let map = g.used_by_map();
        assert_eq!(map.len(), 3);
        assert!(map[Path::new("/r/a.py")].is_empty());

        assert_eq!(
            g.edges(),
            vec![
                DependencyEdge::new("/r/a.py", "/r/c.py"),
                DependencyEdge::new("/r/b.py", "/r/c.py"),
            ]
        );
    }
}
