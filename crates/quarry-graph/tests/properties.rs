//! Property-based tests for dependency resolution and key-file ranking
//!
//! These hold for any module tree and any mix of imports:
//! - Edges never loop back to their source and are never repeated
//! - Every edge endpoint is a file in the set
//! - `used_by` is the exact inverse of `depends_on`
//! - The key-file count stays within its bounds
//! - A graph survives a JSON round trip unchanged

use proptest::prelude::*;
use quarry_core::{FileRecord, ImportReference, ImportedName, ParserRegistry};
use quarry_graph::{
    key_file_count, DependencyGraph, DependencyGraphBuilder, KeyFileScorer, SourceImports,
};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

const ROOT: &str = "/repo";

type RawImport = (usize, usize, usize, Option<usize>, u32);

/// Packages `pkg0..pkg3`, each with its `__init__.py` and some modules.
fn module_tree() -> impl Strategy<Value = Vec<PathBuf>> {
    prop::collection::btree_set((0usize..4, 0usize..6), 1..24).prop_map(|slots| {
        let mut files = BTreeSet::new();
        for (package, module) in slots {
            files.insert(PathBuf::from(format!("{}/pkg{}/__init__.py", ROOT, package)));
            files.insert(PathBuf::from(format!("{}/pkg{}/m{}.py", ROOT, package, module)));
        }
        files.into_iter().collect()
    })
}

/// One import: importer slot, relative level (0 for absolute), package,
/// module, line. Packages and modules range past the tree so some miss.
fn raw_import() -> impl Strategy<Value = RawImport> {
    (
        any::<usize>(),
        0usize..3,
        0usize..5,
        prop::option::of(0usize..8),
        1u32..200,
    )
}

fn reference(level: usize, package: usize, module: Option<usize>, line: u32) -> ImportReference {
    match (level, module) {
        (0, Some(module)) => ImportReference::module(&format!("pkg{}.m{}", package, module), line),
        (0, None) => ImportReference::module(&format!("pkg{}", package), line),
        (level, Some(module)) => ImportReference::from_import(
            level,
            &format!("m{}", module),
            vec![ImportedName::new("name")],
            line,
        ),
        (level, None) => {
            ImportReference::from_import(level, "", vec![ImportedName::new("name")], line)
        }
    }
}

/// Groups generated imports by importer, in file order.
fn imports_by_file(files: &[PathBuf], raw: &[RawImport]) -> Vec<(PathBuf, Vec<ImportReference>)> {
    let mut grouped: Vec<(PathBuf, Vec<ImportReference>)> =
        files.iter().map(|f| (f.clone(), Vec::new())).collect();
    for &(slot, level, package, module, line) in raw {
        grouped[slot % files.len()]
            .1
            .push(reference(level, package, module, line));
    }
    grouped
}

fn build(files: &[PathBuf], grouped: &[(PathBuf, Vec<ImportReference>)]) -> DependencyGraph {
    let registry = ParserRegistry::with_defaults();
    let sources: Vec<SourceImports<'_>> = grouped
        .iter()
        .map(|(path, imports)| SourceImports {
            path: path.as_path(),
            imports,
        })
        .collect();
    DependencyGraphBuilder::new(ROOT, &registry).build(files, &sources)
}

proptest! {
    #[test]
    fn prop_edges_are_unique_and_stay_in_the_file_set(
        files in module_tree(),
        raw in prop::collection::vec(raw_import(), 0..40)
    ) {
        let graph = build(&files, &imports_by_file(&files, &raw));
        let members: HashSet<&Path> = files.iter().map(PathBuf::as_path).collect();

        let edges = graph.edges();
        let distinct: BTreeSet<_> = edges.iter().collect();
        prop_assert_eq!(distinct.len(), edges.len());
        prop_assert_eq!(edges.len(), graph.edge_count());

        for edge in &edges {
            prop_assert_ne!(&edge.from, &edge.to);
            prop_assert!(members.contains(edge.from.as_path()));
            prop_assert!(members.contains(edge.to.as_path()));
        }
        prop_assert_eq!(graph.node_count(), files.len());
    }

    #[test]
    fn prop_used_by_inverts_depends_on(
        files in module_tree(),
        raw in prop::collection::vec(raw_import(), 0..40)
    ) {
        let graph = build(&files, &imports_by_file(&files, &raw));

        let mut forward = 0;
        for file in &files {
            for dep in graph.depends_on(file) {
                prop_assert!(graph.used_by(&dep).contains(file));
                forward += 1;
            }
            for user in graph.used_by(file) {
                prop_assert!(graph.depends_on(&user).contains(file));
            }
        }
        prop_assert_eq!(forward, graph.edge_count());

        let used_by_map = graph.used_by_map();
        prop_assert_eq!(used_by_map.len(), files.len());
        for (file, users) in &used_by_map {
            prop_assert_eq!(users, &graph.used_by(file));
        }
    }

    #[test]
    fn prop_resolution_is_repeatable(
        files in module_tree(),
        raw in prop::collection::vec(raw_import(), 0..40)
    ) {
        let grouped = imports_by_file(&files, &raw);
        let first = build(&files, &grouped);
        let second = build(&files, &grouped);

        prop_assert_eq!(first.edges(), second.edges());
        prop_assert_eq!(first.unresolved(), second.unresolved());
    }

    #[test]
    fn prop_graph_survives_json(
        files in module_tree(),
        raw in prop::collection::vec(raw_import(), 0..40)
    ) {
        let graph = build(&files, &imports_by_file(&files, &raw));

        let json = serde_json::to_string(&graph).unwrap();
        let restored: DependencyGraph = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(restored.edges(), graph.edges());
        prop_assert_eq!(restored.node_count(), graph.node_count());
        prop_assert_eq!(restored.used_by_map(), graph.used_by_map());
        for file in &files {
            prop_assert_eq!(restored.depends_on(file), graph.depends_on(file));
        }
    }

    #[test]
    fn prop_key_files_are_bounded_and_ordered(
        files in module_tree(),
        raw in prop::collection::vec(raw_import(), 0..40),
        sizes in prop::collection::vec(0u64..100_000, 48)
    ) {
        let graph = build(&files, &imports_by_file(&files, &raw));
        let records: Vec<FileRecord> = files
            .iter()
            .zip(sizes.iter().cycle())
            .map(|(path, &size)| FileRecord::new(path.clone(), size))
            .collect();

        let key_files = KeyFileScorer::new(ROOT).rank(&records, &graph);

        let n = files.len();
        prop_assert_eq!(key_files.len(), key_file_count(n));
        prop_assert!(key_files.len() >= n.min(3));
        prop_assert!(key_files.len() <= 10);
        for pair in key_files.windows(2) {
            prop_assert!(pair[0].score.total >= pair[1].score.total);
        }
        for key in &key_files {
            prop_assert!(files.contains(&key.path));
        }
    }

    #[test]
    fn prop_key_file_count_bounds(n in 0usize..2_000) {
        let count = key_file_count(n);
        prop_assert!(count <= n);
        prop_assert!(count <= 10);
        prop_assert!(count >= n.min(3));
    }
}
