//! Dependency graph builder.
//!
//! Resolution is a two-pass process with a barrier in between:
//! 1. Map every supported file under the root to its dotted module path
//! 2. Resolve each file's import references into edges using that map
//!
//! Under-counting is acceptable, spurious edges are not: a reference that
//! cannot be tied to a file in the set is dropped and counted.

use crate::edge::{UnresolvedCause, UnresolvedCounts};
use crate::graph::DependencyGraph;
use crate::module_map::{module_name, ModuleMap};
use quarry_core::{ImportKind, ImportReference, ParserRegistry, SourceParser};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// The import references of one analyzed file.
#[derive(Debug, Clone, Copy)]
pub struct SourceImports<'a> {
    pub path: &'a Path,
    pub imports: &'a [ImportReference],
}

/// Builds a DependencyGraph from per-file import references.
pub struct DependencyGraphBuilder<'r> {
    root: PathBuf,
    registry: &'r ParserRegistry,
}

impl<'r> DependencyGraphBuilder<'r> {
    /// `root` is the invocation root module paths are computed against.
    pub fn new(root: impl Into<PathBuf>, registry: &'r ParserRegistry) -> Self {
        Self {
            root: root.into(),
            registry,
        }
    }

    /// Pass 1: maps every supported file under the root to its module path.
    ///
    /// Files are visited in the given order, so the first file claiming a
    /// module path keeps it.
    pub fn module_map(&self, files: &[PathBuf]) -> ModuleMap {
        let mut map = ModuleMap::new();
        for file in files {
            let Some(parser) = self.registry.for_path(file) else {
                continue;
            };
            let Some(module) = module_name(&self.root, file, parser.package_marker()) else {
                continue;
            };
            if !map.insert(module.clone(), file.clone()) {
                debug!(
                    "module {} already mapped to {}, ignoring {}",
                    module,
                    map.resolve(&module).unwrap_or(file.as_path()).display(),
                    file.display()
                );
            }
        }
        debug!("module map holds {} modules", map.len());
        map
    }

    /// Pass 2: resolves import references into edges.
    ///
    /// Every file in `files` becomes a node, whether or not it has imports.
    pub fn resolve(
        &self,
        map: &ModuleMap,
        files: &[PathBuf],
        sources: &[SourceImports<'_>],
    ) -> DependencyGraph {
        let mut graph = DependencyGraph::with_files(files.iter().cloned());
        let members: HashSet<&Path> = files.iter().map(PathBuf::as_path).collect();
        let mut unresolved = UnresolvedCounts::default();

        for source in sources {
            let Some(parser) = self.registry.for_path(source.path) else {
                continue;
            };

            for reference in source.imports {
                let target = match reference.kind {
                    ImportKind::Absolute => map
                        .resolve_longest_prefix(&reference.module_parts)
                        .map(Path::to_path_buf)
                        .ok_or(UnresolvedCause::NotInModuleMap),
                    ImportKind::Relative => {
                        resolve_relative(parser, source.path, reference, &members)
                            .ok_or(UnresolvedCause::RelativeTargetMissing)
                    }
                };

                let outcome = target.and_then(|to| {
                    if to == source.path {
                        Err(UnresolvedCause::ResolvedToSelf)
                    } else {
                        Ok(to)
                    }
                });

                match outcome {
                    Ok(to) => {
                        if !graph.add_edge(source.path, &to, reference.line) {
                            trace!(
                                "`{}` in {}:{} repeats the import on line {}",
                                reference.statement(),
                                source.path.display(),
                                reference.line,
                                graph.import_line(source.path, &to).unwrap_or_default()
                            );
                        }
                    }
                    Err(cause) => {
                        trace!(
                            "dropped `{}` in {}:{} ({})",
                            reference.statement(),
                            source.path.display(),
                            reference.line,
                            cause
                        );
                        unresolved.record(cause);
                    }
                }
            }
        }

        debug!(
            "resolved {} edges between {} files, dropped {} references",
            graph.edge_count(),
            graph.node_count(),
            unresolved.total()
        );
        graph.set_unresolved(unresolved);
        graph
    }

    /// Runs both passes.
    pub fn build(&self, files: &[PathBuf], sources: &[SourceImports<'_>]) -> DependencyGraph {
        let map = self.module_map(files);
        self.resolve(&map, files, sources)
    }
}

/// Resolves a relative reference against the importing file's location.
///
/// Walks up `level - 1` directories, descends into the module parts, then
/// tries the package marker inside that directory before a same-named file.
/// The importer itself is never a candidate.
fn resolve_relative(
    parser: &dyn SourceParser,
    importer: &Path,
    reference: &ImportReference,
    members: &HashSet<&Path>,
) -> Option<PathBuf> {
    let mut base = importer.parent()?.to_path_buf();
    for _ in 1..reference.level {
        if let Some(parent) = base.parent() {
            base = parent.to_path_buf();
        }
    }

    let mut target = base;
    for part in &reference.module_parts {
        target.push(part);
    }

    let mut candidates = Vec::new();
    if let Some(marker) = parser.package_marker() {
        for ext in parser.extensions() {
            candidates.push(target.join(format!("{}.{}", marker, ext)));
        }
    }
    for ext in parser.extensions() {
        candidates.push(target.with_extension(ext));
    }

    candidates
        .into_iter()
        .find(|candidate| {
            candidate.as_path() != importer && members.contains(candidate.as_path())
        })
}
