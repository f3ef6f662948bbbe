//! File discovery.
//!
//! Includes are unioned first, then every exclude rule is applied to the
//! union, so the order of rules never changes the result.

use crate::config::{ExcludeRule, SourceSpec};
use crate::context::AnalysisContext;
use crate::error::{CollectError, DiscoveryWarning};
use quarry_core::{extension_of, FileRecord};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// The discovered file set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFiles {
    /// Sorted by path, no duplicates.
    pub records: Vec<FileRecord>,
    /// Extensions present in `records`, with leading dot.
    pub extensions: BTreeSet<String>,
}

impl ResolvedFiles {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.records.iter().map(|r| r.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Turns include/exclude rules into a concrete file set.
#[derive(Debug, Clone, Copy)]
pub struct FileSetResolver<'c> {
    sources: &'c [SourceSpec],
    excludes: &'c [ExcludeRule],
}

impl<'c> FileSetResolver<'c> {
    pub fn new(sources: &'c [SourceSpec], excludes: &'c [ExcludeRule]) -> Self {
        Self { sources, excludes }
    }

    /// Walks every source root and returns the surviving files.
    ///
    /// Missing roots and unreadable entries become warnings on the context.
    pub fn resolve(&self, ctx: &AnalysisContext) -> Result<ResolvedFiles, CollectError> {
        let mut found: BTreeSet<PathBuf> = BTreeSet::new();

        for spec in self.sources {
            ctx.check_cancelled()?;
            let root = if spec.root.is_absolute() {
                spec.root.clone()
            } else {
                ctx.root().join(&spec.root)
            };

            if !root.is_dir() {
                ctx.diagnostics().push(DiscoveryWarning::new(
                    &root,
                    "path does not exist or is not a directory",
                ));
                continue;
            }

            debug!("Scanning {} for '{}'", root.display(), spec.extensions);
            let before = found.len();
            self.walk(ctx, spec, &root, &mut found);
            debug!("Found {} new file(s) in {}", found.len() - before, root.display());
        }

        let candidates = found.len();
        found.retain(|path| !self.is_excluded(ctx.root(), path));
        if candidates != found.len() {
            info!("Excluded {} file(s)", candidates - found.len());
        }

        ctx.check_cancelled()?;
        let mut resolved = ResolvedFiles::default();
        for path in found {
            match FileRecord::read(&path) {
                Ok(record) => {
                    if !record.extension.is_empty() {
                        resolved.extensions.insert(record.extension.clone());
                    }
                    resolved.records.push(record);
                }
                Err(e) => ctx
                    .diagnostics()
                    .push(DiscoveryWarning::new(&path, e.to_string())),
            }
        }

        info!(
            "Resolved {} file(s) with extensions: {}",
            resolved.len(),
            resolved.extensions.iter().cloned().collect::<Vec<_>>().join(", ")
        );
        Ok(resolved)
    }

    fn walk(
        &self,
        ctx: &AnalysisContext,
        spec: &SourceSpec,
        root: &Path,
        found: &mut BTreeSet<PathBuf>,
    ) {
        // Symlinked directories are entered; walkdir reports a link back to
        // an ancestor as an error instead of looping.
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    ctx.diagnostics()
                        .push(DiscoveryWarning::new(path, e.to_string()));
                    continue;
                }
            };

            if !entry.file_type().is_file()
                || !spec.extensions.matches(&extension_of(entry.path()))
            {
                continue;
            }

            match entry.path().canonicalize() {
                Ok(path) => {
                    found.insert(path);
                }
                Err(e) => ctx
                    .diagnostics()
                    .push(DiscoveryWarning::new(entry.path(), e.to_string())),
            }
        }
    }

    /// Files outside the invocation root are never excluded.
    fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        let Some(relative) = relative_slash_path(root, path) else {
            return false;
        };
        let extension = extension_of(path);
        self.excludes
            .iter()
            .any(|rule| rule.matches(&extension, &relative))
    }
}

/// `path` relative to `root`, joined with forward slashes.
pub(crate) fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
