//! Include/exclude rules and their sources.
//!
//! Rules come from CLI-style strings (`py,js:src`, `*:tests`) or a TOML
//! file, and are merged into one `CollectConfig`. Precedence:
//! - includes: CLI replaces the config file; with neither, `py:.`
//! - excludes: CLI rules are appended to the config file's
//! - name: CLI, then config file, then `Repository Analysis`
//!
//! Everything here is validated up front so a bad rule fails the run
//! before any file is touched.

use crate::error::ConfigError;
use quarry_core::MetricsThresholds;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_INCLUDE_SPEC: &str = "py:.";
pub const DEFAULT_REPOSITORY_NAME: &str = "Repository Analysis";

// ─────────────────────────────────────────────────────────────────────────────
// Rules
// ─────────────────────────────────────────────────────────────────────────────

/// A set of extensions (lowercase, no leading dot) or every extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionSet {
    All,
    Only(BTreeSet<String>),
}

impl ExtensionSet {
    /// Normalizes raw entries. Any `*` collapses the set to `All`.
    pub fn parse<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for entry in entries {
            let ext = entry.as_ref().trim().trim_start_matches('.').to_lowercase();
            if ext == "*" {
                return ExtensionSet::All;
            }
            if !ext.is_empty() {
                set.insert(ext);
            }
        }
        ExtensionSet::Only(set)
    }

    /// Whether a file extension (with or without its dot) belongs to the set.
    pub fn matches(&self, extension: &str) -> bool {
        match self {
            ExtensionSet::All => true,
            ExtensionSet::Only(set) => set.contains(&extension.trim_start_matches('.').to_lowercase()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ExtensionSet::Only(set) if set.is_empty())
    }
}

impl fmt::Display for ExtensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionSet::All => write!(f, "*"),
            ExtensionSet::Only(set) => {
                let list: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "{}", list.join(","))
            }
        }
    }
}

/// One include rule: a root directory and the extensions to take from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub extensions: ExtensionSet,
    /// Relative roots are resolved against the invocation root.
    pub root: PathBuf,
}

impl SourceSpec {
    pub fn new(extensions: ExtensionSet, root: impl Into<PathBuf>) -> Self {
        Self {
            extensions,
            root: root.into(),
        }
    }

    /// Parses `EXTS:PATH`, e.g. `py,js:src`.
    pub fn parse(arg: &str) -> Result<Self, ConfigError> {
        let (extensions, path) = split_rule(arg)?;
        Ok(Self::new(extensions, path))
    }
}

/// One subtractive rule, matched as `*pattern*` against paths relative to
/// the invocation root.
#[derive(Debug, Clone)]
pub struct ExcludeRule {
    pub extensions: ExtensionSet,
    pattern: String,
    matcher: glob::Pattern,
}

impl ExcludeRule {
    /// Builds a rule, normalizing the pattern to forward slashes.
    pub fn new(extensions: ExtensionSet, pattern: &str) -> Result<Self, ConfigError> {
        let pattern = normalize_pattern(pattern);
        let wrapped = collapse_stars(&format!("*{}*", pattern));
        let matcher =
            glob::Pattern::new(&wrapped).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        Ok(Self {
            extensions,
            pattern,
            matcher,
        })
    }

    /// Parses `EXTS:PATTERN`, e.g. `*:tests`.
    pub fn parse(arg: &str) -> Result<Self, ConfigError> {
        let (extensions, pattern) = split_rule(arg)?;
        Self::new(extensions, &pattern)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether a file with `extension` at `relative_path` is excluded.
    /// `relative_path` uses forward slashes.
    pub fn matches(&self, extension: &str, relative_path: &str) -> bool {
        self.extensions.matches(extension) && self.matcher.matches(relative_path)
    }
}

impl PartialEq for ExcludeRule {
    fn eq(&self, other: &Self) -> bool {
        self.extensions == other.extensions && self.pattern == other.pattern
    }
}

/// Squeezes each run of `*` to one. With default match options a single
/// `*` already crosses `/`, and glob rejects `**` next to anything but a
/// separator.
fn collapse_stars(pattern: &str) -> String {
    let mut collapsed = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && collapsed.ends_with('*') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}

fn split_rule(arg: &str) -> Result<(ExtensionSet, String), ConfigError> {
    let (exts, path) = arg
        .split_once(':')
        .ok_or_else(|| ConfigError::MissingSeparator { arg: arg.to_string() })?;

    let extensions = ExtensionSet::parse(exts.split(','));
    if extensions.is_empty() {
        return Err(ConfigError::NoExtensions {
            arg: arg.to_string(),
        });
    }
    Ok((extensions, normalize_pattern(path)))
}

/// Forward slashes, no `./` prefix, no trailing slash.
fn normalize_pattern(pattern: &str) -> String {
    let mut normalized = pattern.trim().replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    if normalized.is_empty() {
        normalized.push('.');
    }
    normalized
}

/// Parses a list of CLI-style include rules.
pub fn parse_source_args<S: AsRef<str>>(args: &[S]) -> Result<Vec<SourceSpec>, ConfigError> {
    args.iter().map(|arg| SourceSpec::parse(arg.as_ref())).collect()
}

/// Parses a list of CLI-style exclude rules.
pub fn parse_exclude_args<S: AsRef<str>>(args: &[S]) -> Result<Vec<ExcludeRule>, ConfigError> {
    args.iter().map(|arg| ExcludeRule::parse(arg.as_ref())).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Config file
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    source: Vec<RawSource>,
    #[serde(default)]
    exclude: Vec<RawExclude>,
    output: Option<String>,
    name: Option<String>,
    thresholds: Option<MetricsThresholds>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(default = "all_extensions")]
    exts: Vec<String>,
    #[serde(default = "current_dir")]
    root: String,
    #[serde(default)]
    exclude: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawExclude {
    #[serde(default = "all_extensions")]
    exts: Vec<String>,
    pattern: Option<String>,
}

fn all_extensions() -> Vec<String> {
    vec!["*".to_string()]
}

fn current_dir() -> String {
    ".".to_string()
}

/// Rules and settings loaded from a TOML file.
///
/// ```toml
/// name = "My Project"
/// output = "analysis.json"
///
/// [[source]]
/// exts = ["py"]
/// root = "src"
/// exclude = ["migrations"]
///
/// [[exclude]]
/// exts = ["py"]
/// pattern = "tests"
///
/// [thresholds]
/// max_function_lines = 80
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    pub sources: Vec<SourceSpec>,
    /// Per-source excludes first, then top-level ones.
    pub excludes: Vec<ExcludeRule>,
    pub output: Option<PathBuf>,
    pub name: Option<String>,
    pub thresholds: Option<MetricsThresholds>,
}

impl FileConfig {
    /// Reads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        info!("Loading configuration from: {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Parses config text. `origin` is only used in error messages.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: origin.to_path_buf(),
            source,
        })?;

        let mut config = FileConfig {
            output: raw.output.map(PathBuf::from),
            name: raw.name,
            thresholds: raw.thresholds,
            ..Default::default()
        };

        for source in raw.source {
            config
                .sources
                .push(SourceSpec::new(ExtensionSet::parse(&source.exts), &source.root));
            for pattern in &source.exclude {
                config
                    .excludes
                    .push(ExcludeRule::new(ExtensionSet::All, pattern)?);
            }
        }

        for (i, exclude) in raw.exclude.into_iter().enumerate() {
            let pattern = exclude
                .pattern
                .ok_or(ConfigError::MissingPattern { index: i + 1 })?;
            config
                .excludes
                .push(ExcludeRule::new(ExtensionSet::parse(&exclude.exts), &pattern)?);
        }

        Ok(config)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Effective configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Fully merged settings for one run.
#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub name: String,
    pub sources: Vec<SourceSpec>,
    pub excludes: Vec<ExcludeRule>,
    pub output: Option<PathBuf>,
    pub thresholds: MetricsThresholds,
    pub compute_metrics: bool,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_REPOSITORY_NAME.to_string(),
            sources: vec![SourceSpec::new(ExtensionSet::parse(["py"]), ".")],
            excludes: Vec::new(),
            output: None,
            thresholds: MetricsThresholds::default(),
            compute_metrics: true,
        }
    }
}

impl CollectConfig {
    /// Merges CLI-style arguments over an optional config file.
    pub fn merge<S: AsRef<str>>(
        include_args: &[S],
        exclude_args: &[S],
        name: Option<&str>,
        file: Option<FileConfig>,
    ) -> Result<Self, ConfigError> {
        let cli_sources = parse_source_args(include_args)?;
        let cli_excludes = parse_exclude_args(exclude_args)?;
        let file = file.unwrap_or_default();

        let sources = if !cli_sources.is_empty() {
            info!("Using include sources from command line arguments.");
            cli_sources
        } else if !file.sources.is_empty() {
            info!("Using include sources from configuration file.");
            file.sources
        } else {
            info!(
                "No includes specified via CLI or config, defaulting to '{}'.",
                DEFAULT_INCLUDE_SPEC
            );
            vec![SourceSpec::parse(DEFAULT_INCLUDE_SPEC)?]
        };

        let mut excludes = file.excludes;
        excludes.extend(cli_excludes);
        if !excludes.is_empty() {
            debug!("Applying {} exclusion rule(s).", excludes.len());
        }

        let name = name
            .map(str::to_string)
            .or(file.name)
            .unwrap_or_else(|| DEFAULT_REPOSITORY_NAME.to_string());

        Ok(Self {
            name,
            sources,
            excludes,
            output: file.output,
            thresholds: file.thresholds.unwrap_or_default(),
            compute_metrics: true,
        })
    }

    pub fn with_metrics(mut self, compute_metrics: bool) -> Self {
        self.compute_metrics = compute_metrics;
        self
    }
}
