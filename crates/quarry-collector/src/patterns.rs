//! Repository-wide import usage: the most common import statements and
//! the frameworks they reveal.

use quarry_core::{ComponentOutline, ImportKind, ImportReference};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Framework name and the top-level modules that identify it.
const FRAMEWORKS: &[(&str, &[&str])] = &[
    ("Django", &["django"]),
    ("Flask", &["flask", "flask_restful", "flask_sqlalchemy"]),
    ("FastAPI", &["fastapi"]),
    ("SQLAlchemy", &["sqlalchemy"]),
    ("PyTorch", &["torch"]),
    ("TensorFlow", &["tensorflow", "tf"]),
    ("Pandas", &["pandas"]),
    ("Numpy", &["numpy", "np"]),
    ("Pytest", &["pytest"]),
    ("Unittest", &["unittest"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCount {
    pub statement: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSummary {
    /// Most frequent first, ties by statement text.
    pub common_imports: Vec<ImportCount>,
    /// Framework name to the evidence that revealed it.
    pub frameworks: BTreeMap<String, String>,
}

impl PatternSummary {
    pub fn is_empty(&self) -> bool {
        self.common_imports.is_empty() && self.frameworks.is_empty()
    }
}

/// Aggregates imports over `files`, which should be in path order so the
/// framework evidence is stable.
pub fn detect_patterns<'a, I>(files: I) -> PatternSummary
where
    I: IntoIterator<Item = (&'a Path, &'a ComponentOutline)>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut frameworks: BTreeMap<String, String> = BTreeMap::new();

    for (path, outline) in files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for reference in &outline.imports {
            let statement = reference.statement();
            for (framework, indicators) in FRAMEWORKS {
                if frameworks.contains_key(*framework) {
                    continue;
                }
                if indicators.iter().any(|ind| imports_module(reference, ind)) {
                    frameworks.insert(
                        framework.to_string(),
                        format!("Found import '{}' in {}", statement, file_name),
                    );
                }
            }
            *counts.entry(statement).or_default() += 1;
        }
    }

    let mut common_imports: Vec<ImportCount> = counts
        .into_iter()
        .map(|(statement, count)| ImportCount { statement, count })
        .collect();
    common_imports.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.statement.cmp(&b.statement))
    });

    PatternSummary {
        common_imports,
        frameworks,
    }
}

/// Whether an absolute reference targets `module` or one of its submodules.
fn imports_module(reference: &ImportReference, module: &str) -> bool {
    reference.kind == ImportKind::Absolute
        && reference.module_parts.first().is_some_and(|top| top == module)
}
