//! Per-file code quality metrics.
//!
//! A dialect reports raw `QualityFacts` about a parsed file (which rows are
//! comments, how complex each function is, which operators appear). The
//! `MetricsCalculator` turns those facts into line counts, complexity and
//! maintainability scores, and a list of code smells. It never looks at a
//! syntax tree itself, so every dialect shares the same scoring rules.

use crate::parser::ParsedSource;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

// ─────────────────────────────────────────────────────────────────────────────
// Scores
// ─────────────────────────────────────────────────────────────────────────────

/// Letter grade, A best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    A,
    B,
    C,
    D,
    F,
}

impl Rank {
    pub const ALL: [Rank; 5] = [Rank::A, Rank::B, Rank::C, Rank::D, Rank::F];

    /// Grades a cyclomatic complexity value (lower is better).
    pub fn from_complexity(complexity: f64) -> Self {
        if complexity <= 5.0 {
            Rank::A
        } else if complexity <= 10.0 {
            Rank::B
        } else if complexity <= 20.0 {
            Rank::C
        } else if complexity <= 30.0 {
            Rank::D
        } else {
            Rank::F
        }
    }

    /// Grades a maintainability index (higher is better).
    pub fn from_maintainability(value: f64) -> Self {
        if value >= 85.0 {
            Rank::A
        } else if value >= 65.0 {
            Rank::B
        } else if value >= 40.0 {
            Rank::C
        } else if value >= 25.0 {
            Rank::D
        } else {
            Rank::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
            Rank::D => "D",
            Rank::F => "F",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical and logical line counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    /// Physical lines.
    pub loc: usize,
    /// Logical statements.
    pub lloc: usize,
    /// Lines holding code.
    pub sloc: usize,
    /// Comment-only lines.
    pub comments: usize,
    /// Lines of string-only statements (docstrings).
    pub multi: usize,
    /// Whitespace-only lines outside strings.
    pub blank: usize,
    /// `comments / loc`, zero for an empty file.
    pub comment_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityScore {
    pub total: u32,
    pub average: f64,
    pub rank: Rank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintainabilityScore {
    pub value: f64,
    pub rank: Rank,
}

/// Complexity of one function or method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionComplexity {
    /// Qualified name: `Class.method`, `outer.inner`.
    pub name: String,
    pub line: u32,
    pub complexity: u32,
    pub rank: Rank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmellKind {
    HighComplexity,
    LongFunction,
    TooManyParameters,
    TooManyImports,
}

impl SmellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmellKind::HighComplexity => "high_complexity",
            SmellKind::LongFunction => "long_function",
            SmellKind::TooManyParameters => "too_many_parameters",
            SmellKind::TooManyImports => "too_many_imports",
        }
    }
}

impl fmt::Display for SmellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSmell {
    pub kind: SmellKind,
    /// `name (line N)` for functions, the file name for modules.
    pub location: String,
    pub description: String,
    pub suggestion: String,
}

/// Everything computed for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetrics {
    pub raw: RawMetrics,
    pub complexity: ComplexityScore,
    pub maintainability: MaintainabilityScore,
    pub functions: Vec<FunctionComplexity>,
    pub smells: Vec<CodeSmell>,
}

/// Limits above which a smell is reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsThresholds {
    pub max_function_lines: u32,
    pub max_parameters: usize,
    pub max_imports: usize,
    pub max_complexity: u32,
}

impl Default for MetricsThresholds {
    fn default() -> Self {
        Self {
            max_function_lines: 50,
            max_parameters: 7,
            max_imports: 15,
            max_complexity: 10,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Facts reported by a dialect
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionFacts {
    /// Qualified name.
    pub name: String,
    /// 1-based first line of the definition.
    pub line: u32,
    /// 1-based last line of the definition.
    pub end_line: u32,
    /// Positional parameter count.
    pub param_count: usize,
    pub complexity: u32,
}

impl FunctionFacts {
    pub fn length(&self) -> u32 {
        self.end_line.saturating_sub(self.line)
    }
}

/// Operator and operand occurrences, keyed by their text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HalsteadCounts {
    pub operators: BTreeMap<String, usize>,
    pub operands: BTreeMap<String, usize>,
}

impl HalsteadCounts {
    pub fn record_operator(&mut self, op: &str) {
        *self.operators.entry(op.to_string()).or_insert(0) += 1;
    }

    pub fn record_operand(&mut self, operand: &str) {
        *self.operands.entry(operand.to_string()).or_insert(0) += 1;
    }

    /// Program volume `N * log2(n)`.
    pub fn volume(&self) -> f64 {
        let vocabulary = self.operators.len() + self.operands.len();
        if vocabulary == 0 {
            return 0.0;
        }
        let length: usize = self.operators.values().sum::<usize>() + self.operands.values().sum::<usize>();
        length as f64 * (vocabulary as f64).log2()
    }
}

/// Raw facts about a parsed file. Rows are 0-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualityFacts {
    /// Rows that hold nothing but a comment.
    pub comment_rows: BTreeSet<usize>,
    /// Rows covered by string-only statements.
    pub multi_rows: BTreeSet<usize>,
    /// Rows covered by any multi-line string literal.
    pub string_rows: BTreeSet<usize>,
    pub logical_lines: usize,
    /// Every function and method, in source order.
    pub functions: Vec<FunctionFacts>,
    /// 1 + decisions outside any function.
    pub module_complexity: u32,
    /// Names bound by import statements.
    pub import_names: usize,
    pub halstead: HalsteadCounts,
}

// ─────────────────────────────────────────────────────────────────────────────
// MetricsCalculator
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MetricsCalculator {
    thresholds: MetricsThresholds,
}

impl MetricsCalculator {
    pub fn new(thresholds: MetricsThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &MetricsThresholds {
        &self.thresholds
    }

    /// Computes metrics for an already parsed file.
    pub fn calculate(&self, parsed: &ParsedSource<'_>, path: &Path) -> FileMetrics {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");
        self.measure(&parsed.quality_facts(), &parsed.source, file_name)
    }

    /// Computes metrics from facts. Pure: same inputs, same output.
    pub fn measure(&self, facts: &QualityFacts, source: &str, file_name: &str) -> FileMetrics {
        let raw = raw_metrics(facts, source);
        let complexity = complexity_score(facts);
        let maintainability = maintainability_score(facts, &raw, complexity.total);

        let functions = facts
            .functions
            .iter()
            .map(|f| FunctionComplexity {
                name: f.name.clone(),
                line: f.line,
                complexity: f.complexity,
                rank: Rank::from_complexity(f.complexity as f64),
            })
            .collect();

        let smells = self.detect_smells(facts, file_name);

        FileMetrics {
            raw,
            complexity,
            maintainability,
            functions,
            smells,
        }
    }

    fn detect_smells(&self, facts: &QualityFacts, file_name: &str) -> Vec<CodeSmell> {
        let t = &self.thresholds;
        let mut smells = Vec::new();

        for f in &facts.functions {
            if f.complexity > t.max_complexity {
                smells.push(CodeSmell {
                    kind: SmellKind::HighComplexity,
                    location: function_location(f),
                    description: format!(
                        "Function has high cyclomatic complexity ({})",
                        f.complexity
                    ),
                    suggestion: "Consider refactoring into smaller functions".into(),
                });
            }
        }

        for f in &facts.functions {
            let length = f.length();
            if length > t.max_function_lines {
                smells.push(CodeSmell {
                    kind: SmellKind::LongFunction,
                    location: function_location(f),
                    description: format!("Function is too long ({} lines)", length),
                    suggestion: "Consider breaking into smaller functions".into(),
                });
            }
            if f.param_count > t.max_parameters {
                smells.push(CodeSmell {
                    kind: SmellKind::TooManyParameters,
                    location: function_location(f),
                    description: format!("Function has too many parameters ({})", f.param_count),
                    suggestion: "Consider using a class or data objects to group parameters"
                        .into(),
                });
            }
        }

        if facts.import_names > t.max_imports {
            smells.push(CodeSmell {
                kind: SmellKind::TooManyImports,
                location: file_name.to_string(),
                description: format!("Module has too many imports ({})", facts.import_names),
                suggestion: "Consider refactoring to reduce dependencies".into(),
            });
        }

        smells
    }
}

fn function_location(f: &FunctionFacts) -> String {
    format!("{} (line {})", f.name, f.line)
}

fn raw_metrics(facts: &QualityFacts, source: &str) -> RawMetrics {
    let mut loc = 0;
    let mut comments = 0;
    let mut multi = 0;
    let mut blank = 0;

    for (row, line) in source.lines().enumerate() {
        loc += 1;
        if facts.multi_rows.contains(&row) {
            multi += 1;
        } else if facts.comment_rows.contains(&row) {
            comments += 1;
        } else if line.trim().is_empty() && !facts.string_rows.contains(&row) {
            blank += 1;
        }
    }

    let comment_ratio = if loc > 0 {
        comments as f64 / loc as f64
    } else {
        0.0
    };

    RawMetrics {
        loc,
        lloc: facts.logical_lines,
        sloc: loc - multi - comments - blank,
        comments,
        multi,
        blank,
        comment_ratio,
    }
}

fn complexity_score(facts: &QualityFacts) -> ComplexityScore {
    let (total, average) = if facts.functions.is_empty() {
        (facts.module_complexity, facts.module_complexity as f64)
    } else {
        let total: u32 = facts.functions.iter().map(|f| f.complexity).sum();
        (total, total as f64 / facts.functions.len() as f64)
    };

    ComplexityScore {
        total,
        average,
        rank: Rank::from_complexity(average),
    }
}

fn maintainability_score(facts: &QualityFacts, raw: &RawMetrics, complexity: u32) -> MaintainabilityScore {
    let volume = facts.halstead.volume();
    let logical = raw.lloc as f64;

    let value = if volume <= 0.0 || logical <= 0.0 {
        100.0
    } else {
        let unscaled = 171.0 - 5.2 * volume.ln() - 0.23 * complexity as f64 - 16.2 * logical.ln()
            + 50.0 * (2.46 * comment_percent(raw).to_radians()).sqrt().sin();
        (unscaled * 100.0 / 171.0).clamp(0.0, 100.0)
    };

    let value = (value * 100.0).round() / 100.0;
    MaintainabilityScore {
        value,
        rank: Rank::from_maintainability(value),
    }
}

/// Comment and docstring lines as a percentage of source lines. Not capped:
/// a heavily documented file can exceed 100.
fn comment_percent(raw: &RawMetrics) -> f64 {
    if raw.sloc == 0 {
        return 0.0;
    }
    (raw.comments + raw.multi) as f64 * 100.0 / raw.sloc as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::PythonParser;

    fn metrics_for(source: &str) -> FileMetrics {
        let parser = PythonParser;
        let parsed = ParsedSource::parse(&parser, Path::new("sample.py"), source.to_string())
            .expect("sample parses");
        MetricsCalculator::default().calculate(&parsed, Path::new("/repo/sample.py"))
    }

    fn function(name: &str, line: u32, end_line: u32, param_count: usize, complexity: u32) -> FunctionFacts {
        FunctionFacts {
            name: name.into(),
            line,
            end_line,
            param_count,
            complexity,
        }
    }

    #[test]
    fn test_rank_boundaries() {
        assert_eq!(Rank::from_complexity(5.0), Rank::A);
        assert_eq!(Rank::from_complexity(5.5), Rank::B);
        assert_eq!(Rank::from_complexity(10.0), Rank::B);
        assert_eq!(Rank::from_complexity(12.0), Rank::C);
        assert_eq!(Rank::from_complexity(30.0), Rank::D);
        assert_eq!(Rank::from_complexity(31.0), Rank::F);

        assert_eq!(Rank::from_maintainability(85.0), Rank::A);
        assert_eq!(Rank::from_maintainability(84.99), Rank::B);
        assert_eq!(Rank::from_maintainability(40.0), Rank::C);
        assert_eq!(Rank::from_maintainability(25.0), Rank::D);
        assert_eq!(Rank::from_maintainability(24.9), Rank::F);
    }

    #[test]
    fn test_raw_line_counts() {
        let source = "\"\"\"Module doc.\n\nMore text.\n\"\"\"\n\n# a comment\nimport os\n\nx = 1  # trailing\n";
        let metrics = metrics_for(source);

        assert_eq!(metrics.raw.loc, 9);
        assert_eq!(metrics.raw.multi, 4);
        assert_eq!(metrics.raw.comments, 1);
        assert_eq!(metrics.raw.blank, 2);
        assert_eq!(metrics.raw.sloc, 2);
        assert!((metrics.raw.comment_ratio - 1.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_comment_percent_is_over_source_lines() {
        let documented = metrics_for("\"\"\"Module doc.\n\nMore text.\n\"\"\"\n\n# a comment\nimport os\n\nx = 1  # trailing\n");
        // (1 comment + 4 docstring lines) over 2 code lines, not over 9 physical lines
        assert_eq!(comment_percent(&documented.raw), 250.0);

        let only_comments = metrics_for("# nothing else\n");
        assert_eq!(only_comments.raw.sloc, 0);
        assert_eq!(comment_percent(&only_comments.raw), 0.0);
    }

    #[test]
    fn test_module_without_functions_uses_module_complexity() {
        let metrics = metrics_for("x = 1\nif x:\n    y = 2\n");

        assert!(metrics.functions.is_empty());
        assert_eq!(metrics.complexity.total, 2);
        assert_eq!(metrics.complexity.average, 2.0);
        assert_eq!(metrics.complexity.rank, Rank::A);
    }

    #[test]
    fn test_complexity_average_over_functions() {
        let facts = QualityFacts {
            functions: vec![
                function("busy", 1, 30, 1, 12),
                function("calm", 31, 33, 0, 1),
                function("idle", 34, 36, 0, 2),
            ],
            module_complexity: 1,
            ..Default::default()
        };
        let metrics = MetricsCalculator::default().measure(&facts, "", "m.py");

        assert_eq!(metrics.complexity.total, 15);
        assert_eq!(metrics.complexity.average, 5.0);
        assert_eq!(metrics.complexity.rank, Rank::A);
        assert_eq!(metrics.functions[0].rank, Rank::C);
        assert_eq!(metrics.smells.len(), 1);
        assert_eq!(metrics.smells[0].kind, SmellKind::HighComplexity);
        assert_eq!(metrics.smells[0].location, "busy (line 1)");
    }

    #[test]
    fn test_smells_follow_thresholds() {
        let facts = QualityFacts {
            functions: vec![
                function("long_one", 10, 70, 2, 1),
                function("wide", 80, 82, 8, 1),
                function("exact", 90, 140, 7, 1),
            ],
            import_names: 16,
            ..Default::default()
        };
        let metrics = MetricsCalculator::default().measure(&facts, "", "big.py");
        let kinds: Vec<SmellKind> = metrics.smells.iter().map(|s| s.kind).collect();

        assert_eq!(
            kinds,
            vec![
                SmellKind::LongFunction,
                SmellKind::TooManyParameters,
                SmellKind::TooManyImports
            ]
        );
        assert_eq!(metrics.smells[0].description, "Function is too long (60 lines)");
        assert_eq!(metrics.smells[2].location, "big.py");

        let relaxed = MetricsCalculator::new(MetricsThresholds {
            max_function_lines: 100,
            max_parameters: 10,
            max_imports: 20,
            max_complexity: 10,
        });
        assert!(relaxed.measure(&facts, "", "big.py").smells.is_empty());
    }

    #[test]
    fn test_trivial_file_is_fully_maintainable() {
        let metrics = metrics_for("\"\"\"Only a docstring.\"\"\"\n");
        assert_eq!(metrics.maintainability.value, 100.0);
        assert_eq!(metrics.maintainability.rank, Rank::A);
    }

    #[test]
    fn test_maintainability_in_range_and_pure() {
        let source = "def f(a, b):\n    if a > b and a > 0:\n        return a * b + 1\n    return b - a\n";
        let first = metrics_for(source);
        let second = metrics_for(source);

        assert_eq!(first, second);
        assert!(first.maintainability.value > 0.0);
        assert!(first.maintainability.value <= 100.0);
    }

    #[test]
    fn test_halstead_volume() {
        let mut counts = HalsteadCounts::default();
        assert_eq!(counts.volume(), 0.0);

        counts.record_operator("+");
        counts.record_operand("a");
        counts.record_operand("b");
        counts.record_operand("a");
        // N = 4, n = 3
        assert!((counts.volume() - 4.0 * 3f64.log2()).abs() < 1e-9);
    }
}
