//! Python language parser implementation.
//!
//! Handles .py files. Extracts the module docstring, top-level classes and
//! functions, every import statement, and the facts the metrics calculator
//! needs (complexity per function, comment and docstring rows, Halstead
//! operators).

use crate::metrics::{FunctionFacts, QualityFacts};
use crate::model::{Declaration, DeclaredFunction, DeclaredType, ImportReference, ImportedName};
use crate::parser::SourceParser;
use tree_sitter::{Language, Node, Tree};

pub struct PythonParser;

impl SourceParser for PythonParser {
    fn name(&self) -> &'static str {
        "python"
    }

    fn language(&self) -> Language {
        tree_sitter_python::language()
    }

    fn extensions(&self) -> &[&str] {
        &["py"]
    }

    fn package_marker(&self) -> Option<&str> {
        Some("__init__")
    }

    fn module_docstring(&self, tree: &Tree, source: &str) -> Option<String> {
        leading_docstring(&tree.root_node(), source)
    }

    fn extract_declarations(&self, tree: &Tree, source: &str) -> Vec<Declaration> {
        let root = tree.root_node();
        let mut declarations = Vec::new();

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            let definition = unwrap_decorated(child);
            match definition.kind() {
                "class_definition" => {
                    if let Some(declared) = extract_class(&definition, source) {
                        declarations.push(Declaration::Type(declared));
                    }
                }
                "function_definition" => {
                    if let Some(declared) = extract_function(&definition, source) {
                        declarations.push(Declaration::Function(declared));
                    }
                }
                _ => {}
            }
        }

        let mut imports = Vec::new();
        collect_imports(&root, source, &mut imports);
        declarations.extend(imports.into_iter().map(Declaration::Import));

        declarations
    }

    fn quality_facts(&self, tree: &Tree, source: &str) -> QualityFacts {
        let mut collector = FactsCollector::new(source);
        collector.visit(&tree.root_node(), &[], None);
        collector.facts
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Declarations
// ─────────────────────────────────────────────────────────────────────────────

fn extract_class(node: &Node, source: &str) -> Option<DeclaredType> {
    let name = get_text(&node.child_by_field_name("name")?, source).to_string();
    let body = node.child_by_field_name("body");

    let mut member_names = Vec::new();
    if let Some(body) = body {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            let member = unwrap_decorated(member);
            if member.kind() == "function_definition" {
                if let Some(member_name) = member.child_by_field_name("name") {
                    member_names.push(get_text(&member_name, source).to_string());
                }
            }
        }
    }

    Some(DeclaredType {
        name,
        docstring: body.and_then(|b| leading_docstring(&b, source)),
        member_names,
    })
}

fn extract_function(node: &Node, source: &str) -> Option<DeclaredFunction> {
    let name = get_text(&node.child_by_field_name("name")?, source).to_string();

    Some(DeclaredFunction {
        name,
        docstring: node
            .child_by_field_name("body")
            .and_then(|b| leading_docstring(&b, source)),
        param_names: parameter_names(node, source),
    })
}

/// Regular positional parameter names: those after a `/` separator and
/// before the first `*`, `*args` or `**kwargs`.
fn parameter_names(function: &Node, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let Some(parameters) = function.child_by_field_name("parameters") else {
        return names;
    };

    let mut cursor = parameters.walk();
    for param in parameters.named_children(&mut cursor) {
        match param.kind() {
            "identifier" => names.push(get_text(&param, source).to_string()),
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name) = param.child_by_field_name("name") {
                    names.push(get_text(&name, source).to_string());
                }
            }
            "typed_parameter" => match param.named_child(0) {
                Some(inner) if inner.kind() == "identifier" => {
                    names.push(get_text(&inner, source).to_string())
                }
                // `*args: int` and `**kw: str`
                _ => break,
            },
            // everything so far was positional-only
            "positional_separator" => names.clear(),
            "list_splat_pattern" | "dictionary_splat_pattern" | "keyword_separator" => break,
            _ => {}
        }
    }

    names
}

fn unwrap_decorated(node: Node<'_>) -> Node<'_> {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Imports
// ─────────────────────────────────────────────────────────────────────────────

/// Collects import references anywhere in the tree, in source order.
fn collect_imports(node: &Node, source: &str, imports: &mut Vec<ImportReference>) {
    let line = node.start_position().row as u32 + 1;

    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                if let Some(reference) = plain_import(&name, source, line) {
                    imports.push(reference);
                }
            }
            return;
        }
        "import_from_statement" => {
            if let Some(reference) = from_import(node, source, line) {
                imports.push(reference);
            }
            return;
        }
        "future_import_statement" => {
            let names = imported_names(node, source);
            imports.push(ImportReference::from_import(0, "__future__", names, line));
            return;
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_imports(&child, source, imports);
    }
}

fn plain_import(name: &Node, source: &str, line: u32) -> Option<ImportReference> {
    match name.kind() {
        "dotted_name" => Some(ImportReference::module(get_text(name, source), line)),
        "aliased_import" => {
            let module = name.child_by_field_name("name")?;
            let reference = ImportReference::module(get_text(&module, source), line);
            Some(match name.child_by_field_name("alias") {
                Some(alias) => reference.with_alias(get_text(&alias, source)),
                None => reference,
            })
        }
        _ => None,
    }
}

fn from_import(node: &Node, source: &str, line: u32) -> Option<ImportReference> {
    let module_name = node.child_by_field_name("module_name")?;

    let (level, module) = match module_name.kind() {
        "relative_import" => {
            let mut level = 0;
            let mut module = "";
            let mut cursor = module_name.walk();
            for part in module_name.named_children(&mut cursor) {
                match part.kind() {
                    "import_prefix" => level = get_text(&part, source).matches('.').count(),
                    "dotted_name" => module = get_text(&part, source),
                    _ => {}
                }
            }
            (level, module)
        }
        _ => (0, get_text(&module_name, source)),
    };

    Some(ImportReference::from_import(
        level,
        module,
        imported_names(node, source),
        line,
    ))
}

fn imported_names(node: &Node, source: &str) -> Vec<ImportedName> {
    let mut names = Vec::new();

    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        match name.kind() {
            "aliased_import" => {
                if let Some(original) = name.child_by_field_name("name") {
                    let mut imported = ImportedName::new(get_text(&original, source));
                    if let Some(alias) = name.child_by_field_name("alias") {
                        imported = imported.with_alias(get_text(&alias, source));
                    }
                    names.push(imported);
                }
            }
            _ => names.push(ImportedName::new(get_text(&name, source))),
        }
    }

    let mut cursor = node.walk();
    let wildcard = node
        .named_children(&mut cursor)
        .any(|child| child.kind() == "wildcard_import");
    if wildcard {
        names.push(ImportedName::new("*"));
    }

    names
}

// ─────────────────────────────────────────────────────────────────────────────
// Docstrings
// ─────────────────────────────────────────────────────────────────────────────

/// Docstring of a module or block: its first statement, when that
/// statement is a lone string literal.
fn leading_docstring(container: &Node, source: &str) -> Option<String> {
    let statement = first_statement(container)?;
    let literal = string_statement(&statement)?;
    string_literal_value(&literal, source).map(|raw| clean_docstring(&raw))
}

fn first_statement<'t>(container: &Node<'t>) -> Option<Node<'t>> {
    let mut cursor = container.walk();
    let first = container
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    first
}

/// The literal of a statement made of nothing but a string.
fn string_statement<'t>(statement: &Node<'t>) -> Option<Node<'t>> {
    if statement.kind() != "expression_statement" || statement.named_child_count() != 1 {
        return None;
    }
    statement
        .named_child(0)
        .filter(|child| matches!(child.kind(), "string" | "concatenated_string"))
}

/// The text value of a string literal. Byte strings and f-strings have no
/// docstring value.
fn string_literal_value(node: &Node, source: &str) -> Option<String> {
    if node.kind() == "concatenated_string" {
        let mut value = String::new();
        let mut cursor = node.walk();
        for part in node.named_children(&mut cursor) {
            if part.kind() == "string" {
                value.push_str(&string_literal_value(&part, source)?);
            }
        }
        return Some(value);
    }

    let text = get_text(node, source);
    let prefix_len = text
        .char_indices()
        .find(|(_, c)| *c == '"' || *c == '\'')
        .map(|(i, _)| i)?;
    let prefix = text[..prefix_len].to_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }

    let quoted = &text[prefix_len..];
    let quote_len = if quoted.starts_with("\"\"\"") || quoted.starts_with("'''") {
        3
    } else {
        1
    };
    if quoted.len() < quote_len * 2 {
        return None;
    }
    let body = &quoted[quote_len..quoted.len() - quote_len];

    Some(if prefix.contains('r') {
        body.to_string()
    } else {
        unescape(body)
    })
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            // line continuation
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Cleans a docstring the way Python's `inspect.cleandoc` does: tabs
/// expanded, the first line left-stripped, the common indentation of the
/// remaining lines removed, and leading and trailing blank lines dropped.
pub fn clean_docstring(raw: &str) -> String {
    let expanded: Vec<String> = raw
        .split('\n')
        .map(|line| expand_tabs(line.strip_suffix('\r').unwrap_or(line)))
        .collect();

    let margin = expanded
        .iter()
        .skip(1)
        .filter_map(|line| {
            let content = line.trim_start();
            (!content.is_empty()).then(|| line.chars().count() - content.chars().count())
        })
        .min();

    let mut lines: Vec<String> = expanded
        .iter()
        .enumerate()
        .map(|(i, line)| match (i, margin) {
            (0, _) => line.trim_start().to_string(),
            (_, Some(margin)) => line.chars().skip(margin).collect(),
            (_, None) => line.clone(),
        })
        .collect();

    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.trim().is_empty()).count();
    lines.drain(..leading);

    lines.join("\n")
}

fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + 8);
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = 8 - column % 8;
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Quality facts
// ─────────────────────────────────────────────────────────────────────────────

struct FactsCollector<'s> {
    source: &'s str,
    lines: Vec<&'s str>,
    facts: QualityFacts,
}

impl<'s> FactsCollector<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            lines: source.lines().collect(),
            facts: QualityFacts {
                module_complexity: 1,
                ..Default::default()
            },
        }
    }

    /// Walks the tree once. `scope` is the qualified-name prefix and
    /// `function` the index of the innermost enclosing function.
    fn visit(&mut self, node: &Node, scope: &[String], function: Option<usize>) {
        let kind = node.kind();

        if kind.ends_with("_statement") || kind == "function_definition" || kind == "class_definition" {
            self.facts.logical_lines += 1;
        }

        if is_decision(node) {
            match function {
                Some(index) => self.facts.functions[index].complexity += 1,
                None => self.facts.module_complexity += 1,
            }
        }

        match kind {
            "function_definition" | "class_definition" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| get_text(&n, self.source).to_string())
                    .unwrap_or_default();
                let mut inner_scope = scope.to_vec();
                inner_scope.push(name);

                let inner_function = if kind == "function_definition" {
                    self.facts.functions.push(FunctionFacts {
                        name: inner_scope.join("."),
                        line: node.start_position().row as u32 + 1,
                        end_line: node.end_position().row as u32 + 1,
                        param_count: parameter_names(node, self.source).len(),
                        complexity: 1,
                    });
                    Some(self.facts.functions.len() - 1)
                } else {
                    function
                };

                self.visit_children(node, &inner_scope, inner_function);
                return;
            }
            "comment" => {
                self.record_comment(node);
                return;
            }
            "expression_statement" => {
                if string_statement(node).is_some() {
                    let (start, end) = rows(node);
                    self.facts.multi_rows.extend(start..=end);
                }
            }
            "string" => {
                let (start, end) = rows(node);
                if end > start {
                    self.facts.string_rows.extend(start..=end);
                }
            }
            "import_statement" | "future_import_statement" => {
                let mut cursor = node.walk();
                self.facts.import_names += node.children_by_field_name("name", &mut cursor).count();
            }
            "import_from_statement" => {
                let mut cursor = node.walk();
                let named = node.children_by_field_name("name", &mut cursor).count();
                self.facts.import_names += named.max(1);
            }
            _ => {}
        }

        self.record_halstead(node);
        self.visit_children(node, scope, function);
    }

    fn visit_children(&mut self, node: &Node, scope: &[String], function: Option<usize>) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(&child, scope, function);
        }
    }

    fn record_comment(&mut self, node: &Node) {
        let position = node.start_position();
        let before = self
            .lines
            .get(position.row)
            .and_then(|line| line.get(..position.column))
            .unwrap_or("");
        if before.trim().is_empty() {
            self.facts.comment_rows.insert(position.row);
        }
    }

    fn record_halstead(&mut self, node: &Node) {
        let source = self.source;
        let halstead = &mut self.facts.halstead;
        let text = |field: &str| node.child_by_field_name(field).map(|n| get_text(&n, source));

        match node.kind() {
            "binary_operator" | "boolean_operator" | "augmented_assignment" => {
                if let Some(op) = text("operator") {
                    halstead.record_operator(op);
                }
                for field in ["left", "right"] {
                    if let Some(operand) = text(field) {
                        halstead.record_operand(operand);
                    }
                }
            }
            "unary_operator" => {
                if let Some(op) = text("operator") {
                    halstead.record_operator(op);
                }
                if let Some(operand) = text("argument") {
                    halstead.record_operand(operand);
                }
            }
            "not_operator" => {
                halstead.record_operator("not");
                if let Some(operand) = text("argument") {
                    halstead.record_operand(operand);
                }
            }
            "comparison_operator" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    let child_text = get_text(&child, source);
                    if child.is_named() {
                        if child.kind() != "comment" {
                            halstead.record_operand(child_text);
                        }
                    } else {
                        let op = child_text.split_whitespace().collect::<Vec<_>>().join(" ");
                        halstead.record_operator(&op);
                    }
                }
            }
            _ => {}
        }
    }
}

fn is_decision(node: &Node) -> bool {
    match node.kind() {
        "if_statement" | "elif_clause" | "for_statement" | "while_statement" | "except_clause"
        | "except_group_clause" | "conditional_expression" | "boolean_operator"
        | "for_in_clause" | "if_clause" | "assert_statement" | "case_clause" => true,
        // loop `else` and `try ... else`; a plain `if ... else` adds nothing
        "else_clause" => node.parent().is_some_and(|parent| {
            matches!(
                parent.kind(),
                "for_statement" | "while_statement" | "try_statement"
            )
        }),
        _ => false,
    }
}

fn rows(node: &Node) -> (usize, usize) {
    (node.start_position().row, node.end_position().row)
}

fn get_text<'s>(node: &Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComponentOutline, ImportKind};
    use crate::parser::ParsedSource;
    use std::path::Path;

    fn outline(source: &str) -> ComponentOutline {
        let parser = PythonParser;
        ParsedSource::parse(&parser, Path::new("test.py"), source.to_string())
            .unwrap()
            .outline()
    }

    fn facts(source: &str) -> QualityFacts {
        let parser = PythonParser;
        ParsedSource::parse(&parser, Path::new("test.py"), source.to_string())
            .unwrap()
            .quality_facts()
    }

    #[test]
    fn test_module_docstring_and_top_level_declarations() {
        let source = r#""""Service layer.

    Talks to the database.
"""
import os

class Service(Base):
    """Runs things."""

    def __init__(self, db):
        self.db = db

    @property
    def name(self):
        return "svc"

    async def fetch(self, key, default=None, *args, **kwargs):
        pass

@cached
def helper(a, b: int, c=1, d: str = "x", *, e):
    """Help."""
    def inner():
        pass
    return a

async def run():
    pass
"#;
        let outline = outline(source);

        assert_eq!(
            outline.docstring.as_deref(),
            Some("Service layer.\n\nTalks to the database.")
        );

        assert_eq!(outline.types.len(), 1);
        let service = &outline.types[0];
        assert_eq!(service.name, "Service");
        assert_eq!(service.docstring.as_deref(), Some("Runs things."));
        assert_eq!(service.member_names, vec!["__init__", "name", "fetch"]);

        let names: Vec<&str> = outline.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["helper", "run"]);
        assert_eq!(outline.functions[0].param_names, vec!["a", "b", "c", "d"]);
        assert_eq!(outline.functions[0].docstring.as_deref(), Some("Help."));
        assert!(outline.functions[1].docstring.is_none());
    }

    #[test]
    fn test_parameters_stop_at_splat() {
        let source = "def f(self, x, /, y, *args, z, **kw):\n    pass\n\ndef g(**kw):\n    pass\n";
        let outline = outline(source);

        assert_eq!(outline.functions[0].param_names, vec!["y"]);
        assert!(outline.functions[1].param_names.is_empty());
    }

    #[test]
    fn test_positional_only_parameters_are_not_counted() {
        let source = "def f(a, b, /, c):\n    pass\n\ndef g(a, b=2, /):\n    pass\n";

        let outline = outline(source);
        assert_eq!(outline.functions[0].param_names, vec!["c"]);
        assert!(outline.functions[1].param_names.is_empty());

        let facts = facts(source);
        assert_eq!(facts.functions[0].param_count, 1);
        assert_eq!(facts.functions[1].param_count, 0);
    }

    #[test]
    fn test_imports_anywhere_in_file() {
        let source = r#"
import os, numpy as np
from . import sibling
from ..core.models import User as U, Group
from pkg.sub import *
from __future__ import annotations

def lazy():
    import json
"#;
        let imports = outline(source).imports;

        let statements: Vec<String> = imports.iter().map(|i| i.statement()).collect();
        assert_eq!(
            statements,
            vec![
                "import os",
                "import numpy",
                "from . import sibling",
                "from ..core.models import User, Group",
                "from pkg.sub import *",
                "from __future__ import annotations",
                "import json",
            ]
        );

        assert_eq!(imports[1].alias.as_deref(), Some("np"));
        assert_eq!(imports[2].kind, ImportKind::Relative);
        assert_eq!(imports[2].level, 1);
        assert!(imports[2].module_parts.is_empty());
        assert_eq!(imports[3].level, 2);
        assert_eq!(imports[3].imported_names[0].alias.as_deref(), Some("U"));
        assert_eq!(imports[6].line, 9);
    }

    #[test]
    fn test_clean_docstring() {
        assert_eq!(clean_docstring("  Summary.  "), "Summary.  ");
        assert_eq!(
            clean_docstring("\n    First.\n\n      Indented.\n    Last.\n    "),
            "First.\n\n  Indented.\nLast."
        );
        assert_eq!(clean_docstring(""), "");
    }

    #[test]
    fn test_byte_string_is_not_a_docstring() {
        assert!(outline("b\"not docs\"\nx = 1\n").docstring.is_none());
        assert_eq!(
            outline("r'''raw \\n kept'''\n").docstring.as_deref(),
            Some("raw \\n kept")
        );
    }

    #[test]
    fn test_complexity_per_function() {
        let source = r#"
class Router:
    def route(self, x):
        if x and self.ready:
            return [y for y in x if y]
        return None

def outer(items):
    def inner(v):
        return v if v else 0
    for item in items:
        try:
            inner(item)
        except ValueError:
            pass
        else:
            pass
    else:
        pass

if __name__ == "__main__":
    outer([])
"#;
        let facts = facts(source);
        let summary: Vec<(&str, u32)> = facts
            .functions
            .iter()
            .map(|f| (f.name.as_str(), f.complexity))
            .collect();

        // route: if, and, for, if
        // outer: for, except, try-else, for-else
        assert_eq!(
            summary,
            vec![("Router.route", 5), ("outer", 5), ("outer.inner", 2)]
        );
        assert_eq!(facts.module_complexity, 2);
        assert_eq!(facts.functions[0].line, 3);
        assert_eq!(facts.functions[0].param_count, 2);
    }

    #[test]
    fn test_rows_and_import_names() {
        let source = "\"\"\"Doc\nstring.\"\"\"\n# only comment\nimport a, b\nfrom c import d, e, f\nfrom g import *\nx = '''\n\n'''  # note\n";
        let facts = facts(source);

        assert_eq!(facts.multi_rows.iter().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(facts.comment_rows.iter().copied().collect::<Vec<_>>(), vec![2]);
        assert!(facts.string_rows.contains(&7));
        assert_eq!(facts.import_names, 6);
    }
}
