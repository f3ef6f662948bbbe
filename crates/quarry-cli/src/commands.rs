//! CLI command implementations.

use crate::SelectionArgs;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use quarry_collector::{
    AnalysisContext, CancellationToken, CollectConfig, CollectOutcome, FileConfig, Repository,
    RepositoryFile, Warning,
};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const MAX_LISTED_WARNINGS: usize = 5;
const MAX_LISTED_IMPORTS: usize = 5;

/// Runs the pipeline for a selection, with a spinner while it works.
fn run(selection: &SelectionArgs) -> Result<(CollectConfig, CollectOutcome)> {
    let file_config = selection
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;

    let config = CollectConfig::merge(
        &selection.includes,
        &selection.excludes,
        selection.name.as_deref(),
        file_config,
    )?
    .with_metrics(!selection.no_metrics);
    debug!(
        "{} include rule(s), {} exclude rule(s)",
        config.sources.len(),
        config.excludes.len()
    );

    let cancel = match selection.timeout {
        Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
        None => CancellationToken::new(),
    };
    let ctx = AnalysisContext::new(&selection.root)?
        .with_cancellation(cancel)
        .with_jobs(selection.jobs);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Analyzing files...");

    let outcome = quarry_collector::collect(&config, &ctx);
    spinner.finish_and_clear();
    let outcome = outcome?;

    print_warnings(&outcome.warnings);
    Ok((config, outcome))
}

fn print_warnings(warnings: &[Warning]) {
    let problems: Vec<&Warning> = warnings
        .iter()
        .filter(|w| !matches!(w, Warning::EmptyResult))
        .collect();
    if problems.is_empty() {
        return;
    }

    println!("{} {} warning(s):", "⚠".yellow(), problems.len());
    for warning in problems.iter().take(MAX_LISTED_WARNINGS) {
        println!("  {}", warning.to_string().red());
    }
    if problems.len() > MAX_LISTED_WARNINGS {
        println!("  ... and {} more", problems.len() - MAX_LISTED_WARNINGS);
    }
    println!();
}

/// Analyze the repository, print a summary and optionally export JSON.
pub fn collect(selection: &SelectionArgs, output: Option<&Path>) -> Result<()> {
    println!("{}", "Analyzing repository...".cyan());
    let (config, outcome) = run(selection)?;
    let repo = &outcome.repository;

    println!(
        "{} Analyzed {} files ({} dependencies) in {}ms",
        "✓".green(),
        repo.files().len().to_string().cyan(),
        repo.statistics().edge_count.to_string().cyan(),
        outcome.duration_ms
    );
    println!();
    println!("{}", repo.name().bold());
    println!("{}", repo.statistics());

    print_key_files(repo);
    print_patterns(repo);

    if let Some(path) = output.or(config.output.as_deref()) {
        fs::write(path, repo.to_json()?)?;
        println!();
        println!("{} Exported to {}", "✓".green(), path.display());
    }

    Ok(())
}

fn print_key_files(repo: &Repository) {
    if repo.key_files().is_empty() {
        return;
    }
    println!();
    println!("{}", "Key files".cyan().bold());
    for key in repo.key_files() {
        let label = repo
            .file(&key.path)
            .map(|f| f.relative_path().to_string())
            .unwrap_or_else(|| key.path.display().to_string());
        println!("  {:>6.2}  {}", key.score.total, label);
    }
}

fn print_patterns(repo: &Repository) {
    let patterns = repo.patterns();

    if !patterns.frameworks.is_empty() {
        println!();
        println!("{}", "Frameworks".cyan().bold());
        for (framework, evidence) in &patterns.frameworks {
            println!("  {} {}", framework.yellow(), evidence.dimmed());
        }
    }

    if !patterns.common_imports.is_empty() {
        println!();
        println!("{}", "Common imports".cyan().bold());
        for import in patterns.common_imports.iter().take(MAX_LISTED_IMPORTS) {
            println!("  {:>4}  {}", import.count, import.statement);
        }
    }
}

/// List analyzed files.
pub fn files(selection: &SelectionArgs, linked: bool) -> Result<()> {
    let (_, outcome) = run(selection)?;
    let repo = &outcome.repository;

    let listed: Vec<&RepositoryFile> = repo
        .files()
        .iter()
        .filter(|f| !linked || !f.depends_on().is_empty() || !f.used_by().is_empty())
        .collect();

    if listed.is_empty() {
        println!("No files found matching the specified criteria.");
        return Ok(());
    }

    for file in listed {
        println!(
            "{} {}",
            file.relative_path().cyan(),
            format!(
                "({} lines, imports {}, used by {})",
                file.record().line_count,
                file.depends_on().len(),
                file.used_by().len()
            )
            .dimmed()
        );
        println!("    {}", file.description());
    }

    Ok(())
}

/// Show everything known about one file.
pub fn inspect(selection: &SelectionArgs, file: &Path) -> Result<()> {
    let (_, outcome) = run(selection)?;
    let repo = &outcome.repository;

    let path = selection.root.join(file).canonicalize()?;
    let entry = repo
        .file(&path)
        .ok_or_else(|| format!("{} is not in the analyzed file set", file.display()))?;

    println!("{}", entry.relative_path().cyan().bold());
    println!("  {} {}", "Description:".dimmed(), entry.description());
    println!("  {} {}", "Lines:".dimmed(), entry.record().line_count);
    println!("  {} {} bytes", "Size:".dimmed(), entry.record().size_bytes);

    match entry.outline() {
        None => println!("  {}", "No parser for this file type".yellow()),
        Some(outline) if outline.is_empty() => {
            println!("  {}", "Nothing extracted".yellow())
        }
        Some(outline) => {
            for ty in &outline.types {
                println!("  {} {}", "class".yellow(), ty.name);
                for member in &ty.member_names {
                    println!("    {}", member);
                }
            }
            for function in &outline.functions {
                println!(
                    "  {} {}({})",
                    "def".yellow(),
                    function.name,
                    function.param_names.join(", ")
                );
            }
            for import in &outline.imports {
                println!("  {}", import.statement().dimmed());
            }
        }
    }

    for dep in entry.depends_on() {
        let label = repo
            .file(dep)
            .map(|f| f.relative_path().to_string())
            .unwrap_or_else(|| dep.display().to_string());
        println!("  {} {}", "→".green(), label);
    }
    for user in entry.used_by() {
        let label = repo
            .file(user)
            .map(|f| f.relative_path().to_string())
            .unwrap_or_else(|| user.display().to_string());
        println!("  {} {}", "←".cyan(), label);
    }

    if let Some(metrics) = entry.metrics() {
        println!();
        println!(
            "  {} {} sloc, {} comments, {} blank",
            "Raw:".dimmed(),
            metrics.raw.sloc,
            metrics.raw.comments,
            metrics.raw.blank
        );
        println!(
            "  {} {:.2} average ({})",
            "Complexity:".dimmed(),
            metrics.complexity.average,
            metrics.complexity.rank
        );
        println!(
            "  {} {:.2} ({})",
            "Maintainability:".dimmed(),
            metrics.maintainability.value,
            metrics.maintainability.rank
        );
        for function in &metrics.functions {
            println!(
                "    {} {} {}",
                function.rank,
                function.name,
                format!("(line {}, complexity {})", function.line, function.complexity).dimmed()
            );
        }
        for smell in &metrics.smells {
            println!(
                "  {} {}: {}",
                "⚠".yellow(),
                smell.location,
                smell.description
            );
            println!("    {}", smell.suggestion.dimmed());
        }
    }

    Ok(())
}
