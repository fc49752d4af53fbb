use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use targcc_patcher::{
    generator_fixes, resolve_workspace, FileTarget, Mode, PatchParams, RunResult, Runner,
    TargetReport, TargetStatus,
};

const WORKSPACE_ENV: &str = "TARGCC_WORKSPACE";
const WORKSPACE_PROBE: &str = "src/TargCC.Core.Generators";

#[derive(Parser)]
#[command(name = "targcc-patcher")]
#[command(about = "One-shot patcher for TargCC V2 generator defects", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all generator fixes to a workspace
    Apply {
        /// Path to the TargCC workspace root (auto-detected if not specified)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Root namespace baked into the patched generator defaults
        #[arg(long, default_value = "YourApp")]
        root_namespace: String,

        /// Dry run - evaluate everything, write nothing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Show per-rule match counts (zero counts reveal rule drift)
        #[arg(short, long)]
        verbose: bool,
    },

    /// Report which files the fixes would change, without writing
    Status {
        /// Path to the TargCC workspace root (auto-detected if not specified)
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// List the built-in file targets and their rules
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            workspace,
            root_namespace,
            dry_run,
            diff,
            verbose,
        } => cmd_apply(workspace, root_namespace, dry_run, diff, verbose),

        Commands::Status { workspace } => cmd_status(workspace),

        Commands::List => cmd_list(),
    }
}

/// Resolve the workspace root or fail with actionable suggestions.
fn workspace_or_bail(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = resolve_workspace(explicit, WORKSPACE_ENV, WORKSPACE_PROBE) {
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        anyhow::bail!("workspace path does not exist: {}", path.display());
    }

    anyhow::bail!(
        "{}\n{}\n  {}\n  {}\n  {}",
        "Could not find a TargCC workspace.".red(),
        "Try one of:".bold(),
        "1. cd into the workspace: cd /path/to/TargCC-Core-V2 && targcc-patcher apply",
        "2. Specify explicitly: targcc-patcher apply --workspace /path/to/TargCC-Core-V2",
        format!("3. Set the environment variable: export {WORKSPACE_ENV}=/path/to/TargCC-Core-V2"),
    )
}

/// Unified diff between original and patched content.
fn display_diff(file: &std::path::Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn print_rule_counts(target: &FileTarget, matches: &[usize]) {
    for (rule, count) in target.rules.iter().zip(matches) {
        let line = format!("    {count}× {rule}");
        if *count == 0 {
            println!("{}", line.dimmed());
        } else {
            println!("{line}");
        }
    }
}

fn cmd_apply(
    workspace: Option<PathBuf>,
    root_namespace: String,
    dry_run: bool,
    show_diff: bool,
    verbose: bool,
) -> Result<()> {
    let workspace = workspace_or_bail(workspace)?;
    let params = PatchParams { root_namespace };
    let targets = generator_fixes(&params);

    println!("Workspace: {}", workspace.display());
    if dry_run {
        println!("{}", "[DRY RUN - no files will be written]".cyan());
    }
    println!();

    // Capture pre-patch contents for diff display before anything is written.
    let mut before: HashMap<PathBuf, String> = HashMap::new();
    if show_diff {
        for target in &targets {
            let path = workspace.join(&target.path);
            if let Ok(content) = fs::read_to_string(&path) {
                before.insert(path, content);
            }
        }
    }

    let mode = if dry_run { Mode::Check } else { Mode::Apply };

    let mut index = 0usize;
    let result = Runner::new(&workspace).mode(mode).run(&targets, |report| {
        report_progress(report, &targets[index], dry_run, verbose);

        if show_diff {
            if let TargetStatus::Patched { preview, .. } = &report.status {
                if let Some(original) = before.get(&report.file) {
                    match preview {
                        Some(patched) => display_diff(&report.file, original, patched),
                        None => {
                            if let Ok(patched) = fs::read_to_string(&report.file) {
                                display_diff(&report.file, original, &patched);
                            }
                        }
                    }
                }
            }
        }

        index += 1;
    });

    print_summary(&result);

    if !result.success() {
        std::process::exit(1);
    }
    Ok(())
}

fn report_progress(report: &TargetReport, target: &FileTarget, dry_run: bool, verbose: bool) {
    match &report.status {
        TargetStatus::Patched { matches, .. } => {
            let verb = if dry_run { "Would patch" } else { "Patched" };
            println!("{} {} {}", "✓".green(), verb, report.file.display());
            if verbose {
                print_rule_counts(target, matches);
            }
        }
        TargetStatus::Unchanged => {
            println!(
                "{} Already patched {}",
                "⊙".yellow(),
                report.file.display()
            );
        }
        TargetStatus::Failed(e) => {
            eprintln!("{} Failed {}", "✗".red(), report.file.display());
            eprintln!("  {e}");
        }
        TargetStatus::Skipped => {
            println!(
                "{} Skipped {} (earlier target failed)",
                "⊘".cyan(),
                report.file.display()
            );
        }
    }
}

fn print_summary(result: &RunResult) {
    let mut patched = 0;
    let mut unchanged = 0;
    let mut failed = 0;
    let mut skipped = 0;
    for report in &result.reports {
        match report.status {
            TargetStatus::Patched { .. } => patched += 1,
            TargetStatus::Unchanged => unchanged += 1,
            TargetStatus::Failed(_) => failed += 1,
            TargetStatus::Skipped => skipped += 1,
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} patched", format!("{patched}").green());
    println!("  {} already patched", format!("{unchanged}").yellow());
    println!("  {} skipped", format!("{skipped}").cyan());
    println!("  {} failed", format!("{failed}").red());
}

fn cmd_status(workspace: Option<PathBuf>) -> Result<()> {
    let workspace = workspace_or_bail(workspace)?;
    let targets = generator_fixes(&PatchParams::default());

    println!("{}", "Patch Status Report".bold());
    println!("Workspace: {}", workspace.display());
    println!();

    let result = Runner::new(&workspace)
        .mode(Mode::Check)
        .run(&targets, |report| match &report.status {
            TargetStatus::Patched { matches, .. } => {
                let applied = matches.iter().filter(|&&n| n > 0).count();
                println!(
                    "{} {} ({applied}/{} rules would match)",
                    "⊙".yellow(),
                    report.file.display(),
                    matches.len()
                );
            }
            TargetStatus::Unchanged => {
                println!("{} {} (already patched)", "✓".green(), report.file.display());
            }
            TargetStatus::Failed(e) => {
                eprintln!("{} {}: {e}", "✗".red(), report.file.display());
            }
            TargetStatus::Skipped => {
                println!("{} {} (skipped)", "⊘".cyan(), report.file.display());
            }
        });

    if !result.success() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_list() -> Result<()> {
    let targets = generator_fixes(&PatchParams::default());

    println!("{}", "Built-in generator fixes:".bold());
    for target in &targets {
        println!();
        println!("{} ({} rules)", target.path.bold(), target.rules.len());
        for rule in &target.rules {
            println!("  - {rule}");
        }
    }
    Ok(())
}
