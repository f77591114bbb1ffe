//! Declarative commands for chprov
//!
//! - `status` - Show declared databases next to the server state
//! - `diff` - Preview what apply would change
//! - `apply` - Make the server match the config

use anyhow::{Result, bail};
use chdb::{
    AutoConfirm, Change, ConfirmCallback, DiffSummary, Ensure, ExecuteOptions, ExecuteSummary,
    Observed, ReconciledResource, ResourceDiff, VerifyMode, compute_diffs, execute,
};
use colored::Colorize;

use super::{load, prefetch};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::progress::ApplyProgress;
use crate::ui;

// ============================================================================
// Status Command
// ============================================================================

pub fn status(ctx: &Context, target: Option<&str>) -> Result<()> {
    ui::header("Database Status");

    let (config, client) = load(ctx)?;
    let pass = prefetch(&config, &client, target)?;

    if pass.is_empty() {
        ui::info("No databases declared");
        return Ok(());
    }

    let mut drifted = 0;
    for resource in pass.resources() {
        let diff = ResourceDiff::from_resource(resource);
        if diff.is_some() {
            drifted += 1;
        }
        show_resource(resource, diff.as_ref());
    }

    let undeclared: Vec<_> = pass.undeclared().collect();
    if !undeclared.is_empty() {
        println!();
        ui::kv("Not managed", &undeclared.len().to_string());
        if ctx.verbose > 0 {
            for db in undeclared {
                ui::dim(&format!("{} ({})", db.name, db.engine));
            }
        }
    }

    println!();
    if drifted == 0 {
        ui::success(&format!("All {} databases in sync", pass.len()));
    } else {
        ui::warn(&format!(
            "{drifted} of {} databases differ; run `chprov diff` for details",
            pass.len()
        ));
    }

    Ok(())
}

fn show_resource(resource: &ReconciledResource, diff: Option<&ResourceDiff>) {
    let symbol = diff.map_or_else(|| "✓".green(), |d| change_symbol(&d.change));
    let decl = resource.declaration();

    let declared = match decl.ensure() {
        Ensure::Present => decl.spec().redacted_clause(),
        Ensure::Absent => "absent".to_string(),
    };

    println!(
        "  {} {:<30} {} {}",
        symbol,
        decl.name(),
        declared,
        format!("(server: {})", describe_observed(resource.observed())).dimmed()
    );
}

fn describe_observed(observed: &Observed) -> String {
    match observed {
        Observed::Absent => "absent".to_string(),
        Observed::Present { engine, tables } => {
            format!("{engine}, {}", ui::plural(*tables, "table"))
        }
    }
}

fn change_symbol(change: &Change) -> colored::ColoredString {
    match change {
        Change::Create { .. } => "+".green(),
        Change::Destroy => "-".red(),
        Change::ChangeEngine { .. } => "~".yellow(),
    }
}

// ============================================================================
// Diff Command
// ============================================================================

pub fn diff(ctx: &Context, target: Option<&str>) -> Result<()> {
    let (config, client) = load(ctx)?;
    let pass = prefetch(&config, &client, target)?;

    display_diff(&compute_diffs(&pass));
    Ok(())
}

/// Display a list of diffs in a box
fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Database Diff".bold()
    );
    println!("│");

    for diff in diffs {
        let state_desc = match &diff.change {
            Change::Create { engine } => format!("(absent) → {engine}"),
            Change::Destroy => format!("(will drop, {})", ui::plural(diff.tables, "table")),
            Change::ChangeEngine { from, to } => {
                format!("{from} → {to} (drop and recreate)")
            }
        };

        let blocked = if diff.blocked {
            " [needs force]".red().to_string()
        } else {
            String::new()
        };

        println!(
            "│   {} {:<30} {}{}",
            change_symbol(&diff.change),
            diff.name,
            state_desc.dimmed(),
            blocked
        );
    }
    println!("│");

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} create, {} drop, {} recreate)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.removals.to_string().red(),
        summary.modifications.to_string().yellow()
    );
    if summary.blocked > 0 {
        println!(
            "│ {} {} will be refused: databases with tables need `force = true`",
            "⚠".yellow(),
            summary.blocked
        );
    }
    println!("└─────────────────────────────────────────────────────┘");
}

// ============================================================================
// Apply Command
// ============================================================================

/// Asks on the terminal before the pass mutates anything
struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or_else(|e| {
                log::warn!("Could not show confirmation prompt: {e}");
                false
            })
    }
}

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    ui::header("Applying Databases");

    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let (config, client) = load(ctx)?;
    let mut pass = prefetch(&config, &client, args.target.as_deref())?;

    let diffs = compute_diffs(&pass);
    display_diff(&diffs);
    if diffs.is_empty() {
        return Ok(());
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: args.jobs.max(1),
        verify: if args.rediscover {
            VerifyMode::Rediscover
        } else {
            VerifyMode::TrustLocal
        },
    };

    println!();
    let mut progress = ApplyProgress::new(ctx.quiet);
    let summary = if args.yes {
        execute(&client, &mut pass, &opts, &mut progress, &mut AutoConfirm)?
    } else {
        execute(&client, &mut pass, &opts, &mut progress, &mut PromptConfirm)?
    };

    if args.dry_run {
        ui::info("Dry run - no changes made");
        return Ok(());
    }

    if summary.total_changes() == 0 && summary.failed == 0 {
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    print_summary(&summary, progress.failures());

    if !summary.is_success() {
        bail!("{} of {} changes failed", summary.failed, diffs.len());
    }
    Ok(())
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary, failures: &[(String, String)]) {
    println!();
    if summary.is_success() {
        println!("  {} Databases converged", "✓".green().bold());
    } else {
        println!("  {} Applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} recreated", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} dropped", summary.removed);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
        for (name, error) in failures {
            println!("      {} {name}: {error}", "✗".red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_observed() {
        assert_eq!(describe_observed(&Observed::Absent), "absent");
        assert_eq!(
            describe_observed(&Observed::Present {
                engine: "Atomic".into(),
                tables: 1
            }),
            "Atomic, 1 table"
        );
    }
}
