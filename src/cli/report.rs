//! Report generation commands

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::Tabled;

use crate::cli::{CommandContext, OutputFormat, ReportCommands};
use crate::error::Result;
use crate::output::{format_json, format_table};
use crate::skills::{SkillReport, cost, inventory, network};

#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "PRIORITY")]
    priority: String,
    #[tabled(rename = "CATEGORY")]
    category: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "ACTION")]
    action: String,
}

/// Dispatch a report subcommand.
pub async fn run(ctx: &CommandContext, command: ReportCommands) -> Result<()> {
    let mut executor = ctx.skill_executor();

    // A progress bar only makes sense for a human-facing terminal format.
    let bar = if ctx.format == OutputFormat::Pretty {
        let bar = ProgressBar::new(100);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:30.cyan/dim} {pos:>3}% {msg}")
        {
            bar.set_style(style);
        }
        executor = executor.with_progress(bar.clone());
        Some(bar)
    } else {
        None
    };

    let report = match command {
        ReportCommands::Cost {
            window,
            anomaly_threshold,
        } => {
            cost::generate_cost_report(
                &executor,
                Some(&ctx.store),
                ctx.tenancy_id(),
                &window,
                anomaly_threshold,
            )
            .await
        }
        ReportCommands::Inventory { compartment } => {
            inventory::generate_inventory_report(&executor, &ctx.store, compartment.as_deref())
                .await
        }
        ReportCommands::Network => {
            // Network findings reference snapshot entities; make sure the
            // indices exist before enrichment.
            if let Err(e) = ctx
                .store
                .refresh(false, ctx.max_snapshot_age_minutes())
                .await
            {
                log::warn!("Proceeding without snapshot enrichment: {}", e);
            }
            network::generate_network_report(&executor, Some(&ctx.store), ctx.tenancy_id()).await
        }
    };

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let stats = ctx.cache.stats();
    log::debug!(
        "Response cache after report: {} entries ({} valid, {} bytes)",
        stats.total_entries(),
        stats.valid_entries(),
        stats.total_size_bytes()
    );

    render(&report, ctx.format)
}

fn render(report: &SkillReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", format_json(report)?);
            return Ok(());
        }
        OutputFormat::Pretty => {
            println!("{}\n", report.executive_summary.bold());

            for (name, section) in &report.sections {
                match section {
                    crate::skills::SectionOutcome::Ok { .. } => {
                        println!("{} {}", "✓".green(), name);
                    }
                    crate::skills::SectionOutcome::Error { error } => {
                        println!("{} {}: {}", "✗".red(), name, error.dimmed());
                    }
                }
            }
            println!();
        }
        OutputFormat::Table => {
            println!("{}\n", report.executive_summary);
        }
    }

    let rows: Vec<RecommendationRow> = report
        .recommendations
        .iter()
        .map(|rec| RecommendationRow {
            priority: rec.priority.label().to_string(),
            category: rec.category.clone(),
            description: rec.description.clone(),
            action: rec.action.clone(),
        })
        .collect();

    if rows.is_empty() {
        println!("No recommendations.");
    } else {
        println!("{}", format_table(&rows));
    }

    Ok(())
}
