//! `glsync sync` - migrate a Jira CSV export into GitLab

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::args::GlobalOpts;
use crate::core::{read_export, Config};
use crate::gitlab::GitLabClient;
use crate::sync::{SyncEngine, SyncOptions, SyncReport};

#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    /// Jira CSV export to migrate
    pub file: PathBuf,

    /// Parse and plan without calling the GitLab API
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: SyncArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load(global.config.as_deref()).map_err(|e| miette::miette!("{}", e))?;
    config
        .require_master_project()
        .map_err(|e| miette::miette!("{}", e))?;
    // The token is only needed once we actually call the API
    let token = if args.dry_run {
        config.token.clone().unwrap_or_default()
    } else {
        config
            .require_token()
            .map_err(|e| miette::miette!("{}", e))?
            .to_string()
    };

    if !args.file.exists() {
        return Err(miette::miette!("File not found: {}", args.file.display()));
    }

    let records =
        read_export(&args.file, config.related_column()).map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Read {} record(s) from {}{}",
            style("→").blue(),
            style(records.len()).cyan(),
            style(args.file.display()).yellow(),
            if args.dry_run {
                style(" (dry run)").dim().to_string()
            } else {
                String::new()
            }
        );
    }

    let client = GitLabClient::new(config.api_url(), token);
    let options = SyncOptions {
        dry_run: args.dry_run,
        quiet: global.quiet,
        verbose: global.verbose,
    };
    let engine =
        SyncEngine::new(&config, &client, options).map_err(|e| miette::miette!("{}", e))?;
    let report = engine.run(&records);

    print_summary(&report, args.dry_run);

    // Partial failures are warnings, not a distinct exit code: this is a
    // one-shot operator tool and the console transcript is the report
    Ok(())
}

fn print_summary(report: &SyncReport, dry_run: bool) {
    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Sync Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Records processed: {}", style(report.records).cyan());
    println!(
        "  Master issues:     {} created, {} failed",
        style(report.masters_created).green(),
        if report.masters_failed > 0 {
            style(report.masters_failed).red()
        } else {
            style(report.masters_failed).dim()
        }
    );
    println!(
        "  Child issues:      {} created, {} failed",
        style(report.children_created).green(),
        if report.children_failed > 0 {
            style(report.children_failed).red()
        } else {
            style(report.children_failed).dim()
        }
    );
    println!("  Links created:     {}", style(report.links_created).green());
    if report.identities_skipped > 0 {
        println!(
            "  Identities skipped: {}",
            style(report.identities_skipped).yellow()
        );
    }
    if report.warnings > 0 {
        println!("  Warnings:          {}", style(report.warnings).yellow());
    }

    if dry_run {
        println!();
        println!(
            "{}",
            style("Dry run complete. No issues were created.").yellow()
        );
    }
}
