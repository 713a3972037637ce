//! `glsync purge` - delete every issue in the configured projects
//!
//! Destructive maintenance mode. Gated behind an interactive confirmation:
//! only a literal `y` proceeds, anything else aborts before any API call.

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::args::GlobalOpts;
use crate::core::Config;
use crate::gitlab::{list_all_issues, GitLabClient, Tracker};

#[derive(clap::Args, Debug)]
pub struct PurgeArgs {
    /// Limit deletion to these project ids (default: master project plus
    /// every mapped team project)
    #[arg(long = "project", value_name = "ID")]
    pub projects: Vec<u64>,
}

pub fn run(args: PurgeArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load(global.config.as_deref()).map_err(|e| miette::miette!("{}", e))?;

    let targets: Vec<u64> = if args.projects.is_empty() {
        let master = config
            .require_master_project()
            .map_err(|e| miette::miette!("{}", e))?;
        let mut targets = vec![master];
        for &project in config.teams.values() {
            if !targets.contains(&project) {
                targets.push(project);
            }
        }
        targets
    } else {
        args.projects.clone()
    };

    println!(
        "{} This will permanently delete every issue in {} project(s):",
        style("!").red().bold(),
        targets.len()
    );
    for project in &targets {
        println!("    {project}");
    }

    print!("Proceed? [y/N] ");
    std::io::Write::flush(&mut std::io::stdout()).into_diagnostic()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input).into_diagnostic()?;
    if !input.trim().eq_ignore_ascii_case("y") {
        println!("Aborted.");
        return Ok(());
    }

    let token = config
        .require_token()
        .map_err(|e| miette::miette!("{}", e))?;
    let client = GitLabClient::new(config.api_url(), token);

    let mut deleted = 0_usize;
    let mut failed = 0_usize;
    for &project in &targets {
        let issues = match list_all_issues(&client, project) {
            Ok(issues) => issues,
            Err(err) => {
                eprintln!(
                    "{} Could not list issues in project {project}: {err}",
                    style("⚠").yellow()
                );
                failed += 1;
                continue;
            }
        };
        if !global.quiet {
            println!(
                "{} Project {}: {} issue(s) to delete",
                style("→").blue(),
                project,
                issues.len()
            );
        }
        for issue in issues {
            match client.delete_issue(project, issue.iid) {
                Ok(()) => {
                    deleted += 1;
                    if global.verbose {
                        println!("  {} Deleted #{} {}", style("✓").green(), issue.iid, issue.title);
                    }
                }
                Err(err) => {
                    // Best-effort: keep going past individual failures
                    eprintln!(
                        "{} Delete failed for project {} issue #{}: {err}",
                        style("⚠").yellow(),
                        project,
                        issue.iid
                    );
                    failed += 1;
                }
            }
        }
    }

    println!();
    println!(
        "{} Purge complete: {} deleted, {} failed",
        style("✓").green(),
        style(deleted).green(),
        if failed > 0 {
            style(failed).red()
        } else {
            style(failed).dim()
        }
    );
    Ok(())
}
