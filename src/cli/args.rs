//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{purge::PurgeArgs, sync::SyncArgs};

#[derive(Parser)]
#[command(name = "glsync")]
#[command(author, version, about = "Migrate Jira CSV exports into GitLab issues")]
#[command(
    long_about = "A one-shot migration tool: reads a Jira CSV export and replays it into \
GitLab, creating a master issue per record in the primary project and linked child issues \
in per-team projects, carrying over labels, assignees, milestones and time tracking."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Config file (default: ./glsync.yaml, then ~/.config/glsync/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress per-record progress output (warnings still print)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Print every remote call outcome, including advisory successes
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Migrate a Jira CSV export into GitLab (master + linked child issues)
    Sync(SyncArgs),

    /// Delete every issue in the configured projects (destructive, confirmation-gated)
    Purge(PurgeArgs),
}
