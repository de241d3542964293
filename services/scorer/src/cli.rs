use crate::runner::{run_active_permits, run_score, run_sync, run_weekly_summary};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use row_priority::error::AppError;
use row_priority::workflows::publication::PublishMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "row-priority",
    about = "Score right-of-way permits for inspection and publish the ranked table",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score permits and publish the priority table (default command)
    Score(ScoreArgs),
    /// Copy a registered extract from the blob store to its open-data dataset
    SyncDataset(SyncArgs),
    /// Upsert today's active permit counts into the rolling log (ACTIVE_DATASET)
    LogActivePermits(SummaryArgs),
    /// Replace the weekly permit activity summary (WEEK_DATASET)
    WeeklySummary(SummaryArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ScoreArgs {
    /// Publish mode, overriding PUBLISH_MODE (upsert or replace)
    #[arg(long, value_parser = crate::infra::parse_mode)]
    pub(crate) mode: Option<PublishMode>,
    /// Reference time for the recent inspection score. Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_now)]
    pub(crate) now: Option<NaiveDateTime>,
    /// Write the payload to this file instead of publishing it
    #[arg(long)]
    pub(crate) dry_run: Option<PathBuf>,
    /// Number of ranked permits to print
    #[arg(long, default_value_t = 10)]
    pub(crate) preview: usize,
}

#[derive(Args, Debug)]
pub(crate) struct SyncArgs {
    /// Registered dataset name, e.g. lde_site_plan_reviews
    #[arg(long)]
    pub(crate) dataset: String,
    /// Write the payload to this file instead of publishing it
    #[arg(long)]
    pub(crate) dry_run: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SummaryArgs {
    /// Write the payload to this file instead of publishing it
    #[arg(long)]
    pub(crate) dry_run: Option<PathBuf>,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or_else(|| {
        Command::Score(ScoreArgs {
            preview: 10,
            ..ScoreArgs::default()
        })
    });

    match command {
        Command::Score(args) => run_score(args),
        Command::SyncDataset(args) => run_sync(args),
        Command::LogActivePermits(args) => run_active_permits(args),
        Command::WeeklySummary(args) => run_weekly_summary(args),
    }
}
