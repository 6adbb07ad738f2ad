use clap::Subcommand;

use crate::cli::subcommands::{RunCommands, RunsCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Trigger a job now and wait for it to finish.
    Run {
        #[command(subcommand)]
        action: RunCommands,
    },
    /// Run interval schedules until ctrl-c.
    Schedule,
    /// Inspect recorded job runs.
    Runs {
        #[command(subcommand)]
        action: RunsCommands,
    },
    /// Registered jobs with retry policy and schedule.
    Jobs,
    /// Provider manifests and capabilities.
    Providers,
}
