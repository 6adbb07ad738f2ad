use clap::Subcommand;

/// Job run inspection.
#[derive(Clone, Debug, Subcommand)]
pub enum RunsCommands {
    /// List runs, newest first.
    List {
        #[arg(long)]
        task: Option<String>,
        /// running, completed or failed
        #[arg(long)]
        status: Option<String>,
        /// Only children of this run.
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Get a run with its progress metadata and child runs.
    Get { id: String },
}
