use clap::Subcommand;

/// Jobs that can be triggered by hand.
#[derive(Clone, Debug, Subcommand)]
pub enum RunCommands {
    /// Scan every active cloud connection.
    CloudScan,
    /// Flag overdue policies and notify their owners.
    PolicyReview,
    /// Sync employee directories into members.
    EmployeeSync,
    /// Delete manual answers and their vectors.
    DeleteAnswers {
        /// Organization the answers belong to.
        #[arg(long)]
        org: String,
        /// Answer ids, comma separated. All answers of the organization when omitted.
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,
    },
}
