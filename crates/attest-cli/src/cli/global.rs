use clap::ValueEnum;

/// How command results are written to stdout.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    Json,
    /// Aligned rows for a reader at a terminal.
    Table,
    /// Compact JSON on one line, for piping into other tools.
    Raw,
}

/// Crates whose debug output `--verbose` turns on. Dependencies such as
/// libsql and reqwest stay at `info`.
const ATTEST_CRATES: [&str; 6] = [
    "attest_cli",
    "attest_config",
    "attest_core",
    "attest_db",
    "attest_jobs",
    "attest_providers",
];

/// Flags accepted before or after any subcommand.
#[derive(Clone, Debug)]
pub struct GlobalFlags {
    pub format: OutputFormat,
    pub limit: Option<u32>,
    pub quiet: bool,
    pub verbose: bool,
    /// Overrides `database.path`.
    pub database: Option<String>,
}

impl GlobalFlags {
    /// `tracing` filter used when `ATTEST_LOG` is unset. `--quiet` wins
    /// over `--verbose`.
    #[must_use]
    pub fn log_directive(&self) -> String {
        if self.quiet {
            return "error".to_string();
        }
        if !self.verbose {
            return "warn".to_string();
        }
        std::iter::once("info".to_string())
            .chain(ATTEST_CRATES.iter().map(|krate| format!("{krate}=debug")))
            .collect::<Vec<_>>()
            .join(",")
    }
}
