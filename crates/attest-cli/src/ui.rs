//! Terminal-dependent presentation choices, resolved once at startup.

use std::io::IsTerminal;
use std::sync::OnceLock;

use crate::cli::{GlobalFlags, OutputFormat};

/// Narrower `COLUMNS` values are ignored.
const MIN_COLUMNS: usize = 40;

/// What the process can tell about where its output goes.
#[derive(Clone, Debug, Default)]
pub struct Terminal {
    pub stdout_tty: bool,
    pub stderr_tty: bool,
    pub no_color: bool,
    pub columns: Option<usize>,
}

impl Terminal {
    fn detect() -> Self {
        Self {
            stdout_tty: std::io::stdout().is_terminal(),
            stderr_tty: std::io::stderr().is_terminal(),
            no_color: std::env::var_os("NO_COLOR").is_some(),
            columns: std::env::var("COLUMNS").ok().and_then(|v| v.parse().ok()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UiPrefs {
    pub table_color: bool,
    /// Progress bars draw on stderr, so a run piped into `jq` still shows them.
    pub progress: bool,
    pub term_width: Option<usize>,
}

impl UiPrefs {
    #[must_use]
    pub fn resolve(flags: &GlobalFlags, terminal: &Terminal) -> Self {
        Self {
            table_color: terminal.stdout_tty
                && flags.format == OutputFormat::Table
                && !terminal.no_color,
            // Debug logs share stderr with the bars and would tear them.
            progress: terminal.stderr_tty && !flags.quiet && !flags.verbose,
            term_width: terminal.columns.filter(|cols| *cols >= MIN_COLUMNS),
        }
    }
}

static UI_PREFS: OnceLock<UiPrefs> = OnceLock::new();

pub fn init(flags: &GlobalFlags) {
    let _ = UI_PREFS.set(UiPrefs::resolve(flags, &Terminal::detect()));
}

/// Plain output until [`init`] runs.
#[must_use]
pub fn prefs() -> UiPrefs {
    UI_PREFS.get().copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn flags(format: OutputFormat) -> GlobalFlags {
        GlobalFlags {
            format,
            limit: None,
            quiet: false,
            verbose: false,
            database: None,
        }
    }

    fn interactive() -> Terminal {
        Terminal {
            stdout_tty: true,
            stderr_tty: true,
            no_color: false,
            columns: Some(120),
        }
    }

    #[test]
    fn piped_json_keeps_progress_on_stderr() {
        let terminal = Terminal {
            stdout_tty: false,
            ..interactive()
        };
        let prefs = UiPrefs::resolve(&flags(OutputFormat::Raw), &terminal);
        assert!(prefs.progress);
        assert!(!prefs.table_color);
    }

    #[test]
    fn colour_needs_a_table_on_a_terminal() {
        assert!(UiPrefs::resolve(&flags(OutputFormat::Table), &interactive()).table_color);
        assert!(!UiPrefs::resolve(&flags(OutputFormat::Json), &interactive()).table_color);
        let no_color = Terminal {
            no_color: true,
            ..interactive()
        };
        assert!(!UiPrefs::resolve(&flags(OutputFormat::Table), &no_color).table_color);
    }

    #[test]
    fn quiet_or_verbose_hides_progress() {
        let quiet = GlobalFlags {
            quiet: true,
            ..flags(OutputFormat::Table)
        };
        let verbose = GlobalFlags {
            verbose: true,
            ..flags(OutputFormat::Table)
        };
        assert!(!UiPrefs::resolve(&quiet, &interactive()).progress);
        assert!(!UiPrefs::resolve(&verbose, &interactive()).progress);
    }

    #[test]
    fn tiny_column_counts_are_ignored() {
        let narrow = Terminal {
            columns: Some(20),
            ..interactive()
        };
        assert_eq!(UiPrefs::resolve(&flags(OutputFormat::Table), &narrow).term_width, None);
        assert_eq!(
            UiPrefs::resolve(&flags(OutputFormat::Table), &interactive()).term_width,
            Some(120)
        );
    }
}
