//! Progress bars that mirror a run's metadata while it executes.

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde_json::Value;

use attest_core::enums::RunStatus;
use attest_db::repos::job_run::JobRunFilter;
use attest_db::service::AttestService;

use crate::ui;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct Progress {
    bar: Option<ProgressBar>,
}

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(MultiProgress::new)
}

fn bar_template() -> &'static str {
    match ui::prefs().term_width {
        Some(cols) if cols >= 110 => "{bar:40.cyan/blue} {pos}/{len} {msg}",
        Some(cols) if cols >= 80 => "{wide_bar:.cyan/blue} {pos}/{len} {msg}",
        _ => "{wide_bar:.cyan/blue} {percent}% {msg}",
    }
}

impl Progress {
    /// Spinner that turns into a bar once the run reports a total.
    #[must_use]
    pub fn spinner(message: &str) -> Self {
        if !ui::prefs().progress {
            return Self { bar: None };
        }

        let bar = multi_progress().add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        Self { bar: Some(bar) }
    }

    /// Apply a metadata snapshot: `total` sets the length, `completed` plus
    /// `failed` the position.
    pub fn update(&self, metadata: &Value) {
        let Some(bar) = &self.bar else {
            return;
        };
        let Some(snapshot) = Snapshot::from_metadata(metadata) else {
            return;
        };
        if bar.length() != Some(snapshot.total) {
            bar.set_style(
                ProgressStyle::with_template(bar_template())
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar.set_length(snapshot.total);
        }
        bar.set_position(snapshot.done());
        bar.set_message(snapshot.message());
    }

    pub fn finish_ok(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.to_string());
        }
    }

    pub fn finish_err(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.abandon_with_message(message.to_string());
        }
    }

    const fn is_visible(&self) -> bool {
        self.bar.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snapshot {
    total: u64,
    completed: u64,
    failed: u64,
    batch: Option<(u64, u64)>,
}

impl Snapshot {
    fn from_metadata(metadata: &Value) -> Option<Self> {
        let field = |key: &str| metadata.get(key).and_then(Value::as_u64);
        let batch = field("current_batch").zip(field("total_batches"));
        Some(Self {
            total: field("total")?,
            completed: field("completed").unwrap_or(0),
            failed: field("failed").unwrap_or(0),
            batch,
        })
    }

    const fn done(&self) -> u64 {
        self.completed + self.failed
    }

    fn message(&self) -> String {
        match self.batch {
            Some((current, total)) if total > 0 => {
                format!("batch {current}/{total}, {} failed", self.failed)
            }
            _ => format!("{} failed", self.failed),
        }
    }
}

/// Drive `run` to completion while polling the newest running `task_id`
/// row and mirroring its metadata into a progress bar.
pub async fn watch<F, T, E>(
    service: &AttestService,
    task_id: &str,
    run: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let progress = Progress::spinner(task_id);
    if !progress.is_visible() {
        return run.await;
    }

    let filter = JobRunFilter {
        task_id: Some(task_id.to_string()),
        status: Some(RunStatus::Running),
        limit: Some(1),
        ..Default::default()
    };
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            _ = ticker.tick() => {
                match service.list_job_runs(&filter).await {
                    Ok(runs) => {
                        if let Some(metadata) = runs.first().and_then(|r| r.metadata.as_ref()) {
                            progress.update(metadata);
                        }
                    }
                    Err(error) => tracing::debug!(%error, "progress poll failed"),
                }
            }
        }
    };

    if result.is_ok() {
        progress.finish_ok(&format!("{task_id} finished"));
    } else {
        progress.finish_err(&format!("{task_id} failed"));
    }
    result
}
