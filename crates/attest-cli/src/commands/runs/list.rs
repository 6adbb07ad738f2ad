use serde::Serialize;

use attest_core::entities::JobRun;
use attest_core::enums::RunStatus;
use attest_db::repos::job_run::JobRunFilter;

use crate::cli::GlobalFlags;
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct RunListResponse {
    runs: Vec<RunRow>,
}

/// Table-friendly view of a run: metadata and output are left to `runs get`.
#[derive(Debug, Serialize)]
struct RunRow {
    id: String,
    task_id: String,
    status: RunStatus,
    attempts: i64,
    progress: String,
    started_at: String,
    error: Option<String>,
}

impl From<JobRun> for RunRow {
    fn from(run: JobRun) -> Self {
        Self {
            progress: progress_label(run.metadata.as_ref()),
            id: run.id,
            task_id: run.task_id,
            status: run.status,
            attempts: run.attempts,
            started_at: run.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            error: run.error,
        }
    }
}

/// `completed+failed/total`, or `-` when the run reported no total.
fn progress_label(metadata: Option<&serde_json::Value>) -> String {
    let Some(meta) = metadata else {
        return String::from("-");
    };
    let field = |key: &str| meta.get(key).and_then(serde_json::Value::as_u64);
    match field("total") {
        Some(total) => {
            let done = field("completed").unwrap_or(0) + field("failed").unwrap_or(0);
            format!("{done}/{total}")
        }
        None => String::from("-"),
    }
}

pub async fn run(
    task: Option<&str>,
    status: Option<&str>,
    parent: Option<&str>,
    limit: Option<u32>,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let filter = JobRunFilter {
        task_id: task.map(str::to_string),
        parent_run_id: parent.map(str::to_string),
        status: status
            .map(|s| parse_enum::<RunStatus>(s, "status"))
            .transpose()?,
        limit: Some(effective_limit(limit, flags.limit, 20)),
    };
    let runs = ctx.service.list_job_runs(&filter).await?;
    output(
        &RunListResponse {
            runs: runs.into_iter().map(RunRow::from).collect(),
        },
        flags.format,
    )
}
