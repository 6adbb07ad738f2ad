use anyhow::Context;
use serde::Serialize;

use attest_core::entities::JobRun;
use attest_db::repos::job_run::JobRunFilter;

use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::commands::shared::limit::MAX_LIMIT;
use crate::output::output;

#[derive(Debug, Serialize)]
struct RunDetail {
    #[serde(flatten)]
    run: JobRun,
    children: Vec<ChildSummary>,
}

#[derive(Debug, Serialize)]
struct ChildSummary {
    id: String,
    task_id: String,
    status: String,
    attempts: i64,
}

pub async fn run(id: &str, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let run = ctx
        .service
        .get_job_run(id)
        .await
        .with_context(|| format!("run '{id}' not found"))?;
    let children = ctx
        .service
        .list_job_runs(&JobRunFilter {
            parent_run_id: Some(id.to_string()),
            limit: Some(MAX_LIMIT),
            ..Default::default()
        })
        .await?
        .into_iter()
        .map(|child| ChildSummary {
            id: child.id,
            task_id: child.task_id,
            status: child.status.to_string(),
            attempts: child.attempts,
        })
        .collect();

    output(&RunDetail { run, children }, flags.format)
}
