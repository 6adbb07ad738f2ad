use anyhow::Context;
use attest_jobs::jobs::DeleteAnswersInput;
use attest_jobs::{ScheduledRun, Task};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::RunCommands;
use crate::context::AppContext;
use crate::output::output;
use crate::progress::watch;

/// Handle `attest run`.
pub async fn handle(action: &RunCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        RunCommands::CloudScan => {
            trigger(ctx, flags, ctx.jobs.cloud_scan.as_ref(), ScheduledRun::now()).await
        }
        RunCommands::PolicyReview => {
            trigger(ctx, flags, ctx.jobs.policy_review.as_ref(), ScheduledRun::now()).await
        }
        RunCommands::EmployeeSync => {
            trigger(ctx, flags, ctx.jobs.employee_sync.as_ref(), ScheduledRun::now()).await
        }
        RunCommands::DeleteAnswers { org, ids } => {
            let input = DeleteAnswersInput {
                organization_id: org.clone(),
                manual_answer_ids: (!ids.is_empty()).then(|| ids.clone()),
            };
            trigger(ctx, flags, ctx.jobs.delete_answers.as_ref(), input).await
        }
    }
}

async fn trigger<T>(
    ctx: &AppContext,
    flags: &GlobalFlags,
    task: &T,
    input: T::Input,
) -> anyhow::Result<()>
where
    T: Task,
{
    let report = watch(&ctx.service, task.id(), ctx.runner.trigger(task, input))
        .await
        .with_context(|| format!("{} failed", task.id()))?;
    output(&report, flags.format)
}
