use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ScheduleEntry {
    task_id: &'static str,
    every_secs: u64,
}

/// Handle `attest schedule`: run until ctrl-c.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let scheduler = ctx.jobs.scheduler(&ctx.runner, &ctx.config.schedules);

    if !flags.quiet {
        let entries = scheduler
            .entries()
            .into_iter()
            .map(|(task_id, every)| ScheduleEntry {
                task_id,
                every_secs: every.as_secs(),
            })
            .collect::<Vec<_>>();
        output(&entries, flags.format)?;
    }

    scheduler.run().await;
    tracing::info!("scheduler stopped");
    Ok(())
}
