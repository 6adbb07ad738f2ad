mod get;
mod list;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::RunsCommands;
use crate::context::AppContext;

/// Handle `attest runs`.
pub async fn handle(action: &RunsCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        RunsCommands::List {
            task,
            status,
            parent,
            limit,
        } => {
            list::run(
                task.as_deref(),
                status.as_deref(),
                parent.as_deref(),
                *limit,
                ctx,
                flags,
            )
            .await
        }
        RunsCommands::Get { id } => get::run(id, ctx, flags).await,
    }
}
