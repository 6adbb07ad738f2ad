use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

/// Handle `attest jobs`.
pub fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    output(&ctx.jobs.describe(&ctx.config.schedules), flags.format)
}
