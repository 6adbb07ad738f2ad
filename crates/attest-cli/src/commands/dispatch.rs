use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Run { action } => commands::run::handle(&action, ctx, flags).await,
        Commands::Schedule => commands::schedule::handle(ctx, flags).await,
        Commands::Runs { action } => commands::runs::handle(&action, ctx, flags).await,
        Commands::Jobs => commands::jobs::handle(ctx, flags),
        Commands::Providers => commands::providers::handle(flags),
    }
}
