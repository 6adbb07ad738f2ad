mod run;
mod runs;

pub use run::RunCommands;
pub use runs::RunsCommands;
