pub mod dispatch;
pub mod jobs;
pub mod providers;
pub mod run;
pub mod runs;
pub mod schedule;
pub mod shared;
