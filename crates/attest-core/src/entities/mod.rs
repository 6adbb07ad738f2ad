//! Entity structs for the records the job layer reads and writes.
//!
//! Each entity maps to a table in the libSQL database (see
//! `attest-db/migrations/001_initial.sql`). Every record except `JobRun`
//! belongs to exactly one organization.

mod check_run;
mod connection;
mod job_run;
mod manual_answer;
mod member;
mod organization;
mod policy;

pub use check_run::CheckRun;
pub use connection::Connection;
pub use job_run::JobRun;
pub use manual_answer::ManualAnswer;
pub use member::{Employee, Member};
pub use organization::Organization;
pub use policy::Policy;
