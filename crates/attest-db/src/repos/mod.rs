//! Repository modules. Each adds methods to `AttestService` via `impl AttestService` blocks.

pub mod check_run;
pub mod connection;
pub mod job_run;
pub mod manual_answer;
pub mod member;
pub mod organization;
pub mod policy;
