//! ID prefix constants.
//!
//! IDs are `<prefix>-<8 hex chars>`, generated in SQL by `AttestDb::generate_id`.

pub const PREFIX_ORGANIZATION: &str = "org";
pub const PREFIX_CONNECTION: &str = "con";
pub const PREFIX_CHECK_RUN: &str = "chk";
pub const PREFIX_MANUAL_ANSWER: &str = "ans";
pub const PREFIX_POLICY: &str = "pol";
pub const PREFIX_MEMBER: &str = "mem";
pub const PREFIX_JOB_RUN: &str = "run";

pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_ORGANIZATION,
    PREFIX_CONNECTION,
    PREFIX_CHECK_RUN,
    PREFIX_MANUAL_ANSWER,
    PREFIX_POLICY,
    PREFIX_MEMBER,
    PREFIX_JOB_RUN,
];

/// Vector-store id under which a manual answer is mirrored.
#[must_use]
pub fn manual_answer_vector_id(answer_id: &str) -> String {
    format!("manual_answer_{answer_id}")
}
