//! # attest-core
//!
//! Core types, ID prefixes, and provider manifests for Attest.
//!
//! This crate provides the foundational types shared across all Attest crates:
//! - Entity structs for the records the job layer touches (connections,
//!   check runs, manual answers, policies, members, job runs)
//! - Status enums with state machine transitions
//! - ID prefix constants
//! - Provider manifests and their capability flags
//! - Review-date arithmetic for policy cadences
//! - Secret redaction for user-facing error strings
//!
//! Error types live with the crates that raise them (`ConfigError`,
//! `DatabaseError`, `ProviderError`, `JobError`).

pub mod entities;
pub mod enums;
pub mod ids;
pub mod manifest;
pub mod redact;
pub mod review;
