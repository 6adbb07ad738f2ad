//! # attest-providers
//!
//! External services the background jobs talk to, each behind a trait so
//! jobs can run against in-memory doubles in tests:
//! - [`CloudScanner`]: runs a cloud-security scan for one connection
//! - [`VectorStore`]: removes embeddings from the vector index
//! - [`EmailSender`]: transactional email delivery
//! - [`EmployeeDirectory`]: lists employees from an identity or HR provider
//!
//! The HTTP implementations share one response check ([`http::check_response`]):
//! 429 maps to [`ProviderError::RateLimited`], any other non-success status
//! to [`ProviderError::Api`].

pub mod directory;
pub mod email;
mod error;
pub mod http;
pub mod scanner;
pub mod vector;

pub use directory::{EmployeeDirectory, GoogleWorkspaceDirectory, RipplingDirectory};
pub use email::{EmailMessage, EmailSender, HttpEmailSender};
pub use error::ProviderError;
pub use scanner::{CheckResult, CloudScanner, HttpCloudScanner, ScanReport, ScanRequest};
pub use vector::{HttpVectorStore, VectorStore};
