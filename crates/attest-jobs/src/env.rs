//! Shared environment handed to every task: database, external
//! collaborators, and job settings.

use std::sync::Arc;
use std::time::Duration;

use attest_config::AttestConfig;
use attest_db::service::AttestService;
use attest_providers::{
    CloudScanner, EmailSender, HttpCloudScanner, HttpEmailSender, HttpVectorStore, VectorStore,
};

use crate::error::JobError;
use crate::retry::RetryPolicy;

/// Retry and duration limits declared by a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOptions {
    pub retry: RetryPolicy,
    pub max_duration: Duration,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_duration: Duration::from_secs(300),
        }
    }
}

/// Batch sizes and pacing, resolved from configuration.
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub scan_batch_size: usize,
    pub sync_batch_size: usize,
    pub answer_batch_size: usize,
    pub email_batch_size: usize,
    pub email_interval: Duration,
    /// Limits for workers and for tasks that call providers directly.
    pub task: TaskOptions,
    /// Limits for orchestrators, which wait on their workers.
    pub orchestrator: TaskOptions,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self::from_config(&AttestConfig::default())
    }
}

impl JobSettings {
    #[must_use]
    pub fn from_config(config: &AttestConfig) -> Self {
        Self {
            scan_batch_size: config.jobs.scan_batch_size,
            sync_batch_size: config.jobs.sync_batch_size,
            answer_batch_size: config.jobs.answer_batch_size,
            email_batch_size: config.email.batch_size,
            email_interval: Duration::from_millis(config.email.batch_interval_ms),
            task: TaskOptions {
                retry: RetryPolicy::from(&config.jobs.retry),
                max_duration: Duration::from_secs(config.jobs.max_duration_secs),
            },
            orchestrator: TaskOptions {
                retry: RetryPolicy::from(&config.jobs.retry),
                max_duration: Duration::from_secs(config.jobs.orchestrator_max_duration_secs),
            },
        }
    }
}

/// Everything a task may touch. Collaborators are optional so jobs that
/// do not need a service still run when it is unconfigured.
pub struct JobEnv {
    pub service: Arc<AttestService>,
    pub scanner: Option<Arc<dyn CloudScanner>>,
    pub vectors: Option<Arc<dyn VectorStore>>,
    pub email: Option<Arc<dyn EmailSender>>,
}

impl JobEnv {
    /// Environment with no external collaborators.
    #[must_use]
    pub fn new(service: Arc<AttestService>) -> Self {
        Self {
            service,
            scanner: None,
            vectors: None,
            email: None,
        }
    }

    /// Build HTTP collaborators for every configured section.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Provider`] if an HTTP client cannot be built.
    pub fn from_config(service: Arc<AttestService>, config: &AttestConfig) -> Result<Self, JobError> {
        let mut env = Self::new(service);
        if config.scanner.is_configured() {
            env.scanner = Some(Arc::new(HttpCloudScanner::from_config(&config.scanner)?));
        }
        if config.vector.is_configured() {
            env.vectors = Some(Arc::new(HttpVectorStore::from_config(&config.vector)?));
        }
        if config.email.is_configured() {
            env.email = Some(Arc::new(HttpEmailSender::from_config(&config.email)?));
        }
        Ok(env)
    }

    #[must_use]
    pub fn with_scanner(mut self, scanner: Arc<dyn CloudScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    #[must_use]
    pub fn with_vectors(mut self, vectors: Arc<dyn VectorStore>) -> Self {
        self.vectors = Some(vectors);
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: Arc<dyn EmailSender>) -> Self {
        self.email = Some(email);
        self
    }

    /// # Errors
    ///
    /// Returns [`JobError::NotConfigured`] when no scanner is set.
    pub fn scanner(&self) -> Result<&Arc<dyn CloudScanner>, JobError> {
        self.scanner
            .as_ref()
            .ok_or_else(|| JobError::NotConfigured("scanner.url".into()))
    }

    /// # Errors
    ///
    /// Returns [`JobError::NotConfigured`] when no vector store is set.
    pub fn vectors(&self) -> Result<&Arc<dyn VectorStore>, JobError> {
        self.vectors
            .as_ref()
            .ok_or_else(|| JobError::NotConfigured("vector.url, vector.token".into()))
    }
}
