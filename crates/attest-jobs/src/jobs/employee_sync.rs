//! Employee directory sync.
//!
//! Connections are dispatched to a handler chosen by provider slug. A
//! handler owns the whole sync for one connection: fetch, upsert, deactivate
//! whoever left, stamp `last_synced_at`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use attest_config::DirectoryConfig;
use attest_core::entities::Connection;
use attest_core::manifest::{Capability, providers_with};
use attest_db::error::DatabaseError;
use attest_db::repos::member::normalize_email;
use attest_db::service::AttestService;
use attest_providers::{EmployeeDirectory, GoogleWorkspaceDirectory, RipplingDirectory};

use crate::batch::{BatchSummary, ItemResult, fan_out};
use crate::env::{JobSettings, TaskOptions};
use crate::error::JobError;
use crate::jobs::EMPLOYEE_SYNC;
use crate::retry::RetryPolicy;
use crate::scheduler::ScheduledRun;
use crate::task::{Task, TaskContext};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub deactivated: u64,
    /// Records the member table rejected.
    pub skipped: usize,
}

#[async_trait]
pub trait SyncHandler: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn sync(
        &self,
        service: &AttestService,
        connection: &Connection,
    ) -> Result<SyncStats, JobError>;
}

/// Sync handler backed by an [`EmployeeDirectory`].
pub struct DirectorySyncHandler {
    directory: Arc<dyn EmployeeDirectory>,
}

impl DirectorySyncHandler {
    #[must_use]
    pub fn new(directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl SyncHandler for DirectorySyncHandler {
    fn provider(&self) -> &'static str {
        self.directory.provider()
    }

    async fn sync(
        &self,
        service: &AttestService,
        connection: &Connection,
    ) -> Result<SyncStats, JobError> {
        let employees = self.directory.list_employees(connection).await?;
        let mut stats = SyncStats {
            fetched: employees.len(),
            ..Default::default()
        };

        let mut present = Vec::with_capacity(employees.len());
        for employee in &employees {
            match service
                .upsert_member(&connection.organization_id, &connection.id, employee)
                .await
            {
                Ok(upsert) => {
                    if upsert.created {
                        stats.created += 1;
                    } else {
                        stats.updated += 1;
                    }
                    present.push(normalize_email(&employee.email));
                }
                Err(DatabaseError::InvalidState(reason)) => {
                    tracing::debug!(connection_id = %connection.id, %reason, "skipping employee");
                    stats.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        stats.deactivated = service
            .deactivate_missing_members(&connection.organization_id, &connection.id, &present)
            .await?;
        service.mark_connection_synced(&connection.id, Utc::now()).await?;
        Ok(stats)
    }
}

/// Handlers keyed by provider slug.
#[derive(Clone, Default)]
pub struct SyncHandlers {
    handlers: HashMap<&'static str, Arc<dyn SyncHandler>>,
}

impl SyncHandlers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register directory handlers for every provider when a directory
    /// token is configured. Without one the registry stays empty.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Provider`] if an HTTP client cannot be built.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, JobError> {
        if !config.is_configured() {
            return Ok(Self::new());
        }
        let google: Arc<dyn EmployeeDirectory> = Arc::new(GoogleWorkspaceDirectory::from_config(config)?);
        let rippling: Arc<dyn EmployeeDirectory> = Arc::new(RipplingDirectory::from_config(config)?);
        Ok(Self::new()
            .with(Arc::new(DirectorySyncHandler::new(google)))
            .with(Arc::new(DirectorySyncHandler::new(rippling))))
    }

    /// Add `handler`, replacing any handler for the same provider.
    #[must_use]
    pub fn with(mut self, handler: Arc<dyn SyncHandler>) -> Self {
        self.handlers.insert(handler.provider(), handler);
        self
    }

    #[must_use]
    pub fn get(&self, provider: &str) -> Option<&Arc<dyn SyncHandler>> {
        self.handlers.get(provider)
    }

    /// Registered slugs, sorted.
    #[must_use]
    pub fn providers(&self) -> Vec<&'static str> {
        let mut slugs: Vec<_> = self.handlers.keys().copied().collect();
        slugs.sort_unstable();
        slugs
    }
}

pub struct EmployeeSyncTask {
    batch_size: usize,
    options: TaskOptions,
    /// Budget for one connection's sync; the run itself has `options`.
    connection_timeout: Duration,
    handlers: SyncHandlers,
}

impl EmployeeSyncTask {
    #[must_use]
    pub fn new(settings: &JobSettings, handlers: SyncHandlers) -> Self {
        Self {
            batch_size: settings.sync_batch_size,
            options: settings.orchestrator,
            connection_timeout: settings.task.max_duration,
            handlers,
        }
    }

    #[must_use]
    pub const fn handlers(&self) -> &SyncHandlers {
        &self.handlers
    }

    async fn sync_connection(&self, ctx: &TaskContext, connection_id: String) -> ItemResult {
        let service = ctx.service();
        let connection = match service.find_connection(&connection_id).await {
            Ok(Some(connection)) => connection,
            Ok(None) => return ItemResult::failed(connection_id, "connection not found"),
            Err(e) => return ItemResult::failed(connection_id, e),
        };
        if !connection.is_active() {
            return ItemResult::failed(connection_id, "connection is inactive");
        }
        let Some(handler) = self.handlers.get(&connection.provider) else {
            return ItemResult::failed(
                connection_id,
                format!("no sync handler for provider '{}'", connection.provider),
            );
        };
        match tokio::time::timeout(self.connection_timeout, handler.sync(service, &connection)).await {
            Ok(Ok(stats)) => ItemResult::ok(connection_id, serde_json::to_value(stats).ok()),
            Ok(Err(e)) => ItemResult::failed(connection_id, e),
            Err(_) => ItemResult::failed(
                connection_id,
                format!(
                    "directory sync timed out after {}s",
                    self.connection_timeout.as_secs_f64()
                ),
            ),
        }
    }
}

#[async_trait]
impl Task for EmployeeSyncTask {
    type Input = ScheduledRun;
    type Output = BatchSummary;

    fn id(&self) -> &'static str {
        EMPLOYEE_SYNC
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.options.retry
    }

    fn max_duration(&self) -> Duration {
        self.options.max_duration
    }

    async fn run(&self, input: &ScheduledRun, ctx: &TaskContext) -> Result<BatchSummary, JobError> {
        let providers = providers_with(Capability::EmployeeSync);
        let ids: Vec<String> = ctx
            .service()
            .list_active_connections(&providers)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        tracing::debug!(connections = ids.len(), scheduled_at = %input.timestamp, "employee sync starting");

        let summary = fan_out(ids, self.batch_size, ctx, |id| self.sync_connection(ctx, id)).await?;

        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            batches = summary.batches,
            "employee sync finished"
        );
        Ok(summary)
    }
}
