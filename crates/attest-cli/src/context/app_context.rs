use std::sync::Arc;

use anyhow::Context;

use attest_config::AttestConfig;
use attest_db::service::AttestService;
use attest_jobs::{JobEnv, JobSettings, Jobs, SyncHandlers, TaskRunner};

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: Arc<AttestService>,
    pub config: AttestConfig,
    pub runner: TaskRunner,
    pub jobs: Jobs,
}

impl AppContext {
    /// Open the database and build every configured collaborator.
    pub async fn init(config: AttestConfig) -> anyhow::Result<Self> {
        let service = Arc::new(
            AttestService::new_local(&config.database.path)
                .await
                .with_context(|| format!("failed to open database at {}", config.database.path))?,
        );

        let env = JobEnv::from_config(Arc::clone(&service), &config)
            .context("failed to build provider clients")?;
        let handlers =
            SyncHandlers::from_config(&config.directory).context("failed to build sync handlers")?;
        let jobs = Jobs::new(JobSettings::from_config(&config), handlers);

        Ok(Self {
            service,
            runner: TaskRunner::new(Arc::new(env)),
            jobs,
            config,
        })
    }
}
