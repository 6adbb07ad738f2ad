//! # attest-db
//!
//! libSQL persistence for the records background jobs read and write:
//! organizations, provider connections, check runs, manual answers,
//! policies, members, and the `job_runs` log that backs progress polling.
//!
//! Every query that touches tenant data filters by `organization_id`;
//! the orchestrators are the only callers that read across tenants.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod retry;
pub mod service;

#[cfg(test)]
mod test_support;

use error::DatabaseError;
use libsql::Builder;
use libsql::params::IntoParams;
use retry::{RetryConfig, is_busy_error};

/// Database handle shared by every repository.
pub struct AttestDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
    retry: RetryConfig,
}

impl AttestDb {
    /// Open a local database file, or `:memory:`.
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && path != ":memory:"
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| DatabaseError::Other(anyhow::anyhow!("create {}: {e}", parent.display())))?;
        }

        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Per-connection in SQLite.
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let attest_db = Self {
            db,
            conn,
            retry: RetryConfig::default(),
        };
        attest_db.run_migrations().await?;
        Ok(attest_db)
    }

    /// Replace the busy-retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"con-a3f8b2c1"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT '{prefix}-' || lower(hex(randomblob(4)))"),
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }

    /// Execute a write, retrying while the database reports busy or locked.
    ///
    /// `params` is a factory because libSQL consumes parameters on every call.
    /// Returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::LibSql` for non-transient failures, or the last
    /// busy error once attempts are exhausted.
    pub async fn execute_with<F, P>(&self, sql: &str, params: F) -> Result<u64, DatabaseError>
    where
        F: Fn() -> P,
        P: IntoParams,
    {
        let mut attempt = 1;
        loop {
            match self.conn.execute(sql, params()).await {
                Ok(affected) => return Ok(affected),
                Err(e) if is_busy_error(&e) && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(attempt, ?delay, error = %e, "database busy, retrying write");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn test_db() -> AttestDb {
        AttestDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let db = test_db().await;
        let tables = [
            "organizations",
            "connections",
            "check_runs",
            "manual_answers",
            "policies",
            "members",
            "job_runs",
        ];
        for table in &tables {
            let mut rows = db
                .conn()
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [*table],
                )
                .await
                .unwrap();
            assert!(rows.next().await.unwrap().is_some(), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn generate_id_format() {
        let db = test_db().await;
        let id = db.generate_id("con").await.unwrap();
        assert!(id.starts_with("con-"), "got {id}");
        assert_eq!(id.len(), 12);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn generate_id_unique() {
        let db = test_db().await;
        let mut ids = HashSet::new();
        for _ in 0..100 {
            assert!(ids.insert(db.generate_id("run").await.unwrap()));
        }
    }

    #[tokio::test]
    async fn execute_with_reports_affected_rows() {
        let db = test_db().await;
        let affected = db
            .execute_with(
                "INSERT INTO organizations (id, name) VALUES (?1, ?2)",
                || libsql::params!["org-00000001", "Acme"],
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn execute_with_surfaces_constraint_errors() {
        let db = test_db().await;
        let insert = || libsql::params!["org-00000001", "Acme"];
        db.execute_with("INSERT INTO organizations (id, name) VALUES (?1, ?2)", insert)
            .await
            .unwrap();
        let err = db
            .execute_with("INSERT INTO organizations (id, name) VALUES (?1, ?2)", insert)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::LibSql(_)));
    }

    #[tokio::test]
    async fn opens_file_backed_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("attest.db");
        let db = AttestDb::open_local(path.to_str().unwrap()).await.unwrap();
        db.generate_id("org").await.unwrap();
        assert!(path.exists());
    }
}
