//! Check run repository.
//!
//! A check run opens as `running` and closes exactly once, as `success` or
//! `failed`. Closing an already closed run is an invalid transition.

use chrono::Utc;

use attest_core::entities::{CheckRun, Connection};
use attest_core::enums::CheckRunStatus;
use attest_core::ids::PREFIX_CHECK_RUN;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_datetime};
use crate::service::AttestService;

const SELECT_COLS: &str = "id, connection_id, organization_id, check_id, status, passed_count, failed_count, error, started_at, completed_at";

fn row_to_check_run(row: &libsql::Row) -> Result<CheckRun, DatabaseError> {
    Ok(CheckRun {
        id: row.get(0)?,
        connection_id: row.get(1)?,
        organization_id: row.get(2)?,
        check_id: row.get(3)?,
        status: parse_enum(&row.get::<String>(4)?)?,
        passed_count: row.get(5)?,
        failed_count: row.get(6)?,
        error: get_opt_string(row, 7)?,
        started_at: parse_datetime(&row.get::<String>(8)?)?,
        completed_at: parse_optional_datetime(get_opt_string(row, 9)?.as_deref())?,
    })
}

impl AttestService {
    /// Open a `running` check run for `connection`.
    pub async fn start_check_run(
        &self,
        connection: &Connection,
        check_id: &str,
    ) -> Result<CheckRun, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_CHECK_RUN).await?;
        self.db()
            .execute_with(
                "INSERT INTO check_runs (id, connection_id, organization_id, check_id, status, started_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                || {
                    libsql::params![
                        id.as_str(),
                        connection.id.as_str(),
                        connection.organization_id.as_str(),
                        check_id,
                        CheckRunStatus::Running.as_str(),
                        now.to_rfc3339()
                    ]
                },
            )
            .await?;
        Ok(CheckRun {
            id,
            connection_id: connection.id.clone(),
            organization_id: connection.organization_id.clone(),
            check_id: check_id.to_string(),
            status: CheckRunStatus::Running,
            passed_count: 0,
            failed_count: 0,
            error: None,
            started_at: now,
            completed_at: None,
        })
    }

    pub async fn get_check_run(&self, id: &str) -> Result<CheckRun, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM check_runs WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_check_run(&row)
    }

    /// Close a run as `success` with the scanner's check id and result counts.
    pub async fn complete_check_run(
        &self,
        id: &str,
        check_id: &str,
        passed_count: i64,
        failed_count: i64,
    ) -> Result<CheckRun, DatabaseError> {
        self.ensure_check_run_transition(id, CheckRunStatus::Success)
            .await?;
        let now = Utc::now();
        self.db()
            .execute_with(
                "UPDATE check_runs
                 SET status = ?1, check_id = ?2, passed_count = ?3, failed_count = ?4, completed_at = ?5
                 WHERE id = ?6",
                || {
                    libsql::params![
                        CheckRunStatus::Success.as_str(),
                        check_id,
                        passed_count,
                        failed_count,
                        now.to_rfc3339(),
                        id
                    ]
                },
            )
            .await?;
        self.get_check_run(id).await
    }

    /// Close a run as `failed`. `error` must already be redacted.
    pub async fn fail_check_run(&self, id: &str, error: &str) -> Result<CheckRun, DatabaseError> {
        self.ensure_check_run_transition(id, CheckRunStatus::Failed)
            .await?;
        let now = Utc::now();
        self.db()
            .execute_with(
                "UPDATE check_runs SET status = ?1, error = ?2, completed_at = ?3 WHERE id = ?4",
                || {
                    libsql::params![
                        CheckRunStatus::Failed.as_str(),
                        error,
                        now.to_rfc3339(),
                        id
                    ]
                },
            )
            .await?;
        self.get_check_run(id).await
    }

    /// Most recent runs first.
    pub async fn list_check_runs(
        &self,
        connection_id: &str,
        limit: u32,
    ) -> Result<Vec<CheckRun>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM check_runs WHERE connection_id = ?1
                     ORDER BY started_at DESC, id DESC LIMIT ?2"
                ),
                libsql::params![connection_id, i64::from(limit)],
            )
            .await?;
        let mut runs = Vec::new();
        while let Some(row) = rows.next().await? {
            runs.push(row_to_check_run(&row)?);
        }
        Ok(runs)
    }

    async fn ensure_check_run_transition(
        &self,
        id: &str,
        next: CheckRunStatus,
    ) -> Result<(), DatabaseError> {
        let current = self.get_check_run(id).await?;
        if current.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(DatabaseError::InvalidTransition {
                entity: "check_run",
                id: id.to_string(),
                from: current.status.to_string(),
                to: next.to_string(),
            })
        }
    }
}
