//! Job run log.
//!
//! One row per task invocation. The runner opens it as `running`, bumps
//! `attempts` before each attempt, rewrites `metadata` as progress is made,
//! and closes it once as `completed` or `failed`.

use chrono::Utc;

use attest_core::entities::JobRun;
use attest_core::enums::RunStatus;
use attest_core::ids::PREFIX_JOB_RUN;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_datetime, parse_optional_json};
use crate::service::AttestService;

const SELECT_COLS: &str =
    "id, task_id, parent_run_id, status, attempts, metadata, output, error, started_at, finished_at";

fn row_to_job_run(row: &libsql::Row) -> Result<JobRun, DatabaseError> {
    Ok(JobRun {
        id: row.get(0)?,
        task_id: row.get(1)?,
        parent_run_id: get_opt_string(row, 2)?,
        status: parse_enum(&row.get::<String>(3)?)?,
        attempts: row.get(4)?,
        metadata: parse_optional_json(get_opt_string(row, 5)?.as_deref())?,
        output: parse_optional_json(get_opt_string(row, 6)?.as_deref())?,
        error: get_opt_string(row, 7)?,
        started_at: parse_datetime(&row.get::<String>(8)?)?,
        finished_at: parse_optional_datetime(get_opt_string(row, 9)?.as_deref())?,
    })
}

/// Filter criteria for listing runs. Newest first.
#[derive(Debug, Default)]
pub struct JobRunFilter {
    pub task_id: Option<String>,
    pub parent_run_id: Option<String>,
    pub status: Option<RunStatus>,
    pub limit: Option<u32>,
}

impl AttestService {
    pub async fn create_job_run(
        &self,
        task_id: &str,
        parent_run_id: Option<&str>,
    ) -> Result<JobRun, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_JOB_RUN).await?;
        self.db()
            .execute_with(
                "INSERT INTO job_runs (id, task_id, parent_run_id, status, attempts, started_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                || {
                    libsql::params![
                        id.as_str(),
                        task_id,
                        parent_run_id,
                        RunStatus::Running.as_str(),
                        now.to_rfc3339()
                    ]
                },
            )
            .await?;
        Ok(JobRun {
            id,
            task_id: task_id.to_string(),
            parent_run_id: parent_run_id.map(String::from),
            status: RunStatus::Running,
            attempts: 0,
            metadata: None,
            output: None,
            error: None,
            started_at: now,
            finished_at: None,
        })
    }

    pub async fn get_job_run(&self, id: &str) -> Result<JobRun, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM job_runs WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_job_run(&row)
    }

    pub async fn record_job_attempt(&self, id: &str, attempts: u32) -> Result<(), DatabaseError> {
        self.db()
            .execute_with("UPDATE job_runs SET attempts = ?1 WHERE id = ?2", || {
                libsql::params![i64::from(attempts), id]
            })
            .await?;
        Ok(())
    }

    /// Overwrite the progress snapshot of a running job.
    pub async fn update_job_run_metadata(
        &self,
        id: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let json = metadata.to_string();
        self.db()
            .execute_with(
                "UPDATE job_runs SET metadata = ?1 WHERE id = ?2 AND status = ?3",
                || libsql::params![json.as_str(), id, RunStatus::Running.as_str()],
            )
            .await?;
        Ok(())
    }

    pub async fn complete_job_run(
        &self,
        id: &str,
        output: &serde_json::Value,
        metadata: &serde_json::Value,
    ) -> Result<JobRun, DatabaseError> {
        self.finish_job_run(id, RunStatus::Completed, Some(output), None, metadata)
            .await
    }

    /// Close a run as failed. `error` must already be redacted.
    pub async fn fail_job_run(
        &self,
        id: &str,
        error: &str,
        metadata: &serde_json::Value,
    ) -> Result<JobRun, DatabaseError> {
        self.finish_job_run(id, RunStatus::Failed, None, Some(error), metadata)
            .await
    }

    /// Close every still-running descendant of `id` (children, their
    /// children, and so on) as failed. The parent row is left alone.
    /// Returns the number of rows changed. `error` must already be redacted.
    pub async fn fail_running_descendants(&self, id: &str, error: &str) -> Result<u64, DatabaseError> {
        let now = Utc::now();
        self.db()
            .execute_with(
                "WITH RECURSIVE descendants(id) AS (
                     SELECT id FROM job_runs WHERE parent_run_id = ?1
                     UNION
                     SELECT j.id FROM job_runs j JOIN descendants d ON j.parent_run_id = d.id
                 )
                 UPDATE job_runs SET status = ?2, error = ?3, finished_at = ?4
                 WHERE status = ?5 AND id IN (SELECT id FROM descendants)",
                || {
                    libsql::params![
                        id,
                        RunStatus::Failed.as_str(),
                        error,
                        now.to_rfc3339(),
                        RunStatus::Running.as_str()
                    ]
                },
            )
            .await
    }

    pub async fn list_job_runs(&self, filter: &JobRunFilter) -> Result<Vec<JobRun>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref task_id) = filter.task_id {
            params.push(libsql::Value::Text(task_id.clone()));
            conditions.push(format!("task_id = ?{}", params.len()));
        }
        if let Some(ref parent) = filter.parent_run_id {
            params.push(libsql::Value::Text(parent.clone()));
            conditions.push(format!("parent_run_id = ?{}", params.len()));
        }
        if let Some(status) = filter.status {
            params.push(libsql::Value::Text(status.as_str().to_string()));
            conditions.push(format!("status = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit = filter.limit.unwrap_or(50);
        let sql = format!(
            "SELECT {SELECT_COLS} FROM job_runs {where_clause} ORDER BY started_at DESC, id DESC LIMIT {limit}"
        );

        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut runs = Vec::new();
        while let Some(row) = rows.next().await? {
            runs.push(row_to_job_run(&row)?);
        }
        Ok(runs)
    }

    async fn finish_job_run(
        &self,
        id: &str,
        status: RunStatus,
        output: Option<&serde_json::Value>,
        error: Option<&str>,
        metadata: &serde_json::Value,
    ) -> Result<JobRun, DatabaseError> {
        let current = self.get_job_run(id).await?;
        if !current.status.can_transition_to(status) {
            return Err(DatabaseError::InvalidTransition {
                entity: "job_run",
                id: id.to_string(),
                from: current.status.to_string(),
                to: status.to_string(),
            });
        }
        let now = Utc::now();
        let output = output.map(ToString::to_string);
        let metadata = metadata.to_string();
        self.db()
            .execute_with(
                "UPDATE job_runs SET status = ?1, output = ?2, error = ?3, metadata = ?4, finished_at = ?5
                 WHERE id = ?6",
                || {
                    libsql::params![
                        status.as_str(),
                        output.as_deref(),
                        error,
                        metadata.as_str(),
                        now.to_rfc3339(),
                        id
                    ]
                },
            )
            .await?;
        self.get_job_run(id).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::test_support::test_service;

    #[tokio::test]
    async fn lifecycle_records_attempts_and_output() {
        let svc = test_service().await;
        let run = svc.create_job_run("cloud-scan", None).await.unwrap();
        assert!(run.id.starts_with("run-"));

        svc.record_job_attempt(&run.id, 2).await.unwrap();
        svc.update_job_run_metadata(&run.id, &json!({ "completed": 5 }))
            .await
            .unwrap();
        let progress = svc.get_job_run(&run.id).await.unwrap();
        assert_eq!(progress.attempts, 2);
        assert_eq!(progress.metadata, Some(json!({ "completed": 5 })));

        let done = svc
            .complete_job_run(&run.id, &json!({ "total": 5 }), &json!({ "completed": 5, "total": 5 }))
            .await
            .unwrap();
        assert_eq!(done.status, RunStatus::Completed);
        assert_eq!(done.output, Some(json!({ "total": 5 })));
        assert!(done.finished_at.is_some());
    }

    #[tokio::test]
    async fn finished_run_is_immutable() {
        let svc = test_service().await;
        let run = svc.create_job_run("policy-review", None).await.unwrap();
        svc.fail_job_run(&run.id, "boom", &json!({})).await.unwrap();

        let err = svc
            .complete_job_run(&run.id, &json!({}), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidTransition { .. }));

        // Late metadata writes are ignored once the run is closed.
        svc.update_job_run_metadata(&run.id, &json!({ "late": true }))
            .await
            .unwrap();
        assert_eq!(svc.get_job_run(&run.id).await.unwrap().metadata, Some(json!({})));
    }

    #[tokio::test]
    async fn failing_descendants_reaches_grandchildren_only_while_running() {
        let svc = test_service().await;
        let root = svc.create_job_run("cloud-scan", None).await.unwrap();
        let open_child = svc.create_job_run("cloud-scan-worker", Some(&root.id)).await.unwrap();
        let done_child = svc.create_job_run("cloud-scan-worker", Some(&root.id)).await.unwrap();
        svc.complete_job_run(&done_child.id, &json!({}), &json!({}))
            .await
            .unwrap();
        let grandchild = svc.create_job_run("nested", Some(&open_child.id)).await.unwrap();
        let unrelated = svc.create_job_run("policy-review", None).await.unwrap();

        let changed = svc
            .fail_running_descendants(&root.id, "parent timed out")
            .await
            .unwrap();
        assert_eq!(changed, 2);

        for id in [&open_child.id, &grandchild.id] {
            let run = svc.get_job_run(id).await.unwrap();
            assert_eq!(run.status, RunStatus::Failed);
            assert_eq!(run.error.as_deref(), Some("parent timed out"));
            assert!(run.finished_at.is_some());
        }
        let done = svc.get_job_run(&done_child.id).await.unwrap();
        assert_eq!(done.status, RunStatus::Completed);
        for id in [&root.id, &unrelated.id] {
            assert_eq!(svc.get_job_run(id).await.unwrap().status, RunStatus::Running);
        }
    }

    #[tokio::test]
    async fn list_filters_by_task_and_parent() {
        let svc = test_service().await;
        let parent = svc.create_job_run("cloud-scan", None).await.unwrap();
        for _ in 0..3 {
            svc.create_job_run("cloud-scan-worker", Some(&parent.id))
                .await
                .unwrap();
        }
        svc.create_job_run("policy-review", None).await.unwrap();

        let children = svc
            .list_job_runs(&JobRunFilter {
                parent_run_id: Some(parent.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(children.len(), 3);
        assert!(children.iter().all(|r| r.task_id == "cloud-scan-worker"));

        let limited = svc
            .list_job_runs(&JobRunFilter {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);

        let failed = svc
            .list_job_runs(&JobRunFilter {
                status: Some(RunStatus::Failed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(failed.is_empty());
    }
}
