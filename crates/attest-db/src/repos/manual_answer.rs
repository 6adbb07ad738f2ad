//! Manual answer repository. Every query is tenant scoped.

use chrono::Utc;

use attest_core::entities::ManualAnswer;
use attest_core::ids::PREFIX_MANUAL_ANSWER;

use crate::error::DatabaseError;
use crate::helpers::parse_datetime;
use crate::service::AttestService;

const SELECT_COLS: &str = "id, organization_id, question, answer, created_at, updated_at";

fn row_to_manual_answer(row: &libsql::Row) -> Result<ManualAnswer, DatabaseError> {
    Ok(ManualAnswer {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
        updated_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

impl AttestService {
    pub async fn create_manual_answer(
        &self,
        organization_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<ManualAnswer, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_MANUAL_ANSWER).await?;
        self.db()
            .execute_with(
                "INSERT INTO manual_answers (id, organization_id, question, answer, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                || {
                    libsql::params![
                        id.as_str(),
                        organization_id,
                        question,
                        answer,
                        now.to_rfc3339(),
                        now.to_rfc3339()
                    ]
                },
            )
            .await?;
        Ok(ManualAnswer {
            id,
            organization_id: organization_id.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Load an answer within its tenant; another tenant's id yields `None`.
    pub async fn find_manual_answer(
        &self,
        organization_id: &str,
        id: &str,
    ) -> Result<Option<ManualAnswer>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM manual_answers WHERE id = ?1 AND organization_id = ?2"
                ),
                [id, organization_id],
            )
            .await?;
        rows.next()
            .await?
            .map(|row| row_to_manual_answer(&row))
            .transpose()
    }

    /// Ids of every answer owned by the tenant, oldest first.
    pub async fn list_manual_answer_ids(
        &self,
        organization_id: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id FROM manual_answers WHERE organization_id = ?1 ORDER BY created_at, id",
                [organization_id],
            )
            .await?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<String>(0)?);
        }
        Ok(ids)
    }

    pub async fn count_manual_answers(&self, organization_id: &str) -> Result<i64, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT COUNT(*) FROM manual_answers WHERE organization_id = ?1",
                [organization_id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<i64>(0)?)
    }

    /// Delete one answer. Returns `false` when nothing matched.
    pub async fn delete_manual_answer(
        &self,
        organization_id: &str,
        id: &str,
    ) -> Result<bool, DatabaseError> {
        let affected = self
            .db()
            .execute_with(
                "DELETE FROM manual_answers WHERE id = ?1 AND organization_id = ?2",
                || libsql::params![id, organization_id],
            )
            .await?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::test_support::{seed_org, test_service};

    #[tokio::test]
    async fn find_is_tenant_scoped() {
        let svc = test_service().await;
        let acme = seed_org(&svc, "Acme").await;
        let globex = seed_org(&svc, "Globex").await;
        let answer = svc
            .create_manual_answer(&acme.id, "Do you encrypt at rest?", "Yes, AES-256.")
            .await
            .unwrap();

        assert!(svc.find_manual_answer(&acme.id, &answer.id).await.unwrap().is_some());
        assert!(svc.find_manual_answer(&globex.id, &answer.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_twice_reports_missing() {
        let svc = test_service().await;
        let org = seed_org(&svc, "Acme").await;
        let answer = svc.create_manual_answer(&org.id, "Q", "A").await.unwrap();

        assert!(svc.delete_manual_answer(&org.id, &answer.id).await.unwrap());
        assert!(!svc.delete_manual_answer(&org.id, &answer.id).await.unwrap());
        assert_eq!(svc.count_manual_answers(&org.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_ids_only_returns_own_tenant() {
        let svc = test_service().await;
        let acme = seed_org(&svc, "Acme").await;
        let globex = seed_org(&svc, "Globex").await;
        for i in 0..3 {
            svc.create_manual_answer(&acme.id, &format!("Q{i}"), "A").await.unwrap();
        }
        svc.create_manual_answer(&globex.id, "Q", "A").await.unwrap();

        assert_eq!(svc.list_manual_answer_ids(&acme.id).await.unwrap().len(), 3);
        assert_eq!(svc.count_manual_answers(&globex.id).await.unwrap(), 1);
    }
}
