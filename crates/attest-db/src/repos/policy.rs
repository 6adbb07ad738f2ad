//! Policy repository: status transitions and the bulk review update.

use chrono::{NaiveDate, Utc};

use attest_core::entities::Policy;
use attest_core::enums::{PolicyStatus, ReviewFrequency};
use attest_core::ids::PREFIX_POLICY;

use crate::error::DatabaseError;
use crate::helpers::{
    IN_LIST_CHUNK, get_opt_string, parse_datetime, parse_enum, parse_optional_date, placeholders,
};
use crate::service::AttestService;

const SELECT_COLS: &str = "id, organization_id, name, status, frequency, review_date, owner_email, created_at, updated_at";

fn row_to_policy(row: &libsql::Row) -> Result<Policy, DatabaseError> {
    Ok(Policy {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        name: row.get(2)?,
        status: parse_enum(&row.get::<String>(3)?)?,
        frequency: get_opt_string(row, 4)?
            .as_deref()
            .map(parse_enum::<ReviewFrequency>)
            .transpose()?,
        review_date: parse_optional_date(get_opt_string(row, 5)?.as_deref())?,
        owner_email: get_opt_string(row, 6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

async fn collect(mut rows: libsql::Rows) -> Result<Vec<Policy>, DatabaseError> {
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(row_to_policy(&row)?);
    }
    Ok(out)
}

/// Fields for a new draft policy.
#[derive(Debug, Clone, Default)]
pub struct NewPolicy<'a> {
    pub name: &'a str,
    pub frequency: Option<ReviewFrequency>,
    pub review_date: Option<NaiveDate>,
    pub owner_email: Option<&'a str>,
}

impl AttestService {
    /// Create a policy in `draft`.
    pub async fn create_policy(
        &self,
        organization_id: &str,
        new: &NewPolicy<'_>,
    ) -> Result<Policy, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_POLICY).await?;
        let review_date = new.review_date.map(|d| d.format("%Y-%m-%d").to_string());
        self.db()
            .execute_with(
                "INSERT INTO policies (id, organization_id, name, status, frequency, review_date, owner_email, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                || {
                    libsql::params![
                        id.as_str(),
                        organization_id,
                        new.name,
                        PolicyStatus::Draft.as_str(),
                        new.frequency.map(ReviewFrequency::as_str),
                        review_date.as_deref(),
                        new.owner_email,
                        now.to_rfc3339(),
                        now.to_rfc3339()
                    ]
                },
            )
            .await?;
        Ok(Policy {
            id,
            organization_id: organization_id.to_string(),
            name: new.name.to_string(),
            status: PolicyStatus::Draft,
            frequency: new.frequency,
            review_date: new.review_date,
            owner_email: new.owner_email.map(String::from),
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_policy(&self, id: &str) -> Result<Policy, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM policies WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_policy(&row)
    }

    pub async fn list_policies(&self, organization_id: &str) -> Result<Vec<Policy>, DatabaseError> {
        let rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM policies WHERE organization_id = ?1 ORDER BY created_at, id"
                ),
                [organization_id],
            )
            .await?;
        collect(rows).await
    }

    /// Move a policy along its state machine.
    pub async fn set_policy_status(
        &self,
        id: &str,
        next: PolicyStatus,
    ) -> Result<Policy, DatabaseError> {
        let current = self.get_policy(id).await?;
        if !current.status.can_transition_to(next) {
            return Err(DatabaseError::InvalidTransition {
                entity: "policy",
                id: id.to_string(),
                from: current.status.to_string(),
                to: next.to_string(),
            });
        }
        let now = Utc::now();
        self.db()
            .execute_with(
                "UPDATE policies SET status = ?1, updated_at = ?2 WHERE id = ?3",
                || libsql::params![next.as_str(), now.to_rfc3339(), id],
            )
            .await?;
        self.get_policy(id).await
    }

    /// Published policies of every tenant that carry both a cadence and a review date.
    ///
    /// The overdue cut is computed in Rust because month arithmetic clamps
    /// end-of-month dates, which `SQLite` date modifiers do not.
    pub async fn list_review_candidates(&self) -> Result<Vec<Policy>, DatabaseError> {
        let rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM policies
                     WHERE status = ?1 AND frequency IS NOT NULL AND review_date IS NOT NULL
                     ORDER BY organization_id, id"
                ),
                [PolicyStatus::Published.as_str()],
            )
            .await?;
        collect(rows).await
    }

    /// Flip every listed policy that is still `published` to `needs_review`.
    /// Ids are bound [`IN_LIST_CHUNK`] at a time. Returns the number of rows changed.
    pub async fn mark_needs_review(&self, ids: &[String]) -> Result<u64, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let mut changed = 0;
        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let mut params: Vec<libsql::Value> = vec![
                PolicyStatus::NeedsReview.as_str().into(),
                now.as_str().into(),
                PolicyStatus::Published.as_str().into(),
            ];
            params.extend(chunk.iter().map(|id| libsql::Value::from(id.as_str())));
            let sql = format!(
                "UPDATE policies SET status = ?1, updated_at = ?2 WHERE status = ?3 AND id IN ({})",
                placeholders(4, chunk.len())
            );
            changed += self
                .db()
                .execute_with(&sql, || libsql::params_from_iter(params.clone()))
                .await?;
        }
        Ok(changed)
    }
}
