//! Organization repository.

use chrono::Utc;

use attest_core::entities::Organization;
use attest_core::ids::PREFIX_ORGANIZATION;

use crate::error::DatabaseError;
use crate::helpers::parse_datetime;
use crate::service::AttestService;

const SELECT_COLS: &str = "id, name, created_at";

fn row_to_organization(row: &libsql::Row) -> Result<Organization, DatabaseError> {
    Ok(Organization {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&row.get::<String>(2)?)?,
    })
}

impl AttestService {
    pub async fn create_organization(&self, name: &str) -> Result<Organization, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_ORGANIZATION).await?;
        self.db()
            .execute_with(
                "INSERT INTO organizations (id, name, created_at) VALUES (?1, ?2, ?3)",
                || libsql::params![id.as_str(), name, now.to_rfc3339()],
            )
            .await?;
        Ok(Organization {
            id,
            name: name.to_string(),
            created_at: now,
        })
    }

    pub async fn get_organization(&self, id: &str) -> Result<Organization, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM organizations WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_organization(&row)
    }

    pub async fn list_organizations(&self) -> Result<Vec<Organization>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM organizations ORDER BY created_at, id"),
                (),
            )
            .await?;
        let mut orgs = Vec::new();
        while let Some(row) = rows.next().await? {
            orgs.push(row_to_organization(&row)?);
        }
        Ok(orgs)
    }
}
