//! Provider connection repository.
//!
//! Orchestrators list connections across all tenants; everything else is
//! scoped by id.

use chrono::{DateTime, Utc};

use attest_core::entities::Connection;
use attest_core::enums::ConnectionStatus;
use attest_core::ids::PREFIX_CONNECTION;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_datetime, placeholders};
use crate::service::AttestService;

const SELECT_COLS: &str =
    "id, organization_id, provider, status, last_synced_at, created_at, updated_at";

fn row_to_connection(row: &libsql::Row) -> Result<Connection, DatabaseError> {
    Ok(Connection {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        provider: row.get(2)?,
        status: parse_enum(&row.get::<String>(3)?)?,
        last_synced_at: parse_optional_datetime(get_opt_string(row, 4)?.as_deref())?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
        updated_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

async fn collect(mut rows: libsql::Rows) -> Result<Vec<Connection>, DatabaseError> {
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(row_to_connection(&row)?);
    }
    Ok(out)
}

impl AttestService {
    /// Create an active connection for `organization_id`.
    pub async fn create_connection(
        &self,
        organization_id: &str,
        provider: &str,
    ) -> Result<Connection, DatabaseError> {
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_CONNECTION).await?;
        self.db()
            .execute_with(
                "INSERT INTO connections (id, organization_id, provider, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                || {
                    libsql::params![
                        id.as_str(),
                        organization_id,
                        provider,
                        ConnectionStatus::Active.as_str(),
                        now.to_rfc3339(),
                        now.to_rfc3339()
                    ]
                },
            )
            .await?;
        Ok(Connection {
            id,
            organization_id: organization_id.to_string(),
            provider: provider.to_string(),
            status: ConnectionStatus::Active,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Load a connection, `None` when it has been removed.
    pub async fn find_connection(&self, id: &str) -> Result<Option<Connection>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM connections WHERE id = ?1"),
                [id],
            )
            .await?;
        rows.next()
            .await?
            .map(|row| row_to_connection(&row))
            .transpose()
    }

    pub async fn get_connection(&self, id: &str) -> Result<Connection, DatabaseError> {
        self.find_connection(id).await?.ok_or(DatabaseError::NoResult)
    }

    /// Active connections of every tenant whose provider is in `providers`.
    ///
    /// Ordered by creation so batch boundaries are stable between runs.
    pub async fn list_active_connections(
        &self,
        providers: &[&str],
    ) -> Result<Vec<Connection>, DatabaseError> {
        if providers.is_empty() {
            return Ok(Vec::new());
        }
        let mut params: Vec<libsql::Value> = vec![ConnectionStatus::Active.as_str().into()];
        params.extend(providers.iter().map(|p| libsql::Value::from(*p)));
        let sql = format!(
            "SELECT {SELECT_COLS} FROM connections
             WHERE status = ?1 AND provider IN ({})
             ORDER BY created_at, id",
            placeholders(2, providers.len())
        );
        let rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        collect(rows).await
    }

    /// Connections of one tenant, or of every tenant when `organization_id` is `None`.
    pub async fn list_connections(
        &self,
        organization_id: Option<&str>,
    ) -> Result<Vec<Connection>, DatabaseError> {
        let rows = match organization_id {
            Some(org) => {
                self.db()
                    .conn()
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM connections WHERE organization_id = ?1 ORDER BY created_at, id"
                        ),
                        [org],
                    )
                    .await?
            }
            None => {
                self.db()
                    .conn()
                    .query(
                        &format!("SELECT {SELECT_COLS} FROM connections ORDER BY created_at, id"),
                        (),
                    )
                    .await?
            }
        };
        collect(rows).await
    }

    pub async fn set_connection_status(
        &self,
        id: &str,
        status: ConnectionStatus,
    ) -> Result<Connection, DatabaseError> {
        let now = Utc::now();
        let affected = self
            .db()
            .execute_with(
                "UPDATE connections SET status = ?1, updated_at = ?2 WHERE id = ?3",
                || libsql::params![status.as_str(), now.to_rfc3339(), id],
            )
            .await?;
        if affected == 0 {
            return Err(DatabaseError::NoResult);
        }
        self.get_connection(id).await
    }

    /// Stamp a completed directory sync.
    pub async fn mark_connection_synced(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        self.db()
            .execute_with(
                "UPDATE connections SET last_synced_at = ?1, updated_at = ?1 WHERE id = ?2",
                || libsql::params![at.to_rfc3339(), id],
            )
            .await?;
        Ok(())
    }
}
