//! Member (employee) repository.
//!
//! Members are unique per `(organization_id, email)`. Emails are stored
//! trimmed and lowercased so directory casing never creates duplicates.

use std::collections::HashSet;

use chrono::Utc;

use attest_core::entities::{Employee, Member};
use attest_core::ids::PREFIX_MEMBER;

use crate::error::DatabaseError;
use crate::helpers::{IN_LIST_CHUNK, get_opt_string, parse_datetime, placeholders};
use crate::service::AttestService;

const SELECT_COLS: &str = "id, organization_id, connection_id, email, name, department, active, created_at, updated_at";

fn row_to_member(row: &libsql::Row) -> Result<Member, DatabaseError> {
    Ok(Member {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        connection_id: get_opt_string(row, 2)?,
        email: row.get(3)?,
        name: get_opt_string(row, 4)?,
        department: get_opt_string(row, 5)?,
        active: row.get::<i64>(6)? != 0,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        updated_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

/// Canonical form of a member email.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Result of [`AttestService::upsert_member`].
#[derive(Debug, Clone)]
pub struct MemberUpsert {
    pub member: Member,
    /// `false` when an existing row was updated.
    pub created: bool,
}

impl AttestService {
    /// Insert or refresh a member from a directory record.
    pub async fn upsert_member(
        &self,
        organization_id: &str,
        connection_id: &str,
        employee: &Employee,
    ) -> Result<MemberUpsert, DatabaseError> {
        let email = normalize_email(&employee.email);
        if email.is_empty() {
            return Err(DatabaseError::InvalidState(
                "employee record has an empty email".into(),
            ));
        }
        let now = Utc::now();
        let id = self.db().generate_id(PREFIX_MEMBER).await?;
        self.db()
            .execute_with(
                "INSERT INTO members (id, organization_id, connection_id, email, name, department, active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT (organization_id, email) DO UPDATE SET
                     connection_id = excluded.connection_id,
                     name = excluded.name,
                     department = excluded.department,
                     active = excluded.active,
                     updated_at = excluded.updated_at",
                || {
                    libsql::params![
                        id.as_str(),
                        organization_id,
                        connection_id,
                        email.as_str(),
                        employee.name.as_deref(),
                        employee.department.as_deref(),
                        i64::from(employee.active),
                        now.to_rfc3339(),
                        now.to_rfc3339()
                    ]
                },
            )
            .await?;

        let member = self
            .find_member_by_email(organization_id, &email)
            .await?
            .ok_or(DatabaseError::NoResult)?;
        let created = member.id == id;
        Ok(MemberUpsert { member, created })
    }

    pub async fn find_member_by_email(
        &self,
        organization_id: &str,
        email: &str,
    ) -> Result<Option<Member>, DatabaseError> {
        let email = normalize_email(email);
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM members WHERE organization_id = ?1 AND email = ?2"
                ),
                [organization_id, email.as_str()],
            )
            .await?;
        rows.next().await?.map(|row| row_to_member(&row)).transpose()
    }

    pub async fn list_members(
        &self,
        organization_id: &str,
        active_only: bool,
    ) -> Result<Vec<Member>, DatabaseError> {
        let filter = if active_only { " AND active = 1" } else { "" };
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM members WHERE organization_id = ?1{filter} ORDER BY email"
                ),
                [organization_id],
            )
            .await?;
        let mut members = Vec::new();
        while let Some(row) = rows.next().await? {
            members.push(row_to_member(&row)?);
        }
        Ok(members)
    }

    /// Deactivate active members imported through `connection_id` whose email
    /// is not in `present`. Members added by other connections are untouched.
    ///
    /// The missing set is computed here and updated by id in chunks, so the
    /// size of a directory never decides the size of a statement.
    pub async fn deactivate_missing_members(
        &self,
        organization_id: &str,
        connection_id: &str,
        present: &[String],
    ) -> Result<u64, DatabaseError> {
        let present: HashSet<String> = present.iter().map(|e| normalize_email(e)).collect();
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT id, email FROM members
                 WHERE organization_id = ?1 AND connection_id = ?2 AND active = 1",
                [organization_id, connection_id],
            )
            .await?;
        let mut missing = Vec::new();
        while let Some(row) = rows.next().await? {
            let email: String = row.get(1)?;
            if !present.contains(&email) {
                missing.push(row.get::<String>(0)?);
            }
        }

        let now = Utc::now().to_rfc3339();
        let mut changed = 0;
        for chunk in missing.chunks(IN_LIST_CHUNK) {
            let mut params: Vec<libsql::Value> = vec![now.as_str().into(), connection_id.into()];
            params.extend(chunk.iter().map(|id| libsql::Value::from(id.as_str())));
            // A concurrent upsert may have moved the row to another connection.
            let sql = format!(
                "UPDATE members SET active = 0, updated_at = ?1
                 WHERE connection_id = ?2 AND active = 1 AND id IN ({})",
                placeholders(3, chunk.len())
            );
            changed += self
                .db()
                .execute_with(&sql, || libsql::params_from_iter(params.clone()))
                .await?;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_support::{seed_connection, seed_org, test_service};

    fn employee(email: &str, active: bool) -> Employee {
        Employee {
            email: email.to_string(),
            name: Some("Ada Lovelace".into()),
            department: Some("Engineering".into()),
            active,
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_updates() {
        let svc = test_service().await;
        let org = seed_org(&svc, "Acme").await;
        let conn = seed_connection(&svc, &org, "rippling").await;

        let first = svc
            .upsert_member(&org.id, &conn.id, &employee("Ada@Example.com ", true))
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.member.email, "ada@example.com");

        let mut changed = employee("ada@example.com", false);
        changed.department = Some("Research".into());
        let second = svc.upsert_member(&org.id, &conn.id, &changed).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.member.id, first.member.id);
        assert_eq!(second.member.department.as_deref(), Some("Research"));
        assert!(!second.member.active);
        assert_eq!(svc.list_members(&org.id, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn same_email_in_two_tenants() {
        let svc = test_service().await;
        let acme = seed_org(&svc, "Acme").await;
        let globex = seed_org(&svc, "Globex").await;
        let c1 = seed_connection(&svc, &acme, "rippling").await;
        let c2 = seed_connection(&svc, &globex, "rippling").await;

        let a = svc.upsert_member(&acme.id, &c1.id, &employee("x@example.com", true)).await.unwrap();
        let b = svc.upsert_member(&globex.id, &c2.id, &employee("x@example.com", true)).await.unwrap();
        assert!(a.created && b.created);
        assert_ne!(a.member.id, b.member.id);
    }

    #[tokio::test]
    async fn deactivates_only_missing_members_of_connection() {
        let svc = test_service().await;
        let org = seed_org(&svc, "Acme").await;
        let gw = seed_connection(&svc, &org, "google-workspace").await;
        let rippling = seed_connection(&svc, &org, "rippling").await;

        for email in ["a@example.com", "b@example.com", "c@example.com"] {
            svc.upsert_member(&org.id, &gw.id, &employee(email, true)).await.unwrap();
        }
        svc.upsert_member(&org.id, &rippling.id, &employee("d@example.com", true))
            .await
            .unwrap();

        let deactivated = svc
            .deactivate_missing_members(&org.id, &gw.id, &["A@example.com".to_string()])
            .await
            .unwrap();
        assert_eq!(deactivated, 2);

        let active: Vec<_> = svc
            .list_members(&org.id, true)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.email)
            .collect();
        assert_eq!(active, vec!["a@example.com", "d@example.com"]);
    }

    #[tokio::test]
    async fn empty_email_is_rejected() {
        let svc = test_service().await;
        let org = seed_org(&svc, "Acme").await;
        let conn = seed_connection(&svc, &org, "rippling").await;
        let err = svc
            .upsert_member(&org.id, &conn.id, &employee("  ", true))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidState(_)));
    }

    #[tokio::test]
    async fn deactivation_handles_large_directories() {
        let svc = test_service().await;
        let org = seed_org(&svc, "Acme").await;
        let conn = seed_connection(&svc, &org, "google_workspace").await;
        let seeded = IN_LIST_CHUNK + 20;
        for i in 0..seeded {
            svc.upsert_member(&org.id, &conn.id, &employee(&format!("user{i:04}@example.com"), true))
                .await
                .unwrap();
        }

        // One seeded member is still present; the rest of the list is unknown.
        let mut present: Vec<String> = (0..1_500).map(|i| format!("Other{i}@Example.com")).collect();
        present.push("USER0007@example.com".to_string());

        let deactivated = svc
            .deactivate_missing_members(&org.id, &conn.id, &present)
            .await
            .unwrap();
        assert_eq!(deactivated, u64::try_from(seeded - 1).unwrap());

        let active: Vec<_> = svc
            .list_members(&org.id, true)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.email)
            .collect();
        assert_eq!(active, vec!["user0007@example.com"]);
    }
}
