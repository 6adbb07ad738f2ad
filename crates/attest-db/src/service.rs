//! Service layer hosting every repository method.
//!
//! `AttestService` wraps `AttestDb`; repos are `impl AttestService` blocks in
//! [`crate::repos`]. Jobs share one service behind an `Arc`.

use crate::AttestDb;
use crate::error::DatabaseError;

pub struct AttestService {
    db: AttestDb,
}

impl AttestService {
    /// Open a local database and wrap it.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or migrated.
    pub async fn new_local(db_path: &str) -> Result<Self, DatabaseError> {
        let db = AttestDb::open_local(db_path).await?;
        Ok(Self { db })
    }

    #[must_use]
    pub const fn from_db(db: AttestDb) -> Self {
        Self { db }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &AttestDb {
        &self.db
    }
}
