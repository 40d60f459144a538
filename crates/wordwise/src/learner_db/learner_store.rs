use crate::error::{Result, TutorError};
use crate::learner_db::schema::*;
use crate::learner_db::SqlitePool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;
use tracing::info;

/// Learner directory: names are case-sensitive and unique.
pub struct LearnerStore {
    pool: Arc<SqlitePool>,
}

impl LearnerStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Look up a learner by name, creating the profile on first reference.
    pub fn get_or_create(&self, name: &str) -> Result<Learner> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TutorError::validation("learner name must not be empty"));
        }

        let conn = self.get_conn()?;
        let (_, now) = now_timestamp();
        // INSERT OR IGNORE keeps two concurrent first references from colliding on the UNIQUE key
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO learners (name, created_at) VALUES (?1, ?2)",
            params![name, now],
        )?;
        if inserted > 0 {
            info!("Created learner profile {:?}", name);
        }

        let learner = conn.query_row(
            "SELECT id, name, created_at FROM learners WHERE name = ?1",
            [name],
            Self::row_to_learner,
        )?;
        Ok(learner)
    }

    pub fn find(&self, name: &str) -> Result<Option<Learner>> {
        let conn = self.get_conn()?;
        let learner = conn
            .query_row(
                "SELECT id, name, created_at FROM learners WHERE name = ?1",
                [name.trim()],
                Self::row_to_learner,
            )
            .optional()?;
        Ok(learner)
    }

    /// All learners, oldest profile first
    pub fn list(&self) -> Result<Vec<Learner>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM learners ORDER BY id")?;
        let learners = stmt
            .query_map([], Self::row_to_learner)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(learners)
    }

    fn row_to_learner(row: &Row) -> rusqlite::Result<Learner> {
        let created_at: String = row.get(2)?;
        Ok(Learner {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: parse_timestamp(&created_at, 2)?,
        })
    }
}
