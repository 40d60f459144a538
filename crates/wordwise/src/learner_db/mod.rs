//! Learner database - SQLite storage for learners, exercise attempts, study time, custom word lists and archived documents
pub mod schema;
pub mod migration;
pub mod learner_store;
pub mod exercise_ledger;
pub mod study_time_store;
pub mod document_store;
pub mod custom_vocab_store;

pub use schema::*;
pub use migration::MigrationManager;
pub use learner_store::LearnerStore;
pub use exercise_ledger::{ExerciseLedger, NewAttempt};
pub use study_time_store::{parse_study_date, PeriodTotal, StudyTimeStore, StudyTimeSummary};
pub use document_store::{DocumentStats, DocumentStore};
pub use custom_vocab_store::CustomVocabStore;

use std::path::Path;
use std::sync::Arc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Handle over the shared connection pool, exposing one store per table group.
pub struct LearnerDatabase {
    pub learners: LearnerStore,
    pub ledger: ExerciseLedger,
    pub study_time: StudyTimeStore,
    pub documents: DocumentStore,
    pub custom_vocab: CustomVocabStore,
    pool: Arc<SqlitePool>,
}

impl LearnerDatabase {
    /// Open (or create) the database file, apply migrations and connection pragmas.
    pub fn new(db_path: &Path) -> Result<Self> {
        info!("Opening learner database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                    | rusqlite::OpenFlags::SQLITE_OPEN_FULL_MUTEX,
            )
            .with_init(|conn| {
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;",
                )
            });

        let pool = Pool::builder().max_size(10).build(manager)?;

        {
            let mut conn = pool.get()?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;",
            )?;
            MigrationManager::new(&mut conn).initialize_database()?;
        }

        info!("Learner database initialized successfully");
        Ok(Self::from_pool(Arc::new(pool)))
    }

    /// Private in-memory database. A single pooled connection, since every
    /// `:memory:` connection is its own database.
    pub fn new_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager)?;

        {
            let mut conn = pool.get()?;
            MigrationManager::new(&mut conn).initialize_database()?;
        }

        Ok(Self::from_pool(Arc::new(pool)))
    }

    fn from_pool(pool: Arc<SqlitePool>) -> Self {
        Self {
            learners: LearnerStore::new(Arc::clone(&pool)),
            ledger: ExerciseLedger::new(Arc::clone(&pool)),
            study_time: StudyTimeStore::new(Arc::clone(&pool)),
            documents: DocumentStore::new(Arc::clone(&pool)),
            custom_vocab: CustomVocabStore::new(Arc::clone(&pool)),
            pool,
        }
    }

    /// Row counts and on-disk size
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let conn = self.pool.get()?;
        Ok(migration::get_database_stats(&conn)?)
    }

    pub fn schema_version(&self) -> Result<i32> {
        let mut conn = self.pool.get()?;
        Ok(MigrationManager::new(&mut conn).get_current_version()?)
    }
}

impl Drop for LearnerDatabase {
    fn drop(&mut self) {
        if let Ok(conn) = self.pool.get() {
            let _ = conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);");
        }
    }
}
