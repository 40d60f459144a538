use crate::error::{Result, TutorError};
use crate::learner_db::schema::*;
use crate::learner_db::SqlitePool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

/// Validated input for one ledger append.
#[derive(Debug, Clone, Validate)]
pub struct NewAttempt {
    pub learner_id: i64,
    #[validate(length(min = 1, message = "word must not be empty"))]
    pub word: String,
    pub kind: ExerciseKind,
    #[validate(range(min = 0, max = 100, message = "score must be within 0..=100"))]
    pub score: i64,
    pub correct: bool,
}

/// Append-only log of exercise attempts; the source of every derived statistic.
pub struct ExerciseLedger {
    pool: Arc<SqlitePool>,
}

impl ExerciseLedger {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Append one attempt. Out-of-range scores are rejected, never clamped.
    pub fn record(
        &self,
        learner_id: i64,
        word: &str,
        kind: ExerciseKind,
        score: i64,
        correct: bool,
    ) -> Result<Attempt> {
        self.record_attempt(NewAttempt {
            learner_id,
            word: word.to_string(),
            kind,
            score,
            correct,
        })
    }

    pub fn record_attempt(&self, attempt: NewAttempt) -> Result<Attempt> {
        attempt.validate()?;
        let score = u8::try_from(attempt.score)
            .map_err(|_| TutorError::validation(format!("score {} outside 0..=100", attempt.score)))?;

        let conn = self.get_conn()?;
        if !learner_exists(&conn, attempt.learner_id)? {
            return Err(TutorError::validation(format!(
                "unknown learner id {}",
                attempt.learner_id
            )));
        }

        let (created_at, stamp) = now_timestamp();
        conn.execute(
            "INSERT INTO attempts (learner_id, word, exercise_kind, score, correct, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                attempt.learner_id,
                attempt.word,
                attempt.kind.as_str(),
                score,
                attempt.correct,
                stamp,
            ],
        )?;
        let id = conn.last_insert_rowid();

        debug!(
            "Recorded {} attempt #{} for learner {} on {:?} (score {})",
            attempt.kind, id, attempt.learner_id, attempt.word, score
        );

        Ok(Attempt {
            id,
            learner_id: attempt.learner_id,
            word: attempt.word,
            kind: attempt.kind,
            score,
            correct: attempt.correct,
            created_at,
        })
    }

    /// Most recent attempts first; rowid breaks timestamp ties.
    pub fn history(&self, learner_id: i64, limit: usize) -> Result<Vec<Attempt>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, learner_id, word, exercise_kind, score, correct, created_at
             FROM attempts
             WHERE learner_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;
        let attempts = stmt
            .query_map(params![learner_id, limit as i64], Self::row_to_attempt)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(attempts)
    }

    /// Per-word aggregates in first-attempt order.
    pub fn word_aggregates(&self, learner_id: i64) -> Result<Vec<WordAggregate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT word, COUNT(*), AVG(score), MIN(score)
             FROM attempts
             WHERE learner_id = ?1
             GROUP BY word
             ORDER BY MIN(id)",
        )?;
        let aggregates = stmt
            .query_map([learner_id], |row| {
                Ok(WordAggregate {
                    word: row.get(0)?,
                    attempts: row.get(1)?,
                    avg_score: row.get(2)?,
                    min_score: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(aggregates)
    }

    /// Totals, accuracy, per-kind averages and the words with failing scores.
    pub fn summary(&self, learner_id: i64, weak_score_below: f64) -> Result<ProgressSummary> {
        let conn = self.get_conn()?;

        let (total_exercises, correct_count): (u32, u32) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN correct THEN 1 ELSE 0 END), 0)
             FROM attempts WHERE learner_id = ?1",
            [learner_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut scores_by_kind = BTreeMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT exercise_kind, AVG(score), COUNT(*)
                 FROM attempts WHERE learner_id = ?1
                 GROUP BY exercise_kind",
            )?;
            let mut rows = stmt.query([learner_id])?;
            while let Some(row) = rows.next()? {
                let kind: String = row.get(0)?;
                scores_by_kind.insert(
                    kind.parse::<ExerciseKind>()?,
                    KindStats {
                        avg_score: row.get(1)?,
                        count: row.get(2)?,
                    },
                );
            }
        }

        let mut stmt = conn.prepare(
            "SELECT word, AVG(score), COUNT(*)
             FROM attempts
             WHERE learner_id = ?1 AND score < ?2
             GROUP BY word
             ORDER BY AVG(score) ASC, MIN(id) ASC",
        )?;
        let weak_words = stmt
            .query_map(params![learner_id, weak_score_below], |row| {
                Ok(WeakWordStat {
                    word: row.get(0)?,
                    avg_score: row.get(1)?,
                    attempts: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let accuracy = if total_exercises > 0 {
            correct_count as f64 / total_exercises as f64
        } else {
            0.0
        };

        Ok(ProgressSummary {
            total_exercises,
            correct_count,
            accuracy,
            scores_by_kind,
            weak_words,
        })
    }

    /// Delete a learner and everything they own in one transaction.
    /// Returns `false` when the learner does not exist.
    ///
    /// Concurrent writers for the same learner are not guarded against; a
    /// single active session per learner is assumed.
    pub fn wipe(&self, learner_id: i64) -> Result<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        if !learner_exists(&tx, learner_id)? {
            debug!("Wipe requested for unknown learner {}", learner_id);
            return Ok(false);
        }

        let attempts = tx.execute("DELETE FROM attempts WHERE learner_id = ?1", [learner_id])?;
        let study_days = tx.execute("DELETE FROM study_time WHERE learner_id = ?1", [learner_id])?;
        tx.execute(
            "DELETE FROM embeddings
             WHERE doc_id IN (SELECT id FROM documents WHERE learner_id = ?1)",
            [learner_id],
        )?;
        let documents = tx.execute("DELETE FROM documents WHERE learner_id = ?1", [learner_id])?;
        let custom_words = tx.execute("DELETE FROM custom_vocab WHERE learner_id = ?1", [learner_id])?;
        tx.execute("DELETE FROM learners WHERE id = ?1", [learner_id])?;
        tx.commit()?;

        info!(
            "Wiped learner {}: {} attempts, {} study days, {} documents, {} custom words",
            learner_id, attempts, study_days, documents, custom_words
        );
        Ok(true)
    }

    fn row_to_attempt(row: &Row) -> rusqlite::Result<Attempt> {
        let kind: String = row.get(3)?;
        let kind = kind.parse::<ExerciseKind>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let created_at: String = row.get(6)?;

        Ok(Attempt {
            id: row.get(0)?,
            learner_id: row.get(1)?,
            word: row.get(2)?,
            kind,
            score: row.get(4)?,
            correct: row.get(5)?,
            created_at: parse_timestamp(&created_at, 6)?,
        })
    }
}

fn learner_exists(conn: &Connection, learner_id: i64) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM learners WHERE id = ?1", [learner_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}
