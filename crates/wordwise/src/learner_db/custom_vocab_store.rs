//! Per-learner custom word lists
use crate::error::{Result, TutorError};
use crate::learner_db::schema::*;
use crate::learner_db::SqlitePool;
use crate::utils::TextUtils;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Transaction};
use std::sync::Arc;
use tracing::{debug, info};

pub struct CustomVocabStore {
    pool: Arc<SqlitePool>,
}

impl CustomVocabStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Append words to the learner's list; words already on it are kept as they are.
    /// Returns the cleaned words that were submitted.
    pub fn add<S: AsRef<str>>(&self, learner_id: i64, words: &[S], list_name: Option<&str>) -> Result<Vec<String>> {
        let cleaned = clean_words(words)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let inserted = insert_words(&tx, learner_id, &cleaned, list_name)?;
        tx.commit()?;

        debug!("Added {} of {} custom words for learner {}", inserted, cleaned.len(), learner_id);
        Ok(cleaned)
    }

    /// Replace the learner's whole list in one transaction.
    pub fn replace<S: AsRef<str>>(&self, learner_id: i64, words: &[S], list_name: Option<&str>) -> Result<Vec<String>> {
        let cleaned = clean_words(words)?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM custom_vocab WHERE learner_id = ?1", [learner_id])?;
        insert_words(&tx, learner_id, &cleaned, list_name)?;
        tx.commit()?;

        info!(
            "Replaced custom list of learner {}: {} removed, {} saved",
            learner_id,
            removed,
            cleaned.len()
        );
        Ok(cleaned)
    }

    /// The learner's words in alphabetical order
    pub fn list(&self, learner_id: i64) -> Result<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT word FROM custom_vocab WHERE learner_id = ?1 ORDER BY word")?;
        let words = stmt
            .query_map([learner_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(words)
    }
}

/// Sanitize every word up front so a bad entry rejects the whole batch.
/// Blank entries are skipped and repeats collapse to their first occurrence.
fn clean_words<S: AsRef<str>>(words: &[S]) -> Result<Vec<String>> {
    let mut cleaned: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        let word = word.as_ref();
        if word.trim().is_empty() {
            continue;
        }
        let word = TextUtils::sanitize_word(word)?;
        if !cleaned.contains(&word) {
            cleaned.push(word);
        }
    }
    Ok(cleaned)
}

fn insert_words(tx: &Transaction<'_>, learner_id: i64, words: &[String], list_name: Option<&str>) -> Result<usize> {
    let exists = tx.query_row("SELECT COUNT(*) FROM learners WHERE id = ?1", [learner_id], |row| {
        row.get::<_, i64>(0)
    })?;
    if exists == 0 {
        return Err(TutorError::validation(format!("unknown learner: {}", learner_id)));
    }

    let (_, now) = now_timestamp();
    let mut stmt = tx.prepare(
        "INSERT OR IGNORE INTO custom_vocab (learner_id, word, list_name, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut inserted = 0;
    for word in words {
        inserted += stmt.execute(params![learner_id, word, list_name, now])?;
    }
    Ok(inserted)
}
