use crate::error::{Result, TutorError};
use crate::learner_db::schema::now_timestamp;
use crate::learner_db::SqlitePool;
use crate::utils::calendar::{month_range, week_range};
use chrono::NaiveDate;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Inclusive date window and the seconds studied inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTotal {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyTimeSummary {
    pub date: NaiveDate,
    pub day_seconds: i64,
    pub week: PeriodTotal,
    pub month: PeriodTotal,
    pub total_seconds: i64,
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_study_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| TutorError::validation(format!("invalid date {:?}: {}", raw, e)))
}

/// Per-day study counters keyed by (learner, date).
pub struct StudyTimeStore {
    pool: Arc<SqlitePool>,
}

impl StudyTimeStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Add `seconds` to the counter for `date` and return the new day total.
    /// Non-positive input leaves the counter untouched.
    pub fn add(&self, learner_id: i64, date: NaiveDate, seconds: i64) -> Result<i64> {
        let conn = self.get_conn()?;
        if seconds <= 0 {
            debug!("Ignoring non-positive study time ({}s) for learner {}", seconds, learner_id);
            return day_total(&conn, learner_id, date);
        }

        let (_, now) = now_timestamp();
        let total = conn.query_row(
            "INSERT INTO study_time (learner_id, date, total_seconds, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(learner_id, date)
             DO UPDATE SET total_seconds = total_seconds + excluded.total_seconds,
                           updated_at = excluded.updated_at
             RETURNING total_seconds",
            params![learner_id, date.to_string(), seconds, now],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn get(&self, learner_id: i64, date: NaiveDate) -> Result<i64> {
        let conn = self.get_conn()?;
        day_total(&conn, learner_id, date)
    }

    pub fn total(&self, learner_id: i64) -> Result<i64> {
        let conn = self.get_conn()?;
        let total = conn.query_row(
            "SELECT COALESCE(SUM(total_seconds), 0) FROM study_time WHERE learner_id = ?1",
            [learner_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Sum over `start..=end`.
    pub fn range_total(&self, learner_id: i64, start: NaiveDate, end: NaiveDate) -> Result<i64> {
        let conn = self.get_conn()?;
        range_total(&conn, learner_id, start, end)
    }

    /// Day, week, month and lifetime totals around `date`.
    pub fn summary(&self, learner_id: i64, date: NaiveDate) -> Result<StudyTimeSummary> {
        let conn = self.get_conn()?;
        let (week_start, week_end) = week_range(date);
        let (month_start, month_end) = month_range(date);

        let total_seconds = conn.query_row(
            "SELECT COALESCE(SUM(total_seconds), 0) FROM study_time WHERE learner_id = ?1",
            [learner_id],
            |row| row.get(0),
        )?;

        Ok(StudyTimeSummary {
            date,
            day_seconds: day_total(&conn, learner_id, date)?,
            week: PeriodTotal {
                start: week_start,
                end: week_end,
                seconds: range_total(&conn, learner_id, week_start, week_end)?,
            },
            month: PeriodTotal {
                start: month_start,
                end: month_end,
                seconds: range_total(&conn, learner_id, month_start, month_end)?,
            },
            total_seconds,
        })
    }
}

fn day_total(conn: &Connection, learner_id: i64, date: NaiveDate) -> Result<i64> {
    let total = conn
        .query_row(
            "SELECT total_seconds FROM study_time WHERE learner_id = ?1 AND date = ?2",
            params![learner_id, date.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(total.unwrap_or(0))
}

// ISO dates compare correctly as text
fn range_total(conn: &Connection, learner_id: i64, start: NaiveDate, end: NaiveDate) -> Result<i64> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(total_seconds), 0)
         FROM study_time
         WHERE learner_id = ?1 AND date >= ?2 AND date <= ?3",
        params![learner_id, start.to_string(), end.to_string()],
        |row| row.get(0),
    )?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner_db::LearnerDatabase;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn db_with_learner() -> (LearnerDatabase, i64) {
        let db = LearnerDatabase::new_in_memory().unwrap();
        let id = db.learners.get_or_create("Ana").unwrap().id;
        (db, id)
    }

    #[test]
    fn add_accumulates_on_same_date() {
        let (db, ana) = db_with_learner();
        assert_eq!(db.study_time.add(ana, day(2024, 3, 4), 60).unwrap(), 60);
        assert_eq!(db.study_time.add(ana, day(2024, 3, 4), 90).unwrap(), 150);
        assert_eq!(db.study_time.get(ana, day(2024, 3, 4)).unwrap(), 150);
        assert_eq!(db.get_stats().unwrap().total_study_days, 1);
    }

    #[test]
    fn non_positive_seconds_return_existing_total() {
        let (db, ana) = db_with_learner();
        db.study_time.add(ana, day(2024, 3, 4), 30).unwrap();
        assert_eq!(db.study_time.add(ana, day(2024, 3, 4), 0).unwrap(), 30);
        assert_eq!(db.study_time.add(ana, day(2024, 3, 4), -5).unwrap(), 30);
        assert_eq!(db.study_time.add(ana, day(2024, 3, 5), -5).unwrap(), 0);
        assert_eq!(db.study_time.total(ana).unwrap(), 30);
    }

    #[test]
    fn range_total_is_inclusive() {
        let (db, ana) = db_with_learner();
        db.study_time.add(ana, day(2024, 3, 1), 10).unwrap();
        db.study_time.add(ana, day(2024, 3, 2), 20).unwrap();
        db.study_time.add(ana, day(2024, 3, 3), 40).unwrap();

        assert_eq!(db.study_time.range_total(ana, day(2024, 3, 1), day(2024, 3, 2)).unwrap(), 30);
        assert_eq!(db.study_time.range_total(ana, day(2024, 3, 2), day(2024, 3, 3)).unwrap(), 60);
        assert_eq!(db.study_time.range_total(ana, day(2024, 3, 4), day(2024, 3, 9)).unwrap(), 0);
        assert_eq!(db.study_time.total(ana).unwrap(), 70);
    }

    #[test]
    fn totals_are_scoped_per_learner() {
        let (db, ana) = db_with_learner();
        let ben = db.learners.get_or_create("Ben").unwrap().id;
        db.study_time.add(ana, day(2024, 3, 1), 10).unwrap();
        db.study_time.add(ben, day(2024, 3, 1), 99).unwrap();
        assert_eq!(db.study_time.total(ana).unwrap(), 10);
        assert_eq!(db.study_time.get(ben, day(2024, 3, 1)).unwrap(), 99);
    }

    #[test]
    fn summary_buckets_week_and_month() {
        let (db, ana) = db_with_learner();
        // Wednesday 2024-12-04; week is Mon 12-02 .. Sun 12-08
        db.study_time.add(ana, day(2024, 11, 30), 5).unwrap();
        db.study_time.add(ana, day(2024, 12, 2), 10).unwrap();
        db.study_time.add(ana, day(2024, 12, 4), 20).unwrap();
        db.study_time.add(ana, day(2024, 12, 20), 40).unwrap();

        let summary = db.study_time.summary(ana, day(2024, 12, 4)).unwrap();
        assert_eq!(summary.day_seconds, 20);
        assert_eq!(summary.week.start, day(2024, 12, 2));
        assert_eq!(summary.week.end, day(2024, 12, 8));
        assert_eq!(summary.week.seconds, 30);
        assert_eq!(summary.month.end, day(2024, 12, 31));
        assert_eq!(summary.month.seconds, 70);
        assert_eq!(summary.total_seconds, 75);
    }

    #[test]
    fn parse_study_date_accepts_iso_only() {
        assert_eq!(parse_study_date("2024-02-29").unwrap(), day(2024, 2, 29));
        assert_eq!(parse_study_date(" 2024-01-05 ").unwrap(), day(2024, 1, 5));
        for bad in ["2023-02-29", "05/01/2024", "", "yesterday"] {
            assert!(matches!(parse_study_date(bad), Err(TutorError::Validation(_))));
        }
    }

    proptest! {
        #[test]
        fn prop_split_adds_equal_one_summed_add(a in 1i64..10_000, b in 1i64..10_000) {
            let (db, ana) = db_with_learner();
            let date = day(2024, 6, 15);
            db.study_time.add(ana, date, a).unwrap();
            let split = db.study_time.add(ana, date, b).unwrap();

            let other = db.learners.get_or_create("Ben").unwrap().id;
            let once = db.study_time.add(other, date, a + b).unwrap();
            prop_assert_eq!(split, once);
        }

        #[test]
        fn prop_non_positive_add_never_changes_total(seed in 0i64..5_000, bad in -10_000i64..=0) {
            let (db, ana) = db_with_learner();
            let date = day(2024, 6, 15);
            db.study_time.add(ana, date, seed).unwrap();
            let before = db.study_time.total(ana).unwrap();
            db.study_time.add(ana, date, bad).unwrap();
            prop_assert_eq!(db.study_time.total(ana).unwrap(), before);
        }
    }
}
