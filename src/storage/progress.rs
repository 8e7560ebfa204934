//! `user_progress` table access.

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::storage::models::{UserProgress, PROGRESS_ID};
use crate::storage::{StorageError, StorageResult};

/// Repository for the single progress row.
///
/// The `_internal` functions take a bare `&Connection` so they can run inside
/// a caller-owned transaction.
pub struct ProgressRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProgressRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> StorageResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    pub fn get(&self) -> StorageResult<Option<UserProgress>> {
        let conn = self.get_conn()?;
        Self::get_internal(&conn)
    }

    pub fn save(&self, progress: &UserProgress) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::save_internal(&conn, progress)
    }

    pub fn clear(&self) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::clear_internal(&conn)
    }

    // ============================================================
    // Internal
    // ============================================================

    pub fn get_internal(conn: &Connection) -> StorageResult<Option<UserProgress>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, difficulty_level_addition, difficulty_level_subtraction,
                   difficulty_level_multiplication, difficulty_level_division,
                   difficulty_level_geometry, difficulty_level_sizes,
                   correct_answers_streak, total_correct_answers, total_incorrect_answers,
                   last_session_date
            FROM user_progress
            WHERE id = ?1
            "#,
        )?;

        match stmt.query_row([PROGRESS_ID], |row| UserProgress::from_row(row)) {
            Ok(progress) => Ok(Some(progress)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_internal(conn: &Connection, progress: &UserProgress) -> StorageResult<()> {
        progress.upsert(conn)
    }

    pub fn clear_internal(conn: &Connection) -> StorageResult<()> {
        conn.execute("DELETE FROM user_progress", [])?;
        Ok(())
    }
}
