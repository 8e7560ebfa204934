//! `character_state` table access.

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::storage::models::{CharacterState, CHARACTER_ID};
use crate::storage::{StorageError, StorageResult};

pub struct CharacterRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CharacterRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> StorageResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    pub fn get(&self) -> StorageResult<Option<CharacterState>> {
        let conn = self.get_conn()?;
        Self::get_internal(&conn)
    }

    pub fn save(&self, state: &CharacterState) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::save_internal(&conn, state)
    }

    pub fn clear(&self) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::clear_internal(&conn)
    }

    // ============================================================
    // Internal
    // ============================================================

    pub fn get_internal(conn: &Connection) -> StorageResult<Option<CharacterState>> {
        let mut stmt = conn.prepare(
            "SELECT applied_items, background_color FROM character_state WHERE id = ?1",
        )?;

        match stmt.query_row([CHARACTER_ID], |row| CharacterState::from_row(row)) {
            Ok(state) => Ok(Some(state)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(rusqlite::Error::FromSqlConversionFailure(_, _, e)) => {
                Err(StorageError::Serialization(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_internal(conn: &Connection, state: &CharacterState) -> StorageResult<()> {
        state.upsert(conn)
    }

    pub fn clear_internal(conn: &Connection) -> StorageResult<()> {
        conn.execute("DELETE FROM character_state", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::run_migrations;
    use crate::storage::models::{AppliedStyling, Position};

    fn setup_test_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().expect("Failed to open in-memory db");
        run_migrations(&conn).expect("Failed to run migrations");
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn test_save_and_get() {
        let repo = CharacterRepository::new(setup_test_db());
        assert_eq!(repo.get().unwrap(), None);

        let mut state = CharacterState::default();
        state.apply(AppliedStyling::new("accessory-crown").at(Position::new(50.0, 10.0)));
        state.background_color = Some("#87CEEB".to_string());
        repo.save(&state).expect("Failed to save character");

        let loaded = repo.get().expect("Failed to load character").unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_corrupt_applied_items_is_serialization_error() {
        let db = setup_test_db();
        db.lock()
            .unwrap()
            .execute(
                "INSERT INTO character_state (id, applied_items, updated_at) \
                 VALUES (1, 'not json', 'x')",
                [],
            )
            .unwrap();

        let repo = CharacterRepository::new(db);
        assert!(matches!(repo.get(), Err(StorageError::Serialization(_))));
    }
}
