//! Local persistence for progress, the reward catalog and the character.
//!
//! # Components
//! - `ProgressStore`: whole-record store contract used by the app state
//! - `Storage`: SQLite implementation (WAL, versioned migrations)
//! - `MemoryStore`: in-process implementation, also the degraded fallback
//!
//! Every operation reads or writes a whole record. Partial-field updates
//! are the app state's job (fetch-merge-write).

// ============================================================
// Submodules
// ============================================================

pub mod character;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod progress;
pub mod styling_items;

pub use character::CharacterRepository;
pub use memory::MemoryStore;
pub use migrations::run_migrations;
pub use models::*;
pub use progress::ProgressRepository;
pub use styling_items::StylingItemRepository;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

// ============================================================
// Errors
// ============================================================

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("lock error: {0}")]
    LockError(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// ProgressStore
// ============================================================

/// Whole-record persistence contract.
pub trait ProgressStore: Send + Sync {
    /// Prepares the backing store. Safe to call more than once.
    fn init(&self) -> StorageResult<()>;

    fn get_user_progress(&self) -> StorageResult<Option<UserProgress>>;

    fn save_user_progress(&self, progress: &UserProgress) -> StorageResult<()>;

    /// Catalog in stored order.
    fn get_all_styling_items(&self) -> StorageResult<Vec<StylingItem>>;

    /// Upserts by id. Stored items keep their catalog position, new items
    /// are appended in list order.
    fn save_styling_items(&self, items: &[StylingItem]) -> StorageResult<()>;

    fn get_character_state(&self) -> StorageResult<Option<CharacterState>>;

    fn save_character_state(&self, state: &CharacterState) -> StorageResult<()>;

    /// Wipes all three records.
    fn clear_all_data(&self) -> StorageResult<()>;

    /// Clears everything and writes the given records. Either all of it
    /// happens or none of it does.
    fn reset_to_seed(
        &self,
        progress: &UserProgress,
        items: &[StylingItem],
        character: &CharacterState,
    ) -> StorageResult<()>;
}

// ============================================================
// Storage - SQLite
// ============================================================

pub struct Storage {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl Storage {
    /// Opens (or creates) the database file and runs pending migrations.
    pub fn open<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let connection = Connection::open(path)?;
        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;

        let storage = Self {
            conn: Arc::new(Mutex::new(connection)),
            db_path: path.to_string_lossy().to_string(),
        };
        storage.init()?;

        Ok(storage)
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch("PRAGMA foreign_keys=ON;")?;

        let storage = Self {
            conn: Arc::new(Mutex::new(connection)),
            db_path: ":memory:".to_string(),
        };
        storage.init()?;

        Ok(storage)
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    pub fn progress(&self) -> ProgressRepository {
        ProgressRepository::new(Arc::clone(&self.conn))
    }

    pub fn styling_items(&self) -> StylingItemRepository {
        StylingItemRepository::new(Arc::clone(&self.conn))
    }

    pub fn character(&self) -> CharacterRepository {
        CharacterRepository::new(Arc::clone(&self.conn))
    }

    /// Runs `f` inside a transaction; any error rolls everything back.
    pub fn transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))?;

        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;

        Ok(result)
    }
}

impl ProgressStore for Storage {
    fn init(&self) -> StorageResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))?;
        migrations::run_migrations(&conn)?;
        Ok(())
    }

    fn get_user_progress(&self) -> StorageResult<Option<UserProgress>> {
        self.progress().get()
    }

    fn save_user_progress(&self, progress: &UserProgress) -> StorageResult<()> {
        self.progress().save(progress)
    }

    fn get_all_styling_items(&self) -> StorageResult<Vec<StylingItem>> {
        self.styling_items().get_all()
    }

    fn save_styling_items(&self, items: &[StylingItem]) -> StorageResult<()> {
        self.styling_items().save_all(items)
    }

    fn get_character_state(&self) -> StorageResult<Option<CharacterState>> {
        self.character().get()
    }

    fn save_character_state(&self, state: &CharacterState) -> StorageResult<()> {
        self.character().save(state)
    }

    fn clear_all_data(&self) -> StorageResult<()> {
        self.transaction(|conn| {
            ProgressRepository::clear_internal(conn)?;
            StylingItemRepository::clear_internal(conn)?;
            CharacterRepository::clear_internal(conn)?;
            Ok(())
        })
    }

    fn reset_to_seed(
        &self,
        progress: &UserProgress,
        items: &[StylingItem],
        character: &CharacterState,
    ) -> StorageResult<()> {
        self.transaction(|conn| {
            ProgressRepository::clear_internal(conn)?;
            StylingItemRepository::clear_internal(conn)?;
            CharacterRepository::clear_internal(conn)?;

            ProgressRepository::save_internal(conn, progress)?;
            StylingItemRepository::save_all_internal(conn, items)?;
            CharacterRepository::save_internal(conn, character)?;
            Ok(())
        })
    }
}
