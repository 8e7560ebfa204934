//! `styling_item` table access.

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::storage::models::StylingItem;
use crate::storage::{StorageError, StorageResult};

/// Repository for the reward catalog. Items come back in catalog order.
pub struct StylingItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StylingItemRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> StorageResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    pub fn get_all(&self) -> StorageResult<Vec<StylingItem>> {
        let conn = self.get_conn()?;
        Self::get_all_internal(&conn)
    }

    pub fn get(&self, id: &str) -> StorageResult<Option<StylingItem>> {
        let conn = self.get_conn()?;
        Self::get_internal(&conn, id)
    }

    /// Upserts `items` by id. Stored items keep their position; new ones are
    /// appended in list order.
    pub fn save_all(&self, items: &[StylingItem]) -> StorageResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        Self::save_all_internal(&tx, items)?;
        tx.commit()?;
        Ok(())
    }

    pub fn clear(&self) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::clear_internal(&conn)
    }

    // ============================================================
    // Internal
    // ============================================================

    pub fn get_all_internal(conn: &Connection) -> StorageResult<Vec<StylingItem>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, item_type, name, asset_reference, is_unlocked, category,
                   default_x, default_y, size
            FROM styling_item
            ORDER BY sort_order, id
            "#,
        )?;

        let items = stmt
            .query_map([], |row| StylingItem::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    pub fn get_internal(conn: &Connection, id: &str) -> StorageResult<Option<StylingItem>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, item_type, name, asset_reference, is_unlocked, category,
                   default_x, default_y, size
            FROM styling_item
            WHERE id = ?1
            "#,
        )?;

        match stmt.query_row([id], |row| StylingItem::from_row(row)) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_all_internal(conn: &Connection, items: &[StylingItem]) -> StorageResult<()> {
        let next_order: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM styling_item",
            [],
            |row| row.get(0),
        )?;

        // sort_order is only written on insert
        for (offset, item) in items.iter().enumerate() {
            item.upsert(conn, next_order as usize + offset)?;
        }
        Ok(())
    }

    pub fn clear_internal(conn: &Connection) -> StorageResult<()> {
        conn.execute("DELETE FROM styling_item", [])?;
        Ok(())
    }
}
