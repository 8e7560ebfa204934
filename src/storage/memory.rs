//! In-process store. Used in tests and as the fallback when the database
//! cannot be opened.

use std::sync::Mutex;

use crate::storage::models::{CharacterState, StylingItem, UserProgress, PROGRESS_ID};
use crate::storage::{ProgressStore, StorageError, StorageResult};

#[derive(Debug, Clone, Default)]
struct MemoryData {
    progress: Option<UserProgress>,
    items: Vec<StylingItem>,
    character: Option<CharacterState>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, MemoryData>> {
        self.data
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }
}

impl ProgressStore for MemoryStore {
    fn init(&self) -> StorageResult<()> {
        Ok(())
    }

    fn get_user_progress(&self) -> StorageResult<Option<UserProgress>> {
        Ok(self.lock()?.progress.clone())
    }

    fn save_user_progress(&self, progress: &UserProgress) -> StorageResult<()> {
        let mut stored = progress.clone();
        stored.id = PROGRESS_ID;
        self.lock()?.progress = Some(stored);
        Ok(())
    }

    fn get_all_styling_items(&self) -> StorageResult<Vec<StylingItem>> {
        Ok(self.lock()?.items.clone())
    }

    /// Upserts by id, matching the SQLite store: stored items keep their
    /// position and new ones are appended.
    fn save_styling_items(&self, items: &[StylingItem]) -> StorageResult<()> {
        let mut data = self.lock()?;
        for item in items {
            match data.items.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => *existing = item.clone(),
                None => data.items.push(item.clone()),
            }
        }
        Ok(())
    }

    fn get_character_state(&self) -> StorageResult<Option<CharacterState>> {
        Ok(self.lock()?.character.clone())
    }

    fn save_character_state(&self, state: &CharacterState) -> StorageResult<()> {
        self.lock()?.character = Some(state.clone());
        Ok(())
    }

    fn clear_all_data(&self) -> StorageResult<()> {
        *self.lock()? = MemoryData::default();
        Ok(())
    }

    fn reset_to_seed(
        &self,
        progress: &UserProgress,
        items: &[StylingItem],
        character: &CharacterState,
    ) -> StorageResult<()> {
        let mut progress = progress.clone();
        progress.id = PROGRESS_ID;
        let fresh = MemoryData {
            progress: Some(progress),
            items: items.to_vec(),
            character: Some(character.clone()),
        };
        *self.lock()? = fresh;
        Ok(())
    }
}
