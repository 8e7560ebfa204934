//! Application state: the one place the rest of the app reads and writes
//! progress, the styling catalog and the character.
//!
//! Every partial update goes through fetch-merge-write: the latest persisted
//! record is read, the change is merged into it, the whole record is written
//! back and then re-read to publish the canonical value. Each record has its
//! own mutex, held for the whole sequence, so two updates of the same record
//! never interleave.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::practice::difficulty::{DifficultyPolicy, MIN_DIFFICULTY};
use crate::practice::rewards::RewardPolicy;
use crate::practice::topic::Topic;
use crate::seed;
use crate::storage::models::{
    AppliedStyling, CharacterState, StylingItem, UserProgress, PROGRESS_ID,
};
use crate::storage::{MemoryStore, ProgressStore};

// ============================================================
// Bootstrap state
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum LoadState {
    Uninitialized,
    Loading,
    /// `degraded` means the configured store failed and the app runs on an
    /// in-memory store seeded with defaults.
    Ready { degraded: bool },
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready { .. })
    }
}

// ============================================================
// ProgressPatch
// ============================================================

/// Partial progress update. `None` keeps the persisted value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressPatch {
    pub difficulty_level_addition: Option<u8>,
    pub difficulty_level_subtraction: Option<u8>,
    pub difficulty_level_multiplication: Option<u8>,
    pub difficulty_level_division: Option<u8>,
    pub difficulty_level_geometry: Option<u8>,
    pub difficulty_level_sizes: Option<u8>,
    pub correct_answers_streak: Option<u32>,
    pub total_correct_answers: Option<u32>,
    pub total_incorrect_answers: Option<u32>,
    pub last_session_date: Option<DateTime<Utc>>,
}

impl ProgressPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn difficulty(mut self, topic: Topic, level: u8) -> Self {
        let slot = match topic {
            Topic::Addition => &mut self.difficulty_level_addition,
            Topic::Subtraction => &mut self.difficulty_level_subtraction,
            Topic::Multiplication => &mut self.difficulty_level_multiplication,
            Topic::Division => &mut self.difficulty_level_division,
            Topic::Geometry => &mut self.difficulty_level_geometry,
            Topic::Sizes => &mut self.difficulty_level_sizes,
        };
        *slot = Some(level);
        self
    }

    pub fn streak(mut self, streak: u32) -> Self {
        self.correct_answers_streak = Some(streak);
        self
    }

    pub fn total_correct(mut self, total: u32) -> Self {
        self.total_correct_answers = Some(total);
        self
    }

    pub fn total_incorrect(mut self, total: u32) -> Self {
        self.total_incorrect_answers = Some(total);
        self
    }

    pub fn session_date(mut self, date: DateTime<Utc>) -> Self {
        self.last_session_date = Some(date);
        self
    }

    /// Merges the set fields into `progress`.
    pub fn apply_to(&self, progress: &mut UserProgress) {
        let difficulties = [
            (Topic::Addition, self.difficulty_level_addition),
            (Topic::Subtraction, self.difficulty_level_subtraction),
            (Topic::Multiplication, self.difficulty_level_multiplication),
            (Topic::Division, self.difficulty_level_division),
            (Topic::Geometry, self.difficulty_level_geometry),
            (Topic::Sizes, self.difficulty_level_sizes),
        ];
        for (topic, level) in difficulties {
            if let Some(level) = level {
                progress.set_difficulty(topic, level);
            }
        }
        if let Some(streak) = self.correct_answers_streak {
            progress.correct_answers_streak = streak;
        }
        if let Some(total) = self.total_correct_answers {
            progress.total_correct_answers = total;
        }
        if let Some(total) = self.total_incorrect_answers {
            progress.total_incorrect_answers = total;
        }
        if let Some(date) = self.last_session_date {
            progress.last_session_date = Some(date);
        }
    }
}

// ============================================================
// Read models
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnlockSummary {
    pub unlocked: usize,
    pub total: usize,
}

/// Whole-state export.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSnapshot {
    pub load_state: LoadState,
    pub user_progress: Option<UserProgress>,
    pub styling_items: Vec<StylingItem>,
    pub character_state: CharacterState,
    pub unlock_summary: UnlockSummary,
    pub progress_to_next_unlock: u32,
    pub unlock_threshold: u32,
}

// ============================================================
// AppState
// ============================================================

pub struct AppState {
    store: Mutex<Arc<dyn ProgressStore>>,
    rewards: RewardPolicy,
    difficulty: DifficultyPolicy,
    load_state: Mutex<LoadState>,
    progress: Mutex<Option<UserProgress>>,
    items: Mutex<Vec<StylingItem>>,
    character: Mutex<CharacterState>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> AppResult<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|e| AppError::Lock(format!("{what}: {e}")))
}

impl AppState {
    pub fn new(store: Arc<dyn ProgressStore>, rewards: RewardPolicy) -> Self {
        Self::with_policies(store, rewards, DifficultyPolicy::default())
    }

    pub fn with_policies(
        store: Arc<dyn ProgressStore>,
        rewards: RewardPolicy,
        difficulty: DifficultyPolicy,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            rewards,
            difficulty,
            load_state: Mutex::new(LoadState::Uninitialized),
            progress: Mutex::new(None),
            items: Mutex::new(Vec::new()),
            character: Mutex::new(CharacterState::default()),
        }
    }

    pub fn reward_policy(&self) -> RewardPolicy {
        self.rewards
    }

    pub fn difficulty_policy(&self) -> DifficultyPolicy {
        self.difficulty
    }

    fn store(&self) -> AppResult<Arc<dyn ProgressStore>> {
        Ok(Arc::clone(&*lock(&self.store, "store")?))
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
            .lock()
            .map(|state| *state)
            .unwrap_or(LoadState::Uninitialized)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.load_state(), LoadState::Ready { degraded: true })
    }

    fn ensure_ready(&self) -> AppResult<()> {
        if self.load_state().is_ready() {
            Ok(())
        } else {
            Err(AppError::NotReady)
        }
    }

    fn set_load_state(&self, state: LoadState) -> AppResult<()> {
        *lock(&self.load_state, "load state")? = state;
        Ok(())
    }

    // ========== Bootstrap ==========

    /// Reads every record, seeds the missing ones and becomes ready. A store
    /// failure never leaves the app loading: it is logged, the store is
    /// replaced by a seeded in-memory one and the state becomes degraded.
    pub fn bootstrap(&self) -> AppResult<LoadState> {
        let current = self.load_state();
        if current.is_ready() {
            return Ok(current);
        }
        self.set_load_state(LoadState::Loading)?;

        let store = self.store()?;
        let loaded = store
            .init()
            .and_then(|_| seed::seed_missing(store.as_ref()));

        let (records, degraded) = match loaded {
            Ok(records) => (records, false),
            Err(e) => {
                tracing::error!(error = %e, "failed to load stored data, continuing in memory");
                let fallback = MemoryStore::new();
                let records = seed::SeededRecords {
                    progress: seed::initial_user_progress(),
                    items: seed::initial_styling_items(),
                    character: seed::initial_character_state(),
                };
                if let Err(e) =
                    fallback.reset_to_seed(&records.progress, &records.items, &records.character)
                {
                    tracing::error!(error = %e, "failed to seed in-memory fallback store");
                }
                *lock(&self.store, "store")? = Arc::new(fallback);
                (records, true)
            }
        };

        *lock(&self.progress, "progress")? = Some(records.progress);
        *lock(&self.items, "styling items")? = records.items;
        *lock(&self.character, "character")? = records.character;

        let state = LoadState::Ready { degraded };
        self.set_load_state(state)?;
        tracing::info!(degraded, "app state ready");
        Ok(state)
    }

    // ========== User progress ==========

    /// Last published progress.
    pub fn user_progress(&self) -> Option<UserProgress> {
        self.progress.lock().ok().and_then(|p| p.clone())
    }

    pub fn refresh_user_progress(&self) -> AppResult<Option<UserProgress>> {
        self.ensure_ready()?;
        let store = self.store()?;
        let mut snapshot = lock(&self.progress, "progress")?;
        let latest = store.get_user_progress()?;
        if latest.is_some() {
            *snapshot = latest;
        }
        Ok(snapshot.clone())
    }

    pub fn update_user_progress(&self, patch: ProgressPatch) -> AppResult<UserProgress> {
        self.modify_user_progress(|progress| patch.apply_to(progress))
    }

    /// Fetch-merge-write on the progress record. `f` sees the latest
    /// persisted value, never the published snapshot, unless the store has
    /// no record yet. Once the write succeeds the call succeeds: a failed
    /// re-read publishes the record as written.
    pub fn modify_user_progress<F>(&self, f: F) -> AppResult<UserProgress>
    where
        F: FnOnce(&mut UserProgress),
    {
        self.ensure_ready()?;
        let store = self.store()?;
        let mut snapshot = lock(&self.progress, "progress")?;

        let mut latest = match store.get_user_progress()? {
            Some(progress) => progress,
            None => snapshot.clone().unwrap_or_else(seed::initial_user_progress),
        };
        f(&mut latest);
        latest.id = PROGRESS_ID;

        store.save_user_progress(&latest)?;
        let canonical = match store.get_user_progress() {
            Ok(stored) => stored.unwrap_or(latest),
            Err(e) => {
                tracing::warn!(error = %e, "re-read after progress write failed");
                latest
            }
        };
        *snapshot = Some(canonical.clone());

        Ok(canonical)
    }

    pub fn difficulty_for_topic(&self, topic: Topic) -> u8 {
        self.user_progress()
            .map(|progress| progress.difficulty_for(topic))
            .unwrap_or(MIN_DIFFICULTY)
    }

    pub fn set_difficulty_for_topic(&self, topic: Topic, level: u8) -> AppResult<UserProgress> {
        let level = self.difficulty.clamp(level);
        self.update_user_progress(ProgressPatch::new().difficulty(topic, level))
    }

    pub fn progress_to_next_unlock(&self) -> u32 {
        let streak = self
            .user_progress()
            .map(|p| p.correct_answers_streak)
            .unwrap_or(0);
        self.rewards.progress_to_next_unlock(streak)
    }

    // ========== Styling catalog ==========

    pub fn styling_items(&self) -> Vec<StylingItem> {
        self.items.lock().map(|items| items.clone()).unwrap_or_default()
    }

    pub fn refresh_styling_items(&self) -> AppResult<Vec<StylingItem>> {
        self.ensure_ready()?;
        let store = self.store()?;
        let mut snapshot = lock(&self.items, "styling items")?;
        let latest = store.get_all_styling_items()?;
        if !latest.is_empty() {
            *snapshot = latest;
        }
        Ok(snapshot.clone())
    }

    /// Saves the catalog. An item that is unlocked in the store stays
    /// unlocked whatever `items` says.
    pub fn save_styling_items(&self, items: &[StylingItem]) -> AppResult<Vec<StylingItem>> {
        self.ensure_ready()?;
        let store = self.store()?;
        let mut snapshot = lock(&self.items, "styling items")?;

        let latest = store.get_all_styling_items()?;
        let merged: Vec<StylingItem> = items
            .iter()
            .map(|item| {
                let mut item = item.clone();
                let stored_unlocked = latest
                    .iter()
                    .chain(snapshot.iter())
                    .any(|existing| existing.id == item.id && existing.is_unlocked);
                item.is_unlocked |= stored_unlocked;
                item
            })
            .collect();

        store.save_styling_items(&merged)?;
        *snapshot = store.get_all_styling_items()?;
        Ok(snapshot.clone())
    }

    /// Unlock check for a streak that just grew by one.
    pub fn check_and_unlock_rewards(&self, streak: u32) -> AppResult<Option<StylingItem>> {
        self.check_and_unlock_between(streak.saturating_sub(1), streak)
    }

    /// Unlocks at most one item when the streak crossed a threshold multiple
    /// between `previous` and `current`.
    pub fn check_and_unlock_between(
        &self,
        previous: u32,
        current: u32,
    ) -> AppResult<Option<StylingItem>> {
        self.ensure_ready()?;
        if !self.rewards.is_unlock_due(previous, current) {
            return Ok(None);
        }

        let store = self.store()?;
        let mut snapshot = lock(&self.items, "styling items")?;

        let mut latest = store.get_all_styling_items()?;
        if latest.is_empty() {
            latest = snapshot.clone();
        }

        let unlocked = self.rewards.unlock_next(&mut latest, previous, current);
        match &unlocked {
            Some(item) => {
                store.save_styling_items(&latest)?;
                tracing::info!(item_id = %item.id, streak = current, "styling item unlocked");
            }
            None => tracing::debug!(streak = current, "unlock due but catalog fully unlocked"),
        }

        *snapshot = match store.get_all_styling_items() {
            Ok(canonical) if !canonical.is_empty() => canonical,
            Ok(_) => latest,
            Err(e) => {
                tracing::warn!(error = %e, "re-read after unlock failed");
                latest
            }
        };

        Ok(unlocked)
    }

    pub fn unlock_summary(&self) -> UnlockSummary {
        let items = self.styling_items();
        UnlockSummary {
            unlocked: items.iter().filter(|item| item.is_unlocked).count(),
            total: items.len(),
        }
    }

    // ========== Character ==========

    pub fn character_state(&self) -> CharacterState {
        self.character
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Fetch-merge-write on the character record.
    pub fn update_character_state<F>(&self, f: F) -> AppResult<CharacterState>
    where
        F: FnOnce(&mut CharacterState),
    {
        self.ensure_ready()?;
        let store = self.store()?;
        let mut snapshot = lock(&self.character, "character")?;

        let mut latest = store
            .get_character_state()?
            .unwrap_or_else(|| snapshot.clone());
        f(&mut latest);

        store.save_character_state(&latest)?;
        let canonical = match store.get_character_state() {
            Ok(stored) => stored.unwrap_or(latest),
            Err(e) => {
                tracing::warn!(error = %e, "re-read after character write failed");
                latest
            }
        };
        *snapshot = canonical.clone();

        Ok(canonical)
    }

    fn unlocked_item(&self, item_id: &str) -> AppResult<StylingItem> {
        let item = self
            .styling_items()
            .into_iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| AppError::UnknownItem(item_id.to_string()))?;
        if !item.is_unlocked {
            return Err(AppError::ItemLocked(item_id.to_string()));
        }
        Ok(item)
    }

    /// Places an unlocked item on the character. Applying an item again
    /// replaces its entry. Colour items set the background instead and never
    /// enter the overlay list. A missing position falls back to the item's
    /// default placement.
    pub fn apply_styling(&self, mut styling: AppliedStyling) -> AppResult<CharacterState> {
        let item = self.unlocked_item(&styling.item_id)?;

        if item.is_color() {
            let color = item.asset_reference;
            return self.update_character_state(|state| state.background_color = Some(color));
        }

        if styling.position.is_none() {
            styling.position = item.default_position;
        }
        tracing::debug!(item_id = %styling.item_id, "applying styling");
        self.update_character_state(|state| state.apply(styling))
    }

    pub fn select_background(&self, item_id: &str) -> AppResult<CharacterState> {
        let item = self.unlocked_item(item_id)?;
        if !item.is_color() {
            return Err(AppError::NotAColor(item_id.to_string()));
        }
        let color = item.asset_reference;
        self.update_character_state(|state| state.background_color = Some(color))
    }

    pub fn remove_styling(&self, item_id: &str) -> AppResult<bool> {
        let mut removed = false;
        self.update_character_state(|state| removed = state.remove(item_id))?;
        Ok(removed)
    }

    /// Removes every applied item and the background colour.
    pub fn clear_character(&self) -> AppResult<CharacterState> {
        self.update_character_state(CharacterState::clear)
    }

    // ========== Reset & export ==========

    /// Wipes all three records and restores the seed. On failure nothing is
    /// published and the store is left as it was.
    pub fn reset_all_data(&self) -> AppResult<()> {
        self.ensure_ready()?;
        let store = self.store()?;

        let mut progress = lock(&self.progress, "progress")?;
        let mut items = lock(&self.items, "styling items")?;
        let mut character = lock(&self.character, "character")?;

        let seed_progress = seed::initial_user_progress();
        let seed_items = seed::initial_styling_items();
        let seed_character = seed::initial_character_state();

        if let Err(e) = store.reset_to_seed(&seed_progress, &seed_items, &seed_character) {
            tracing::error!(error = %e, "reset failed");
            return Err(AppError::Reset(e));
        }

        *progress = Some(seed_progress);
        *items = seed_items;
        *character = seed_character;

        tracing::info!("all data reset to initial state");
        Ok(())
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let user_progress = self.user_progress();
        let streak = user_progress
            .as_ref()
            .map(|p| p.correct_answers_streak)
            .unwrap_or(0);

        AppSnapshot {
            load_state: self.load_state(),
            user_progress,
            styling_items: self.styling_items(),
            character_state: self.character_state(),
            unlock_summary: self.unlock_summary(),
            progress_to_next_unlock: self.rewards.progress_to_next_unlock(streak),
            unlock_threshold: self.rewards.unlock_threshold(),
        }
    }

    pub fn export_json(&self) -> AppResult<String> {
        serde_json::to_string_pretty(&self.snapshot()).map_err(|e| AppError::Storage(e.into()))
    }
}
