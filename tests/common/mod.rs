#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mathe_stylistin::practice::RewardPolicy;
use mathe_stylistin::storage::{
    CharacterState, ProgressStore, Storage, StorageError, StorageResult, StylingItem, UserProgress,
};
use mathe_stylistin::AppState;

/// Ready app over a fresh in-memory SQLite database.
pub fn create_test_app() -> Arc<AppState> {
    let storage = Storage::in_memory().expect("Failed to create in-memory storage");
    create_app_with_store(Arc::new(storage))
}

pub fn create_app_with_store(store: Arc<dyn ProgressStore>) -> Arc<AppState> {
    let app = Arc::new(AppState::new(store, RewardPolicy::default()));
    app.bootstrap().expect("Failed to bootstrap app");
    app
}

/// Delegates to an inner store. Individual operations can be switched to
/// fail at runtime.
pub struct FlakyStore<S> {
    inner: S,
    pub fail_reads: AtomicBool,
    pub fail_saves: AtomicBool,
    pub fail_item_saves: AtomicBool,
    pub fail_reset: AtomicBool,
}

impl<S: ProgressStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_saves: AtomicBool::new(false),
            fail_item_saves: AtomicBool::new(false),
            fail_reset: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check_reads(&self) -> StorageResult<()> {
        check(&self.fail_reads, "reads disabled")
    }
}

fn check(switch: &AtomicBool, reason: &str) -> StorageResult<()> {
    if switch.load(Ordering::SeqCst) {
        Err(StorageError::Unavailable(reason.to_string()))
    } else {
        Ok(())
    }
}

impl<S: ProgressStore> ProgressStore for FlakyStore<S> {
    fn init(&self) -> StorageResult<()> {
        self.check_reads()?;
        self.inner.init()
    }

    fn get_user_progress(&self) -> StorageResult<Option<UserProgress>> {
        self.check_reads()?;
        self.inner.get_user_progress()
    }

    fn save_user_progress(&self, progress: &UserProgress) -> StorageResult<()> {
        check(&self.fail_saves, "progress writes disabled")?;
        self.inner.save_user_progress(progress)
    }

    fn get_all_styling_items(&self) -> StorageResult<Vec<StylingItem>> {
        self.check_reads()?;
        self.inner.get_all_styling_items()
    }

    fn save_styling_items(&self, items: &[StylingItem]) -> StorageResult<()> {
        check(&self.fail_item_saves, "catalog writes disabled")?;
        self.inner.save_styling_items(items)
    }

    fn get_character_state(&self) -> StorageResult<Option<CharacterState>> {
        self.check_reads()?;
        self.inner.get_character_state()
    }

    fn save_character_state(&self, state: &CharacterState) -> StorageResult<()> {
        self.inner.save_character_state(state)
    }

    fn clear_all_data(&self) -> StorageResult<()> {
        check(&self.fail_reset, "reset disabled")?;
        self.inner.clear_all_data()
    }

    fn reset_to_seed(
        &self,
        progress: &UserProgress,
        items: &[StylingItem],
        character: &CharacterState,
    ) -> StorageResult<()> {
        check(&self.fail_reset, "reset disabled")?;
        self.inner.reset_to_seed(progress, items, character)
    }
}
