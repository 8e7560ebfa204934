use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The app state was used before `AppState::bootstrap` completed.
    #[error("app state is not ready; call bootstrap() first")]
    NotReady,

    #[error("reset failed, nothing was changed, please retry: {0}")]
    Reset(#[source] StorageError),

    #[error("unknown styling item: {0}")]
    UnknownItem(String),

    #[error("styling item is still locked: {0}")]
    ItemLocked(String),

    #[error("styling item is not a colour: {0}")]
    NotAColor(String),

    #[error("lock poisoned: {0}")]
    Lock(String),
}

pub type AppResult<T> = Result<T, AppError>;
