//! Math practice loop with streak-based avatar styling rewards.
//!
//! The crate is organised leaf-first:
//! - `practice`: problem generation, answer checking, difficulty and reward policies
//! - `storage`: the persistence store (SQLite and in-memory) behind `ProgressStore`
//! - `app`: the application state adapter (bootstrap, fetch-merge-write, unlocks)
//! - `session`: persisted ("MathTask") and transient ("Dojo") session controllers

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod navigation;
pub mod practice;
pub mod seed;
pub mod session;
pub mod storage;

pub use app::{AppSnapshot, AppState, LoadState, ProgressPatch, UnlockSummary};
pub use error::{AppError, AppResult};
