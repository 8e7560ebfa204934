use std::path::PathBuf;
use std::time::Duration;

use crate::practice::rewards::{RewardPolicy, DEFAULT_UNLOCK_THRESHOLD};

const DEFAULT_ADVANCE_DELAY_MS: u64 = 1500;
const DB_FILE_NAME: &str = "progress.db";
const APP_DIR_NAME: &str = "mathe-stylistin";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_level: String,
    pub unlock_threshold: u32,
    pub advance_delay: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let db_path = std::env::var("MATHE_DB_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let unlock_threshold = std::env::var("UNLOCK_THRESHOLD")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_UNLOCK_THRESHOLD);

        let advance_delay = std::env::var("ADVANCE_DELAY_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_ADVANCE_DELAY_MS));

        Self {
            db_path,
            log_level,
            unlock_threshold,
            advance_delay,
        }
    }

    pub fn reward_policy(&self) -> RewardPolicy {
        RewardPolicy::new(self.unlock_threshold)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: "info".to_string(),
            unlock_threshold: DEFAULT_UNLOCK_THRESHOLD,
            advance_delay: Duration::from_millis(DEFAULT_ADVANCE_DELAY_MS),
        }
    }
}

pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(DB_FILE_NAME)
}
