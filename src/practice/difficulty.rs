use serde::{Deserialize, Serialize};

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 10;
const DEFAULT_STEP: u8 = 1;

/// Bounded step function applied after every answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyPolicy {
    pub min: u8,
    pub max: u8,
    pub step: u8,
}

impl Default for DifficultyPolicy {
    fn default() -> Self {
        Self {
            min: MIN_DIFFICULTY,
            max: MAX_DIFFICULTY,
            step: DEFAULT_STEP,
        }
    }
}

impl DifficultyPolicy {
    pub fn new(min: u8, max: u8, step: u8) -> Self {
        let min = min.max(MIN_DIFFICULTY);
        Self {
            min,
            max: max.max(min),
            step: step.max(1),
        }
    }

    /// Same step, narrower range. Used for dojo subtopics.
    pub fn within(&self, min: u8, max: u8) -> Self {
        Self::new(min, max, self.step)
    }

    pub fn clamp(&self, difficulty: u8) -> u8 {
        difficulty.clamp(self.min, self.max)
    }

    /// One step up on a correct answer, one step down otherwise.
    pub fn adjust(&self, current: u8, was_correct: bool) -> u8 {
        let current = self.clamp(current);
        if was_correct {
            self.clamp(current.saturating_add(self.step))
        } else {
            self.clamp(current.saturating_sub(self.step))
        }
    }
}

pub fn adjust_difficulty(current: u8, was_correct: bool) -> u8 {
    DifficultyPolicy::default().adjust(current, was_correct)
}
