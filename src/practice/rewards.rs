use crate::storage::models::StylingItem;

pub const DEFAULT_UNLOCK_THRESHOLD: u32 = 5;

/// Streak-based unlock rule: every `threshold` consecutive correct answers
/// unlock the next locked item in catalog order. At most one item unlocks per
/// check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPolicy {
    threshold: u32,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_UNLOCK_THRESHOLD)
    }
}

impl RewardPolicy {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    pub fn unlock_threshold(&self) -> u32 {
        self.threshold
    }

    /// Correct answers collected towards the next unlock.
    pub fn progress_to_next_unlock(&self, streak: u32) -> u32 {
        streak % self.threshold
    }

    /// True when the streak moved from `previous` to `current` and crossed a
    /// multiple of the threshold on the way.
    pub fn is_unlock_due(&self, previous: u32, current: u32) -> bool {
        current > 0 && current / self.threshold > previous / self.threshold
    }

    /// Index of the first locked item in catalog order.
    pub fn next_locked_item(&self, items: &[StylingItem]) -> Option<usize> {
        items.iter().position(|item| !item.is_unlocked)
    }

    /// Flips the next locked item when an unlock is due and returns a copy of it.
    pub fn unlock_next(
        &self,
        items: &mut [StylingItem],
        previous: u32,
        current: u32,
    ) -> Option<StylingItem> {
        if !self.is_unlock_due(previous, current) {
            return None;
        }
        let index = self.next_locked_item(items)?;
        let item = &mut items[index];
        item.is_unlocked = true;
        Some(item.clone())
    }
}
