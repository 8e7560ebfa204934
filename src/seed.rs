use crate::storage::models::{CharacterState, ItemSize, ItemType, StylingItem, UserProgress};
use crate::storage::{ProgressStore, StorageResult};

struct SeedItem {
    id: &'static str,
    item_type: ItemType,
    name: &'static str,
    asset: &'static str,
    unlocked: bool,
    category: Option<&'static str>,
    placement: Option<(f64, f64, ItemSize)>,
}

/// Catalog order is unlock order.
const SEED_ITEMS: &[SeedItem] = &[
    SeedItem {
        id: "color-pink",
        item_type: ItemType::Color,
        name: "Rosa",
        asset: "#FFB6C1",
        unlocked: true,
        category: Some("background"),
        placement: None,
    },
    SeedItem {
        id: "color-blue",
        item_type: ItemType::Color,
        name: "Blau",
        asset: "#87CEEB",
        unlocked: true,
        category: Some("background"),
        placement: None,
    },
    SeedItem {
        id: "accessory-glasses-1",
        item_type: ItemType::Accessory,
        name: "Coole Brille",
        asset: "🕶️",
        unlocked: true,
        category: Some("face"),
        placement: Some((50.0, 38.0, ItemSize::Medium)),
    },
    SeedItem {
        id: "color-purple",
        item_type: ItemType::Color,
        name: "Lila",
        asset: "#DDA0DD",
        unlocked: false,
        category: Some("background"),
        placement: None,
    },
    SeedItem {
        id: "accessory-hat-1",
        item_type: ItemType::Accessory,
        name: "Partyhut",
        asset: "🎉",
        unlocked: false,
        category: Some("head"),
        placement: Some((50.0, 8.0, ItemSize::Large)),
    },
    SeedItem {
        id: "accessory-bow",
        item_type: ItemType::Accessory,
        name: "Schleife",
        asset: "🎀",
        unlocked: false,
        category: Some("head"),
        placement: Some((68.0, 14.0, ItemSize::Small)),
    },
    SeedItem {
        id: "effect-sparkles",
        item_type: ItemType::Effect,
        name: "Glitzer",
        asset: "✨",
        unlocked: false,
        category: None,
        placement: Some((80.0, 20.0, ItemSize::Medium)),
    },
    SeedItem {
        id: "color-mint",
        item_type: ItemType::Color,
        name: "Mint",
        asset: "#98FF98",
        unlocked: false,
        category: Some("background"),
        placement: None,
    },
    SeedItem {
        id: "accessory-crown",
        item_type: ItemType::Accessory,
        name: "Krone",
        asset: "👑",
        unlocked: false,
        category: Some("head"),
        placement: Some((50.0, 6.0, ItemSize::Large)),
    },
    SeedItem {
        id: "accessory-flower",
        item_type: ItemType::Accessory,
        name: "Blume",
        asset: "🌸",
        unlocked: false,
        category: Some("head"),
        placement: Some((32.0, 14.0, ItemSize::Small)),
    },
    SeedItem {
        id: "effect-rainbow",
        item_type: ItemType::Effect,
        name: "Regenbogen",
        asset: "🌈",
        unlocked: false,
        category: None,
        placement: Some((50.0, 90.0, ItemSize::Large)),
    },
    SeedItem {
        id: "color-gold",
        item_type: ItemType::Color,
        name: "Gold",
        asset: "#FFD700",
        unlocked: false,
        category: Some("background"),
        placement: None,
    },
    SeedItem {
        id: "effect-stars",
        item_type: ItemType::Effect,
        name: "Sterne",
        asset: "⭐",
        unlocked: false,
        category: None,
        placement: Some((20.0, 20.0, ItemSize::Medium)),
    },
    SeedItem {
        id: "accessory-headphones",
        item_type: ItemType::Accessory,
        name: "Kopfhörer",
        asset: "🎧",
        unlocked: false,
        category: Some("head"),
        placement: Some((50.0, 30.0, ItemSize::Large)),
    },
];

pub fn initial_user_progress() -> UserProgress {
    UserProgress::initial()
}

pub fn initial_styling_items() -> Vec<StylingItem> {
    SEED_ITEMS
        .iter()
        .map(|seed| {
            let mut item = StylingItem::new(seed.id, seed.item_type, seed.name, seed.asset);
            item.is_unlocked = seed.unlocked;
            if let Some(category) = seed.category {
                item = item.with_category(category);
            }
            if let Some((x, y, size)) = seed.placement {
                item = item.with_placement(x, y, size);
            }
            item
        })
        .collect()
}

pub fn initial_character_state() -> CharacterState {
    CharacterState::default()
}

/// Records as they stand after seeding.
#[derive(Debug, Clone)]
pub struct SeededRecords {
    pub progress: UserProgress,
    pub items: Vec<StylingItem>,
    pub character: CharacterState,
}

/// Reads all three records and writes the seed for any that is missing.
pub fn seed_missing(store: &dyn ProgressStore) -> StorageResult<SeededRecords> {
    let progress = match store.get_user_progress()? {
        Some(progress) => {
            tracing::debug!("user progress already exists");
            progress
        }
        None => {
            let progress = initial_user_progress();
            store.save_user_progress(&progress)?;
            tracing::info!("seeded initial user progress");
            progress
        }
    };

    let items = {
        let existing = store.get_all_styling_items()?;
        if existing.is_empty() {
            let items = initial_styling_items();
            store.save_styling_items(&items)?;
            tracing::info!(count = items.len(), "seeded styling catalog");
            items
        } else {
            tracing::debug!(count = existing.len(), "styling catalog already exists");
            existing
        }
    };

    let character = match store.get_character_state()? {
        Some(character) => character,
        None => {
            let character = initial_character_state();
            store.save_character_state(&character)?;
            tracing::info!("seeded empty character state");
            character
        }
    };

    Ok(SeededRecords {
        progress,
        items,
        character,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Storage};
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_unique() {
        let items = initial_styling_items();
        let ids: HashSet<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), items.len());
    }

    #[test]
    fn test_catalog_starts_partly_unlocked() {
        let items = initial_styling_items();
        let unlocked = items.iter().filter(|i| i.is_unlocked).count();
        assert_eq!(unlocked, 3);
        assert!(items.iter().any(|i| !i.is_unlocked));
        // unlocked items come first so unlock order is catalog order
        assert!(items[..unlocked].iter().all(|i| i.is_unlocked));
    }

    #[test]
    fn test_color_items_have_hex_assets() {
        for item in initial_styling_items().iter().filter(|i| i.is_color()) {
            assert!(item.asset_reference.starts_with('#'), "{}", item.id);
            assert!(item.default_position.is_none());
        }
    }

    #[test]
    fn test_seed_missing_writes_once() {
        let store = Storage::in_memory().expect("Failed to create in-memory storage");
        let first = seed_missing(&store).expect("Failed to seed");
        assert_eq!(first.items, initial_styling_items());

        let mut progress = first.progress.clone();
        progress.total_correct_answers = 17;
        store.save_user_progress(&progress).unwrap();

        let second = seed_missing(&store).expect("Failed to seed again");
        assert_eq!(second.progress.total_correct_answers, 17);
    }

    #[test]
    fn test_seed_missing_keeps_existing_catalog() {
        let store = MemoryStore::new();
        let mut items = initial_styling_items();
        items.truncate(2);
        store.save_styling_items(&items).unwrap();

        let seeded = seed_missing(&store).unwrap();
        assert_eq!(seeded.items.len(), 2);
        assert_eq!(seeded.character, initial_character_state());
    }
}
