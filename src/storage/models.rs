//! Persisted records and their row mappings.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};

use crate::practice::difficulty::MIN_DIFFICULTY;
use crate::practice::topic::Topic;
use crate::storage::StorageResult;

/// The single progress row always has this id.
pub const PROGRESS_ID: i64 = 1;
/// The single character row always has this id.
pub const CHARACTER_ID: i64 = 1;

// ============================================================
// UserProgress
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub id: i64,
    pub difficulty_level_addition: u8,
    pub difficulty_level_subtraction: u8,
    pub difficulty_level_multiplication: u8,
    pub difficulty_level_division: u8,
    pub difficulty_level_geometry: u8,
    pub difficulty_level_sizes: u8,
    pub correct_answers_streak: u32,
    pub total_correct_answers: u32,
    pub total_incorrect_answers: u32,
    pub last_session_date: Option<DateTime<Utc>>,
}

impl UserProgress {
    /// Fresh progress: every topic at the lowest difficulty, all counters zero.
    pub fn initial() -> Self {
        Self {
            id: PROGRESS_ID,
            difficulty_level_addition: MIN_DIFFICULTY,
            difficulty_level_subtraction: MIN_DIFFICULTY,
            difficulty_level_multiplication: MIN_DIFFICULTY,
            difficulty_level_division: MIN_DIFFICULTY,
            difficulty_level_geometry: MIN_DIFFICULTY,
            difficulty_level_sizes: MIN_DIFFICULTY,
            correct_answers_streak: 0,
            total_correct_answers: 0,
            total_incorrect_answers: 0,
            last_session_date: None,
        }
    }

    pub fn difficulty_for(&self, topic: Topic) -> u8 {
        match topic {
            Topic::Addition => self.difficulty_level_addition,
            Topic::Subtraction => self.difficulty_level_subtraction,
            Topic::Multiplication => self.difficulty_level_multiplication,
            Topic::Division => self.difficulty_level_division,
            Topic::Geometry => self.difficulty_level_geometry,
            Topic::Sizes => self.difficulty_level_sizes,
        }
    }

    pub fn set_difficulty(&mut self, topic: Topic, difficulty: u8) {
        let slot = match topic {
            Topic::Addition => &mut self.difficulty_level_addition,
            Topic::Subtraction => &mut self.difficulty_level_subtraction,
            Topic::Multiplication => &mut self.difficulty_level_multiplication,
            Topic::Division => &mut self.difficulty_level_division,
            Topic::Geometry => &mut self.difficulty_level_geometry,
            Topic::Sizes => &mut self.difficulty_level_sizes,
        };
        *slot = difficulty;
    }

    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            difficulty_level_addition: row.get("difficulty_level_addition")?,
            difficulty_level_subtraction: row.get("difficulty_level_subtraction")?,
            difficulty_level_multiplication: row.get("difficulty_level_multiplication")?,
            difficulty_level_division: row.get("difficulty_level_division")?,
            difficulty_level_geometry: row.get("difficulty_level_geometry")?,
            difficulty_level_sizes: row.get("difficulty_level_sizes")?,
            correct_answers_streak: row.get("correct_answers_streak")?,
            total_correct_answers: row.get("total_correct_answers")?,
            total_incorrect_answers: row.get("total_incorrect_answers")?,
            last_session_date: row
                .get::<_, Option<String>>("last_session_date")?
                .and_then(parse_datetime),
        })
    }

    /// Whole-record replace. The id is always forced to the singleton id.
    pub fn upsert(&self, conn: &Connection) -> StorageResult<()> {
        conn.execute(
            r#"
            INSERT INTO user_progress (
                id, difficulty_level_addition, difficulty_level_subtraction,
                difficulty_level_multiplication, difficulty_level_division,
                difficulty_level_geometry, difficulty_level_sizes,
                correct_answers_streak, total_correct_answers, total_incorrect_answers,
                last_session_date, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12
            )
            ON CONFLICT(id) DO UPDATE SET
                difficulty_level_addition = excluded.difficulty_level_addition,
                difficulty_level_subtraction = excluded.difficulty_level_subtraction,
                difficulty_level_multiplication = excluded.difficulty_level_multiplication,
                difficulty_level_division = excluded.difficulty_level_division,
                difficulty_level_geometry = excluded.difficulty_level_geometry,
                difficulty_level_sizes = excluded.difficulty_level_sizes,
                correct_answers_streak = excluded.correct_answers_streak,
                total_correct_answers = excluded.total_correct_answers,
                total_incorrect_answers = excluded.total_incorrect_answers,
                last_session_date = excluded.last_session_date,
                updated_at = excluded.updated_at
            "#,
            params![
                PROGRESS_ID,
                self.difficulty_level_addition,
                self.difficulty_level_subtraction,
                self.difficulty_level_multiplication,
                self.difficulty_level_division,
                self.difficulty_level_geometry,
                self.difficulty_level_sizes,
                self.correct_answers_streak,
                self.total_correct_answers,
                self.total_incorrect_answers,
                self.last_session_date.map(format_datetime),
                format_datetime(Utc::now()),
            ],
        )?;
        Ok(())
    }
}

// ============================================================
// StylingItem
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Color,
    Accessory,
    Effect,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Color => "color",
            ItemType::Accessory => "accessory",
            ItemType::Effect => "effect",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "color" => Some(ItemType::Color),
            "accessory" => Some(ItemType::Accessory),
            "effect" => Some(ItemType::Effect),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSize {
    Small,
    Medium,
    Large,
}

impl ItemSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSize::Small => "small",
            ItemSize::Medium => "medium",
            ItemSize::Large => "large",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "small" => Some(ItemSize::Small),
            "medium" => Some(ItemSize::Medium),
            "large" => Some(ItemSize::Large),
            _ => None,
        }
    }
}

/// Placement in percent of the avatar canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylingItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub name: String,
    pub asset_reference: String,
    pub is_unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ItemSize>,
}

impl StylingItem {
    pub fn new(
        id: impl Into<String>,
        item_type: ItemType,
        name: impl Into<String>,
        asset_reference: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            item_type,
            name: name.into(),
            asset_reference: asset_reference.into(),
            is_unlocked: false,
            category: None,
            default_position: None,
            size: None,
        }
    }

    pub fn unlocked(mut self) -> Self {
        self.is_unlocked = true;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_placement(mut self, x: f64, y: f64, size: ItemSize) -> Self {
        self.default_position = Some(Position::new(x, y));
        self.size = Some(size);
        self
    }

    pub fn is_color(&self) -> bool {
        self.item_type == ItemType::Color
    }

    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        let item_type: String = row.get("item_type")?;
        let default_x: Option<f64> = row.get("default_x")?;
        let default_y: Option<f64> = row.get("default_y")?;

        Ok(Self {
            id: row.get("id")?,
            item_type: ItemType::from_str(&item_type).unwrap_or(ItemType::Accessory),
            name: row.get("name")?,
            asset_reference: row.get("asset_reference")?,
            is_unlocked: row.get::<_, i32>("is_unlocked")? != 0,
            category: row.get("category")?,
            default_position: default_x.zip(default_y).map(|(x, y)| Position::new(x, y)),
            size: row
                .get::<_, Option<String>>("size")?
                .as_deref()
                .and_then(ItemSize::from_str),
        })
    }

    /// `sort_order` is used for new rows only; an existing row keeps its place.
    pub fn upsert(&self, conn: &Connection, sort_order: usize) -> StorageResult<()> {
        conn.execute(
            r#"
            INSERT INTO styling_item (
                id, item_type, name, asset_reference, is_unlocked, category,
                default_x, default_y, size, sort_order, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11
            )
            ON CONFLICT(id) DO UPDATE SET
                item_type = excluded.item_type,
                name = excluded.name,
                asset_reference = excluded.asset_reference,
                is_unlocked = excluded.is_unlocked,
                category = excluded.category,
                default_x = excluded.default_x,
                default_y = excluded.default_y,
                size = excluded.size,
                updated_at = excluded.updated_at
            "#,
            params![
                self.id,
                self.item_type.as_str(),
                self.name,
                self.asset_reference,
                self.is_unlocked as i32,
                self.category,
                self.default_position.map(|p| p.x),
                self.default_position.map(|p| p.y),
                self.size.map(|s| s.as_str()),
                sort_order as i64,
                format_datetime(Utc::now()),
            ],
        )?;
        Ok(())
    }
}

// ============================================================
// CharacterState
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedStyling {
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl AppliedStyling {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            position: None,
            scale: None,
            rotation: None,
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterState {
    pub applied_items: Vec<AppliedStyling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl CharacterState {
    /// Adds the styling, replacing any existing entry with the same item id.
    pub fn apply(&mut self, styling: AppliedStyling) {
        match self
            .applied_items
            .iter_mut()
            .find(|applied| applied.item_id == styling.item_id)
        {
            Some(existing) => *existing = styling,
            None => self.applied_items.push(styling),
        }
    }

    pub fn remove(&mut self, item_id: &str) -> bool {
        let before = self.applied_items.len();
        self.applied_items.retain(|applied| applied.item_id != item_id);
        self.applied_items.len() != before
    }

    pub fn is_applied(&self, item_id: &str) -> bool {
        self.applied_items.iter().any(|applied| applied.item_id == item_id)
    }

    pub fn clear(&mut self) {
        self.applied_items.clear();
        self.background_color = None;
    }

    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        let applied_json: String = row.get("applied_items")?;
        let applied_items = serde_json::from_str(&applied_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Self {
            applied_items,
            background_color: row.get("background_color")?,
        })
    }

    pub fn upsert(&self, conn: &Connection) -> StorageResult<()> {
        let applied_json = serde_json::to_string(&self.applied_items)?;
        conn.execute(
            r#"
            INSERT INTO character_state (id, applied_items, background_color, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                applied_items = excluded.applied_items,
                background_color = excluded.background_color,
                updated_at = excluded.updated_at
            "#,
            params![
                CHARACTER_ID,
                applied_json,
                self.background_color,
                format_datetime(Utc::now()),
            ],
        )?;
        Ok(())
    }
}

// ============================================================
// Helpers
// ============================================================

fn parse_datetime(s: String) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Some(dt.with_timezone(&Utc));
    }

    chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}
