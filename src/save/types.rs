//! Save data types
//!
//! This module defines the data structures that make up a save file: the
//! header, the snapshot aggregate, the per-slot metadata used for listings,
//! the domain payload schemas and the events the coordinator emits.
//! It uses Serde for serialization/deserialization to JSON format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::error::ErrorCategory;

/// Current save file version
pub const CURRENT_SAVE_VERSION: u32 = 1;

/// Every schema version the codec can decode
pub const SUPPORTED_SAVE_VERSIONS: &[u32] = &[CURRENT_SAVE_VERSION];

/// A gameplay subsystem that owns a slice of saveable state
///
/// The derived ordering is the apply order on load: later domains may
/// reference entities (the player transform) set up by earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Player,
    Quests,
    Riddles,
    World,
    Plants,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Player,
        Domain::Quests,
        Domain::Riddles,
        Domain::World,
        Domain::Plants,
    ];

    /// Stable payload key in the save document
    pub fn key(self) -> &'static str {
        match self {
            Domain::Player => "player",
            Domain::Quests => "quests",
            Domain::Riddles => "riddles",
            Domain::World => "world",
            Domain::Plants => "plants",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key() == key)
    }

    /// Domains a loadable file must contain
    pub fn is_required(self) -> bool {
        matches!(self, Domain::Player | Domain::World)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Header written at the top of every save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveHeader {
    pub name: String,
    pub guid: Uuid,
    pub created_at: DateTime<Utc>,
    pub schema_version: u32,
    pub total_play_time_seconds: f64,
}

/// The atomic unit of persistence: header plus one payload per domain
///
/// Payloads stay opaque JSON values here; each collaborator knows its own
/// schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSnapshot {
    pub header: SaveHeader,
    pub domains: BTreeMap<String, Value>,
}

impl SaveSnapshot {
    pub fn payload(&self, domain: Domain) -> Option<&Value> {
        self.domains.get(domain.key())
    }

    /// Scene the world domain was in when the snapshot was captured
    pub fn scene_id(&self) -> Option<&str> {
        self.payload(Domain::World)?
            .get("current_scene_id")?
            .as_str()
    }
}

/// Lightweight per-slot summary used to render a slot list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub slot: usize,
    pub name: String,
    pub guid: Uuid,
    pub created_at: DateTime<Utc>,
    pub schema_version: u32,
    pub total_play_time_seconds: f64,
    pub player_level: Option<u32>,
    pub scene_id: Option<String>,
}

impl SaveMetadata {
    pub fn from_snapshot(slot: usize, snapshot: &SaveSnapshot) -> Self {
        let player_level = snapshot
            .payload(Domain::Player)
            .and_then(|p| p.get("level"))
            .and_then(Value::as_u64)
            .and_then(|level| u32::try_from(level).ok());

        SaveMetadata {
            slot,
            name: snapshot.header.name.clone(),
            guid: snapshot.header.guid,
            created_at: snapshot.header.created_at,
            schema_version: snapshot.header.schema_version,
            total_play_time_seconds: snapshot.header.total_play_time_seconds,
            player_level,
            scene_id: snapshot.scene_id().map(str::to_string),
        }
    }
}

/// Cached state of a single slot
#[derive(Debug, Clone, PartialEq)]
pub enum SlotStatus {
    Empty,
    /// A file exists but its header could not be read
    Unreadable { reason: String },
    Occupied(SaveMetadata),
}

/// One row of a slot listing
#[derive(Debug, Clone, PartialEq)]
pub struct SlotEntry {
    pub slot: usize,
    pub status: SlotStatus,
}

impl SlotEntry {
    pub fn metadata(&self) -> Option<&SaveMetadata> {
        match &self.status {
            SlotStatus::Occupied(meta) => Some(meta),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata().map(|m| m.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.status, SlotStatus::Empty)
    }

    pub fn is_unreadable(&self) -> bool {
        matches!(self.status, SlotStatus::Unreadable { .. })
    }
}

// === Domain payload schemas ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSaveData {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
    pub health: f32,
    pub max_health: f32,
    #[serde(default)]
    pub mana: Option<f32>,
    pub stamina: f32,
    pub level: u32,
    pub experience: u64,
    #[serde(default)]
    pub unlocked_ability_ids: Vec<String>,
    #[serde(default)]
    pub discovered_entry_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestState {
    NotStarted,
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestSaveData {
    pub quest_id: String,
    pub state: QuestState,
    #[serde(default)]
    pub last_completed_at: Option<DateTime<Utc>>,
    pub times_completed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiddleSaveData {
    pub riddle_id: String,
    pub answered: bool,
    pub was_correct: bool,
    pub attempt_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSaveData {
    pub game_time_seconds: f64,
    pub time_of_day_hours: f32,
    pub days_elapsed: u32,
    pub weather_id: String,
    pub current_scene_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantSaveData {
    pub position: [f32; 3],
    pub species_id: String,
    pub growth_stage: u8,
}

// === Operations and events ===

/// Which public operation an event or error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Save,
    Load,
    Delete,
    QuickSave,
    QuickLoad,
    AutoSave,
    RestoreBackup,
}

/// Whether an accepted operation finished inside the call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Completed,
    /// Background I/O or a scene transition is still running; the outcome
    /// arrives as an event from `SaveManager::poll`.
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveEvent {
    Saved {
        slot: usize,
        kind: OperationKind,
    },
    Loaded {
        slot: usize,
        kind: OperationKind,
    },
    Deleted {
        slot: usize,
    },
    Error {
        kind: OperationKind,
        slot: Option<usize>,
        category: ErrorCategory,
        message: String,
    },
}
