//! Saveable game state owners
//!
//! - `player`: transform, vitals, level and unlocks
//! - `quests`: quest states and completion history
//! - `riddles`: riddle attempts
//! - `world`: clock, weather and current scene
//! - `plants`: planted objects and growth stages
//!
//! Each type implements `Saveable`; wrap it with `save::shared` and register
//! the handle with the `SaveManager`.

pub mod plants;
pub mod player;
pub mod quests;
pub mod riddles;
pub mod world;

pub use plants::{Plant, PlantField};
pub use player::PlayerState;
pub use quests::{QuestLog, QuestProgress};
pub use riddles::{RiddleBook, RiddleProgress};
pub use world::WorldState;
