//! Persistent game-state save/load engine
//!
//! - `save`: the save system (coordinator, codec, file store, slot cache)
//! - `domains`: saveable gameplay state (player, quests, riddles, world, plants)
//! - `config`: save system configuration

pub mod config;
pub mod domains;
pub mod save;

pub use config::SaveConfig;
pub use save::{SaveError, SaveEvent, SaveManager};
