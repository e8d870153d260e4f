//! Save/Load system
//!
//! This module aggregates state from independent gameplay domains into
//! versioned, multi-slot save files and restores it across restarts:
//! - JSON save documents, optionally obfuscated
//! - Atomic writes with one backup generation per slot
//! - Slot metadata cached from header-only parses
//! - Single-flight saves and loads, optionally on a background thread
//! - Auto-save timer and quick-save/quick-load triggers
//!
//! # Architecture
//!
//! - `types`: Save data structures, payload schemas and events
//! - `error`: SaveError and its categories
//! - `saveable`: Saveable trait for domain collaborators
//! - `codec`: snapshot <-> bytes, validation and obfuscation
//! - `store`: crash-safe per-slot file storage
//! - `metadata`: slot listing cache
//! - `scene`: scene transition bridge
//! - `worker`: background I/O thread
//! - `manager`: SaveManager, the coordinator
//! - `scheduler`: auto-save and quick-save triggers
//!
//! # Example Usage
//!
//! ```ignore
//! let mut manager = SaveManager::new(SaveConfig::default(), "saves/default")?;
//! let player = shared(PlayerState::default());
//! manager.register(Rc::clone(&player));
//! manager.register(shared(WorldState::new("village")));
//!
//! manager.save_game(0, Some("Before the bridge"))?;
//! manager.load_game(0)?;
//! ```

pub mod codec;
pub mod error;
pub mod manager;
pub mod metadata;
pub mod saveable;
pub mod scene;
pub mod scheduler;
pub mod store;
pub mod types;
mod worker;

// Re-export commonly used types
pub use codec::SaveCodec;
pub use error::{ErrorCategory, SaveError};
pub use manager::SaveManager;
pub use metadata::MetadataCache;
pub use saveable::{SaveDomain, Saveable, Shared, shared};
pub use scene::{InstantSceneBridge, SceneBridge, SceneLoad, SceneLoadHandle, scene_load};
pub use scheduler::{PlayState, SaveAction, SaveScheduler};
pub use store::{FileStore, StagedWrite};
pub use types::*;
