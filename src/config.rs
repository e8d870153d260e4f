//! Save system configuration
//!
//! Loaded from a JSON file; every field has a default so a partial (or
//! missing) config file still yields a usable setup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::save::SaveError;

const DEFAULT_OBFUSCATION_KEY: &str = "gamesave-obfuscation";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    pub number_of_slots: usize,
    pub save_directory_name: String,
    /// One directory per save profile under `save_directory_name`
    pub profile: String,
    /// Obfuscate new save files (not real encryption)
    pub encrypt_saves: bool,
    pub obfuscation_key: String,
    pub create_backups: bool,
    pub auto_save_enabled: bool,
    pub auto_save_interval_seconds: f64,
    /// `None` saves into the last slot used
    pub auto_save_slot: Option<usize>,
    pub quick_save_enabled: bool,
    pub quick_save_slot: usize,
    pub quick_save_key: String,
    pub quick_load_key: String,
    /// Run slot reads and writes on a worker thread
    pub background_io: bool,
    pub debug_logging: bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        SaveConfig {
            number_of_slots: 5,
            save_directory_name: "saves".to_string(),
            profile: "default".to_string(),
            encrypt_saves: false,
            obfuscation_key: DEFAULT_OBFUSCATION_KEY.to_string(),
            create_backups: true,
            auto_save_enabled: true,
            auto_save_interval_seconds: 300.0, // 5 minutes
            auto_save_slot: None,
            quick_save_enabled: true,
            quick_save_slot: 0,
            quick_save_key: "F5".to_string(),
            quick_load_key: "F9".to_string(),
            background_io: false,
            debug_logging: false,
        }
    }
}

impl SaveConfig {
    /// Reads a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SaveError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: SaveConfig = serde_json::from_str(&text)
            .map_err(|e| SaveError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SaveError> {
        if self.number_of_slots == 0 {
            return Err(SaveError::Config("number_of_slots must be at least 1".into()));
        }
        if self.save_directory_name.trim().is_empty() {
            return Err(SaveError::Config("save_directory_name is empty".into()));
        }
        if self.quick_save_slot >= self.number_of_slots {
            return Err(SaveError::Config(format!(
                "quick_save_slot {} is outside 0..{}",
                self.quick_save_slot, self.number_of_slots
            )));
        }
        if let Some(slot) = self.auto_save_slot {
            if slot >= self.number_of_slots {
                return Err(SaveError::Config(format!(
                    "auto_save_slot {} is outside 0..{}",
                    slot, self.number_of_slots
                )));
            }
        }
        if !(self.auto_save_interval_seconds > 0.0) {
            return Err(SaveError::Config(
                "auto_save_interval_seconds must be positive".into(),
            ));
        }
        if self.encrypt_saves && self.obfuscation_key.is_empty() {
            return Err(SaveError::Config(
                "encrypt_saves requires a non-empty obfuscation_key".into(),
            ));
        }
        Ok(())
    }

    /// Per-user data directory, or the working directory if there is none
    pub fn default_base_dir() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join("gamesave"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// `<base>/<save_directory_name>/<profile>`
    pub fn profile_dir(&self, base: impl AsRef<Path>) -> PathBuf {
        base.as_ref()
            .join(&self.save_directory_name)
            .join(&self.profile)
    }
}
