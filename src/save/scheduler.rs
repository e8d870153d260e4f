//! Auto-save timer and quick-save/quick-load triggers
//!
//! The scheduler only decides *when*; every save or load goes through the
//! `SaveManager`, so the single-flight rule still applies. A failed auto-save
//! is logged and the timer starts over: it is never retried on the next frame.

use log::{debug, warn};

use super::error::SaveError;
use super::manager::SaveManager;
use super::types::OperationStatus;
use crate::config::SaveConfig;

/// Whether gameplay time is currently passing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Active,
    /// Pause menu, death screen, loading screen...
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    QuickSave,
    QuickLoad,
}

#[derive(Debug, Clone)]
pub struct SaveScheduler {
    auto_save_enabled: bool,
    interval_seconds: f64,
    elapsed_seconds: f64,
    quick_save_enabled: bool,
    quick_save_key: String,
    quick_load_key: String,
}

impl SaveScheduler {
    pub fn new(config: &SaveConfig) -> Self {
        SaveScheduler {
            auto_save_enabled: config.auto_save_enabled,
            interval_seconds: config.auto_save_interval_seconds,
            elapsed_seconds: 0.0,
            quick_save_enabled: config.quick_save_enabled,
            quick_save_key: config.quick_save_key.clone(),
            quick_load_key: config.quick_load_key.clone(),
        }
    }

    /// Accumulates active time; true when an auto-save is due
    ///
    /// The timer resets as soon as it fires, whatever the save's outcome.
    pub fn tick(&mut self, dt: f64, state: PlayState) -> bool {
        if !self.auto_save_enabled || state != PlayState::Active || dt <= 0.0 {
            return false;
        }
        self.elapsed_seconds += dt;
        if self.elapsed_seconds >= self.interval_seconds {
            self.elapsed_seconds = 0.0;
            return true;
        }
        false
    }

    /// Per-frame entry point
    ///
    /// Feeds active time into the manager's play-time counter, drives its
    /// pending work and fires an auto-save when due.
    pub fn update(
        &mut self,
        dt: f64,
        state: PlayState,
        manager: &mut SaveManager,
    ) -> Option<Result<OperationStatus, SaveError>> {
        if state == PlayState::Active {
            manager.add_play_time(dt);
        }
        manager.poll();

        if !self.tick(dt, state) {
            return None;
        }
        debug!("Auto-save interval reached");
        let result = manager.auto_save();
        if let Err(e) = &result {
            warn!("Auto-save failed, next attempt in {}s: {}", self.interval_seconds, e);
        }
        Some(result)
    }

    pub fn time_until_auto_save(&self) -> Option<f64> {
        self.auto_save_enabled
            .then(|| (self.interval_seconds - self.elapsed_seconds).max(0.0))
    }

    /// Maps a key name to a save action, ignoring case
    pub fn action_for_key(&self, key: &str) -> Option<SaveAction> {
        if !self.quick_save_enabled {
            return None;
        }
        if key.eq_ignore_ascii_case(&self.quick_save_key) {
            Some(SaveAction::QuickSave)
        } else if key.eq_ignore_ascii_case(&self.quick_load_key) {
            Some(SaveAction::QuickLoad)
        } else {
            None
        }
    }

    /// Runs a quick-save or quick-load; `None` while quick-save is disabled
    pub fn handle_action(
        &self,
        action: SaveAction,
        manager: &mut SaveManager,
    ) -> Option<Result<OperationStatus, SaveError>> {
        if !self.quick_save_enabled {
            return None;
        }
        Some(match action {
            SaveAction::QuickSave => manager.quick_save(),
            SaveAction::QuickLoad => manager.quick_load(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::{PlayerState, WorldState};
    use crate::save::saveable::shared;
    use crate::save::types::SaveEvent;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn config(interval: f64) -> SaveConfig {
        SaveConfig {
            auto_save_interval_seconds: interval,
            ..SaveConfig::default()
        }
    }

    fn manager_with_events(
        config: &SaveConfig,
        dir: &std::path::Path,
    ) -> (SaveManager, Rc<RefCell<Vec<SaveEvent>>>) {
        let mut manager = SaveManager::new(config.clone(), dir).unwrap();
        manager.register(shared(PlayerState::default()));
        manager.register(shared(WorldState::new("village")));
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        manager.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        (manager, events)
    }

    #[test]
    fn test_tick_fires_once_per_interval() {
        let mut scheduler = SaveScheduler::new(&config(10.0));
        assert!(!scheduler.tick(6.0, PlayState::Active));
        assert!(scheduler.tick(4.0, PlayState::Active));
        assert!(!scheduler.tick(9.0, PlayState::Active));
        assert_eq!(scheduler.time_until_auto_save(), Some(1.0));
    }

    #[test]
    fn test_paused_time_does_not_count() {
        let mut scheduler = SaveScheduler::new(&config(10.0));
        assert!(!scheduler.tick(60.0, PlayState::Paused));
        assert_eq!(scheduler.time_until_auto_save(), Some(10.0));
    }

    #[test]
    fn test_disabled_auto_save() {
        let mut cfg = config(1.0);
        cfg.auto_save_enabled = false;
        let mut scheduler = SaveScheduler::new(&cfg);
        assert!(!scheduler.tick(100.0, PlayState::Active));
        assert_eq!(scheduler.time_until_auto_save(), None);
    }

    #[test]
    fn test_two_triggers_within_interval_save_once() {
        let dir = tempdir().unwrap();
        let cfg = config(30.0);
        let (mut manager, events) = manager_with_events(&cfg, dir.path());
        let mut scheduler = SaveScheduler::new(&cfg);

        assert!(scheduler.update(30.0, PlayState::Active, &mut manager).is_some());
        assert!(scheduler.update(10.0, PlayState::Active, &mut manager).is_none());

        let saves = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, SaveEvent::Saved { .. }))
            .count();
        assert_eq!(saves, 1);
        assert_eq!(manager.play_time_seconds(), 40.0);
    }

    #[test]
    fn test_failed_auto_save_resets_timer() {
        let dir = tempdir().unwrap();
        let cfg = config(5.0);
        let mut manager = SaveManager::new(cfg.clone(), dir.path()).unwrap();
        let mut scheduler = SaveScheduler::new(&cfg);

        let result = scheduler.update(5.0, PlayState::Active, &mut manager);
        assert!(matches!(result, Some(Err(SaveError::CaptureFailed { .. }))));
        assert!(scheduler.update(1.0, PlayState::Active, &mut manager).is_none());
    }

    #[test]
    fn test_key_mapping() {
        let scheduler = SaveScheduler::new(&SaveConfig::default());
        assert_eq!(scheduler.action_for_key("f5"), Some(SaveAction::QuickSave));
        assert_eq!(scheduler.action_for_key("F9"), Some(SaveAction::QuickLoad));
        assert_eq!(scheduler.action_for_key("F1"), None);

        let disabled = SaveScheduler::new(&SaveConfig {
            quick_save_enabled: false,
            ..SaveConfig::default()
        });
        assert_eq!(disabled.action_for_key("F5"), None);
    }

    #[test]
    fn test_quick_actions_use_quick_slot() {
        let dir = tempdir().unwrap();
        let cfg = SaveConfig {
            quick_save_slot: 3,
            ..SaveConfig::default()
        };
        let (mut manager, _events) = manager_with_events(&cfg, dir.path());
        let scheduler = SaveScheduler::new(&cfg);

        let saved = scheduler.handle_action(SaveAction::QuickSave, &mut manager);
        assert!(matches!(saved, Some(Ok(OperationStatus::Completed))));
        assert!(manager.has_save_file(3));

        let loaded = scheduler.handle_action(SaveAction::QuickLoad, &mut manager);
        assert!(matches!(loaded, Some(Ok(OperationStatus::Completed))));
    }
}
