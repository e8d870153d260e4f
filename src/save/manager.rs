//! Save manager: the state capture/restore coordinator
//!
//! This module provides the SaveManager struct which handles:
//! - Capturing every registered domain into a snapshot and writing it
//! - Loading a slot, switching scenes when needed, and applying domains in order
//! - Deleting slots and restoring backups
//! - Keeping the slot metadata cache current
//! - Emitting saved/loaded/error events
//!
//! Only one save or load runs at a time. A request that arrives while another
//! is in flight is rejected with `SaveError::Busy`, never queued.

use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::codec::SaveCodec;
use super::error::SaveError;
use super::metadata::MetadataCache;
use super::saveable::SaveDomain;
use super::scene::{SceneBridge, SceneLoad, scene_load};
use super::store::FileStore;
use super::types::*;
use super::worker::{IoJob, IoOutcome, IoWorker};
use crate::config::SaveConfig;

type Listener = Box<dyn FnMut(&SaveEvent)>;

/// An accepted operation that has not finished yet
enum Pending {
    Write {
        kind: OperationKind,
        slot: usize,
        metadata: SaveMetadata,
    },
    Read {
        kind: OperationKind,
        slot: usize,
    },
    Scene {
        kind: OperationKind,
        slot: usize,
        scene: String,
        snapshot: SaveSnapshot,
        load: SceneLoad,
    },
}

pub struct SaveManager {
    config: SaveConfig,
    store: FileStore,
    codec: SaveCodec,
    cache: MetadataCache,
    domains: Vec<Box<dyn SaveDomain>>,
    scenes: Option<Box<dyn SceneBridge>>,
    listeners: Vec<Listener>,
    worker: Option<IoWorker>,
    pending: Option<Pending>,
    play_time_seconds: f64,
    last_used_slot: Option<usize>,
}

impl SaveManager {
    /// Creates a SaveManager storing slots in `save_directory`
    ///
    /// The directory is created if it doesn't exist, staging files left by an
    /// interrupted write are removed and the slot metadata is scanned.
    pub fn new(config: SaveConfig, save_directory: impl AsRef<Path>) -> Result<Self, SaveError> {
        config.validate()?;

        let store = FileStore::open(save_directory, config.create_backups)?;
        match store.clean_stale_temp() {
            Ok(0) => {}
            Ok(n) => info!("Removed {} interrupted save file(s)", n),
            Err(e) => warn!("Could not clean staging files: {}", e),
        }

        let codec = SaveCodec::from_config(&config)?;
        let cache = MetadataCache::scan(&store, &codec, config.number_of_slots);
        let last_used_slot = cache.most_recent_slot();
        let worker = if config.background_io {
            Some(IoWorker::spawn(store.clone())?)
        } else {
            None
        };

        info!(
            "Save manager ready: {} slots in {}",
            config.number_of_slots,
            store.directory().display()
        );

        Ok(SaveManager {
            config,
            store,
            codec,
            cache,
            domains: Vec::new(),
            scenes: None,
            listeners: Vec::new(),
            worker,
            pending: None,
            play_time_seconds: 0.0,
            last_used_slot,
        })
    }

    /// Creates a SaveManager in the per-user profile directory
    pub fn with_default_directory(config: SaveConfig) -> Result<Self, SaveError> {
        let dir = config.profile_dir(SaveConfig::default_base_dir());
        Self::new(config, dir)
    }

    /// Finishes any in-flight disk operation and stops the I/O worker
    pub fn shutdown(mut self) {
        while self.worker.is_some()
            && matches!(
                self.pending,
                Some(Pending::Write { .. } | Pending::Read { .. })
            )
        {
            self.drive_io(true);
        }
        if let Some(Pending::Scene { scene, slot, .. }) = self.pending.take() {
            warn!(
                "Shutting down while scene '{}' loads; slot {} was not applied",
                scene, slot
            );
        }
        info!("Save manager shut down");
    }

    // === Registration ===

    /// Registers a domain collaborator
    ///
    /// A second collaborator for the same domain replaces the first.
    pub fn register(&mut self, collaborator: impl SaveDomain + 'static) {
        let domain = collaborator.domain();
        if let Some(index) = self.domains.iter().position(|d| d.domain() == domain) {
            warn!("Replacing collaborator registered for {}", domain);
            self.domains.remove(index);
        }
        self.domains.push(Box::new(collaborator));
        self.domains.sort_by_key(|d| d.domain());
    }

    pub fn set_scene_bridge(&mut self, bridge: impl SceneBridge + 'static) {
        self.scenes = Some(Box::new(bridge));
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SaveEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // === Public operations ===

    pub fn save_game(
        &mut self,
        slot: usize,
        name: Option<&str>,
    ) -> Result<OperationStatus, SaveError> {
        let result = self.begin_save(OperationKind::Save, slot, name);
        self.report(OperationKind::Save, Some(slot), result)
    }

    pub fn load_game(&mut self, slot: usize) -> Result<OperationStatus, SaveError> {
        let result = self.begin_load(OperationKind::Load, slot);
        self.report(OperationKind::Load, Some(slot), result)
    }

    pub fn quick_save(&mut self) -> Result<OperationStatus, SaveError> {
        let slot = self.config.quick_save_slot;
        let result = self.begin_save(OperationKind::QuickSave, slot, None);
        self.report(OperationKind::QuickSave, Some(slot), result)
    }

    pub fn quick_load(&mut self) -> Result<OperationStatus, SaveError> {
        let slot = self.config.quick_save_slot;
        let result = self.begin_load(OperationKind::QuickLoad, slot);
        self.report(OperationKind::QuickLoad, Some(slot), result)
    }

    /// Saves into the configured auto-save slot, or the last slot used
    pub fn auto_save(&mut self) -> Result<OperationStatus, SaveError> {
        let slot = self.auto_save_slot();
        let result = self.begin_save(OperationKind::AutoSave, slot, None);
        self.report(OperationKind::AutoSave, Some(slot), result)
    }

    /// Removes a slot's files and cache entry; an empty slot is not an error
    pub fn delete_save(&mut self, slot: usize) -> Result<(), SaveError> {
        let result = self.delete_slot(slot);
        self.report(OperationKind::Delete, Some(slot), result)
    }

    /// Puts the backup generation back in place of the primary file
    pub fn restore_backup(&mut self, slot: usize) -> Result<(), SaveError> {
        let result = self.restore_slot(slot);
        self.report(OperationKind::RestoreBackup, Some(slot), result)
    }

    /// Drives background I/O and scene loads; call once per frame
    pub fn poll(&mut self) {
        if matches!(self.pending, Some(Pending::Scene { .. })) {
            self.drive_scene();
        } else {
            self.drive_io(false);
        }
    }

    // === Queries ===

    pub fn get_all_save_metadata(&self) -> Vec<SlotEntry> {
        self.cache.entries()
    }

    pub fn has_save_file(&self, slot: usize) -> bool {
        self.cache.has_save_file(slot)
    }

    pub fn slot_status(&self, slot: usize) -> Option<&SlotStatus> {
        self.cache.get(slot)
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_used_slot(&self) -> Option<usize> {
        self.last_used_slot
    }

    pub fn play_time_seconds(&self) -> f64 {
        self.play_time_seconds
    }

    /// Adds active play time; carried into the next save's header
    ///
    /// Negative and non-finite amounts are ignored.
    pub fn add_play_time(&mut self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            self.play_time_seconds += seconds;
        }
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    pub fn directory(&self) -> &Path {
        self.store.directory()
    }

    pub fn slot_path(&self, slot: usize) -> PathBuf {
        self.store.slot_path(slot)
    }

    // === Save ===

    fn begin_save(
        &mut self,
        kind: OperationKind,
        slot: usize,
        name: Option<&str>,
    ) -> Result<OperationStatus, SaveError> {
        self.check_slot(slot)?;
        self.ensure_idle()?;

        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| default_save_name(kind, slot));
        let snapshot = self.capture(name)?;
        let bytes = self.codec.encode(&snapshot)?;
        self.verify_encoded(&bytes)?;
        let metadata = SaveMetadata::from_snapshot(slot, &snapshot);
        self.trace(format_args!("Encoded slot {} ({} bytes)", slot, bytes.len()));

        if let Some(worker) = &self.worker {
            worker.submit(IoJob::Write { slot, bytes })?;
            self.pending = Some(Pending::Write {
                kind,
                slot,
                metadata,
            });
            return Ok(OperationStatus::Pending);
        }

        self.store.write(slot, &bytes)?;
        self.finish_save(kind, slot, metadata);
        Ok(OperationStatus::Completed)
    }

    /// Pulls a payload from every collaborator; any failure aborts the save
    fn capture(&self, name: String) -> Result<SaveSnapshot, SaveError> {
        for required in Domain::ALL.into_iter().filter(|d| d.is_required()) {
            if !self.domains.iter().any(|d| d.domain() == required) {
                return Err(SaveError::capture(
                    required.key(),
                    "no collaborator registered",
                ));
            }
        }

        let mut domains = BTreeMap::new();
        for collaborator in &self.domains {
            let domain = collaborator.domain();
            let payload = collaborator.produce_snapshot().map_err(|e| match e {
                SaveError::CaptureFailed { .. } => e,
                other => SaveError::capture(domain.key(), other.to_string()),
            })?;
            if payload.is_null() {
                return Err(SaveError::capture(domain.key(), "produced no data"));
            }
            self.trace(format_args!("Captured {}", domain));
            domains.insert(domain.key().to_string(), payload);
        }

        Ok(SaveSnapshot {
            header: SaveHeader {
                name,
                guid: Uuid::new_v4(),
                created_at: Utc::now(),
                schema_version: CURRENT_SAVE_VERSION,
                total_play_time_seconds: self.play_time_seconds,
            },
            domains,
        })
    }

    /// Refuses to write bytes that would not load back
    ///
    /// Non-finite floats encode as `null`, so a capture can succeed and still
    /// produce an unloadable file.
    fn verify_encoded(&self, bytes: &[u8]) -> Result<(), SaveError> {
        self.codec.decode(bytes).map(drop).map_err(|e| {
            SaveError::capture("snapshot", format!("captured data does not load back: {}", e))
        })
    }

    fn finish_save(&mut self, kind: OperationKind, slot: usize, metadata: SaveMetadata) {
        info!("Game saved to slot {} ('{}')", slot, metadata.name);
        self.cache.set(slot, metadata);
        self.last_used_slot = Some(slot);
        self.emit(SaveEvent::Saved { slot, kind });
    }

    // === Load ===

    fn begin_load(&mut self, kind: OperationKind, slot: usize) -> Result<OperationStatus, SaveError> {
        self.check_slot(slot)?;
        self.ensure_idle()?;

        if let Some(worker) = &self.worker {
            worker.submit(IoJob::Read { slot })?;
            self.pending = Some(Pending::Read { kind, slot });
            return Ok(OperationStatus::Pending);
        }

        let bytes = self.store.read(slot)?;
        self.continue_load(kind, slot, bytes)
    }

    /// Decode, validate, then either apply or wait for the scene bridge
    fn continue_load(
        &mut self,
        kind: OperationKind,
        slot: usize,
        bytes: Option<Vec<u8>>,
    ) -> Result<OperationStatus, SaveError> {
        let bytes = bytes.ok_or(SaveError::SlotEmpty(slot))?;
        let snapshot = match self.codec.decode(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if e.is_corrupt() {
                    self.cache.mark_unreadable(slot, e.to_string());
                }
                return Err(e);
            }
        };
        self.validate_domains(&snapshot)?;

        let target = snapshot.scene_id().map(str::to_string);
        if let (Some(scene), Some(bridge)) = (target, self.scenes.as_mut()) {
            if bridge.current_scene().as_deref() != Some(scene.as_str()) {
                info!("Loading scene '{}' before applying slot {}", scene, slot);
                let (handle, load) = scene_load();
                bridge.load_scene(&scene, handle);

                return match load.poll() {
                    Some(Ok(())) => {
                        self.apply(kind, slot, snapshot);
                        Ok(OperationStatus::Completed)
                    }
                    Some(Err(reason)) => Err(SaveError::SceneTransition { scene, reason }),
                    None => {
                        self.pending = Some(Pending::Scene {
                            kind,
                            slot,
                            scene,
                            snapshot,
                            load,
                        });
                        Ok(OperationStatus::Pending)
                    }
                };
            }
        }

        self.apply(kind, slot, snapshot);
        Ok(OperationStatus::Completed)
    }

    /// Every registered domain checks its payload before anything is applied
    fn validate_domains(&self, snapshot: &SaveSnapshot) -> Result<(), SaveError> {
        for collaborator in &self.domains {
            if let Some(payload) = snapshot.payload(collaborator.domain()) {
                collaborator.validate_snapshot(payload)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, kind: OperationKind, slot: usize, snapshot: SaveSnapshot) {
        for index in 0..self.domains.len() {
            let domain = self.domains[index].domain();
            self.trace(format_args!("Applying {}", domain));
            self.domains[index].apply_snapshot(snapshot.payload(domain));
        }

        self.play_time_seconds = snapshot.header.total_play_time_seconds;
        self.last_used_slot = Some(slot);
        info!("Loaded slot {} ('{}')", slot, snapshot.header.name);
        self.emit(SaveEvent::Loaded { slot, kind });
    }

    // === Delete / restore ===

    fn delete_slot(&mut self, slot: usize) -> Result<(), SaveError> {
        self.check_slot(slot)?;
        self.ensure_idle()?;

        if self.store.delete(slot)? {
            info!("Deleted save slot {}", slot);
        }
        self.cache.evict(slot);
        if self.last_used_slot == Some(slot) {
            self.last_used_slot = None;
        }
        self.emit(SaveEvent::Deleted { slot });
        Ok(())
    }

    fn restore_slot(&mut self, slot: usize) -> Result<(), SaveError> {
        self.check_slot(slot)?;
        self.ensure_idle()?;

        if !self.store.restore_backup(slot)? {
            if !self.store.backups_enabled() {
                warn!("Backups are disabled; slot {} cannot be restored", slot);
            }
            return Err(SaveError::NoBackup(slot));
        }
        self.cache.refresh_slot(slot, &self.store, &self.codec);
        info!("Restored slot {} from backup", slot);
        Ok(())
    }

    // === Pending operations ===

    fn drive_io(&mut self, block: bool) {
        let Some(worker) = &self.worker else {
            return;
        };
        if !matches!(
            self.pending,
            Some(Pending::Write { .. } | Pending::Read { .. })
        ) {
            return;
        }

        let outcome = if block {
            worker.wait_outcome().map(Some)
        } else {
            worker.try_outcome()
        };
        let outcome = match outcome {
            Ok(Some(outcome)) => outcome,
            Ok(None) => return,
            Err(e) => {
                if let Some(pending) = self.pending.take() {
                    let (kind, slot) = pending_target(&pending);
                    let _ = self.report::<()>(kind, Some(slot), Err(e));
                }
                return;
            }
        };

        match (self.pending.take(), outcome) {
            (
                Some(Pending::Write {
                    kind,
                    slot,
                    metadata,
                }),
                IoOutcome::Written { slot: done, result },
            ) if done == slot => {
                match result {
                    Ok(()) => self.finish_save(kind, slot, metadata),
                    Err(e) => {
                        let _ = self.report::<()>(kind, Some(slot), Err(e.into()));
                    }
                }
            }
            (Some(Pending::Read { kind, slot }), IoOutcome::Read { slot: done, result })
                if done == slot =>
            {
                let result = result
                    .map_err(SaveError::from)
                    .and_then(|bytes| self.continue_load(kind, slot, bytes));
                let _ = self.report(kind, Some(slot), result);
            }
            (pending, outcome) => {
                error!("I/O outcome {:?} does not match the pending operation", outcome);
                if let Some(pending) = pending {
                    let (kind, slot) = pending_target(&pending);
                    let err = SaveError::Io(std::io::Error::other("mismatched I/O outcome"));
                    let _ = self.report::<()>(kind, Some(slot), Err(err));
                }
            }
        }
    }

    fn drive_scene(&mut self) {
        let Some(Pending::Scene { load, .. }) = &self.pending else {
            return;
        };
        let Some(result) = load.poll() else {
            return;
        };
        let Some(Pending::Scene {
            kind,
            slot,
            scene,
            snapshot,
            ..
        }) = self.pending.take()
        else {
            return;
        };

        match result {
            Ok(()) => self.apply(kind, slot, snapshot),
            Err(reason) => {
                let err = SaveError::SceneTransition { scene, reason };
                let _ = self.report::<()>(kind, Some(slot), Err(err));
            }
        }
    }

    // === Helpers ===

    fn check_slot(&self, slot: usize) -> Result<(), SaveError> {
        if slot >= self.config.number_of_slots {
            return Err(SaveError::InvalidSlot {
                slot,
                slots: self.config.number_of_slots,
            });
        }
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), SaveError> {
        if self.pending.is_some() {
            return Err(SaveError::Busy);
        }
        Ok(())
    }

    fn auto_save_slot(&self) -> usize {
        self.config
            .auto_save_slot
            .or(self.last_used_slot)
            .unwrap_or(0)
    }

    /// Fires an error event for failures and passes the result through
    fn report<T>(
        &mut self,
        kind: OperationKind,
        slot: Option<usize>,
        result: Result<T, SaveError>,
    ) -> Result<T, SaveError> {
        if let Err(e) = &result {
            match e {
                SaveError::Busy => warn!("{:?} rejected: {}", kind, e),
                _ => error!("{:?} failed: {}", kind, e),
            }
            self.emit(SaveEvent::Error {
                kind,
                slot,
                category: e.category(),
                message: e.to_string(),
            });
        }
        result
    }

    fn emit(&mut self, event: SaveEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    fn trace(&self, args: std::fmt::Arguments<'_>) {
        if self.config.debug_logging {
            debug!("{}", args);
        }
    }
}

fn pending_target(pending: &Pending) -> (OperationKind, usize) {
    match pending {
        Pending::Write { kind, slot, .. }
        | Pending::Read { kind, slot }
        | Pending::Scene { kind, slot, .. } => (*kind, *slot),
    }
}

fn default_save_name(kind: OperationKind, slot: usize) -> String {
    match kind {
        OperationKind::QuickSave => "Quick Save".to_string(),
        OperationKind::AutoSave => "Auto Save".to_string(),
        _ => format!("Slot {}", slot + 1),
    }
}
