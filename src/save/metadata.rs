//! Slot registry backed by header-only parses
//!
//! Built once at startup by scanning every configured slot, then updated one
//! entry at a time after each save, delete or restore. A file whose header
//! cannot be read shows up as `Unreadable` instead of disappearing.

use log::warn;

use super::codec::SaveCodec;
use super::store::FileStore;
use super::types::{SaveMetadata, SlotEntry, SlotStatus};

#[derive(Debug, Clone)]
pub struct MetadataCache {
    entries: Vec<SlotStatus>,
}

impl MetadataCache {
    pub fn scan(store: &FileStore, codec: &SaveCodec, slots: usize) -> Self {
        let entries = (0..slots).map(|slot| probe_slot(store, codec, slot)).collect();
        MetadataCache { entries }
    }

    /// Re-reads a single slot's header from disk
    pub fn refresh_slot(&mut self, slot: usize, store: &FileStore, codec: &SaveCodec) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = probe_slot(store, codec, slot);
        }
    }

    pub fn get(&self, slot: usize) -> Option<&SlotStatus> {
        self.entries.get(slot)
    }

    pub fn set(&mut self, slot: usize, metadata: SaveMetadata) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = SlotStatus::Occupied(metadata);
        }
    }

    pub fn mark_unreadable(&mut self, slot: usize, reason: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = SlotStatus::Unreadable {
                reason: reason.into(),
            };
        }
    }

    pub fn evict(&mut self, slot: usize) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = SlotStatus::Empty;
        }
    }

    /// True when the slot has a file on disk, readable or not
    pub fn has_save_file(&self, slot: usize) -> bool {
        matches!(
            self.entries.get(slot),
            Some(SlotStatus::Occupied(_) | SlotStatus::Unreadable { .. })
        )
    }

    /// Slot holding the newest readable save, by creation time
    pub fn most_recent_slot(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(slot, status)| match status {
                SlotStatus::Occupied(meta) => Some((slot, meta.created_at)),
                _ => None,
            })
            .max_by_key(|(_, created_at)| *created_at)
            .map(|(slot, _)| slot)
    }

    /// Every slot in index order, including empty and unreadable ones
    pub fn entries(&self) -> Vec<SlotEntry> {
        self.entries
            .iter()
            .enumerate()
            .map(|(slot, status)| SlotEntry {
                slot,
                status: status.clone(),
            })
            .collect()
    }
}

fn probe_slot(store: &FileStore, codec: &SaveCodec, slot: usize) -> SlotStatus {
    match store.read(slot) {
        Ok(None) => SlotStatus::Empty,
        Ok(Some(bytes)) => match codec.decode_header(&bytes, slot) {
            Ok(metadata) => SlotStatus::Occupied(metadata),
            Err(e) => {
                warn!("Save slot {} is unreadable: {}", slot, e);
                SlotStatus::Unreadable {
                    reason: e.to_string(),
                }
            }
        },
        Err(e) => {
            warn!("Could not read save slot {}: {}", slot, e);
            SlotStatus::Unreadable {
                reason: e.to_string(),
            }
        }
    }
}
