//! Crash-safe byte storage per save slot
//!
//! Files are named by slot index inside the profile directory:
//! - `slot_<i>.sav` primary
//! - `slot_<i>.sav.bak` single backup generation
//! - `slot_<i>.sav.tmp` staging file, only present mid-write
//!
//! A write lands in the staging file first and is renamed over the primary
//! only once it is fully on disk, so an interrupted write leaves the previous
//! primary untouched. The store never looks inside the bytes.

use log::{debug, warn};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::error::SaveError;

const SLOT_EXTENSION: &str = "sav";

#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
    backups: bool,
}

impl FileStore {
    /// Opens a store rooted at `directory`, creating it if needed
    pub fn open(directory: impl AsRef<Path>, backups: bool) -> Result<Self, SaveError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(FileStore { directory, backups })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn backups_enabled(&self) -> bool {
        self.backups
    }

    pub fn slot_path(&self, slot: usize) -> PathBuf {
        self.directory.join(format!("slot_{}.{}", slot, SLOT_EXTENSION))
    }

    pub fn backup_path(&self, slot: usize) -> PathBuf {
        self.directory.join(format!("slot_{}.{}.bak", slot, SLOT_EXTENSION))
    }

    pub fn temp_path(&self, slot: usize) -> PathBuf {
        self.directory.join(format!("slot_{}.{}.tmp", slot, SLOT_EXTENSION))
    }

    pub fn exists(&self, slot: usize) -> bool {
        self.slot_path(slot).is_file()
    }

    /// Raw bytes of the primary file, `None` if the slot has no file
    pub fn read(&self, slot: usize) -> io::Result<Option<Vec<u8>>> {
        read_optional(&self.slot_path(slot))
    }

    pub fn read_backup(&self, slot: usize) -> io::Result<Option<Vec<u8>>> {
        read_optional(&self.backup_path(slot))
    }

    /// Writes `bytes` to the staging file and fsyncs it
    ///
    /// Nothing visible changes until `StagedWrite::commit`.
    pub fn stage(&self, slot: usize, bytes: &[u8]) -> io::Result<StagedWrite> {
        fs::create_dir_all(&self.directory)?;
        let staged = StagedWrite {
            temp: self.temp_path(slot),
            target: self.slot_path(slot),
            backup: self.backups.then(|| self.backup_path(slot)),
            directory: self.directory.clone(),
            committed: false,
        };

        let mut file = fs::File::create(&staged.temp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(staged)
    }

    /// Stage and commit in one step
    pub fn write(&self, slot: usize, bytes: &[u8]) -> io::Result<()> {
        self.stage(slot, bytes)?.commit()
    }

    /// Removes primary, backup and any staging file
    ///
    /// Returns whether anything was removed; missing files are not an error.
    pub fn delete(&self, slot: usize) -> io::Result<bool> {
        let mut removed = false;
        for path in [self.slot_path(slot), self.backup_path(slot), self.temp_path(slot)] {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }

    /// Copies the backup over the primary through the staging path
    ///
    /// Returns false when there is no backup or backups are disabled; a
    /// `.bak` left from a session with backups on is not current and is
    /// never restored. The backup itself is kept.
    pub fn restore_backup(&self, slot: usize) -> io::Result<bool> {
        if !self.backups {
            return Ok(false);
        }
        let Some(bytes) = self.read_backup(slot)? else {
            return Ok(false);
        };
        let mut staged = self.stage(slot, &bytes)?;
        staged.backup = None;
        staged.commit()?;
        Ok(true)
    }

    /// Deletes staging files left behind by interrupted writes
    pub fn clean_stale_temp(&self) -> io::Result<usize> {
        let mut cleaned = 0;
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            let is_stale = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("slot_") && n.ends_with(".tmp"))
                .unwrap_or(false);
            if is_stale {
                match fs::remove_file(&path) {
                    Ok(()) => {
                        debug!("Removed stale staging file {}", path.display());
                        cleaned += 1;
                    }
                    Err(e) => warn!("Could not remove {}: {}", path.display(), e),
                }
            }
        }
        Ok(cleaned)
    }
}

/// A fully written staging file waiting to replace the slot's primary
///
/// Dropping it without committing discards the staging file.
#[derive(Debug)]
pub struct StagedWrite {
    temp: PathBuf,
    target: PathBuf,
    backup: Option<PathBuf>,
    directory: PathBuf,
    committed: bool,
}

impl StagedWrite {
    pub fn commit(mut self) -> io::Result<()> {
        if let Some(backup) = &self.backup {
            if self.target.is_file() {
                fs::copy(&self.target, backup)?;
            }
        }
        fs::rename(&self.temp, &self.target)?;
        self.committed = true;
        sync_directory(&self.directory);
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp);
        }
    }
}

fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn sync_directory(directory: &Path) {
    if let Ok(dir) = fs::File::open(directory) {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_directory(_directory: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), false).unwrap();

        assert_eq!(store.read(0).unwrap(), None);
        store.write(0, b"first").unwrap();
        assert_eq!(store.read(0).unwrap().as_deref(), Some(&b"first"[..]));
        assert!(store.exists(0));
        assert!(!store.temp_path(0).exists());
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("saves").join("default");
        let store = FileStore::open(&nested, true).unwrap();
        assert!(store.directory().is_dir());
    }

    #[test]
    fn test_interrupted_write_keeps_previous_file() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), true).unwrap();
        store.write(1, b"stable contents").unwrap();

        let staged = store.stage(1, b"half-finished").unwrap();
        assert!(store.temp_path(1).exists());
        drop(staged);

        assert_eq!(store.read(1).unwrap().as_deref(), Some(&b"stable contents"[..]));
        assert!(!store.temp_path(1).exists());
        assert_eq!(store.read_backup(1).unwrap(), None);
    }

    #[test]
    fn test_backup_holds_previous_generation() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), true).unwrap();

        store.write(2, b"one").unwrap();
        assert_eq!(store.read_backup(2).unwrap(), None);
        store.write(2, b"two").unwrap();
        store.write(2, b"three").unwrap();

        assert_eq!(store.read(2).unwrap().as_deref(), Some(&b"three"[..]));
        assert_eq!(store.read_backup(2).unwrap().as_deref(), Some(&b"two"[..]));
    }

    #[test]
    fn test_no_backup_when_disabled() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), false).unwrap();
        store.write(0, b"one").unwrap();
        store.write(0, b"two").unwrap();
        assert!(!store.backup_path(0).exists());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), true).unwrap();
        store.write(3, b"a").unwrap();
        store.write(3, b"b").unwrap();

        assert!(store.delete(3).unwrap());
        assert!(!store.exists(3));
        assert!(!store.backup_path(3).exists());
        assert!(!store.delete(3).unwrap());
    }

    #[test]
    fn test_restore_backup() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), true).unwrap();
        assert!(!store.restore_backup(0).unwrap());

        store.write(0, b"good").unwrap();
        store.write(0, b"bad").unwrap();
        assert!(store.restore_backup(0).unwrap());
        assert_eq!(store.read(0).unwrap().as_deref(), Some(&b"good"[..]));
        assert_eq!(store.read_backup(0).unwrap().as_deref(), Some(&b"good"[..]));
    }

    #[test]
    fn test_stale_backup_ignored_when_disabled() {
        let dir = tempdir().unwrap();
        let with_backups = FileStore::open(dir.path(), true).unwrap();
        with_backups.write(0, b"ancient").unwrap();
        with_backups.write(0, b"middle").unwrap();

        let store = FileStore::open(dir.path(), false).unwrap();
        store.write(0, b"latest").unwrap();
        assert!(store.backup_path(0).exists());
        assert!(!store.restore_backup(0).unwrap());
        assert_eq!(store.read(0).unwrap().as_deref(), Some(&b"latest"[..]));
    }

    #[test]
    fn test_clean_stale_temp() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path(), false).unwrap();
        fs::write(store.temp_path(0), b"junk").unwrap();
        fs::write(store.temp_path(4), b"junk").unwrap();
        fs::write(dir.path().join("notes.tmp"), b"keep").unwrap();

        assert_eq!(store.clean_stale_temp().unwrap(), 2);
        assert!(dir.path().join("notes.tmp").exists());
    }
}
