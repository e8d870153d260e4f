//! Error types for save/load operations
//!
//! Every failure the coordinator can hit maps onto one `SaveError` variant.
//! Listeners receive the coarser `ErrorCategory` so a UI can decide what to
//! offer (retry, delete a corrupted slot, wait for the busy operation).

use thiserror::Error;

/// Errors that can occur while saving, loading or deleting a slot
#[derive(Debug, Error)]
pub enum SaveError {
    /// Disk failure. Retry-safe: live state is untouched.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file could not be parsed or is missing required structure
    #[error("Corrupted save data: {reason}")]
    CorruptData { reason: String },

    /// Schema version the codec does not recognize
    #[error("Unsupported save version {found} (supported: {supported:?})")]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    /// Another save or load is still in flight
    #[error("Another save or load is already in progress")]
    Busy,

    /// A domain collaborator failed to produce its payload
    #[error("Failed to capture {domain} state: {reason}")]
    CaptureFailed { domain: String, reason: String },

    /// The scene bridge reported a failed transition
    #[error("Scene transition to '{scene}' failed: {reason}")]
    SceneTransition { scene: String, reason: String },

    #[error("Invalid slot index {slot} (configured slots: {slots})")]
    InvalidSlot { slot: usize, slots: usize },

    #[error("Save slot {0} is empty")]
    SlotEmpty(usize),

    #[error("Save slot {0} has no backup")]
    NoBackup(usize),

    /// Encoding a snapshot failed
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Coarse classification carried by error events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    TransientIo,
    CorruptData,
    UnsupportedVersion,
    Busy,
    CaptureFailure,
    SceneTransition,
    InvalidSlot,
    SlotEmpty,
    Config,
}

impl SaveError {
    pub fn corrupt(reason: impl Into<String>) -> Self {
        SaveError::CorruptData {
            reason: reason.into(),
        }
    }

    pub fn capture(domain: impl Into<String>, reason: impl Into<String>) -> Self {
        SaveError::CaptureFailed {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SaveError::Io(_) => ErrorCategory::TransientIo,
            SaveError::CorruptData { .. } => ErrorCategory::CorruptData,
            SaveError::UnsupportedVersion { .. } => ErrorCategory::UnsupportedVersion,
            SaveError::Busy => ErrorCategory::Busy,
            SaveError::CaptureFailed { .. } | SaveError::Serialization(_) => {
                ErrorCategory::CaptureFailure
            }
            SaveError::SceneTransition { .. } => ErrorCategory::SceneTransition,
            SaveError::InvalidSlot { .. } => ErrorCategory::InvalidSlot,
            SaveError::SlotEmpty(_) | SaveError::NoBackup(_) => ErrorCategory::SlotEmpty,
            SaveError::Config(_) => ErrorCategory::Config,
        }
    }

    /// True for anything the UI should present as a damaged slot.
    ///
    /// An unsupported version counts as corrupt data: there is no migration.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            SaveError::CorruptData { .. } | SaveError::UnsupportedVersion { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_version_is_corrupt() {
        let err = SaveError::UnsupportedVersion {
            found: 9,
            supported: vec![1],
        };
        assert!(err.is_corrupt());
        assert_eq!(err.category(), ErrorCategory::UnsupportedVersion);
    }

    #[test]
    fn test_io_error_is_not_corrupt() {
        let err = SaveError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only disk",
        ));
        assert!(!err.is_corrupt());
        assert_eq!(err.category(), ErrorCategory::TransientIo);
        assert!(err.to_string().contains("read-only disk"));
    }

    #[test]
    fn test_capture_helper() {
        let err = SaveError::capture("player", "no transform");
        assert_eq!(err.category(), ErrorCategory::CaptureFailure);
        assert_eq!(err.to_string(), "Failed to capture player state: no transform");
    }
}
