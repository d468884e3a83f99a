//! Local store errors
//!
//! I/O failures are classified so the user gets a hint they can act on.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a value could not be read from or written to the local store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cannot create store directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No permission to access '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No space left to save '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The fully written temp copy could not take the old file's place
    #[error("Cannot replace '{path}' with the new copy: {source}")]
    Replace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Keys become file names, so only a safe alphabet is allowed
    #[error("'{key}' is not a valid store key")]
    InvalidKey { key: String },
}

impl StorageError {
    /// Classify a failed write or remove
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        if error.kind() == io::ErrorKind::PermissionDenied {
            StorageError::PermissionDenied {
                path,
                source: error,
            }
        } else if is_out_of_space(&error) {
            StorageError::DiskFull {
                path,
                source: error,
            }
        } else {
            StorageError::Write {
                path,
                source: error,
            }
        }
    }

    /// Classify a failed read
    pub fn from_read(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ => StorageError::Read {
                path,
                source: error,
            },
        }
    }

    /// Something the user can do about it, if anything
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free some disk space; the next change saves again."),
            StorageError::PermissionDenied { .. } | StorageError::CreateDirectory { .. } => {
                Some("Make sure the data directory is writable, or point `data_dir` elsewhere.")
            }
            StorageError::InvalidKey { .. } => Some("Use only letters, digits, '-' and '_' in keys."),
            _ => None,
        }
    }
}

/// Not every platform reports `StorageFull`, so look at the message too
fn is_out_of_space(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    ["no space left", "disk full", "quota exceeded"]
        .iter()
        .any(|needle| msg.contains(needle))
}

/// Result type for local store operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_errors_are_classified() {
        let denied = StorageError::from_io(
            io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
            PathBuf::from("/data/ledger.json"),
        );
        assert!(matches!(denied, StorageError::PermissionDenied { .. }));
        assert!(denied.recovery_suggestion().is_some());

        let full = StorageError::from_io(
            io::Error::new(io::ErrorKind::Other, "No space left on device"),
            PathBuf::from("/data/ledger.json"),
        );
        assert!(matches!(full, StorageError::DiskFull { .. }));
        assert!(full.to_string().contains("ledger.json"));

        let other = StorageError::from_io(
            io::Error::new(io::ErrorKind::Other, "device busy"),
            PathBuf::from("/data/ledger.json"),
        );
        assert!(matches!(other, StorageError::Write { .. }));
        assert_eq!(other.recovery_suggestion(), None);
    }

    #[test]
    fn test_read_errors_are_not_reported_as_writes() {
        let err = StorageError::from_read(
            io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8"),
            PathBuf::from("/data/ledger.json"),
        );
        assert!(matches!(err, StorageError::Read { .. }));
        assert!(err.to_string().starts_with("Cannot read"));
    }

    #[test]
    fn test_invalid_key_display() {
        let err = StorageError::InvalidKey {
            key: "../etc".to_string(),
        };
        assert!(err.to_string().contains("../etc"));
        assert!(err.recovery_suggestion().is_some());
    }
}
