//! Error types for the organizer engine.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while classifying, placing or moving media files.
#[derive(Debug, Error)]
pub enum LumeError {
    /// Extension is not in the media allow-list.
    #[error("Unsupported format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// Path contains a traversal component or a reserved device name.
    #[error("Unsafe path: {}", path.display())]
    PathUnsafe { path: PathBuf },

    #[error(
        "Insufficient disk space at {}: need {required_bytes} bytes, have {available_bytes}",
        path.display()
    )]
    InsufficientDiskSpace {
        path: PathBuf,
        required_bytes: u64,
        available_bytes: u64,
    },

    #[error("Target folder is not writable: {}: {reason}", path.display())]
    NotWritable { path: PathBuf, reason: String },

    /// Copied file does not hash to the source hash.
    #[error("Integrity check failed for {}: expected {expected}, got {actual}", path.display())]
    IntegrityMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Generic read/write/mkdir/stat failure.
    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Source and destination are the same folder: {}", path.display())]
    SourceEqualsDestination { path: PathBuf },

    #[error(
        "Destination {} is inside source {}",
        destination_root.display(),
        source_root.display()
    )]
    DestinationInsideSource {
        source_root: PathBuf,
        destination_root: PathBuf,
    },

    #[error("No free name next to {} after {attempts} attempts", path.display())]
    ConflictLimitExceeded { path: PathBuf, attempts: u32 },
}

impl LumeError {
    /// Wraps an I/O error with the operation and path it concerns.
    pub fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this error aborts a whole batch rather than a single file.
    pub fn is_batch_level(&self) -> bool {
        matches!(
            self,
            Self::SourceEqualsDestination { .. }
                | Self::DestinationInsideSource { .. }
                | Self::NotWritable { .. }
                | Self::InsufficientDiskSpace { .. }
        )
    }
}

pub type Result<T, E = LumeError> = std::result::Result<T, E>;
