use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Default device label when no capture metadata names one.
pub const UNKNOWN_DEVICE: &str = "Unknown";

/// Media family of a supported extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
}

/// Extensions (lowercase, without the dot) Lume is willing to process.
const SUPPORTED_EXTENSIONS: &[(&str, MediaKind)] = &[
    ("jpg", MediaKind::Image),
    ("jpeg", MediaKind::Image),
    ("png", MediaKind::Image),
    ("webp", MediaKind::Image),
    ("heic", MediaKind::Image),
    ("tiff", MediaKind::Image),
    ("tif", MediaKind::Image),
    ("mp4", MediaKind::Video),
    ("mov", MediaKind::Video),
    ("avi", MediaKind::Video),
];

/// Look up the media kind of a path by its extension, case-insensitively.
pub fn media_kind(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, kind)| *kind)
}

/// Where the placement date of a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateOrigin {
    /// Embedded capture timestamp.
    Exif,
    /// OS-reported creation time.
    Created,
    /// Filesystem modification time.
    Modified,
}

/// A classified candidate file. Built once by the metadata extractor.
#[derive(Debug, Clone)]
pub struct FileRecord {
    path: PathBuf,
    file_name: OsString,
    filename: String,
    size: u64,
    kind: MediaKind,
    modified: NaiveDateTime,
    captured_at: NaiveDateTime,
    date_origin: DateOrigin,
    year: String,
    month: String,
    device: String,
    source: String,
}

impl FileRecord {
    /// Year and month are derived from `captured_at`; empty labels fall back
    /// to their defaults.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        path: PathBuf,
        filename: String,
        size: u64,
        kind: MediaKind,
        modified: NaiveDateTime,
        captured_at: NaiveDateTime,
        date_origin: DateOrigin,
        device: Option<String>,
        source: &str,
    ) -> Self {
        let device = device
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_DEVICE.to_string());
        let source = if source.is_empty() {
            crate::metadata::source::FALLBACK_SOURCE
        } else {
            source
        };
        let file_name = path
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_else(|| OsString::from(&filename));
        Self {
            path,
            file_name,
            filename,
            size,
            kind,
            modified,
            year: captured_at.format("%Y").to_string(),
            month: captured_at.format("%m").to_string(),
            captured_at,
            date_origin,
            device,
            source: source.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name, lossily decoded.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Exact on-disk name, used when building the destination path.
    pub fn file_name(&self) -> &OsStr {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn modified(&self) -> NaiveDateTime {
        self.modified
    }

    pub fn captured_at(&self) -> NaiveDateTime {
        self.captured_at
    }

    pub fn date_origin(&self) -> DateOrigin {
        self.date_origin
    }

    /// Four-digit year of `captured_at`.
    pub fn year(&self) -> &str {
        &self.year
    }

    /// Zero-padded month of `captured_at`.
    pub fn month(&self) -> &str {
        &self.month
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the device label carries real information.
    pub fn has_device(&self) -> bool {
        self.device != UNKNOWN_DEVICE
    }
}
