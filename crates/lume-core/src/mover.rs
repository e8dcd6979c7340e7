//! Hash-verified file moves.
//!
//! A move is either a same-volume rename or a copy that is synced, hashed
//! and compared against the source before the source is removed. The source
//! is never deleted while the destination is unverified.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::dedup::{ContentHash, ContentHasher, DEFAULT_BUFFER_SIZE};
use crate::error::{LumeError, Result};

/// How the mover is allowed to relocate a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveStrategy {
    /// Rename when possible, copy and verify otherwise.
    #[default]
    PreferRename,
    /// Always copy, verify and delete, as across volumes.
    CopyOnly,
}

/// How a completed move was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMethod {
    Renamed,
    Copied,
}

#[derive(Debug, Clone)]
pub struct MoveReport {
    pub method: MoveMethod,
    pub bytes: u64,
    /// Hash of the source taken before anything was touched.
    pub source_hash: ContentHash,
    /// Hash of the copy; only computed on the copy path.
    pub destination_hash: Option<ContentHash>,
    /// False when the verified copy is in place but the source could not be deleted.
    pub source_removed: bool,
}

pub struct AtomicMover<H> {
    hasher: H,
    strategy: MoveStrategy,
    buffer_size: usize,
}

impl<H: ContentHasher> AtomicMover<H> {
    pub fn new(hasher: H) -> Self {
        Self {
            hasher,
            strategy: MoveStrategy::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_strategy(mut self, strategy: MoveStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096);
        self
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Move `src` to `dst`. `dst` must not exist and its parent must.
    pub fn move_file(&self, src: &Path, dst: &Path) -> Result<MoveReport> {
        let source_hash = self.hasher.hash_file(src)?;
        let bytes = fs::metadata(src)
            .map_err(|e| LumeError::io("stat source", src, e))?
            .len();

        if fs::symlink_metadata(dst).is_ok() {
            return Err(LumeError::io(
                "move",
                dst,
                io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
            ));
        }

        if self.strategy == MoveStrategy::PreferRename {
            match fs::rename(src, dst) {
                Ok(()) => {
                    debug!("Renamed {} -> {}", src.display(), dst.display());
                    return Ok(MoveReport {
                        method: MoveMethod::Renamed,
                        bytes,
                        source_hash,
                        destination_hash: None,
                        source_removed: true,
                    });
                }
                Err(e) => {
                    debug!("Rename failed ({}), falling back to copy: {}", e, src.display());
                }
            }
        }

        let copied = match self.copy_durable(src, dst) {
            Ok(n) => n,
            Err(e) => {
                // The partial file is ours; the source was never touched.
                if let Err(rm) = fs::remove_file(dst) {
                    if rm.kind() != io::ErrorKind::NotFound {
                        warn!("Could not remove partial copy {}: {}", dst.display(), rm);
                    }
                }
                return Err(e);
            }
        };
        preserve_mtime(src, dst);

        let destination_hash = self.hasher.hash_file(dst)?;
        if destination_hash != source_hash {
            error!(
                "Integrity check failed for {}, removing corrupt copy",
                src.display()
            );
            if let Err(rm) = fs::remove_file(dst) {
                error!("Failed to remove corrupt copy {}: {}", dst.display(), rm);
            }
            return Err(LumeError::IntegrityMismatch {
                path: dst.to_path_buf(),
                expected: source_hash.to_string(),
                actual: destination_hash.to_string(),
            });
        }

        let source_removed = match fs::remove_file(src) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Verified copy in place but source could not be deleted: {}: {}",
                    src.display(),
                    e
                );
                false
            }
        };

        Ok(MoveReport {
            method: MoveMethod::Copied,
            bytes: copied,
            source_hash,
            destination_hash: Some(destination_hash),
            source_removed,
        })
    }

    /// Stream `src` into a new file at `dst` and force it to storage.
    fn copy_durable(&self, src: &Path, dst: &Path) -> Result<u64> {
        let input = File::open(src).map_err(|e| LumeError::io("open source", src, e))?;
        let output = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dst)
            .map_err(|e| LumeError::io("create destination", dst, e))?;

        let mut reader = BufReader::with_capacity(self.buffer_size, input);
        let mut writer = BufWriter::with_capacity(self.buffer_size, output);
        let copied = io::copy(&mut reader, &mut writer).map_err(|e| LumeError::io("copy", dst, e))?;
        writer.flush().map_err(|e| LumeError::io("flush", dst, e))?;

        let output = writer
            .into_inner()
            .map_err(|e| LumeError::io("flush", dst, e.into_error()))?;
        output.sync_all().map_err(|e| LumeError::io("sync", dst, e))?;
        Ok(copied)
    }
}

/// Carry the source modification time over to a copy. Best effort.
fn preserve_mtime(src: &Path, dst: &Path) {
    let Ok(meta) = fs::metadata(src) else { return };
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    if let Err(e) = filetime::set_file_mtime(dst, mtime) {
        debug!("Could not preserve mtime on {}: {}", dst.display(), e);
    }
}
