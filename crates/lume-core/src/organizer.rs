//! Per-file placement: where a record goes and how collisions are handled.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::conflict::{find_slot, Slot, MAX_CONFLICT_ATTEMPTS};
use crate::dedup::{is_duplicate, ContentHasher};
use crate::error::{LumeError, Result};
use crate::media::FileRecord;
use crate::metadata::source::is_known_source;
use crate::mover::AtomicMover;
use crate::outcome::MoveOutcome;
use crate::sanitize::{sanitize_segment, UNKNOWN_SEGMENT};

/// Category used when neither source nor device says anything.
pub const FALLBACK_CATEGORY: &str = "Other_Sorted";

/// Third path level under `Year/Month`, already sanitized.
///
/// A recognized source is combined with an informative device
/// (`Camera_Pixel 6`); unrecognized files are grouped by device alone.
pub fn category_label(record: &FileRecord) -> String {
    let raw = if is_known_source(record.source()) {
        if record.has_device() {
            format!("{}_{}", record.source(), record.device())
        } else {
            record.source().to_string()
        }
    } else {
        record.device().to_string()
    };

    let label = sanitize_segment(&raw);
    if label == UNKNOWN_SEGMENT {
        FALLBACK_CATEGORY.to_string()
    } else {
        label
    }
}

/// `<target>/<year>/<month>/<category>` with every segment sanitized.
pub fn destination_dir(target_root: &Path, record: &FileRecord) -> PathBuf {
    target_root
        .join(sanitize_segment(record.year()))
        .join(sanitize_segment(record.month()))
        .join(category_label(record))
}

fn relative(path: &Path, base: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Only regular files can hold an earlier copy; links and folders never match.
fn same_content<H: ContentHasher>(src: &Path, taken: &Path, hasher: &H) -> Result<bool> {
    let is_file = fs::metadata(taken).map(|m| m.is_file()).unwrap_or(false);
    if !is_file {
        return Ok(false);
    }
    is_duplicate(src, taken, hasher)
}

/// Place one classified file under `target_root`.
///
/// The base name and every numbered variant already in the folder are
/// checked for identical content, so a file archived earlier under a suffix
/// is recognized as a duplicate. Never returns an error: every failure
/// becomes a `Failed` outcome and the source is left where it was.
pub fn place<H: ContentHasher>(
    record: &FileRecord,
    target_root: &Path,
    mover: &AtomicMover<H>,
) -> MoveOutcome {
    let src = record.path().to_path_buf();
    let name = record.filename().to_string();
    let fail = |e: LumeError| {
        error!("{}: {}", name, e);
        MoveOutcome::failed(src.clone(), name.clone(), e)
    };

    let dir = destination_dir(target_root, record);
    if !dir.starts_with(target_root) {
        return fail(LumeError::PathUnsafe { path: dir });
    }
    if let Err(e) = fs::create_dir_all(&dir) {
        return fail(LumeError::io("create folder", &dir, e));
    }

    let base = dir.join(record.file_name());
    let same = |taken: &Path| same_content(record.path(), taken, mover.hasher());
    let slot = if fs::symlink_metadata(&base).is_err() {
        Ok(Slot::Free(base.clone()))
    } else {
        match same(&base) {
            Ok(true) => Ok(Slot::Duplicate(base.clone())),
            Ok(false) => find_slot(&base, same),
            Err(e) => Err(e),
        }
    };

    let dest = match slot {
        Ok(Slot::Free(path)) => path,
        Ok(Slot::Duplicate(existing)) => {
            info!(
                "{}: identical file already at {}, skipping",
                name,
                relative(&existing, target_root).display()
            );
            return MoveOutcome::skipped(src.clone(), name.clone(), existing);
        }
        Ok(Slot::Exhausted) => {
            return fail(LumeError::ConflictLimitExceeded {
                path: base,
                attempts: MAX_CONFLICT_ATTEMPTS,
            })
        }
        Err(e) => return fail(e),
    };

    match mover.move_file(record.path(), &dest) {
        Ok(report) => {
            info!(
                "{} -> {} ({:?}, {:?} date)",
                name,
                relative(&dest, target_root).display(),
                report.method,
                record.date_origin()
            );
            MoveOutcome::moved(src.clone(), name.clone(), dest, report.bytes)
                .with_source_kept(!report.source_removed)
        }
        Err(e) => fail(e),
    }
}
