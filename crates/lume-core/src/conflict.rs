use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Highest numeric suffix tried before giving up.
pub const MAX_CONFLICT_ATTEMPTS: u32 = 9999;

fn path_taken(path: &Path) -> bool {
    // symlink_metadata so dangling links also count as taken
    fs::symlink_metadata(path).is_ok()
}

/// Build `<stem>_<n><.ext>` next to `path`.
fn numbered(path: &Path, n: u32) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default();
    let mut name = OsString::from(stem);
    name.push(format!("_{}", n));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

/// What a walk over numbered names found.
#[derive(Debug, PartialEq, Eq)]
pub enum Slot {
    /// Nothing exists at this name yet.
    Free(PathBuf),
    /// An existing file at this name already holds the same content.
    Duplicate(PathBuf),
    /// Every suffix up to [`MAX_CONFLICT_ATTEMPTS`] is taken by other content.
    Exhausted,
}

/// Walk `<stem>_1<.ext>`, `<stem>_2<.ext>`, ... next to a colliding `path`.
///
/// Each taken candidate is handed to `is_same`; a match ends the walk as
/// [`Slot::Duplicate`] so the same content is never archived twice under
/// different suffixes.
pub fn find_slot<F>(path: &Path, mut is_same: F) -> Result<Slot>
where
    F: FnMut(&Path) -> Result<bool>,
{
    for n in 1..=MAX_CONFLICT_ATTEMPTS {
        let candidate = numbered(path, n);
        if !path_taken(&candidate) {
            return Ok(Slot::Free(candidate));
        }
        if is_same(&candidate)? {
            return Ok(Slot::Duplicate(candidate));
        }
        if n == 1000 {
            tracing::warn!("High conflict count for {}", path.display());
        }
    }
    Ok(Slot::Exhausted)
}

/// Find the first free `<stem>_N<.ext>` for a colliding destination.
///
/// If every suffix up to [`MAX_CONFLICT_ATTEMPTS`] is taken, the original
/// path is returned unchanged and callers must treat it as still colliding.
pub fn resolve_conflict(path: &Path) -> PathBuf {
    match find_slot(path, |_| Ok(false)) {
        Ok(Slot::Free(candidate)) => candidate,
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_names() {
        assert_eq!(
            numbered(Path::new("/a/IMG_0001.jpg"), 1),
            PathBuf::from("/a/IMG_0001_1.jpg")
        );
        assert_eq!(
            numbered(Path::new("/a/archive.tar.gz"), 12),
            PathBuf::from("/a/archive.tar_12.gz")
        );
        assert_eq!(numbered(Path::new("/a/README"), 3), PathBuf::from("/a/README_3"));
    }

    #[test]
    fn test_first_free_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("photo.jpg");
        fs::write(&base, b"x").unwrap();
        assert_eq!(resolve_conflict(&base), dir.path().join("photo_1.jpg"));

        fs::write(dir.path().join("photo_1.jpg"), b"x").unwrap();
        fs::write(dir.path().join("photo_2.jpg"), b"x").unwrap();
        let resolved = resolve_conflict(&base);
        assert_eq!(resolved, dir.path().join("photo_3.jpg"));
        assert!(!resolved.exists());
    }

    #[test]
    fn test_gap_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("clip.mov");
        fs::write(&base, b"x").unwrap();
        fs::write(dir.path().join("clip_2.mov"), b"x").unwrap();
        assert_eq!(resolve_conflict(&base), dir.path().join("clip_1.mov"));
    }

    #[test]
    fn test_exhausted_returns_original() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("a.png");
        fs::write(&base, b"x").unwrap();
        for n in 1..=MAX_CONFLICT_ATTEMPTS {
            fs::write(dir.path().join(format!("a_{}.png", n)), b"").unwrap();
        }
        assert_eq!(resolve_conflict(&base), base);
    }

    #[test]
    fn test_find_slot_stops_at_identical_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("PXL_1.jpg");
        fs::write(&base, b"other").unwrap();
        fs::write(dir.path().join("PXL_1_1.jpg"), b"mine").unwrap();

        let slot = find_slot(&base, |taken| Ok(fs::read(taken).unwrap() == b"mine")).unwrap();
        assert_eq!(slot, Slot::Duplicate(dir.path().join("PXL_1_1.jpg")));

        let slot = find_slot(&base, |_| Ok(false)).unwrap();
        assert_eq!(slot, Slot::Free(dir.path().join("PXL_1_2.jpg")));
    }
}
