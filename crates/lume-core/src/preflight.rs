//! Writability and free-space checks run once before a batch moves anything.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use sysinfo::Disks;
use tracing::{debug, warn};

use crate::conflict::resolve_conflict;
use crate::error::{LumeError, Result};

/// Name of the probe file written into the target during the write check.
pub const WRITE_PROBE_NAME: &str = ".lume_write_test";

/// Validates that a target can take `required_bytes` of new files.
pub trait Preflight {
    fn check(&self, target: &Path, required_bytes: u64) -> Result<()>;
}

/// Checks against the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPreflight;

impl Preflight for SystemPreflight {
    fn check(&self, target: &Path, required_bytes: u64) -> Result<()> {
        check_writability(target)?;
        check_disk_space(target, required_bytes)
    }
}

/// Write and remove a probe file in `target`.
///
/// The probe is always a fresh file; an existing file under the probe name
/// is left untouched and a numbered name is used instead.
pub fn check_writability(target: &Path) -> Result<()> {
    let mut probe = target.join(WRITE_PROBE_NAME);
    if fs::symlink_metadata(&probe).is_ok() {
        probe = resolve_conflict(&probe);
    }
    let not_writable = |e: std::io::Error| LumeError::NotWritable {
        path: target.to_path_buf(),
        reason: e.to_string(),
    };

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)
        .map_err(not_writable)?;
    let written = file.write_all(b"lume").and_then(|_| file.sync_all());
    drop(file);
    if let Err(e) = fs::remove_file(&probe) {
        warn!("Could not remove write probe {}: {}", probe.display(), e);
    }
    written.map_err(not_writable)
}

/// Free space on the disk holding `target`, if one can be matched.
pub fn available_space(target: &Path) -> Option<u64> {
    let target = target.canonicalize().unwrap_or_else(|_| target.to_path_buf());
    let disks = Disks::new_with_refreshed_list();

    // Longest mount point that prefixes the target wins ("/" vs "/home").
    let mut best: Option<(PathBuf, u64)> = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if !target.starts_with(mount) {
            continue;
        }
        let deeper = best
            .as_ref()
            .map_or(true, |(m, _)| mount.components().count() > m.components().count());
        if deeper {
            best = Some((mount.to_path_buf(), disk.available_space()));
        }
    }
    best.map(|(mount, space)| {
        debug!("Target {} is on {} ({} bytes free)", target.display(), mount.display(), space);
        space
    })
}

pub fn check_disk_space(target: &Path, required_bytes: u64) -> Result<()> {
    let Some(available) = available_space(target) else {
        warn!(
            "Could not determine free space for {}, skipping space check",
            target.display()
        );
        return Ok(());
    };
    if available < required_bytes {
        return Err(LumeError::InsufficientDiskSpace {
            path: target.to_path_buf(),
            required_bytes,
            available_bytes: available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writable_target_leaves_no_probe() {
        let dir = tempfile::tempdir().unwrap();
        check_writability(dir.path()).unwrap();
        assert!(!dir.path().join(WRITE_PROBE_NAME).exists());
    }

    #[test]
    fn test_existing_file_under_probe_name_survives() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join(WRITE_PROBE_NAME);
        fs::write(&existing, b"user data").unwrap();

        check_writability(dir.path()).unwrap();
        assert_eq!(fs::read(&existing).unwrap(), b"user data");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_target_not_writable() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_writability(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, LumeError::NotWritable { .. }));
    }

    #[test]
    fn test_zero_bytes_always_fits() {
        let dir = tempfile::tempdir().unwrap();
        SystemPreflight.check(dir.path(), 0).unwrap();
    }

    #[test]
    fn test_impossible_requirement() {
        let dir = tempfile::tempdir().unwrap();
        // Only meaningful where the disk can be matched.
        if available_space(dir.path()).is_some() {
            let err = check_disk_space(dir.path(), u64::MAX).unwrap_err();
            assert!(matches!(err, LumeError::InsufficientDiskSpace { .. }));
        }
    }
}
