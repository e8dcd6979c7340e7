//! Candidate discovery and root validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{LumeError, Result};
use crate::media::media_kind;
use crate::sanitize::check_path_safe;

/// Where a batch gets its candidate files from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CandidateSource {
    /// Walk this folder recursively.
    Directory(PathBuf),
    /// An explicit list, e.g. from drag and drop. Vetted before use.
    Files(Vec<PathBuf>),
}

/// Canonical form of a root that may not exist yet: the deepest existing
/// ancestor is canonicalized and the missing tail re-attached.
pub fn resolve_root(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| LumeError::io("resolve working directory", path, e))?
            .join(path)
    };

    let mut existing = absolute.as_path();
    let mut tail = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(canonical) => {
                let mut resolved = canonical;
                for part in tail.iter().rev() {
                    resolved.push(part);
                }
                return Ok(resolved);
            }
            Err(e) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    tail.push(name.to_os_string());
                    existing = parent;
                }
                _ => return Err(LumeError::io("resolve path", path, e)),
            },
        }
    }
}

/// Check a source/target pair before anything is touched.
///
/// Returns the canonical source and target roots.
pub fn validate_roots(source: &Path, target: &Path) -> Result<(PathBuf, PathBuf)> {
    let source_root = source
        .canonicalize()
        .map_err(|e| LumeError::io("read source root", source, e))?;
    if !source_root.is_dir() {
        return Err(LumeError::io(
            "read source root",
            source,
            std::io::Error::other("not a directory"),
        ));
    }
    let target_root = resolve_root(target)?;

    if source_root == target_root {
        return Err(LumeError::SourceEqualsDestination { path: source_root });
    }
    if target_root.starts_with(&source_root) {
        return Err(LumeError::DestinationInsideSource {
            source_root,
            destination_root: target_root,
        });
    }
    Ok((source_root, target_root))
}

fn cap(mut candidates: Vec<PathBuf>, max_files: usize) -> Vec<PathBuf> {
    if candidates.len() > max_files {
        warn!(
            "Found {} media files, only the first {} are processed this batch",
            candidates.len(),
            max_files
        );
        candidates.truncate(max_files);
    }
    candidates
}

/// Walk `root` for media files, sorted by file name, without following links.
///
/// Anything under `target_root` is pruned so a rerun never picks up files it
/// already placed.
pub fn scan_directory(root: &Path, target_root: &Path, max_files: usize) -> Result<Vec<PathBuf>> {
    fs::read_dir(root).map_err(|e| LumeError::io("read source root", root, e))?;

    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !entry.path().starts_with(target_root));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if media_kind(entry.path()).is_none() {
            continue;
        }
        found.push(entry.into_path());
    }

    debug!("Discovered {} media files under {}", found.len(), root.display());
    Ok(cap(found, max_files))
}

/// Vet an externally supplied list of paths.
///
/// Unsafe paths, symbolic links, non-files and files already inside the
/// target are dropped with a log line. Order is kept.
pub fn scan_paths(paths: &[PathBuf], target_root: &Path, max_files: usize) -> Vec<PathBuf> {
    let mut vetted = Vec::with_capacity(paths.len().min(max_files));
    for path in paths {
        if let Err(e) = check_path_safe(path) {
            warn!("{}", e);
            continue;
        }
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if meta.file_type().is_symlink() {
            warn!("Skipping symbolic link {}", path.display());
            continue;
        }
        if !meta.is_file() {
            debug!("Skipping non-file {}", path.display());
            continue;
        }
        let canonical = match path.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if canonical.starts_with(target_root) {
            debug!("Skipping {}, already inside target", path.display());
            continue;
        }
        vetted.push(canonical);
    }
    cap(vetted, max_files)
}

/// Resolve a [`CandidateSource`] into the list of files to classify.
pub fn discover(
    source: &CandidateSource,
    target_root: &Path,
    max_files: usize,
) -> Result<Vec<PathBuf>> {
    match source {
        CandidateSource::Directory(root) => {
            let root = root
                .canonicalize()
                .map_err(|e| LumeError::io("read source root", root, e))?;
            scan_directory(&root, target_root, max_files)
        }
        CandidateSource::Files(paths) => Ok(scan_paths(paths, target_root, max_files)),
    }
}
