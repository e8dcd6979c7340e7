use std::path::{Component, Path};

use unicode_normalization::UnicodeNormalization;

use crate::error::{LumeError, Result};

/// Placeholder for segments that sanitize to nothing.
pub const UNKNOWN_SEGMENT: &str = "Unknown";

/// Maximum folder name length, in characters.
pub const MAX_SEGMENT_CHARS: usize = 100;

/// Characters that may not appear in a folder name on any supported platform.
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', '.'];

/// Windows device names that cannot be used as file or folder names.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", //
    "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", //
    "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn is_reserved_name(name: &str) -> bool {
    RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Turn an arbitrary label into a single safe folder name.
///
/// The result never contains separators or dots, is at most
/// [`MAX_SEGMENT_CHARS`] characters, and is never a reserved device name.
/// Applying it twice gives the same result as applying it once.
pub fn sanitize_segment(name: &str) -> String {
    let normalized: String = name.nfc().collect();
    let trimmed = normalized.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return UNKNOWN_SEGMENT.to_string();
    }

    let replaced: String = trimmed
        .chars()
        .map(|c| {
            if FORBIDDEN_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let truncated: String = replaced.chars().take(MAX_SEGMENT_CHARS).collect();
    let mut safe = truncated.trim_end().to_string();

    if is_reserved_name(&safe) {
        safe.push_str("_safe");
    }
    safe
}

/// Reject paths with `..` components or a reserved device name as final component.
pub fn check_path_safe(path: &Path) -> Result<()> {
    let traverses = path
        .components()
        .any(|c| matches!(c, Component::ParentDir));
    let reserved = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(is_reserved_name);

    if traverses || reserved {
        return Err(LumeError::PathUnsafe {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
