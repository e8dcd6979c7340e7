use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{LumeError, Result};

/// Default read buffer for streaming hashes and copies.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Hex-encoded content digest of a whole file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whole-file content hashing. The mover and the duplicate check both go
/// through this, so tests can count or falsify hashes.
pub trait ContentHasher {
    fn hash_file(&self, path: &Path) -> Result<ContentHash>;
}

impl<T: ContentHasher + ?Sized> ContentHasher for &T {
    fn hash_file(&self, path: &Path) -> Result<ContentHash> {
        (**self).hash_file(path)
    }
}

/// SHA-256 over the file contents, read in constant memory.
#[derive(Debug, Clone)]
pub struct Sha256Hasher {
    buffer_size: usize,
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }
}

impl Sha256Hasher {
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(4096),
        }
    }
}

impl ContentHasher for Sha256Hasher {
    fn hash_file(&self, path: &Path) -> Result<ContentHash> {
        let file = File::open(path).map_err(|e| LumeError::io("open for hashing", path, e))?;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);
        let mut hasher = Sha256::new();
        io::copy(&mut reader, &mut hasher).map_err(|e| LumeError::io("hash", path, e))?;
        Ok(ContentHash(hex::encode(hasher.finalize())))
    }
}

/// Whether `candidate` has the same content as `existing`.
///
/// Sizes are compared first; files of different size are never hashed.
/// Any stat or read failure is returned rather than guessed.
pub fn is_duplicate(candidate: &Path, existing: &Path, hasher: &impl ContentHasher) -> Result<bool> {
    let candidate_size = fs::metadata(candidate)
        .map_err(|e| LumeError::io("stat source", candidate, e))?
        .len();
    let existing_size = fs::metadata(existing)
        .map_err(|e| LumeError::io("stat destination", existing, e))?
        .len();

    if candidate_size != existing_size {
        return Ok(false);
    }

    let candidate_hash = hasher.hash_file(candidate)?;
    let existing_hash = hasher.hash_file(existing)?;
    Ok(candidate_hash == existing_hash)
}
