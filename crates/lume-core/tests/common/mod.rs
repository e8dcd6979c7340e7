#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use lume_core::{LumeError, Preflight};

/// 2021-07-15 12:00:00 UTC, mid-month in every timezone.
pub const JULY_2021: i64 = 1_626_350_400;

pub fn no_progress() -> impl Fn(&str, u64, u64, &str) + Send + Sync {
    |_: &str, _: u64, _: u64, _: &str| {}
}

/// Minimal JPEG carrying an APP1 EXIF segment.
pub fn jpeg_with_exif(datetime: Option<&str>, model: Option<&str>) -> Vec<u8> {
    let ascii = |tag: Tag, value: &str| Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![value.as_bytes().to_vec()]),
    };
    let mut fields = Vec::new();
    if let Some(m) = model {
        fields.push(ascii(Tag::Model, m));
    }
    if let Some(dt) = datetime {
        fields.push(ascii(Tag::DateTimeOriginal, dt));
    }

    let mut writer = Writer::new();
    for f in &fields {
        writer.push_field(f);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// Write `content` at `path` (creating parents) with a pinned mtime.
pub fn write_file(path: &Path, content: &[u8]) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(JULY_2021, 0)).unwrap();
    path.to_path_buf()
}

/// Source and destination roots inside one temp dir.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let source = root.join("inbox");
        let dest = root.join("archive");
        fs::create_dir_all(&source).unwrap();
        Self { dir, source, dest }
    }
}

/// Accepts every target.
pub struct AcceptAll;

impl Preflight for AcceptAll {
    fn check(&self, _target: &Path, _required_bytes: u64) -> lume_core::Result<()> {
        Ok(())
    }
}

/// Reports the target as full.
pub struct DiskFull;

impl Preflight for DiskFull {
    fn check(&self, target: &Path, required_bytes: u64) -> lume_core::Result<()> {
        Err(LumeError::InsufficientDiskSpace {
            path: target.to_path_buf(),
            required_bytes,
            available_bytes: 0,
        })
    }
}
