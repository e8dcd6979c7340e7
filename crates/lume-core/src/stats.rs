//! Lifetime statistics across batches.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Bumped whenever the on-disk layout changes.
pub const STATS_VERSION: u32 = 1;

/// Receives the totals of every batch that moved at least one file.
pub trait StatsSink {
    fn record_batch(&mut self, files: u64, bytes: u64) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifetimeStats {
    pub version: u32,
    pub total_files: u64,
    pub total_size: u64,
    pub total_batches: u64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Local>>,
}

impl Default for LifetimeStats {
    fn default() -> Self {
        Self {
            version: STATS_VERSION,
            total_files: 0,
            total_size: 0,
            total_batches: 0,
            updated_at: None,
        }
    }
}

impl LifetimeStats {
    pub fn add_batch(&mut self, files: u64, bytes: u64) {
        self.total_files += files;
        self.total_size += bytes;
        self.total_batches += 1;
        self.updated_at = Some(Local::now());
    }

    /// Load from `path`. A missing file is fresh stats; an unreadable or
    /// outdated one is also fresh stats, with a warning.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::read(path) {
            Ok(stats) if stats.version == STATS_VERSION => stats,
            Ok(stats) => {
                warn!(
                    "Stats file {} has version {}, expected {}; starting fresh",
                    path.display(),
                    stats.version,
                    STATS_VERSION
                );
                Self::default()
            }
            Err(e) => {
                warn!("Could not read stats file {}: {:#}; starting fresh", path.display(), e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let stats = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(stats)
    }

    /// Write to a temp file next to `path`, then rename over it.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let temp_path = path.with_extension("json.tmp");

        let file = File::create(&temp_path)
            .with_context(|| format!("creating {}", temp_path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;

        fs::rename(&temp_path, path)
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}

/// In-memory sink.
impl StatsSink for LifetimeStats {
    fn record_batch(&mut self, files: u64, bytes: u64) -> anyhow::Result<()> {
        self.add_batch(files, bytes);
        Ok(())
    }
}

/// Stats persisted to a JSON file after every recorded batch.
#[derive(Debug)]
pub struct StatsFile {
    path: PathBuf,
    stats: LifetimeStats,
}

impl StatsFile {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stats = LifetimeStats::load(&path);
        Self { path, stats }
    }

    pub fn stats(&self) -> &LifetimeStats {
        &self.stats
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatsSink for StatsFile {
    fn record_batch(&mut self, files: u64, bytes: u64) -> anyhow::Result<()> {
        self.stats.add_batch(files, bytes);
        self.stats.save(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let mut store = StatsFile::open(&path);
        assert_eq!(store.stats().total_batches, 0);
        store.record_batch(3, 300).unwrap();
        store.record_batch(2, 50).unwrap();

        let reloaded = LifetimeStats::load(&path);
        assert_eq!(reloaded.total_files, 5);
        assert_eq!(reloaded.total_size, 350);
        assert_eq!(reloaded.total_batches, 2);
        assert!(reloaded.updated_at.is_some());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_loads_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(LifetimeStats::load(&path), LifetimeStats::default());
    }

    #[test]
    fn test_version_mismatch_loads_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        let old = LifetimeStats {
            version: STATS_VERSION + 1,
            total_files: 10,
            ..LifetimeStats::default()
        };
        old.save(&path).unwrap();
        assert_eq!(LifetimeStats::load(&path).total_files, 0);
    }

    #[test]
    fn test_save_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stats.json");
        LifetimeStats::default().save(&path).unwrap();
        assert!(path.exists());
    }
}
