pub mod cancel;
pub mod config;
pub mod conflict;
pub mod dedup;
pub mod error;
pub mod media;
pub mod metadata;
pub mod mover;
pub mod organizer;
pub mod outcome;
pub mod preflight;
pub mod sanitize;
pub mod scan;
pub mod stats;

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub use cancel::{CancellationToken, Cancelled};
pub use config::{ConfigError, LumeConfig};
pub use error::{LumeError, Result};
pub use media::{FileRecord, MediaKind};
pub use mover::MoveStrategy;
pub use outcome::{BatchResult, MoveOutcome, OutcomeStatus};
pub use preflight::{Preflight, SystemPreflight};
pub use scan::CandidateSource;
pub use stats::{LifetimeStats, StatsFile, StatsSink};

use dedup::{Sha256Hasher, DEFAULT_BUFFER_SIZE};
use mover::AtomicMover;

fn default_max_files() -> usize {
    config::DEFAULT_MAX_FILES
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeOptions {
    pub target_root: PathBuf,
    pub candidates: CandidateSource,
    #[serde(default)]
    pub move_strategy: MoveStrategy,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl OrganizeOptions {
    /// Organize everything under `source_dir` into `target_root`.
    pub fn new(source_dir: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            target_root: target_root.into(),
            candidates: CandidateSource::Directory(source_dir.into()),
            move_strategy: MoveStrategy::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_files: config::DEFAULT_MAX_FILES,
        }
    }

    /// Organize an explicit list of files into `target_root`.
    pub fn with_files(files: Vec<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            candidates: CandidateSource::Files(files),
            ..Self::new(PathBuf::new(), target_root)
        }
    }

    /// Apply the tunables from a loaded configuration.
    pub fn with_config(mut self, config: &LumeConfig) -> Self {
        self.max_files = config.max_files;
        self.buffer_size = config.buffer_size;
        if config.force_copy {
            self.move_strategy = MoveStrategy::CopyOnly;
        }
        self
    }
}

/// Control hooks for a batch (cancellation, preflight, statistics).
#[derive(Default)]
pub struct BatchControl<'a> {
    /// Checked between files.
    pub cancel_token: Option<CancellationToken>,
    /// Defaults to [`SystemPreflight`].
    pub preflight: Option<&'a dyn Preflight>,
    /// Receives the batch totals when anything moved.
    pub stats: Option<&'a mut dyn StatsSink>,
}

impl<'a> BatchControl<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn with_preflight(mut self, preflight: &'a dyn Preflight) -> Self {
        self.preflight = Some(preflight);
        self
    }

    pub fn with_stats(mut self, stats: &'a mut dyn StatsSink) -> Self {
        self.stats = Some(stats);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(|token| token.check().is_err())
    }
}

/// Type alias for progress callback: `(stage, current, total, message)`.
pub type ProgressCallback = dyn Fn(&str, u64, u64, &str) + Send + Sync;

/// Throttled progress reporter: emits at most every 200ms, plus the final call.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback,
    last_emit: std::sync::Mutex<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback) -> Self {
        let start = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .unwrap_or_else(Instant::now);
        Self {
            inner,
            last_emit: std::sync::Mutex::new(start),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current >= total;
        if !is_done {
            if let Ok(mut last) = self.last_emit.lock() {
                if last.elapsed().as_millis() < 200 {
                    return;
                }
                *last = Instant::now();
            }
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Run one batch with default control hooks.
pub fn organize(options: &OrganizeOptions, progress: &ProgressCallback) -> Result<BatchResult> {
    organize_with_control(options, BatchControl::default(), progress)
}

/// Run one batch.
///
/// Batch-level problems (bad roots, unwritable target, not enough space)
/// are returned as `Err` before any file is touched. Per-file problems end
/// up in the returned outcomes.
pub fn organize_with_control(
    options: &OrganizeOptions,
    control: BatchControl<'_>,
    progress: &ProgressCallback,
) -> Result<BatchResult> {
    let result = run_batch(options, control, progress);
    if let Err(e) = &result {
        if e.is_batch_level() {
            error!("Batch aborted: {}", e);
        } else {
            error!("Batch failed before any file was moved: {}", e);
        }
    }
    result
}

fn run_batch(
    options: &OrganizeOptions,
    mut control: BatchControl<'_>,
    progress: &ProgressCallback,
) -> Result<BatchResult> {
    let tp = ThrottledProgress::new(progress);

    // Stage 1: roots
    let target_root = match &options.candidates {
        CandidateSource::Directory(source) => scan::validate_roots(source, &options.target_root)?.1,
        CandidateSource::Files(_) => scan::resolve_root(&options.target_root)?,
    };
    fs::create_dir_all(&target_root)
        .map_err(|e| LumeError::io("create target root", &target_root, e))?;

    // Stage 2: discovery
    let candidates = scan::discover(&options.candidates, &target_root, options.max_files)?;
    let total = candidates.len() as u64;
    info!("Organizing {} files into {}", total, target_root.display());

    // Stage 3: classification
    let mut outcomes = Vec::new();
    let mut records = Vec::with_capacity(candidates.len());
    for (i, path) in candidates.iter().enumerate() {
        if control.cancelled() {
            return Ok(finish(outcomes, true, &mut control));
        }
        match metadata::extract(path) {
            Ok(record) => records.push(record),
            Err(LumeError::UnsupportedFormat { .. }) => {
                debug!("Ignoring unsupported file {}", path.display());
            }
            Err(e) => {
                error!("Could not classify {}: {}", path.display(), e);
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                outcomes.push(MoveOutcome::failed(path.clone(), name, e));
            }
        }
        tp.report("classify", i as u64 + 1, total, "Reading metadata");
    }

    if records.is_empty() {
        return Ok(finish(outcomes, false, &mut control));
    }

    // Stage 4: preflight
    let required: u64 = records.iter().map(FileRecord::size).sum();
    let preflight = control.preflight.unwrap_or(&SystemPreflight);
    preflight.check(&target_root, required)?;

    // Stage 5: placement
    let mover = AtomicMover::new(Sha256Hasher::with_buffer_size(options.buffer_size))
        .with_strategy(options.move_strategy)
        .with_buffer_size(options.buffer_size);
    let place_total = records.len() as u64;
    let mut cancelled = false;

    for (i, record) in records.iter().enumerate() {
        if control.cancelled() {
            warn!("Cancelled after {} of {} files", i, place_total);
            cancelled = true;
            break;
        }
        let outcome = organizer::place(record, &target_root, &mover);
        tp.report("organize", i as u64 + 1, place_total, record.filename());
        outcomes.push(outcome);
    }

    Ok(finish(outcomes, cancelled, &mut control))
}

fn finish(outcomes: Vec<MoveOutcome>, cancelled: bool, control: &mut BatchControl<'_>) -> BatchResult {
    let result = BatchResult::from_outcomes(outcomes, cancelled);
    info!(
        "Batch done: {} moved, {} duplicates skipped, {} failed",
        result.moved, result.skipped_duplicates, result.failed
    );
    if result.moved > 0 {
        if let Some(stats) = control.stats.as_deref_mut() {
            if let Err(e) = stats.record_batch(result.moved, result.bytes_moved) {
                warn!("Could not record statistics: {:#}", e);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_throttle_always_emits_completion() {
        let calls = std::sync::Arc::new(AtomicU64::new(0));
        let cb_calls = std::sync::Arc::clone(&calls);
        let cb = move |_: &str, _: u64, _: u64, _: &str| {
            cb_calls.fetch_add(1, Ordering::SeqCst);
        };
        let tp = ThrottledProgress::new(&cb);
        for i in 1..=100 {
            tp.report("organize", i, 100, "");
        }
        let n = calls.load(Ordering::SeqCst);
        // First emit passes the throttle, the final one always does.
        assert!(n >= 2);
        assert!(n < 100);
    }

    #[test]
    fn test_options_from_config() {
        let config = LumeConfig {
            max_files: 5,
            buffer_size: 8192,
            force_copy: true,
            ..LumeConfig::default()
        };
        let options = OrganizeOptions::new("/in", "/out").with_config(&config);
        assert_eq!(options.max_files, 5);
        assert_eq!(options.buffer_size, 8192);
        assert_eq!(options.move_strategy, MoveStrategy::CopyOnly);
    }

    #[test]
    fn test_options_deserialize_defaults() {
        let json = r#"{"target_root":"/out","candidates":{"Directory":"/in"}}"#;
        let options: OrganizeOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.max_files, 10_000);
        assert_eq!(options.buffer_size, 64 * 1024);
        assert_eq!(options.move_strategy, MoveStrategy::PreferRename);
    }
}
