use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Final state of one processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    /// Relocated into the archive.
    Moved,
    /// An identical file was already in place; the source was left alone.
    Skipped,
    /// Left at its original location.
    Failed,
}

/// Result of processing one file. Built once, only read afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub status: OutcomeStatus,
    pub original_filename: String,
    pub source: PathBuf,
    /// Where the file now lives (moved) or the identical copy it matched (skipped).
    pub destination: Option<PathBuf>,
    pub bytes_moved: u64,
    pub error_detail: Option<String>,
    /// Moved and verified, but the original could not be deleted.
    #[serde(default)]
    pub source_kept: bool,
}

impl MoveOutcome {
    pub fn moved(source: PathBuf, filename: String, destination: PathBuf, bytes: u64) -> Self {
        Self {
            status: OutcomeStatus::Moved,
            original_filename: filename,
            source,
            destination: Some(destination),
            bytes_moved: bytes,
            error_detail: None,
            source_kept: false,
        }
    }

    pub fn skipped(source: PathBuf, filename: String, existing: PathBuf) -> Self {
        Self {
            status: OutcomeStatus::Skipped,
            original_filename: filename,
            source,
            destination: Some(existing),
            bytes_moved: 0,
            error_detail: None,
            source_kept: false,
        }
    }

    pub fn failed(source: PathBuf, filename: String, error: impl ToString) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            original_filename: filename,
            source,
            destination: None,
            bytes_moved: 0,
            error_detail: Some(error.to_string()),
            source_kept: false,
        }
    }

    /// Mark a move whose source is still on disk next to the archived copy.
    pub fn with_source_kept(mut self, kept: bool) -> Self {
        self.source_kept = kept;
        self
    }

    pub fn success(&self) -> bool {
        self.status != OutcomeStatus::Failed
    }
}

/// Aggregate of one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub moved: u64,
    pub skipped_duplicates: u64,
    pub failed: u64,
    pub bytes_moved: u64,
    /// True when the batch stopped early on request.
    pub cancelled: bool,
    pub outcomes: Vec<MoveOutcome>,
}

impl BatchResult {
    pub fn from_outcomes(outcomes: Vec<MoveOutcome>, cancelled: bool) -> Self {
        let mut result = Self {
            cancelled,
            ..Self::default()
        };
        for o in &outcomes {
            match o.status {
                OutcomeStatus::Moved => {
                    result.moved += 1;
                    result.bytes_moved += o.bytes_moved;
                }
                OutcomeStatus::Skipped => result.skipped_duplicates += 1,
                OutcomeStatus::Failed => result.failed += 1,
            }
        }
        result.outcomes = outcomes;
        result
    }

    pub fn processed(&self) -> u64 {
        self.moved + self.skipped_duplicates + self.failed
    }

    pub fn failures(&self) -> impl Iterator<Item = &MoveOutcome> {
        self.outcomes.iter().filter(|o| !o.success())
    }

    /// Human-readable list of at most `limit` failures, pointing at the log
    /// for the rest. None when nothing failed.
    pub fn failure_report(&self, limit: usize) -> Option<String> {
        if self.failed == 0 {
            return None;
        }
        let mut report = String::new();
        for o in self.failures().take(limit) {
            let detail = o.error_detail.as_deref().unwrap_or("unknown error");
            report.push_str(&format!("- {}: {}\n", o.original_filename, detail));
        }
        let hidden = self.failed.saturating_sub(limit as u64);
        if hidden > 0 {
            report.push_str(&format!("... and {} more, see log\n", hidden));
        }
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(name: &str) -> MoveOutcome {
        MoveOutcome::failed(PathBuf::from(name), name.to_string(), "copy failed")
    }

    #[test]
    fn test_aggregation() {
        let outcomes = vec![
            MoveOutcome::moved("a".into(), "a.jpg".into(), "x/a.jpg".into(), 100),
            MoveOutcome::moved("b".into(), "b.jpg".into(), "x/b.jpg".into(), 50),
            MoveOutcome::skipped("c".into(), "c.jpg".into(), "x/c.jpg".into()),
            failed("d.jpg"),
        ];
        let result = BatchResult::from_outcomes(outcomes, false);
        assert_eq!(result.moved, 2);
        assert_eq!(result.skipped_duplicates, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.bytes_moved, 150);
        assert_eq!(result.processed(), 4);
        assert!(!result.cancelled);
    }

    #[test]
    fn test_failure_report_is_capped() {
        let outcomes: Vec<_> = (0..13).map(|i| failed(&format!("f{}.jpg", i))).collect();
        let result = BatchResult::from_outcomes(outcomes, false);

        let report = result.failure_report(10).unwrap();
        assert_eq!(report.lines().filter(|l| l.starts_with("- ")).count(), 10);
        assert!(report.contains("f0.jpg: copy failed"));
        assert!(!report.contains("f10.jpg"));
        assert!(report.contains("3 more, see log"));
    }

    #[test]
    fn test_no_report_without_failures() {
        let result = BatchResult::from_outcomes(
            vec![MoveOutcome::moved("a".into(), "a.jpg".into(), "x/a.jpg".into(), 1)],
            false,
        );
        assert!(result.failure_report(10).is_none());
    }
}
