//! # Run Report
//!
//! Per-run summary of what was considered, mirrored and announced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::EXIT_PARTIAL_FAILURE;

/// Unique identifier for a mirror run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MirrorRunId(Uuid);

impl MirrorRunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MirrorRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MirrorRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened to one candidate file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Marker written and notification delivered
    Mirrored,
    /// Marker written, notification failed. The marker is kept.
    MirroredNotifyFailed { reason: String },
    /// Marker could not be written; no notification was attempted
    PutFailed { reason: String },
    /// Dry run: nothing was written
    DryRun,
}

impl FileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FileOutcome::MirroredNotifyFailed { .. } | FileOutcome::PutFailed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub file_id: String,
    pub file_name: String,
    pub key: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorReport {
    pub run_id: MirrorRunId,
    pub folder_name: String,
    pub folder_id: String,
    pub dry_run: bool,
    /// Files returned by the source listing (after the limit)
    pub files_considered: usize,
    /// Size of the listed key set; `None` when keys were checked one by one
    pub keys_known: Option<usize>,
    pub candidates: usize,
    pub files: Vec<FileReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MirrorReport {
    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| predicate(&f.outcome)).count()
    }

    /// Markers written during the run, whether or not the notification landed.
    pub fn mirrored(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                FileOutcome::Mirrored | FileOutcome::MirroredNotifyFailed { .. }
            )
        })
    }

    pub fn notified(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Mirrored))
    }

    pub fn notification_failures(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::MirroredNotifyFailed { .. }))
    }

    pub fn put_failures(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::PutFailed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.files.iter().any(|f| f.outcome.is_failure())
    }

    /// 0 on a clean run, otherwise the partial-failure status.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            EXIT_PARTIAL_FAILURE
        } else {
            0
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0)
    }
}

impl fmt::Display for MirrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(
            f,
            "Mirror run {}{}: folder {:?} ({})",
            self.run_id, mode, self.folder_name, self.folder_id
        )?;

        let keys = self
            .keys_known
            .map(|n| n.to_string())
            .unwrap_or_else(|| "checked per file".to_string());
        writeln!(
            f,
            "  considered {}, existing keys {}, new {}",
            self.files_considered, keys, self.candidates
        )?;

        if self.dry_run {
            for file in &self.files {
                writeln!(f, "  would mirror {} ({})", file.file_name, file.file_id)?;
            }
        } else {
            writeln!(
                f,
                "  mirrored {}, notified {}, notification failures {}, put failures {}",
                self.mirrored(),
                self.notified(),
                self.notification_failures(),
                self.put_failures()
            )?;
        }

        for file in &self.files {
            match &file.outcome {
                FileOutcome::PutFailed { reason } => {
                    writeln!(f, "  FAILED put {} ({}): {}", file.file_name, file.file_id, reason)?
                }
                FileOutcome::MirroredNotifyFailed { reason } => writeln!(
                    f,
                    "  FAILED notify {} ({}): {}",
                    file.file_name, file.file_id, reason
                )?,
                FileOutcome::Mirrored | FileOutcome::DryRun => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, outcome: FileOutcome) -> FileReport {
        FileReport {
            file_id: id.to_string(),
            file_name: format!("{}.txt", id),
            key: id.to_string(),
            outcome,
        }
    }

    fn report(files: Vec<FileReport>) -> MirrorReport {
        let now = Utc::now();
        MirrorReport {
            run_id: MirrorRunId::new(),
            folder_name: "Invoices".to_string(),
            folder_id: "folder1".to_string(),
            dry_run: false,
            files_considered: 5,
            keys_known: Some(2),
            candidates: files.len(),
            files,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_counts() {
        let report = report(vec![
            file("a", FileOutcome::Mirrored),
            file(
                "b",
                FileOutcome::MirroredNotifyFailed {
                    reason: "404".into(),
                },
            ),
            file(
                "c",
                FileOutcome::PutFailed {
                    reason: "denied".into(),
                },
            ),
        ]);

        assert_eq!(report.mirrored(), 2);
        assert_eq!(report.notified(), 1);
        assert_eq!(report.notification_failures(), 1);
        assert_eq!(report.put_failures(), 1);
        assert!(report.has_failures());
        assert_eq!(report.exit_code(), 4);
    }

    #[test]
    fn test_clean_run_exits_zero() {
        let report = report(vec![file("a", FileOutcome::Mirrored)]);
        assert_eq!(report.exit_code(), 0);
        assert!(report.to_string().contains("mirrored 1, notified 1"));
    }

    #[test]
    fn test_summary_names_failures() {
        let report = report(vec![file(
            "c",
            FileOutcome::PutFailed {
                reason: "denied".into(),
            },
        )]);

        assert!(report.to_string().contains("FAILED put c.txt (c): denied"));
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(file(
            "b",
            FileOutcome::MirroredNotifyFailed {
                reason: "404".into(),
            },
        ))
        .unwrap();

        assert_eq!(json["outcome"], "mirrored_notify_failed");
        assert_eq!(json["reason"], "404");
        assert_eq!(json["file_id"], "b");
    }
}
