//! # Mirror Writer
//!
//! Writes one marker object per candidate, then announces it. A failed put
//! skips the announcement; a failed announcement keeps the marker.

use bridge_traits::notify::{Notification, Notifier};
use bridge_traits::object_store::{MarkerObject, ObjectStore};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::diff::MirrorCandidate;
use crate::report::{FileOutcome, FileReport};

pub struct MirrorWriter {
    store: Arc<dyn ObjectStore>,
    notifier: Arc<dyn Notifier>,
    concurrency: usize,
    dry_run: bool,
}

impl MirrorWriter {
    pub fn new(store: Arc<dyn ObjectStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            concurrency: 1,
            dry_run: false,
        }
    }

    /// Files processed at once. 1 keeps the run strictly sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Process every candidate. The returned reports follow candidate order
    /// regardless of completion order.
    pub async fn write_all(&self, candidates: Vec<MirrorCandidate>) -> Vec<FileReport> {
        let mut reports: Vec<(usize, FileReport)> = stream::iter(candidates.into_iter().enumerate())
            .map(|(index, candidate)| async move { (index, self.write_one(candidate).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        reports.sort_by_key(|(index, _)| *index);
        reports.into_iter().map(|(_, report)| report).collect()
    }

    async fn write_one(&self, candidate: MirrorCandidate) -> FileReport {
        let outcome = self.mirror(&candidate).await;
        FileReport {
            file_id: candidate.file.id,
            file_name: candidate.file.name,
            key: candidate.key,
            outcome,
        }
    }

    async fn mirror(&self, candidate: &MirrorCandidate) -> FileOutcome {
        let file = &candidate.file;

        if self.dry_run {
            info!(file_id = %file.id, file_name = %file.name, key = %candidate.key, "Would mirror file");
            return FileOutcome::DryRun;
        }

        let marker = MarkerObject::new(candidate.key.clone());
        if let Err(e) = self.store.put_marker(&marker).await {
            error!(file_id = %file.id, key = %candidate.key, error = %e, "Failed to write marker object");
            return FileOutcome::PutFailed {
                reason: e.to_string(),
            };
        }

        let notification = Notification::new(file.name.clone(), file.id.clone());
        match self.notifier.notify(&notification).await {
            Ok(()) => {
                info!(file_id = %file.id, file_name = %file.name, "Mirrored file");
                FileOutcome::Mirrored
            }
            Err(e) => {
                warn!(
                    file_id = %file.id,
                    file_name = %file.name,
                    error = %e,
                    "Marker written but notification failed"
                );
                FileOutcome::MirroredNotifyFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
