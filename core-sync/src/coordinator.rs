//! # Mirror Coordinator
//!
//! Orchestrates one mirror run.
//!
//! ## Workflow
//!
//! 1. Acquire an access token from the `CredentialProvider`
//! 2. Resolve the folder display name to a folder id
//! 3. List the newest files in the folder, capped to the result limit
//! 4. Collect the bucket's existing keys (strategy-dependent)
//! 5. Select files whose marker key is absent
//! 6. For each selected file: write the marker, then notify
//!
//! Stages 1-5 are fatal on error. Stage 6 records per-file failures and
//! keeps going.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::MirrorCoordinator;
//!
//! let coordinator = MirrorCoordinator::new(config, credentials, source, store, notifier);
//! let report = coordinator.run().await?;
//! println!("{}", report);
//! std::process::exit(report.exit_code());
//! ```

use bridge_traits::error::BridgeError;
use bridge_traits::notify::Notifier;
use bridge_traits::object_store::{KeyListing, ObjectStore};
use bridge_traits::source::{FolderMatch, SourceFile, SourceProvider};
use bridge_traits::time::{Clock, SystemClock};
use core_auth::CredentialProvider;
use core_runtime::{DedupStrategy, MirrorConfig};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::diff::select_new_files;
use crate::report::{MirrorReport, MirrorRunId};
use crate::writer::MirrorWriter;
use crate::{Result, SyncError};

/// Existing keys as seen by the chosen strategy.
struct KnownKeys {
    keys: HashSet<String>,
    /// `false` when only the candidates' keys were probed
    listed: bool,
}

pub struct MirrorCoordinator {
    config: MirrorConfig,
    credentials: Arc<dyn CredentialProvider>,
    source: Arc<dyn SourceProvider>,
    store: Arc<dyn ObjectStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl MirrorCoordinator {
    pub fn new(
        config: MirrorConfig,
        credentials: Arc<dyn CredentialProvider>,
        source: Arc<dyn SourceProvider>,
        store: Arc<dyn ObjectStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            credentials,
            source,
            store,
            notifier,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Execute one run.
    ///
    /// # Errors
    ///
    /// Returns an error only when the run cannot reach the write stage.
    /// Per-file failures are reported in the returned [`MirrorReport`].
    #[instrument(skip(self), fields(folder = %self.config.folder_name, bucket = %self.config.bucket_name))]
    pub async fn run(&self) -> Result<MirrorReport> {
        self.config.validate()?;

        let run_id = MirrorRunId::new();
        let started_at = self.clock.now();
        info!(%run_id, dry_run = self.config.dry_run, "Starting mirror run");

        // Phase 1: authorize before touching any API
        self.credentials.access_token().await?;
        debug!("Access token available");

        // Phase 2: resolve the folder
        let folder_id = self.resolve_folder().await?;

        // Phase 3: list source files
        let files = self.list_source_files(&folder_id).await?;
        info!(folder_id = %folder_id, count = files.len(), "Listed source files");

        // Phase 4: existing keys
        let known = self.known_keys(&files).await?;

        // Phase 5: diff
        let candidates = select_new_files(&files, &known.keys, |id| self.config.marker_key(id));
        info!(
            considered = files.len(),
            known_keys = known.keys.len(),
            candidates = candidates.len(),
            "Selected files to mirror"
        );

        // Phase 6: write and notify
        let candidate_count = candidates.len();
        let writer = MirrorWriter::new(self.store.clone(), self.notifier.clone())
            .with_concurrency(self.config.concurrency)
            .with_dry_run(self.config.dry_run);
        let reports = if candidates.is_empty() {
            Vec::new()
        } else {
            writer.write_all(candidates).await
        };

        let report = MirrorReport {
            run_id,
            folder_name: self.config.folder_name.clone(),
            folder_id,
            dry_run: self.config.dry_run,
            files_considered: files.len(),
            keys_known: known.listed.then_some(known.keys.len()),
            candidates: candidate_count,
            files: reports,
            started_at,
            finished_at: self.clock.now(),
        };

        info!(
            %run_id,
            considered = report.files_considered,
            candidates = report.candidates,
            mirrored = report.mirrored(),
            notified = report.notified(),
            notification_failures = report.notification_failures(),
            put_failures = report.put_failures(),
            duration_ms = report.duration_ms(),
            "Mirror run completed"
        );

        Ok(report)
    }

    async fn resolve_folder(&self) -> Result<String> {
        let folder_name = &self.config.folder_name;
        let found = self
            .source
            .resolve_folder(folder_name)
            .await
            .map_err(|e| source_error("resolve folder", e))?;

        match found {
            FolderMatch::NotFound => Err(SyncError::FolderNotFound {
                folder_name: folder_name.clone(),
            }),
            FolderMatch::Unique(id) => Ok(id),
            FolderMatch::Ambiguous { candidates, .. } if self.config.strict_folder_match => {
                Err(SyncError::AmbiguousFolder {
                    folder_name: folder_name.clone(),
                    candidates,
                })
            }
            FolderMatch::Ambiguous { chosen, candidates } => {
                warn!(
                    folder_name = %folder_name,
                    chosen = %chosen,
                    candidates = %candidates.join(","),
                    "Several folders share this name, using the first"
                );
                Ok(chosen)
            }
        }
    }

    async fn list_source_files(&self, folder_id: &str) -> Result<Vec<SourceFile>> {
        let limit = self.config.result_limit;
        let mut files = self
            .source
            .list_files(folder_id, limit)
            .await
            .map_err(|e| source_error("list source folder", e))?;

        if files.len() > limit {
            debug!(returned = files.len(), limit, "Source returned more files than asked for");
            files.sort_by(SourceFile::newest_first);
            files.truncate(limit);
        }

        Ok(files)
    }

    async fn known_keys(&self, files: &[SourceFile]) -> Result<KnownKeys> {
        let prefix = self.config.key_prefix.as_str();

        let listing = match self.config.dedup_strategy {
            DedupStrategy::ListWindow => KeyListing::Window {
                max_keys: self.config.list_max_keys,
            },
            DedupStrategy::ListAll => KeyListing::Exhaustive,
            DedupStrategy::HeadEach => return self.probe_keys(files).await,
        };

        if files.is_empty() {
            return Ok(KnownKeys {
                keys: HashSet::new(),
                listed: true,
            });
        }

        let keys = self
            .store
            .list_keys(prefix, listing)
            .await
            .map_err(|e| SyncError::listing("list bucket keys", e))?;
        debug!(keys = keys.len(), ?listing, "Listed bucket keys");

        Ok(KnownKeys { keys, listed: true })
    }

    /// One existence check per distinct source file.
    async fn probe_keys(&self, files: &[SourceFile]) -> Result<KnownKeys> {
        let mut keys = HashSet::new();
        let mut probed = HashSet::new();

        for file in files {
            let key = self.config.marker_key(&file.id);
            if !probed.insert(key.clone()) {
                continue;
            }
            let exists = self
                .store
                .exists(&key)
                .await
                .map_err(|e| SyncError::listing("check bucket key", e))?;
            if exists {
                keys.insert(key);
            }
        }

        Ok(KnownKeys {
            keys,
            listed: false,
        })
    }
}

/// Source failures that mean "no usable credential" are authorization errors.
fn source_error(stage: &'static str, error: BridgeError) -> SyncError {
    match error {
        BridgeError::NotAvailable(msg) => SyncError::Authorization(msg),
        other => SyncError::listing(stage, other),
    }
}
