use crate::config::RunConfig;
use crate::core::archive::{Archive, Archiver};
use crate::core::notify::{Notify, RunStatus, WebhookPayload};
use crate::core::retention::{foreign_objects, select_for_deletion};
use crate::core::run_log::RunLog;
use crate::core::timestamp::RunTimestamp;
use crate::errors::ArchiveError;
use crate::output::RunProgress;
use crate::storage_clients::RemoteStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RunStage {
    Created,
    Uploaded,
    Rotated,
    Notified,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct UploadOutcome {
    pub(crate) ok: bool,
    pub(crate) remote_object_id: String,
    pub(crate) error: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunReport {
    pub(crate) project: String,
    pub(crate) timestamp: RunTimestamp,
    pub(crate) archive_path: PathBuf,
    pub(crate) archive_size: u64,
    pub(crate) log_path: PathBuf,
    pub(crate) upload: UploadOutcome,
    pub(crate) deleted_objects: Vec<String>,
    pub(crate) notification: Option<String>,
    pub(crate) stage: RunStage,
}

/// State of one run. Only exists while the run executes.
struct BackupRun {
    project_name: String,
    archive: Archive,
    log: RunLog,
    stage: RunStage,
    upload: Option<UploadOutcome>,
    deleted_objects: Vec<String>,
    notification: Option<String>,
}

impl BackupRun {
    fn new(config: &RunConfig, archive: Archive) -> Self {
        let log = RunLog::for_project(&config.project_dir, archive.timestamp.clone());

        Self {
            project_name: config.project_name.clone(),
            archive,
            log,
            stage: RunStage::Created,
            upload: None,
            deleted_objects: Vec::new(),
            notification: None,
        }
    }

    fn timestamp(&self) -> &RunTimestamp {
        &self.archive.timestamp
    }

    /// A log line that cannot be written is reported and the run goes on.
    fn record(&self, message: &str) {
        if let Err(e) = self.log.append(message) {
            tracing::warn!(
                path = %self.log.path().display(),
                error = %e,
                "failed to append to backup log"
            );
        }
    }

    fn advance(&mut self, stage: RunStage) {
        tracing::info!(timestamp = %self.timestamp(), from = ?self.stage, to = ?stage, "run stage");
        self.stage = stage;
    }

    fn upload_succeeded(&self) -> bool {
        self.upload.as_ref().is_some_and(|upload| upload.ok)
    }

    fn into_report(self) -> RunReport {
        RunReport {
            project: self.project_name,
            timestamp: self.archive.timestamp,
            archive_path: self.archive.path,
            archive_size: self.archive.size,
            log_path: self.log.path().to_path_buf(),
            upload: self.upload.unwrap_or(UploadOutcome {
                ok: false,
                remote_object_id: String::new(),
                error: "upload was not attempted".to_string(),
            }),
            deleted_objects: self.deleted_objects,
            notification: self.notification,
            stage: self.stage,
        }
    }
}

/// Runs archive, upload, rotation and notification in that order.
///
/// Only the archive stage can fail the run. Every later stage runs no
/// matter how the previous one went, and its outcome is logged first.
pub(crate) struct Orchestrator {
    archiver: Archiver,
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notify>,
}

impl Orchestrator {
    pub(crate) fn new(
        archiver: Archiver,
        store: Arc<dyn RemoteStore>,
        notifier: Arc<dyn Notify>,
    ) -> Self {
        Self {
            archiver,
            store,
            notifier,
        }
    }

    pub(crate) async fn run(
        &self,
        config: &RunConfig,
        progress: &RunProgress,
    ) -> Result<RunReport, ArchiveError> {
        progress.stage("Creating archive...");

        let archive = self
            .archiver
            .create_archive(&config.project_dir, &config.project_name)
            .await?;

        let mut run = BackupRun::new(config, archive);
        run.record(&format!("Backup created: {}", run.archive.path.display()));

        progress.stage(&format!("Uploading {}...", run.archive.file_name));
        self.upload(&mut run).await;
        run.advance(RunStage::Uploaded);

        // Runs even when the upload failed, so the last good remote copy can
        // be rotated out while the new one never arrived.
        progress.stage("Applying retention policy...");
        self.rotate(&mut run, config).await;
        run.advance(RunStage::Rotated);

        if let Some(url) = &config.webhook_url {
            progress.stage("Sending notification...");
            self.notify(&mut run, url, config.no_notify).await;
            run.advance(RunStage::Notified);
        }

        self.cleanup(&run, config.keep_local).await;
        run.advance(RunStage::Done);

        Ok(run.into_report())
    }

    async fn upload(&self, run: &mut BackupRun) {
        let outcome = match self.store.upload(&run.archive.path).await {
            Ok(remote_object_id) => UploadOutcome {
                ok: true,
                remote_object_id,
                error: String::new(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "upload failed");
                UploadOutcome {
                    ok: false,
                    remote_object_id: self.store.object_id(&run.archive.file_name),
                    error: e.to_string(),
                }
            }
        };

        if outcome.ok {
            run.record(&format!("Uploaded to {}", outcome.remote_object_id));
        } else {
            run.record(&format!("Upload failed: {}", outcome.error));
        }

        run.upload = Some(outcome);
    }

    async fn rotate(&self, run: &mut BackupRun, config: &RunConfig) {
        let listing = match self.store.list().await {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(error = %e, "listing remote objects failed, treating namespace as empty");
                Vec::new()
            }
        };

        let foreign = foreign_objects(&listing, &config.project_name);
        if !foreign.is_empty() {
            tracing::warn!(
                objects = ?foreign,
                "namespace holds objects not named after this project; rotation order may not be chronological"
            );
        }

        let selected = select_for_deletion(&listing, config.retention);

        for name in &selected {
            // Delete failures are not surfaced past this point.
            if let Err(e) = self.store.delete(name).await {
                tracing::warn!(object = %name, error = %e, "delete failed");
            }
        }

        if !selected.is_empty() {
            run.record(&format!("Deleted old backups: {:?}", selected));
        }

        run.deleted_objects = selected;
    }

    async fn notify(&self, run: &mut BackupRun, url: &str, disabled: bool) {
        let payload = WebhookPayload {
            project: run.project_name.clone(),
            date: run.timestamp().to_string(),
            status: if run.upload_succeeded() {
                RunStatus::Success
            } else {
                RunStatus::Failed
            },
            deleted_files: run.deleted_objects.clone(),
        };

        let message = self.notifier.notify(url, &payload, disabled).await;
        run.record(&message);
        run.notification = Some(message);
    }

    /// The local archive is the only copy when the upload failed, so it is
    /// kept in that case.
    async fn cleanup(&self, run: &BackupRun, keep_local: bool) {
        if keep_local || !run.upload_succeeded() {
            return;
        }

        if let Err(e) = tokio::fs::remove_file(&run.archive.path).await {
            tracing::warn!(archive = %run.archive.path.display(), error = %e, "failed to remove local archive");
        }
    }
}
