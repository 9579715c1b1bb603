//! Diagnostic capture.
//!
//! One capture invocation sweeps expired artifacts, dumps the JVM inside the
//! pod, packages the dump, uploads it with retries and removes every local
//! file it created, in that order.

pub mod archive;
pub mod retention;

use chrono::{DateTime, FixedOffset, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::artifacts::{download_link, with_retries, ArtifactStore, RetryPolicy};
use crate::classifier::CaptureKind;
use crate::config::CaptureConfig;
use crate::kubernetes::PodExec;
use crate::{Error, Result};

pub use archive::{create_tar_gz, dump_names, DumpNames};
pub use retention::{sweep, RetentionPolicy, SweepReport};

pub const HEAP_DUMP_POD_PATH: &str = "/tmp/heapdump";

fn thread_dump_command() -> Vec<String> {
    vec!["jstack".to_string(), "1".to_string()]
}

fn heap_dump_command() -> Vec<String> {
    vec![
        "jmap".to_string(),
        format!("-dump:format=b,file={}", HEAP_DUMP_POD_PATH),
        "1".to_string(),
    ]
}

fn remove_heap_dump_command() -> Vec<String> {
    vec!["rm".to_string(), HEAP_DUMP_POD_PATH.to_string()]
}

/// A captured snapshot and, once uploaded, its remote id.
#[derive(Debug, Clone)]
pub struct DiagnosticArtifact {
    pub kind: CaptureKind,
    pub local_path: PathBuf,
    pub archive_path: PathBuf,
    pub remote_id: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl DiagnosticArtifact {
    pub fn link(&self) -> Option<String> {
        self.remote_id.as_deref().map(download_link)
    }
}

/// Removes the listed files when dropped, whatever happened in between.
struct LocalFiles(Vec<PathBuf>);

impl Drop for LocalFiles {
    fn drop(&mut self) {
        for path in &self.0 {
            match std::fs::remove_file(path) {
                Ok(()) => info!("Deleted file: {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => error!("Error deleting file {}: {}", path.display(), e),
            }
        }
    }
}

pub struct DiagnosticCapturer {
    exec: Arc<dyn PodExec>,
    store: Arc<dyn ArtifactStore>,
    folder_id: String,
    output_dir: PathBuf,
    retention: RetentionPolicy,
    retry: RetryPolicy,
    command_timeout: Duration,
}

impl DiagnosticCapturer {
    pub fn new(
        exec: Arc<dyn PodExec>,
        store: Arc<dyn ArtifactStore>,
        folder_id: impl Into<String>,
        config: &CaptureConfig,
    ) -> Result<Self> {
        Ok(Self {
            exec,
            store,
            folder_id: folder_id.into(),
            output_dir: config.output_dir.clone(),
            retention: RetentionPolicy::from_config(config)?,
            retry: RetryPolicy::default(),
            command_timeout: config.command_timeout(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the download link, or `None` when any step failed. Failures
    /// are logged here; callers may still remediate.
    pub async fn capture(&self, kind: CaptureKind, namespace: &str, name: &str) -> Option<String> {
        match self.try_capture(kind, namespace, name).await {
            Ok(artifact) => artifact.link(),
            Err(e) => {
                error!("Error capturing {} dump for {}/{}: {}", kind, namespace, name, e);
                None
            }
        }
    }

    pub async fn try_capture(
        &self,
        kind: CaptureKind,
        namespace: &str,
        name: &str,
    ) -> Result<DiagnosticArtifact> {
        if name.is_empty() {
            return Err(Error::CaptureCommand("instance name is empty".to_string()));
        }

        self.sweep_expired().await;

        let created_at = Utc::now().with_timezone(&self.retention.offset);
        let names = dump_names(name, kind, &archive::timestamp(&created_at));
        let mut artifact = DiagnosticArtifact {
            kind,
            local_path: self.output_dir.join(&names.dump_file),
            archive_path: self.output_dir.join(&names.archive_file),
            remote_id: None,
            created_at,
        };

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let _cleanup = LocalFiles(vec![artifact.local_path.clone(), artifact.archive_path.clone()]);

        tokio::time::timeout(
            self.command_timeout,
            self.run_dump(kind, namespace, name, &artifact.local_path),
        )
        .await
        .map_err(|_| {
            Error::CaptureCommand(format!(
                "{} dump in {}/{} timed out after {}s",
                kind,
                namespace,
                name,
                self.command_timeout.as_secs()
            ))
        })??;
        info!("{} dump done for {}/{}", kind, namespace, name);

        let (src, entry, dest) = (
            artifact.local_path.clone(),
            names.dump_file.clone(),
            artifact.archive_path.clone(),
        );
        tokio::task::spawn_blocking(move || create_tar_gz(&src, &entry, &dest))
            .await
            .map_err(|e| Error::Internal(format!("compression task failed: {}", e)))??;
        info!("Compression completed: {}", names.archive_file);

        let store = self.store.as_ref();
        let archive_path = artifact.archive_path.as_path();
        let archive_name = names.archive_file.as_str();
        let folder_id = self.folder_id.as_str();
        let file_id = with_retries(&self.retry, &format!("Uploading file {}", archive_name), move |_| {
            store.create_file(archive_path, archive_name, folder_id)
        })
        .await?;

        artifact.remote_id = Some(file_id);
        if let Some(link) = artifact.link() {
            info!("File uploaded successfully. Link: {}", link);
        }
        info!(
            "File will be deleted after {} hours",
            self.retention.window.num_hours()
        );
        Ok(artifact)
    }

    async fn sweep_expired(&self) {
        match sweep(self.store.as_ref(), &self.folder_id, &self.retention, Utc::now()).await {
            Ok(report) => info!(
                deleted = report.deleted.len(),
                kept = report.kept.len(),
                failed = report.failed.len(),
                "Retention sweep finished"
            ),
            Err(e) => warn!("Retention sweep skipped, listing failed: {}", e),
        }
    }

    async fn run_dump(&self, kind: CaptureKind, namespace: &str, name: &str, dest: &Path) -> Result<()> {
        let result = match kind {
            CaptureKind::Thread => {
                self.exec
                    .exec_to_file(namespace, name, thread_dump_command(), dest)
                    .await
            }
            CaptureKind::Heap => {
                self.exec.exec(namespace, name, heap_dump_command()).await?;
                self.exec
                    .copy_from_pod(namespace, name, HEAP_DUMP_POD_PATH, dest)
                    .await?;
                self.exec.exec(namespace, name, remove_heap_dump_command()).await?;
                info!("File deleted from pod {}/{}", namespace, name);
                Ok(())
            }
        };

        result.map_err(|e| match e {
            Error::CaptureCommand(_) => e,
            other => Error::CaptureCommand(other.to_string()),
        })
    }
}
