use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use tracing::{error, info};

use crate::artifacts::{ArtifactStore, StoreError, StoredArtifact};
use crate::config::CaptureConfig;

const IST_OFFSET_SECONDS: i32 = 330 * 60;

/// Age limit for stored artifacts, evaluated on the store's reference clock.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub window: Duration,
    pub offset: FixedOffset,
}

impl RetentionPolicy {
    pub fn new(window: Duration, offset: FixedOffset) -> Self {
        Self { window, offset }
    }

    /// Strictly older than the window.
    pub fn is_expired(&self, created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let created = created.with_timezone(&self.offset);
        let cutoff = now.with_timezone(&self.offset) - self.window;
        created < cutoff
    }

    pub fn from_config(config: &CaptureConfig) -> crate::Result<Self> {
        let offset = FixedOffset::east_opt(config.store_utc_offset_minutes * 60).ok_or_else(|| {
            crate::Error::Config(format!(
                "STORE_UTC_OFFSET_MINUTES out of range: {}",
                config.store_utc_offset_minutes
            ))
        })?;
        Ok(Self::new(config.retention(), offset))
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        // Asia/Kolkata, the Drive folder's reference clock
        let offset = FixedOffset::east_opt(IST_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix());
        Self::new(Duration::hours(48), offset)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
    pub failed: Vec<String>,
}

/// Deletes every expired artifact in `folder_id`. Individual delete
/// failures are logged and recorded; only a failed listing aborts.
pub async fn sweep(
    store: &dyn ArtifactStore,
    folder_id: &str,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<SweepReport, StoreError> {
    let files = store.list_files(folder_id).await?;
    let mut report = SweepReport::default();

    for StoredArtifact { id, name, created_time } in files {
        if !policy.is_expired(created_time, now) {
            info!("File not eligible for deletion from artifact store: {}", name);
            report.kept.push(id);
            continue;
        }

        match store.delete_file(&id).await {
            Ok(()) => {
                info!("Deleted file from artifact store: {}", name);
                report.deleted.push(id);
            }
            Err(e) => {
                error!("Failed to delete expired artifact {} ({}): {}", name, id, e);
                report.failed.push(id);
            }
        }
    }

    Ok(report)
}
