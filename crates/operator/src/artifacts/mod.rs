//! Remote storage for diagnostic artifacts.
//!
//! [`ArtifactStore`] is the seam the capturer talks to. [`DriveClient`] is
//! the Google Drive v3 implementation and [`retry`] holds the upload backoff
//! loop.

pub mod drive;
pub mod memory;
pub mod retry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub use drive::{DriveClient, ServiceAccountTokenSource, StaticToken, TokenSource};
pub use memory::InMemoryStore;
pub use retry::{with_retries, RetryPolicy};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },
    #[error("request rejected with {status}: {body}")]
    Client { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Only gateway-style server failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Server { status, .. } if matches!(status, 500 | 502 | 503 | 504))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

/// A file in the artifact folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub id: String,
    pub name: String,
    #[serde(rename = "createdTime")]
    pub created_time: DateTime<Utc>,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn list_files(&self, folder_id: &str) -> Result<Vec<StoredArtifact>, StoreError>;

    async fn delete_file(&self, file_id: &str) -> Result<(), StoreError>;

    /// Uploads `path` as `name` into `folder_id` and returns the new file id.
    async fn create_file(&self, path: &Path, name: &str, folder_id: &str) -> Result<String, StoreError>;
}

pub fn download_link(file_id: &str) -> String {
    format!("https://drive.google.com/uc?export=download&id={}", file_id)
}
