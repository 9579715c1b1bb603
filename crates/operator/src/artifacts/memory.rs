//! In-process [`ArtifactStore`] used by tests and local dry runs.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use super::{ArtifactStore, StoreError, StoredArtifact};

#[derive(Default)]
pub struct InMemoryStore {
    files: Mutex<Vec<StoredArtifact>>,
    upload_failures: Mutex<VecDeque<StoreError>>,
    failing_deletes: Mutex<HashSet<String>>,
    failing_list: Mutex<bool>,
    list_calls: Mutex<u32>,
    upload_attempts: Mutex<u32>,
    next_id: Mutex<u64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: Vec<StoredArtifact>) -> Self {
        let store = Self::default();
        *lock(&store.files) = files;
        store
    }

    /// Queues errors returned by the next uploads, in order.
    pub fn fail_uploads(&self, errors: impl IntoIterator<Item = StoreError>) {
        lock(&self.upload_failures).extend(errors);
    }

    pub fn fail_delete(&self, file_id: &str) {
        lock(&self.failing_deletes).insert(file_id.to_string());
    }

    /// Makes every listing fail with a 503 until the store is dropped.
    pub fn fail_list(&self) {
        *lock(&self.failing_list) = true;
    }

    pub fn list_calls(&self) -> u32 {
        *lock(&self.list_calls)
    }

    pub fn files(&self) -> Vec<StoredArtifact> {
        lock(&self.files).clone()
    }

    pub fn file_ids(&self) -> Vec<String> {
        lock(&self.files).iter().map(|f| f.id.clone()).collect()
    }

    pub fn upload_attempts(&self) -> u32 {
        *lock(&self.upload_attempts)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ArtifactStore for InMemoryStore {
    async fn list_files(&self, _folder_id: &str) -> Result<Vec<StoredArtifact>, StoreError> {
        *lock(&self.list_calls) += 1;
        if *lock(&self.failing_list) {
            return Err(StoreError::Server {
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        Ok(self.files())
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), StoreError> {
        if lock(&self.failing_deletes).contains(file_id) {
            return Err(StoreError::Server {
                status: 500,
                body: format!("cannot delete {}", file_id),
            });
        }
        let mut files = lock(&self.files);
        let before = files.len();
        files.retain(|f| f.id != file_id);
        if files.len() == before {
            return Err(StoreError::Client {
                status: 404,
                body: format!("file {} not found", file_id),
            });
        }
        Ok(())
    }

    async fn create_file(&self, path: &Path, name: &str, _folder_id: &str) -> Result<String, StoreError> {
        *lock(&self.upload_attempts) += 1;
        if let Some(err) = lock(&self.upload_failures).pop_front() {
            return Err(err);
        }
        if !path.exists() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }

        let id = {
            let mut next = lock(&self.next_id);
            *next += 1;
            format!("mem-{}", *next)
        };
        lock(&self.files).push(StoredArtifact {
            id: id.clone(),
            name: name.to_string(),
            created_time: Utc::now(),
        });
        Ok(id)
    }
}
