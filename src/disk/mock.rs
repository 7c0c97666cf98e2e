//! In-memory storage backend for testing.

use super::{DiskError, QuotaSnapshot, StorageClient};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory cloud disk.
///
/// Files and folders live in maps behind a [`RwLock`], so all trait methods
/// operate on `&self`. Uploaded bytes count towards `used_bytes`, which makes
/// quota checks react to uploads the way a real account does.
///
/// # Example
///
/// ```
/// use spool_uploadr::disk::{MockDisk, StorageClient};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let disk = MockDisk::new(0, 1024);
/// assert!(!disk.resource_exists("disk:/backup").await?);
/// assert!(disk.create_folder_if_missing("disk:/backup").await?);
/// assert!(disk.resource_exists("disk:/backup").await?);
/// # Ok(())
/// # }
/// ```
pub struct MockDisk {
    state: RwLock<MockState>,
    fail_uploads: AtomicBool,
    fail_quota: AtomicBool,
    upload_calls: AtomicUsize,
    quota_calls: AtomicUsize,
}

struct MockState {
    used_bytes: u64,
    total_bytes: u64,
    folders: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
}

impl MockDisk {
    /// Create an empty disk reporting the given usage
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        Self {
            state: RwLock::new(MockState {
                used_bytes,
                total_bytes,
                folders: BTreeSet::new(),
                files: BTreeMap::new(),
            }),
            fail_uploads: AtomicBool::new(false),
            fail_quota: AtomicBool::new(false),
            upload_calls: AtomicUsize::new(0),
            quota_calls: AtomicUsize::new(0),
        }
    }

    /// Make every following upload fail with a server error
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Make every following quota query fail with an auth error
    pub fn set_fail_quota(&self, fail: bool) {
        self.fail_quota.store(fail, Ordering::SeqCst);
    }

    /// Change the reported usage
    pub async fn set_usage(&self, used_bytes: u64, total_bytes: u64) {
        let mut state = self.state.write().await;
        state.used_bytes = used_bytes;
        state.total_bytes = total_bytes;
    }

    /// Number of `upload_file` calls, successful or not
    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Number of `quota` calls, successful or not
    pub fn quota_calls(&self) -> usize {
        self.quota_calls.load(Ordering::SeqCst)
    }

    /// Contents of an uploaded file
    pub async fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.read().await.files.get(path).cloned()
    }

    /// Paths of all uploaded files, sorted
    pub async fn file_paths(&self) -> Vec<String> {
        self.state.read().await.files.keys().cloned().collect()
    }
}

#[async_trait]
impl StorageClient for MockDisk {
    async fn quota(&self) -> Result<QuotaSnapshot, DiskError> {
        self.quota_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_quota.load(Ordering::SeqCst) {
            return Err(DiskError::ApiError {
                status: 401,
                code: "UnauthorizedError".into(),
                message: "Unauthorized".into(),
            });
        }
        let state = self.state.read().await;
        Ok(QuotaSnapshot::new(state.used_bytes, state.total_bytes))
    }

    async fn resource_exists(&self, path: &str) -> Result<bool, DiskError> {
        let state = self.state.read().await;
        Ok(state.folders.contains(path) || state.files.contains_key(path))
    }

    async fn create_folder(&self, path: &str) -> Result<(), DiskError> {
        let mut state = self.state.write().await;
        if state.folders.contains(path) {
            return Err(DiskError::ApiError {
                status: 409,
                code: "DiskPathPointsToExistentDirectoryError".into(),
                message: format!("Folder already exists: {}", path),
            });
        }
        state.folders.insert(path.to_string());
        Ok(())
    }

    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<(), DiskError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(DiskError::ApiError {
                status: 503,
                code: "DiskUnavailableError".into(),
                message: "Service unavailable".into(),
            });
        }

        let data = tokio::fs::read(local_path).await?;
        let mut state = self.state.write().await;
        let size = data.len() as u64;
        if let Some(previous) = state.files.insert(remote_path.to_string(), data) {
            state.used_bytes = state.used_bytes.saturating_sub(previous.len() as u64);
        }
        state.used_bytes += size;
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<(), DiskError> {
        let mut state = self.state.write().await;
        match state.files.remove(path) {
            Some(data) => {
                state.used_bytes = state.used_bytes.saturating_sub(data.len() as u64);
                Ok(())
            }
            None => Err(DiskError::not_found(path)),
        }
    }
}
