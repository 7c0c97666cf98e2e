//! Cloud disk module
//!
//! Defines the storage contract the uploader depends on and the REST binding
//! that implements it against a cloud disk account.
//!
//! # Operations
//!
//! | Operation | Method | Endpoint |
//! |-----------|--------|----------|
//! | Quota | `GET` | `{api_url}` |
//! | Resource metadata | `GET` | `{api_url}/resources?path=..` |
//! | Create folder | `PUT` | `{api_url}/resources?path=..` |
//! | Upload link | `GET` | `{api_url}/resources/upload?path=..&overwrite=true` |
//! | Upload bytes | `PUT` | `href` returned by the upload link |
//! | Delete | `DELETE` | `{api_url}/resources?path=..&permanently=true` |
//!
//! # Example
//!
//! ```no_run
//! use spool_uploadr::disk::{DiskClient, StorageClient};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DiskClient::new("oauth-token")?;
//!
//! let quota = client.quota().await?;
//! println!("usage: {}%", quota.usage_percent());
//!
//! client.create_folder_if_missing("disk:/backup").await?;
//! client
//!     .upload_file(Path::new("/data/outbox/a.bin"), "disk:/backup/a.bin")
//!     .await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod client;
pub mod mock;

pub use client::DiskClient;
pub use mock::MockDisk;

/// OAuth authorization endpoint used for the one-time token grant
pub const OAUTH_AUTHORIZE_URL: &str = "https://oauth.yandex.ru/authorize";

/// Error code the API reports for a missing resource
pub const NOT_FOUND_CODE: &str = "DiskNotFoundError";

/// Cloud disk errors
#[derive(Error, Debug)]
pub enum DiskError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API error ({status}): {code}: {message}")]
    ApiError {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Response error: {0}")]
    ResponseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DiskError {
    /// Build a "resource not found" error the way the API reports it
    pub fn not_found(path: &str) -> Self {
        DiskError::ApiError {
            status: 404,
            code: NOT_FOUND_CODE.to_string(),
            message: format!("Resource not found: {}", path),
        }
    }

    /// Whether the error means the remote resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DiskError::ApiError { status, code, .. } if *status == 404 || code == NOT_FOUND_CODE
        )
    }
}

/// Error body returned by the API for non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: String,
}

/// Absolute addresses of the disk's system folders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemFolders {
    #[serde(default)]
    pub applications: String,
    #[serde(default)]
    pub downloads: String,
}

/// Used and total space of the remote account, in bytes
///
/// Fetched fresh on every quota check; never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    #[serde(rename = "used_space", default)]
    pub used_bytes: u64,

    #[serde(rename = "total_space", default)]
    pub total_bytes: u64,

    /// Cumulative size of the files in the trash
    #[serde(rename = "trash_size", default)]
    pub trash_bytes: u64,

    #[serde(default)]
    pub system_folders: SystemFolders,
}

impl QuotaSnapshot {
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        Self {
            used_bytes,
            total_bytes,
            ..Default::default()
        }
    }

    /// Usage as `floor(used * 100 / total)`.
    ///
    /// An account reporting zero capacity counts as full.
    pub fn usage_percent(&self) -> u64 {
        if self.total_bytes == 0 {
            return 100;
        }
        (self.used_bytes as u128 * 100 / self.total_bytes as u128) as u64
    }
}

/// A remote file or folder entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub resource_id: String,
    /// `file` or `dir`
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<ResourceList>,
}

impl Resource {
    pub fn is_dir(&self) -> bool {
        self.resource_type == "dir"
    }
}

/// Folder listing embedded in a folder resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceList {
    #[serde(default)]
    pub items: Vec<Resource>,
    #[serde(default)]
    pub path: String,
}

/// Temporary upload target returned by the API
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UploadLink {
    pub href: String,
}

/// Storage operations the uploader needs from a remote account
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Query used/total space
    async fn quota(&self) -> Result<QuotaSnapshot, DiskError>;

    /// Check whether a file or folder exists; "not found" is `Ok(false)`
    async fn resource_exists(&self, path: &str) -> Result<bool, DiskError>;

    /// Create a folder
    async fn create_folder(&self, path: &str) -> Result<(), DiskError>;

    /// Upload a local file to a remote path, overwriting any existing file
    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<(), DiskError>;

    /// Permanently delete a remote file (bypassing the trash)
    async fn delete_file(&self, path: &str) -> Result<(), DiskError>;

    /// Create a folder unless it already exists.
    ///
    /// Returns `true` if the folder was created.
    async fn create_folder_if_missing(&self, path: &str) -> Result<bool, DiskError> {
        if self.resource_exists(path).await? {
            return Ok(false);
        }
        self.create_folder(path).await?;
        Ok(true)
    }
}

/// URL the user opens once to grant a token to the application
pub fn token_url(app_id: &str) -> String {
    format!(
        "{}?response_type=token&client_id={}",
        OAUTH_AUTHORIZE_URL, app_id
    )
}

/// Join a remote folder and an entry name with a single `/`
pub fn remote_path(root: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if root.is_empty() {
        name.to_string()
    } else if root.ends_with('/') {
        format!("{}{}", root, name)
    } else {
        format!("{}/{}", root, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_percent_floors() {
        assert_eq!(QuotaSnapshot::new(80, 100).usage_percent(), 80);
        assert_eq!(QuotaSnapshot::new(81, 100).usage_percent(), 81);
        assert_eq!(QuotaSnapshot::new(2, 3).usage_percent(), 66);
        assert_eq!(QuotaSnapshot::new(0, 100).usage_percent(), 0);
    }

    #[test]
    fn test_usage_percent_zero_total() {
        assert_eq!(QuotaSnapshot::new(0, 0).usage_percent(), 100);
    }

    #[test]
    fn test_usage_percent_large_values() {
        let tb = 1u64 << 40;
        assert_eq!(QuotaSnapshot::new(u64::MAX / 2, u64::MAX).usage_percent(), 49);
        assert_eq!(QuotaSnapshot::new(3 * tb, 4 * tb).usage_percent(), 75);
    }

    #[test]
    fn test_quota_snapshot_deserialize() {
        let json = r#"{
            "trash_size": 4631577437,
            "total_space": 319975063552,
            "used_space": 26157681270,
            "system_folders": {"applications": "disk:/Apps", "downloads": "disk:/Downloads/"}
        }"#;
        let quota: QuotaSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(quota.used_bytes, 26157681270);
        assert_eq!(quota.total_bytes, 319975063552);
        assert_eq!(quota.trash_bytes, 4631577437);
        assert_eq!(quota.system_folders.applications, "disk:/Apps");
        assert_eq!(quota.usage_percent(), 8);
    }

    #[test]
    fn test_resource_deserialize() {
        let json = r#"{
            "name": "backup",
            "path": "disk:/backup",
            "created": "2024-01-01T00:00:00+00:00",
            "resource_id": "1:abc",
            "type": "dir",
            "_embedded": {
                "path": "disk:/backup",
                "items": [{"name": "a.bin", "path": "disk:/backup/a.bin", "type": "file", "mime_type": "application/octet-stream"}]
            }
        }"#;
        let resource: Resource = serde_json::from_str(json).unwrap();
        assert!(resource.is_dir());
        let items = &resource.embedded.as_ref().unwrap().items;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].mime_type, "application/octet-stream");
        assert!(!items[0].is_dir());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(DiskError::not_found("disk:/x").is_not_found());
        assert!(DiskError::ApiError {
            status: 404,
            code: String::new(),
            message: String::new(),
        }
        .is_not_found());
        assert!(!DiskError::ApiError {
            status: 401,
            code: "UnauthorizedError".into(),
            message: "Unauthorized".into(),
        }
        .is_not_found());
        assert!(!DiskError::ResponseError("boom".into()).is_not_found());
    }

    #[test]
    fn test_token_url() {
        assert_eq!(
            token_url("my-app"),
            "https://oauth.yandex.ru/authorize?response_type=token&client_id=my-app"
        );
    }

    #[test]
    fn test_remote_path() {
        assert_eq!(remote_path("disk:/backup", "a.txt"), "disk:/backup/a.txt");
        assert_eq!(remote_path("disk:/backup/", "a.txt"), "disk:/backup/a.txt");
        assert_eq!(remote_path("disk:/", "a.txt"), "disk:/a.txt");
        assert_eq!(remote_path("/backup", "/a.txt"), "/backup/a.txt");
        assert_eq!(remote_path("", "a.txt"), "a.txt");
    }
}
