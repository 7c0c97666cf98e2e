//! Source scanner
//!
//! Picks the next file to upload from the local folder. Files are taken in
//! directory-listing order: whatever order the directory enumeration yields,
//! with no sorting by name or modification time. A file stays pending for as
//! long as it exists on disk; there is no other queue.

use crate::disk::remote_path;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// One file to upload, created per loop iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    /// Entry name relative to the local folder
    pub name: String,
    /// Local folder joined with `name`
    pub local_path: PathBuf,
    /// Remote folder joined with `name`
    pub remote_path: String,
}

impl UploadTask {
    pub fn new(name: impl Into<String>, local_dir: &Path, remote_dir: &str) -> Self {
        let name = name.into();
        Self {
            local_path: local_dir.join(&name),
            remote_path: remote_path(remote_dir, &name),
            name,
        }
    }
}

/// Polls a local folder for pending files
pub struct SourceScanner {
    local_dir: PathBuf,
    remote_dir: String,
    poll_interval: Duration,
}

impl SourceScanner {
    pub fn new(
        local_dir: impl Into<PathBuf>,
        remote_dir: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            local_dir: local_dir.into(),
            remote_dir: remote_dir.into(),
            poll_interval,
        }
    }

    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    /// First regular file of the local folder in listing order, if any.
    ///
    /// Subdirectories are skipped; the scan is not recursive. Symlinks count
    /// when they resolve to a regular file.
    pub async fn next_pending(&self) -> io::Result<Option<UploadTask>> {
        let mut entries = tokio::fs::read_dir(&self.local_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let is_file = if file_type.is_symlink() {
                tokio::fs::metadata(entry.path())
                    .await
                    .map(|meta| meta.is_file())
                    .unwrap_or(false)
            } else {
                file_type.is_file()
            };
            if !is_file {
                continue;
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!(name = ?raw, "Skipping file with non UTF-8 name");
                    continue;
                }
            };

            return Ok(Some(UploadTask::new(
                name,
                &self.local_dir,
                &self.remote_dir,
            )));
        }

        Ok(None)
    }

    /// Block until a file is pending, re-scanning every poll interval
    pub async fn wait_for_file(&self) -> io::Result<UploadTask> {
        if let Some(task) = self.next_pending().await? {
            return Ok(task);
        }

        let started = Instant::now();
        tracing::info!(dir = %self.local_dir.display(), "wait file...");
        loop {
            tokio::time::sleep(self.poll_interval).await;
            if let Some(task) = self.next_pending().await? {
                tracing::info!(
                    "waited: {}",
                    crate::report::format_elapsed(started.elapsed())
                );
                return Ok(task);
            }
        }
    }
}
