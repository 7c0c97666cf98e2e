//! Transfer worker
//!
//! # Fault boundary
//!
//! [`TransferWorker::execute`] is the boundary of a single task: any error or
//! panic raised while uploading one file is converted into
//! [`TaskOutcome::Failed`], logged with the file name and followed by a fixed
//! cooldown. Nothing unwinds into the control loop.
//!
//! The cooldown is not backed off. A file that can never be uploaded is
//! retried forever at that interval.

use super::{TaskOutcome, TransferError, TransferReport};
use crate::disk::StorageClient;
use crate::metrics;
use crate::report::{format_size, log_transfer};
use crate::scanner::UploadTask;
use futures::FutureExt;
use std::any::Any;
use std::io;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Uploads one file at a time
pub struct TransferWorker<S> {
    storage: Arc<S>,
    simulation: bool,
    simulation_delay: Duration,
    failure_cooldown: Duration,
}

impl<S: StorageClient> TransferWorker<S> {
    pub fn new(
        storage: Arc<S>,
        simulation: bool,
        simulation_delay: Duration,
        failure_cooldown: Duration,
    ) -> Self {
        Self {
            storage,
            simulation,
            simulation_delay,
            failure_cooldown,
        }
    }

    pub fn is_simulation(&self) -> bool {
        self.simulation
    }

    /// Upload `task` and remove the local file on success.
    ///
    /// In simulation mode the storage client is never called; the transfer is
    /// replaced by a fixed delay and the local file is still removed.
    #[tracing::instrument(
        name = "upload.transfer",
        skip(self, task),
        fields(file = %task.name, remote.path = %task.remote_path)
    )]
    pub async fn upload(&self, task: &UploadTask) -> Result<TransferReport, TransferError> {
        let bytes = tokio::fs::metadata(&task.local_path).await?.len();
        tracing::info!(bytes, "upload: {} [{}]", task.name, format_size(bytes));

        let started = Instant::now();
        if self.simulation {
            tracing::info!("simulate upload...");
            tokio::time::sleep(self.simulation_delay).await;
            metrics::record_upload_simulated();
        } else {
            self.storage
                .upload_file(&task.local_path, &task.remote_path)
                .await?;
            let elapsed = started.elapsed();
            log_transfer("upload completed", &task.name, bytes, elapsed);
            metrics::record_upload_success(bytes, elapsed.as_secs_f64());
        }
        let elapsed = started.elapsed();

        let local_removed = remove_local(&task.local_path).await;

        Ok(TransferReport {
            name: task.name.clone(),
            bytes,
            elapsed,
            simulated: self.simulation,
            local_removed,
        })
    }

    /// Run one upload inside the task fault boundary
    pub async fn execute(&self, task: UploadTask) -> TaskOutcome {
        let attempt = AssertUnwindSafe(self.upload(&task)).catch_unwind().await;
        let result = match attempt {
            Ok(result) => result,
            Err(panic) => Err(TransferError::Panicked(panic_message(panic.as_ref()))),
        };

        match result {
            Ok(report) => TaskOutcome::Completed(report),
            Err(error) => {
                metrics::record_upload_failure();
                metrics::record_error("upload");
                tracing::error!(
                    file = %task.name,
                    error = %error,
                    "upload file fail: {}",
                    task.local_path.display()
                );
                tokio::time::sleep(self.failure_cooldown).await;
                TaskOutcome::Failed { task, error }
            }
        }
    }
}

/// Remove the local copy; a file that is already gone is only logged
async fn remove_local(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "file missing");
            false
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "file missing: remove failed");
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
