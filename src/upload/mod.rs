//! Upload module
//!
//! Moves one pending file to the remote disk and removes the local copy once
//! the remote write is confirmed. The local file's presence is the only
//! record of pending work, so a failed attempt simply leaves it in place.

use crate::disk::DiskError;
use crate::scanner::UploadTask;
use std::time::Duration;
use thiserror::Error;

pub mod worker;

pub use worker::TransferWorker;

/// Upload errors
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] DiskError),

    #[error("Upload task panicked: {0}")]
    Panicked(String),
}

/// Result of a completed upload
#[derive(Debug, Clone)]
pub struct TransferReport {
    pub name: String,
    pub bytes: u64,
    pub elapsed: Duration,
    /// The network transfer was replaced by a delay
    pub simulated: bool,
    /// The local file was removed after the transfer
    pub local_removed: bool,
}

/// Result of one task execution, as seen by the control loop
#[derive(Debug)]
pub enum TaskOutcome {
    Completed(TransferReport),
    /// The file is still pending and will be picked up by a later scan
    Failed {
        task: UploadTask,
        error: TransferError,
    },
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }
}
