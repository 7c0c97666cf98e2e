//! Upload control loop
//!
//! Drives the quota guard, source scanner and transfer worker in one strictly
//! sequential loop:
//!
//! ```text
//! AwaitingQuota -> Scanning -> AwaitingFile -> AwaitingQuota -> Uploading -> AwaitingQuota ...
//! ```
//!
//! Only one file is ever in flight. The loop has no terminal state; it ends
//! when the process is signalled or when an error escapes the transfer
//! worker's fault boundary (quota query, local scan, remote folder setup).
//!
//! # Example
//!
//! ```no_run
//! use spool_uploadr::config::Config;
//! use spool_uploadr::uploader::Startup;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("spool-uploadr.yaml")?;
//! match Startup::from_config(&config)? {
//!     Startup::Unauthenticated { authorize_url } => println!("authorize: {}", authorize_url),
//!     Startup::Ready(uploader) => {
//!         uploader.run().await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::{Config, Timings};
use crate::disk::{token_url, DiskClient, DiskError, StorageClient};
use crate::quota::QuotaGuard;
use crate::scanner::SourceScanner;
use crate::upload::{TaskOutcome, TransferWorker};
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Errors that end the control loop
#[derive(Error, Debug)]
pub enum UploaderError {
    #[error("Quota check failed: {0}")]
    QuotaError(#[source] DiskError),

    #[error("Remote folder setup failed: {0}")]
    RemoteDirError(#[source] DiskError),

    #[error("Local scan failed: {0}")]
    ScanError(#[from] std::io::Error),
}

/// Where the control loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingQuota,
    Scanning,
    AwaitingFile,
    Uploading,
}

impl LoopState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::AwaitingQuota => "awaiting_quota",
            LoopState::Scanning => "scanning",
            LoopState::AwaitingFile => "awaiting_file",
            LoopState::Uploading => "uploading",
        }
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of process startup.
///
/// Reaching `Unauthenticated` requires `app_id`: a configuration with neither
/// a token nor an application id is rejected by `Config::validate`, since no
/// authorization URL can be built for it.
pub enum Startup<S> {
    /// No token configured; the user must authorize the application once
    Unauthenticated { authorize_url: String },
    /// Credentials present; the loop can run
    Ready(Uploader<S>),
}

impl Startup<DiskClient> {
    /// Decide the startup state and build the REST client when authenticated
    pub fn from_config(config: &Config) -> Result<Self, DiskError> {
        if !config.is_authenticated() {
            return Ok(Self::unauthenticated(config));
        }
        let client = DiskClient::with_api_url(&config.api_url, &config.token)?;
        Ok(Startup::Ready(Uploader::new(config, client)))
    }
}

impl<S: StorageClient> Startup<S> {
    /// Decide the startup state with a caller-provided storage client
    pub fn with_storage(config: &Config, storage: S) -> Self {
        if !config.is_authenticated() {
            return Self::unauthenticated(config);
        }
        Startup::Ready(Uploader::new(config, storage))
    }

    fn unauthenticated(config: &Config) -> Self {
        Startup::Unauthenticated {
            authorize_url: token_url(&config.app_id),
        }
    }
}

/// The upload control loop
pub struct Uploader<S> {
    storage: Arc<S>,
    remote_dir: String,
    quota: QuotaGuard<S>,
    scanner: SourceScanner,
    worker: TransferWorker<S>,
    state: watch::Sender<LoopState>,
}

impl<S: StorageClient> Uploader<S> {
    /// Build the loop with the delays from the configuration
    pub fn new(config: &Config, storage: S) -> Self {
        Self::with_timings(config, storage, config.timing.timings())
    }

    /// Build the loop with explicit delays
    pub fn with_timings(config: &Config, storage: S, timings: Timings) -> Self {
        let storage = Arc::new(storage);
        let (state, _) = watch::channel(LoopState::AwaitingQuota);
        Self {
            quota: QuotaGuard::new(
                storage.clone(),
                config.quota_limit_percent,
                timings.quota_backoff,
            ),
            scanner: SourceScanner::new(
                config.local_dir.clone(),
                config.remote_dir.clone(),
                timings.poll_interval,
            ),
            worker: TransferWorker::new(
                storage.clone(),
                config.simulation,
                timings.simulation_delay,
                timings.failure_cooldown,
            ),
            remote_dir: config.remote_dir.clone(),
            storage,
            state,
        }
    }

    /// Shared handle to the storage client
    pub fn storage(&self) -> Arc<S> {
        self.storage.clone()
    }

    /// Current loop state
    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    /// Receiver following loop state changes
    pub fn subscribe(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: LoopState) {
        tracing::debug!(%state, "loop state");
        self.state.send_replace(state);
    }

    async fn await_quota(&self) -> Result<(), UploaderError> {
        self.set_state(LoopState::AwaitingQuota);
        self.quota
            .wait_until_within_limit()
            .await
            .map_err(UploaderError::QuotaError)
    }

    /// Create the remote folder unless it already exists
    pub async fn ensure_remote_dir(&self) -> Result<(), UploaderError> {
        let created = self
            .storage
            .create_folder_if_missing(&self.remote_dir)
            .await
            .map_err(UploaderError::RemoteDirError)?;
        if created {
            tracing::info!(remote_dir = %self.remote_dir, "remote folder created");
        }
        Ok(())
    }

    /// Startup transition: wait for quota, then make sure the remote folder exists
    pub async fn prepare(&self) -> Result<(), UploaderError> {
        self.await_quota().await?;
        self.ensure_remote_dir().await
    }

    /// One loop iteration: quota gate, pick a file, quota gate, upload
    pub async fn run_once(&self) -> Result<TaskOutcome, UploaderError> {
        self.await_quota().await?;

        self.set_state(LoopState::Scanning);
        let task = match self.scanner.next_pending().await? {
            Some(task) => task,
            None => {
                self.set_state(LoopState::AwaitingFile);
                self.scanner.wait_for_file().await?
            }
        };

        self.await_quota().await?;

        self.set_state(LoopState::Uploading);
        Ok(self.worker.execute(task).await)
    }

    /// Run until an unrecoverable error
    pub async fn run(self) -> Result<Infallible, UploaderError> {
        self.prepare().await?;
        loop {
            self.run_once().await?;
        }
    }
}
