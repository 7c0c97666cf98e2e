//! Spool Uploadr Library
//!
//! Unattended uploader that drains a local folder into a cloud disk account.
//!
//! # Features
//!
//! - **Filesystem as queue**: a file is pending while it exists locally and is
//!   removed only after the remote write succeeds
//! - **Quota guard**: uploads pause while remote usage is above a limit
//! - **Fault boundary per file**: a failed upload is logged, cooled down and
//!   retried on a later scan
//! - **Simulation mode**: exercise the loop without touching the account
//!
//! # Example
//!
//! ```no_run
//! use spool_uploadr::{config::Config, uploader::Startup};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("spool-uploadr.yaml")?;
//!     if let Startup::Ready(uploader) = Startup::from_config(&config)? {
//!         uploader.run().await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod disk;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod quota;
pub mod report;
pub mod scanner;
pub mod upload;
pub mod uploader;

// Re-export commonly used types
pub use config::Config;
pub use uploader::{Startup, Uploader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
