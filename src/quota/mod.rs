//! Quota guard
//!
//! Gates uploads on remote disk usage. A check passes while
//! `floor(used * 100 / total) <= limit`. Storage errors are returned to the
//! caller, which treats them as fatal: uploading into an account of unknown
//! fill level is worse than stopping.

use crate::disk::{DiskError, StorageClient};
use crate::metrics;
use crate::report::format_size;
use std::sync::Arc;
use std::time::Duration;

/// Remote usage gate
pub struct QuotaGuard<S> {
    storage: Arc<S>,
    limit_percent: u8,
    backoff: Duration,
}

impl<S: StorageClient> QuotaGuard<S> {
    pub fn new(storage: Arc<S>, limit_percent: u8, backoff: Duration) -> Self {
        Self {
            storage,
            limit_percent,
            backoff,
        }
    }

    pub fn limit_percent(&self) -> u8 {
        self.limit_percent
    }

    /// Query usage once and report whether it is within the limit
    pub async fn check(&self) -> Result<bool, DiskError> {
        tracing::info!("check drive...");
        let quota = self.storage.quota().await?;
        let usage = quota.usage_percent();

        tracing::info!(
            used_bytes = quota.used_bytes,
            total_bytes = quota.total_bytes,
            usage_percent = usage,
            "drive usage: {} / {} [{} %]",
            format_size(quota.used_bytes),
            format_size(quota.total_bytes),
            usage
        );

        let within_limit = usage <= u64::from(self.limit_percent);
        metrics::record_quota_check(usage, within_limit);

        if !within_limit {
            tracing::warn!(
                usage_percent = usage,
                limit_percent = self.limit_percent,
                "drive usage limit exceeded: {} % (limit: {} %). Please free up disk space...",
                usage,
                self.limit_percent
            );
        }
        Ok(within_limit)
    }

    /// Re-check after each backoff until usage is within the limit
    pub async fn wait_until_within_limit(&self) -> Result<(), DiskError> {
        while !self.check().await? {
            tokio::time::sleep(self.backoff).await;
        }
        Ok(())
    }
}
