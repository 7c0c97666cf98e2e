//! Process memory sampler
//!
//! Samples the resident memory of the current process on a fixed cadence and
//! logs it only when the formatted value changes.

use crate::report::format_size;
use std::time::Duration;
use sysinfo::{Pid, System};

/// Periodic memory usage reporter.
///
/// Owns the last reported value; the control loop shares nothing with it.
pub struct MemorySampler {
    system: System,
    pid: Option<Pid>,
    last_usage: Option<String>,
}

impl MemorySampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "Memory sampling unavailable on this platform");
                None
            }
        };
        Self {
            system: System::new(),
            pid,
            last_usage: None,
        }
    }

    /// Read the current resident memory in bytes
    pub fn current_usage(&mut self) -> Option<u64> {
        let pid = self.pid?;
        if !self.system.refresh_process(pid) {
            return None;
        }
        self.system.process(pid).map(|process| process.memory())
    }

    /// Remember `usage` and report whether it differs from the last value
    pub fn observe(&mut self, usage: String) -> bool {
        if self.last_usage.as_deref() == Some(usage.as_str()) {
            return false;
        }
        self.last_usage = Some(usage);
        true
    }

    /// Last reported value
    pub fn last_usage(&self) -> Option<&str> {
        self.last_usage.as_deref()
    }

    /// Take one sample; logs and returns the value if it changed
    pub fn sample(&mut self) -> Option<String> {
        let bytes = self.current_usage()?;
        super::record_memory_usage(bytes);
        let usage = format_size(bytes);
        if self.observe(usage.clone()) {
            tracing::info!(bytes, "mem usage: {}", usage);
            Some(usage)
        } else {
            None
        }
    }

    /// Sample forever at `interval`
    pub async fn run(mut self, interval: Duration) {
        loop {
            self.sample();
            tokio::time::sleep(interval).await;
        }
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}
