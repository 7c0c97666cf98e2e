//! Process lifecycle helpers
//!
//! Termination signals, uptime reporting and the default configuration path.

use crate::report::format_elapsed;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Extension of the configuration file looked up next to the executable
pub const CONFIG_EXTENSION: &str = "yaml";

/// Name of the running executable without extension
pub fn app_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

/// `<exe path>` with its extension replaced by `.yaml`
pub fn config_path_for(executable: &Path) -> PathBuf {
    executable.with_extension(CONFIG_EXTENSION)
}

/// Default configuration path derived from the running executable
pub fn default_config_path() -> std::io::Result<PathBuf> {
    Ok(config_path_for(&std::env::current_exe()?))
}

/// Wait for SIGHUP, SIGINT, SIGTERM or SIGQUIT and return its name
#[cfg(unix)]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = hangup.recv() => "hangup (SIGHUP)",
        _ = interrupt.recv() => "interrupt (SIGINT)",
        _ = terminate.recv() => "terminated (SIGTERM)",
        _ = quit.recv() => "quit (SIGQUIT)",
    };
    Ok(name)
}

/// Wait for Ctrl+C
#[cfg(not(unix))]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("interrupt (Ctrl+C)")
}

/// Log uptime and the shutdown line
pub fn log_shutdown(started: Instant) {
    tracing::info!("uptime: {}", format_elapsed(started.elapsed()));
    tracing::info!("application shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_replaces_extension() {
        assert_eq!(
            config_path_for(Path::new("/usr/local/bin/spool-uploadr")),
            PathBuf::from("/usr/local/bin/spool-uploadr.yaml")
        );
        assert_eq!(
            config_path_for(Path::new("C:/tools/spool-uploadr.exe")),
            PathBuf::from("C:/tools/spool-uploadr.yaml")
        );
    }

    #[test]
    fn test_app_name_not_empty() {
        assert!(!app_name().is_empty());
    }
}
