//! Human-readable sizes, speeds and durations for log lines

use std::time::Duration;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a transfer rate given in bytes per second
pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", format_size(bytes_per_sec))
}

/// Format a duration truncated to whole seconds, e.g. `1h2m3s`, `45s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Summary line of a processed file: `<description>: <name> [<size>] - <elapsed> - <speed>`.
///
/// The speed is left out when the elapsed time truncates to zero seconds.
pub fn transfer_summary(description: &str, name: &str, size: u64, elapsed: Duration) -> String {
    let whole = Duration::from_secs(elapsed.as_secs());
    if whole.is_zero() {
        return format!(
            "{}: {} [{}] - {}",
            description,
            name,
            format_size(size),
            format_elapsed(whole)
        );
    }
    let speed = (size as f64 / whole.as_secs_f64()) as u64;
    format!(
        "{}: {} [{}] - {} - {}",
        description,
        name,
        format_size(size),
        format_elapsed(whole),
        format_speed(speed)
    )
}

/// Log a processed file with its throughput
pub fn log_transfer(description: &str, name: &str, size: u64, elapsed: Duration) {
    tracing::info!(
        file = %name,
        bytes = size,
        elapsed_ms = elapsed.as_millis() as u64,
        "{}",
        transfer_summary(description, name, size, elapsed)
    );
}
