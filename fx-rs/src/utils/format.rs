//! Formatting utilities

/// Format a duration in seconds
pub fn format_seconds(seconds: f32) -> String {
    if seconds < 1.0 {
        format!("{:.1}ms", seconds * 1000.0)
    } else {
        format!("{seconds:.2}s")
    }
}

/// Format a percentage
pub fn format_percentage(value: f64) -> String {
    format!("{value:.1}%")
}

/// Format how much of a capacity is in use
pub fn format_ratio(used: usize, capacity: usize) -> String {
    if capacity == 0 {
        "N/A".to_string()
    } else {
        format_percentage(used as f64 / capacity as f64 * 100.0)
    }
}
