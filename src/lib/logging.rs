//! Formatting helpers for log output, and run summaries.

use std::time::{Duration, Instant};

use crate::fixmate::FixmateMetrics;

/// Format a count with thousands separators.
///
/// ```
/// use matefix_lib::logging::format_count;
///
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// assert_eq!(format_count(999), "999");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i).is_multiple_of(3) {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a fraction (0.0-1.0) as a percentage with `decimals` places.
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0)
}

/// Formats a duration as e.g. `45s`, `2m 15s` or `1h 30m`.
///
/// ```
/// use matefix_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0..60 => format!("{secs}s"),
        60..3600 => match (secs / 60, secs % 60) {
            (m, 0) => format!("{m}m"),
            (m, s) => format!("{m}m {s}s"),
        },
        _ => match (secs / 3600, (secs % 3600) / 60) {
            (h, 0) => format!("{h}h"),
            (h, m) => format!("{h}h {m}m"),
        },
    }
}

/// Formats a processing rate, falling back to per-minute for slow rates.
#[must_use]
pub fn format_rate(count: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{} records/s", format_count(count));
    }
    let rate = count as f64 / secs;
    if rate >= 1.0 {
        format!("{} records/s", format_count(rate as u64))
    } else {
        format!("{:.1} records/min", rate * 60.0)
    }
}

/// Logs a summary of a fixmate run.
pub fn log_fixmate_summary(metrics: &FixmateMetrics) {
    log::info!("Fixmate Summary:");
    log::info!("  Templates: {}", format_count(metrics.templates));
    log::info!("  Records read: {}", format_count(metrics.records_read));
    log::info!("  Records written: {}", format_count(metrics.records_written));
    if metrics.records_removed > 0 {
        log::info!("  Records removed: {}", format_count(metrics.records_removed));
    }
    if metrics.templates > 0 {
        let paired = metrics.paired_templates as f64 / metrics.templates as f64;
        log::info!(
            "  Paired templates: {} ({})",
            format_count(metrics.paired_templates),
            format_percent(paired, 2)
        );
    }
    log::info!("  Unpaired templates: {}", format_count(metrics.unpaired_templates));
    if metrics.templates_without_primary > 0 {
        log::info!(
            "  Templates without a primary alignment: {}",
            format_count(metrics.templates_without_primary)
        );
    }
    if metrics.multi_primary_templates > 0 {
        log::warn!(
            "  Templates with more than two primaries: {}",
            format_count(metrics.multi_primary_templates)
        );
    }
}

/// Times an operation and logs its completion with a count and rate.
///
/// ```no_run
/// use matefix_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Fixing mates");
/// // ... do work ...
/// timer.log_completion(10_000);
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Starts the timer and logs the start of the operation.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    pub fn log_completion(&self, count: u64) {
        let duration = self.start_time.elapsed();
        log::info!(
            "{} completed: {} records in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration)
        );
    }
}
