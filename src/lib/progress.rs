//! Periodic progress logging.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// Records between progress lines unless overridden.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Counts processed items and logs a line each time a multiple of the interval is passed.
///
/// ```
/// use matefix_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Processed records").with_interval(100);
/// for _ in 0..250 {
///     tracker.record(1); // logs at 100 and 200
/// }
/// tracker.log_final(); // logs "Processed records 250 (complete)"
/// ```
pub struct ProgressTracker {
    interval: u64,
    message: String,
    count: AtomicU64,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: DEFAULT_PROGRESS_INTERVAL, message: message.into(), count: AtomicU64::new(0) }
    }

    /// # Panics
    ///
    /// Panics if `interval` is zero.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        assert!(interval > 0, "progress interval must be positive");
        self.interval = interval;
        self
    }

    /// Add `additional` items, logging once per interval boundary crossed.
    ///
    /// Returns `true` if the new total sits exactly on a boundary.
    pub fn record(&self, additional: u64) -> bool {
        let prev = self.count.fetch_add(additional, Ordering::Relaxed);
        let total = prev + additional;
        for milestone in (prev / self.interval + 1)..=(total / self.interval) {
            info!("{} {}", self.message, crate::logging::format_count(milestone * self.interval));
        }
        total > 0 && total.is_multiple_of(self.interval)
    }

    /// Log the final total, unless the last boundary line already showed it.
    pub fn log_final(&self) {
        let count = self.count();
        if count > 0 && !count.is_multiple_of(self.interval) {
            info!("{} {} (complete)", self.message, crate::logging::format_count(count));
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
