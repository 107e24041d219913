//! Diagnostics and Status Reporting
//!
//! Counters for failures that are deliberately not surfaced to callers
//! (power-status sets, ignored transitions, low-power timeouts) and the
//! startup banner.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

use crate::config::Config;

/// Power sequencing counters
#[derive(Debug)]
pub struct PowerDiagnostics {
    start_time: Instant,
    transitions: AtomicU64,
    invalid_transitions: AtomicU64,
    set_failures: AtomicU64,
    low_power_timeouts: AtomicU64,
    canceled_screen_offs: AtomicU64,
}

/// Point-in-time copy of [`PowerDiagnostics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerDiagnosticsSnapshot {
    /// Completed transitions
    pub transitions: u64,
    /// Events ignored as invalid for the current state
    pub invalid_transitions: u64,
    /// Failed power-status set calls
    pub set_failures: u64,
    /// Low-power acknowledgments that never arrived
    pub low_power_timeouts: u64,
    /// Screen-off sequences canceled
    pub canceled_screen_offs: u64,
}

impl PowerDiagnostics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            transitions: AtomicU64::new(0),
            invalid_transitions: AtomicU64::new(0),
            set_failures: AtomicU64::new(0),
            low_power_timeouts: AtomicU64::new(0),
            canceled_screen_offs: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_transition(&self) {
        self.transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalid_transition(&self) {
        self.invalid_transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_set_failure(&self) {
        self.set_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_low_power_timeout(&self) {
        self.low_power_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_canceled_screen_off(&self) {
        self.canceled_screen_offs.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter values
    pub fn snapshot(&self) -> PowerDiagnosticsSnapshot {
        PowerDiagnosticsSnapshot {
            transitions: self.transitions.load(Ordering::Relaxed),
            invalid_transitions: self.invalid_transitions.load(Ordering::Relaxed),
            set_failures: self.set_failures.load(Ordering::Relaxed),
            low_power_timeouts: self.low_power_timeouts.load(Ordering::Relaxed),
            canceled_screen_offs: self.canceled_screen_offs.load(Ordering::Relaxed),
        }
    }

    /// Format uptime as string
    pub fn uptime_string(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }

    /// Log current status
    pub fn log_status(&self) {
        let snapshot = self.snapshot();
        info!("=== Power Status ===");
        info!("  Uptime: {}", self.uptime_string());
        info!("  Transitions: {}", snapshot.transitions);
        info!("  Ignored events: {}", snapshot.invalid_transitions);
        info!("  Failed power sets: {}", snapshot.set_failures);
        info!("  Low-power timeouts: {}", snapshot.low_power_timeouts);
        info!("  Canceled screen-offs: {}", snapshot.canceled_screen_offs);
    }
}

impl Default for PowerDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}

/// Log complete diagnostics on startup
pub fn log_startup_diagnostics(config: &Config) {
    info!("╔════════════════════════════════════════════════════════════╗");
    info!("║          Startup Diagnostics                              ║");
    info!("╚════════════════════════════════════════════════════════════╝");

    info!("=== Device ===");
    info!("  Class: {:?}", config.device.class);
    if let (Some(inner), Some(outer)) = (config.device.inner_panel, config.device.outer_panel) {
        info!("  Panels: inner {}, outer {}", inner, outer);
    }
    info!(
        "  First group: {}",
        if config.device.expand_by_default {
            "extend"
        } else {
            "mirror"
        }
    );

    info!("=== Power ===");
    info!("  Screen-on wait: {} ms", config.power.screen_on_wait_ms);
    info!("  Screen-off wait: {} ms", config.power.screen_off_wait_ms);
    info!("  Low-power ack timeout: {} ms", config.power.low_power_ack_timeout_ms);
    info!("  Call timeout: {} ms", config.power.call_timeout_ms);

    info!("=== Settings ===");
    match config.settings.resolved_store_path() {
        Some(path) => info!("  Topology store: {}", path.display()),
        None => info!("  Topology store: in memory"),
    }
    info!("  Restore on connect: {}", config.multiscreen.restore_on_connect);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let diagnostics = PowerDiagnostics::new();
        diagnostics.record_transition();
        diagnostics.record_transition();
        diagnostics.record_set_failure();

        let snapshot = diagnostics.snapshot();
        assert_eq!(snapshot.transitions, 2);
        assert_eq!(snapshot.set_failures, 1);
        assert_eq!(snapshot.invalid_transitions, 0);
    }

    #[test]
    fn test_uptime_format() {
        let diagnostics = PowerDiagnostics::new();
        assert_eq!(diagnostics.uptime_string(), "00:00:00");
    }
}
