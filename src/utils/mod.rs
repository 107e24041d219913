//! Utility Functions and Diagnostics
//!
//! Power diagnostics counters and user-friendly error formatting.
//!
//! # Overview
//!
//! 1. **Diagnostics** - counters for failures that are never returned to
//!    callers (failed power sets, ignored events, low-power timeouts) and the
//!    startup banner
//! 2. **Error Formatting** - user-facing messages for the binary
//!
//! ```rust
//! use lamco_screen_coordinator::utils::PowerDiagnostics;
//!
//! let diagnostics = PowerDiagnostics::new();
//! assert_eq!(diagnostics.snapshot().set_failures, 0);
//! ```

pub mod diagnostics;
pub mod errors;

pub use diagnostics::{log_startup_diagnostics, PowerDiagnostics, PowerDiagnosticsSnapshot};
pub use errors::format_user_error;
