#![deny(missing_docs)]
//! Shared logging utilities for the conversion workspace.
//!
//! This crate provides the `engine_*` logging macros used by the engine and the
//! CLI, plus a terminal initializer that tests and the binary share.

use std::cell::Cell;

use log::LevelFilter;

thread_local! {
    /// Request id of the conversion currently being handled on this thread.
    static ACTIVE_REQUEST: Cell<u64> = const { Cell::new(0) };
}

/// Records the request id being handled on the current thread.
///
/// The effect runner sets this before it dispatches effects for a request so
/// that log lines can be correlated without threading the id everywhere.
pub fn set_active_request(request_id: u64) {
    ACTIVE_REQUEST.with(|v| v.set(request_id));
}

/// Returns the request id last recorded on this thread, or 0 if none.
pub fn active_request() -> u64 {
    ACTIVE_REQUEST.with(|v| v.get())
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Maps a `-v` repetition count from the command line to a level filter.
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
