#![deny(missing_docs)]
//! Shared logging utilities for the QR batch workspace.
//!
//! This crate provides the `qr_*` logging macros used by the core, engine and
//! app crates, plus a terminal initializer for tests.

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! qr_trace {
    ($($arg:tt)*) => {{
        log::trace!(target: "qrbatch", $($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! qr_debug {
    ($($arg:tt)*) => {{
        log::debug!(target: "qrbatch", $($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! qr_info {
    ($($arg:tt)*) => {{
        log::info!(target: "qrbatch", $($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! qr_warn {
    ($($arg:tt)*) => {{
        log::warn!(target: "qrbatch", $($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! qr_error {
    ($($arg:tt)*) => {{
        log::error!(target: "qrbatch", $($arg)*);
    }};
}

/// Picks the default verbosity: debug in debug builds, info in release builds.
pub fn default_level() -> log::LevelFilter {
    if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        default_level(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializing_twice_is_harmless() {
        initialize_for_tests();
        initialize_for_tests();
        qr_info!("logger ready at {:?}", default_level());
    }
}
