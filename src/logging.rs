//! Logger bootstrap.
//!
//! The library itself only talks to the `log` facade. Binaries and tests
//! that want to see that output call [`init`] once at startup.

use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

/// Starts a stderr logger honoring `RUST_LOG`, defaulting to `info`.
///
/// The returned handle keeps the logger alive; hold it for the lifetime of
/// the process.
pub fn init() -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str("info")?.start()
}
