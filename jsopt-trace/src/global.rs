//! Process-wide logger for the outermost integration boundary.
//!
//! Library code should take a `&TraceLogger` argument instead of reaching
//! for this. Binaries install their logger once at startup and call
//! [`shutdown`] before exiting, since statics are never dropped.

use std::sync::OnceLock;

use crate::config::TraceConfig;
use crate::logger::TraceLogger;

static GLOBAL: OnceLock<TraceLogger> = OnceLock::new();

/// Installs `logger` as the global instance. Hands it back if one is
/// already installed.
pub fn install(logger: TraceLogger) -> Result<&'static TraceLogger, TraceLogger> {
    let mut candidate = Some(logger);
    let installed = GLOBAL.get_or_init(|| candidate.take().unwrap_or_else(TraceLogger::disabled));
    match candidate {
        Some(rejected) => Err(rejected),
        None => Ok(installed),
    }
}

/// The global logger, configured from the environment on first use.
pub fn get() -> &'static TraceLogger {
    GLOBAL.get_or_init(|| TraceLogger::open_or_disabled(TraceConfig::from_env()))
}

/// Drains and closes the global logger, if one was ever created.
pub fn shutdown() {
    if let Some(logger) = GLOBAL.get() {
        logger.shutdown();
    }
}
