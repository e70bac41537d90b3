//! Process-wide logging setup shared by the depotwatch binaries.

pub mod logging;

pub use logging::{ENV_LOG_FORMAT, LogFormat};

/// Initialize tracing/logging, reading the format from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    logging::init(LogFormat::from_env());
}
