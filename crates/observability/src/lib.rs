//! Tracing/logging setup shared by every binary.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::LogFormat;

/// Initialize process-wide logging from the environment
/// (`RUST_LOG`, `RAWARE_LOG_FORMAT`).
///
/// An unrecognized `RAWARE_LOG_FORMAT` still installs JSON logging so the
/// error can be reported, then returns the error.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() -> Result<(), String> {
    match LogFormat::from_env() {
        Ok(format) => {
            tracing::init(format);
            Ok(())
        }
        Err(e) => {
            tracing::init(LogFormat::default());
            Err(e)
        }
    }
}
