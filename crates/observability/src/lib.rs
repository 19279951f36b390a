//! Process-wide tracing setup shared by the binaries.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize tracing/logging. Subsequent calls are no-ops.
pub fn init(format: LogFormat) {
    crate::tracing::init(format);
}
