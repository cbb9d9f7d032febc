//! Tracing and logging setup shared by stockline binaries and tests.

/// Initialize process-wide observability (JSON tracing to stdout).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
