//! Diagnostic logging setup shared by both binaries.
//!
//! Logs always go to stderr: the chat loop owns stdout for answers and the
//! document server owns it for JSON-RPC frames.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn";

/// Filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`] when unset or
/// unparsable.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
