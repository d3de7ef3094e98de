//! Development-time tracing for debugging the engine.
//!
//! Dev diagnostics via `RUST_LOG`, output to stderr. Not persisted and not
//! part of the comparison output: the caller-facing contract stays a plain
//! `ComparisonResult` even when attempts fail, so retries and fallback
//! degradation are only visible here.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=tributo_radar=debug radar compare --input caso.json
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
