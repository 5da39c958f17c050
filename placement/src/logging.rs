//! Development-time tracing for debugging placement decisions.
//!
//! Placement internals (validation failures, fallback substitutions,
//! rejection reasons) are only ever logged here; callers see the generic
//! rejection message.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Crate-level events at `info` and above unless `RUST_LOG` overrides.
const DEFAULT_FILTER: &str = "warn,placement=info";

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var, falling back to [`DEFAULT_FILTER`], which keeps
/// per-rule placement decisions visible without foreign-crate noise.
/// Output: stderr, compact format.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
