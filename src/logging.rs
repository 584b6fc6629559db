//! Diagnostic logging for the `impact` binary.
//!
//! Logs go to stderr so tables, plots and chart JSON on stdout stay pipeable.
//! `RUST_LOG` (from the environment or a `.env` file) controls verbosity.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. `verbose` raises the default level to `info`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(verbose: bool) {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    let default = if verbose { "impact_prep=info,warn" } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
