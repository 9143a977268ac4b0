//! # Obi
//!
//! HTTP API, CLI and configuration layer over `obi-core`.
//!
//! The binary in `main.rs` is a thin wrapper; everything lives here so the
//! integration tests can drive the router and the config loader directly.

pub mod api;
pub mod cli;
pub mod config;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// LOGGING
// =============================================================================

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "obi=info,obi_core=info,tower_http=debug";

/// Filter used with `--verbose` when `RUST_LOG` is not set.
pub const VERBOSE_LOG_FILTER: &str = "obi=debug,obi_core=debug,tower_http=debug";

/// Initialize tracing. `OBI_LOG_FORMAT=json` enables machine-parseable output.
pub fn init_tracing(verbose: bool) {
    let log_format = std::env::var("OBI_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let fallback = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| fallback.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
