//! # Obi - Graduation Engine
//!
//! The main binary for the Obi belt and degree progression engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for evaluations, graduations and rule administration
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              apps/obi (THE BINARY)           │
//! │                                              │
//! │   ┌─────────────┐        ┌─────────────┐     │
//! │   │    CLI      │        │  HTTP API   │     │
//! │   │   (clap)    │        │   (axum)    │     │
//! │   └──────┬──────┘        └──────┬──────┘     │
//! │          └───────────┬──────────┘            │
//! │                      ▼                       │
//! │              ┌───────────────┐               │
//! │              │   obi-core    │               │
//! │              │  (THE LOGIC)  │               │
//! │              └───────────────┘               │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! obi server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! obi ingest -f snapshot.json
//! obi evaluate --academy 1 --member 42
//! obi scan --academy 1
//! ```

use clap::Parser;
use obi::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    obi::init_tracing(cli.verbose);

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Obi startup banner.
fn print_banner() {
    println!(
        r#"
   ██████╗ ██████╗ ██╗
  ██╔═══██╗██╔══██╗██║
  ██║   ██║██████╔╝██║
  ██║   ██║██╔══██╗██║
  ╚██████╔╝██████╔╝██║
   ╚═════╝ ╚═════╝ ╚═╝

  Graduation Engine v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
