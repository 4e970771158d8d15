//! # XRIT - LiveLink Configuration Channel
//!
//! The command-line front end for the Node ↔ Service control channel.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       apps/xrit (THE BINARY)                    │
//! │                                                                 │
//! │  ┌─────────────┐    ┌──────────────┐    ┌──────────────────┐   │
//! │  │   CLI       │    │  Connection  │    │  Service / Node  │   │
//! │  │  (clap)     │    │   (tokio)    │    │    handlers      │   │
//! │  └──────┬──────┘    └──────┬───────┘    └────────┬─────────┘   │
//! │         │                  │                     │             │
//! │         └──────────────────┼─────────────────────┘             │
//! │                            ▼                                   │
//! │                    ┌───────────────┐                           │
//! │                    │   xrit-core   │                           │
//! │                    │  (THE LOGIC)  │                           │
//! │                    └───────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Run a mock Node, then a Service that connects to it
//! xrit node --port 5000
//! xrit service --host 127.0.0.1 --port 5000
//!
//! # Offline tools
//! xrit mock --indent 4
//! xrit check configuration.json
//! xrit prettify configuration.json --tabs
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // XRIT_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("XRIT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose {
        "xrit=debug,xrit_core=debug"
    } else {
        "xrit=info,xrit_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the XRIT startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗  ██╗██████╗ ██╗████████╗
  ╚██╗██╔╝██╔══██╗██║╚══██╔══╝
   ╚███╔╝ ██████╔╝██║   ██║
   ██╔██╗ ██╔══██╗██║   ██║
  ██╔╝ ██╗██║  ██║██║   ██║
  ╚═╝  ╚═╝╚═╝  ╚═╝╚═╝   ╚═╝

  LiveLink Configuration Channel v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
