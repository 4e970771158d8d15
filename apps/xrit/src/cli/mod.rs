//! # XRIT CLI Module
//!
//! ## Available Commands
//!
//! - `service` - Connect to a Node and serve configuration requests
//! - `node` - Run a mock Node that pushes a configuration
//! - `mock` - Print canonical mock messages
//! - `check` - Parse a configuration document and report errors
//! - `prettify` - Re-indent a JSON document

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use xrit_core::XritError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// XRIT - LiveLink configuration channel
///
/// Pushes LiveLink source configurations from a Node to a Service and
/// reports what was applied.
#[derive(Parser, Debug)]
#[command(name = "xrit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the TOML configuration file
    #[arg(short = 'c', long, global = true, default_value = "xrit.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to a Node and serve configuration requests
    Service {
        /// Node host (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Node port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a mock Node
    Node {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Configuration document to push (defaults to the mock configuration)
        #[arg(short = 'f', long)]
        configuration: Option<PathBuf>,
    },

    /// Print canonical mock messages
    Mock {
        /// Message to print (set-configuration, result, parse-error, all)
        #[arg(short, long, default_value = "all")]
        message: String,

        /// Spaces per indentation level (0 prints compact JSON)
        #[arg(short, long, default_value = "0")]
        indent: usize,
    },

    /// Parse a configuration document and report every parse error
    Check {
        /// Path to the configuration document
        file: PathBuf,
    },

    /// Re-indent a JSON document
    Prettify {
        /// Path to the JSON document
        file: PathBuf,

        /// Spaces per indentation level
        #[arg(short, long, default_value = "4")]
        indent: usize,

        /// Indent with tabs instead of spaces
        #[arg(short, long)]
        tabs: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), XritError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Service { host, port }) => cmd_service(&cli.config, host, port).await,
        Some(Commands::Node {
            host,
            port,
            configuration,
        }) => cmd_node(&cli.config, host, port, configuration, cli.verbose).await,
        Some(Commands::Mock { message, indent }) => cmd_mock(&message, indent),
        Some(Commands::Check { file }) => cmd_check(&file, json_mode),
        Some(Commands::Prettify { file, indent, tabs }) => cmd_prettify(&file, indent, tabs),
        None => {
            // No subcommand - show the effective configuration
            cmd_config(&cli.config, json_mode)
        }
    }
}
