//! # CLI Command Implementations

use std::path::{Path, PathBuf};
use xrit_core::{
    Configuration, ReflectEnum, ServiceCommand, XritError, codec, create_service_message, mock,
};
use xrit::backend::MemoryBackend;
use xrit::config::AppConfig;
use xrit::node::{MockNode, run_node};
use xrit::service::{ConfigurationService, run_service};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a document read by `check`, `prettify` and `node` (16 MB).
const MAX_DOCUMENT_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Read a text document after checking its size.
fn read_document(path: &Path) -> Result<String, XritError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        XritError::IoError(format!("Cannot read '{}': {}", path.display(), e))
    })?;

    if !metadata.is_file() {
        return Err(XritError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > MAX_DOCUMENT_FILE_SIZE {
        return Err(XritError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_DOCUMENT_FILE_SIZE
        )));
    }

    std::fs::read_to_string(path)
        .map_err(|e| XritError::IoError(format!("Cannot read '{}': {}", path.display(), e)))
}

fn load_config(
    path: &Path,
    host: Option<String>,
    port: Option<u16>,
) -> Result<AppConfig, XritError> {
    let mut config = AppConfig::load_with_env(path)?;
    if let Some(host) = host {
        config.transport.host = host;
    }
    if let Some(port) = port {
        config.transport.port = port;
    }
    Ok(config)
}

// =============================================================================
// SERVICE COMMAND
// =============================================================================

/// Connect to a Node and serve it until Ctrl+C.
pub async fn cmd_service(
    config_path: &Path,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), XritError> {
    let config = load_config(config_path, host, port)?;
    let enabled = config.service.enabled_kinds()?;

    println!("XRIT Service Starting...");
    println!();
    println!("Configuration:");
    println!("  Node:          {}", config.transport.address());
    println!("  Frame payload: {} bytes", config.transport.max_bytes_per_frame);
    println!(
        "  Enabled kinds: {}",
        enabled
            .iter()
            .filter_map(|kind| kind.case_name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let mut service = ConfigurationService::new(MemoryBackend::new(enabled));

    tokio::select! {
        () = run_service(&config.transport, &mut service) => Ok(()),
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| XritError::IoError(format!("Signal handler failed: {}", e)))?;
            tracing::info!("Shutting down, {} source(s) cached", service.cache().len());
            Ok(())
        }
    }
}

// =============================================================================
// NODE COMMAND
// =============================================================================

/// Run a mock Node until Ctrl+C.
pub async fn cmd_node(
    config_path: &Path,
    host: Option<String>,
    port: Option<u16>,
    configuration: Option<PathBuf>,
    verbose: bool,
) -> Result<(), XritError> {
    let config = load_config(config_path, host, port)?;

    let document = match configuration.or(config.node.configuration) {
        Some(path) => {
            let text = read_document(&path)?;
            let (_, errors) = codec::from_str::<Configuration>(&text);
            if !errors.is_empty() {
                tracing::warn!(
                    "{} has {} parse error(s); the service will reject it",
                    path.display(),
                    errors.len()
                );
            }
            text
        }
        None => codec::to_string(&mock::mock_configuration()),
    };

    if verbose {
        println!("Pushing configuration:");
        println!("{}", mock::prettify_json(&document, "    ")?);
        println!();
    }

    let mut node = MockNode::new(document);

    tokio::select! {
        result = run_node(&config.transport, &mut node) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| XritError::IoError(format!("Signal handler failed: {}", e)))?;
            tracing::info!(
                "Shutting down after {} result(s) and {} status update(s)",
                node.results().len(),
                node.statuses().len()
            );
            Ok(())
        }
    }
}

// =============================================================================
// MOCK COMMAND
// =============================================================================

/// Print canonical mock messages.
pub fn cmd_mock(message: &str, indent: usize) -> Result<(), XritError> {
    let render = |json: String| -> Result<String, XritError> {
        if indent == 0 {
            Ok(json)
        } else {
            mock::prettify_json(&json, &" ".repeat(indent))
        }
    };

    let set_configuration = || {
        render(codec::to_string(&mock::mock_configuration())).and_then(|data| {
            create_service_message(ServiceCommand::SetConfiguration, &data)
        })
    };
    let result = || render(codec::to_string(&mock::mock_successful_result()));
    let parse_error = || render(codec::to_string(&mock::mock_parse_error_result()));

    match message {
        "set-configuration" => println!("{}", set_configuration()?),
        "result" => println!("{}", result()?),
        "parse-error" => println!("{}", parse_error()?),
        "all" => {
            println!("# set_configuration");
            println!("{}", set_configuration()?);
            println!();
            println!("# set_configuration_result (success)");
            println!("{}", result()?);
            println!();
            println!("# set_configuration_result (parse errors)");
            println!("{}", parse_error()?);
        }
        other => {
            return Err(XritError::ConfigError(format!(
                "Unknown mock message '{}' (expected set-configuration, result, parse-error, all)",
                other
            )));
        }
    }

    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Parse a configuration document and report every parse error.
pub fn cmd_check(file: &Path, json_mode: bool) -> Result<(), XritError> {
    let text = read_document(file)?;
    let (configuration, errors) = codec::from_str::<Configuration>(&text);

    if json_mode {
        let output = serde_json::json!({
            "file": file.to_string_lossy(),
            "sources": configuration.livelink.sources.len(),
            "parse_errors": errors
                .iter()
                .map(|error| serde_json::json!({
                    "code": error.code.case_name(),
                    "containing_object": error.containing_object,
                    "value": error.value,
                    "message": error.message,
                }))
                .collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!("Configuration Check");
        println!("===================");
        println!("File:     {}", file.display());
        println!("Sources:  {}", configuration.livelink.sources.len());
        println!("Endpoint: {}", configuration.udp_unicast_endpoint);
        println!();
        if errors.is_empty() {
            println!("No parse errors");
        }
        for error in &errors {
            println!(
                "  [{}] {} (in {}, value {})",
                error.code.case_name().unwrap_or("Invalid"),
                error.message,
                error.containing_object,
                error.value
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(XritError::SerializationError(format!(
            "{} parse error(s) in {}",
            errors.len(),
            file.display()
        )))
    }
}

// =============================================================================
// PRETTIFY COMMAND
// =============================================================================

/// Re-indent a JSON document.
pub fn cmd_prettify(file: &Path, indent: usize, tabs: bool) -> Result<(), XritError> {
    let text = read_document(file)?;
    let unit = if tabs { "\t".to_string() } else { " ".repeat(indent) };
    println!("{}", mock::prettify_json(&text, &unit)?);
    Ok(())
}

// =============================================================================
// CONFIG (DEFAULT) COMMAND
// =============================================================================

/// Show the effective application configuration.
pub fn cmd_config(config_path: &Path, json_mode: bool) -> Result<(), XritError> {
    let config = AppConfig::load_with_env(config_path)?;

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&config).unwrap_or_default()
        );
        return Ok(());
    }

    println!("XRIT Configuration");
    println!("==================");
    println!("Config file:         {}", config_path.display());
    println!("Address:             {}", config.transport.address());
    println!("Max bytes per frame: {}", config.transport.max_bytes_per_frame);
    println!("Max frame size:      {}", config.transport.max_frame_size);
    println!("Reconnect interval:  {} ms", config.transport.reconnect_interval_ms);
    println!("Enabled kinds:       {}", config.service.enabled_kinds.join(", "));
    match &config.node.configuration {
        Some(path) => println!("Node configuration:  {}", path.display()),
        None => println!("Node configuration:  (mock)"),
    }

    Ok(())
}
