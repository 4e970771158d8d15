//! # Configuration
//!
//! TOML configuration for both endpoints.
//!
//! ```toml
//! [transport]
//! host = "127.0.0.1"
//! port = 5000
//! max_bytes_per_frame = 1024
//!
//! [service]
//! enabled_kinds = ["Dummy", "Mvn", "Optitrack", "Xr", "FreeD"]
//!
//! [node]
//! configuration = "configuration.json"
//! ```
//!
//! Precedence: CLI flags > environment > file > defaults.
//!
//! ## Environment Variables
//!
//! - `XRIT_HOST`: transport host
//! - `XRIT_PORT`: transport port
//! - `XRIT_MAX_BYTES_PER_FRAME`: outbound frame payload limit

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use xrit_core::primitives::DEFAULT_MAX_BYTES_PER_FRAME;
use xrit_core::{ReflectEnum, SourceKind, XritError};

/// Upper bound on an inbound frame accepted by the decoder (16 MiB).
const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

fn config_error(message: String) -> XritError {
    XritError::ConfigError(message)
}

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    pub max_bytes_per_frame: usize,
    pub max_frame_size: usize,
    pub reconnect_interval_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_bytes_per_frame: DEFAULT_MAX_BYTES_PER_FRAME,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            reconnect_interval_ms: 1000,
        }
    }
}

impl TransportConfig {
    /// `host:port`, suitable for bind and connect.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Source kinds whose host plugin is available.
    pub enabled_kinds: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enabled_kinds: ["Dummy", "Mvn", "Optitrack", "Xr", "FreeD"]
                .iter()
                .map(|kind| (*kind).to_string())
                .collect(),
        }
    }
}

impl ServiceConfig {
    /// Resolve kind names; unknown names are a configuration error.
    pub fn enabled_kinds(&self) -> Result<BTreeSet<SourceKind>, XritError> {
        self.enabled_kinds
            .iter()
            .map(|name| {
                SourceKind::from_case_name(name)
                    .ok_or_else(|| config_error(format!("unknown source kind '{name}'")))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Configuration document pushed by the mock Node; generated when unset.
    pub configuration: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub transport: TransportConfig,
    pub service: ServiceConfig,
    pub node: NodeConfig,
}

// =============================================================================
// LOADING
// =============================================================================

impl AppConfig {
    /// Parse TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, XritError> {
        toml::from_str(contents).map_err(|e| config_error(format!("failed to parse config: {e}")))
    }

    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, XritError> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| config_error(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| config_error(format!("failed to parse {}: {e}", path.display())))
    }

    /// Load from `path` and apply process environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, XritError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `XRIT_*` overrides read through `lookup`.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("XRIT_HOST") {
            self.transport.host = host;
        }
        if let Some(port) = lookup("XRIT_PORT") {
            match port.parse() {
                Ok(port) => self.transport.port = port,
                Err(e) => tracing::warn!("Ignoring XRIT_PORT='{}': {}", port, e),
            }
        }
        if let Some(max) = lookup("XRIT_MAX_BYTES_PER_FRAME") {
            match max.parse() {
                Ok(max) => self.transport.max_bytes_per_frame = max,
                Err(e) => tracing::warn!("Ignoring XRIT_MAX_BYTES_PER_FRAME='{}': {}", max, e),
            }
        }
    }
}
