//! # Documents
//!
//! Top-level payloads carried in message data:
//!
//! - [`Configuration`]: `set_configuration` data (Node → Service) and
//!   `status` data (Service → Node);
//! - [`SetConfigurationResult`]: `set_configuration_result` data.

use crate::error::{LiveLinkError, ParseError};
use crate::livelink::LiveLinkSource;
use crate::reflect_record;

/// A network endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ip {
    pub url: String,
    pub port: u64,
}

impl Default for Ip {
    fn default() -> Self {
        Self {
            url: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl std::fmt::Display for Ip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.url, self.port)
    }
}

reflect_record! {
    Ip as "Ip" {
        "url" => url,
        "port" => port,
    }
}

/// The desired (or observed) set of sources.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiveLink {
    pub sources: Vec<LiveLinkSource>,
}

reflect_record! {
    LiveLink as "LiveLink" {
        "sources" => sources,
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Configuration {
    pub udp_unicast_endpoint: Ip,
    pub livelink: LiveLink,
}

reflect_record! {
    Configuration as "Configuration" {
        "udp_unicast_endpoint" => udp_unicast_endpoint,
        "livelink" => livelink,
    }
}

/// Outcome of applying a configuration.
///
/// When `parse_errors` is non-empty nothing was applied and
/// `livelink_errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetConfigurationResult {
    pub parse_errors: Vec<ParseError>,
    pub livelink_errors: Vec<LiveLinkError>,
}

impl SetConfigurationResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.parse_errors.is_empty() && self.livelink_errors.is_empty()
    }
}

reflect_record! {
    SetConfigurationResult as "SetConfigurationResult" {
        "parse_errors" => parse_errors,
        "livelink_errors" => livelink_errors,
    }
}
