//! # Configuration Service
//!
//! The Service end of the channel: codec → reconciler → codec.
//!
//! | Received            | Replies                                        |
//! |---------------------|------------------------------------------------|
//! | (connection opens)  | `initialized`                                  |
//! | `set_configuration` | `set_configuration_result`, then `status`      |
//! | `get_status`        | `status`                                       |
//!
//! A configuration with any parse error is not applied at all; the parse
//! errors are returned and the cache is left untouched.

use crate::config::TransportConfig;
use crate::connection::{ChannelHandle, Link, MessageHandler, run_client};
use xrit_core::{
    Configuration, Ip, LiveLink, NodeCommand, ServiceCommand, SetConfigurationResult,
    SourceBackend, SourceCache, XritError, codec, collect_status, create_node_message,
    decode_service_message, reconcile,
};

/// Service state that survives reconnects.
#[derive(Debug)]
pub struct ConfigurationService<B> {
    backend: B,
    cache: SourceCache,
    udp_unicast_endpoint: Option<Ip>,
}

impl<B: SourceBackend> ConfigurationService<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: SourceCache::new(),
            udp_unicast_endpoint: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    /// Endpoint from the last applied configuration.
    pub fn udp_unicast_endpoint(&self) -> Option<&Ip> {
        self.udp_unicast_endpoint.as_ref()
    }

    /// Parse and apply a configuration document.
    pub fn apply_configuration(&mut self, data: &str) -> SetConfigurationResult {
        let (configuration, parse_errors) = codec::from_str::<Configuration>(data);
        if !parse_errors.is_empty() {
            tracing::warn!(
                "Configuration rejected with {} parse error(s)",
                parse_errors.len()
            );
            return SetConfigurationResult {
                parse_errors,
                livelink_errors: Vec::new(),
            };
        }

        tracing::info!(
            "UDP unicast endpoint set to {}",
            configuration.udp_unicast_endpoint
        );
        self.udp_unicast_endpoint = Some(configuration.udp_unicast_endpoint);

        let livelink_errors = reconcile(
            &mut self.cache,
            &configuration.livelink.sources,
            &mut self.backend,
        );
        for error in &livelink_errors {
            tracing::warn!(
                source = %error.source_id,
                code = ?error.code,
                "Source not applied: {}",
                error.message
            );
        }
        tracing::info!(
            "Reconciled {} source(s): {} active, {} error(s)",
            configuration.livelink.sources.len(),
            self.cache.len(),
            livelink_errors.len()
        );

        SetConfigurationResult {
            parse_errors: Vec::new(),
            livelink_errors,
        }
    }

    /// Current status: the cached sources the backend still has.
    pub fn status(&mut self) -> Configuration {
        Configuration {
            udp_unicast_endpoint: self.udp_unicast_endpoint.clone().unwrap_or_default(),
            livelink: LiveLink {
                sources: collect_status(&mut self.cache, &self.backend),
            },
        }
    }

    fn status_message(&mut self) -> Result<String, XritError> {
        let status = self.status();
        create_node_message(NodeCommand::Status, &codec::to_string(&status))
    }

    /// Handle one Node → Service message, returning the replies in order.
    pub fn handle_message(&mut self, message: &str) -> Result<Vec<String>, XritError> {
        let message = decode_service_message(message)?;

        match message.command {
            ServiceCommand::SetConfiguration => {
                let result = self.apply_configuration(message.data);
                let reply = create_node_message(
                    NodeCommand::SetConfigurationResult,
                    &codec::to_string(&result),
                )?;
                Ok(vec![reply, self.status_message()?])
            }
            ServiceCommand::GetStatus => Ok(vec![self.status_message()?]),
            ServiceCommand::Invalid => Err(XritError::ReservedCommand),
        }
    }
}

impl<B: SourceBackend> MessageHandler for ConfigurationService<B> {
    fn on_connected(&mut self, handle: &ChannelHandle) {
        tracing::info!("Connected to node");
        let sent = create_node_message(NodeCommand::Initialized, "")
            .and_then(|message| handle.send(message));
        if let Err(e) = sent {
            tracing::error!("Failed to announce initialization: {}", e);
        }
    }

    fn on_message(&mut self, message: &str, handle: &ChannelHandle) {
        match self.handle_message(message) {
            Ok(replies) => {
                if let Err(e) = handle.send_all(replies) {
                    tracing::error!("Failed to queue reply: {}", e);
                }
            }
            Err(e) => tracing::warn!("Ignoring message: {}", e),
        }
    }
}

/// Connect to the Node and serve it, reconnecting after every disconnect.
///
/// Replies still queued when a connection drops go out on the next one.
/// Runs until the surrounding task is cancelled.
pub async fn run_service<B: SourceBackend>(
    transport: &TransportConfig,
    service: &mut ConfigurationService<B>,
) {
    let mut link = Link::new(transport);
    run_client(transport, &mut link, service).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use std::collections::BTreeSet;
    use xrit_core::{
        ParseErrorCode, ReflectEnum, SourceKind, create_service_message, decode_node_message,
        mock,
    };

    fn service(kinds: &[SourceKind]) -> ConfigurationService<MemoryBackend> {
        let enabled: BTreeSet<_> = kinds.iter().copied().collect();
        ConfigurationService::new(MemoryBackend::new(enabled))
    }

    fn all_kinds() -> Vec<SourceKind> {
        SourceKind::CASES.iter().map(|(kind, _)| *kind).collect()
    }

    fn set_configuration(configuration: &Configuration) -> String {
        create_service_message(
            ServiceCommand::SetConfiguration,
            &codec::to_string(configuration),
        )
        .expect("message")
    }

    #[test]
    fn set_configuration_replies_result_then_status() {
        let mut service = service(&all_kinds());
        let configuration = mock::mock_configuration();

        let replies = service
            .handle_message(&set_configuration(&configuration))
            .expect("handled");

        assert_eq!(replies.len(), 2);
        let result = decode_node_message(&replies[0]).expect("decode");
        let status = decode_node_message(&replies[1]).expect("decode");
        assert_eq!(result.command, NodeCommand::SetConfigurationResult);
        assert_eq!(status.command, NodeCommand::Status);

        let (result, errors) = codec::from_str::<SetConfigurationResult>(result.data);
        assert!(errors.is_empty());
        assert!(result.is_success());
        assert_eq!(service.cache().len(), 5);
        assert_eq!(service.backend().len(), 5);
    }

    #[test]
    fn disabled_plugin_is_reported_per_source() {
        let mut service = service(&[SourceKind::Dummy]);
        let configuration = mock::mock_configuration();

        let result = service.apply_configuration(&codec::to_string(&configuration));

        assert_eq!(result.livelink_errors.len(), 4);
        assert_eq!(service.cache().len(), 1);
    }

    #[test]
    fn parse_errors_apply_nothing() {
        let mut service = service(&all_kinds());

        let result = service.apply_configuration(r#"{"livelink": {"sources": [{"$type": "nope"}]}}"#);

        assert_eq!(result.parse_errors.len(), 1);
        assert_eq!(result.parse_errors[0].code, ParseErrorCode::VariantTypeInvalid);
        assert!(result.livelink_errors.is_empty());
        assert!(service.cache().is_empty());
        assert!(service.udp_unicast_endpoint().is_none());
    }

    #[test]
    fn status_drops_sources_the_host_lost() {
        let mut service = service(&all_kinds());
        service.apply_configuration(&codec::to_string(&mock::mock_configuration()));

        let lost = service.cache().iter().next().map(|(_, entry)| entry.host_id);
        if let Some(host_id) = lost {
            service.backend_mut().forget(&host_id);
        }

        assert_eq!(service.status().livelink.sources.len(), 4);
        assert_eq!(service.cache().len(), 4);
    }

    #[test]
    fn get_status_replies_status() {
        let mut service = service(&all_kinds());
        let request = create_service_message(ServiceCommand::GetStatus, "").expect("message");

        let replies = service.handle_message(&request).expect("handled");

        assert_eq!(replies.len(), 1);
        let status = decode_node_message(&replies[0]).expect("decode");
        let (configuration, errors) = codec::from_str::<Configuration>(status.data);
        assert!(errors.is_empty());
        assert!(configuration.livelink.sources.is_empty());
    }

    #[test]
    fn wrong_channel_is_rejected() {
        let mut service = service(&all_kinds());
        let result = service.handle_message("unreal_to_node:get_status");

        assert!(matches!(result, Err(XritError::WrongChannel { .. })));
    }
}
