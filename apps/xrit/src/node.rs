//! # Mock Node
//!
//! A stand-in orchestrator for exercising a Service locally.
//!
//! When the Service announces `initialized`, the node pushes its
//! configuration and asks for status. Results and status documents are
//! logged and kept for inspection.

use crate::config::TransportConfig;
use crate::connection::{ChannelHandle, Link, MessageHandler, run_connection};
use tokio::net::TcpListener;
use xrit_core::{
    Configuration, NodeCommand, ServiceCommand, SetConfigurationResult, XritError, codec,
    create_service_message, decode_node_message,
};

/// Node state across connections.
#[derive(Debug, Clone)]
pub struct MockNode {
    configuration: String,
    stop_after_status: Option<usize>,
    results: Vec<SetConfigurationResult>,
    statuses: Vec<Configuration>,
}

impl MockNode {
    /// Create a node that pushes `configuration` (JSON text) on every
    /// `initialized`.
    #[must_use]
    pub fn new(configuration: String) -> Self {
        Self {
            configuration,
            stop_after_status: None,
            results: Vec::new(),
            statuses: Vec::new(),
        }
    }

    /// Stop serving once `count` status documents have arrived.
    #[must_use]
    pub fn stop_after_status(mut self, count: usize) -> Self {
        self.stop_after_status = Some(count);
        self
    }

    /// Results received so far, oldest first.
    pub fn results(&self) -> &[SetConfigurationResult] {
        &self.results
    }

    /// Status documents received so far, oldest first.
    pub fn statuses(&self) -> &[Configuration] {
        &self.statuses
    }

    /// Handle one Service → Node message, returning the requests to send.
    pub fn handle_message(&mut self, message: &str) -> Result<Vec<String>, XritError> {
        let message = decode_node_message(message)?;

        match message.command {
            NodeCommand::Initialized => {
                tracing::info!("Service initialized, pushing configuration");
                Ok(vec![
                    create_service_message(ServiceCommand::SetConfiguration, &self.configuration)?,
                    create_service_message(ServiceCommand::GetStatus, "")?,
                ])
            }
            NodeCommand::SetConfigurationResult => {
                let (result, errors) = codec::from_str::<SetConfigurationResult>(message.data);
                if !errors.is_empty() {
                    tracing::warn!("Unreadable result: {} parse error(s)", errors.len());
                }
                if result.is_success() {
                    tracing::info!("Configuration applied");
                } else {
                    tracing::warn!(
                        "Configuration applied with {} parse error(s) and {} source error(s)",
                        result.parse_errors.len(),
                        result.livelink_errors.len()
                    );
                }
                self.results.push(result);
                Ok(Vec::new())
            }
            NodeCommand::Status => {
                let (status, errors) = codec::from_str::<Configuration>(message.data);
                if !errors.is_empty() {
                    tracing::warn!("Unreadable status: {} parse error(s)", errors.len());
                }
                tracing::info!(
                    "Status: {} source(s), endpoint {}",
                    status.livelink.sources.len(),
                    status.udp_unicast_endpoint
                );
                self.statuses.push(status);
                Ok(Vec::new())
            }
            NodeCommand::Invalid => Err(XritError::ReservedCommand),
        }
    }
}

impl MessageHandler for MockNode {
    fn on_connected(&mut self, _handle: &ChannelHandle) {
        tracing::info!("Service connected");
    }

    fn on_message(&mut self, message: &str, handle: &ChannelHandle) {
        match self.handle_message(message) {
            Ok(requests) => {
                if let Err(e) = handle.send_all(requests) {
                    tracing::error!("Failed to queue request: {}", e);
                }
            }
            Err(e) => tracing::warn!("Ignoring message: {}", e),
        }
    }

    fn is_finished(&self) -> bool {
        self.stop_after_status
            .is_some_and(|count| self.statuses.len() >= count)
    }
}

/// Accept Services on `listener` one at a time until the node finishes.
///
/// One [`Link`] serves every connection, so requests cut off by a
/// disconnect reach the next Service that connects.
pub async fn serve_node(
    listener: TcpListener,
    transport: &TransportConfig,
    node: &mut MockNode,
) -> Result<(), XritError> {
    let mut link = Link::new(transport);

    while !node.is_finished() {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| XritError::IoError(format!("Accept failed: {}", e)))?;
        tracing::info!("Service connected from {}", peer);

        match run_connection(stream, transport, &mut link, node).await {
            Ok(()) => tracing::info!("Service {} disconnected", peer),
            Err(e) => tracing::warn!("Connection to {} failed: {}", peer, e),
        }
    }
    Ok(())
}

/// Bind the configured address and serve Services.
pub async fn run_node(transport: &TransportConfig, node: &mut MockNode) -> Result<(), XritError> {
    let address = transport.address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| XritError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Mock node listening on {}", address);
    serve_node(listener, transport, node).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrit_core::{create_node_message, decode_service_message, mock};

    #[test]
    fn initialized_triggers_push_and_status_request() {
        let mut node = MockNode::new("{}".to_string());
        let announce = create_node_message(NodeCommand::Initialized, "").expect("message");

        let requests = node.handle_message(&announce).expect("handled");

        assert_eq!(requests.len(), 2);
        let push = decode_service_message(&requests[0]).expect("decode");
        let ask = decode_service_message(&requests[1]).expect("decode");
        assert_eq!(push.command, ServiceCommand::SetConfiguration);
        assert_eq!(push.data, "{}");
        assert_eq!(ask.command, ServiceCommand::GetStatus);
    }

    #[test]
    fn results_and_statuses_are_recorded() {
        let mut node = MockNode::new("{}".to_string()).stop_after_status(1);
        let result = create_node_message(
            NodeCommand::SetConfigurationResult,
            &codec::to_string(&mock::mock_parse_error_result()),
        )
        .expect("message");
        let status = create_node_message(
            NodeCommand::Status,
            &codec::to_string(&Configuration::default()),
        )
        .expect("message");

        node.handle_message(&result).expect("handled");
        assert!(!node.is_finished());
        node.handle_message(&status).expect("handled");

        assert_eq!(node.results().len(), 1);
        assert_eq!(node.results()[0].parse_errors.len(), 2);
        assert_eq!(node.statuses().len(), 1);
        assert!(node.is_finished());
    }

    #[test]
    fn service_channel_is_rejected() {
        let mut node = MockNode::new("{}".to_string());
        let result = node.handle_message("node_to_unreal:get_status");

        assert!(matches!(result, Err(XritError::WrongChannel { .. })));
    }
}
