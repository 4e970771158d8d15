//! # Message Envelope
//!
//! Wire text of every message exchanged on the channel:
//!
//! ```text
//! <channel>:<command>[\n<data>]
//! ```
//!
//! Two directions share the format, each with its own channel name and
//! closed command vocabulary:
//!
//! | Direction       | Channel          | Commands                                         |
//! |-----------------|------------------|--------------------------------------------------|
//! | Node → Service  | `node_to_unreal` | `set_configuration`, `get_status`                |
//! | Service → Node  | `unreal_to_node` | `initialized`, `set_configuration_result`, `status` |

use crate::XritError;
use crate::primitives::{CHANNEL_SEPARATOR, DATA_SEPARATOR};
use crate::reflect::ReflectEnum;
use crate::reflect_enum;

// =============================================================================
// VOCABULARY
// =============================================================================

/// Channel names, one per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    #[default]
    Invalid,
    /// Service → Node.
    UnrealToNode,
    /// Node → Service.
    NodeToUnreal,
}

reflect_enum! {
    Channel as "Channel" {
        UnrealToNode => "unreal_to_node",
        NodeToUnreal => "node_to_unreal",
    }
}

/// Commands the Service accepts from the Node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceCommand {
    #[default]
    Invalid,
    SetConfiguration,
    GetStatus,
}

reflect_enum! {
    ServiceCommand as "ServiceCommand" {
        SetConfiguration => "set_configuration",
        GetStatus => "get_status",
    }
}

/// Commands the Node accepts from the Service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeCommand {
    #[default]
    Invalid,
    Initialized,
    SetConfigurationResult,
    Status,
}

reflect_enum! {
    NodeCommand as "NodeCommand" {
        Initialized => "initialized",
        SetConfigurationResult => "set_configuration_result",
        Status => "status",
    }
}

/// A command vocabulary bound to the channel it travels on.
pub trait Command: ReflectEnum {
    /// Channel every message of this vocabulary must carry.
    const CHANNEL: Channel;
}

impl Command for ServiceCommand {
    const CHANNEL: Channel = Channel::NodeToUnreal;
}

impl Command for NodeCommand {
    const CHANNEL: Channel = Channel::UnrealToNode;
}

// =============================================================================
// RAW ENVELOPE
// =============================================================================

/// The three raw parts of a message, borrowed from the wire text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageData<'a> {
    pub channel: &'a str,
    pub command: &'a str,
    pub data: &'a str,
}

/// Split wire text into channel, command and data.
///
/// Without a `:` the message is ill-formed and nothing is returned. Without
/// a `\n` after the colon the data is empty.
pub fn split_message(text: &str) -> Result<MessageData<'_>, XritError> {
    let Some((channel, rest)) = text.split_once(CHANNEL_SEPARATOR) else {
        return Err(XritError::IllFormedMessage(format!(
            "missing '{CHANNEL_SEPARATOR}' separator"
        )));
    };

    let (command, data) = rest.split_once(DATA_SEPARATOR).unwrap_or((rest, ""));

    Ok(MessageData {
        channel,
        command,
        data,
    })
}

// =============================================================================
// DECODING
// =============================================================================

/// A decoded message with its typed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a, C> {
    pub command: C,
    pub data: &'a str,
}

/// Decode a message of vocabulary `C`, failing closed when the channel does
/// not belong to `C` or the command is not part of it.
pub fn decode_message<C: Command>(text: &str) -> Result<Message<'_, C>, XritError> {
    let raw = split_message(text)?;

    let channel = Channel::from_case_name(raw.channel);
    if channel != Some(C::CHANNEL) {
        return Err(XritError::WrongChannel {
            expected: C::CHANNEL.case_name().unwrap_or_default().to_string(),
            actual: raw.channel.to_string(),
        });
    }

    let command = C::from_case_name(raw.command)
        .ok_or_else(|| XritError::UnknownCommand(raw.command.to_string()))?;

    Ok(Message {
        command,
        data: raw.data,
    })
}

/// Decode a Node → Service message.
pub fn decode_service_message(text: &str) -> Result<Message<'_, ServiceCommand>, XritError> {
    decode_message(text)
}

/// Decode a Service → Node message.
pub fn decode_node_message(text: &str) -> Result<Message<'_, NodeCommand>, XritError> {
    decode_message(text)
}

// =============================================================================
// ENCODING
// =============================================================================

/// Build wire text for `command`. The data separator is only written when
/// `data` is non-empty.
pub fn create_message<C: Command>(command: C, data: &str) -> Result<String, XritError> {
    let channel = C::CHANNEL.case_name().ok_or(XritError::ReservedCommand)?;
    let command = command.case_name().ok_or(XritError::ReservedCommand)?;

    let mut text = format!("{channel}{CHANNEL_SEPARATOR}{command}");
    if !data.is_empty() {
        text.push(DATA_SEPARATOR);
        text.push_str(data);
    }
    Ok(text)
}

/// Build a Service → Node message.
pub fn create_node_message(command: NodeCommand, data: &str) -> Result<String, XritError> {
    create_message(command, data)
}

/// Build a Node → Service message.
pub fn create_service_message(command: ServiceCommand, data: &str) -> Result<String, XritError> {
    create_message(command, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_channel_command_and_data() {
        let raw = split_message("unreal_to_node:some_command_here\ndata_here").expect("split");

        assert_eq!(raw.channel, "unreal_to_node");
        assert_eq!(raw.command, "some_command_here");
        assert_eq!(raw.data, "data_here");
    }

    #[test]
    fn missing_newline_means_empty_data() {
        let raw = split_message("unreal_to_node:other_command").expect("split");

        assert_eq!(raw.command, "other_command");
        assert_eq!(raw.data, "");
    }

    #[test]
    fn trailing_newline_means_empty_data() {
        let raw = split_message("unreal_to_node:no_data_with_return\n").expect("split");

        assert_eq!(raw.command, "no_data_with_return");
        assert_eq!(raw.data, "");
    }

    #[test]
    fn data_keeps_later_separators() {
        let raw = split_message("a:b\nc:d\ne").expect("split");
        assert_eq!(raw.data, "c:d\ne");
    }

    #[test]
    fn missing_colon_is_ill_formed() {
        let result = split_message("ill_formed_message");
        assert!(matches!(result, Err(XritError::IllFormedMessage(_))));
    }

    #[test]
    fn creates_message_without_trailing_newline() {
        assert_eq!(
            create_node_message(NodeCommand::Initialized, "").expect("create"),
            "unreal_to_node:initialized"
        );
        assert_eq!(
            create_node_message(NodeCommand::Initialized, "some data").expect("create"),
            "unreal_to_node:initialized\nsome data"
        );
    }

    #[test]
    fn rejects_invalid_command() {
        let result = create_service_message(ServiceCommand::Invalid, "");
        assert!(matches!(result, Err(XritError::ReservedCommand)));
    }

    #[test]
    fn decodes_service_message() {
        let message = decode_service_message("node_to_unreal:set_configuration\n{}").expect("decode");

        assert_eq!(message.command, ServiceCommand::SetConfiguration);
        assert_eq!(message.data, "{}");
    }

    #[test]
    fn wrong_channel_fails_closed() {
        let result = decode_service_message("unreal_to_node:get_status");
        assert!(matches!(result, Err(XritError::WrongChannel { .. })));

        let result = decode_node_message("node_to_unreal:status");
        assert!(matches!(result, Err(XritError::WrongChannel { .. })));
    }

    #[test]
    fn other_vocabulary_is_unknown() {
        let result = decode_node_message("unreal_to_node:get_status");
        assert!(matches!(result, Err(XritError::UnknownCommand(_))));
    }

    #[test]
    fn created_messages_decode_back() {
        let text = create_service_message(ServiceCommand::GetStatus, "").expect("create");
        let message = decode_service_message(&text).expect("decode");

        assert_eq!(message.command, ServiceCommand::GetStatus);
        assert!(message.data.is_empty());
    }
}
