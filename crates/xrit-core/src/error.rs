//! # Error Model
//!
//! Two kinds of errors live here:
//!
//! - **Domain errors** ([`ParseError`], [`LiveLinkError`]): values produced
//!   by the codec and the reconciler, accumulated into ordered lists and
//!   sent back to the Node as part of a result document. They are reflected
//!   records themselves.
//! - **Operational errors** ([`XritError`]): a whole operation failed
//!   (ill-formed envelope, framing violation, I/O). Returned as `Result`.

use crate::identifier::Identifier;
use crate::{reflect_enum, reflect_record};
use thiserror::Error;

// =============================================================================
// CODEC ERRORS
// =============================================================================

/// Codec error codes. `Invalid` means "no code assigned yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParseErrorCode {
    #[default]
    Invalid,
    InternalError,
    InvalidJson,
    InvalidValue,
    InvalidField,
    VariantTypeMissing,
    VariantTypeInvalid,
}

reflect_enum! {
    ParseErrorCode as "ParseErrorCode" {
        InternalError => "InternalError",
        InvalidJson => "InvalidJson",
        InvalidValue => "InvalidValue",
        InvalidField => "InvalidField",
        VariantTypeMissing => "VariantTypeMissing",
        VariantTypeInvalid => "VariantTypeInvalid",
    }
}

/// A single problem found while parsing a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseError {
    pub code: ParseErrorCode,
    /// Key, index or mapping key at which the problem occurred.
    pub containing_object: String,
    /// Excerpt of the offending value.
    pub value: String,
    pub message: String,
}

reflect_record! {
    ParseError as "ParseError" {
        "code" => code,
        "containing_object" => containing_object,
        "value" => value,
        "message" => message,
    }
}

impl ParseError {
    #[must_use]
    pub fn new(
        code: ParseErrorCode,
        containing_object: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            containing_object: containing_object.into(),
            value: value.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// RECONCILIATION ERRORS
// =============================================================================

/// Reconciliation error codes. `Invalid` means "no code assigned yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LiveLinkErrorCode {
    #[default]
    Invalid,
    InternalError,
    PluginNotEnabled,
    Unimplemented,
    SourceDoesNotExist,
}

reflect_enum! {
    LiveLinkErrorCode as "LiveLinkErrorCode" {
        InternalError => "InternalError",
        PluginNotEnabled => "PluginNotEnabled",
        Unimplemented => "Unimplemented",
        SourceDoesNotExist => "SourceDoesNotExist",
    }
}

/// A failure reported by the resource backend during reconciliation.
///
/// `source_id` is the Node-issued id of the resource the failure belongs to;
/// backends leave it nil and the reconciler fills it in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiveLinkError {
    pub code: LiveLinkErrorCode,
    pub source_id: Identifier,
    pub message: String,
}

reflect_record! {
    LiveLinkError as "LiveLinkError" {
        "code" => code,
        "sourceId" => source_id,
        "message" => message,
    }
}

impl LiveLinkError {
    #[must_use]
    pub fn new(code: LiveLinkErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            source_id: Identifier::default(),
            message: message.into(),
        }
    }

    /// Attribute this error to a Node-issued source id.
    #[must_use]
    pub fn tagged(mut self, source_id: Identifier) -> Self {
        self.source_id = source_id;
        self
    }
}

// =============================================================================
// OPERATIONAL ERRORS
// =============================================================================

/// Errors that abort a whole operation.
///
/// - Use `Result<T, XritError>` for fallible operations
/// - The core never panics; all errors are recoverable
#[derive(Debug, Error)]
pub enum XritError {
    /// The message has no `channel:command` header.
    #[error("Ill-formed message: {0}")]
    IllFormedMessage(String),

    /// The message arrived on a channel other than the one expected.
    #[error("Wrong channel: expected {expected}, got {actual}")]
    WrongChannel { expected: String, actual: String },

    /// The command is not in the channel's vocabulary.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A reserved sentinel was passed where a real command is required.
    #[error("Reserved command cannot be sent")]
    ReservedCommand,

    /// Outbound messages must carry at least one byte.
    #[error("Cannot send an empty message")]
    EmptyMessage,

    /// Start/end markers arrived in an impossible order.
    #[error("Frame out of order: {0}")]
    FrameOutOfOrder(String),

    /// A frame exceeded the configured size limit.
    #[error("Frame too large: {size} bytes (limit {limit})")]
    FrameTooLarge { size: usize, limit: usize },

    /// A reassembled payload was not valid UTF-8.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// A JSON document could not be read or written.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for XritError {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}
