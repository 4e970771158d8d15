//! # Protocol Primitives
//!
//! Fixed constants shared by the codec, the envelope and the channel.
//!
//! These values are part of the wire contract between the Node and the
//! Service and are immutable at runtime.

/// Discriminator key that must open every tagged-union object.
pub const VARIANT_TYPE_KEY: &str = "$type";

/// Label given to the outermost value when parsing a whole document.
pub const ROOT_LABEL: &str = "root";

/// Separator between channel and command in the envelope header.
pub const CHANNEL_SEPARATOR: char = ':';

/// Separator between the envelope header and its data.
pub const DATA_SEPARATOR: char = '\n';

/// Default maximum payload bytes carried by a single frame.
pub const DEFAULT_MAX_BYTES_PER_FRAME: usize = 1024;

/// Length of the canonical hyphenated identifier text.
pub const IDENTIFIER_TEXT_LENGTH: usize = 36;

/// Byte offsets of the hyphens in the canonical identifier text.
pub const IDENTIFIER_HYPHENS: [usize; 4] = [8, 13, 18, 23];
