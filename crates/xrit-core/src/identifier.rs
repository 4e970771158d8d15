//! # Identifier
//!
//! 128-bit identifiers exchanged between the Node and the Service.
//!
//! The value is held as four `u32` components `(a, b, c, d)`. The canonical
//! text form is 32 hex digits grouped 8-4-4-4-12:
//!
//! ```text
//! aaaaaaaa-bbbb-bbbb-cccc-ccccdddddddd
//! ```
//!
//! Parsing is case-insensitive; formatting is always lowercase.

use crate::primitives::{IDENTIFIER_HYPHENS, IDENTIFIER_TEXT_LENGTH};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 128-bit identifier.
///
/// Used both for Node-issued source ids and for host ids assigned by the
/// resource backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Identifier {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
}

/// Reasons an identifier text is rejected.
///
/// The display text of each variant is what the codec reports as the
/// message of the resulting `InvalidValue` parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("guid string should have length 36")]
    WrongLength,

    #[error("guid hyphen placement is incorrect, expected: 00000000-0000-0000-0000-000000000000")]
    HyphenPlacement,

    #[error("guid characters should be valid hex characters")]
    NonHex,
}

impl Identifier {
    /// Create an identifier from its four components.
    #[must_use]
    pub const fn new(a: u32, b: u32, c: u32, d: u32) -> Self {
        Self { a, b, c, d }
    }

    /// Create an identifier from a single 128-bit value, `a` being the most
    /// significant component.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self {
            a: (value >> 96) as u32,
            b: (value >> 64) as u32,
            c: (value >> 32) as u32,
            d: value as u32,
        }
    }

    /// The identifier as a single 128-bit value.
    #[must_use]
    pub const fn as_u128(&self) -> u128 {
        ((self.a as u128) << 96) | ((self.b as u128) << 64) | ((self.c as u128) << 32) | self.d as u128
    }

    /// A fresh random (version 4) identifier.
    #[must_use]
    pub fn random() -> Self {
        Self::from_u128(uuid::Uuid::new_v4().as_u128())
    }

    /// True for the all-zero identifier, which is never assigned.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        self.a == 0 && self.b == 0 && self.c == 0 && self.d == 0
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bytes = text.as_bytes();
        if bytes.len() != IDENTIFIER_TEXT_LENGTH {
            return Err(IdentifierError::WrongLength);
        }

        for (offset, &byte) in bytes.iter().enumerate() {
            let expects_hyphen = IDENTIFIER_HYPHENS.contains(&offset);
            if expects_hyphen != (byte == b'-') {
                return Err(IdentifierError::HyphenPlacement);
            }
        }

        let mut value: u128 = 0;
        for &byte in bytes.iter().filter(|&&byte| byte != b'-') {
            let digit = char::from(byte)
                .to_digit(16)
                .ok_or(IdentifierError::NonHex)?;
            value = (value << 4) | u128::from(digit);
        }

        Ok(Self::from_u128(value))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:04x}{:08x}",
            self.a,
            self.b >> 16,
            self.b & 0xffff,
            self.c >> 16,
            self.c & 0xffff,
            self.d
        )
    }
}
