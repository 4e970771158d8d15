//! # Reflection Tables
//!
//! Static per-type descriptions driving the generic codec.
//!
//! Every value the codec touches belongs to exactly one [`Category`]:
//!
//! | Category   | Rust shape                        | Registered via        |
//! |------------|-----------------------------------|-----------------------|
//! | `Scalar`   | `bool`, `i64`, `u64`, `f32`, `String`, `Identifier` | built in |
//! | `Enum`     | fieldless enum with `Invalid`     | [`reflect_enum!`]     |
//! | `Sequence` | `Vec<T>`                          | built in              |
//! | `Mapping`  | `BTreeMap<K, V>`                  | built in              |
//! | `Variant`  | enum of records with `Empty`      | [`reflect_variant!`]  |
//! | `Record`   | struct                            | [`reflect_record!`]   |
//!
//! The macros generate the tables and route the [`Reflect`] methods to the
//! category's single code path in [`crate::codec`]. No type carries its own
//! parsing logic.
//!
//! ## Sentinels
//!
//! Enumerations keep a reserved `Invalid` case as their `Default`. It is
//! never listed in the case table, so it can neither be parsed nor written
//! by name. The end-of-set marker is the length of the table.

use crate::codec::{self, JsonWriter};
use crate::error::ParseError;
use crate::identifier::{Identifier, IdentifierError};
use serde_json::Value;
use std::collections::BTreeMap;

// =============================================================================
// CATEGORIES
// =============================================================================

/// The closed set of value shapes understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Scalar,
    Enum,
    Sequence,
    Mapping,
    Variant,
    Record,
}

/// A type the codec can parse from and serialize to JSON.
///
/// `parse_json` accumulates every problem it finds into the returned list
/// and never aborts sibling positions. On a top-level type mismatch the
/// target is left untouched.
pub trait Reflect: Default {
    /// Which codec path handles this type.
    const CATEGORY: Category;

    /// Human-readable type name used in error messages.
    fn type_name() -> String;

    /// Parse `value` into `self`, labelling errors with `containing_object`.
    fn parse_json(&mut self, value: &Value, containing_object: &str) -> Vec<ParseError>;

    /// Append the JSON form of `self` to `writer`.
    fn write_json(&self, writer: &mut JsonWriter);
}

// =============================================================================
// ENUMERATIONS
// =============================================================================

/// Case table of a closed enumeration.
pub trait ReflectEnum: Copy + PartialEq + Default + 'static {
    /// Type name reported in error messages.
    const NAME: &'static str;

    /// Every nameable case with its wire name, in declaration order.
    const CASES: &'static [(Self, &'static str)];

    /// Wire name of this case, `None` for the `Invalid` sentinel.
    fn case_name(self) -> Option<&'static str> {
        Self::CASES
            .iter()
            .find(|(case, _)| *case == self)
            .map(|(_, name)| *name)
    }

    /// Case registered under `name` (exact, case-sensitive match).
    fn from_case_name(name: &str) -> Option<Self> {
        Self::CASES
            .iter()
            .find(|(_, candidate)| *candidate == name)
            .map(|(case, _)| *case)
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// One entry of a record's field table.
///
/// `parse` and `write` reach into the record to the registered field, which
/// may be nested (for example `base` settings kept in their own struct while
/// the wire object stays flat).
pub struct Field<T: 'static> {
    pub key: &'static str,
    pub parse: fn(&mut T, &Value, &str) -> Vec<ParseError>,
    pub write: fn(&T, &mut JsonWriter),
}

/// Ordered field table of a record type.
pub trait ReflectRecord: Default + 'static {
    /// Type name reported in error messages.
    const NAME: &'static str;

    /// Fields in wire order. Lookup during parsing is a linear scan and the
    /// first matching key wins.
    fn fields() -> &'static [Field<Self>];
}

// =============================================================================
// TAGGED UNIONS
// =============================================================================

/// Alternative table of a tagged union.
///
/// Implementors are enums whose `Default` is an `Empty` case (the "no value"
/// state) and whose other cases each wrap one record.
pub trait ReflectVariant: Default + 'static {
    /// Wire names of the alternatives, in declaration order.
    fn alternative_names() -> &'static [&'static str];

    /// Default value of the first alternative registered under `name`.
    fn from_alternative_name(name: &str) -> Option<Self>;

    /// Wire name of the active alternative, `None` when empty.
    fn alternative_name(&self) -> Option<&'static str>;

    /// Parse record members into the active alternative.
    fn parse_alternative<'a>(
        &mut self,
        members: impl Iterator<Item = (&'a String, &'a Value)>,
        containing_object: &str,
    ) -> Vec<ParseError>;

    /// Write the active alternative's members (without braces).
    fn write_alternative(&self, writer: &mut JsonWriter);
}

// =============================================================================
// MAPPING KEYS
// =============================================================================

/// Conversion between JSON object keys and a mapping's key type.
pub trait MapKey: Reflect + Ord {
    /// Convert a member key; the error string becomes the parse error message.
    fn from_key(text: &str) -> Result<Self, String>;

    /// Text written as the JSON member key.
    fn to_key(&self) -> String;
}

impl MapKey for String {
    fn from_key(text: &str) -> Result<Self, String> {
        Ok(text.to_owned())
    }

    fn to_key(&self) -> String {
        self.clone()
    }
}

impl MapKey for i64 {
    fn from_key(text: &str) -> Result<Self, String> {
        text.parse()
            .map_err(|_| codec::expected_type_message(&Self::type_name()))
    }

    fn to_key(&self) -> String {
        self.to_string()
    }
}

impl MapKey for u64 {
    fn from_key(text: &str) -> Result<Self, String> {
        text.parse()
            .map_err(|_| codec::expected_type_message(&Self::type_name()))
    }

    fn to_key(&self) -> String {
        self.to_string()
    }
}

impl MapKey for Identifier {
    fn from_key(text: &str) -> Result<Self, String> {
        text.parse().map_err(|e: IdentifierError| e.to_string())
    }

    fn to_key(&self) -> String {
        self.to_string()
    }
}

// =============================================================================
// BUILT-IN IMPLEMENTATIONS
// =============================================================================

impl Reflect for bool {
    const CATEGORY: Category = Category::Scalar;

    fn type_name() -> String {
        "bool".to_string()
    }

    fn parse_json(&mut self, value: &Value, containing_object: &str) -> Vec<ParseError> {
        codec::parse_scalar(self, value.as_bool(), value, containing_object)
    }

    fn write_json(&self, writer: &mut JsonWriter) {
        writer.bool(*self);
    }
}

impl Reflect for i64 {
    const CATEGORY: Category = Category::Scalar;

    fn type_name() -> String {
        "int64".to_string()
    }

    fn parse_json(&mut self, value: &Value, containing_object: &str) -> Vec<ParseError> {
        codec::parse_scalar(self, value.as_i64(), value, containing_object)
    }

    fn write_json(&self, writer: &mut JsonWriter) {
        writer.int(*self);
    }
}

impl Reflect for u64 {
    const CATEGORY: Category = Category::Scalar;

    fn type_name() -> String {
        "uint64".to_string()
    }

    fn parse_json(&mut self, value: &Value, containing_object: &str) -> Vec<ParseError> {
        codec::parse_scalar(self, value.as_u64(), value, containing_object)
    }

    fn write_json(&self, writer: &mut JsonWriter) {
        writer.uint(*self);
    }
}

impl Reflect for f32 {
    const CATEGORY: Category = Category::Scalar;

    fn type_name() -> String {
        "float".to_string()
    }

    fn parse_json(&mut self, value: &Value, containing_object: &str) -> Vec<ParseError> {
        // Read as f64, narrow to f32
        let read = value.as_f64().map(|wide| wide as f32);
        codec::parse_scalar(self, read, value, containing_object)
    }

    fn write_json(&self, writer: &mut JsonWriter) {
        writer.float(*self);
    }
}

impl Reflect for String {
    const CATEGORY: Category = Category::Scalar;

    fn type_name() -> String {
        "string".to_string()
    }

    fn parse_json(&mut self, value: &Value, containing_object: &str) -> Vec<ParseError> {
        let read = value.as_str().map(str::to_owned);
        codec::parse_scalar(self, read, value, containing_object)
    }

    fn write_json(&self, writer: &mut JsonWriter) {
        writer.string(self);
    }
}

impl Reflect for Identifier {
    const CATEGORY: Category = Category::Scalar;

    fn type_name() -> String {
        "guid".to_string()
    }

    fn parse_json(&mut self, value: &Value, containing_object: &str) -> Vec<ParseError> {
        codec::parse_identifier(self, value, containing_object)
    }

    fn write_json(&self, writer: &mut JsonWriter) {
        writer.string(&self.to_string());
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    const CATEGORY: Category = Category::Sequence;

    fn type_name() -> String {
        format!("list<{}>", T::type_name())
    }

    fn parse_json(&mut self, value: &Value, containing_object: &str) -> Vec<ParseError> {
        codec::parse_sequence(self, value, containing_object)
    }

    fn write_json(&self, writer: &mut JsonWriter) {
        codec::write_sequence(self, writer);
    }
}

impl<K: MapKey, V: Reflect> Reflect for BTreeMap<K, V> {
    const CATEGORY: Category = Category::Mapping;

    fn type_name() -> String {
        format!("dictionary<{}, {}>", K::type_name(), V::type_name())
    }

    fn parse_json(&mut self, value: &Value, containing_object: &str) -> Vec<ParseError> {
        codec::parse_mapping(self, value, containing_object)
    }

    fn write_json(&self, writer: &mut JsonWriter) {
        codec::write_mapping(self, writer);
    }
}

// =============================================================================
// REGISTRATION MACROS
// =============================================================================

/// Register the case table of a fieldless enum.
///
/// The enum must be `Copy + PartialEq + Default` with a `#[default]`
/// `Invalid` case that is left out of the table.
///
/// ```ignore
/// reflect_enum! {
///     LiveLinkSourceMode as "LiveLinkSourceMode" {
///         Latest => "Latest",
///         EngineTime => "EngineTime",
///     }
/// }
/// ```
#[macro_export]
macro_rules! reflect_enum {
    ($ty:ident as $name:literal { $($case:ident => $text:literal),+ $(,)? }) => {
        impl $crate::reflect::ReflectEnum for $ty {
            const NAME: &'static str = $name;
            const CASES: &'static [(Self, &'static str)] = &[$((Self::$case, $text)),+];
        }

        impl $crate::reflect::Reflect for $ty {
            const CATEGORY: $crate::reflect::Category = $crate::reflect::Category::Enum;

            fn type_name() -> String {
                format!("enum {}", $name)
            }

            fn parse_json(
                &mut self,
                value: &$crate::serde_json::Value,
                containing_object: &str,
            ) -> Vec<$crate::error::ParseError> {
                $crate::codec::parse_enum(self, value, containing_object)
            }

            fn write_json(&self, writer: &mut $crate::codec::JsonWriter) {
                $crate::codec::write_enum(self, writer);
            }
        }
    };
}

/// Register the field table of a record.
///
/// Each entry maps a wire key to a (possibly nested) field path. Table
/// order is wire order.
///
/// ```ignore
/// reflect_record! {
///     Ip as "Ip" {
///         "url" => url,
///         "port" => port,
///     }
/// }
/// ```
#[macro_export]
macro_rules! reflect_record {
    ($ty:ty as $name:literal { $($key:literal => $($field:ident).+),* $(,)? }) => {
        impl $crate::reflect::ReflectRecord for $ty {
            const NAME: &'static str = $name;

            fn fields() -> &'static [$crate::reflect::Field<Self>] {
                static FIELDS: &[$crate::reflect::Field<$ty>] = &[$(
                    $crate::reflect::Field {
                        key: $key,
                        parse: |record: &mut $ty, value: &$crate::serde_json::Value, label: &str| {
                            $crate::reflect::Reflect::parse_json(&mut record.$($field).+, value, label)
                        },
                        write: |record: &$ty, writer: &mut $crate::codec::JsonWriter| {
                            $crate::reflect::Reflect::write_json(&record.$($field).+, writer)
                        },
                    }
                ),*];
                FIELDS
            }
        }

        impl $crate::reflect::Reflect for $ty {
            const CATEGORY: $crate::reflect::Category = $crate::reflect::Category::Record;

            fn type_name() -> String {
                format!("class {}", $name)
            }

            fn parse_json(
                &mut self,
                value: &$crate::serde_json::Value,
                containing_object: &str,
            ) -> Vec<$crate::error::ParseError> {
                $crate::codec::parse_record(self, value, containing_object)
            }

            fn write_json(&self, writer: &mut $crate::codec::JsonWriter) {
                $crate::codec::write_record(self, writer);
            }
        }
    };
}

/// Register the alternatives of a tagged union.
///
/// The enum must have a `#[default] Empty` case; every other case wraps a
/// record and is listed with its fully qualified wire name.
#[macro_export]
macro_rules! reflect_variant {
    ($ty:ident { $($case:ident => $text:literal),+ $(,)? }) => {
        impl $crate::reflect::ReflectVariant for $ty {
            fn alternative_names() -> &'static [&'static str] {
                &[$($text),+]
            }

            fn from_alternative_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some(Self::$case(Default::default())),)+
                    _ => None,
                }
            }

            fn alternative_name(&self) -> Option<&'static str> {
                match self {
                    $(Self::$case(_) => Some($text),)+
                    Self::Empty => None,
                }
            }

            fn parse_alternative<'a>(
                &mut self,
                members: impl Iterator<Item = (&'a String, &'a $crate::serde_json::Value)>,
                containing_object: &str,
            ) -> Vec<$crate::error::ParseError> {
                match self {
                    $(Self::$case(inner) => $crate::codec::parse_members(inner, members, containing_object),)+
                    Self::Empty => Vec::new(),
                }
            }

            fn write_alternative(&self, writer: &mut $crate::codec::JsonWriter) {
                match self {
                    $(Self::$case(inner) => $crate::codec::write_members(inner, writer),)+
                    Self::Empty => {}
                }
            }
        }

        impl $crate::reflect::Reflect for $ty {
            const CATEGORY: $crate::reflect::Category = $crate::reflect::Category::Variant;

            fn type_name() -> String {
                format!(
                    "variant<{}>",
                    <Self as $crate::reflect::ReflectVariant>::alternative_names().join(", ")
                )
            }

            fn parse_json(
                &mut self,
                value: &$crate::serde_json::Value,
                containing_object: &str,
            ) -> Vec<$crate::error::ParseError> {
                $crate::codec::parse_variant(self, value, containing_object)
            }

            fn write_json(&self, writer: &mut $crate::codec::JsonWriter) {
                $crate::codec::write_variant(self, writer);
            }
        }
    };
}
