//! # JSON Codec
//!
//! Generic parse and serialize over the [`Reflect`] categories.
//!
//! ## Error Accumulation
//!
//! A failure at one position never aborts its siblings. Every function in
//! this module returns the union of the errors found below it, each labelled
//! with the object key, array index (`label[i]`) or mapping key at which it
//! occurred.
//!
//! ## Member Order
//!
//! Objects are read in document order (`serde_json` is built with
//! `preserve_order`), which is what makes the "`$type` first" rule for
//! tagged unions checkable.

use crate::error::{ParseError, ParseErrorCode};
use crate::identifier::Identifier;
use crate::primitives::{ROOT_LABEL, VARIANT_TYPE_KEY};
use crate::reflect::{MapKey, Reflect, ReflectEnum, ReflectRecord, ReflectVariant};
use serde_json::Value;
use std::collections::BTreeMap;

/// Longest excerpt of an offending value copied into a parse error.
const MAX_EXCERPT_CHARS: usize = 128;

// =============================================================================
// DOCUMENT ENTRY POINTS
// =============================================================================

/// Parse a JSON document into `out`.
///
/// Syntax errors yield a single unlabelled `InvalidJson` error and leave
/// `out` as is.
pub fn parse_str<T: Reflect>(json: &str, out: &mut T, containing_object: &str) -> Vec<ParseError> {
    match serde_json::from_str::<Value>(json) {
        Ok(value) => out.parse_json(&value, containing_object),
        Err(e) => vec![ParseError::new(
            ParseErrorCode::InvalidJson,
            "",
            "",
            e.to_string(),
        )],
    }
}

/// Parse a JSON document into a fresh `T`, labelling the top level `root`.
pub fn from_str<T: Reflect>(json: &str) -> (T, Vec<ParseError>) {
    let mut out = T::default();
    let errors = parse_str(json, &mut out, ROOT_LABEL);
    (out, errors)
}

/// Parse an already-read JSON value into a fresh `T`.
pub fn from_value<T: Reflect>(value: &Value, containing_object: &str) -> (T, Vec<ParseError>) {
    let mut out = T::default();
    let errors = out.parse_json(value, containing_object);
    (out, errors)
}

/// Serialize a value to compact JSON text.
#[must_use]
pub fn to_string<T: Reflect>(value: &T) -> String {
    let mut writer = JsonWriter::new();
    value.write_json(&mut writer);
    writer.into_string()
}

// =============================================================================
// JSON WRITER
// =============================================================================

/// Streaming compact JSON writer.
///
/// Tracks one "needs comma" flag per open container so callers never deal
/// with separators.
#[derive(Debug, Default)]
pub struct JsonWriter {
    out: String,
    needs_comma: Vec<bool>,
    after_key: bool,
}

impl JsonWriter {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The text written so far.
    #[must_use]
    pub fn into_string(self) -> String {
        self.out
    }

    fn begin_value(&mut self) {
        if self.after_key {
            self.after_key = false;
            return;
        }
        if let Some(needs_comma) = self.needs_comma.last_mut() {
            if *needs_comma {
                self.out.push(',');
            }
            *needs_comma = true;
        }
    }

    fn push_quoted(&mut self, text: &str) {
        // Value's Display performs JSON string escaping
        self.out.push_str(&Value::String(text.to_owned()).to_string());
    }

    pub fn begin_object(&mut self) {
        self.begin_value();
        self.out.push('{');
        self.needs_comma.push(false);
    }

    pub fn end_object(&mut self) {
        self.needs_comma.pop();
        self.out.push('}');
    }

    pub fn begin_array(&mut self) {
        self.begin_value();
        self.out.push('[');
        self.needs_comma.push(false);
    }

    pub fn end_array(&mut self) {
        self.needs_comma.pop();
        self.out.push(']');
    }

    /// Write an object member key; the next value written belongs to it.
    pub fn key(&mut self, key: &str) {
        self.begin_value();
        self.push_quoted(key);
        self.out.push(':');
        self.after_key = true;
    }

    pub fn null(&mut self) {
        self.begin_value();
        self.out.push_str("null");
    }

    pub fn bool(&mut self, value: bool) {
        self.begin_value();
        self.out.push_str(if value { "true" } else { "false" });
    }

    pub fn int(&mut self, value: i64) {
        self.begin_value();
        self.out.push_str(&value.to_string());
    }

    pub fn uint(&mut self, value: u64) {
        self.begin_value();
        self.out.push_str(&value.to_string());
    }

    /// Non-finite values have no JSON form and are written as `null`.
    pub fn float(&mut self, value: f32) {
        if value.is_finite() {
            self.begin_value();
            self.out.push_str(&format!("{value:?}"));
        } else {
            self.null();
        }
    }

    pub fn string(&mut self, value: &str) {
        self.begin_value();
        self.push_quoted(value);
    }
}

// =============================================================================
// ERROR HELPERS
// =============================================================================

/// Message used for every type mismatch.
pub(crate) fn expected_type_message(type_name: &str) -> String {
    format!("Expected field to be of type {type_name}")
}

fn excerpt(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= MAX_EXCERPT_CHARS {
        text
    } else {
        text.chars().take(MAX_EXCERPT_CHARS).collect()
    }
}

fn type_mismatch<T: Reflect>(value: &Value, containing_object: &str) -> ParseError {
    ParseError::new(
        ParseErrorCode::InvalidValue,
        containing_object,
        excerpt(value),
        expected_type_message(&T::type_name()),
    )
}

// =============================================================================
// SCALARS
// =============================================================================

/// Store a scalar read by the JSON reader's typed getter, or report a
/// mismatch naming `T`.
pub fn parse_scalar<T: Reflect>(
    out: &mut T,
    read: Option<T>,
    value: &Value,
    containing_object: &str,
) -> Vec<ParseError> {
    match read {
        Some(scalar) => {
            *out = scalar;
            Vec::new()
        }
        None => vec![type_mismatch::<T>(value, containing_object)],
    }
}

/// Identifiers are strings that must also pass the identifier format rules;
/// those rule violations are reported instead of a type mismatch.
pub fn parse_identifier(out: &mut Identifier, value: &Value, containing_object: &str) -> Vec<ParseError> {
    let Some(text) = value.as_str() else {
        return vec![type_mismatch::<Identifier>(value, containing_object)];
    };

    match text.parse::<Identifier>() {
        Ok(id) => {
            *out = id;
            Vec::new()
        }
        Err(e) => vec![ParseError::new(
            ParseErrorCode::InvalidValue,
            containing_object,
            text,
            e.to_string(),
        )],
    }
}

// =============================================================================
// ENUMERATIONS
// =============================================================================

pub fn parse_enum<T: ReflectEnum + Reflect>(
    out: &mut T,
    value: &Value,
    containing_object: &str,
) -> Vec<ParseError> {
    let Some(text) = value.as_str() else {
        return vec![type_mismatch::<T>(value, containing_object)];
    };

    match T::from_case_name(text) {
        Some(case) => {
            *out = case;
            Vec::new()
        }
        None => vec![ParseError::new(
            ParseErrorCode::InvalidValue,
            containing_object,
            text,
            "invalid enum case",
        )],
    }
}

/// The `Invalid` sentinel has no name and is written as `null`.
pub fn write_enum<T: ReflectEnum>(value: &T, writer: &mut JsonWriter) {
    match value.case_name() {
        Some(name) => writer.string(name),
        None => writer.null(),
    }
}

// =============================================================================
// SEQUENCES
// =============================================================================

pub fn parse_sequence<T: Reflect>(
    out: &mut Vec<T>,
    value: &Value,
    containing_object: &str,
) -> Vec<ParseError> {
    let Some(elements) = value.as_array() else {
        return vec![type_mismatch::<Vec<T>>(value, containing_object)];
    };

    let mut errors = Vec::new();
    let mut items = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let mut item = T::default();
        errors.extend(item.parse_json(element, &format!("{containing_object}[{index}]")));
        items.push(item);
    }

    *out = items;
    errors
}

pub fn write_sequence<T: Reflect>(items: &[T], writer: &mut JsonWriter) {
    writer.begin_array();
    for item in items {
        item.write_json(writer);
    }
    writer.end_array();
}

// =============================================================================
// MAPPINGS
// =============================================================================

/// Entries whose key does not convert, or whose value reports errors, are
/// left out of the result; their errors are still returned.
pub fn parse_mapping<K: MapKey, V: Reflect>(
    out: &mut BTreeMap<K, V>,
    value: &Value,
    containing_object: &str,
) -> Vec<ParseError> {
    let Some(members) = value.as_object() else {
        return vec![type_mismatch::<BTreeMap<K, V>>(value, containing_object)];
    };

    let mut errors = Vec::new();
    let mut entries = BTreeMap::new();
    for (raw_key, member) in members {
        let key = match K::from_key(raw_key) {
            Ok(key) => key,
            Err(message) => {
                errors.push(ParseError::new(
                    ParseErrorCode::InvalidValue,
                    containing_object,
                    raw_key.as_str(),
                    message,
                ));
                continue;
            }
        };

        let mut entry = V::default();
        let entry_errors = entry.parse_json(member, raw_key);
        if entry_errors.is_empty() {
            entries.insert(key, entry);
        } else {
            errors.extend(entry_errors);
        }
    }

    *out = entries;
    errors
}

pub fn write_mapping<K: MapKey, V: Reflect>(entries: &BTreeMap<K, V>, writer: &mut JsonWriter) {
    writer.begin_object();
    for (key, entry) in entries {
        writer.key(&key.to_key());
        entry.write_json(writer);
    }
    writer.end_object();
}

// =============================================================================
// TAGGED UNIONS
// =============================================================================

/// An empty object is the "no value" state. Otherwise the first member must
/// be `$type`, naming the alternative that the remaining members populate.
pub fn parse_variant<T: ReflectVariant + Reflect>(
    out: &mut T,
    value: &Value,
    containing_object: &str,
) -> Vec<ParseError> {
    let Some(members) = value.as_object() else {
        return vec![type_mismatch::<T>(value, containing_object)];
    };

    let Some((first_key, type_value)) = members.iter().next() else {
        *out = T::default();
        return Vec::new();
    };

    if first_key != VARIANT_TYPE_KEY {
        return vec![ParseError::new(
            ParseErrorCode::VariantTypeMissing,
            containing_object,
            first_key.as_str(),
            "Variant should start with field $type",
        )];
    }

    let Some(type_name) = type_value.as_str() else {
        return vec![type_mismatch::<String>(type_value, containing_object)];
    };
    let Some(mut alternative) = T::from_alternative_name(type_name) else {
        return vec![ParseError::new(
            ParseErrorCode::VariantTypeInvalid,
            containing_object,
            type_name,
            "Variant does not contain provided type",
        )];
    };

    let errors = alternative.parse_alternative(members.iter().skip(1), containing_object);
    *out = alternative;
    errors
}

pub fn write_variant<T: ReflectVariant>(value: &T, writer: &mut JsonWriter) {
    writer.begin_object();
    if let Some(name) = value.alternative_name() {
        writer.key(VARIANT_TYPE_KEY);
        writer.string(name);
        value.write_alternative(writer);
    }
    writer.end_object();
}

// =============================================================================
// RECORDS
// =============================================================================

pub fn parse_record<T: ReflectRecord + Reflect>(
    out: &mut T,
    value: &Value,
    containing_object: &str,
) -> Vec<ParseError> {
    match value.as_object() {
        Some(members) => parse_members(out, members.iter(), containing_object),
        None => vec![type_mismatch::<T>(value, containing_object)],
    }
}

/// Parse object members into a record's fields. Unknown keys are reported
/// as `InvalidField` and skipped; absent fields keep their current value.
pub fn parse_members<'a, T: ReflectRecord>(
    out: &mut T,
    members: impl Iterator<Item = (&'a String, &'a Value)>,
    containing_object: &str,
) -> Vec<ParseError> {
    let mut errors = Vec::new();
    for (key, member) in members {
        match T::fields().iter().find(|field| field.key == key) {
            Some(field) => errors.extend((field.parse)(out, member, key)),
            None => errors.push(ParseError::new(
                ParseErrorCode::InvalidField,
                containing_object,
                key.as_str(),
                "Object does not contain provided field name",
            )),
        }
    }
    errors
}

pub fn write_record<T: ReflectRecord>(record: &T, writer: &mut JsonWriter) {
    writer.begin_object();
    write_members(record, writer);
    writer.end_object();
}

/// Write a record's fields in table order, without the enclosing braces.
pub fn write_members<T: ReflectRecord>(record: &T, writer: &mut JsonWriter) {
    for field in T::fields() {
        writer.key(field.key);
        (field.write)(record, writer);
    }
}
