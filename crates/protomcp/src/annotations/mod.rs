//! Custom Option Decoding
//!
//! Extracts tool and service annotations from descriptor options without a
//! compiled type for the extension messages. The options of each descriptor are
//! re-encoded to wire bytes and walked tag by tag.
//!
//! ## Extensions
//!
//! | extension | extendee | payload |
//! |---|---|---|
//! | 51234 | `MethodOptions` | wrapper, `ToolOptions` at field 1 |
//! | 51235 | `ServiceOptions` | `ServiceOptions` |
//! | 1052 (`google.api.field_behavior`) | `FieldOptions` | repeated enum |
//!
//! Malformed or missing bytes never produce an error: the annotation is simply
//! absent, which is the common case for unannotated methods.

mod wire;

use prost::Message;
use prost_reflect::{Cardinality, FieldDescriptor, MethodDescriptor, ServiceDescriptor};

use wire::{Reader, Value};

#[cfg(test)]
pub(crate) use wire::encode;

/// Extension number of the tool annotation on `google.protobuf.MethodOptions`.
pub const TOOL_EXTENSION: u32 = 51234;

/// Extension number of the service annotation on `google.protobuf.ServiceOptions`.
pub const SERVICE_EXTENSION: u32 = 51235;

/// Extension number of `google.api.field_behavior` on `google.protobuf.FieldOptions`.
pub const FIELD_BEHAVIOR_EXTENSION: u32 = 1052;

const FIELD_BEHAVIOR_REQUIRED: u64 = 2;
const FIELD_BEHAVIOR_OUTPUT_ONLY: u64 = 3;

/// Tool metadata attached to an RPC method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOptions {
    pub name: String,
    pub title: String,
    pub description: String,
    pub read_only: bool,
    pub idempotent: bool,
    pub destructive: bool,
}

/// Server metadata attached to an RPC service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceOptions {
    pub name: String,
    pub version: String,
}

/// How a field participates in tool input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldBehavior {
    #[default]
    Unspecified,
    Required,
    OutputOnly,
}

/// Tool annotation of a method, if it carries one.
pub fn tool_options(method: &MethodDescriptor) -> Option<ToolOptions> {
    decode_tool_options(&method.options().encode_to_vec())
}

/// Service annotation of a service, if it carries one.
pub fn service_options(service: &ServiceDescriptor) -> Option<ServiceOptions> {
    decode_service_options(&service.options().encode_to_vec())
}

/// Field behavior of a field. A proto2 `required` label counts as required.
pub fn field_behavior(field: &FieldDescriptor) -> FieldBehavior {
    match decode_field_behavior(&field.options().encode_to_vec()) {
        FieldBehavior::Unspecified if field.cardinality() == Cardinality::Required => {
            FieldBehavior::Required
        }
        behavior => behavior,
    }
}

/// Decode a tool annotation from encoded `MethodOptions` bytes.
pub fn decode_tool_options(raw: &[u8]) -> Option<ToolOptions> {
    let payload = find_extension(raw, TOOL_EXTENSION)?;
    let tool = find_extension(payload, 1)?;
    Some(parse_tool_options(tool))
}

/// Decode a service annotation from encoded `ServiceOptions` bytes.
pub fn decode_service_options(raw: &[u8]) -> Option<ServiceOptions> {
    let payload = find_extension(raw, SERVICE_EXTENSION)?;
    parse_service_options(payload)
}

/// Locate the first length-delimited field with the given number.
///
/// Other fields, including ones with the target number but another wire type,
/// are skipped. Returns `None` when the field is missing or the bytes are
/// malformed before it is reached.
pub fn find_extension(raw: &[u8], field_number: u32) -> Option<&[u8]> {
    let mut reader = Reader::new(raw);
    while !reader.is_empty() {
        let (number, wire_type) = reader.read_tag()?;
        let value = reader.read_value(wire_type)?;
        if let Value::Bytes(bytes) = value {
            if number == field_number {
                return Some(bytes);
            }
        }
    }
    None
}

/// Decode the `ToolOptions` message body.
///
/// Decoding stops at the first malformed or mistyped known field and keeps
/// whatever was read before it.
pub fn parse_tool_options(raw: &[u8]) -> ToolOptions {
    let mut out = ToolOptions::default();
    let mut reader = Reader::new(raw);

    while !reader.is_empty() {
        let Some((number, wire_type)) = reader.read_tag() else {
            break;
        };
        let Some(value) = reader.read_value(wire_type) else {
            break;
        };

        match (number, value) {
            (1, Value::Bytes(b)) => out.name = String::from_utf8_lossy(b).into_owned(),
            (2, Value::Bytes(b)) => out.title = String::from_utf8_lossy(b).into_owned(),
            (3, Value::Bytes(b)) => out.description = String::from_utf8_lossy(b).into_owned(),
            (4, Value::Varint(v)) => out.read_only = v != 0,
            (5, Value::Varint(v)) => out.idempotent = v != 0,
            (6, Value::Varint(v)) => out.destructive = v != 0,
            (1..=6, _) => break,
            _ => {}
        }
    }

    out
}

/// Decode the `ServiceOptions` message body.
///
/// Unlike tool options, a malformed or mistyped known field discards the whole
/// annotation.
pub fn parse_service_options(raw: &[u8]) -> Option<ServiceOptions> {
    let mut out = ServiceOptions::default();
    let mut reader = Reader::new(raw);

    while !reader.is_empty() {
        let (number, wire_type) = reader.read_tag()?;
        let value = reader.read_value(wire_type)?;

        match (number, value) {
            (1, Value::Bytes(b)) => out.name = String::from_utf8_lossy(b).into_owned(),
            (2, Value::Bytes(b)) => out.version = String::from_utf8_lossy(b).into_owned(),
            (1 | 2, _) => return None,
            _ => {}
        }
    }

    Some(out)
}

/// Decode `google.api.field_behavior` from encoded `FieldOptions` bytes.
///
/// Accepts both packed and unpacked encodings. OUTPUT_ONLY wins over REQUIRED.
pub fn decode_field_behavior(raw: &[u8]) -> FieldBehavior {
    let mut values = Vec::new();
    let mut reader = Reader::new(raw);

    while !reader.is_empty() {
        let Some((number, wire_type)) = reader.read_tag() else {
            break;
        };
        let Some(value) = reader.read_value(wire_type) else {
            break;
        };
        if number != FIELD_BEHAVIOR_EXTENSION {
            continue;
        }
        match value {
            Value::Varint(v) => values.push(v),
            Value::Bytes(packed) => {
                let mut packed = Reader::new(packed);
                while !packed.is_empty() {
                    match packed.read_varint() {
                        Some(v) => values.push(v),
                        None => break,
                    }
                }
            }
            _ => {}
        }
    }

    if values.contains(&FIELD_BEHAVIOR_OUTPUT_ONLY) {
        FieldBehavior::OutputOnly
    } else if values.contains(&FIELD_BEHAVIOR_REQUIRED) {
        FieldBehavior::Required
    } else {
        FieldBehavior::Unspecified
    }
}
