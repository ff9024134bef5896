//! Conversion between tool arguments and protobuf messages.
//!
//! Both directions use the protobuf JSON mapping through prost-reflect's serde
//! support: lowerCamelCase names on output, either spelling accepted on input.

use prost_reflect::{
    DeserializeOptions, DynamicMessage, MessageDescriptor, ReflectMessage, SerializeOptions,
};
use serde_json::{Map, Value};
use thiserror::Error;

/// Tool arguments could not be read as the request message.
#[derive(Debug, Error)]
#[error("invalid arguments for {message}: {source}")]
pub struct DecodeError {
    pub message: String,
    #[source]
    pub source: serde_json::Error,
}

/// A reply message could not be rendered as JSON.
#[derive(Debug, Error)]
#[error("failed to encode {message}: {source}")]
pub struct EncodeError {
    pub message: String,
    #[source]
    pub source: serde_json::Error,
}

/// Decode tool arguments into a request message.
///
/// Missing arguments decode as an empty message. Unknown keys are dropped;
/// a known key whose value has the wrong JSON type is an error.
pub fn decode_args(
    args: Option<&Map<String, Value>>,
    descriptor: &MessageDescriptor,
) -> Result<DynamicMessage, DecodeError> {
    let args = Value::Object(args.cloned().unwrap_or_default());
    let options = DeserializeOptions::new().deny_unknown_fields(false);

    DynamicMessage::deserialize_with_options(descriptor.clone(), args, &options).map_err(
        |source| DecodeError {
            message: descriptor.full_name().to_string(),
            source,
        },
    )
}

/// Encode a reply message as a JSON object.
///
/// Fields at their default value are left out. No message, or a message that
/// renders as `null`, encodes as an empty object. Well-known types that render
/// as a scalar or array are wrapped as `{"value": ...}`.
pub fn encode_proto(message: Option<&DynamicMessage>) -> Result<Map<String, Value>, EncodeError> {
    let Some(message) = message else {
        return Ok(Map::new());
    };

    let value = message
        .serialize_with_options(serde_json::value::Serializer, &SerializeOptions::new())
        .map_err(|source| EncodeError {
            message: message.descriptor().full_name().to_string(),
            source,
        })?;

    Ok(match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".into(), other);
            map
        }
    })
}
