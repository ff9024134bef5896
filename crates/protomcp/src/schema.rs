//! JSON Schema compilation for tool input.
//!
//! Turns a request message descriptor into the `inputSchema` advertised by
//! `tools/list`. Property names follow the protobuf JSON mapping, so whatever
//! the schema describes is exactly what [`crate::convert::decode_args`] accepts.
//!
//! The request message is inlined at the top level. Every other message type
//! is compiled once into `$defs` under its full name and referenced with
//! `$ref`, so output size is linear in the number of types and cycles need no
//! special casing.

use std::collections::{HashSet, VecDeque};

use prost_reflect::{FieldDescriptor, FileDescriptor, Kind, MessageDescriptor};
use schemars::Schema;
use serde_json::{json, Map, Value};

use crate::annotations::{field_behavior, FieldBehavior};

/// The permissive schema used when a tool has no compiled input schema.
pub fn default_input_schema() -> Schema {
    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), json!({}));
    schema.insert("additionalProperties".into(), json!(true));
    Schema::from(schema)
}

/// Compile the input schema for a request message.
///
/// Deterministic for a given descriptor. The top-level object rejects
/// unknown properties.
pub fn compile_input_schema(message: &MessageDescriptor) -> Schema {
    let mut compiler = SchemaCompiler::default();
    let mut schema = compiler.message_schema(message);
    schema.insert("additionalProperties".into(), json!(false));

    let mut defs = Map::new();
    while let Some(next) = compiler.pending.pop_front() {
        let body = compiler.message_schema(&next);
        defs.insert(next.full_name().to_string(), Value::Object(body));
    }
    if !defs.is_empty() {
        schema.insert("$defs".into(), Value::Object(defs));
    }
    Schema::from(schema)
}

/// Per-compilation state. Dropped after one top-level message.
#[derive(Default)]
struct SchemaCompiler {
    queued: HashSet<String>,
    pending: VecDeque<MessageDescriptor>,
}

impl SchemaCompiler {
    /// Object schema for the fields of one message. Nested messages are
    /// queued, never expanded here.
    fn message_schema(&mut self, message: &MessageDescriptor) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in message.fields() {
            let behavior = field_behavior(&field);
            if behavior == FieldBehavior::OutputOnly {
                continue;
            }

            let mut schema = self.field_schema(&field);
            if let Some(text) = leading_comment(&field.parent_file(), field.path()) {
                schema.insert("description".into(), Value::String(text));
            }

            let name = field.json_name().to_string();
            if behavior == FieldBehavior::Required {
                required.push(Value::String(name.clone()));
            }
            properties.insert(name, Value::Object(schema));
        }

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        schema
    }

    fn field_schema(&mut self, field: &FieldDescriptor) -> Map<String, Value> {
        match field.kind() {
            Kind::Message(entry) if field.is_map() => {
                let value = self.kind_schema(&entry.map_entry_value_field().kind());
                let mut schema = Map::new();
                schema.insert("type".into(), json!("object"));
                schema.insert("additionalProperties".into(), Value::Object(value));
                schema
            }
            kind if field.is_list() => {
                let items = self.kind_schema(&kind);
                let mut schema = Map::new();
                schema.insert("type".into(), json!("array"));
                schema.insert("items".into(), Value::Object(items));
                schema
            }
            kind => self.kind_schema(&kind),
        }
    }

    fn kind_schema(&mut self, kind: &Kind) -> Map<String, Value> {
        match kind {
            Kind::Enum(descriptor) => {
                let names: Vec<Value> = descriptor
                    .values()
                    .filter(|value| value.number() != 0)
                    .map(|value| Value::String(value.name().to_string()))
                    .collect();
                object(json!({ "type": "string", "enum": names }))
            }
            Kind::Message(message) => match well_known_schema(message.full_name()) {
                Some(schema) => schema,
                None => self.reference(message),
            },
            scalar => scalar_schema(scalar),
        }
    }

    /// `$ref` to the definition of `message`, queueing it on first sight.
    fn reference(&mut self, message: &MessageDescriptor) -> Map<String, Value> {
        let full_name = message.full_name();
        if self.queued.insert(full_name.to_string()) {
            self.pending.push_back(message.clone());
        }
        object(json!({ "$ref": format!("#/$defs/{}", full_name) }))
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn scalar_schema(kind: &Kind) -> Map<String, Value> {
    let (ty, format) = match kind {
        Kind::Double => ("number", Some("double")),
        Kind::Float => ("number", Some("float")),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => ("integer", Some("int32")),
        Kind::Uint32 | Kind::Fixed32 => ("integer", Some("uint32")),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => ("integer", Some("int64")),
        Kind::Uint64 | Kind::Fixed64 => ("integer", Some("uint64")),
        Kind::Bool => ("boolean", None),
        Kind::String => ("string", None),
        Kind::Bytes => ("string", Some("byte")),
        // messages and enums are handled by the caller
        Kind::Message(_) | Kind::Enum(_) => return object(json!({ "type": "object" })),
    };

    let mut schema = Map::new();
    schema.insert("type".into(), json!(ty));
    if let Some(format) = format {
        schema.insert("format".into(), json!(format));
    }
    schema
}

fn well_known_schema(full_name: &str) -> Option<Map<String, Value>> {
    let schema = match full_name {
        "google.protobuf.Timestamp" => json!({ "type": "string", "format": "date-time" }),
        "google.protobuf.Duration" => json!({ "type": "string", "format": "duration" }),
        "google.protobuf.Struct" | "google.protobuf.Any" => {
            json!({ "type": "object", "additionalProperties": true })
        }
        "google.protobuf.Value" => json!({}),
        "google.protobuf.ListValue" => json!({ "type": "array" }),
        "google.protobuf.FieldMask" => json!({ "type": "string" }),
        "google.protobuf.Empty" => json!({ "type": "object", "properties": {} }),
        "google.protobuf.DoubleValue" => return Some(scalar_schema(&Kind::Double)),
        "google.protobuf.FloatValue" => return Some(scalar_schema(&Kind::Float)),
        "google.protobuf.Int64Value" => return Some(scalar_schema(&Kind::Int64)),
        "google.protobuf.UInt64Value" => return Some(scalar_schema(&Kind::Uint64)),
        "google.protobuf.Int32Value" => return Some(scalar_schema(&Kind::Int32)),
        "google.protobuf.UInt32Value" => return Some(scalar_schema(&Kind::Uint32)),
        "google.protobuf.BoolValue" => return Some(scalar_schema(&Kind::Bool)),
        "google.protobuf.StringValue" => return Some(scalar_schema(&Kind::String)),
        "google.protobuf.BytesValue" => return Some(scalar_schema(&Kind::Bytes)),
        _ => return None,
    };
    Some(object(schema))
}

/// Leading comment of the element at `path` in `file`, trimmed.
pub(crate) fn leading_comment(file: &FileDescriptor, path: &[i32]) -> Option<String> {
    let info = file.file_descriptor_proto().source_code_info.as_ref()?;
    let location = info.location.iter().find(|loc| loc.path == path)?;
    let text = location
        .leading_comments
        .as_deref()?
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fan_out_pool, greeter_pool};
    use pretty_assertions::assert_eq;

    fn request_schema() -> Value {
        let pool = greeter_pool();
        let message = pool.get_message_by_name("greeter.v1.HelloRequest").unwrap();
        compile_input_schema(&message).to_value()
    }

    #[test]
    fn test_top_level_shape() {
        let schema = request_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["required"], json!(["name"]));
    }

    #[test]
    fn test_output_only_field_is_omitted() {
        let schema = request_schema();
        assert!(schema["properties"].get("serverId").is_none());
        assert!(schema["properties"].get("server_id").is_none());
    }

    #[test]
    fn test_scalars_and_comment() {
        let schema = request_schema();
        let props = &schema["properties"];
        assert_eq!(
            props["name"],
            json!({ "type": "string", "description": "Who to greet." })
        );
        assert_eq!(props["times"], json!({ "type": "integer", "format": "int32" }));
        assert_eq!(props["blob"], json!({ "type": "string", "format": "byte" }));
        assert_eq!(props["ratio"], json!({ "type": "number", "format": "double" }));
        assert_eq!(props["big"], json!({ "type": "integer", "format": "uint64" }));
    }

    #[test]
    fn test_repeated_map_and_enum() {
        let schema = request_schema();
        let props = &schema["properties"];
        assert_eq!(
            props["tags"],
            json!({ "type": "array", "items": { "type": "string" } })
        );
        assert_eq!(
            props["counts"],
            json!({
                "type": "object",
                "additionalProperties": { "type": "integer", "format": "int64" }
            })
        );
        assert_eq!(
            props["mood"],
            json!({ "type": "string", "enum": ["HAPPY", "SAD"] })
        );
    }

    #[test]
    fn test_well_known_types() {
        let schema = request_schema();
        let props = &schema["properties"];
        assert_eq!(props["at"], json!({ "type": "string", "format": "date-time" }));
        assert_eq!(props["limit"], json!({ "type": "integer", "format": "int32" }));
        assert_eq!(
            props["extra"],
            json!({ "type": "object", "additionalProperties": true })
        );
    }

    #[test]
    fn test_message_fields_reference_defs() {
        let schema = request_schema();
        assert_eq!(
            schema["properties"]["tree"],
            json!({ "$ref": "#/$defs/greeter.v1.Node" })
        );

        let defs = schema["$defs"].as_object().unwrap();
        let mut names: Vec<_> = defs.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["greeter.v1.Leaf", "greeter.v1.Node"]);

        let node = &defs["greeter.v1.Node"];
        assert_eq!(node["properties"]["label"]["type"], "string");
        assert_eq!(
            node["properties"]["children"],
            json!({ "type": "array", "items": { "$ref": "#/$defs/greeter.v1.Node" } })
        );
        assert_eq!(
            node["properties"]["leaf"],
            json!({ "$ref": "#/$defs/greeter.v1.Leaf" })
        );
        assert_eq!(
            defs["greeter.v1.Leaf"]["properties"]["back"],
            json!({ "$ref": "#/$defs/greeter.v1.Node" })
        );
    }

    #[test]
    fn test_self_reference_at_top_level() {
        let pool = greeter_pool();
        let node = pool.get_message_by_name("greeter.v1.Node").unwrap();
        let schema = compile_input_schema(&node).to_value();
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(
            schema["properties"]["children"]["items"],
            json!({ "$ref": "#/$defs/greeter.v1.Node" })
        );
        assert_eq!(
            schema["$defs"]["greeter.v1.Node"]["properties"]["label"]["type"],
            "string"
        );
    }

    #[test]
    fn test_wide_fan_out_stays_linear() {
        let depth = 64;
        let pool = fan_out_pool(depth);
        let root = pool.get_message_by_name("chain.v1.M0").unwrap();
        let schema = compile_input_schema(&root).to_value();

        assert_eq!(schema["$defs"].as_object().unwrap().len(), depth);
        assert_eq!(
            schema["$defs"]["chain.v1.M3"]["properties"]["left"],
            json!({ "$ref": "#/$defs/chain.v1.M4" })
        );
        assert_eq!(
            schema["$defs"][format!("chain.v1.M{}", depth)]["properties"]["leaf"]["type"],
            "string"
        );
        assert!(serde_json::to_string(&schema).unwrap().len() < 64 * 1024);
    }

    #[test]
    fn test_no_defs_without_nested_messages() {
        let pool = greeter_pool();
        let reply = pool.get_message_by_name("greeter.v1.HelloReply").unwrap();
        let schema = compile_input_schema(&reply).to_value();
        assert!(schema.get("$defs").is_none());
    }

    #[test]
    fn test_compilation_is_deterministic() {
        assert_eq!(request_schema(), request_schema());
    }

    #[test]
    fn test_default_input_schema() {
        assert_eq!(
            default_input_schema().to_value(),
            json!({ "type": "object", "properties": {}, "additionalProperties": true })
        );
    }

    #[test]
    fn test_leading_comment_lookup() {
        let pool = greeter_pool();
        let message = pool.get_message_by_name("greeter.v1.HelloRequest").unwrap();
        assert_eq!(
            leading_comment(&message.parent_file(), message.path()).as_deref(),
            Some("A greeting request.")
        );
        let reply = pool.get_message_by_name("greeter.v1.HelloReply").unwrap();
        assert_eq!(leading_comment(&reply.parent_file(), reply.path()), None);
    }
}
