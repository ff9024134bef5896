//! Descriptor fixtures for unit tests.
//!
//! Pools are assembled from `prost-types` descriptor structs. Custom options
//! have no generated type, so their bytes are appended to the encoded structs
//! by hand; protobuf merges repeated fields from concatenated encodings.

use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::source_code_info::Location;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, MethodDescriptorProto, ServiceDescriptorProto,
    SourceCodeInfo,
};

use crate::annotations::encode::{bytes_field, varint_field};
use crate::annotations::{
    ToolOptions, FIELD_BEHAVIOR_EXTENSION, SERVICE_EXTENSION, TOOL_EXTENSION,
};

const REQUIRED: u64 = 2;
const OUTPUT_ONLY: u64 = 3;

fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn scalar(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        json_name: Some(json_name(name)),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

pub(crate) fn repeated(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.label = Some(Label::Repeated as i32);
    field
}

pub(crate) fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Message)
    }
}

pub(crate) fn enum_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Enum)
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn map_entry(name: &str, value: FieldDescriptorProto) -> DescriptorProto {
    DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message(name, vec![scalar("key", 1, Type::String), value])
    }
}

/// A field followed by `FieldOptions` carrying `google.api.field_behavior`.
fn with_behavior(field: &FieldDescriptorProto, behaviors: &[u64]) -> Vec<u8> {
    let mut options = Vec::new();
    for behavior in behaviors {
        varint_field(&mut options, FIELD_BEHAVIOR_EXTENSION, *behavior);
    }
    let mut out = field.encode_to_vec();
    bytes_field(&mut out, 8, &options);
    out
}

/// A message with extra pre-encoded fields appended after its own.
fn message_with(msg: &DescriptorProto, fields: &[Vec<u8>]) -> Vec<u8> {
    let mut out = msg.encode_to_vec();
    for field in fields {
        bytes_field(&mut out, 2, field);
    }
    out
}

/// Encoded `ToolOptions` message body.
pub(crate) fn tool_options_bytes(tool: &ToolOptions) -> Vec<u8> {
    let mut out = Vec::new();
    for (number, text) in [(1, &tool.name), (2, &tool.title), (3, &tool.description)] {
        if !text.is_empty() {
            bytes_field(&mut out, number, text.as_bytes());
        }
    }
    for (number, flag) in [(4, tool.read_only), (5, tool.idempotent), (6, tool.destructive)] {
        if flag {
            varint_field(&mut out, number, 1);
        }
    }
    out
}

fn method_with_tool(method: &MethodDescriptorProto, tool: Option<&ToolOptions>) -> Vec<u8> {
    let mut out = method.encode_to_vec();
    if let Some(tool) = tool {
        let mut wrapper = Vec::new();
        bytes_field(&mut wrapper, 1, &tool_options_bytes(tool));
        let mut options = Vec::new();
        bytes_field(&mut options, TOOL_EXTENSION, &wrapper);
        bytes_field(&mut out, 4, &options);
    }
    out
}

fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

fn comment(path: Vec<i32>, text: &str) -> Location {
    Location {
        path,
        span: vec![0, 0, 0],
        leading_comments: Some(text.to_string()),
        trailing_comments: None,
        leading_detached_comments: Vec::new(),
    }
}

fn file_set(files: &[Vec<u8>]) -> DescriptorPool {
    let mut set = Vec::new();
    for file in files {
        bytes_field(&mut set, 1, file);
    }
    DescriptorPool::decode(set.as_slice()).unwrap()
}

fn well_known_files() -> Vec<Vec<u8>> {
    let timestamp = FileDescriptorProto {
        name: Some("google/protobuf/timestamp.proto".into()),
        package: Some("google.protobuf".into()),
        syntax: Some("proto3".into()),
        message_type: vec![
            message(
                "Timestamp",
                vec![scalar("seconds", 1, Type::Int64), scalar("nanos", 2, Type::Int32)],
            ),
            message(
                "Duration",
                vec![scalar("seconds", 1, Type::Int64), scalar("nanos", 2, Type::Int32)],
            ),
        ],
        ..Default::default()
    };

    let wrappers = FileDescriptorProto {
        name: Some("google/protobuf/wrappers.proto".into()),
        package: Some("google.protobuf".into()),
        syntax: Some("proto3".into()),
        message_type: vec![
            message("Int32Value", vec![scalar("value", 1, Type::Int32)]),
            message("StringValue", vec![scalar("value", 1, Type::String)]),
            message("BoolValue", vec![scalar("value", 1, Type::Bool)]),
        ],
        ..Default::default()
    };

    let mut structs = FileDescriptorProto {
        name: Some("google/protobuf/struct.proto".into()),
        package: Some("google.protobuf".into()),
        syntax: Some("proto3".into()),
        message_type: vec![
            DescriptorProto {
                nested_type: vec![map_entry(
                    "FieldsEntry",
                    message_field("value", 2, ".google.protobuf.Value"),
                )],
                ..message(
                    "Struct",
                    vec![repeated(message_field(
                        "fields",
                        1,
                        ".google.protobuf.Struct.FieldsEntry",
                    ))],
                )
            },
            message(
                "Value",
                vec![
                    scalar("number_value", 2, Type::Double),
                    scalar("string_value", 3, Type::String),
                    scalar("bool_value", 4, Type::Bool),
                ],
            ),
            message(
                "ListValue",
                vec![repeated(message_field("values", 1, ".google.protobuf.Value"))],
            ),
        ],
        ..Default::default()
    };
    structs.message_type.push(message("Empty", Vec::new()));

    vec![
        timestamp.encode_to_vec(),
        wrappers.encode_to_vec(),
        structs.encode_to_vec(),
    ]
}

/// The `greeter.v1` fixture.
///
/// ```text
/// enum Mood { MOOD_UNSPECIFIED = 0; HAPPY = 1; SAD = 2; }
///
/// // A greeting request.
/// message HelloRequest {
///   // Who to greet.
///   string name = 1 [(google.api.field_behavior) = REQUIRED];
///   int32 times = 2;
///   repeated string tags = 3;
///   map<string, int64> counts = 4;
///   Mood mood = 5;
///   google.protobuf.Timestamp at = 6;
///   google.protobuf.Int32Value limit = 7;
///   string server_id = 8 [(google.api.field_behavior) = OUTPUT_ONLY];
///   Node tree = 9;
///   bytes blob = 10;
///   google.protobuf.Struct extra = 11;
///   double ratio = 12;
///   uint64 big = 13;
/// }
///
/// message Node { string label = 1; repeated Node children = 2; Leaf leaf = 3; }
/// message Leaf { Node back = 1; }
/// message HelloReply { string message = 1; int32 count = 2; }
///
/// service Greeter {
///   option (service) = { name: "greeter", version: "1.2.3" };
///   // Says hello.
///   rpc SayHello(HelloRequest) returns (HelloReply) { tool: name "greeter.say_hello", read_only };
///   // Says goodbye.
///   rpc SayGoodbye(HelloRequest) returns (HelloReply) { tool: title "Goodbye", destructive };
///   rpc Internal(HelloRequest) returns (HelloReply);
///   rpc Chat(stream HelloRequest) returns (stream HelloReply) { tool: name "greeter.chat" };
/// }
///
/// service Plain { rpc Ping(HelloRequest) returns (HelloReply) { tool: name "plain.ping" }; }
/// ```
pub(crate) fn greeter_pool() -> DescriptorPool {
    let mood = EnumDescriptorProto {
        name: Some("Mood".into()),
        value: ["MOOD_UNSPECIFIED", "HAPPY", "SAD"]
            .iter()
            .zip(0..)
            .map(|(name, number)| EnumValueDescriptorProto {
                name: Some(name.to_string()),
                number: Some(number),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };

    let request = DescriptorProto {
        nested_type: vec![map_entry("CountsEntry", scalar("value", 2, Type::Int64))],
        ..message(
            "HelloRequest",
            vec![
                scalar("times", 2, Type::Int32),
                repeated(scalar("tags", 3, Type::String)),
                repeated(message_field(
                    "counts",
                    4,
                    ".greeter.v1.HelloRequest.CountsEntry",
                )),
                enum_field("mood", 5, ".greeter.v1.Mood"),
                message_field("at", 6, ".google.protobuf.Timestamp"),
                message_field("limit", 7, ".google.protobuf.Int32Value"),
                message_field("tree", 9, ".greeter.v1.Node"),
                scalar("blob", 10, Type::Bytes),
                message_field("extra", 11, ".google.protobuf.Struct"),
                scalar("ratio", 12, Type::Double),
                scalar("big", 13, Type::Uint64),
            ],
        )
    };
    let request = message_with(
        &request,
        &[
            with_behavior(&scalar("name", 1, Type::String), &[REQUIRED]),
            with_behavior(&scalar("server_id", 8, Type::String), &[OUTPUT_ONLY]),
        ],
    );

    let node = message(
        "Node",
        vec![
            scalar("label", 1, Type::String),
            repeated(message_field("children", 2, ".greeter.v1.Node")),
            message_field("leaf", 3, ".greeter.v1.Leaf"),
        ],
    );
    let leaf = message("Leaf", vec![message_field("back", 1, ".greeter.v1.Node")]);
    let reply = message(
        "HelloReply",
        vec![
            scalar("message", 1, Type::String),
            scalar("count", 2, Type::Int32),
        ],
    );

    let request_type = ".greeter.v1.HelloRequest";
    let reply_type = ".greeter.v1.HelloReply";

    let greeter_methods = [
        method_with_tool(
            &method("SayHello", request_type, reply_type),
            Some(&ToolOptions {
                name: "greeter.say_hello".into(),
                read_only: true,
                ..Default::default()
            }),
        ),
        method_with_tool(
            &method("SayGoodbye", request_type, reply_type),
            Some(&ToolOptions {
                title: "Goodbye".into(),
                destructive: true,
                ..Default::default()
            }),
        ),
        method_with_tool(&method("Internal", request_type, reply_type), None),
        method_with_tool(
            &MethodDescriptorProto {
                client_streaming: Some(true),
                server_streaming: Some(true),
                ..method("Chat", request_type, reply_type)
            },
            Some(&ToolOptions {
                name: "greeter.chat".into(),
                ..Default::default()
            }),
        ),
    ];

    let mut service_options = Vec::new();
    let mut service_body = Vec::new();
    bytes_field(&mut service_body, 1, b"greeter");
    bytes_field(&mut service_body, 2, b"1.2.3");
    bytes_field(&mut service_options, SERVICE_EXTENSION, &service_body);

    let mut greeter = ServiceDescriptorProto {
        name: Some("Greeter".into()),
        ..Default::default()
    }
    .encode_to_vec();
    for method in &greeter_methods {
        bytes_field(&mut greeter, 2, method);
    }
    bytes_field(&mut greeter, 3, &service_options);

    let mut plain = ServiceDescriptorProto {
        name: Some("Plain".into()),
        ..Default::default()
    }
    .encode_to_vec();
    bytes_field(
        &mut plain,
        2,
        &method_with_tool(
            &method("Ping", request_type, reply_type),
            Some(&ToolOptions {
                name: "plain.ping".into(),
                ..Default::default()
            }),
        ),
    );

    // message_type indices: 0 HelloRequest, 1 Node, 2 Leaf, 3 HelloReply
    let file = FileDescriptorProto {
        name: Some("greeter/v1/greeter.proto".into()),
        package: Some("greeter.v1".into()),
        syntax: Some("proto3".into()),
        dependency: vec![
            "google/protobuf/timestamp.proto".into(),
            "google/protobuf/wrappers.proto".into(),
            "google/protobuf/struct.proto".into(),
        ],
        enum_type: vec![mood],
        source_code_info: Some(SourceCodeInfo {
            location: vec![
                comment(vec![4, 0], " A greeting request.\n"),
                comment(vec![4, 0, 2, 11], " Who to greet.\n"),
                comment(vec![6, 0, 2, 0], " Says hello.\n"),
                comment(vec![6, 0, 2, 1], " Says goodbye.\n"),
            ],
        }),
        ..Default::default()
    };
    let mut file_bytes = file.encode_to_vec();
    for msg in [request, node.encode_to_vec(), leaf.encode_to_vec(), reply.encode_to_vec()] {
        bytes_field(&mut file_bytes, 4, &msg);
    }
    bytes_field(&mut file_bytes, 6, &greeter);
    bytes_field(&mut file_bytes, 6, &plain);

    let mut files = well_known_files();
    files.push(file_bytes);
    file_set(&files)
}

/// `chain.v1.M0` .. `M{depth}`; every `Mi` has two fields of type `M(i+1)`
/// and the last one holds a string. Few types, exponentially many paths.
pub(crate) fn fan_out_pool(depth: usize) -> DescriptorPool {
    let mut messages: Vec<DescriptorProto> = (0..depth)
        .map(|i| {
            let next = format!(".chain.v1.M{}", i + 1);
            message(
                &format!("M{}", i),
                vec![message_field("left", 1, &next), message_field("right", 2, &next)],
            )
        })
        .collect();
    messages.push(message(
        &format!("M{}", depth),
        vec![scalar("leaf", 1, Type::String)],
    ));

    let file = FileDescriptorProto {
        name: Some("chain/v1/chain.proto".into()),
        package: Some("chain.v1".into()),
        syntax: Some("proto3".into()),
        message_type: messages,
        ..Default::default()
    };
    file_set(&[file.encode_to_vec()])
}
