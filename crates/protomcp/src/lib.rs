//! protomcp - expose annotated gRPC services as MCP tools
//!
//! Reads protobuf descriptors, turns every method annotated as a tool into an
//! MCP tool definition, and serves the stateless JSON-RPC tool protocol over
//! axum, bridging each `tools/call` into one unary gRPC call.
//!
//! # Pieces
//!
//! - [`annotations`] - tool and service metadata from custom options
//! - [`schema`] - input JSON Schema from a request message descriptor
//! - [`convert`] - tool arguments to request messages and replies to JSON
//! - [`registry`] / [`protocol`] - tool registry and JSON-RPC dispatcher
//! - [`transport`] - the HTTP carrier
//! - [`grpc`] / [`bind`] - upstream calls and descriptor discovery
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use protomcp::{bind, Dispatcher, Implementation, ToolRegistry};
//!
//! let pool = bind::load_descriptor_pool(&["descriptors.pb"])?;
//! let bindings = bind::discover(&pool);
//!
//! let channel = tonic::transport::Endpoint::from_static("http://127.0.0.1:50051").connect_lazy();
//! let registry = Arc::new(ToolRegistry::new());
//! bind::register_services(&registry, &bindings, &channel);
//!
//! let dispatcher = Dispatcher::new(registry, Implementation::new("greeter", "1.0.0"))
//!     .with_observer(protomcp::protocol::log_request);
//! let router = protomcp::router(dispatcher, "/");
//! ```

pub mod annotations;
pub mod bind;
pub mod convert;
pub mod grpc;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types at crate root
pub use annotations::{FieldBehavior, ServiceOptions, ToolOptions};
pub use convert::{decode_args, encode_proto, DecodeError, EncodeError};
pub use protocol::Dispatcher;
pub use registry::{ToolDefinition, ToolError, ToolInvoker, ToolRegistry};
pub use schema::{compile_input_schema, default_input_schema};
pub use transport::router;
pub use types::content::Content;
pub use types::error::ErrorData;
pub use types::jsonrpc::{JsonRpcMessage, JsonRpcResponse, RequestId};
pub use types::protocol::{Implementation, ServerCapabilities};
pub use types::tool::{CallToolResult, Tool, ToolAnnotations};
