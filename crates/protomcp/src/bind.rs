//! Descriptor binding.
//!
//! Walks a descriptor pool once, collects every annotated unary method as a
//! [`ToolSpec`], and binds specs to an upstream channel as registry entries.

use std::path::{Path, PathBuf};

use prost_reflect::{DescriptorError, DescriptorPool, MethodDescriptor, ServiceDescriptor};
use schemars::Schema;
use serde_json::{Map, Value};
use thiserror::Error;
use tonic::transport::Channel;

use crate::annotations::{self, ServiceOptions};
use crate::grpc::UnaryMethod;
use crate::registry::{ToolDefinition, ToolRegistry};
use crate::schema::{compile_input_schema, leading_comment};
use crate::types::tool::{Tool, ToolAnnotations};

#[derive(Debug, Error)]
pub enum BindError {
    #[error("failed to read descriptor set {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid descriptor set {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DescriptorError,
    },
}

/// Read serialized `FileDescriptorSet` files into one pool.
pub fn load_descriptor_pool<P: AsRef<Path>>(paths: &[P]) -> Result<DescriptorPool, BindError> {
    let mut pool = DescriptorPool::new();
    for path in paths {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| BindError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        pool.decode_file_descriptor_set(bytes.as_slice())
            .map_err(|source| BindError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "loaded descriptor set");
    }
    Ok(pool)
}

/// Everything needed to register one tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub title: String,
    pub description: String,
    pub read_only: bool,
    pub idempotent: bool,
    pub destructive: bool,
    pub input_schema: Schema,
    pub method: MethodDescriptor,
}

impl ToolSpec {
    /// The `tools/list` entry this spec will produce.
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            title: (!self.title.is_empty()).then(|| self.title.clone()),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            annotations: ToolAnnotations::from_flags(
                self.read_only,
                self.idempotent,
                self.destructive,
            ),
        }
    }

    /// Bind to an upstream channel.
    pub fn bind(&self, channel: Channel) -> ToolDefinition {
        let method = UnaryMethod::new(self.method.clone(), channel);
        let invoker = move |arguments: Map<String, Value>| {
            let method = method.clone();
            async move { method.invoke(arguments).await }
        };

        ToolDefinition {
            name: self.name.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            input_schema: Some(self.input_schema.clone()),
            read_only: self.read_only,
            idempotent: self.idempotent,
            destructive: self.destructive,
            invoker: std::sync::Arc::new(invoker),
        }
    }
}

/// The tools of one service.
#[derive(Debug, Clone)]
pub struct ServiceBinding {
    pub service: ServiceDescriptor,
    pub options: Option<ServiceOptions>,
    pub tools: Vec<ToolSpec>,
}

/// Collect every annotated unary method in the pool, grouped by service.
///
/// Services with no tools are left out.
pub fn discover(pool: &DescriptorPool) -> Vec<ServiceBinding> {
    let mut bindings = Vec::new();

    for service in pool.services() {
        let options = annotations::service_options(&service);
        let mut tools = Vec::new();

        for method in service.methods() {
            let Some(tool) = annotations::tool_options(&method) else {
                tracing::debug!(method = %method.full_name(), "method has no tool annotation");
                continue;
            };
            if method.is_client_streaming() || method.is_server_streaming() {
                tracing::warn!(
                    method = %method.full_name(),
                    "skipping streaming method; only unary calls can be tools"
                );
                continue;
            }

            let name = if tool.name.is_empty() {
                format!("{}.{}", snake_case(service.name()), snake_case(method.name()))
            } else {
                tool.name
            };
            let description = if tool.description.is_empty() {
                leading_comment(&method.parent_file(), method.path()).unwrap_or_default()
            } else {
                tool.description
            };

            tools.push(ToolSpec {
                name,
                title: tool.title,
                description,
                read_only: tool.read_only,
                idempotent: tool.idempotent,
                destructive: tool.destructive,
                input_schema: compile_input_schema(&method.input()),
                method,
            });
        }

        if !tools.is_empty() {
            bindings.push(ServiceBinding {
                service,
                options,
                tools,
            });
        }
    }

    bindings
}

/// Bind every discovered tool to `channel` and register it.
///
/// Returns the number of tools registered.
pub fn register_services(
    registry: &ToolRegistry,
    bindings: &[ServiceBinding],
    channel: &Channel,
) -> usize {
    let mut count = 0;
    for binding in bindings {
        for spec in &binding.tools {
            registry.register(spec.bind(channel.clone()));
            tracing::info!(
                tool = %spec.name,
                method = %spec.method.full_name(),
                "registered tool"
            );
            count += 1;
        }
    }
    count
}

/// Server metadata from the first annotated service.
pub fn server_info(bindings: &[ServiceBinding]) -> Option<ServiceOptions> {
    bindings.iter().find_map(|binding| binding.options.clone())
}

/// `SayHello` -> `say_hello`, `HTTPServer` -> `http_server`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
