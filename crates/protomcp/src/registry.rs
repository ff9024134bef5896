//! Tool registry.
//!
//! The registry is the only shared mutable state on the request path. Lookups
//! take a read lock just long enough to clone an `Arc`; registration takes the
//! write lock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use schemars::Schema;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::convert::{DecodeError, EncodeError};
use crate::schema::default_input_schema;
use crate::types::error::ErrorData;
use crate::types::tool::{Tool, ToolAnnotations};

/// Failure of a bound tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    InvalidArguments(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("{}", rpc_message(.0))]
    Rpc(#[from] tonic::Status),

    #[error("{0}")]
    Failed(String),
}

fn rpc_message(status: &tonic::Status) -> String {
    if status.message().is_empty() {
        status.code().description().to_string()
    } else {
        status.message().to_string()
    }
}

impl ToolError {
    /// Create a plain failure with the given text.
    pub fn failed(message: impl Into<String>) -> Self {
        ToolError::Failed(message.into())
    }

    /// JSON-RPC error code reported for this failure.
    pub fn code(&self) -> i32 {
        match self {
            ToolError::InvalidArguments(_) => ErrorData::INVALID_PARAMS,
            ToolError::Encode(_) | ToolError::Rpc(_) | ToolError::Failed(_) => {
                ErrorData::TOOL_EXECUTION_ERROR
            }
        }
    }

    /// Convert into protocol error data.
    pub fn to_error_data(&self) -> ErrorData {
        let error = ErrorData::new(self.code(), self.to_string());
        match self {
            ToolError::Rpc(status) => {
                error.with_data(json!({ "grpcCode": format!("{:?}", status.code()) }))
            }
            _ => error,
        }
    }
}

/// A callable bound to one tool.
///
/// Any `Fn(Map<String, Value>) -> impl Future<Output = Result<Value, ToolError>>`
/// is an invoker.
#[async_trait]
pub trait ToolInvoker: Send + Sync + 'static {
    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolError>;
}

#[async_trait]
impl<F, Fut> ToolInvoker for F
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        (self)(arguments).await
    }
}

/// A registered tool: metadata, input schema, and the invoker behind it.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub title: String,
    pub description: String,
    pub input_schema: Option<Schema>,
    pub read_only: bool,
    pub idempotent: bool,
    pub destructive: bool,
    pub invoker: Arc<dyn ToolInvoker>,
}

impl ToolDefinition {
    /// Create a definition with no schema and no behavior hints.
    pub fn new(name: impl Into<String>, invoker: impl ToolInvoker) -> Self {
        Self {
            name: name.into(),
            title: String::new(),
            description: String::new(),
            input_schema: None,
            read_only: false,
            idempotent: false,
            destructive: false,
            invoker: Arc::new(invoker),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_input_schema(mut self, schema: Schema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    pub fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }

    /// The `tools/list` entry for this definition.
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            title: (!self.title.is_empty()).then(|| self.title.clone()),
            description: self.description.clone(),
            input_schema: self
                .input_schema
                .clone()
                .unwrap_or_else(default_input_schema),
            annotations: ToolAnnotations::from_flags(
                self.read_only,
                self.idempotent,
                self.destructive,
            ),
        }
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("read_only", &self.read_only)
            .field("idempotent", &self.idempotent)
            .field("destructive", &self.destructive)
            .finish_non_exhaustive()
    }
}

/// Tools keyed by name. The last registration for a name wins.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<ToolDefinition>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tool.
    pub fn register(&self, definition: ToolDefinition) {
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        if tools.contains_key(&definition.name) {
            tracing::debug!(tool = %definition.name, "replacing registered tool");
        }
        tools.insert(definition.name.clone(), Arc::new(definition));
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Every registered tool, ordered by name.
    pub fn snapshot(&self) -> Vec<Arc<ToolDefinition>> {
        let mut tools: Vec<_> = self
            .tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn len(&self) -> usize {
        self.tools.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
