//! Tool Types
//!
//! Types for MCP tool definitions and call results.

use schemars::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::content::Content;

/// A tool as advertised by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Programmatic name of the tool.
    pub name: String,

    /// Human-readable title (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Description for the LLM. Always present, possibly empty.
    #[serde(default)]
    pub description: String,

    /// JSON Schema for input parameters.
    pub input_schema: Schema,

    /// Behavior hints. Omitted when no hint is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// Tool behavior annotations.
///
/// Only hints that are true are ever set; a false hint is indistinguishable
/// from an absent one on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    /// The tool doesn't modify state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,

    /// Repeated calls have no additional effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,

    /// The tool may perform destructive updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
}

impl ToolAnnotations {
    /// Build annotations from behavior flags, keeping only the true ones.
    ///
    /// Returns `None` when every flag is false.
    pub fn from_flags(read_only: bool, idempotent: bool, destructive: bool) -> Option<Self> {
        if !(read_only || idempotent || destructive) {
            return None;
        }
        let hint = |flag: bool| flag.then_some(true);
        Some(Self {
            read_only_hint: hint(read_only),
            idempotent_hint: hint(idempotent),
            destructive_hint: hint(destructive),
        })
    }
}

/// Parameters for a tools/call request, as read leniently by the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct CallToolParams {
    /// Name of the tool to call, if the request carried a string name.
    pub name: Option<String>,

    /// Arguments to pass to the tool. Empty when absent or not an object.
    pub arguments: Map<String, Value>,
}

impl CallToolParams {
    /// Read `name` and `arguments` from raw params without failing.
    pub fn from_params(params: Option<&Value>) -> Self {
        let Some(params) = params.and_then(Value::as_object) else {
            return Self::default();
        };
        Self {
            name: params
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
            arguments: params
                .get("arguments")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content blocks representing the result.
    pub content: Vec<Content>,

    /// Whether the tool call resulted in an error.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,

    /// Structured form of the result, for non-string values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl CallToolResult {
    /// Create a successful result with a single text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
            structured_content: None,
        }
    }

    /// Wrap an invoker's return value.
    ///
    /// A string renders as itself. Anything else renders as compact JSON text
    /// and is also carried as structured content.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Self::text(text),
            other => {
                let rendered = other.to_string();
                Self {
                    content: vec![Content::text(rendered)],
                    is_error: false,
                    structured_content: Some(other),
                }
            }
        }
    }
}

/// Result of tools/list request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    /// Available tools.
    pub tools: Vec<Tool>,
}

impl ListToolsResult {
    /// Create a result with all tools (no pagination).
    pub fn all(tools: Vec<Tool>) -> Self {
        Self { tools }
    }
}
