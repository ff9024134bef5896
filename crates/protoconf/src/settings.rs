//! Configuration sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identity reported by `initialize`.
///
/// Empty values are filled at startup from the first annotated service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,
}

/// HTTP listener for the MCP endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindConfig {
    /// Default: 0.0.0.0
    #[serde(default = "BindConfig::default_host")]
    pub host: String,

    /// Default: 8080
    #[serde(default = "BindConfig::default_http_port")]
    pub http_port: u16,

    /// Route that accepts JSON-RPC posts.
    /// Default: /
    #[serde(default = "BindConfig::default_path")]
    pub path: String,
}

impl BindConfig {
    /// Route the daemon reserves for its health check.
    pub const HEALTH_PATH: &'static str = "/healthz";

    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_http_port() -> u16 {
        8080
    }

    fn default_path() -> String {
        "/".to_string()
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            http_port: Self::default_http_port(),
            path: Self::default_path(),
        }
    }
}

/// The gRPC server that tool calls are forwarded to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Default: http://127.0.0.1:50051
    #[serde(default = "UpstreamConfig::default_endpoint")]
    pub endpoint: String,

    /// Default: 5000
    #[serde(default = "UpstreamConfig::default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Connect on first call instead of at startup.
    /// Default: true
    #[serde(default = "UpstreamConfig::default_lazy")]
    pub lazy: bool,
}

impl UpstreamConfig {
    fn default_endpoint() -> String {
        "http://127.0.0.1:50051".to_string()
    }

    fn default_connect_timeout_ms() -> u64 {
        5_000
    }

    fn default_lazy() -> bool {
        true
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            connect_timeout_ms: Self::default_connect_timeout_ms(),
            lazy: Self::default_lazy(),
        }
    }
}

/// Where service descriptors come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorsConfig {
    /// Serialized `FileDescriptorSet` files.
    #[serde(default)]
    pub files: Vec<PathBuf>,

    /// Fully-qualified service names to expose. Empty exposes every
    /// annotated service.
    #[serde(default)]
    pub services: Vec<String>,
}

impl DescriptorsConfig {
    /// Whether a service passes the allow-list.
    pub fn allows(&self, service: &str) -> bool {
        self.services.is_empty() || self.services.iter().any(|s| s == service)
    }
}

/// Logging and tracing export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or `EnvFilter` directive.
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,

    /// OTLP gRPC endpoint. Empty disables span export.
    #[serde(default)]
    pub otlp_endpoint: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }

    pub fn otlp_enabled(&self) -> bool {
        !self.otlp_endpoint.is_empty()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            otlp_endpoint: String::new(),
        }
    }
}
