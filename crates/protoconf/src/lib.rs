//! Configuration loading for protomcp.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/protomcp/config.toml` (system)
//! 2. `~/.config/protomcp/config.toml` (user)
//! 3. `./protomcp.toml`, or the path given on the command line
//! 4. Environment variables (`PROTOMCP_*`)
//!
//! Files are merged key by key, so a later file only needs the keys it changes.
//!
//! # Example Config
//!
//! ```toml
//! [server]
//! name = "greeter"
//!
//! [bind]
//! http_port = 8080
//! path = "/mcp"
//!
//! [upstream]
//! endpoint = "http://127.0.0.1:50051"
//!
//! [descriptors]
//! files = ["~/protos/greeter.pb"]
//! services = ["greeter.v1.Greeter"]
//!
//! [telemetry]
//! log_level = "info"
//! otlp_endpoint = "http://127.0.0.1:4317"
//! ```

pub mod loader;
pub mod settings;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use settings::{BindConfig, DescriptorsConfig, ServerConfig, TelemetryConfig, UpstreamConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete protomcp configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoMcpConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub bind: BindConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub descriptors: DescriptorsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ProtoMcpConfig {
    /// Load configuration from all standard sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, with `config_path` replacing `./protomcp.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report which files and variables contributed.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::FileRead {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                });
            }
        }

        let files = loader::discover_config_files_with_override(config_path);
        let mut config = loader::load_files(&files)?;
        sources.files = files;

        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    /// Reject values that cannot work at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bind.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "bind.path must start with '/', got {:?}",
                self.bind.path
            )));
        }
        if self.bind.path == BindConfig::HEALTH_PATH {
            return Err(ConfigError::Invalid(format!(
                "bind.path {:?} is reserved for the health check",
                self.bind.path
            )));
        }
        if self.upstream.endpoint.is_empty() {
            return Err(ConfigError::Invalid("upstream.endpoint is empty".to_string()));
        }
        Ok(())
    }
}
