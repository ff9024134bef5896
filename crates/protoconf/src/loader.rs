//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, ProtoMcpConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/protomcp/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("protomcp/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("protomcp.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read one TOML file as a raw table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a single config file on top of the defaults.
pub fn load_from_file(path: &Path) -> Result<ProtoMcpConfig, ConfigError> {
    load_files(&[path.to_path_buf()])
}

/// Merge files in order and deserialize the result once.
pub fn load_files(paths: &[PathBuf]) -> Result<ProtoMcpConfig, ConfigError> {
    let mut merged = toml::Table::new();
    for path in paths {
        merge_tables(&mut merged, load_table(path)?);
    }

    let origin = paths.last().cloned().unwrap_or_default();
    parse_table(merged, &origin)
}

fn parse_table(table: toml::Table, origin: &Path) -> Result<ProtoMcpConfig, ConfigError> {
    let mut config: ProtoMcpConfig =
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

    config.descriptors.files = config
        .descriptors
        .files
        .iter()
        .map(|p| expand_path(&p.to_string_lossy()))
        .collect();

    Ok(config)
}

/// Merge `overlay` into `base`, key by key. Nested tables merge recursively;
/// any other value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut ProtoMcpConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides read through `lookup`.
///
/// Values that fail to parse are ignored and not recorded as overrides.
pub fn apply_overrides_from<F>(config: &mut ProtoMcpConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let take = |key: &str, sources: &mut ConfigSources| {
        let value = lookup(key)?;
        sources.env_overrides.push(key.to_string());
        Some(value)
    };

    if let Some(v) = take("PROTOMCP_NAME", sources) {
        config.server.name = v;
    }
    if let Some(v) = take("PROTOMCP_VERSION", sources) {
        config.server.version = v;
    }

    if let Some(v) = take("PROTOMCP_HOST", sources) {
        config.bind.host = v;
    }
    if let Some(port) = parse_override(&lookup, "PROTOMCP_HTTP_PORT", sources) {
        config.bind.http_port = port;
    }
    if let Some(v) = take("PROTOMCP_PATH", sources) {
        config.bind.path = v;
    }

    if let Some(v) = take("PROTOMCP_UPSTREAM", sources) {
        config.upstream.endpoint = v;
    }
    if let Some(ms) = parse_override(&lookup, "PROTOMCP_CONNECT_TIMEOUT_MS", sources) {
        config.upstream.connect_timeout_ms = ms;
    }

    // Comma-separated lists
    if let Some(v) = take("PROTOMCP_DESCRIPTORS", sources) {
        config.descriptors.files = split_list(&v).map(expand_path).collect();
    }
    if let Some(v) = take("PROTOMCP_SERVICES", sources) {
        config.descriptors.services = split_list(&v).map(str::to_string).collect();
    }

    if let Some(v) = take("PROTOMCP_LOG_LEVEL", sources) {
        config.telemetry.log_level = v;
    }
    if let Some(v) = take("PROTOMCP_OTLP_ENDPOINT", sources) {
        config.telemetry.otlp_endpoint = v;
    }
    // Also support standard OTEL env var
    if let Some(v) = take("OTEL_EXPORTER_OTLP_ENDPOINT", sources) {
        config.telemetry.otlp_endpoint = v;
    }
}

fn parse_override<F, T>(lookup: &F, key: &str, sources: &mut ConfigSources) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let value = lookup(key)?.parse().ok()?;
    sources.env_overrides.push(key.to_string());
    Some(value)
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        match directories::BaseDirs::new() {
            Some(dirs) => dirs.home_dir().join(stripped),
            None => PathBuf::from(path),
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        match stripped.split_once('/') {
            Some((var_name, rest)) => env::var(var_name)
                .map(|value| PathBuf::from(value).join(rest))
                .unwrap_or_else(|_| PathBuf::from(path)),
            None => env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path)),
        }
    } else {
        PathBuf::from(path)
    }
}
