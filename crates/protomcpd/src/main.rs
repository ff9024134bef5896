//! protomcpd - MCP gateway for annotated gRPC services
//!
//! Subcommands:
//! - `protomcpd serve` - Run the gateway (HTTP JSON-RPC → gRPC)
//! - `protomcpd tools` - Print the tools a descriptor set would expose

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use protoconf::{ConfigSources, ProtoMcpConfig};
use protomcp::bind::{self, ServiceBinding};
use protomcp::Tool;

mod serve;
mod telemetry;

#[derive(Parser)]
#[command(name = "protomcpd")]
#[command(about = "Expose annotated gRPC methods as MCP tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP gateway server
    Serve {
        #[command(flatten)]
        common: CommonArgs,

        /// HTTP port to bind
        #[arg(short, long)]
        port: Option<u16>,

        /// Upstream gRPC endpoint (e.g., http://127.0.0.1:50051)
        #[arg(long)]
        upstream: Option<String>,
    },

    /// Print discovered tools and their input schemas as JSON
    Tools {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Config file (replaces ./protomcp.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serialized FileDescriptorSet; repeat for several
    #[arg(short = 'd', long = "descriptor-set")]
    descriptor_sets: Vec<PathBuf>,
}

impl CommonArgs {
    fn load(&self) -> Result<(ProtoMcpConfig, ConfigSources)> {
        let (mut config, sources) = ProtoMcpConfig::load_with_sources_from(self.config.as_deref())
            .context("Failed to load configuration")?;
        if !self.descriptor_sets.is_empty() {
            config.descriptors.files = self.descriptor_sets.clone();
        }
        Ok((config, sources))
    }
}

/// Load descriptor sets and discover tools, honoring the service allow-list.
fn discover_bindings(config: &ProtoMcpConfig) -> Result<Vec<ServiceBinding>> {
    let files = &config.descriptors.files;
    if files.is_empty() {
        bail!("no descriptor sets configured; pass --descriptor-set or set descriptors.files");
    }

    let pool = bind::load_descriptor_pool(files).context("Failed to load descriptor sets")?;

    for name in &config.descriptors.services {
        if pool.get_service_by_name(name).is_none() {
            tracing::warn!(service = %name, "allow-listed service not found in descriptors");
        }
    }

    Ok(bind::discover(&pool)
        .into_iter()
        .filter(|binding| config.descriptors.allows(binding.service.full_name()))
        .collect())
}

fn print_tools(bindings: &[ServiceBinding]) -> Result<()> {
    let mut tools: Vec<Tool> = bindings
        .iter()
        .flat_map(|binding| binding.tools.iter().map(|spec| spec.to_tool()))
        .collect();
    tools.sort_by(|a, b| a.name.cmp(&b.name));

    let json = serde_json::to_string_pretty(&tools).context("Failed to render tools")?;
    println!("{}", json);
    Ok(())
}

fn log_sources(sources: &ConfigSources) {
    for file in &sources.files {
        tracing::info!(path = %file.display(), "loaded config file");
    }
    if !sources.env_overrides.is_empty() {
        tracing::info!(vars = ?sources.env_overrides, "environment overrides");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            common,
            port,
            upstream,
        } => {
            let (mut config, sources) = common.load()?;
            if let Some(port) = port {
                config.bind.http_port = port;
            }
            if let Some(upstream) = upstream {
                config.upstream.endpoint = upstream;
            }

            let telemetry = telemetry::init(&config.telemetry)?;
            log_sources(&sources);
            let bindings = discover_bindings(&config)?;
            let result = serve::run(config, bindings).await;
            telemetry.shutdown();
            result?;
        }
        Commands::Tools { common } => {
            let (config, _sources) = common.load()?;
            let telemetry = telemetry::init(&config.telemetry)?;
            let bindings = discover_bindings(&config)?;
            print_tools(&bindings)?;
            telemetry.shutdown();
        }
    }

    Ok(())
}
