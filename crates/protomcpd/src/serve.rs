//! MCP gateway server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Json, Router};
use protoconf::{BindConfig, ProtoMcpConfig};
use protomcp::bind::{self, ServiceBinding};
use protomcp::protocol::log_request;
use protomcp::{Dispatcher, Implementation, ToolRegistry};
use tonic::transport::{Channel, Endpoint};
use tracing::info;

/// Server state for health endpoint
#[derive(Clone)]
struct HealthState {
    registry: Arc<ToolRegistry>,
    start_time: Instant,
}

async fn handle_health(State(state): State<HealthState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "tools": state.registry.len(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Open the upstream channel, eagerly unless `upstream.lazy` is set.
pub async fn connect_upstream(config: &ProtoMcpConfig) -> Result<Channel> {
    let upstream = &config.upstream;
    let endpoint = Endpoint::from_shared(upstream.endpoint.clone())
        .with_context(|| format!("invalid upstream endpoint {}", upstream.endpoint))?
        .connect_timeout(Duration::from_millis(upstream.connect_timeout_ms));

    if upstream.lazy {
        return Ok(endpoint.connect_lazy());
    }
    endpoint
        .connect()
        .await
        .with_context(|| format!("failed to connect to upstream {}", upstream.endpoint))
}

/// Server identity: configured values, then the first annotated service.
pub fn server_identity(config: &ProtoMcpConfig, bindings: &[ServiceBinding]) -> Implementation {
    let annotated = bind::server_info(bindings).unwrap_or_default();
    let pick = |configured: &str, annotated: String, fallback: &str| {
        if !configured.is_empty() {
            configured.to_string()
        } else if !annotated.is_empty() {
            annotated
        } else {
            fallback.to_string()
        }
    };

    Implementation::new(
        pick(&config.server.name, annotated.name, "protomcp"),
        pick(
            &config.server.version,
            annotated.version,
            env!("CARGO_PKG_VERSION"),
        ),
    )
}

/// Build the full application router.
pub fn app(config: &ProtoMcpConfig, registry: Arc<ToolRegistry>, identity: Implementation) -> Router {
    let dispatcher = Dispatcher::new(Arc::clone(&registry), identity).with_observer(log_request);

    let health_router = Router::new()
        .route(BindConfig::HEALTH_PATH, get(handle_health))
        .with_state(HealthState {
            registry,
            start_time: Instant::now(),
        });

    protomcp::router(dispatcher, &config.bind.path).merge(health_router)
}

/// Run the MCP gateway until ctrl-c.
pub async fn run(config: ProtoMcpConfig, bindings: Vec<ServiceBinding>) -> Result<()> {
    let channel = connect_upstream(&config).await?;

    let registry = Arc::new(ToolRegistry::new());
    let count = bind::register_services(&registry, &bindings, &channel);
    if count == 0 {
        tracing::warn!("no tools registered; tools/list will be empty");
    }

    let identity = server_identity(&config, &bindings);
    info!(
        name = %identity.name,
        version = %identity.version,
        tools = count,
        upstream = %config.upstream.endpoint,
        "protomcp gateway starting"
    );

    let app = app(&config, registry, identity);

    let addr = format!("{}:{}", config.bind.host, config.bind.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("MCP: POST http://{}{}", addr, config.bind.path);
    info!("Health: GET http://{}{}", addr, BindConfig::HEALTH_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received SIGINT, shutting down...");
}
