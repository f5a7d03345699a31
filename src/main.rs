#![deny(unused)]
//! Exgate - Web Content Extraction Gateway
//!
//! A gateway that accepts batches of URLs, forwards extraction requests
//! to the upstream provider with retry and backoff, caches per-URL
//! results with TTL expiry, and returns normalized result envelopes.

use std::sync::Arc;
use std::time::Duration;

use secrecy::Secret;

use exgate_core::config::AppConfig;
use exgate_gateway::{BatchOrchestrator, GatewayConfig, GatewayServer, ResultCache};
use exgate_upstream::{TavilyConfig, TavilyEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info")),
        )
        .init();

    tracing::info!("Starting Exgate v{}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Config load failed, falling back to defaults");
            AppConfig::default()
        }
    };

    // =========================================================================
    // Upstream engine
    // =========================================================================
    let api_key = config
        .upstream
        .api_key
        .clone()
        .or_else(|| std::env::var("TAVILY_KEY").ok().map(Secret::new));

    if api_key.is_none() {
        tracing::warn!(
            "No upstream credential configured (EXGATE__UPSTREAM__API_KEY or TAVILY_KEY) - \
             health will report unavailable"
        );
    }

    let engine = TavilyEngine::new(TavilyConfig {
        base_url: config.upstream.base_url.clone(),
        timeout: Duration::from_secs(config.upstream.timeout_seconds),
        max_retries: config.upstream.max_retries,
        api_key,
    })?;

    tracing::info!(
        base_url = %config.upstream.base_url,
        timeout_seconds = config.upstream.timeout_seconds,
        max_retries = config.upstream.max_retries,
        "Upstream engine initialized"
    );

    // =========================================================================
    // Result cache
    // =========================================================================
    let cache = Arc::new(ResultCache::new(
        config.gateway.cache_capacity,
        Duration::from_secs(config.gateway.cache_ttl_minutes * 60),
    ));

    tracing::info!(
        capacity = config.gateway.cache_capacity,
        ttl_minutes = config.gateway.cache_ttl_minutes,
        "Result cache initialized"
    );

    // =========================================================================
    // Gateway
    // =========================================================================
    let orchestrator = BatchOrchestrator::new(Arc::new(engine), cache);

    let gateway_config = GatewayConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        enable_cors: true,
        enable_tracing: true,
        rate_limit_per_minute: Some(config.gateway.rate_limit_per_minute),
    };

    let server = GatewayServer::new(gateway_config.clone(), orchestrator);

    println!();
    println!("  Exgate v{}", env!("CARGO_PKG_VERSION"));
    println!("    GET  /health   - Service and upstream health");
    println!("    POST /extract  - Batch URL extraction");
    println!("    Listening on http://{}:{}", gateway_config.host, gateway_config.port);
    println!();

    server.run().await?;

    Ok(())
}
