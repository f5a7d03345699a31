//! Axum-based HTTP server for the extraction gateway.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Json, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use exgate_core::{Error, ExtractDepth, ExtractionOptions, Result, ServiceStatus};

use crate::assembler::{self, ErrorBody, RequestEcho};
use crate::orchestrator::BatchOrchestrator;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Enable CORS.
    pub enable_cors: bool,
    /// Enable request tracing.
    pub enable_tracing: bool,
    /// Requests per minute allowed on the extract route; `None` disables
    /// the limiter (tests drive the router without connection info).
    pub rate_limit_per_minute: Option<u32>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            enable_cors: true,
            enable_tracing: true,
            rate_limit_per_minute: Some(15),
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Batch orchestrator.
    pub orchestrator: BatchOrchestrator,
}

/// Gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    state: Arc<AppState>,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(config: GatewayConfig, orchestrator: BatchOrchestrator) -> Self {
        Self {
            config,
            state: Arc::new(AppState { orchestrator }),
        }
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let mut extract_route = Router::new()
            .route("/extract", post(extract_handler))
            .with_state(self.state.clone());

        if let Some(per_minute) = self.config.rate_limit_per_minute {
            let replenish_secs = (60 / u64::from(per_minute.max(1))).max(1);
            match GovernorConfigBuilder::default()
                .per_second(replenish_secs)
                .burst_size(per_minute)
                .finish()
            {
                Some(conf) => {
                    extract_route = extract_route.layer(GovernorLayer {
                        config: Arc::new(conf),
                    });
                }
                None => {
                    tracing::warn!("Invalid rate limit configuration, limiter disabled");
                }
            }
        }

        let mut router = Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
            .merge(extract_route)
            .layer(CompressionLayer::new());

        if self.config.enable_cors {
            router = router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any));
        }

        if self.config.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router.layer(middleware::from_fn(track_request))
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::gateway(format!("Failed to bind: {}", e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(
            listener,
            self.build_router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .map_err(|e| Error::gateway(format!("Server error: {}", e)))?;

        Ok(())
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Extraction request body.
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    /// URL or list of URLs to extract.
    pub urls: UrlsField,
    /// Include images found on the pages.
    #[serde(default)]
    pub include_images: bool,
    /// Include the untruncated raw content.
    #[serde(default)]
    pub include_raw_content: bool,
    /// Extraction depth.
    #[serde(default)]
    pub extract_depth: ExtractDepth,
    /// Include links found on the pages.
    #[serde(default)]
    pub include_links: bool,
    /// Optional cap on extracted tokens.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl ExtractRequest {
    fn options(&self) -> ExtractionOptions {
        ExtractionOptions {
            include_images: self.include_images,
            include_raw_content: self.include_raw_content,
            extract_depth: self.extract_depth,
            include_links: self.include_links,
            max_tokens: self.max_tokens,
        }
    }
}

/// The `urls` field accepts a bare string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UrlsField {
    One(String),
    Many(Vec<String>),
}

impl UrlsField {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(url) => vec![url],
            Self::Many(urls) => urls,
        }
    }
}

/// Body returned when validation rejects a request.
#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
    pub status: String,
    pub time_taken: f64,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: String,
    pub version: String,
    pub cache_entries: usize,
    pub api_statuses: ApiStatuses,
    pub response_time: String,
}

/// Per-engine upstream classification.
#[derive(Debug, Serialize)]
pub struct ApiStatuses {
    pub tavily: ServiceStatus,
}

/// Welcome payload for the root route.
#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
    pub health: String,
    pub version: String,
}

// =============================================================================
// Middleware
// =============================================================================

/// Request id attached to every request.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Tag each request with an id, log entry/exit, and stamp the response
/// with `X-Request-ID` and `X-Process-Time` headers.
async fn track_request(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    request.extensions_mut().insert(RequestId(request_id.clone()));

    tracing::info!(request_id = %request_id, method = %method, path = %path, "Request received");

    let mut response = next.run(request).await;
    let elapsed = started.elapsed().as_secs_f64();

    tracing::info!(
        request_id = %request_id,
        status = response.status().as_u16(),
        elapsed_secs = elapsed,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", elapsed)) {
        response.headers_mut().insert("x-process-time", value);
    }

    response
}

// =============================================================================
// Handlers
// =============================================================================

/// Reject empty batches and non-http(s) URLs before orchestration.
fn validate_urls(urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        return Err(Error::invalid_request("At least one URL must be provided"));
    }

    for raw in urls {
        let parsed = url::Url::parse(raw)
            .map_err(|_| Error::invalid_request(format!("URL '{}' is not a valid URL", raw)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_request(format!(
                "URL '{}' must start with http:// or https://",
                raw
            )));
        }
    }

    Ok(())
}

/// Batch extraction handler.
async fn extract_handler(
    State(state): State<Arc<AppState>>,
    request_id: Option<Extension<RequestId>>,
    Json(payload): Json<ExtractRequest>,
) -> Response {
    let request_id = request_id
        .map(|Extension(RequestId(id))| id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let started = Instant::now();

    let urls = payload.urls.clone().into_vec();
    if let Err(e) = validate_urls(&urls) {
        tracing::warn!(request_id = %request_id, error = %e, "Rejected extraction request");
        return (
            StatusCode::BAD_REQUEST,
            Json(ValidationErrorResponse {
                request_id,
                error: ErrorBody::from_error(&e),
                status: "error".to_string(),
                time_taken: started.elapsed().as_secs_f64(),
            }),
        )
            .into_response();
    }

    let options = payload.options();
    tracing::info!(
        request_id = %request_id,
        total_urls = urls.len(),
        depth = options.extract_depth.as_str(),
        "Processing extraction batch"
    );

    let outcome = state.orchestrator.run(&urls, &options).await;

    let envelope = assembler::assemble(
        outcome,
        RequestEcho {
            request_id,
            urls,
            engine: state.orchestrator.engine_kind(),
            time_taken: started.elapsed().as_secs_f64(),
        },
    );

    (StatusCode::OK, Json(envelope)).into_response()
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let started = Instant::now();
    let snapshot = state.orchestrator.health().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        time: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_entries: snapshot.cache_entries,
        api_statuses: ApiStatuses {
            tavily: snapshot.upstream_status,
        },
        response_time: format!("{:.4}s", started.elapsed().as_secs_f64()),
    })
}

/// Welcome handler.
async fn root_handler() -> impl IntoResponse {
    Json(WelcomeResponse {
        message: "Web content extraction gateway. POST /extract with a list of URLs.".to_string(),
        health: "/health".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
