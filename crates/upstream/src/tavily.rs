//! Tavily extraction client.
//!
//! Wraps the provider's `/extract` and `/health` surfaces behind the
//! `ExtractionEngine` trait, applying per-call timeout and the retry
//! budget. No caching happens here; that is the orchestrator's concern.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde_json::json;

use exgate_core::{
    EngineKind, Error, ExtractionEngine, ExtractionOptions, RawExtractPayload, Result,
    ServiceStatus,
};

/// Timeout for the lightweight health probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Ceiling on the exponential rate-limit backoff, in seconds.
const BACKOFF_CAP_SECS: u64 = 10;

/// Excerpt length taken from a non-JSON upstream error body.
const ERROR_EXCERPT_CHARS: usize = 100;

/// Configuration for the Tavily engine.
#[derive(Debug, Clone)]
pub struct TavilyConfig {
    /// Provider base URL.
    pub base_url: String,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Extra attempts after the first, per call.
    pub max_retries: u32,
    /// Provider credential. Absence forces `unavailable` health.
    pub api_key: Option<Secret<String>>,
}

impl Default for TavilyConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tavily.com".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            api_key: None,
        }
    }
}

impl TavilyConfig {
    /// Create a config pointing at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the provider credential.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(key.into()));
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Tavily-backed extraction engine.
pub struct TavilyEngine {
    config: TavilyConfig,
    http: Client,
}

impl TavilyEngine {
    /// Create a new engine from the given configuration.
    pub fn new(config: TavilyConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("exgate/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    fn auth_header(&self) -> Option<String> {
        self.config
            .api_key
            .as_ref()
            .map(|key| format!("Bearer {}", key.expose_secret()))
    }

    /// Capped exponential backoff for rate-limit retries (attempt is
    /// 0-indexed).
    fn backoff(attempt: u32) -> Duration {
        Duration::from_secs(2u64.saturating_pow(attempt).min(BACKOFF_CAP_SECS))
    }

    /// Wire body for `/extract`. A single URL is sent as a bare string.
    fn request_body(urls: &[String], options: &ExtractionOptions) -> serde_json::Value {
        let urls_field = if urls.len() == 1 {
            json!(urls[0])
        } else {
            json!(urls)
        };

        json!({
            "urls": urls_field,
            "include_images": options.include_images,
            "extract_depth": options.extract_depth.as_str(),
        })
    }

    /// Pull a human-readable message out of an upstream error response:
    /// the JSON body's `error` field if parseable, else a bounded excerpt
    /// of the raw body.
    async fn error_message(response: reqwest::Response) -> String {
        let body = response.text().await.unwrap_or_default();

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(message) = value.get("error").and_then(|v| v.as_str()) {
                if !message.is_empty() {
                    return message.to_string();
                }
            }
        }

        body.chars().take(ERROR_EXCERPT_CHARS).collect()
    }
}

#[async_trait]
impl ExtractionEngine for TavilyEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Tavily
    }

    async fn extract(
        &self,
        urls: &[String],
        options: &ExtractionOptions,
    ) -> Result<RawExtractPayload> {
        let endpoint = format!("{}/extract", self.config.base_url);
        let body = Self::request_body(urls, options);

        for attempt in 0..=self.config.max_retries {
            let mut request = self
                .http
                .post(&endpoint)
                .json(&body)
                .timeout(self.config.timeout);
            if let Some(auth) = self.auth_header() {
                request = request.header(AUTHORIZATION, auth);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response.json::<RawExtractPayload>().await.map_err(|e| {
                            Error::internal(format!("Failed to decode upstream payload: {}", e))
                        });
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        if attempt < self.config.max_retries {
                            let wait = Self::backoff(attempt);
                            tracing::warn!(
                                attempt,
                                wait_secs = wait.as_secs(),
                                "Upstream rate limit hit, backing off"
                            );
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                        return Err(Error::UpstreamThrottled);
                    }

                    // Hard error: no retry.
                    let message = Self::error_message(response).await;
                    tracing::error!(status = status.as_u16(), message = %message, "Upstream error");
                    return Err(Error::UpstreamError {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(e) if e.is_timeout() => {
                    if attempt < self.config.max_retries {
                        tracing::warn!(attempt, "Upstream call timed out, retrying");
                        continue;
                    }
                    return Err(Error::UpstreamTimeout);
                }
                Err(e) => {
                    if attempt < self.config.max_retries {
                        tracing::warn!(attempt, error = %e, "Upstream transport error, retrying");
                        continue;
                    }
                    return Err(Error::UpstreamUnreachable(e.to_string()));
                }
            }
        }

        Err(Error::UpstreamThrottled)
    }

    async fn probe(&self) -> ServiceStatus {
        let Some(auth) = self.auth_header() else {
            return ServiceStatus::Unavailable;
        };

        let endpoint = format!("{}/health", self.config.base_url);
        let result = self
            .http
            .get(&endpoint)
            .header(AUTHORIZATION, auth)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => ServiceStatus::Ok,
            Ok(response) => {
                tracing::warn!(
                    status = response.status().as_u16(),
                    "Upstream health probe returned non-success"
                );
                ServiceStatus::Degraded
            }
            Err(e) => {
                tracing::error!(error = %e, "Upstream health probe failed");
                ServiceStatus::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine(server_uri: &str) -> TavilyEngine {
        TavilyEngine::new(TavilyConfig::new(server_uri).with_api_key("tvly-test"))
            .expect("engine construction")
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn backoff_is_capped_exponential() {
        assert_eq!(TavilyEngine::backoff(0), Duration::from_secs(1));
        assert_eq!(TavilyEngine::backoff(1), Duration::from_secs(2));
        assert_eq!(TavilyEngine::backoff(3), Duration::from_secs(8));
        assert_eq!(TavilyEngine::backoff(4), Duration::from_secs(10));
        assert_eq!(TavilyEngine::backoff(63), Duration::from_secs(10));
    }

    #[test]
    fn single_url_is_sent_as_bare_string() {
        let body = TavilyEngine::request_body(
            &urls(&["https://example.com"]),
            &ExtractionOptions::default(),
        );
        assert!(body["urls"].is_string());

        let body = TavilyEngine::request_body(
            &urls(&["https://a.example", "https://b.example"]),
            &ExtractionOptions::default(),
        );
        assert!(body["urls"].is_array());
    }

    #[tokio::test]
    async fn success_decodes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .and(body_partial_json(
                serde_json::json!({"urls": "https://example.com", "extract_depth": "basic"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"url": "https://example.com", "title": "Example", "raw_content": "hello"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let payload = engine(&server.uri())
            .extract(&urls(&["https://example.com"]), &ExtractionOptions::default())
            .await
            .expect("extract");

        assert_eq!(payload.results.len(), 1);
        assert_eq!(payload.results[0].title.as_deref(), Some("Example"));
    }

    #[tokio::test]
    async fn rate_limit_retries_with_backoff_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"url": "https://example.com"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let started = Instant::now();
        let payload = engine(&server.uri())
            .extract(&urls(&["https://example.com"]), &ExtractionOptions::default())
            .await
            .expect("extract after retries");

        assert_eq!(payload.results.len(), 1);
        // min(2^0,10) + min(2^1,10) seconds of accumulated backoff.
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn rate_limit_exhaustion_is_throttled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let engine = TavilyEngine::new(
            TavilyConfig::new(server.uri())
                .with_api_key("tvly-test")
                .with_max_retries(1),
        )
        .expect("engine construction");

        let err = engine
            .extract(&urls(&["https://example.com"]), &ExtractionOptions::default())
            .await
            .expect_err("throttled");
        assert!(matches!(err, Error::UpstreamThrottled));
    }

    #[tokio::test]
    async fn hard_error_fails_immediately_with_body_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"error": "backend exploded"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = engine(&server.uri())
            .extract(&urls(&["https://example.com"]), &ExtractionOptions::default())
            .await
            .expect_err("hard error");

        match err {
            Error::UpstreamError { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "backend exploded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_is_excerpted() {
        let long_body = "x".repeat(500);
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .respond_with(ResponseTemplate::new(403).set_body_string(long_body))
            .expect(1)
            .mount(&server)
            .await;

        let err = engine(&server.uri())
            .extract(&urls(&["https://example.com"]), &ExtractionOptions::default())
            .await
            .expect_err("hard error");

        match err {
            Error::UpstreamError { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message.chars().count(), 100);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn timeout_exhaustion_is_upstream_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let engine = TavilyEngine::new(
            TavilyConfig::new(server.uri())
                .with_api_key("tvly-test")
                .with_timeout(Duration::from_millis(200))
                .with_max_retries(0),
        )
        .expect("engine construction");

        let err = engine
            .extract(&urls(&["https://example.com"]), &ExtractionOptions::default())
            .await
            .expect_err("timeout");
        assert!(matches!(err, Error::UpstreamTimeout));
    }

    #[tokio::test]
    async fn probe_without_credential_is_unavailable() {
        // No server and no credential: classification happens locally.
        let engine =
            TavilyEngine::new(TavilyConfig::new("http://127.0.0.1:9")).expect("engine construction");
        assert_eq!(engine.probe().await, ServiceStatus::Unavailable);
    }

    #[tokio::test]
    async fn probe_classifies_status_codes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let engine = engine(&server.uri());
        assert_eq!(engine.probe().await, ServiceStatus::Ok);
        assert_eq!(engine.probe().await, ServiceStatus::Degraded);
    }

    #[tokio::test]
    async fn probe_unreachable_is_unavailable() {
        let engine = TavilyEngine::new(
            TavilyConfig::new("http://127.0.0.1:9").with_api_key("tvly-test"),
        )
        .expect("engine construction");
        assert_eq!(engine.probe().await, ServiceStatus::Unavailable);
    }
}
