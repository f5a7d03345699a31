//! Core type definitions for Exgate.
//!
//! The domain data model shared by the gateway, the upstream client, and
//! the binary: engine/status enums, request options, cache fingerprints,
//! normalized results, and batch accounting.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Extraction engine identifier.
///
/// Exactly one engine is active at a time; the enum keeps the seam for
/// adding another provider without string-typed plumbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Tavily,
}

impl EngineKind {
    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tavily => "tavily",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction depth forwarded to the upstream provider.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExtractDepth {
    #[default]
    Basic,
    Advanced,
}

impl ExtractDepth {
    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

/// Tri-state availability classification.
///
/// Used both for the point-in-time upstream health probe and for the
/// derived overall status of a batch. Recomputed on demand, never
/// persisted across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Ok,
    Degraded,
    Unavailable,
}

/// Per-request extraction options.
///
/// `include_links` and `max_tokens` are accepted and echoed but not
/// forwarded upstream; the provider contract does not carry them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOptions {
    /// Include images found on the page.
    #[serde(default)]
    pub include_images: bool,
    /// Include the untruncated raw content in results.
    #[serde(default)]
    pub include_raw_content: bool,
    /// Extraction depth.
    #[serde(default)]
    pub extract_depth: ExtractDepth,
    /// Include links found on the page.
    #[serde(default)]
    pub include_links: bool,
    /// Optional cap on extracted tokens.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Composite cache key uniquely identifying a cacheable unit of work.
///
/// Immutable once constructed. Two requests share a cache entry exactly
/// when every component matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    engine: EngineKind,
    url: String,
    include_images: bool,
    include_raw_content: bool,
    depth: ExtractDepth,
}

impl Fingerprint {
    /// Build the fingerprint for one URL under the given options.
    pub fn new(engine: EngineKind, url: &str, options: &ExtractionOptions) -> Self {
        Self {
            engine,
            url: url.to_string(),
            include_images: options.include_images,
            include_raw_content: options.include_raw_content,
            depth: options.extract_depth,
        }
    }

    /// The URL component of the key.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// One URL's normalized extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub url: String,
    pub title: Option<String>,
    /// Bounded-length excerpt of the extracted content.
    pub content: Option<String>,
    /// Full raw content, present only when requested.
    pub raw_content: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<String>,
    #[serde(default)]
    pub images: Vec<Value>,
    #[serde(default)]
    pub links: Vec<Value>,
    pub favicon: Option<String>,
}

impl ExtractionResult {
    /// An empty result shell for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            content: None,
            raw_content: None,
            author: None,
            published_date: None,
            images: Vec::new(),
            links: Vec::new(),
            favicon: None,
        }
    }
}

/// Decoded upstream payload, shape-translated by the assembler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawExtractPayload {
    #[serde(default)]
    pub results: Vec<RawExtractItem>,
}

/// One item of the upstream provider's `results` array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawExtractItem {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub images: Vec<Value>,
}

/// Usage counters for one batch request.
///
/// Mirrors the envelope's cost summary: `api_calls` is what the request
/// actually cost against the provider, `cached_results` what the cache
/// saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_urls: usize,
    pub successful_extractions: usize,
    pub cached_results: usize,
    pub api_calls: usize,
}

/// Aggregated outcome of one batch request.
///
/// Constructed per request, never persisted, discarded after the
/// response is assembled.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub results: Vec<ExtractionResult>,
    pub failed_urls: Vec<String>,
    pub status: ServiceStatus,
    pub usage: UsageSummary,
}

/// Diagnostic snapshot exposed by the health endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HealthSnapshot {
    pub upstream_status: ServiceStatus,
    pub cache_entries: usize,
}
