//! Response assembly.
//!
//! Pure shape work: translating the upstream wire payload into
//! normalized results, and rendering a batch outcome as the externally
//! visible envelope with its cost summary. No network, no cache.

use serde::Serialize;

use exgate_core::{
    BatchOutcome, EngineKind, Error, ExtractionOptions, ExtractionResult, RawExtractPayload,
    ServiceStatus, UsageSummary,
};

/// Maximum length of the content excerpt, in characters.
///
/// Bounds response size regardless of upstream payload size.
pub const CONTENT_EXCERPT_MAX: usize = 5000;

/// Externally visible result envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResponse {
    pub request_id: String,
    pub urls: Vec<String>,
    pub results: Vec<ExtractionResult>,
    pub failed_urls: Vec<String>,
    pub engine: EngineKind,
    pub time_taken: f64,
    /// Whether any result came from the cache.
    pub cached: bool,
    pub status: ServiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub cost_info: UsageSummary,
}

/// Machine-readable error block inside an envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Error block derived from a core error.
    pub fn from_error(error: &Error) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            details: None,
        }
    }
}

/// Request facts echoed into the envelope.
#[derive(Debug, Clone)]
pub struct RequestEcho {
    pub request_id: String,
    pub urls: Vec<String>,
    pub engine: EngineKind,
    pub time_taken: f64,
}

/// Translate the upstream payload into normalized results.
///
/// The content excerpt is capped at [`CONTENT_EXCERPT_MAX`] characters;
/// the untruncated raw content is carried only when the caller asked
/// for it.
pub fn translate(payload: RawExtractPayload, options: &ExtractionOptions) -> Vec<ExtractionResult> {
    payload
        .results
        .into_iter()
        .map(|item| {
            let content = item
                .raw_content
                .as_deref()
                .map(|raw| excerpt(raw, CONTENT_EXCERPT_MAX));

            ExtractionResult {
                content,
                raw_content: if options.include_raw_content {
                    item.raw_content
                } else {
                    None
                },
                images: item.images,
                title: item.title,
                ..ExtractionResult::new(item.url)
            }
        })
        .collect()
}

/// Shape a batch outcome into the response envelope.
///
/// Deterministic given its inputs. An unavailable outcome carries an
/// error block so callers do not have to infer degradation from counts.
pub fn assemble(outcome: BatchOutcome, echo: RequestEcho) -> ExtractionResponse {
    let error = match outcome.status {
        ServiceStatus::Unavailable => {
            let mut body = ErrorBody::from_error(&Error::UpstreamUnavailable);
            body.details = Some(serde_json::json!({"info": "Please retry later"}));
            Some(body)
        }
        _ => None,
    };

    ExtractionResponse {
        request_id: echo.request_id,
        urls: echo.urls,
        results: outcome.results,
        failed_urls: outcome.failed_urls,
        engine: echo.engine,
        time_taken: echo.time_taken,
        cached: outcome.usage.cached_results > 0,
        status: outcome.status,
        error,
        cost_info: outcome.usage,
    }
}

fn excerpt(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
