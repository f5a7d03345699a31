//! Mock extraction engine for testing without real provider calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use exgate_core::{
    EngineKind, Error, ExtractionEngine, ExtractionOptions, RawExtractItem, RawExtractPayload,
    Result, ServiceStatus,
};

/// Mock engine with scripted outcomes and call counters.
///
/// Without a script, every `extract` either echoes the requested URLs
/// back as results or fails, depending on how the mock was built. A
/// script of per-call outcomes takes precedence, consumed front to back.
pub struct MockEngine {
    status: ServiceStatus,
    fail_all: bool,
    script: Mutex<VecDeque<Result<RawExtractPayload>>>,
    extract_calls: AtomicUsize,
    probe_calls: AtomicUsize,
}

impl MockEngine {
    /// An engine whose probe reports `Ok` and whose calls succeed.
    pub fn healthy() -> Self {
        Self {
            status: ServiceStatus::Ok,
            fail_all: false,
            script: Mutex::new(VecDeque::new()),
            extract_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
        }
    }

    /// An engine whose probe reports `Ok` but whose calls all fail.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::healthy()
        }
    }

    /// An engine whose probe reports `Unavailable`.
    pub fn unavailable() -> Self {
        Self {
            status: ServiceStatus::Unavailable,
            ..Self::healthy()
        }
    }

    /// Queue a scripted outcome for the next unscripted `extract` call.
    pub fn with_outcome(self, outcome: Result<RawExtractPayload>) -> Self {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(outcome);
        self
    }

    /// Echo payload: one result per requested URL.
    pub fn payload_for(urls: &[String]) -> RawExtractPayload {
        RawExtractPayload {
            results: urls
                .iter()
                .map(|url| RawExtractItem {
                    url: url.clone(),
                    title: Some(format!("Title of {}", url)),
                    raw_content: Some(format!("Raw content extracted from {}", url)),
                    images: Vec::new(),
                })
                .collect(),
        }
    }

    /// Number of `extract` calls issued against this mock.
    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::Relaxed)
    }

    /// Number of `probe` calls issued against this mock.
    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ExtractionEngine for MockEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Tavily
    }

    async fn extract(
        &self,
        urls: &[String],
        _options: &ExtractionOptions,
    ) -> Result<RawExtractPayload> {
        self.extract_calls.fetch_add(1, Ordering::Relaxed);

        if let Some(outcome) = self.script.lock().expect("mock script lock").pop_front() {
            return outcome;
        }

        if self.fail_all {
            return Err(Error::UpstreamError {
                status: 500,
                message: "mock failure".to_string(),
            });
        }

        Ok(Self::payload_for(urls))
    }

    async fn probe(&self) -> ServiceStatus {
        self.probe_calls.fetch_add(1, Ordering::Relaxed);
        self.status
    }
}
