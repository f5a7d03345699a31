//! Batch orchestration.
//!
//! For one batch of URLs: gate admission on upstream health, consult the
//! cache per URL, dispatch misses to the upstream engine, aggregate
//! partial failures, and derive the overall batch status.

use std::sync::Arc;

use exgate_core::{
    BatchOutcome, EngineKind, ExtractionEngine, ExtractionOptions, Fingerprint, HealthSnapshot,
    ServiceStatus, UsageSummary,
};

use crate::assembler;
use crate::cache::ResultCache;

/// Orchestrator for batch extraction requests.
///
/// Owns no cross-request state of its own; the engine and cache are
/// injected and shared across concurrent batches.
pub struct BatchOrchestrator {
    engine: Arc<dyn ExtractionEngine>,
    cache: Arc<ResultCache>,
}

impl BatchOrchestrator {
    pub fn new(engine: Arc<dyn ExtractionEngine>, cache: Arc<ResultCache>) -> Self {
        Self { engine, cache }
    }

    /// Identifier of the active engine.
    pub fn engine_kind(&self) -> EngineKind {
        self.engine.kind()
    }

    /// Run one batch.
    ///
    /// Every failure path yields a well-formed outcome: per-URL upstream
    /// errors land in the failed list and never abort the batch; only an
    /// unavailable probe short-circuits the whole request.
    pub async fn run(&self, urls: &[String], options: &ExtractionOptions) -> BatchOutcome {
        // Admission gate: one probe per batch, re-evaluated every time.
        if self.engine.probe().await == ServiceStatus::Unavailable {
            tracing::warn!(
                total_urls = urls.len(),
                "Upstream unavailable, short-circuiting batch"
            );
            return BatchOutcome {
                results: Vec::new(),
                failed_urls: urls.to_vec(),
                status: ServiceStatus::Unavailable,
                usage: UsageSummary {
                    total_urls: urls.len(),
                    successful_extractions: 0,
                    cached_results: 0,
                    api_calls: 0,
                },
            };
        }

        let mut results = Vec::new();
        let mut failed_urls: Vec<String> = Vec::new();
        let mut cached_results = 0usize;

        // URLs are processed sequentially and independently; duplicates
        // within a batch each take their own pass and the second one may
        // hit the entry the first one just inserted.
        for url in urls {
            let fingerprint = Fingerprint::new(self.engine.kind(), url, options);

            if let Some(hit) = self.cache.lookup(&fingerprint) {
                cached_results += 1;
                results.extend(hit);
                continue;
            }

            match self
                .engine
                .extract(std::slice::from_ref(url), options)
                .await
            {
                Ok(payload) => {
                    let translated = assembler::translate(payload, options);
                    self.cache.insert(fingerprint, translated.clone());
                    results.extend(translated);
                }
                Err(e) => {
                    tracing::error!(url = %url, error = %e, "Extraction failed");
                    failed_urls.push(url.clone());
                }
            }
        }

        let total_urls = urls.len();
        let status = if failed_urls.is_empty() {
            ServiceStatus::Ok
        } else if failed_urls.len() == total_urls {
            ServiceStatus::Unavailable
        } else {
            ServiceStatus::Degraded
        };

        BatchOutcome {
            results,
            failed_urls: failed_urls.clone(),
            status,
            usage: UsageSummary {
                total_urls,
                successful_extractions: total_urls - failed_urls.len(),
                cached_results,
                api_calls: total_urls - cached_results,
            },
        }
    }

    /// Diagnostic snapshot: a fresh probe plus the cache population.
    pub async fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            upstream_status: self.engine.probe().await,
            cache_entries: self.cache.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exgate_upstream::MockEngine;
    use std::time::Duration;

    fn cache() -> Arc<ResultCache> {
        Arc::new(ResultCache::new(100, Duration::from_secs(60)))
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn all_failures_mean_unavailable() {
        let engine = Arc::new(MockEngine::failing());
        let orchestrator = BatchOrchestrator::new(engine.clone(), cache());
        let batch = urls(&["https://a.example", "https://b.example"]);

        let outcome = orchestrator
            .run(&batch, &ExtractionOptions::default())
            .await;

        assert_eq!(outcome.status, ServiceStatus::Unavailable);
        assert_eq!(outcome.failed_urls.len(), 2);
        assert_eq!(outcome.usage.successful_extractions, 0);
        assert_eq!(engine.extract_calls(), 2);
    }

    #[tokio::test]
    async fn one_failure_means_degraded() {
        let engine = Arc::new(
            MockEngine::healthy().with_outcome(Err(exgate_core::Error::UpstreamTimeout)),
        );
        let orchestrator = BatchOrchestrator::new(engine.clone(), cache());
        let batch = urls(&[
            "https://a.example",
            "https://b.example",
            "https://c.example",
        ]);

        let outcome = orchestrator
            .run(&batch, &ExtractionOptions::default())
            .await;

        assert_eq!(outcome.status, ServiceStatus::Degraded);
        assert_eq!(outcome.failed_urls, vec!["https://a.example".to_string()]);
        assert_eq!(outcome.usage.successful_extractions, 2);
        assert_eq!(outcome.usage.api_calls, 3);
    }

    #[tokio::test]
    async fn clean_batch_is_ok_in_input_order() {
        let engine = Arc::new(MockEngine::healthy());
        let orchestrator = BatchOrchestrator::new(engine, cache());
        let batch = urls(&["https://a.example", "https://b.example"]);

        let outcome = orchestrator
            .run(&batch, &ExtractionOptions::default())
            .await;

        assert_eq!(outcome.status, ServiceStatus::Ok);
        let order: Vec<_> = outcome.results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(order, vec!["https://a.example", "https://b.example"]);
    }

    #[tokio::test]
    async fn second_identical_batch_is_served_from_cache() {
        let engine = Arc::new(MockEngine::healthy());
        let orchestrator = BatchOrchestrator::new(engine.clone(), cache());
        let batch = urls(&["https://a.example"]);
        let options = ExtractionOptions::default();

        let first = orchestrator.run(&batch, &options).await;
        let second = orchestrator.run(&batch, &options).await;

        assert_eq!(first.results, second.results);
        assert_eq!(second.usage.cached_results, 1);
        assert_eq!(second.usage.api_calls, 0);
        assert_eq!(engine.extract_calls(), 1, "upstream called only once");
    }

    #[tokio::test]
    async fn duplicate_urls_within_a_batch_coalesce_through_the_cache() {
        let engine = Arc::new(MockEngine::healthy());
        let orchestrator = BatchOrchestrator::new(engine.clone(), cache());
        let batch = urls(&["https://a.example", "https://a.example"]);

        let outcome = orchestrator
            .run(&batch, &ExtractionOptions::default())
            .await;

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.usage.cached_results, 1);
        assert_eq!(outcome.usage.api_calls, 1);
        assert_eq!(engine.extract_calls(), 1);
    }

    #[tokio::test]
    async fn different_options_do_not_share_cache_entries() {
        let engine = Arc::new(MockEngine::healthy());
        let orchestrator = BatchOrchestrator::new(engine.clone(), cache());
        let batch = urls(&["https://a.example"]);

        orchestrator
            .run(&batch, &ExtractionOptions::default())
            .await;
        orchestrator
            .run(
                &batch,
                &ExtractionOptions {
                    include_images: true,
                    ..Default::default()
                },
            )
            .await;

        assert_eq!(engine.extract_calls(), 2, "distinct fingerprints");
    }

    #[tokio::test]
    async fn unavailable_probe_touches_nothing() {
        let engine = Arc::new(MockEngine::unavailable());
        let shared_cache = cache();
        let orchestrator = BatchOrchestrator::new(engine.clone(), shared_cache.clone());
        let batch = urls(&["https://a.example", "https://b.example"]);

        let outcome = orchestrator
            .run(&batch, &ExtractionOptions::default())
            .await;

        assert_eq!(outcome.status, ServiceStatus::Unavailable);
        assert_eq!(outcome.failed_urls.len(), 2);
        assert_eq!(engine.extract_calls(), 0, "no upstream interaction");
        assert_eq!(engine.probe_calls(), 1);
        assert!(shared_cache.is_empty(), "no cache interaction");
    }

    #[tokio::test]
    async fn failures_are_never_cached() {
        let engine = Arc::new(MockEngine::failing());
        let shared_cache = cache();
        let orchestrator = BatchOrchestrator::new(engine.clone(), shared_cache.clone());
        let batch = urls(&["https://a.example"]);

        orchestrator
            .run(&batch, &ExtractionOptions::default())
            .await;
        orchestrator
            .run(&batch, &ExtractionOptions::default())
            .await;

        assert!(shared_cache.is_empty());
        assert_eq!(engine.extract_calls(), 2, "failed lookup retried upstream");
    }

    #[tokio::test]
    async fn health_snapshot_reports_probe_and_cache() {
        let engine = Arc::new(MockEngine::healthy());
        let shared_cache = cache();
        let orchestrator = BatchOrchestrator::new(engine, shared_cache.clone());

        orchestrator
            .run(&urls(&["https://a.example"]), &ExtractionOptions::default())
            .await;

        let snapshot = orchestrator.health().await;
        assert_eq!(snapshot.upstream_status, ServiceStatus::Ok);
        assert_eq!(snapshot.cache_entries, 1);
    }
}
