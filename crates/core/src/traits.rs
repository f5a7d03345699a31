//! Upstream engine trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{EngineKind, ExtractionOptions, RawExtractPayload, ServiceStatus};

/// A single upstream content-extraction provider.
///
/// Implementations own transport, timeout, and retry policy; callers see
/// either a decoded payload or one classified error per call. No caching
/// happens at this seam.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Engine identifier used in fingerprints and the response envelope.
    fn kind(&self) -> EngineKind;

    /// Issue one extraction call for a non-empty ordered set of URLs.
    async fn extract(
        &self,
        urls: &[String],
        options: &ExtractionOptions,
    ) -> Result<RawExtractPayload>;

    /// Point-in-time availability classification. Never cached or
    /// smoothed; every admission decision re-probes.
    async fn probe(&self) -> ServiceStatus;
}
