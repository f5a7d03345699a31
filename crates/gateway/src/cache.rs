//! TTL result cache with bounded capacity.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use exgate_core::{ExtractionResult, Fingerprint};

/// Cached payload plus its absolute expiry.
///
/// Created only from a successful upstream response; read-only after
/// creation; destroyed on lazy expiry or capacity eviction.
#[derive(Debug, Clone)]
struct CacheEntry {
    results: Vec<ExtractionResult>,
    expires_at: Instant,
}

/// Key map plus ordered expiry index.
///
/// Both structures live under one mutex: lookups and inserts are atomic
/// per fingerprint, and capacity eviction is serialized so the store
/// never exceeds capacity.
#[derive(Default)]
struct CacheInner {
    entries: HashMap<Fingerprint, CacheEntry>,
    expiry: BTreeSet<(Instant, Fingerprint)>,
}

/// In-memory TTL store mapping request fingerprints to result sets.
///
/// Expiry is lazy: stale entries are dropped when a lookup touches them,
/// there is no background sweep. When an insert pushes the store past
/// capacity, the entry with the earliest expiry is evicted -- expiry
/// order, not recency order.
pub struct ResultCache {
    capacity: usize,
    default_ttl: Duration,
    inner: Mutex<CacheInner>,
}

impl ResultCache {
    /// Create a cache bounded to `capacity` entries.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            capacity,
            default_ttl,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Return the cached payload if present and unexpired.
    ///
    /// A stale entry is removed on the way out and reported as absent.
    /// Absence is a normal, silent outcome.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<Vec<ExtractionResult>> {
        let mut inner = self.inner.lock().expect("cache lock");
        let now = Instant::now();

        let expires_at = inner.entries.get(fingerprint).map(|e| e.expires_at)?;
        if expires_at > now {
            tracing::debug!(url = fingerprint.url(), "Cache hit");
            return inner.entries.get(fingerprint).map(|e| e.results.clone());
        }

        tracing::debug!(url = fingerprint.url(), "Cache entry expired");
        inner.entries.remove(fingerprint);
        inner.expiry.remove(&(expires_at, fingerprint.clone()));
        None
    }

    /// Store a result set under the default TTL.
    pub fn insert(&self, fingerprint: Fingerprint, results: Vec<ExtractionResult>) {
        self.insert_with_ttl(fingerprint, results, self.default_ttl);
    }

    /// Store a result set expiring at `now + ttl`, overwriting any
    /// existing entry for the fingerprint. If the store then exceeds
    /// capacity, the entry with the earliest expiry is evicted.
    pub fn insert_with_ttl(
        &self,
        fingerprint: Fingerprint,
        results: Vec<ExtractionResult>,
        ttl: Duration,
    ) {
        let mut inner = self.inner.lock().expect("cache lock");
        let expires_at = Instant::now() + ttl;

        let previous = inner.entries.insert(
            fingerprint.clone(),
            CacheEntry {
                results,
                expires_at,
            },
        );
        if let Some(old) = previous {
            inner.expiry.remove(&(old.expires_at, fingerprint.clone()));
        }
        inner.expiry.insert((expires_at, fingerprint));

        if inner.entries.len() > self.capacity {
            if let Some((evict_at, victim)) = inner.expiry.iter().next().cloned() {
                tracing::debug!(url = victim.url(), "Cache full, evicting earliest expiry");
                inner.entries.remove(&victim);
                inner.expiry.remove(&(evict_at, victim));
            }
        }
    }

    /// Number of entries currently stored (stale entries included until
    /// a lookup touches them).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
