#![forbid(unsafe_code)]

//! Bidirectional term dictionary with tiered caching.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::model::codec::{decode_term, encode_term};
use crate::model::RdfTerm;
use crate::storage::durable::DurableTermStore;
use crate::types::{PenumbraError, Result, TermId};

mod cache;

pub use cache::TermCache;

/// Cache capacities for the dictionary; 0 disables a tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DictOptions {
    /// Capacity of the id → term cache.
    pub id_to_term_cache: usize,
    /// Capacity of the term → id cache.
    pub term_to_id_cache: usize,
    /// Capacity of the negative (known absent) cache.
    pub miss_cache: usize,
}

impl Default for DictOptions {
    fn default() -> Self {
        Self {
            id_to_term_cache: 100_000,
            term_to_id_cache: 100_000,
            miss_cache: 10_000,
        }
    }
}

#[derive(Default)]
struct DictMetrics {
    encode_calls: AtomicU64,
    encode_hits: AtomicU64,
    encode_allocations: AtomicU64,
    decode_calls: AtomicU64,
    decode_cache_misses: AtomicU64,
    lookup_calls: AtomicU64,
    miss_cache_hits: AtomicU64,
    durable_reads: AtomicU64,
    durable_finds: AtomicU64,
}

/// Point-in-time copy of the dictionary counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct DictMetricsSnapshot {
    /// Calls to [`TermDictionary::encode`].
    pub encode_calls: u64,
    /// Encodes answered by the term → id cache.
    pub encode_hits: u64,
    /// Encodes that allocated a new identifier.
    pub encode_allocations: u64,
    /// Calls to [`TermDictionary::decode`].
    pub decode_calls: u64,
    /// Decodes that had to read the durable store.
    pub decode_cache_misses: u64,
    /// Calls to [`TermDictionary::lookup`].
    pub lookup_calls: u64,
    /// Lookups answered "absent" by the miss cache.
    pub miss_cache_hits: u64,
    /// Durable `read` calls issued.
    pub durable_reads: u64,
    /// Durable `find` calls issued.
    pub durable_finds: u64,
}

impl DictMetrics {
    fn snapshot(&self) -> DictMetricsSnapshot {
        DictMetricsSnapshot {
            encode_calls: self.encode_calls.load(Ordering::Relaxed),
            encode_hits: self.encode_hits.load(Ordering::Relaxed),
            encode_allocations: self.encode_allocations.load(Ordering::Relaxed),
            decode_calls: self.decode_calls.load(Ordering::Relaxed),
            decode_cache_misses: self.decode_cache_misses.load(Ordering::Relaxed),
            lookup_calls: self.lookup_calls.load(Ordering::Relaxed),
            miss_cache_hits: self.miss_cache_hits.load(Ordering::Relaxed),
            durable_reads: self.durable_reads.load(Ordering::Relaxed),
            durable_finds: self.durable_finds.load(Ordering::Relaxed),
        }
    }

    fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Current occupancy of one cache tier.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheTierStats {
    /// Entries currently cached.
    pub len: usize,
    /// Configured capacity; 0 when the tier is disabled.
    pub capacity: usize,
}

/// Occupancy of all three dictionary caches.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DictCacheStats {
    /// id → term tier.
    pub id_to_term: CacheTierStats,
    /// term → id tier.
    pub term_to_id: CacheTierStats,
    /// Negative lookup tier.
    pub miss: CacheTierStats,
}

/// Maps RDF terms to dense identifiers and back.
///
/// The three caches are independent; only the dictionary methods coordinate
/// them. A successful encode clears the miss-cache entry for its term and
/// adds positive entries, it never invalidates positive entries.
pub struct TermDictionary {
    store: Arc<dyn DurableTermStore>,
    id_to_term: TermCache<TermId, RdfTerm>,
    term_to_id: TermCache<RdfTerm, TermId>,
    misses: TermCache<RdfTerm, ()>,
    opts: DictOptions,
    metrics: DictMetrics,
}

impl TermDictionary {
    /// Opens a dictionary over `store` with empty caches sized by `opts`.
    pub fn open(store: Arc<dyn DurableTermStore>, opts: DictOptions) -> Self {
        Self {
            store,
            id_to_term: TermCache::new(opts.id_to_term_cache),
            term_to_id: TermCache::new(opts.term_to_id_cache),
            misses: TermCache::new(opts.miss_cache),
            opts,
            metrics: DictMetrics::default(),
        }
    }

    /// Cache sizes this dictionary was opened with.
    pub fn options(&self) -> DictOptions {
        self.opts
    }

    /// Durable backend.
    pub fn store(&self) -> &Arc<dyn DurableTermStore> {
        &self.store
    }

    /// Copies the current counters.
    pub fn metrics_snapshot(&self) -> DictMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Lengths and capacities of the three caches.
    pub fn cache_stats(&self) -> DictCacheStats {
        fn tier<K: std::hash::Hash + Eq, V: Clone>(cache: &TermCache<K, V>) -> CacheTierStats {
            CacheTierStats {
                len: cache.len(),
                capacity: cache.capacity(),
            }
        }
        DictCacheStats {
            id_to_term: tier(&self.id_to_term),
            term_to_id: tier(&self.term_to_id),
            miss: tier(&self.misses),
        }
    }

    /// Returns the identifier for `term`, allocating one if the term is new.
    pub fn encode(&mut self, term: &RdfTerm) -> Result<TermId> {
        self.metrics.inc(&self.metrics.encode_calls);
        term.validate()?;
        if let Some(id) = self.term_to_id.get(term) {
            self.metrics.inc(&self.metrics.encode_hits);
            self.misses.remove(term);
            trace!(id = id.0, "dict.encode.hit");
            return Ok(id);
        }
        let bytes = encode_term(term)?;
        self.metrics.inc(&self.metrics.durable_finds);
        let id = match self.store.find(&bytes)? {
            Some(existing) => {
                trace!(id = existing.0, "dict.encode.durable");
                existing
            }
            None => {
                let id = self.store.allocate(&bytes).inspect_err(|err| {
                    if matches!(err, PenumbraError::AllocationExhausted) {
                        warn!(len = bytes.len(), "dict.encode.exhausted");
                    }
                })?;
                self.metrics.inc(&self.metrics.encode_allocations);
                trace!(id = id.0, len = bytes.len(), "dict.encode.allocate");
                id
            }
        };
        self.misses.remove(term);
        self.remember(term.clone(), id);
        Ok(id)
    }

    /// Returns the term stored under `id`.
    pub fn decode(&self, id: TermId) -> Result<RdfTerm> {
        self.metrics.inc(&self.metrics.decode_calls);
        if let Some(term) = self.id_to_term.get(&id) {
            trace!(id = id.0, "dict.decode.hit");
            return Ok(term);
        }
        self.metrics.inc(&self.metrics.decode_cache_misses);
        self.metrics.inc(&self.metrics.durable_reads);
        let bytes = self.store.read(id).inspect_err(|_| {
            trace!(id = id.0, "dict.decode.not_found");
        })?;
        let term = decode_term(&bytes)?;
        trace!(id = id.0, len = bytes.len(), "dict.decode.durable");
        self.id_to_term.insert(id, term.clone());
        Ok(term)
    }

    /// Probes for `term` without allocating.
    pub fn lookup(&self, term: &RdfTerm) -> Result<Option<TermId>> {
        self.metrics.inc(&self.metrics.lookup_calls);
        if let Some(id) = self.term_to_id.get(term) {
            trace!(id = id.0, "dict.lookup.hit");
            return Ok(Some(id));
        }
        if self.misses.get(term).is_some() {
            self.metrics.inc(&self.metrics.miss_cache_hits);
            trace!("dict.lookup.negative");
            return Ok(None);
        }
        self.metrics.inc(&self.metrics.durable_finds);
        match self.store.find(&encode_term(term)?)? {
            Some(id) => {
                trace!(id = id.0, "dict.lookup.durable");
                self.remember(term.clone(), id);
                Ok(Some(id))
            }
            None => {
                trace!("dict.lookup.miss");
                self.misses.insert(term.clone(), ());
                Ok(None)
            }
        }
    }

    /// Decodes three identifiers at once.
    pub fn decode_all(&self, ids: [TermId; 3]) -> Result<[RdfTerm; 3]> {
        let [s, p, o] = ids;
        Ok([self.decode(s)?, self.decode(p)?, self.decode(o)?])
    }

    fn remember(&self, term: RdfTerm, id: TermId) {
        self.id_to_term.insert(id, term.clone());
        self.term_to_id.insert(term, id);
    }
}
