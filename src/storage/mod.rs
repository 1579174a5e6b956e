//! Term dictionary, triple indexes and the graph store built on them.

/// Term dictionary and its cache tiers.
///
/// Maps RDF terms to dense identifiers through bounded LRU caches in front of
/// a durable term store.
pub mod catalog;

/// Durable term store interface and the in-memory implementation.
pub mod durable;

/// Hybrid array/hash bunches and the per-position indexes built from them.
pub mod index;

mod graph;
mod metrics;
mod options;
mod shared;

/// Main store interface.
pub use graph::{GraphStats, GraphStore, IdMatches, Matches};

/// Detached single-writer/multi-reader access.
pub use shared::{SharedCursor, SharedGraph, DEFAULT_CURSOR_BATCH};

/// Metrics collection.
pub use metrics::{default_metrics, CounterMetrics, NoopMetrics, StoreMetrics};

/// Store configuration options.
pub use options::StoreOptions;

pub use catalog::{DictOptions, TermDictionary};
pub use durable::{DurableTermStore, MemTermStore};
