//! Penumbra: term dictionary and triple indexing core for an RDF graph store.
//!
//! Terms are interned into dense [`TermId`]s by a cached
//! [`storage::TermDictionary`]; triples are kept by identifier in three
//! parallel indexes whose buckets switch between array and hash form as they
//! grow. [`storage::GraphStore`] ties the two together and answers
//! subject/predicate/object patterns.

#![warn(missing_docs)]

pub mod config;
pub mod model;
pub mod storage;
pub mod types;

pub use model::{Literal, RdfTerm, Slot, TermTriple, Triple, TriplePattern};
pub use storage::{GraphStore, SharedGraph, StoreOptions};
pub use types::{PenumbraError, Position, Result, TermId};
