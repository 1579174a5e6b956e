//! Identifier newtypes and the crate-wide error type.

use std::fmt;

/// Dense identifier assigned to an RDF term by the durable term store.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TermId(pub u64);

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TermId {
    fn from(value: u64) -> Self {
        TermId(value)
    }
}

impl From<TermId> for u64 {
    fn from(value: TermId) -> Self {
        value.0
    }
}

/// Coordinate of a triple that an index or bunch is keyed on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Position {
    /// Subject coordinate.
    Subject,
    /// Predicate coordinate.
    Predicate,
    /// Object coordinate.
    Object,
}

impl Position {
    /// All positions in subject, predicate, object order.
    pub const ALL: [Position; 3] = [Position::Subject, Position::Predicate, Position::Object];

    /// Short lowercase name used in log events and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Position::Subject => "subject",
            Position::Predicate => "predicate",
            Position::Object => "object",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the dictionary, the indexes and the graph store.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PenumbraError {
    /// An identifier was never allocated by the durable store.
    #[error("not found")]
    NotFound,
    /// A term failed well-formedness checks and was not stored.
    #[error("malformed term: {0}")]
    MalformedTerm(String),
    /// The durable store ran out of identifiers.
    #[error("term identifier space exhausted")]
    AllocationExhausted,
    /// An iteration observed a structural change to the store.
    #[error("store modified during iteration")]
    ConcurrentModification,
    /// The three indexes disagree about a triple.
    #[error("inconsistent index state: {0}")]
    InconsistentIndexState(&'static str),
    /// Stored term bytes could not be decoded.
    #[error("corruption: {0}")]
    Corruption(&'static str),
    /// The store rejects mutation after identifier exhaustion.
    #[error("store is read-only")]
    ReadOnly,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PenumbraError>;
