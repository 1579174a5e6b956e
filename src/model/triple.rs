use crate::types::{Position, TermId};

use super::term::RdfTerm;

/// A stored statement, addressed by term identifiers.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Triple {
    /// Subject identifier.
    pub subject: TermId,
    /// Predicate identifier.
    pub predicate: TermId,
    /// Object identifier.
    pub object: TermId,
}

impl Triple {
    /// Creates a triple from its three identifiers.
    pub const fn new(subject: TermId, predicate: TermId, object: TermId) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Returns the identifier at `position`.
    pub const fn get(&self, position: Position) -> TermId {
        match position {
            Position::Subject => self.subject,
            Position::Predicate => self.predicate,
            Position::Object => self.object,
        }
    }
}

/// A statement decoded back into terms at the query boundary.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TermTriple {
    /// Subject term.
    pub subject: RdfTerm,
    /// Predicate term.
    pub predicate: RdfTerm,
    /// Object term.
    pub object: RdfTerm,
}

impl TermTriple {
    /// Creates a decoded triple.
    pub fn new(subject: RdfTerm, predicate: RdfTerm, object: RdfTerm) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

/// One position of a term-level pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Slot {
    /// Matches any term.
    Any,
    /// Matches exactly this term.
    Bound(RdfTerm),
}

impl Slot {
    /// Shorthand for a bound IRI slot.
    pub fn iri(value: impl Into<String>) -> Self {
        Slot::Bound(RdfTerm::iri(value))
    }

    /// Returns the bound term, if any.
    pub fn term(&self) -> Option<&RdfTerm> {
        match self {
            Slot::Any => None,
            Slot::Bound(term) => Some(term),
        }
    }
}

impl From<RdfTerm> for Slot {
    fn from(value: RdfTerm) -> Self {
        Slot::Bound(value)
    }
}

impl From<Option<RdfTerm>> for Slot {
    fn from(value: Option<RdfTerm>) -> Self {
        value.map_or(Slot::Any, Slot::Bound)
    }
}

/// Identifier-level pattern; `None` is a wildcard.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TriplePattern {
    /// Bound subject, if any.
    pub subject: Option<TermId>,
    /// Bound predicate, if any.
    pub predicate: Option<TermId>,
    /// Bound object, if any.
    pub object: Option<TermId>,
}

impl TriplePattern {
    /// Creates a pattern from optional bindings.
    pub const fn new(
        subject: Option<TermId>,
        predicate: Option<TermId>,
        object: Option<TermId>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Returns the binding at `position`.
    pub const fn get(&self, position: Position) -> Option<TermId> {
        match position {
            Position::Subject => self.subject,
            Position::Predicate => self.predicate,
            Position::Object => self.object,
        }
    }

    /// Number of bound positions.
    pub fn bound_count(&self) -> usize {
        Position::ALL
            .iter()
            .filter(|p| self.get(**p).is_some())
            .count()
    }

    /// Returns the fully bound triple when every position is bound.
    pub fn as_triple(&self) -> Option<Triple> {
        Some(Triple::new(self.subject?, self.predicate?, self.object?))
    }

    /// Returns true when `triple` agrees with every bound position.
    pub fn matches(&self, triple: &Triple) -> bool {
        Position::ALL
            .iter()
            .all(|&p| self.get(p).map_or(true, |id| triple.get(p) == id))
    }
}
