//! RDF terms, their stored byte form, and id-level triples and patterns.

/// Blank node label escaping.
pub mod bnode;

/// Term byte encoding for the durable store.
pub mod codec;

mod term;
mod triple;

pub use term::{
    Literal, RdfTerm, RDF_LANG_STRING, XSD_BOOLEAN, XSD_DECIMAL, XSD_DOUBLE, XSD_FLOAT,
    XSD_INTEGER, XSD_STRING,
};
pub use triple::{Slot, TermTriple, Triple, TriplePattern};
