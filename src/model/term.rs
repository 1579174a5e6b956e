use std::fmt;

use crate::types::{PenumbraError, Result};

use super::bnode;

/// `xsd:string`, the implicit datatype of a plain literal.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
/// `rdf:langString`, the implicit datatype of a language-tagged literal.
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
/// `xsd:integer`.
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
/// `xsd:decimal`.
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
/// `xsd:double`.
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
/// `xsd:float`.
pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
/// `xsd:boolean`.
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

/// An RDF literal: lexical form plus either a datatype or a language tag.
///
/// `xsd:string` typed literals are stored as plain literals so that the two
/// spellings of the same term compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    lexical: String,
    datatype: Option<String>,
    language: Option<String>,
}

impl Literal {
    /// Creates a plain (`xsd:string`) literal.
    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    /// Creates a literal with an explicit datatype IRI.
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        Self {
            lexical: lexical.into(),
            datatype: (datatype != XSD_STRING).then_some(datatype),
            language: None,
        }
    }

    /// Creates a language-tagged literal.
    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub(crate) fn from_parts(
        lexical: String,
        datatype: Option<String>,
        language: Option<String>,
    ) -> Self {
        Self {
            lexical,
            datatype,
            language,
        }
    }

    /// Lexical form.
    pub fn lexical(&self) -> &str {
        &self.lexical
    }

    /// Explicit datatype IRI, if one was stored.
    pub fn explicit_datatype(&self) -> Option<&str> {
        self.datatype.as_deref()
    }

    /// Effective datatype IRI.
    pub fn datatype(&self) -> &str {
        match (&self.datatype, &self.language) {
            (Some(dt), _) => dt,
            (None, Some(_)) => RDF_LANG_STRING,
            (None, None) => XSD_STRING,
        }
    }

    /// Language tag, if any.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn validate(&self) -> Result<()> {
        if let Some(tag) = &self.language {
            if !is_language_tag(tag) {
                return Err(malformed(format!("invalid language tag {tag:?}")));
            }
            if self.datatype.as_deref().is_some_and(|dt| dt != RDF_LANG_STRING) {
                return Err(malformed("language-tagged literal with foreign datatype"));
            }
            return Ok(());
        }
        let Some(datatype) = self.datatype.as_deref() else {
            return Ok(());
        };
        validate_iri(datatype)?;
        let lexical = self.lexical.as_str();
        let ok = match datatype {
            RDF_LANG_STRING => {
                return Err(malformed("rdf:langString literal without language tag"))
            }
            XSD_INTEGER => is_integer(lexical),
            XSD_DECIMAL => is_decimal(lexical),
            XSD_DOUBLE | XSD_FLOAT => is_double(lexical),
            XSD_BOOLEAN => matches!(lexical, "true" | "false" | "1" | "0"),
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(malformed(format!(
                "lexical form {lexical:?} is not valid for <{datatype}>"
            )))
        }
    }
}

/// An RDF term as presented to and returned from the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RdfTerm {
    /// Absolute IRI.
    Iri(String),
    /// Blank node with its raw label.
    BlankNode(String),
    /// Literal value.
    Literal(Literal),
    /// Query variable, without the leading `?`.
    Variable(String),
}

impl RdfTerm {
    /// Creates an IRI term.
    pub fn iri(value: impl Into<String>) -> Self {
        RdfTerm::Iri(value.into())
    }

    /// Creates a blank node term.
    pub fn blank(label: impl Into<String>) -> Self {
        RdfTerm::BlankNode(label.into())
    }

    /// Creates a plain literal term.
    pub fn literal(lexical: impl Into<String>) -> Self {
        RdfTerm::Literal(Literal::plain(lexical))
    }

    /// Creates a variable term.
    pub fn variable(name: impl Into<String>) -> Self {
        RdfTerm::Variable(name.into())
    }

    /// Returns true for query variables.
    pub fn is_variable(&self) -> bool {
        matches!(self, RdfTerm::Variable(_))
    }

    /// Checks that the term content is well formed.
    pub fn validate(&self) -> Result<()> {
        match self {
            RdfTerm::Iri(iri) => validate_iri(iri),
            RdfTerm::BlankNode(label) => {
                if label.is_empty() {
                    Err(malformed("empty blank node label"))
                } else {
                    Ok(())
                }
            }
            RdfTerm::Literal(lit) => lit.validate(),
            RdfTerm::Variable(name) => {
                if name.is_empty() {
                    return Err(malformed("empty variable name"));
                }
                if name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    Ok(())
                } else {
                    Err(malformed(format!("invalid variable name {name:?}")))
                }
            }
        }
    }
}

impl From<Literal> for RdfTerm {
    fn from(value: Literal) -> Self {
        RdfTerm::Literal(value)
    }
}

/// N-Triples style rendering, for diagnostics.
impl fmt::Display for RdfTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfTerm::Iri(iri) => write!(f, "<{iri}>"),
            RdfTerm::BlankNode(label) => {
                if bnode::is_safe_label(label) {
                    write!(f, "_:{label}")
                } else {
                    write!(f, "_:{}", bnode::encode_label(label))
                }
            }
            RdfTerm::Literal(lit) => {
                f.write_str("\"")?;
                for ch in lit.lexical.chars() {
                    match ch {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")?;
                if let Some(tag) = &lit.language {
                    write!(f, "@{tag}")
                } else if let Some(dt) = &lit.datatype {
                    write!(f, "^^<{dt}>")
                } else {
                    Ok(())
                }
            }
            RdfTerm::Variable(name) => write!(f, "?{name}"),
        }
    }
}

fn malformed(msg: impl Into<String>) -> PenumbraError {
    PenumbraError::MalformedTerm(msg.into())
}

fn validate_iri(iri: &str) -> Result<()> {
    if iri.is_empty() {
        return Err(malformed("empty IRI"));
    }
    // IRIREF excludes these plus controls and space.
    if let Some(bad) = iri
        .chars()
        .find(|&c| c <= ' ' || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\'))
    {
        return Err(malformed(format!("IRI contains illegal character {bad:?}")));
    }
    Ok(())
}

fn is_language_tag(tag: &str) -> bool {
    let mut parts = tag.split('-');
    let Some(primary) = parts.next() else {
        return false;
    };
    if primary.is_empty() || primary.len() > 8 || !primary.chars().all(|c| c.is_ascii_alphabetic())
    {
        return false;
    }
    parts.all(|sub| {
        !sub.is_empty() && sub.len() <= 8 && sub.chars().all(|c| c.is_ascii_alphanumeric())
    })
}

fn strip_sign(s: &str) -> &str {
    s.strip_prefix(['+', '-']).unwrap_or(s)
}

fn is_integer(s: &str) -> bool {
    let digits = strip_sign(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_decimal(s: &str) -> bool {
    let body = strip_sign(s);
    let (int, frac) = body.split_once('.').unwrap_or((body, ""));
    (!int.is_empty() || !frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

fn is_double(s: &str) -> bool {
    if matches!(s, "INF" | "+INF" | "-INF" | "NaN") {
        return true;
    }
    let body = strip_sign(s);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };
    is_decimal(mantissa) && !mantissa.starts_with(['+', '-']) && exponent.map_or(true, is_integer)
}
