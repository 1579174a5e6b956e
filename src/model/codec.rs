//! Byte encoding of terms as handed to the durable term store.
//!
//! Layout: a tag byte, then u32 big-endian length-prefixed UTF-8 fields.
//! Literals insert a flags byte after the tag (bit 0 datatype, bit 1
//! language) and write lexical form, datatype and language in that order.

use crate::types::{PenumbraError, Result};

use super::term::{Literal, RdfTerm};

const TAG_IRI: u8 = 1;
const TAG_BLANK: u8 = 2;
const TAG_LITERAL: u8 = 3;
const TAG_VARIABLE: u8 = 4;

const FLAG_DATATYPE: u8 = 0b01;
const FLAG_LANGUAGE: u8 = 0b10;

/// Encodes `term` into its stored byte form.
///
/// Fails with `MalformedTerm` when a field does not fit the u32 length prefix.
pub fn encode_term(term: &RdfTerm) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(term_size_hint(term));
    match term {
        RdfTerm::Iri(iri) => {
            out.push(TAG_IRI);
            put_str(&mut out, iri)?;
        }
        RdfTerm::BlankNode(label) => {
            out.push(TAG_BLANK);
            put_str(&mut out, label)?;
        }
        RdfTerm::Literal(lit) => {
            out.push(TAG_LITERAL);
            let mut flags = 0;
            if lit.explicit_datatype().is_some() {
                flags |= FLAG_DATATYPE;
            }
            if lit.language().is_some() {
                flags |= FLAG_LANGUAGE;
            }
            out.push(flags);
            put_str(&mut out, lit.lexical())?;
            if let Some(dt) = lit.explicit_datatype() {
                put_str(&mut out, dt)?;
            }
            if let Some(lang) = lit.language() {
                put_str(&mut out, lang)?;
            }
        }
        RdfTerm::Variable(name) => {
            out.push(TAG_VARIABLE);
            put_str(&mut out, name)?;
        }
    }
    Ok(out)
}

/// Decodes bytes produced by [`encode_term`].
pub fn decode_term(src: &[u8]) -> Result<RdfTerm> {
    let (&tag, rest) = src
        .split_first()
        .ok_or(PenumbraError::Corruption("term payload empty"))?;
    let mut reader = Reader { buf: rest };
    let term = match tag {
        TAG_IRI => RdfTerm::Iri(reader.string()?),
        TAG_BLANK => RdfTerm::BlankNode(reader.string()?),
        TAG_VARIABLE => RdfTerm::Variable(reader.string()?),
        TAG_LITERAL => {
            let flags = reader.byte()?;
            if flags & !(FLAG_DATATYPE | FLAG_LANGUAGE) != 0 {
                return Err(PenumbraError::Corruption("unknown literal flags"));
            }
            let lexical = reader.string()?;
            let datatype = if flags & FLAG_DATATYPE != 0 {
                Some(reader.string()?)
            } else {
                None
            };
            let language = if flags & FLAG_LANGUAGE != 0 {
                Some(reader.string()?)
            } else {
                None
            };
            RdfTerm::Literal(Literal::from_parts(lexical, datatype, language))
        }
        _ => return Err(PenumbraError::Corruption("unknown term tag")),
    };
    if !reader.buf.is_empty() {
        return Err(PenumbraError::Corruption("trailing bytes after term"));
    }
    Ok(term)
}

fn term_size_hint(term: &RdfTerm) -> usize {
    match term {
        RdfTerm::Iri(s) | RdfTerm::BlankNode(s) | RdfTerm::Variable(s) => 1 + 4 + s.len(),
        RdfTerm::Literal(lit) => {
            2 + 4
                + lit.lexical().len()
                + lit.explicit_datatype().map_or(0, |d| 4 + d.len())
                + lit.language().map_or(0, |l| 4 + l.len())
        }
    }
}

fn put_str(out: &mut Vec<u8>, s: &str) -> Result<()> {
    let len = field_len(s.len())?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn field_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        PenumbraError::MalformedTerm(format!("term field of {len} bytes exceeds u32 length"))
    })
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8> {
        let (&b, rest) = self
            .buf
            .split_first()
            .ok_or(PenumbraError::Corruption("term payload truncated"))?;
        self.buf = rest;
        Ok(b)
    }

    fn string(&mut self) -> Result<String> {
        if self.buf.len() < 4 {
            return Err(PenumbraError::Corruption("term field length truncated"));
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&self.buf[..4]);
        let len = u32::from_be_bytes(len_bytes) as usize;
        let body = &self.buf[4..];
        if body.len() < len {
            return Err(PenumbraError::Corruption("term field truncated"));
        }
        let value = std::str::from_utf8(&body[..len])
            .map_err(|_| PenumbraError::Corruption("term field not valid UTF-8"))?
            .to_owned();
        self.buf = &body[len..];
        Ok(value)
    }
}
