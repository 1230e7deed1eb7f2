//! Streaming decoder for JSON arrays of domain strings.
//!
//! Elements go straight from the parser into the tree builder; the array is
//! never materialized.

use std::fmt;
use std::io::Read;

use serde::de::{self, DeserializeSeed, Deserializer as _, SeqAccess, Visitor};
use serde_json::error::Category;

use crate::error::{IndexError, Result, SourceDataErrorKind};
use crate::index::Index;
use crate::key;
use crate::radix::Builder;

/// Replace `source` with the domains of the JSON array read from `reader`.
///
/// The source is checked before anything is read. The array must be closed
/// and followed only by whitespace; otherwise nothing is published. Returns the
/// number of distinct domains published.
pub fn update_from_json<R: Read>(index: &Index, source: &str, reader: R) -> Result<usize> {
    index.rebuild(source, |builder| {
        decode_domains(builder, source, reader, SourceDataErrorKind::Io)
    })
}

/// Decode a JSON array of strings into `builder`. Read failures of the
/// underlying reader are reported with `io_kind`.
pub(crate) fn decode_domains<R: Read>(
    builder: &mut Builder,
    source: &str,
    reader: R,
    io_kind: SourceDataErrorKind,
) -> Result<()> {
    let mut decoder = serde_json::Deserializer::from_reader(reader);
    (&mut decoder)
        .deserialize_seq(DomainArray { builder })
        .map_err(|e| parsing_error(source, e, io_kind))?;
    decoder.end().map_err(|e| parsing_error(source, e, io_kind))
}

fn parsing_error(source: &str, err: serde_json::Error, io_kind: SourceDataErrorKind) -> IndexError {
    let kind = match err.classify() {
        Category::Io => io_kind,
        _ => SourceDataErrorKind::Decode,
    };
    IndexError::source_data(kind, format!("couldn't parse data for \"{}\": {}", source, err))
}

struct DomainArray<'b> {
    builder: &'b mut Builder,
}

impl<'de> Visitor<'de> for DomainArray<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON array of domain strings")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        let builder = self.builder;
        let mut buf = Vec::new();
        while seq
            .next_element_seed(InsertDomain {
                builder: &mut *builder,
                buf: &mut buf,
            })?
            .is_some()
        {}
        Ok(())
    }
}

/// Inserts one string element without allocating a `String` for it.
struct InsertDomain<'a> {
    builder: &'a mut Builder,
    buf: &'a mut Vec<u8>,
}

impl<'de> DeserializeSeed<'de> for InsertDomain<'_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<(), D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_str(self)
    }
}

impl<'de> Visitor<'de> for InsertDomain<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a domain string")
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<(), E>
    where
        E: de::Error,
    {
        key::encode_into(v, self.buf);
        self.builder.insert(self.buf);
        Ok(())
    }
}
