//! Membership index over named sources.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{IndexError, Result, SourceDataErrorKind};
use crate::key;
use crate::radix::{Builder, Tree};
use crate::slot::SourceSlot;

/// Index holds domain lists from a fixed set of sources.
///
/// Each source is served from its own [`SourceSlot`]. Lookups never lock;
/// replacing a source builds a fresh tree off to the side and publishes it
/// with one atomic swap, so readers see either the old list or the new one.
#[derive(Debug)]
pub struct Index {
    // Built once, never resized. Only the slots' contents change.
    slots: HashMap<Box<str>, SourceSlot>,
}

impl Index {
    /// Create an index with the given sources, each starting empty.
    ///
    /// Duplicate names collapse into one source. An empty set of names is a
    /// configuration error.
    pub fn new<I, S>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots: HashMap<Box<str>, SourceSlot> = sources
            .into_iter()
            .map(|name| (name.into().into_boxed_str(), SourceSlot::new()))
            .collect();

        if slots.is_empty() {
            return Err(IndexError::ConfigError(
                "at least one source must be declared".to_string(),
            ));
        }

        Ok(Self { slots })
    }

    /// Check if `domain` is listed in `source`.
    ///
    /// Undeclared sources list nothing. The domain is compared byte for byte
    /// with the listed names.
    pub fn has_domain(&self, source: &str, domain: &str) -> bool {
        match self.slots.get(source) {
            Some(slot) => slot.load().contains(&key::encode(domain)),
            None => false,
        }
    }

    /// Replace the whole list of `source` with the given domains.
    ///
    /// The sequence is consumed into a private tree which is published only
    /// after the last element. If the sequence yields an error, nothing is
    /// published and the current list keeps serving. An [`IndexError`] from
    /// the sequence is returned as is; any other error is reported as
    /// [`IndexError::SourceData`].
    pub fn replace_from_strings<I, S, E>(&self, source: &str, domains: I) -> Result<()>
    where
        I: IntoIterator<Item = std::result::Result<S, E>>,
        S: AsRef<str>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.rebuild(source, |builder| {
            let mut buf = Vec::new();
            for domain in domains {
                let domain = domain.map_err(|e| sequence_error(source, e.into()))?;
                key::encode_into(domain.as_ref(), &mut buf);
                builder.insert(&buf);
            }
            Ok(())
        })
        .map(|_| ())
    }

    /// Replace the list of `source` from a sequence that cannot fail.
    pub fn replace_from_iter<I, S>(&self, source: &str, domains: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.replace_from_strings(source, domains.into_iter().map(Ok::<S, IndexError>))
    }

    /// Build a new version of `source` from scratch and publish it if `fill`
    /// succeeds. Returns the number of distinct entries published.
    pub(crate) fn rebuild<F>(&self, source: &str, fill: F) -> Result<usize>
    where
        F: FnOnce(&mut Builder) -> Result<()>,
    {
        let slot = self.slot(source)?;

        let mut builder = Tree::new().builder();
        fill(&mut builder)?;
        let tree = builder.commit();
        let len = tree.len();

        slot.publish(tree);
        Ok(len)
    }

    fn slot(&self, source: &str) -> Result<&SourceSlot> {
        self.slots
            .get(source)
            .ok_or_else(|| IndexError::UnknownSource(source.to_string()))
    }

    /// Check if `source` was declared
    pub fn contains_source(&self, source: &str) -> bool {
        self.slots.contains_key(source)
    }

    /// Declared source names, in no particular order
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(|name| &**name)
    }

    /// Current version of `source`, kept alive for as long as it is held
    pub fn snapshot(&self, source: &str) -> Option<Arc<Tree>> {
        self.slots.get(source).map(SourceSlot::snapshot)
    }

    /// Number of entries currently published for `source`
    pub fn len(&self, source: &str) -> Option<usize> {
        self.slots.get(source).map(|slot| slot.load().len())
    }

    /// Domains currently published for `source`, ordered by key (grouped by
    /// shared suffix).
    pub fn domains(&self, source: &str) -> Option<Vec<String>> {
        let tree = self.snapshot(source)?;
        Some(
            tree.iter()
                .map(|k| String::from_utf8_lossy(&key::decode(&k)).into_owned())
                .collect(),
        )
    }
}

fn sequence_error(source: &str, err: Box<dyn std::error::Error + Send + Sync>) -> IndexError {
    let err = match err.downcast::<IndexError>() {
        Ok(err) => return *err,
        Err(err) => err,
    };
    let kind = if err.is::<std::io::Error>() {
        SourceDataErrorKind::Io
    } else {
        SourceDataErrorKind::Decode
    };
    IndexError::source_data(kind, format!("couldn't read data for \"{}\": {}", source, err))
}
