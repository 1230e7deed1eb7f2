//! Loaders that feed source lists into an [`Index`].
//!
//! Every loader goes through [`Index`]'s all-or-nothing replace: a list that
//! fails to download or decode is never published, and the source keeps
//! serving its previous list.

#[cfg(feature = "http")]
pub mod auto;
pub mod file;
#[cfg(feature = "http")]
pub mod http;
pub mod json;

use std::collections::HashMap;

use crate::error::{IndexError, Result};
use crate::index::Index;
use crate::key;

#[cfg(feature = "async")]
pub use auto::spawn_refresh;
#[cfg(feature = "http")]
pub use auto::{AutoLoader, DEFAULT_UPDATE_INTERVAL};
pub use file::{update_from_file, FileLoader};
#[cfg(feature = "http")]
pub use http::{HttpLoader, DEFAULT_HTTP_TIMEOUT};
pub use json::update_from_json;

/// Trait for loading a source's list into an index
pub trait SourceLoader: Send + Sync {
    /// Load the list for `source` and publish it.
    /// Returns the number of distinct domains published.
    fn load(&self, index: &Index, source: &str) -> Result<usize>;
}

/// In-memory loader for testing and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    lists: HashMap<String, Vec<String>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source<I, S>(&mut self, source: &str, domains: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lists
            .insert(source.to_string(), domains.into_iter().map(Into::into).collect());
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, index: &Index, source: &str) -> Result<usize> {
        let domains = self.lists.get(source).ok_or_else(|| {
            IndexError::ConfigError(format!("no list configured for source \"{}\"", source))
        })?;

        index.rebuild(source, |builder| {
            let mut buf = Vec::new();
            for domain in domains {
                key::encode_into(domain, &mut buf);
                builder.insert(&buf);
            }
            Ok(())
        })
    }
}
