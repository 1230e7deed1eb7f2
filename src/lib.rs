//! deacheck - lock-free membership index for bulk-refreshed domain lists
//!
//! This library answers "is this domain listed by source S?" for a fixed set
//! of named sources (disposable email domains, wildcard-DNS domains, ...):
//! - Exact, byte-for-byte membership lookups that never lock
//! - Whole-list replacement published with a single atomic swap
//! - Failed or partial updates never reach readers
//! - Loaders for JSON arrays from readers, files and URLs, with an on-disk cache
//!
//! # Example
//!
//! ```rust
//! use deacheck::Index;
//!
//! let index = Index::new(["dea"]).unwrap();
//! assert!(!index.has_domain("dea", "example.com"));
//!
//! index.replace_from_iter("dea", ["example.com"]).unwrap();
//! assert!(index.has_domain("dea", "example.com"));
//!
//! index.replace_from_iter("dea", ["redsift.io"]).unwrap();
//! assert!(!index.has_domain("dea", "example.com"));
//! assert!(index.has_domain("dea", "redsift.io"));
//! ```
//!
//! # Loading JSON
//!
//! ```rust
//! use deacheck::{update_from_json, Index};
//!
//! let index = Index::new(["dea", "wildcard"]).unwrap();
//! let body = r#"["mailinator.com", "sharklasers.com"]"#;
//! let count = update_from_json(&index, "dea", body.as_bytes()).unwrap();
//! assert_eq!(count, 2);
//! ```
//!
//! # Keys
//!
//! Domains are stored reversed (`example.com` becomes `moc.elpmaxe`), so names
//! sharing a suffix are neighbours in the tree. No normalization is applied;
//! look names up in the same form the list uses.

pub mod config;
pub mod error;
pub mod index;
pub mod key;
pub mod loader;
pub mod radix;
pub mod slot;

// Re-export commonly used items
pub use config::{IndexConfig, SourceConfig};
pub use error::{IndexError, Result, SourceDataErrorKind};
pub use index::Index;
pub use radix::{Builder, Tree};
pub use slot::SourceSlot;

// Re-export loader types
#[cfg(feature = "async")]
pub use loader::spawn_refresh;
pub use loader::{update_from_file, update_from_json, FileLoader, MemoryLoader, SourceLoader};
#[cfg(feature = "http")]
pub use loader::{AutoLoader, HttpLoader, DEFAULT_HTTP_TIMEOUT, DEFAULT_UPDATE_INTERVAL};
