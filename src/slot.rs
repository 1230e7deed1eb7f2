//! Atomically swappable reference to a source's current tree.

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};

use crate::radix::Tree;

/// Holds the published version of one source.
///
/// Readers take a snapshot with a single atomic load; the writer replaces the
/// version with a single atomic swap. A tree reachable from a slot is never
/// modified, so a snapshot stays valid for as long as it is held, even after
/// the slot has moved on.
#[derive(Debug)]
pub struct SourceSlot {
    current: ArcSwap<Tree>,
}

impl SourceSlot {
    /// Create a slot holding an empty tree
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Tree::new()),
        }
    }

    /// Cheap read guard for the hot path. Hold it only briefly.
    #[inline]
    pub fn load(&self) -> Guard<Arc<Tree>> {
        self.current.load()
    }

    /// Owned reference to the current version
    pub fn snapshot(&self) -> Arc<Tree> {
        self.current.load_full()
    }

    /// Make `tree` the current version, returning the one it replaced.
    /// Concurrent publishers are not serialized: the last swap wins.
    pub fn publish(&self, tree: Tree) -> Arc<Tree> {
        self.current.swap(Arc::new(tree))
    }
}

impl Default for SourceSlot {
    fn default() -> Self {
        Self::new()
    }
}
