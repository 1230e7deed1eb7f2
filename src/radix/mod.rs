//! Persistent radix tree over byte keys.
//!
//! A [`Tree`] is immutable once built. New versions are produced through a
//! [`Builder`], which copies nodes shared with its base before touching them,
//! so the base tree and every reader holding it are never affected.
//!
//! ## Example
//!
//! ```
//! use deacheck::radix::Tree;
//!
//! let empty = Tree::new();
//! let mut builder = empty.builder();
//! builder.insert(b"moc.elpmaxe");
//! let tree = builder.commit();
//!
//! assert!(tree.contains(b"moc.elpmaxe"));
//! assert!(!empty.contains(b"moc.elpmaxe"));
//! ```

mod builder;

use std::sync::Arc;

pub use builder::Builder;

/// Tree node. The key of a node is the concatenation of the prefixes on the
/// path from the root; `leaf` marks that key as a member.
#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    pub(crate) prefix: Box<[u8]>,
    pub(crate) leaf: bool,
    /// Sorted by label
    pub(crate) edges: Vec<Edge>,
}

/// Child link, `label` is the first byte of the child's prefix.
#[derive(Debug, Clone)]
pub(crate) struct Edge {
    pub(crate) label: u8,
    pub(crate) node: Arc<Node>,
}

impl Node {
    pub(crate) fn leaf(prefix: &[u8]) -> Self {
        Self {
            prefix: prefix.into(),
            leaf: true,
            edges: Vec::new(),
        }
    }

    #[inline]
    fn child(&self, label: u8) -> Option<&Arc<Node>> {
        self.edges
            .binary_search_by_key(&label, |e| e.label)
            .ok()
            .map(|i| &self.edges[i].node)
    }
}

/// Immutable set of byte keys with structural sharing between versions.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    root: Arc<Node>,
    size: usize,
}

impl Tree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys in the tree
    pub fn len(&self) -> usize {
        self.size
    }

    /// Check if the tree is empty
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Open a builder seeded with this tree's keys. The tree itself is left
    /// untouched whatever the builder does.
    pub fn builder(&self) -> Builder {
        Builder::new(Arc::clone(&self.root), self.size)
    }

    /// Exact-match lookup.
    pub fn contains(&self, key: &[u8]) -> bool {
        let mut node: &Node = &self.root;
        let mut search = key;
        loop {
            let Some(&label) = search.first() else {
                return node.leaf;
            };
            let Some(child) = node.child(label) else {
                return false;
            };
            if !search.starts_with(&child.prefix) {
                return false;
            }
            search = &search[child.prefix.len()..];
            node = &**child;
        }
    }

    /// Iterate over keys in ascending byte order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: vec![(&*self.root, 0)],
            key: Vec::new(),
        }
    }
}

impl<'a> IntoIterator for &'a Tree {
    type Item = Vec<u8>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Pre-order walk yielding owned keys. A node's own key is emitted before its
/// children, and children are visited by ascending label, which gives
/// lexicographic order.
pub struct Iter<'a> {
    /// (node, length of the key before the node's prefix)
    stack: Vec<(&'a Node, usize)>,
    key: Vec<u8>,
}

impl Iterator for Iter<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        while let Some((node, base)) = self.stack.pop() {
            self.key.truncate(base);
            self.key.extend_from_slice(&node.prefix);
            let depth = self.key.len();
            self.stack
                .extend(node.edges.iter().rev().map(|e| (&*e.node, depth)));
            if node.leaf {
                return Some(self.key.clone());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(keys: &[&[u8]]) -> Tree {
        let mut builder = Tree::new().builder();
        for key in keys {
            builder.insert(key);
        }
        builder.commit()
    }

    #[test]
    fn test_empty_tree() {
        let tree = Tree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert!(!tree.contains(b"moc.elgoog"));
        assert!(!tree.contains(b""));
        assert_eq!(tree.iter().count(), 0);
    }

    #[test]
    fn test_exact_match_only() {
        let tree = build(&[b"moc.elgoog"]);
        assert!(tree.contains(b"moc.elgoog"));
        assert!(!tree.contains(b"moc.elgoo"));
        assert!(!tree.contains(b"moc.elgoogx"));
        assert!(!tree.contains(b"moc."));
        assert!(!tree.contains(b""));
    }

    #[test]
    fn test_prefix_keys_coexist() {
        // "moc" is a prefix of the other keys and must split the shared node
        let tree = build(&[b"moc.elgoog", b"moc", b"moc.koobecaf", b"moc.elgoog.www"]);
        assert_eq!(tree.len(), 4);
        assert!(tree.contains(b"moc"));
        assert!(tree.contains(b"moc.elgoog"));
        assert!(tree.contains(b"moc.elgoog.www"));
        assert!(tree.contains(b"moc.koobecaf"));
        assert!(!tree.contains(b"moc."));
        assert!(!tree.contains(b"moc.elgoog."));
    }

    #[test]
    fn test_empty_key() {
        let tree = build(&[b""]);
        assert_eq!(tree.len(), 1);
        assert!(tree.contains(b""));
        assert!(!tree.contains(b"a"));
    }

    #[test]
    fn test_iter_is_sorted() {
        let keys: [&[u8]; 9] = [
            b"zz", b"a", b"moc.elgoog", b"moc", b"ab", b"moc.elgoo", b"", b"\xff", b"moc.b",
        ];
        let tree = build(&keys);
        let mut keys = keys.to_vec();
        keys.sort();
        let collected: Vec<Vec<u8>> = tree.iter().collect();
        let expected: Vec<Vec<u8>> = keys.iter().map(|k| k.to_vec()).collect();
        assert_eq!(collected, expected);
    }

    #[test]
    fn test_into_iterator_for_ref() {
        let tree = build(&[b"b", b"a"]);
        let mut seen = Vec::new();
        for key in &tree {
            seen.push(key);
        }
        assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec()]);
    }
}
