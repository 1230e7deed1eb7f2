use std::sync::Arc;

use super::{Edge, Node, Tree};

/// Private mutation scope over a copy-on-write tree.
///
/// Nodes still shared with the base tree are cloned on first write
/// (`Arc::make_mut`); nodes created by this builder are uniquely owned and
/// modified in place. [`commit`](Builder::commit) consumes the builder.
#[derive(Debug)]
pub struct Builder {
    root: Arc<Node>,
    size: usize,
}

impl Builder {
    pub(super) fn new(root: Arc<Node>, size: usize) -> Self {
        Self { root, size }
    }

    /// Insert a key. Returns `false` if it was already present.
    pub fn insert(&mut self, key: &[u8]) -> bool {
        let added = insert(&mut self.root, key);
        if added {
            self.size += 1;
        }
        added
    }

    /// Number of keys inserted so far, including those of the base tree
    pub fn len(&self) -> usize {
        self.size
    }

    /// Check if the builder holds no keys
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Freeze into an immutable tree
    pub fn commit(self) -> Tree {
        Tree {
            root: self.root,
            size: self.size,
        }
    }
}

fn insert(node: &mut Arc<Node>, search: &[u8]) -> bool {
    let node = Arc::make_mut(node);

    let Some(&label) = search.first() else {
        let added = !node.leaf;
        node.leaf = true;
        return added;
    };

    let pos = match node.edges.binary_search_by_key(&label, |e| e.label) {
        Ok(pos) => pos,
        Err(pos) => {
            node.edges.insert(
                pos,
                Edge {
                    label,
                    node: Arc::new(Node::leaf(search)),
                },
            );
            return true;
        }
    };

    let child_prefix = &node.edges[pos].node.prefix;
    let common = common_prefix_len(search, child_prefix);
    if common == child_prefix.len() {
        return insert(&mut node.edges[pos].node, &search[common..]);
    }

    // The key diverges inside the child's prefix: put a split node in its place.
    // `common` is at least 1 since the edge label matched.
    let Edge {
        node: mut child, ..
    } = node.edges.remove(pos);
    let rest: Box<[u8]> = child.prefix[common..].into();
    let child_label = rest[0];
    Arc::make_mut(&mut child).prefix = rest;

    let mut split = Node {
        prefix: search[..common].into(),
        leaf: common == search.len(),
        edges: Vec::with_capacity(2),
    };
    split.edges.push(Edge {
        label: child_label,
        node: child,
    });
    if let Some(&new_label) = search.get(common) {
        let edge = Edge {
            label: new_label,
            node: Arc::new(Node::leaf(&search[common..])),
        };
        if new_label < child_label {
            split.edges.insert(0, edge);
        } else {
            split.edges.push(edge);
        }
    }

    node.edges.insert(
        pos,
        Edge {
            label,
            node: Arc::new(split),
        },
    );
    true
}

#[inline]
fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
