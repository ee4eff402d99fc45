use crate::db::Value;

/// Reference to a slab-allocated tree node.
pub type NodeRef = usize;

/// Single (key, identifier) slot. Leaves hold entries; internal nodes
/// reuse the same shape as separators, the identifier disambiguating
/// equal keys so routing stays deterministic.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Entry {
    pub key: Value,
    pub id: String,
}

impl Entry {
    pub fn new(key: Value, id: &str) -> Entry {
        Entry {
            key,
            id: id.to_string(),
        }
    }
}

/// Tree node, slab-allocated and referenced by [NodeRef]. Freed slots
/// are parked as `Free` and recycled.
pub enum Node {
    Internal {
        seps: Vec<Entry>,
        children: Vec<NodeRef>,
    },
    Leaf {
        entries: Vec<Entry>,
        next: Option<NodeRef>,
        prev: Option<NodeRef>,
    },
    Free,
}

impl Node {
    pub fn new_leaf() -> Node {
        Node::Leaf {
            entries: vec![],
            next: None,
            prev: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Number of keys held, separators for internal nodes, entries for
    /// leaves.
    pub fn n_keys(&self) -> usize {
        match self {
            Node::Internal { seps, .. } => seps.len(),
            Node::Leaf { entries, .. } => entries.len(),
            Node::Free => 0,
        }
    }
}
