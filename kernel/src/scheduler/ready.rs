//! Ready set of the simple scheduler
//!
//! Two interchangeable representations of one priority ordering:
//!
//! - `Chain`: doubly linked chain, O(n) ordered insert, O(1) extract
//! - `Tree`: ordered tree keyed by priority and an insertion sequence,
//!   O(log n) both ways
//!
//! The representation is fixed per instance. A node's `NodeLink` records
//! which one it is linked into and, for the tree, under which key.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::collections::Chain;
use crate::error::FatalSource;
use crate::priority::{Priority, PriorityKey};
use crate::thread::ThreadId;

/// Representation selected in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadySetKind {
    Chain,
    Tree,
}

/// Position of a ready node in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TreeKey {
    priority: Priority,
    sequence: i64,
}

/// Link of a node into the ready set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLink {
    Off,
    Chain,
    Tree(TreeKey),
}

impl NodeLink {
    pub fn is_linked(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Priority ordered set of ready threads
pub enum ReadySet {
    Chain(Chain<ThreadId>),
    Tree {
        tree: BTreeMap<TreeKey, ThreadId>,
        next_append: i64,
        next_prepend: i64,
    },
}

impl ReadySet {
    pub fn new(kind: ReadySetKind) -> Self {
        match kind {
            ReadySetKind::Chain => Self::Chain(Chain::new()),
            ReadySetKind::Tree => Self::Tree {
                tree: BTreeMap::new(),
                next_append: 0,
                next_prepend: -1,
            },
        }
    }

    pub fn kind(&self) -> ReadySetKind {
        match self {
            Self::Chain(_) => ReadySetKind::Chain,
            Self::Tree { .. } => ReadySetKind::Tree,
        }
    }

    /// Insert `thread` with `key`; `priority_of` gives the priority of a
    /// thread already in the set
    pub fn insert<F>(&mut self, thread: ThreadId, key: PriorityKey, priority_of: F) -> NodeLink
    where
        F: Fn(ThreadId) -> Priority,
    {
        match self {
            Self::Chain(chain) => {
                chain.insert_ordered(thread, |queued| key.goes_before(priority_of(queued)));
                NodeLink::Chain
            }
            Self::Tree { tree, next_append, next_prepend } => {
                let sequence = if key.is_append() {
                    let sequence = *next_append;
                    *next_append += 1;
                    sequence
                } else {
                    let sequence = *next_prepend;
                    *next_prepend -= 1;
                    sequence
                };
                let tree_key = TreeKey { priority: key.priority(), sequence };
                tree.insert(tree_key, thread);
                NodeLink::Tree(tree_key)
            }
        }
    }

    pub fn extract(&mut self, thread: ThreadId, link: NodeLink) {
        match (self, link) {
            (Self::Chain(chain), NodeLink::Chain) => chain.extract(thread),
            (Self::Tree { tree, .. }, NodeLink::Tree(key)) => {
                let removed = tree.remove(&key);
                crate::score_assert!(
                    removed == Some(thread),
                    FatalSource::ChainCorrupted,
                    "ready tree key does not match its node"
                );
            }
            _ => crate::error::fatal_error(FatalSource::ChainCorrupted, "node link of foreign ready set"),
        }
    }

    /// Most eligible ready thread
    pub fn first(&self) -> Option<ThreadId> {
        match self {
            Self::Chain(chain) => chain.first(),
            Self::Tree { tree, .. } => tree.values().next().copied(),
        }
    }

    /// Every ready thread, most eligible first
    pub fn order(&self) -> Vec<ThreadId> {
        match self {
            Self::Chain(chain) => chain.iter().collect(),
            Self::Tree { tree, .. } => tree.values().copied().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Chain(chain) => chain.len(),
            Self::Tree { tree, .. } => tree.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::{new_map, KernelHashMap};

    fn id(raw: u32) -> ThreadId {
        ThreadId::from_raw(raw).unwrap()
    }

    fn fill(kind: ReadySetKind, entries: &[(u32, PriorityKey)]) -> ReadySet {
        let mut set = ReadySet::new(kind);
        let mut priorities: KernelHashMap<ThreadId, Priority> = new_map();
        for &(raw, key) in entries {
            let link = set.insert(id(raw), key, |queued| priorities[&queued]);
            assert!(link.is_linked());
            priorities.insert(id(raw), key.priority());
        }
        set
    }

    #[test]
    fn test_both_representations_agree() {
        let entries = [
            (1, PriorityKey::append(5)),
            (2, PriorityKey::append(3)),
            (3, PriorityKey::append(5)),
            (4, PriorityKey::prepend(5)),
            (5, PriorityKey::append(3)),
            (6, PriorityKey::prepend(3)),
        ];
        let expected = [id(6), id(2), id(5), id(4), id(1), id(3)];
        for kind in [ReadySetKind::Chain, ReadySetKind::Tree] {
            let set = fill(kind, &entries);
            assert_eq!(set.order(), expected, "{:?}", kind);
            assert_eq!(set.first(), Some(id(6)));
        }
    }

    #[test]
    fn test_extract_from_tree() {
        let mut set = ReadySet::new(ReadySetKind::Tree);
        let a = set.insert(id(1), PriorityKey::append(2), |_| 0);
        let b = set.insert(id(2), PriorityKey::append(1), |_| 0);
        set.extract(id(2), b);
        assert_eq!(set.order(), [id(1)]);
        set.extract(id(1), a);
        assert!(set.is_empty());
    }
}
