//! Chain - doubly linked list over handles
//!
//! Each member is identified by a small `Copy` handle (a thread id, a
//! scheduler index, ...). The links live in the chain itself, keyed by
//! handle, so membership tests and extraction are O(1) and a member can
//! be on several independent chains at once.
//!
//! Linking a handle twice or extracting a handle that is not linked means
//! the caller lost track of its own bookkeeping; both are fatal.

use core::hash::Hash;

use super::{new_map, KernelHashMap};
use crate::error::FatalSource;
use crate::score_assert;

#[derive(Debug, Clone, Copy)]
struct Link<K> {
    prev: Option<K>,
    next: Option<K>,
}

/// Doubly linked chain of handles
pub struct Chain<K> {
    head: Option<K>,
    tail: Option<K>,
    links: KernelHashMap<K, Link<K>>,
}

impl<K: Copy + Eq + Hash> Chain<K> {
    /// Create an empty chain
    pub fn new() -> Self {
        Self {
            head: None,
            tail: None,
            links: new_map(),
        }
    }

    /// Reset an empty chain to contain exactly `key`
    pub fn initialize_one(&mut self, key: K) {
        score_assert!(self.is_empty(), FatalSource::ChainCorrupted, "initialize_one on non-empty chain");
        self.append(key);
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn contains(&self, key: K) -> bool {
        self.links.contains_key(&key)
    }

    pub fn first(&self) -> Option<K> {
        self.head
    }

    pub fn next(&self, key: K) -> Option<K> {
        self.links.get(&key).and_then(|link| link.next)
    }

    /// Link `key` at the tail
    pub fn append(&mut self, key: K) {
        self.check_off_chain(key);
        let prev = self.tail;
        self.links.insert(key, Link { prev, next: None });
        match prev {
            Some(tail) => self.link_mut(tail).next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
    }

    /// Link `key` at the head
    pub fn prepend(&mut self, key: K) {
        match self.head {
            Some(head) => self.insert_before(head, key),
            None => self.append(key),
        }
    }

    /// Link `key` right before `next`
    pub fn insert_before(&mut self, next: K, key: K) {
        self.check_off_chain(key);
        let prev = self.link(next).prev;
        self.links.insert(key, Link { prev, next: Some(next) });
        self.link_mut(next).prev = Some(key);
        match prev {
            Some(prev) => self.link_mut(prev).next = Some(key),
            None => self.head = Some(key),
        }
    }

    /// Link `key` before the first member for which `goes_before(member)`
    /// holds, or at the tail if there is none
    pub fn insert_ordered<F>(&mut self, key: K, mut goes_before: F)
    where
        F: FnMut(K) -> bool,
    {
        let mut cursor = self.head;
        while let Some(member) = cursor {
            if goes_before(member) {
                self.insert_before(member, key);
                return;
            }
            cursor = self.next(member);
        }
        self.append(key);
    }

    /// Unlink `key`; it must be on this chain
    pub fn extract(&mut self, key: K) {
        let link = match self.links.remove(&key) {
            Some(link) => link,
            None => crate::error::fatal_error(FatalSource::ChainCorrupted, "extract of a node off chain"),
        };
        match link.prev {
            Some(prev) => self.link_mut(prev).next = link.next,
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => self.link_mut(next).prev = link.prev,
            None => self.tail = link.prev,
        }
    }

    /// Unlink and return the head
    pub fn get_first(&mut self) -> Option<K> {
        let head = self.head?;
        self.extract(head);
        Some(head)
    }

    pub fn iter(&self) -> ChainIter<'_, K> {
        ChainIter {
            chain: self,
            cursor: self.head,
        }
    }

    fn check_off_chain(&self, key: K) {
        score_assert!(!self.links.contains_key(&key), FatalSource::ChainCorrupted, "node already on chain");
    }

    fn link(&self, key: K) -> Link<K> {
        match self.links.get(&key) {
            Some(link) => *link,
            None => crate::error::fatal_error(FatalSource::ChainCorrupted, "dangling chain link"),
        }
    }

    fn link_mut(&mut self, key: K) -> &mut Link<K> {
        match self.links.get_mut(&key) {
            Some(link) => link,
            None => crate::error::fatal_error(FatalSource::ChainCorrupted, "dangling chain link"),
        }
    }
}

impl<K: Copy + Eq + Hash> Default for Chain<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator from head to tail
pub struct ChainIter<'a, K> {
    chain: &'a Chain<K>,
    cursor: Option<K>,
}

impl<'a, K: Copy + Eq + Hash> Iterator for ChainIter<'a, K> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let current = self.cursor?;
        self.cursor = self.chain.next(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn members(chain: &Chain<u32>) -> Vec<u32> {
        chain.iter().collect()
    }

    #[test]
    fn test_append_prepend_extract() {
        let mut chain = Chain::new();
        chain.append(1);
        chain.append(2);
        chain.prepend(0);
        assert_eq!(members(&chain), [0, 1, 2]);

        chain.extract(1);
        assert_eq!(members(&chain), [0, 2]);
        assert_eq!(chain.next(0), Some(2));
        assert!(!chain.contains(1));

        assert_eq!(chain.get_first(), Some(0));
        assert_eq!(chain.get_first(), Some(2));
        assert!(chain.is_empty());
    }

    #[test]
    fn test_insert_ordered_keeps_fifo_for_equal_keys() {
        let weights = [3u32, 1, 3, 2, 1];
        let mut chain = Chain::new();
        for (key, weight) in weights.iter().enumerate() {
            // append semantics: go before the first strictly heavier member
            chain.insert_ordered(key as u32, |member| *weight < weights[member as usize]);
        }
        assert_eq!(members(&chain), [1, 4, 3, 0, 2]);
    }

    #[test]
    fn test_initialize_one() {
        let mut chain = Chain::new();
        chain.initialize_one(7u32);
        assert_eq!(members(&chain), [7]);
        chain.insert_before(7, 8);
        assert_eq!(members(&chain), [8, 7]);
        assert_eq!(chain.first(), Some(8));
    }

    #[test]
    #[should_panic(expected = "node already on chain")]
    fn test_double_append_is_fatal() {
        let mut chain = Chain::new();
        chain.append(1u32);
        chain.append(1u32);
    }

    #[test]
    #[should_panic(expected = "extract of a node off chain")]
    fn test_extract_off_chain_is_fatal() {
        let mut chain: Chain<u32> = Chain::new();
        chain.extract(4);
    }
}
