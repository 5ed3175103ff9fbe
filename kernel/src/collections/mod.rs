//! Index-based collections
//!
//! Kernel linkage (ready chains, per-thread node chains, request lists)
//! is expressed with integer handles instead of raw pointers, so a node
//! can be detached on one processor while another one still holds its
//! handle without anything dangling.

pub mod chain;

pub use chain::{Chain, ChainIter};

use core::hash::BuildHasherDefault;
use siphasher::sip::SipHasher13;

/// Deterministic hasher for kernel maps (no random seed available at boot)
pub type KernelHasher = BuildHasherDefault<SipHasher13>;

/// `hashbrown` map with the kernel hasher
pub type KernelHashMap<K, V> = hashbrown::HashMap<K, V, KernelHasher>;

/// Create an empty kernel map
pub fn new_map<K, V>() -> KernelHashMap<K, V> {
    KernelHashMap::with_hasher(KernelHasher::default())
}
