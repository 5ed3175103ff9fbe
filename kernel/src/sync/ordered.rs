//! Ordered two-level locking for processor-set changes
//!
//! Lock order: allocator lock, then a scheduler instance lock. Code that
//! moves processors between instances reaches the instance lock only
//! through `AllocatorGuard::acquire_instance`, so holding the instance
//! lock without the allocator lock is not expressible there.
//!
//! The allocator lock also serializes thread creation and deletion, which
//! keeps the thread table stable while processor removal scans it.

use spin::{Mutex, MutexGuard};

use super::isr_lock::{IsrLock, IsrLockGuard};

/// Global allocator lock
pub struct AllocatorLock {
    inner: Mutex<()>,
}

/// Proof that the allocator lock is held
pub struct AllocatorGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl AllocatorLock {
    pub const fn new() -> Self {
        Self { inner: Mutex::new(()) }
    }

    pub fn lock(&self) -> AllocatorGuard<'_> {
        AllocatorGuard { _guard: self.inner.lock() }
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl Default for AllocatorLock {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> AllocatorGuard<'a> {
    /// Second level: disable interrupts and take the instance lock
    ///
    /// The returned guard cannot outlive the allocator guard.
    pub fn acquire_instance<'g, T>(&'g self, lock: &'g IsrLock<T>) -> IsrLockGuard<'g, T> {
        lock.lock()
    }
}
