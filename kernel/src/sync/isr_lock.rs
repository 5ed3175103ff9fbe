//! ISR lock - spin lock taken with local interrupts disabled
//!
//! A timer interrupt on the same processor must never observe a half
//! updated structure, so every lock that an interrupt handler can also
//! take disables interrupts first and restores them last.

use core::ops::{Deref, DerefMut};

use spin::{Mutex, MutexGuard};

use super::interrupt::InterruptGuard;

/// Interrupt-disabling spin lock
pub struct IsrLock<T> {
    name: &'static str,
    inner: Mutex<T>,
}

/// Guard of an `IsrLock`
///
/// Field order matters: the spin lock is released before interrupts are
/// restored.
pub struct IsrLockGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    _irq: InterruptGuard,
}

impl<T> IsrLock<T> {
    pub const fn new(name: &'static str, value: T) -> Self {
        Self {
            name,
            inner: Mutex::new(value),
        }
    }

    /// Disable interrupts, then spin until the lock is ours
    pub fn lock(&self) -> IsrLockGuard<'_, T> {
        let irq = InterruptGuard::new();
        let guard = self.inner.lock();
        IsrLockGuard { guard, _irq: irq }
    }

    pub fn try_lock(&self) -> Option<IsrLockGuard<'_, T>> {
        let irq = InterruptGuard::new();
        let guard = self.inner.try_lock()?;
        Some(IsrLockGuard { guard, _irq: irq })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

impl<'a, T> Deref for IsrLockGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<'a, T> DerefMut for IsrLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_excludes_second_owner() {
        let lock = IsrLock::new("test", 5u32);
        {
            let mut guard = lock.lock();
            *guard += 1;
            assert!(lock.try_lock().is_none());
        }
        assert_eq!(*lock.lock(), 6);
        assert_eq!(lock.name(), "test");
    }
}
