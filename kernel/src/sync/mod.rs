//! Synchronization primitives of the scheduling core
//!
//! - `InterruptGuard`: local interrupt disable/restore
//! - `IsrLock`: interrupts disabled + spin lock, used for scheduler
//!   instances, thread state and watchdog headers
//! - `AllocatorLock`: the one global lock, ordered before instance locks

pub mod interrupt;
pub mod isr_lock;
pub mod ordered;

pub use interrupt::{InterruptGuard, IsrLevel};
pub use isr_lock::{IsrLock, IsrLockGuard};
pub use ordered::{AllocatorGuard, AllocatorLock};
