//! Local interrupt masking
//!
//! On bare-metal x86_64 this saves RFLAGS and executes `cli`/`sti`. On
//! every other target (host tests included) the core runs without real
//! interrupts and the guard only tracks a nesting depth.

/// Saved interrupt level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsrLevel {
    was_enabled: bool,
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
mod imp {
    use super::IsrLevel;

    #[inline]
    pub fn local_disable() -> IsrLevel {
        let rflags: u64;
        unsafe {
            core::arch::asm!("pushfq; pop {}", out(reg) rflags);
        }
        let was_enabled = (rflags & 0x200) != 0;

        if was_enabled {
            unsafe { core::arch::asm!("cli", options(nomem, nostack)); }
        }

        IsrLevel { was_enabled }
    }

    #[inline]
    pub fn local_enable(level: IsrLevel) {
        if level.was_enabled {
            unsafe { core::arch::asm!("sti", options(nomem, nostack)); }
        }
    }
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
mod imp {
    use super::IsrLevel;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static DISABLE_DEPTH: AtomicUsize = AtomicUsize::new(0);

    #[inline]
    pub fn local_disable() -> IsrLevel {
        let depth = DISABLE_DEPTH.fetch_add(1, Ordering::AcqRel);
        IsrLevel { was_enabled: depth == 0 }
    }

    #[inline]
    pub fn local_enable(_level: IsrLevel) {
        DISABLE_DEPTH.fetch_sub(1, Ordering::AcqRel);
    }
}

pub use imp::{local_disable, local_enable};

/// RAII guard for disabling/restoring interrupts
pub struct InterruptGuard {
    level: IsrLevel,
}

impl InterruptGuard {
    pub fn new() -> Self {
        Self { level: local_disable() }
    }

    /// Level saved when the guard was created
    pub fn level(&self) -> IsrLevel {
        self.level
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        local_enable(self.level);
    }
}

impl Default for InterruptGuard {
    fn default() -> Self {
        Self::new()
    }
}
