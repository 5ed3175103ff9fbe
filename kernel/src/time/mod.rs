//! Time: watchdogs, clock tick, delays
//!
//! Each processor has one watchdog header per clock:
//!
//! - `Ticks`: the processor's clock tick counter
//! - `Monotonic`: nanoseconds since boot
//! - `Realtime`: monotonic plus the realtime offset

pub mod clock;
pub mod counter;
pub mod watchdog;

use alloc::sync::Arc;
use core::fmt;

use crate::processor::CpuIndex;
use crate::system::System;
use crate::thread::ThreadId;

pub use counter::{counter_delay_nanoseconds, counter_delay_ticks, counter_difference, CpuCounter};
pub use watchdog::{WatchdogHeader, WatchdogId, WatchdogState};

/// Clock a watchdog header is driven by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchdogClock {
    Ticks = 0,
    Monotonic = 1,
    Realtime = 2,
}

pub const WATCHDOG_CLOCK_COUNT: usize = 3;

impl WatchdogClock {
    pub const ALL: [WatchdogClock; WATCHDOG_CLOCK_COUNT] = [Self::Ticks, Self::Monotonic, Self::Realtime];
}

/// Callback run when a watchdog fires
pub type WatchdogCallback = Arc<dyn Fn(&System) + Send + Sync>;

/// What happens when a watchdog fires
#[derive(Clone)]
pub enum WatchdogRoutine {
    /// End the timed wait of a thread
    ThreadTimeout(ThreadId),
    Callback(WatchdogCallback),
}

impl WatchdogRoutine {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&System) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }
}

impl fmt::Debug for WatchdogRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreadTimeout(thread) => write!(f, "ThreadTimeout({:?})", thread),
            Self::Callback(_) => write!(f, "Callback"),
        }
    }
}

/// Watchdog handle: header (processor, clock) plus the control in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Watchdog {
    pub(crate) cpu: CpuIndex,
    pub(crate) clock: WatchdogClock,
    pub(crate) id: WatchdogId,
}

impl Watchdog {
    pub fn cpu(&self) -> CpuIndex {
        self.cpu
    }

    pub fn clock(&self) -> WatchdogClock {
        self.clock
    }
}
