//! Per-processor record

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use spin::Mutex;

use crate::scheduler::SchedulerIndex;
use crate::sync::IsrLock;
use crate::thread::ThreadId;
use crate::time::{WatchdogClock, WatchdogHeader, WatchdogRoutine, WATCHDOG_CLOCK_COUNT};

use super::CpuIndex;

/// Processor life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PerCpuState {
    Initial = 0,
    Ready = 1,
    Up = 2,
    Shutdown = 3,
}

impl PerCpuState {
    fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::Ready,
            2 => Self::Up,
            3 => Self::Shutdown,
            _ => Self::Initial,
        }
    }
}

/// Scheduler ownership of a processor
///
/// Changed only with the allocator lock held.
#[derive(Debug, Default)]
pub struct CpuScheduler {
    /// Instance that owns the processor
    pub control: Option<SchedulerIndex>,
    /// Idle thread parked while no instance owns the online processor
    pub idle_if_online_and_unused: Option<ThreadId>,
}

/// Per-processor data
pub struct PerCpu {
    index: CpuIndex,
    state: AtomicU32,
    pub(crate) scheduler: Mutex<CpuScheduler>,
    pub(crate) executing: AtomicU32,
    pub(crate) heir: AtomicU32,
    pub(crate) dispatch_necessary: AtomicBool,
    pub(crate) dispatch_disable_level: AtomicU32,
    pub(crate) ticks: AtomicU64,
    pub(crate) switches: AtomicU64,
    pub(crate) watchdogs: [IsrLock<WatchdogHeader<WatchdogRoutine>>; WATCHDOG_CLOCK_COUNT],
}

impl PerCpu {
    pub fn new(index: CpuIndex) -> Self {
        Self {
            index,
            state: AtomicU32::new(PerCpuState::Initial as u32),
            scheduler: Mutex::new(CpuScheduler::default()),
            executing: AtomicU32::new(0),
            heir: AtomicU32::new(0),
            dispatch_necessary: AtomicBool::new(false),
            dispatch_disable_level: AtomicU32::new(0),
            ticks: AtomicU64::new(0),
            switches: AtomicU64::new(0),
            watchdogs: [
                IsrLock::new("watchdog ticks", WatchdogHeader::new()),
                IsrLock::new("watchdog monotonic", WatchdogHeader::new()),
                IsrLock::new("watchdog realtime", WatchdogHeader::new()),
            ],
        }
    }

    pub fn index(&self) -> CpuIndex {
        self.index
    }

    pub fn state(&self) -> PerCpuState {
        PerCpuState::from_u32(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: PerCpuState) {
        self.state.store(state as u32, Ordering::Release);
    }

    pub fn is_online(&self) -> bool {
        self.state() == PerCpuState::Up
    }

    pub fn executing(&self) -> Option<ThreadId> {
        ThreadId::from_raw(self.executing.load(Ordering::Acquire))
    }

    pub fn heir(&self) -> Option<ThreadId> {
        ThreadId::from_raw(self.heir.load(Ordering::Acquire))
    }

    pub fn dispatch_necessary(&self) -> bool {
        self.dispatch_necessary.load(Ordering::Acquire)
    }

    pub fn dispatch_disable_level(&self) -> u32 {
        self.dispatch_disable_level.load(Ordering::Acquire)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Context switches carried out so far
    pub fn switches(&self) -> u64 {
        self.switches.load(Ordering::Relaxed)
    }

    /// Instance owning this processor
    pub fn control(&self) -> Option<SchedulerIndex> {
        self.scheduler.lock().control
    }

    pub fn idle_if_online_and_unused(&self) -> Option<ThreadId> {
        self.scheduler.lock().idle_if_online_and_unused
    }

    pub(crate) fn watchdog_header(&self, clock: WatchdogClock) -> &IsrLock<WatchdogHeader<WatchdogRoutine>> {
        &self.watchdogs[clock as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_processor_is_offline_and_empty() {
        let cpu = PerCpu::new(3);
        assert_eq!(cpu.index(), 3);
        assert!(!cpu.is_online());
        assert_eq!(cpu.executing(), None);
        assert_eq!(cpu.heir(), None);
        assert_eq!(cpu.control(), None);

        cpu.set_state(PerCpuState::Up);
        assert!(cpu.is_online());
    }
}
