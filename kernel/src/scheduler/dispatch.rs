//! Dispatch core
//!
//! The algorithms decide heirs; this module publishes them to the
//! per-processor records and turns them into context switches. The
//! register-level switch and the inter-processor interrupt belong to the
//! architecture port behind `DispatchPort`.

use core::sync::atomic::Ordering;

use crate::error::FatalSource;
use crate::processor::{CpuIndex, PerCpu, ProcessorMask};
use crate::score_assert;
use crate::system::System;
use crate::thread::{BudgetAlgorithm, ThreadId};

/// Architecture hooks used by the dispatch core
pub trait DispatchPort: Send + Sync {
    /// Index of the processor executing the caller
    fn current_processor(&self) -> CpuIndex;

    /// Ask `cpu` to run `System::dispatch` soon (inter-processor interrupt)
    fn request_dispatch(&self, cpu: CpuIndex);

    /// Switch `cpu` from `from` to `to`
    fn context_switch(&self, cpu: CpuIndex, from: Option<ThreadId>, to: ThreadId);
}

/// What an algorithm may touch while it holds its instance lock
pub struct DispatchContext<'a> {
    cpus: &'a [PerCpu],
    port: &'a dyn DispatchPort,
    cpu_self: CpuIndex,
    processors: ProcessorMask,
}

impl<'a> DispatchContext<'a> {
    pub fn new(cpus: &'a [PerCpu], port: &'a dyn DispatchPort, cpu_self: CpuIndex, processors: ProcessorMask) -> Self {
        Self { cpus, port, cpu_self, processors }
    }

    /// Processors the instance may place threads on right now
    pub fn processors(&self) -> ProcessorMask {
        self.processors
    }

    pub fn cpu_self(&self) -> CpuIndex {
        self.cpu_self
    }

    /// Publish `heir` for `cpu` and make a dispatch necessary there
    pub fn update_heir(&mut self, cpu: CpuIndex, heir: ThreadId) {
        let Some(percpu) = self.cpus.get(cpu) else {
            crate::error::fatal_error(FatalSource::InternalError, "heir for unknown processor");
        };
        percpu.heir.store(heir.as_u32(), Ordering::Release);
        percpu.dispatch_necessary.store(true, Ordering::Release);

        if cpu != self.cpu_self {
            self.port.request_dispatch(cpu);
        }
    }
}

/// Thread dispatching disabled on one processor
///
/// Dropping the outermost guard carries out a pending dispatch.
pub struct DispatchDisableGuard<'a> {
    system: &'a System,
    cpu: CpuIndex,
}

impl<'a> DispatchDisableGuard<'a> {
    pub fn cpu(&self) -> CpuIndex {
        self.cpu
    }
}

impl<'a> Drop for DispatchDisableGuard<'a> {
    fn drop(&mut self) {
        let percpu = &self.system.cpus()[self.cpu];
        let level = percpu.dispatch_disable_level.load(Ordering::Acquire);
        score_assert!(
            level > 0,
            FatalSource::BadThreadDispatchDisableLevel,
            "dispatch enable without disable"
        );
        percpu.dispatch_disable_level.store(level - 1, Ordering::Release);

        if level == 1 && percpu.dispatch_necessary.load(Ordering::Acquire) {
            self.system.dispatch(self.cpu);
        }
    }
}

impl System {
    /// Disable thread dispatching on the calling processor
    pub fn dispatch_disable(&self) -> DispatchDisableGuard<'_> {
        let cpu = self.current_processor();
        self.cpus()[cpu].dispatch_disable_level.fetch_add(1, Ordering::AcqRel);
        DispatchDisableGuard { system: self, cpu }
    }

    /// Dispatch now, whatever the state of `dispatch_necessary`
    ///
    /// The guard must be the only dispatch disable level held.
    pub fn thread_dispatch_direct(&self, guard: DispatchDisableGuard<'_>) {
        let percpu = &self.cpus()[guard.cpu];
        score_assert!(
            percpu.dispatch_disable_level.load(Ordering::Acquire) == 1,
            FatalSource::BadThreadDispatchDisableLevel,
            "direct dispatch with nested dispatch disable"
        );
        percpu.dispatch_necessary.store(true, Ordering::Release);
        drop(guard);
    }

    /// Make the heir of `cpu` its executing thread
    ///
    /// Runs on `cpu` itself: from the outermost dispatch enable, or from
    /// the handler of a `DispatchPort::request_dispatch`.
    pub fn dispatch(&self, cpu: CpuIndex) {
        let Some(percpu) = self.cpus().get(cpu) else {
            return;
        };

        while percpu.dispatch_necessary.swap(false, Ordering::AcqRel) {
            let Some(heir) = percpu.heir() else {
                continue;
            };
            let executing = percpu.executing();
            if executing == Some(heir) {
                continue;
            }

            percpu.executing.store(heir.as_u32(), Ordering::Release);
            percpu.switches.fetch_add(1, Ordering::Relaxed);

            if let Some(previous) = executing.and_then(|id| self.threads().get(id).ok()) {
                let mut scheduler = previous.scheduler.lock();
                if scheduler.cpu == Some(cpu) {
                    scheduler.cpu = None;
                }
            }
            if let Ok(thread) = self.threads().get(heir) {
                let mut scheduler = thread.scheduler.lock();
                scheduler.cpu = Some(cpu);
                if scheduler.budget == BudgetAlgorithm::ResetTimeslice {
                    scheduler.cpu_time_budget = self.config().ticks_per_timeslice;
                }
            }

            log::trace!("cpu {}: switch {:?} -> {:?}", cpu, executing, heir);
            self.port().context_switch(cpu, executing, heir);
        }
    }
}
