//! System - the scheduling core as one object
//!
//! Owns the configuration, the scheduler instances, the per-processor
//! records, the thread table and the allocator lock. Boot (`System::new`)
//! creates one idle thread per present processor and attaches it to the
//! processor's initial instance.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use spin::Once;

use crate::config::Configuration;
use crate::error::FatalSource;
use crate::object::Name;
use crate::processor::{CpuIndex, PerCpu, PerCpuState, ProcessorMask};
use crate::scheduler::{DispatchPort, DispatchUrgency, Scheduler};
use crate::sync::AllocatorLock;
use crate::thread::control::ThreadSetup;
use crate::thread::{BudgetAlgorithm, ThreadControl, ThreadId, ThreadStates, ThreadTable};

/// Scheduling core state
pub struct System {
    config: Configuration,
    schedulers: Vec<Scheduler>,
    cpus: Vec<PerCpu>,
    threads: ThreadTable,
    pub(crate) allocator: AllocatorLock,
    port: Arc<dyn DispatchPort>,
    pub(crate) realtime_offset: AtomicU64,
}

static SYSTEM: Once<System> = Once::new();

/// Boot the global system; later calls return the first instance
pub fn init(config: Configuration, port: Arc<dyn DispatchPort>) -> &'static System {
    SYSTEM.call_once(|| System::new(config, port))
}

/// The global system, once booted
pub fn system() -> Option<&'static System> {
    SYSTEM.get()
}

impl System {
    pub fn new(config: Configuration, port: Arc<dyn DispatchPort>) -> Self {
        let schedulers = config
            .schedulers
            .iter()
            .enumerate()
            .map(|(index, entry)| Scheduler::new(index, entry.name, entry.algorithm, entry.maximum_priority))
            .collect();
        let cpus = (0..config.maximum_processors).map(PerCpu::new).collect();
        let threads = ThreadTable::new(config.maximum_threads);

        let system = Self {
            config,
            schedulers,
            cpus,
            threads,
            allocator: AllocatorLock::new(),
            port,
            realtime_offset: AtomicU64::new(0),
        };
        system.boot_processors();
        system
    }

    fn boot_processors(&self) {
        for scheduler in &self.schedulers {
            log::info!(
                "scheduler {} ({}): {}, idle priority {}",
                scheduler.index(),
                scheduler.name(),
                scheduler.context.lock().ops.name(),
                scheduler.maximum_priority()
            );
        }

        for cpu in 0..self.config.maximum_processors {
            let present = self.config.present_processors.is_set(cpu);
            let assignment = self.config.assignment(cpu);

            if !present {
                if assignment.map_or(false, |assignment| assignment.mandatory) {
                    crate::error::fatal_error(
                        FatalSource::MandatoryProcessorNotPresent,
                        "mandatory processor is not present",
                    );
                }
                continue;
            }

            let idle = self.create_idle_thread(cpu);
            let percpu = &self.cpus[cpu];
            percpu.set_state(PerCpuState::Up);
            percpu.scheduler.lock().idle_if_online_and_unused = Some(idle);

            if let Some(assignment) = assignment {
                let allocator = self.allocator.lock();
                self.attach_processor(&allocator, assignment.scheduler_index, cpu);
                log::info!("cpu {}: online, scheduler {}", cpu, assignment.scheduler_index);
            } else {
                log::info!("cpu {}: online, unassigned", cpu);
            }
        }

        for cpu in 0..self.cpus.len() {
            self.dispatch(cpu);
        }
    }

    fn create_idle_thread(&self, cpu: CpuIndex) -> ThreadId {
        let id = self.threads.allocate_id();
        let home = self.config.assignment(cpu).map_or(0, |assignment| assignment.scheduler_index);
        let thread = ThreadControl::new(ThreadSetup {
            id,
            name: Name::build(b'I', b'D', b'L', b'0' + (cpu % 10) as u8),
            is_idle: true,
            home,
            scheduler_count: self.schedulers.len(),
            priority: self.schedulers[home].maximum_priority(),
            affinity: ProcessorMask::single(cpu),
            states: ThreadStates::READY,
            preemptible: true,
            budget: BudgetAlgorithm::None,
            urgency: DispatchUrgency::Normal,
        });
        if self.threads.insert(Arc::new(thread)).is_err() {
            crate::error::fatal_error(FatalSource::InternalError, "idle thread rejected by thread table");
        }
        id
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn schedulers(&self) -> &[Scheduler] {
        &self.schedulers
    }

    pub fn cpus(&self) -> &[PerCpu] {
        &self.cpus
    }

    pub fn cpu(&self, cpu: CpuIndex) -> Option<&PerCpu> {
        self.cpus.get(cpu)
    }

    pub fn threads(&self) -> &ThreadTable {
        &self.threads
    }

    pub fn port(&self) -> &dyn DispatchPort {
        &*self.port
    }

    /// Processor executing the caller, clamped to a configured one
    pub fn current_processor(&self) -> CpuIndex {
        let cpu = self.port.current_processor();
        if cpu < self.cpus.len() {
            cpu
        } else {
            0
        }
    }

    /// Processors that are up
    pub fn online_processors(&self) -> ProcessorMask {
        self.cpus
            .iter()
            .filter(|percpu| percpu.is_online())
            .map(PerCpu::index)
            .collect()
    }

    pub fn set_realtime_offset(&self, nanoseconds: u64) {
        self.realtime_offset.store(nanoseconds, Ordering::Release);
    }
}
