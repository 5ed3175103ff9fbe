//! Scheduler subsystem
//!
//! Scheduler instances (`control`), the per-thread node table (`node`),
//! the pluggable algorithm seam (`ops`), the simple priority algorithm and
//! its ready set, and the dispatch core.

pub mod control;
pub mod dispatch;
pub mod node;
pub mod ops;
pub mod ready;
pub mod simple;

pub use control::{Scheduler, SchedulerContext, SCHEDULER_ID_MINIMUM};
pub use dispatch::{DispatchContext, DispatchDisableGuard, DispatchPort};
pub use node::{NodeRequest, SchedulerNode};
pub use ops::{NodeParams, SchedulerOperations};
pub use ready::{NodeLink, ReadySet, ReadySetKind};
pub use simple::SimpleScheduler;

/// Index of a scheduler instance in the configuration table
pub type SchedulerIndex = usize;

/// Scheduling algorithm of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAlgorithm {
    /// Single priority-ordered ready set
    Simple(ReadySetKind),
}

impl SchedulerAlgorithm {
    pub(crate) fn instantiate(self) -> alloc::boxed::Box<dyn SchedulerOperations> {
        match self {
            Self::Simple(kind) => alloc::boxed::Box::new(SimpleScheduler::new(kind)),
        }
    }
}

/// How hard a newly ready thread pushes for a processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchUrgency {
    /// Waits for a preemptible processor
    #[default]
    Normal,
    /// Releases a non-preemptible thread of less urgent priority from its
    /// processor
    Forced,
}
