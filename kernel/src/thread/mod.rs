//! Threads
//!
//! Thread control blocks, the thread table and the thread directives:
//! life cycle, priority and helping.

pub mod control;
pub mod helping;
pub mod lifecycle;
pub mod priority;
pub mod state;
pub mod table;

use core::fmt;

use crate::object::{Name, ObjectId};
use crate::priority::Priority;
use crate::processor::ProcessorMask;
use crate::scheduler::DispatchUrgency;

pub use control::{ThreadControl, ThreadTimer};
pub use state::ThreadStates;
pub use table::ThreadTable;

/// Thread identifier (never zero)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(u32);

impl ThreadId {
    /// `None` for the reserved value zero
    pub const fn from_raw(raw: u32) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CPU budget algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BudgetAlgorithm {
    #[default]
    None,
    /// Yield to equal priority threads when the time slice is used up
    ResetTimeslice,
}

/// Outcome of the last wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitStatus {
    #[default]
    Successful,
    Timeout,
}

/// Parameters of `System::create_thread`
#[derive(Debug, Clone, Copy)]
pub struct ThreadConfig {
    pub name: Name,
    /// Home scheduler
    pub scheduler: ObjectId,
    pub priority: Priority,
    /// `None` means every processor
    pub affinity: Option<ProcessorMask>,
    pub preemptible: bool,
    pub budget: BudgetAlgorithm,
    pub urgency: DispatchUrgency,
}

impl ThreadConfig {
    pub fn new(name: Name, scheduler: ObjectId, priority: Priority) -> Self {
        Self {
            name,
            scheduler,
            priority,
            affinity: None,
            preemptible: true,
            budget: BudgetAlgorithm::None,
            urgency: DispatchUrgency::Normal,
        }
    }

    pub fn affinity(mut self, affinity: ProcessorMask) -> Self {
        self.affinity = Some(affinity);
        self
    }

    pub fn preemptible(mut self, preemptible: bool) -> Self {
        self.preemptible = preemptible;
        self
    }

    pub fn budget(mut self, budget: BudgetAlgorithm) -> Self {
        self.budget = budget;
        self
    }

    pub fn urgency(mut self, urgency: DispatchUrgency) -> Self {
        self.urgency = urgency;
        self
    }
}
