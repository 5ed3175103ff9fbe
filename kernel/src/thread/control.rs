//! Thread control block
//!
//! Two locks, always taken in this order:
//!
//! 1. `wait`: priority aggregations, wait nodes, timed wait bookkeeping
//! 2. `scheduler`: states, affinity, the scheduler node table
//!
//! A scheduler instance lock may be taken while holding either one, never
//! the other way round.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::collections::Chain;
use crate::object::Name;
use crate::priority::{Priority, PriorityAggregation, PrioritySource};
use crate::processor::{CpuIndex, ProcessorMask};
use crate::scheduler::{DispatchUrgency, SchedulerIndex, SchedulerNode};
use crate::sync::IsrLock;
use crate::time::Watchdog;

use super::{BudgetAlgorithm, ThreadId, ThreadStates, WaitStatus};

/// Timeout watchdog of a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadTimer {
    pub watchdog: Watchdog,
}

/// Fields under the thread wait lock
pub struct ThreadWait {
    pub real_priority: Priority,
    /// One aggregation per scheduler instance, empty where the thread has
    /// no node registered
    pub priorities: Vec<PriorityAggregation>,
    pub wait_nodes: Chain<SchedulerIndex>,
    pub return_code: WaitStatus,
    pub timer: Option<ThreadTimer>,
}

/// Fields under the thread state lock
pub struct ThreadScheduler {
    pub states: ThreadStates,
    pub affinity: ProcessorMask,
    pub nodes: Vec<SchedulerNode>,
    pub scheduler_nodes: Chain<SchedulerIndex>,
    pub requests: Chain<SchedulerIndex>,
    /// Processor the thread executes on
    pub cpu: Option<CpuIndex>,
    pub preemptible: bool,
    pub budget: BudgetAlgorithm,
    pub cpu_time_budget: u32,
    pub urgency: DispatchUrgency,
}

/// Thread control block
pub struct ThreadControl {
    id: ThreadId,
    name: Name,
    is_idle: bool,
    home: AtomicUsize,
    pub(crate) wait: IsrLock<ThreadWait>,
    pub(crate) scheduler: IsrLock<ThreadScheduler>,
}

/// Everything needed to build a `ThreadControl`
pub(crate) struct ThreadSetup {
    pub id: ThreadId,
    pub name: Name,
    pub is_idle: bool,
    pub home: SchedulerIndex,
    pub scheduler_count: usize,
    pub priority: Priority,
    pub affinity: ProcessorMask,
    pub states: ThreadStates,
    pub preemptible: bool,
    pub budget: BudgetAlgorithm,
    pub urgency: DispatchUrgency,
}

impl ThreadControl {
    /// New thread with its home node registered
    ///
    /// Idle threads start without any registered node; they get one when
    /// their processor is attached to an instance.
    pub(crate) fn new(setup: ThreadSetup) -> Self {
        let nodes = (0..setup.scheduler_count)
            .map(|index| SchedulerNode::new(index, setup.id, setup.priority))
            .collect();
        let priorities = (0..setup.scheduler_count).map(|_| PriorityAggregation::new()).collect();

        let mut wait = ThreadWait {
            real_priority: setup.priority,
            priorities,
            wait_nodes: Chain::new(),
            return_code: WaitStatus::Successful,
            timer: None,
        };
        let mut scheduler = ThreadScheduler {
            states: setup.states,
            affinity: setup.affinity,
            nodes,
            scheduler_nodes: Chain::new(),
            requests: Chain::new(),
            cpu: None,
            preemptible: setup.preemptible,
            budget: setup.budget,
            cpu_time_budget: 0,
            urgency: setup.urgency,
        };

        if !setup.is_idle {
            wait.priorities[setup.home].initialize_one(PrioritySource::Real, setup.priority);
            wait.wait_nodes.initialize_one(setup.home);
            scheduler.scheduler_nodes.initialize_one(setup.home);
        }

        Self {
            id: setup.id,
            name: setup.name,
            is_idle: setup.is_idle,
            home: AtomicUsize::new(setup.home),
            wait: IsrLock::new("thread wait", wait),
            scheduler: IsrLock::new("thread state", scheduler),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn is_idle(&self) -> bool {
        self.is_idle
    }

    /// Home scheduler instance
    pub fn home(&self) -> SchedulerIndex {
        self.home.load(Ordering::Acquire)
    }

    pub(crate) fn set_home(&self, home: SchedulerIndex) {
        self.home.store(home, Ordering::Release);
    }

    pub fn states(&self) -> ThreadStates {
        self.scheduler.lock().states
    }

    pub fn affinity(&self) -> ProcessorMask {
        self.scheduler.lock().affinity
    }

    /// Processor the thread executes on
    pub fn cpu(&self) -> Option<CpuIndex> {
        self.scheduler.lock().cpu
    }

    pub fn is_preemptible(&self) -> bool {
        self.scheduler.lock().preemptible
    }

    pub fn cpu_time_budget(&self) -> u32 {
        self.scheduler.lock().cpu_time_budget
    }

    /// Outcome of the last timed wait
    pub fn wait_status(&self) -> WaitStatus {
        self.wait.lock().return_code
    }

    /// Instances with a registered node, home first
    pub fn scheduler_nodes(&self) -> Vec<SchedulerIndex> {
        self.scheduler.lock().scheduler_nodes.iter().collect()
    }

    /// Sticky level of the home node
    pub fn sticky_level(&self) -> u32 {
        let home = self.home();
        self.scheduler.lock().nodes[home].sticky_level
    }
}
