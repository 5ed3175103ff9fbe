//! Scheduler instances and the scheduler directives

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::{Result, ScoreError};
use crate::object::{Name, ObjectId, ObjectsApi, FAKE_OBJECTS_SCHEDULERS, LOCAL_NODE};
use crate::priority::Priority;
use crate::processor::{CpuIndex, ProcessorMask};
use crate::sync::IsrLock;
use crate::system::System;
use crate::thread::ThreadId;

use super::ops::SchedulerOperations;
use super::{DispatchContext, SchedulerAlgorithm, SchedulerIndex};

/// Identifier of the first scheduler instance
pub const SCHEDULER_ID_MINIMUM: u32 =
    ObjectId::build(ObjectsApi::Fake, FAKE_OBJECTS_SCHEDULERS, LOCAL_NODE, 1).as_u32();

/// State protected by the instance lock
pub struct SchedulerContext {
    /// Processors owned by the instance
    pub processors: ProcessorMask,
    pub ops: Box<dyn SchedulerOperations>,
}

/// One scheduler instance
pub struct Scheduler {
    name: Name,
    index: SchedulerIndex,
    id: ObjectId,
    algorithm: SchedulerAlgorithm,
    maximum_priority: Priority,
    pub(crate) context: IsrLock<SchedulerContext>,
}

impl Scheduler {
    pub fn new(index: SchedulerIndex, name: Name, algorithm: SchedulerAlgorithm, maximum_priority: Priority) -> Self {
        Self {
            name,
            index,
            id: Self::id_of(index),
            algorithm,
            maximum_priority,
            context: IsrLock::new(
                "scheduler",
                SchedulerContext {
                    processors: ProcessorMask::empty(),
                    ops: algorithm.instantiate(),
                },
            ),
        }
    }

    pub fn id_of(index: SchedulerIndex) -> ObjectId {
        ObjectId::from_u32(SCHEDULER_ID_MINIMUM.wrapping_add(index as u32))
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn index(&self) -> SchedulerIndex {
        self.index
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn algorithm(&self) -> SchedulerAlgorithm {
        self.algorithm
    }

    /// Idle priority
    pub fn maximum_priority(&self) -> Priority {
        self.maximum_priority
    }

    /// Valid thread priority for this instance?
    pub fn is_valid_priority(&self, priority: Priority) -> bool {
        priority < self.maximum_priority
    }

    pub fn processors(&self) -> ProcessorMask {
        self.context.lock().processors
    }

    pub fn processor_count(&self) -> u32 {
        self.processors().count()
    }

    /// Ready threads of the instance, most eligible first
    pub fn ready_order(&self) -> Vec<ThreadId> {
        self.context.lock().ops.ready_order()
    }

    /// Heir the instance selected for `cpu`
    pub fn heir(&self, cpu: CpuIndex) -> Option<ThreadId> {
        self.context.lock().ops.heir(cpu)
    }

    pub fn is_ready(&self, thread: ThreadId) -> bool {
        self.context.lock().ops.is_ready(thread)
    }
}

impl System {
    pub(crate) fn scheduler_by_index(&self, index: SchedulerIndex) -> &Scheduler {
        match self.schedulers().get(index) {
            Some(scheduler) => scheduler,
            None => crate::error::fatal_error(crate::error::FatalSource::InternalError, "scheduler index out of range"),
        }
    }

    /// Instance with identifier `id`
    pub fn scheduler_by_id(&self, id: ObjectId) -> Result<&Scheduler> {
        let index = id.as_u32().wrapping_sub(SCHEDULER_ID_MINIMUM) as usize;
        self.schedulers().get(index).ok_or(ScoreError::InvalidId)
    }

    /// Run `f` with the instance lock of `index` held
    pub(crate) fn with_instance<R, F>(&self, index: SchedulerIndex, f: F) -> R
    where
        F: FnOnce(&mut dyn SchedulerOperations, &mut DispatchContext<'_>) -> R,
    {
        let scheduler = self.scheduler_by_index(index);
        let mut context = scheduler.context.lock();
        let mut cx = DispatchContext::new(self.cpus(), self.port(), self.current_processor(), context.processors);
        f(context.ops.as_mut(), &mut cx)
    }

    /// Look up an instance by name
    pub fn scheduler_ident(&self, name: Name) -> Result<ObjectId> {
        self.schedulers()
            .iter()
            .find(|scheduler| scheduler.name() == name)
            .map(Scheduler::id)
            .ok_or(ScoreError::InvalidName)
    }

    /// Instance owning processor `cpu`
    pub fn scheduler_ident_by_processor(&self, cpu: CpuIndex) -> Result<ObjectId> {
        let percpu = self.cpus().get(cpu).ok_or(ScoreError::InvalidName)?;
        let index = percpu.control().ok_or(ScoreError::IncorrectState)?;
        Ok(self.scheduler_by_index(index).id())
    }

    pub fn scheduler_get_processor_set(&self, id: ObjectId) -> Result<ProcessorMask> {
        Ok(self.scheduler_by_id(id)?.processors())
    }

    /// Idle priority of the instance; thread priorities are below it
    pub fn scheduler_get_maximum_priority(&self, id: ObjectId) -> Result<Priority> {
        Ok(self.scheduler_by_id(id)?.maximum_priority())
    }
}
