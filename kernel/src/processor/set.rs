//! Processor set manager
//!
//! Moves online processors between "no instance" and a scheduler
//! instance. Both directions run under the allocator lock; the instance
//! lock is reached through `AllocatorGuard::acquire_instance`. The
//! instance's processor mask is what placement decisions consult, so it is
//! only changed with the instance lock held.

use crate::error::{FatalSource, Result, ScoreError};
use crate::object::ObjectId;
use crate::priority::{PriorityKey, PrioritySource};
use crate::scheduler::{DispatchContext, SchedulerIndex};
use crate::score_assert;
use crate::sync::AllocatorGuard;
use crate::system::System;
use crate::thread::{ThreadControl, ThreadId};

use super::CpuIndex;

impl System {
    /// Add processor `cpu` to instance `id`
    pub fn scheduler_add_processor(&self, id: ObjectId, cpu: CpuIndex) -> Result<()> {
        let scheduler = self.scheduler_by_id(id)?;
        if cpu >= self.config().maximum_processors {
            return Err(ScoreError::NotConfigured);
        }
        if self.config().assignment(cpu).is_none() {
            return Err(ScoreError::NotConfigured);
        }
        if !self.cpus()[cpu].is_online() {
            return Err(ScoreError::IncorrectState);
        }

        let allocator = self.allocator.lock();
        if self.cpus()[cpu].control().is_some() {
            log::debug!("add cpu {} to {}: already owned", cpu, scheduler.name());
            return Err(ScoreError::ResourceInUse);
        }

        let guard = self.dispatch_disable();
        self.attach_processor(&allocator, scheduler.index(), cpu);
        self.thread_dispatch_direct(guard);

        log::info!("cpu {} added to scheduler {}", cpu, scheduler.name());
        Ok(())
    }

    /// Claim the parked idle thread of `cpu` and hand `cpu` to `index`
    pub(crate) fn attach_processor(&self, allocator: &AllocatorGuard<'_>, index: SchedulerIndex, cpu: CpuIndex) {
        let scheduler = self.scheduler_by_index(index);
        let percpu = &self.cpus()[cpu];

        let Some(idle_id) = percpu.scheduler.lock().idle_if_online_and_unused.take() else {
            crate::error::fatal_error(FatalSource::InternalError, "online processor without idle thread");
        };
        let idle = self.idle_thread(idle_id);
        let idle_priority = scheduler.maximum_priority();
        idle.set_home(index);

        {
            let mut wait = idle.wait.lock();
            wait.real_priority = idle_priority;
            wait.priorities[index].initialize_one(PrioritySource::Real, idle_priority);
            wait.wait_nodes.initialize_one(index);

            let mut state = idle.scheduler.lock();
            state.nodes[index].priority = PriorityKey::append(idle_priority);
            state.scheduler_nodes.initialize_one(index);
        }

        let mut context = allocator.acquire_instance(&scheduler.context);
        context.processors.set(cpu);
        percpu.scheduler.lock().control = Some(index);

        let mut cx = DispatchContext::new(self.cpus(), self.port(), self.current_processor(), context.processors);
        context
            .ops
            .add_processor(&mut cx, cpu, idle_id, PriorityKey::append(idle_priority));
    }

    /// Remove processor `cpu` from instance `id`
    pub fn scheduler_remove_processor(&self, id: ObjectId, cpu: CpuIndex) -> Result<()> {
        let scheduler = self.scheduler_by_id(id)?;
        if cpu >= self.config().maximum_processors {
            return Err(ScoreError::InvalidNumber);
        }
        let index = scheduler.index();

        let allocator = self.allocator.lock();
        if self.cpus()[cpu].control() != Some(index) {
            return Err(ScoreError::InvalidNumber);
        }

        let guard = self.dispatch_disable();

        let remaining = {
            let mut context = allocator.acquire_instance(&scheduler.context);
            context.processors.clear(cpu);
            context.processors
        };

        let mut status = Ok(());
        if self.threads().iterate(|thread| self.processor_required(thread, index)) {
            status = Err(ScoreError::ResourceInUse);
        } else if remaining.is_zero() && self.threads().iterate(|thread| Self::is_helping(thread, index)) {
            status = Err(ScoreError::ResourceInUse);
        }

        let idle = {
            let mut context = allocator.acquire_instance(&scheduler.context);
            if status.is_ok() {
                self.cpus()[cpu].scheduler.lock().control = None;
                let mut cx =
                    DispatchContext::new(self.cpus(), self.port(), self.current_processor(), context.processors);
                Some(context.ops.remove_processor(&mut cx, cpu))
            } else {
                context.processors.set(cpu);
                None
            }
        };

        if let Some(idle_id) = idle {
            self.detach_idle(index, idle_id);
            self.cpus()[cpu].scheduler.lock().idle_if_online_and_unused = Some(idle_id);
            log::info!("cpu {} removed from scheduler {}", cpu, scheduler.name());
        } else {
            log::debug!("remove cpu {} from {}: still required", cpu, scheduler.name());
        }

        drop(guard);
        drop(allocator);
        status
    }

    /// Would a thread lose its last eligible processor of `index`?
    fn processor_required(&self, thread: &ThreadControl, index: SchedulerIndex) -> bool {
        if thread.is_idle() {
            return false;
        }
        let _wait = thread.wait.lock();
        let state = thread.scheduler.lock();
        if thread.home() != index {
            return false;
        }
        let processors = self.scheduler_by_index(index).context.lock().processors;
        !state.affinity.has_overlap(&processors)
    }

    /// Has a thread a node registered with `index`?
    fn is_helping(thread: &ThreadControl, index: SchedulerIndex) -> bool {
        if thread.is_idle() {
            return false;
        }
        let _wait = thread.wait.lock();
        let state = thread.scheduler.lock();
        state.scheduler_nodes.contains(index)
    }

    /// Drop the bookkeeping the idle thread had with `index`
    fn detach_idle(&self, index: SchedulerIndex, idle_id: ThreadId) {
        let idle = self.idle_thread(idle_id);
        let mut wait = idle.wait.lock();
        let extracted = wait.priorities[index].extract(PrioritySource::Real);
        score_assert!(extracted.is_ok(), "idle thread without real priority");
        score_assert!(wait.priorities[index].is_empty(), "idle priority aggregation not empty");
        wait.wait_nodes.extract(index);
        score_assert!(wait.wait_nodes.is_empty(), FatalSource::ChainCorrupted, "idle wait nodes not empty");

        let mut state = idle.scheduler.lock();
        state.scheduler_nodes.extract(index);
        score_assert!(
            state.scheduler_nodes.is_empty(),
            FatalSource::ChainCorrupted,
            "idle scheduler nodes not empty"
        );
    }

    fn idle_thread(&self, id: ThreadId) -> alloc::sync::Arc<ThreadControl> {
        match self.threads().get(id) {
            Ok(thread) if thread.is_idle() => thread,
            _ => crate::error::fatal_error(FatalSource::InternalError, "idle thread lost"),
        }
    }
}
