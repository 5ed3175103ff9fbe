//! Thread life cycle directives

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::{Result, ScoreError};
use crate::processor::ProcessorMask;
use crate::scheduler::NodeParams;
use crate::system::System;

use super::control::ThreadSetup;
use super::{ThreadConfig, ThreadControl, ThreadId, ThreadStates};

impl System {
    /// Create a dormant thread
    pub fn create_thread(&self, config: ThreadConfig) -> Result<ThreadId> {
        let scheduler = self.scheduler_by_id(config.scheduler)?;
        if !scheduler.is_valid_priority(config.priority) {
            return Err(ScoreError::InvalidPriority);
        }

        let _allocator = self.allocator.lock();
        let processors = scheduler.processors();
        if processors.is_zero() {
            return Err(ScoreError::IncorrectState);
        }
        let affinity = config
            .affinity
            .unwrap_or_else(|| ProcessorMask::first_n(self.config().maximum_processors));
        if !affinity.has_overlap(&processors) {
            return Err(ScoreError::InvalidNumber);
        }
        if !self.threads().has_room() {
            return Err(ScoreError::TooMany);
        }

        let id = self.threads().allocate_id();
        let home = scheduler.index();
        let thread = ThreadControl::new(ThreadSetup {
            id,
            name: config.name,
            is_idle: false,
            home,
            scheduler_count: self.schedulers().len(),
            priority: config.priority,
            affinity,
            states: ThreadStates::DORMANT,
            preemptible: config.preemptible,
            budget: config.budget,
            urgency: config.urgency,
        });

        let params = {
            let state = thread.scheduler.lock();
            NodeParams {
                priority: state.nodes[home].priority,
                affinity,
                preemptible: config.preemptible,
                urgency: config.urgency,
            }
        };
        self.with_instance(home, |ops, _| ops.node_initialize(id, params));
        if let Err(error) = self.threads().insert(Arc::new(thread)) {
            self.with_instance(home, |ops, cx| ops.node_destroy(cx, id));
            return Err(error);
        }

        log::info!("thread {} ({}) created on {}", id, config.name, scheduler.name());
        Ok(id)
    }

    /// Make a dormant thread ready
    pub fn start_thread(&self, id: ThreadId) -> Result<()> {
        let thread = self.threads().get_user(id)?;
        if !thread.states().contains(ThreadStates::DORMANT) {
            return Err(ScoreError::IncorrectState);
        }
        let _dispatch = self.dispatch_disable();
        self.clear_state(&thread, ThreadStates::DORMANT);
        Ok(())
    }

    /// Delete a thread and release everything it holds in the core
    pub fn delete_thread(&self, id: ThreadId) -> Result<()> {
        let allocator = self.allocator.lock();
        let thread = self.threads().get_user(id)?;
        let dispatch = self.dispatch_disable();

        self.set_state(&thread, ThreadStates::ZOMBIE);

        let timer = thread.wait.lock().timer.take();
        if let Some(timer) = timer {
            let released = self.watchdog_release(timer.watchdog);
            crate::score_assert!(released.is_ok(), "thread timer handle is stale");
        }

        let registered: Vec<_> = {
            let mut wait = thread.wait.lock();
            for aggregation in wait.priorities.iter_mut() {
                aggregation.clear();
            }
            while wait.wait_nodes.get_first().is_some() {}
            let mut state = thread.scheduler.lock();
            let mut registered = Vec::new();
            while let Some(index) = state.scheduler_nodes.get_first() {
                registered.push(index);
            }
            registered
        };
        for index in registered {
            self.with_instance(index, |ops, cx| ops.node_destroy(cx, id));
        }

        self.threads().remove(id);
        drop(dispatch);
        drop(allocator);

        log::info!("thread {} deleted", id);
        Ok(())
    }

    pub fn suspend_thread(&self, id: ThreadId) -> Result<()> {
        let thread = self.threads().get_user(id)?;
        let _dispatch = self.dispatch_disable();
        let previous = self.set_state(&thread, ThreadStates::SUSPENDED);
        if previous.contains(ThreadStates::SUSPENDED) {
            return Err(ScoreError::IncorrectState);
        }
        Ok(())
    }

    pub fn resume_thread(&self, id: ThreadId) -> Result<()> {
        let thread = self.threads().get_user(id)?;
        let _dispatch = self.dispatch_disable();
        let previous = self.clear_state(&thread, ThreadStates::SUSPENDED);
        if !previous.contains(ThreadStates::SUSPENDED) {
            return Err(ScoreError::IncorrectState);
        }
        Ok(())
    }

    /// Processors `id` may execute on
    pub fn set_affinity(&self, id: ThreadId, affinity: ProcessorMask) -> Result<()> {
        let thread = self.threads().get_user(id)?;
        let _dispatch = self.dispatch_disable();
        let _wait = thread.wait.lock();
        let mut state = thread.scheduler.lock();
        let home = thread.home();

        let processors = self.scheduler_by_index(home).processors();
        if !affinity.has_overlap(&processors) {
            return Err(ScoreError::InvalidNumber);
        }
        state.affinity = affinity;
        self.with_instance(home, |ops, cx| ops.set_affinity(cx, id, affinity));
        Ok(())
    }

    /// Let the ready threads of equal priority run first
    pub fn yield_thread(&self, id: ThreadId) -> Result<()> {
        let thread = self.threads().get_user(id)?;
        let _dispatch = self.dispatch_disable();
        let state = thread.scheduler.lock();
        if state.states.is_ready() {
            self.with_instance(thread.home(), |ops, cx| ops.yield_thread(cx, id));
        }
        drop(state);
        Ok(())
    }

    /// Set `states`; the first bit set blocks the thread
    ///
    /// Returns the previous states.
    pub(crate) fn set_state(&self, thread: &ThreadControl, states: ThreadStates) -> ThreadStates {
        let mut state = thread.scheduler.lock();
        let previous = state.states;
        state.states |= states;
        if previous.is_ready() && !states.is_empty() {
            self.with_instance(thread.home(), |ops, cx| ops.block(cx, thread.id()));
        }
        previous
    }

    /// Clear `states`; clearing the last bit unblocks the thread
    ///
    /// Returns the previous states.
    pub(crate) fn clear_state(&self, thread: &ThreadControl, states: ThreadStates) -> ThreadStates {
        let mut state = thread.scheduler.lock();
        let previous = state.states;
        if previous.intersects(states) {
            state.states.remove(states);
            if state.states.is_ready() {
                let home = thread.home();
                let key = state.nodes[home].priority.purify();
                self.with_instance(home, |ops, cx| ops.unblock(cx, thread.id(), key));
            }
        }
        previous
    }
}
