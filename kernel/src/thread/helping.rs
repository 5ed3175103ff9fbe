//! Helping schedulers and sticky nodes
//!
//! Resource protocols register a thread's node with instances other than
//! its home, so the thread can be found there. Registration changes go
//! through the node request chain of the thread and are applied by
//! `process_requests` under the thread state lock.

use crate::error::{Result, ScoreError};
use crate::object::ObjectId;
use crate::priority::{PriorityKey, PrioritySource};
use crate::scheduler::node::{add_request, process_requests};
use crate::scheduler::{NodeParams, NodeRequest};
use crate::system::System;

use super::ThreadId;

impl System {
    /// Register the node of `id` with instance `scheduler`
    pub fn add_helping_scheduler(&self, id: ThreadId, scheduler: ObjectId) -> Result<()> {
        let scheduler = self.scheduler_by_id(scheduler)?;
        let index = scheduler.index();
        let thread = self.threads().get_user(id)?;

        let mut wait = thread.wait.lock();
        let mut state = thread.scheduler.lock();
        if state.scheduler_nodes.contains(index) || state.nodes[index].request == NodeRequest::Add {
            return Err(ScoreError::ResourceInUse);
        }
        let priority = wait.real_priority;
        if !scheduler.is_valid_priority(priority) {
            return Err(ScoreError::InvalidPriority);
        }

        wait.priorities[index].initialize_one(PrioritySource::Real, priority);
        wait.wait_nodes.append(index);

        let key = PriorityKey::append(priority);
        let state = &mut *state;
        state.nodes[index].priority = key;
        add_request(&mut state.nodes, &mut state.requests, index, NodeRequest::Add);
        process_requests(&mut state.nodes, &mut state.requests, &mut state.scheduler_nodes);

        let params = NodeParams {
            priority: key,
            affinity: state.affinity,
            preemptible: state.preemptible,
            urgency: state.urgency,
        };
        self.with_instance(index, |ops, _| ops.node_initialize(id, params));

        log::debug!("thread {} helps scheduler {}", id, scheduler.name());
        Ok(())
    }

    /// Withdraw the node of `id` from a helped instance
    pub fn remove_helping_scheduler(&self, id: ThreadId, scheduler: ObjectId) -> Result<()> {
        let scheduler = self.scheduler_by_id(scheduler)?;
        let index = scheduler.index();
        let thread = self.threads().get_user(id)?;

        let mut wait = thread.wait.lock();
        let mut state = thread.scheduler.lock();
        if index == thread.home() || !state.scheduler_nodes.contains(index) {
            return Err(ScoreError::IncorrectState);
        }

        wait.priorities[index].clear();
        wait.wait_nodes.extract(index);

        let state = &mut *state;
        add_request(&mut state.nodes, &mut state.requests, index, NodeRequest::Remove);
        process_requests(&mut state.nodes, &mut state.requests, &mut state.scheduler_nodes);
        self.with_instance(index, |ops, cx| ops.node_destroy(cx, id));

        log::debug!("thread {} stops helping scheduler {}", id, scheduler.name());
        Ok(())
    }

    /// Raise the sticky level of the home node
    pub fn make_sticky(&self, id: ThreadId) -> Result<u32> {
        let thread = self.threads().get_user(id)?;
        let home = thread.home();
        let _dispatch = self.dispatch_disable();
        let mut state = thread.scheduler.lock();

        let node = &mut state.nodes[home];
        node.sticky_level += 1;
        let level = node.sticky_level;
        if level == 1 {
            self.with_instance(home, |ops, cx| ops.make_sticky(cx, id));
        }
        Ok(level)
    }

    /// Lower the sticky level of the home node
    pub fn clean_sticky(&self, id: ThreadId) -> Result<u32> {
        let thread = self.threads().get_user(id)?;
        let home = thread.home();
        let _dispatch = self.dispatch_disable();
        let mut state = thread.scheduler.lock();

        let node = &mut state.nodes[home];
        if node.sticky_level == 0 {
            return Err(ScoreError::IncorrectState);
        }
        node.sticky_level -= 1;
        let level = node.sticky_level;
        if level == 0 {
            self.with_instance(home, |ops, cx| ops.clean_sticky(cx, id));
        }
        Ok(level)
    }
}
