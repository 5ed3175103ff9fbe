//! Thread priority directives
//!
//! The real priority and every donation are contributions to the
//! aggregation of the home instance. Whenever its minimum changes, the
//! home node gets the new key and the instance re-positions the thread
//! before the directive returns.

use crate::error::{Result, ScoreError};
use crate::priority::{Priority, PriorityChange, PriorityKey, PrioritySource};
use crate::scheduler::SchedulerIndex;
use crate::system::System;

use super::control::ThreadWait;
use super::{ThreadControl, ThreadId};

impl System {
    /// Effective priority of `id` in its home instance
    pub fn get_priority(&self, id: ThreadId) -> Result<Priority> {
        let thread = self.threads().get(id)?;
        let home = thread.home();
        let wait = thread.wait.lock();
        wait.priorities[home].minimum().ok_or(ScoreError::IncorrectState)
    }

    pub fn get_real_priority(&self, id: ThreadId) -> Result<Priority> {
        let thread = self.threads().get(id)?;
        let priority = thread.wait.lock().real_priority;
        Ok(priority)
    }

    /// Set the real priority of `id`
    ///
    /// With `prepend` the thread goes in front of the ready threads of its
    /// new priority instead of behind them.
    ///
    /// The priority must be valid in every instance the thread is
    /// registered with, its home and the ones it helps.
    pub fn change_priority(&self, id: ThreadId, priority: Priority, prepend: bool) -> Result<Priority> {
        let thread = self.threads().get_user(id)?;

        let _dispatch = self.dispatch_disable();
        let mut wait = thread.wait.lock();
        let registered: alloc::vec::Vec<SchedulerIndex> = wait.wait_nodes.iter().collect();
        for &index in &registered {
            if !self.scheduler_by_index(index).is_valid_priority(priority) {
                return Err(ScoreError::InvalidPriority);
            }
            if wait.priorities[index].contribution(PrioritySource::Real).is_none() {
                return Err(ScoreError::IncorrectState);
            }
        }

        let old = core::mem::replace(&mut wait.real_priority, priority);
        for index in registered {
            let change = wait.priorities[index].change(PrioritySource::Real, priority)?;
            if change.changed() {
                self.apply_priority(&thread, &*wait, index, change, prepend);
            }
        }
        Ok(old)
    }

    /// Boost `id` with a donation from `source`
    pub fn add_priority_donation(&self, id: ThreadId, source: u32, priority: Priority) -> Result<()> {
        self.update_donation(id, Some(priority), |wait, home| {
            wait.priorities[home].insert(PrioritySource::Donation(source), priority)
        })
    }

    pub fn change_priority_donation(&self, id: ThreadId, source: u32, priority: Priority) -> Result<()> {
        self.update_donation(id, Some(priority), |wait, home| {
            wait.priorities[home].change(PrioritySource::Donation(source), priority)
        })
    }

    pub fn remove_priority_donation(&self, id: ThreadId, source: u32) -> Result<()> {
        self.update_donation(id, None, |wait, home| {
            wait.priorities[home].extract(PrioritySource::Donation(source))
        })
    }

    fn update_donation<F>(&self, id: ThreadId, priority: Option<Priority>, update: F) -> Result<()>
    where
        F: FnOnce(&mut ThreadWait, SchedulerIndex) -> Result<PriorityChange>,
    {
        let thread = self.threads().get_user(id)?;
        let home = thread.home();
        if let Some(priority) = priority {
            if !self.scheduler_by_index(home).is_valid_priority(priority) {
                return Err(ScoreError::InvalidPriority);
            }
        }

        let _dispatch = self.dispatch_disable();
        let mut wait = thread.wait.lock();
        let change = update(&mut *wait, home)?;
        if change.changed() {
            self.apply_priority(&thread, &*wait, home, change, false);
        }
        Ok(())
    }

    /// Publish the aggregation minimum of `index` to the node and instance
    fn apply_priority(
        &self,
        thread: &ThreadControl,
        _wait: &ThreadWait,
        index: SchedulerIndex,
        change: PriorityChange,
        prepend: bool,
    ) {
        let Some(priority) = change.new else {
            return;
        };
        let key = PriorityKey::new(priority, prepend);
        let mut state = thread.scheduler.lock();
        state.nodes[index].priority = key;
        self.with_instance(index, |ops, cx| ops.update_priority(cx, thread.id(), key));
        drop(state);

        log::debug!("thread {}: priority {:?} -> {} on {}", thread.id(), change.old, priority, index);
    }
}
