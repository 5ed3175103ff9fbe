//! Scheduler operations - the algorithm seam
//!
//! An instance's algorithm sees only thread ids and the parameters copied
//! into its own nodes; it never locks a thread. Every call runs under the
//! instance lock and publishes heir changes through the `DispatchContext`.

use alloc::vec::Vec;

use crate::priority::PriorityKey;
use crate::processor::{CpuIndex, ProcessorMask};
use crate::thread::ThreadId;

use super::{DispatchContext, DispatchUrgency};

/// Scheduling parameters of a thread, copied into the algorithm's node
#[derive(Debug, Clone, Copy)]
pub struct NodeParams {
    pub priority: PriorityKey,
    pub affinity: ProcessorMask,
    pub preemptible: bool,
    pub urgency: DispatchUrgency,
}

/// Operations every scheduling algorithm provides
pub trait SchedulerOperations: Send {
    /// Name of the algorithm for diagnostics
    fn name(&self) -> &'static str;

    /// Create the algorithm node of `thread` (not ready)
    fn node_initialize(&mut self, thread: ThreadId, params: NodeParams);

    /// Forget `thread`; a ready node is extracted first
    fn node_destroy(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId);

    /// `thread` became ready with priority `key`
    fn unblock(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId, key: PriorityKey);

    /// `thread` stopped being ready
    fn block(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId);

    /// Move `thread` behind the ready threads of its priority
    fn yield_thread(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId);

    /// New priority of `thread`; a ready node is re-inserted
    fn update_priority(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId, key: PriorityKey);

    fn set_affinity(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId, affinity: ProcessorMask);

    /// Sticky level of `thread` became non-zero
    fn make_sticky(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId);

    /// Sticky level of `thread` dropped back to zero
    fn clean_sticky(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId);

    /// Take `cpu` with `idle` as its filler thread
    fn add_processor(&mut self, cx: &mut DispatchContext<'_>, cpu: CpuIndex, idle: ThreadId, key: PriorityKey);

    /// Give up `cpu`; returns its idle thread
    fn remove_processor(&mut self, cx: &mut DispatchContext<'_>, cpu: CpuIndex) -> ThreadId;

    /// Heir selected for `cpu`
    fn heir(&self, cpu: CpuIndex) -> Option<ThreadId>;

    /// Thread currently using the node of `thread`, if it is scheduled
    fn user(&self, thread: ThreadId) -> Option<ThreadId>;

    /// Ready threads, most eligible first
    fn ready_order(&self) -> Vec<ThreadId>;

    fn is_ready(&self, thread: ThreadId) -> bool;
}
