//! Simple priority scheduler
//!
//! One priority ordered ready set for the whole instance. Heirs are
//! recomputed from the ready set after every change:
//!
//! 1. sticky nodes whose owner blocked keep their processor, run by the
//!    processor's idle thread
//! 2. non-preemptible threads keep the processor they hold, unless a ready
//!    `Forced` thread of more urgent priority may run there
//! 3. everybody else in ready order; a thread is selected when some
//!    assignment of the remaining processors fits it and every thread
//!    selected before it
//!
//! Selection walks augmenting paths, so a wide affinity thread moves aside
//! for a pinned one instead of leaving a processor to its idle thread.
//! Selected threads that already hold a processor keep it where possible.
//! Idle threads are ready at the instance's maximum priority and pinned to
//! their processor, so every owned processor always has a heir.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::collections::{new_map, KernelHashMap};
use crate::error::FatalSource;
use crate::priority::PriorityKey;
use crate::processor::{CpuIndex, ProcessorMask};
use crate::thread::ThreadId;

use super::ops::{NodeParams, SchedulerOperations};
use super::ready::{NodeLink, ReadySet, ReadySetKind};
use super::{DispatchContext, DispatchUrgency};

#[derive(Debug, Clone)]
struct ContextNode {
    priority: PriorityKey,
    affinity: ProcessorMask,
    preemptible: bool,
    urgency: DispatchUrgency,
    idle: bool,
    sticky: bool,
    owner_blocked: bool,
    link: NodeLink,
    cpu: Option<CpuIndex>,
}

#[derive(Debug, Clone, Copy)]
struct CpuSlot {
    idle: ThreadId,
    /// Thread whose node holds the processor
    holder: Option<ThreadId>,
    /// Thread selected to run (the idle thread for a blocked sticky holder)
    heir: Option<ThreadId>,
}

/// Processor assignment under construction
struct Placement {
    online: ProcessorMask,
    free: ProcessorMask,
    /// Processors whose holder may not be moved
    fixed: ProcessorMask,
    holders: BTreeMap<CpuIndex, ThreadId>,
    placed: KernelHashMap<ThreadId, CpuIndex>,
}

impl Placement {
    fn new(online: ProcessorMask) -> Self {
        Self {
            online,
            free: online,
            fixed: ProcessorMask::empty(),
            holders: BTreeMap::new(),
            placed: new_map(),
        }
    }

    fn take(&mut self, thread: ThreadId, cpu: CpuIndex) {
        self.free.clear(cpu);
        self.holders.insert(cpu, thread);
        self.placed.insert(thread, cpu);
    }

    fn pin(&mut self, thread: ThreadId, cpu: CpuIndex) {
        self.take(thread, cpu);
        self.fixed.set(cpu);
    }

    fn is_placed(&self, thread: ThreadId) -> bool {
        self.placed.contains_key(&thread)
    }
}

/// Simple priority scheduler context
pub struct SimpleScheduler {
    ready: ReadySet,
    nodes: KernelHashMap<ThreadId, ContextNode>,
    slots: BTreeMap<CpuIndex, CpuSlot>,
}

impl SimpleScheduler {
    pub fn new(kind: ReadySetKind) -> Self {
        Self {
            ready: ReadySet::new(kind),
            nodes: new_map(),
            slots: BTreeMap::new(),
        }
    }

    fn node_mut(&mut self, thread: ThreadId) -> &mut ContextNode {
        match self.nodes.get_mut(&thread) {
            Some(node) => node,
            None => crate::error::fatal_error(FatalSource::InternalError, "thread without scheduler node"),
        }
    }

    fn insert(&mut self, thread: ThreadId, key: PriorityKey) {
        let Self { ready, nodes, .. } = self;
        let link = ready.insert(thread, key, |queued| {
            nodes.get(&queued).map_or(u64::MAX, |node| node.priority.priority())
        });
        let node = self.node_mut(thread);
        node.priority = key;
        node.link = link;
    }

    fn extract(&mut self, thread: ThreadId) -> bool {
        let node = self.node_mut(thread);
        let link = core::mem::replace(&mut node.link, NodeLink::Off);
        if link.is_linked() {
            self.ready.extract(thread, link);
            true
        } else {
            false
        }
    }

    fn holds_processor(&self, thread: ThreadId) -> bool {
        self.slots.values().any(|slot| slot.holder == Some(thread))
    }

    /// Recompute every heir of the instance
    fn allocate(&mut self, cx: &mut DispatchContext<'_>) {
        let order = self.ready.order();
        let online: ProcessorMask = self
            .slots
            .keys()
            .copied()
            .filter(|&cpu| cx.processors().is_set(cpu))
            .collect();

        // which threads run
        let mut selection = self.reserve(&order, online);
        for &thread in &order {
            if selection.free.is_zero() {
                break;
            }
            self.place(&mut selection, thread);
        }

        // where they run: current holders stay put, the rest fit around them
        let mut placement = self.reserve(&order, online);
        for &thread in &order {
            let node = &self.nodes[&thread];
            if node.idle || !selection.is_placed(thread) || placement.is_placed(thread) {
                continue;
            }
            let held = self
                .held_processor(thread)
                .filter(|&cpu| placement.free.is_set(cpu) && node.affinity.is_set(cpu));
            if let Some(cpu) = held {
                placement.take(thread, cpu);
            }
        }
        for &thread in &order {
            if selection.is_placed(thread) && !placement.is_placed(thread) {
                let placed = self.place(&mut placement, thread);
                crate::score_assert!(placed || self.nodes[&thread].idle, "selected thread left unplaced");
            }
        }

        for (&cpu, slot) in self.slots.iter_mut() {
            let holder = placement.holders.get(&cpu).copied();
            let user = match holder {
                Some(thread) if !self.nodes[&thread].owner_blocked => thread,
                _ => slot.idle,
            };
            slot.holder = holder;
            if slot.heir != Some(user) {
                slot.heir = Some(user);
                cx.update_heir(cpu, user);
            }
        }

        for (thread, cpu) in placement.placed {
            if let Some(node) = self.nodes.get_mut(&thread) {
                node.cpu = Some(cpu);
            }
        }
    }

    /// Processors kept by blocked sticky nodes and non-preemptible holders
    fn reserve(&self, order: &[ThreadId], online: ProcessorMask) -> Placement {
        let mut placement = Placement::new(online);

        for &thread in order {
            let node = &self.nodes[&thread];
            if node.sticky && node.owner_blocked {
                if let Some(cpu) = node.cpu.filter(|&cpu| placement.free.is_set(cpu)) {
                    placement.pin(thread, cpu);
                }
            }
        }

        for cpu in online.iter() {
            if !placement.free.is_set(cpu) {
                continue;
            }
            let Some(holder) = self.slots[&cpu].holder else {
                continue;
            };
            let Some(node) = self.nodes.get(&holder) else {
                continue;
            };
            if node.link.is_linked()
                && !node.preemptible
                && !node.idle
                && !node.owner_blocked
                && node.affinity.is_set(cpu)
                && !placement.is_placed(holder)
                && !self.forced_preempts(order, node, cpu)
            {
                placement.pin(holder, cpu);
            }
        }
        placement
    }

    fn held_processor(&self, thread: ThreadId) -> Option<CpuIndex> {
        self.slots
            .iter()
            .find(|(_, slot)| slot.holder == Some(thread))
            .map(|(&cpu, _)| cpu)
    }

    /// Try to give `thread` a processor; idle threads only take their own
    fn place(&self, placement: &mut Placement, thread: ThreadId) -> bool {
        let node = &self.nodes[&thread];
        if node.owner_blocked || placement.is_placed(thread) {
            return false;
        }
        if node.idle {
            return match node.cpu.filter(|&cpu| placement.free.is_set(cpu)) {
                Some(cpu) => {
                    placement.take(thread, cpu);
                    true
                }
                None => false,
            };
        }
        let mut visited = ProcessorMask::empty();
        self.augment(placement, thread, &mut visited)
    }

    /// A ready `Forced` thread more urgent than `holder` may run on `cpu`
    fn forced_preempts(&self, order: &[ThreadId], holder: &ContextNode, cpu: CpuIndex) -> bool {
        let limit = holder.priority.priority();
        order
            .iter()
            .map(|thread| &self.nodes[thread])
            .take_while(|node| node.priority.priority() < limit)
            .any(|node| {
                node.urgency == DispatchUrgency::Forced
                    && !node.owner_blocked
                    && Self::candidates(node).is_set(cpu)
            })
    }

    /// Place `thread`, moving already placed threads to other processors of
    /// their affinity when that frees one for it
    ///
    /// Placed threads stay placed; `visited` collects the processors
    /// already tried on this path.
    fn augment(&self, placement: &mut Placement, thread: ThreadId, visited: &mut ProcessorMask) -> bool {
        let node = &self.nodes[&thread];
        let candidates = Self::candidates(node)
            .and(&placement.online)
            .and_not(&placement.fixed);

        if let Some(cpu) = Self::by_preference(node, candidates.and(&placement.free)).next() {
            placement.take(thread, cpu);
            return true;
        }

        for cpu in Self::by_preference(node, candidates) {
            if visited.is_set(cpu) {
                continue;
            }
            visited.set(cpu);
            let Some(&occupant) = placement.holders.get(&cpu) else {
                continue;
            };
            if self.augment(placement, occupant, visited) {
                placement.take(thread, cpu);
                return true;
            }
        }
        false
    }

    /// Processors `node` may run on
    fn candidates(node: &ContextNode) -> ProcessorMask {
        if node.idle {
            node.cpu.map_or(ProcessorMask::empty(), ProcessorMask::single)
        } else {
            node.affinity
        }
    }

    /// Processors of `mask`, the node's previous one first
    fn by_preference(node: &ContextNode, mask: ProcessorMask) -> impl Iterator<Item = CpuIndex> {
        let previous = node.cpu.filter(|&cpu| mask.is_set(cpu));
        let mut rest = mask;
        if let Some(cpu) = previous {
            rest.clear(cpu);
        }
        previous.into_iter().chain(rest.iter())
    }
}

impl SchedulerOperations for SimpleScheduler {
    fn name(&self) -> &'static str {
        match self.ready.kind() {
            ReadySetKind::Chain => "simple",
            ReadySetKind::Tree => "simple-tree",
        }
    }

    fn node_initialize(&mut self, thread: ThreadId, params: NodeParams) {
        let node = ContextNode {
            priority: params.priority,
            affinity: params.affinity,
            preemptible: params.preemptible,
            urgency: params.urgency,
            idle: false,
            sticky: false,
            owner_blocked: false,
            link: NodeLink::Off,
            cpu: None,
        };
        let previous = self.nodes.insert(thread, node);
        crate::score_assert!(previous.is_none(), "scheduler node initialized twice");
    }

    fn node_destroy(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId) {
        if !self.nodes.contains_key(&thread) {
            return;
        }
        let was_ready = self.extract(thread);
        self.nodes.remove(&thread);
        if was_ready || self.holds_processor(thread) {
            self.allocate(cx);
        }
    }

    fn unblock(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId, key: PriorityKey) {
        let node = self.node_mut(thread);
        node.owner_blocked = false;
        self.extract(thread);
        self.insert(thread, key);
        self.allocate(cx);
    }

    fn block(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId) {
        let node = self.node_mut(thread);
        if !node.link.is_linked() {
            return;
        }
        if node.sticky && self.holds_processor(thread) {
            self.node_mut(thread).owner_blocked = true;
        } else {
            self.extract(thread);
        }
        self.allocate(cx);
    }

    fn yield_thread(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId) {
        let node = self.node_mut(thread);
        if !node.link.is_linked() || node.owner_blocked {
            return;
        }
        let key = node.priority.purify();
        self.extract(thread);
        self.insert(thread, key);
        self.allocate(cx);
    }

    fn update_priority(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId, key: PriorityKey) {
        let node = self.node_mut(thread);
        if !node.link.is_linked() {
            node.priority = key;
            return;
        }
        self.extract(thread);
        self.insert(thread, key);
        self.allocate(cx);
    }

    fn set_affinity(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId, affinity: ProcessorMask) {
        let node = self.node_mut(thread);
        node.affinity = affinity;
        if node.link.is_linked() {
            self.allocate(cx);
        }
    }

    fn make_sticky(&mut self, _cx: &mut DispatchContext<'_>, thread: ThreadId) {
        self.node_mut(thread).sticky = true;
    }

    fn clean_sticky(&mut self, cx: &mut DispatchContext<'_>, thread: ThreadId) {
        let node = self.node_mut(thread);
        node.sticky = false;
        if node.owner_blocked {
            node.owner_blocked = false;
            self.extract(thread);
            self.allocate(cx);
        }
    }

    fn add_processor(&mut self, cx: &mut DispatchContext<'_>, cpu: CpuIndex, idle: ThreadId, key: PriorityKey) {
        crate::score_assert!(!self.slots.contains_key(&cpu), "processor added twice");
        self.slots.insert(cpu, CpuSlot { idle, holder: None, heir: None });

        let node = ContextNode {
            priority: key,
            affinity: ProcessorMask::single(cpu),
            preemptible: true,
            urgency: DispatchUrgency::Normal,
            idle: true,
            sticky: false,
            owner_blocked: false,
            link: NodeLink::Off,
            cpu: Some(cpu),
        };
        self.nodes.insert(idle, node);
        self.insert(idle, key);
        self.allocate(cx);
    }

    fn remove_processor(&mut self, cx: &mut DispatchContext<'_>, cpu: CpuIndex) -> ThreadId {
        let Some(slot) = self.slots.remove(&cpu) else {
            crate::error::fatal_error(FatalSource::InternalError, "removal of a processor not owned");
        };
        let idle = slot.idle;
        self.extract(idle);
        self.nodes.remove(&idle);

        if slot.heir != Some(idle) {
            cx.update_heir(cpu, idle);
        }
        self.allocate(cx);
        idle
    }

    fn heir(&self, cpu: CpuIndex) -> Option<ThreadId> {
        self.slots.get(&cpu).and_then(|slot| slot.heir)
    }

    fn user(&self, thread: ThreadId) -> Option<ThreadId> {
        self.slots
            .values()
            .find(|slot| slot.holder == Some(thread))
            .and_then(|slot| slot.heir)
    }

    fn ready_order(&self) -> Vec<ThreadId> {
        self.ready.order()
    }

    fn is_ready(&self, thread: ThreadId) -> bool {
        self.nodes
            .get(&thread)
            .map_or(false, |node| node.link.is_linked() && !node.owner_blocked)
    }
}
