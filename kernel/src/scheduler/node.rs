//! Thread-side scheduler node
//!
//! Every thread owns one node per scheduler instance, stored in a table
//! indexed by `SchedulerIndex`. Nodes are linked into the thread's chains
//! (`wait_nodes`, `scheduler_nodes`, pending `requests`) by that index.

use crate::collections::Chain;
use crate::error::FatalSource;
use crate::priority::{Priority, PriorityKey};
use crate::thread::ThreadId;

use super::SchedulerIndex;

/// Pending change of a node's registration in `scheduler_nodes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRequest {
    NotPending,
    Add,
    Remove,
    /// An add and a remove cancelled out
    Nothing,
}

/// Binding of a thread to one scheduler instance
#[derive(Debug, Clone)]
pub struct SchedulerNode {
    pub scheduler: SchedulerIndex,
    pub owner: ThreadId,
    pub sticky_level: u32,
    pub priority: PriorityKey,
    pub request: NodeRequest,
}

impl SchedulerNode {
    pub fn new(scheduler: SchedulerIndex, owner: ThreadId, priority: Priority) -> Self {
        Self {
            scheduler,
            owner,
            sticky_level: 0,
            priority: PriorityKey::append(priority),
            request: NodeRequest::NotPending,
        }
    }
}

/// Queue `request` for `nodes[index]`
///
/// A node is linked on `requests` at most once. A second, opposite request
/// before processing turns the pending one into `Nothing`.
pub(crate) fn add_request(
    nodes: &mut [SchedulerNode],
    requests: &mut Chain<SchedulerIndex>,
    index: SchedulerIndex,
    request: NodeRequest,
) {
    let node = &mut nodes[index];
    match node.request {
        NodeRequest::NotPending => {
            requests.prepend(index);
            node.request = request;
        }
        NodeRequest::Nothing => node.request = request,
        current => {
            crate::score_assert!(
                matches!(
                    (current, request),
                    (NodeRequest::Add, NodeRequest::Remove) | (NodeRequest::Remove, NodeRequest::Add)
                ),
                FatalSource::InternalError,
                "conflicting scheduler node requests"
            );
            node.request = NodeRequest::Nothing;
        }
    }
}

/// Apply and drain every pending request
pub(crate) fn process_requests(
    nodes: &mut [SchedulerNode],
    requests: &mut Chain<SchedulerIndex>,
    scheduler_nodes: &mut Chain<SchedulerIndex>,
) {
    while let Some(index) = requests.get_first() {
        let node = &mut nodes[index];
        match node.request {
            NodeRequest::Add => scheduler_nodes.append(index),
            NodeRequest::Remove => scheduler_nodes.extract(index),
            NodeRequest::Nothing => {}
            NodeRequest::NotPending => crate::error::fatal_error(
                FatalSource::InternalError,
                "request chain holds a node without request",
            ),
        }
        node.request = NodeRequest::NotPending;
    }
}
