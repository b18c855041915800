use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::Result;
use crate::event::{ActionKind, Event};
use crate::formula::{HnaFormula, HnaNodeType};
use crate::monitor::Monitor;
use crate::trace::TraceId;
use crate::verdict::Verdict;

pub(crate) type NodeId = u32;

/// A node of the slice tree: an HNL sub-monitor plus its node type.
pub struct SliceTreeNode<H: HnaFormula> {
    id: NodeId,
    ty: HnaNodeType,
    monitor: H::Sub,
}

impl<H: HnaFormula> SliceTreeNode<H> {
    fn new(id: NodeId, ty: HnaNodeType) -> Self {
        SliceTreeNode {
            id,
            ty,
            monitor: H::create_monitor(ty),
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    /// The node type selecting this node's sub-monitor variant.
    pub fn node_type(&self) -> HnaNodeType {
        self.ty
    }

    /// Register a trace on this node's sub-monitor.
    pub fn new_trace(&self, trace_id: TraceId) -> Result<()> {
        self.monitor.new_trace(trace_id)
    }

    /// Extend a trace of this node's sub-monitor.
    pub fn extend_trace(&self, trace_id: TraceId, ev: Event) -> Result<()> {
        self.monitor.extend_trace(trace_id, ev)
    }

    /// Notify this node's sub-monitor that a trace ended here.
    pub fn trace_finished(&self, trace_id: TraceId) -> Result<()> {
        self.monitor.trace_finished(trace_id)
    }

    /// Propagate the no-future-updates signal into the sub-monitor.
    pub fn no_future_updates(&self) {
        self.monitor.no_future_updates()
    }

    /// Whether the sub-monitor has a trace with this id.
    pub fn has_trace(&self, trace_id: TraceId) -> bool {
        self.monitor.has_trace(trace_id)
    }

    /// Step the sub-monitor.
    pub fn step(&self) -> Verdict {
        self.monitor.step()
    }
}

/// The tree of HNL sub-monitors of a hypernode automaton.
///
/// Nodes are created on demand when a trace first takes an action edge; the
/// producer thread stages them into `new_nodes` under a lock and the
/// consumer splices them into the node list with
/// [`ensure_nodes`](SliceTree::ensure_nodes) before stepping.
pub struct SliceTree<H: HnaFormula> {
    root: Arc<SliceTreeNode<H>>,
    nodes: Mutex<Vec<Arc<SliceTreeNode<H>>>>,
    new_nodes: Mutex<Vec<Arc<SliceTreeNode<H>>>>,
    edges: Mutex<HashMap<(NodeId, ActionKind), Arc<SliceTreeNode<H>>>>,
    next_id: AtomicU32,
}

impl<H: HnaFormula> SliceTree<H> {
    /// Create a tree holding only the root node.
    pub fn new() -> Self {
        let root = Arc::new(SliceTreeNode::new(0, H::ROOT));
        SliceTree {
            nodes: Mutex::new(vec![Arc::clone(&root)]),
            root,
            new_nodes: Mutex::new(Vec::new()),
            edges: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The root node.
    pub fn root(&self) -> &Arc<SliceTreeNode<H>> {
        &self.root
    }

    /// The existing successor of `node` under `action`, if any.
    pub fn successor(
        &self,
        node: &SliceTreeNode<H>,
        action: ActionKind,
    ) -> Option<Arc<SliceTreeNode<H>>> {
        Self::lock(&self.edges).get(&(node.id, action)).cloned()
    }

    /// Create the successor slice of `node` under `action`.
    ///
    /// Returns `None` when the transition table marks the edge invalid, in
    /// which case the automaton rejects the trace taking it.
    pub fn add_slice(
        &self,
        node: &SliceTreeNode<H>,
        action: ActionKind,
    ) -> Option<Arc<SliceTreeNode<H>>> {
        debug_assert!(self.successor(node, action).is_none());

        let next_type = H::next_node(node.ty, action)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slice = Arc::new(SliceTreeNode::new(id, next_type));

        Self::lock(&self.edges).insert((node.id, action), Arc::clone(&slice));
        Self::lock(&self.new_nodes).push(Arc::clone(&slice));
        debug!(from = node.id, %action, node = id, "created slice-tree node");

        Some(slice)
    }

    /// Splice the staged nodes into the node list. Called by the consumer
    /// before iterating.
    pub fn ensure_nodes(&self) {
        let mut staged = Self::lock(&self.new_nodes);
        if !staged.is_empty() {
            Self::lock(&self.nodes).append(&mut staged);
        }
    }

    /// Snapshot of the node list, the root included.
    pub fn nodes(&self) -> Vec<Arc<SliceTreeNode<H>>> {
        Self::lock(&self.nodes).clone()
    }

    /// Number of nodes, staged ones included.
    pub fn num_nodes(&self) -> usize {
        let live = Self::lock(&self.nodes).len();
        let staged = Self::lock(&self.new_nodes).len();
        live + staged
    }
}

impl<H: HnaFormula> Default for SliceTree<H> {
    fn default() -> Self {
        Self::new()
    }
}
