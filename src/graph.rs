//! The dependency graph and automatic-tracking primitives (spec §4.1).
//!
//! Node identity lives in a dense [`slotmap::SlotMap`] keyed by [`NodeId`],
//! following the teacher runtime's arena-of-nodes design note rather than a
//! reference-counted graph with cycles: signals, computeds, and effects
//! reference each other constantly, and an arena sidesteps that entirely.

use std::cell::{Cell, RefCell};

use slotmap::SlotMap;

use crate::error::ReactiveError;
use crate::node::{FxIndexSet, GraphNode, NodeId, NodeKind};

#[derive(Default)]
pub(crate) struct Graph {
    nodes: RefCell<SlotMap<NodeId, GraphNode>>,
    observer: Cell<Option<NodeId>>,
}

impl Graph {
    pub fn insert(&self, kind: NodeKind) -> NodeId {
        self.nodes.borrow_mut().insert(GraphNode::new(kind))
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.borrow().get(id).map(|n| n.kind)
    }

    pub fn is_stale(&self, id: NodeId) -> bool {
        self.nodes.borrow().get(id).map(|n| n.stale).unwrap_or(false)
    }

    pub fn set_stale(&self, id: NodeId, stale: bool) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(id) {
            node.stale = stale;
        }
    }

    pub fn is_computing(&self, id: NodeId) -> bool {
        self.nodes
            .borrow()
            .get(id)
            .map(|n| n.computing)
            .unwrap_or(false)
    }

    pub fn set_computing(&self, id: NodeId, computing: bool) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(id) {
            node.computing = computing;
        }
    }

    /// `link(from, to)`: `from` gains `to` as a dependency. Rejects signals
    /// as a source, since `Signal.deps` must always stay empty (spec §3
    /// invariant, enforced here rather than merely documented).
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn link(&self, from: NodeId, to: NodeId) -> Result<(), ReactiveError> {
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get(from).map(|n| n.kind) {
            Some(NodeKind::Signal) => return Err(ReactiveError::IllegalEdge),
            None => return Ok(()), // disposed source: nothing to link
            _ => {}
        }
        if nodes.get(to).is_none() {
            return Ok(()); // disposed target
        }
        if let Some(from_node) = nodes.get_mut(from) {
            from_node.deps.insert(to);
        }
        if let Some(to_node) = nodes.get_mut(to) {
            to_node.subs.insert(from);
        }
        Ok(())
    }

    /// `unlink(from, to)`: removes the bidirectional edge if present.
    pub fn unlink(&self, from: NodeId, to: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(from_node) = nodes.get_mut(from) {
            from_node.deps.shift_remove(&to);
        }
        if let Some(to_node) = nodes.get_mut(to) {
            to_node.subs.shift_remove(&from);
        }
    }

    /// Snapshot of `id`'s current dependencies, for callers that must
    /// iterate while mutating the edge set (recompute/effect-run unlink
    /// steps snapshot first to avoid mutation during iteration, spec §4.5/§4.6).
    pub fn deps_snapshot(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(id)
            .map(|n| n.deps.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn subs_snapshot(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(id)
            .map(|n| n.subs.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Severs every edge touching `id`, in both directions, then removes
    /// the node itself. Used by `Computed::dispose`/`Effect::dispose`.
    pub fn dispose(&self, id: NodeId) {
        let (deps, subs) = {
            let nodes = self.nodes.borrow();
            match nodes.get(id) {
                Some(n) => (
                    n.deps.iter().copied().collect::<Vec<_>>(),
                    n.subs.iter().copied().collect::<Vec<_>>(),
                ),
                None => return,
            }
        };
        for d in deps {
            self.unlink(id, d);
        }
        for s in subs {
            self.unlink(s, id);
        }
        self.nodes.borrow_mut().remove(id);
    }

    pub fn current_observer(&self) -> Option<NodeId> {
        self.observer.get()
    }

    /// Raw swap of the observer slot, with no `Drop`-based restoration of
    /// its own. Paired calls around `f()` at the call site (see
    /// `crate::runtime::with_observer`) give the same panic-safety as
    /// [`Graph::with_observer`] without requiring `f` to run while the
    /// graph itself is borrowed.
    pub fn set_observer_raw(&self, obs: Option<NodeId>) -> Option<NodeId> {
        self.observer.replace(obs)
    }

    /// Scoped acquisition of the current-observer slot (spec §4.1
    /// `withObserver`). Restoration happens via `Drop` so it runs on every
    /// exit path, including a panicking `fn` — the same guarantee a `finally`
    /// block gives in a host with exceptions.
    pub fn with_observer<T>(&self, obs: Option<NodeId>, f: impl FnOnce() -> T) -> T {
        struct Restore<'g> {
            graph: &'g Graph,
            prev: Option<NodeId>,
        }
        impl Drop for Restore<'_> {
            fn drop(&mut self) {
                self.graph.observer.set(self.prev);
            }
        }
        let _restore = Restore {
            graph: self,
            prev: self.observer.replace(obs),
        };
        f()
    }

    /// `track(dep)`: if a current observer exists, links it to `dep`.
    /// A signal can never be the current observer, so the `link` call here
    /// never actually hits `IllegalEdge` in practice; errors are discarded
    /// because `track` itself is infallible from the caller's perspective.
    pub fn track(&self, dep: NodeId) {
        if let Some(observer) = self.observer.get() {
            let _ = self.link(observer, dep);
        }
    }
}
