use core::hash::BuildHasherDefault;
use indexmap::IndexSet;
use rustc_hash::FxHasher;

slotmap::new_key_type! {
    /// Dense arena key identifying a node (signal, computed, or effect) in
    /// the dependency graph. Never exposed without a typed handle wrapped
    /// around it.
    pub struct NodeId;
}

pub(crate) type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// Which of the three node kinds a [`NodeId`] refers to. Immutable after
/// creation (spec §3: "`kind` — immutable after creation").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Signal,
    Computed,
    Effect,
}

/// The kind-agnostic bookkeeping the graph needs for every node: its edges
/// and the two bits of state (`stale`, `computing`) that only computeds use.
/// Keeping these on one uniform record (rather than splitting by kind)
/// mirrors the teacher runtime's single `ReactiveNode` arena entry, even
/// though a couple of fields go unused for signals and effects.
pub(crate) struct GraphNode {
    pub kind: NodeKind,
    pub deps: FxIndexSet<NodeId>,
    pub subs: FxIndexSet<NodeId>,
    pub stale: bool,
    pub computing: bool,
}

impl GraphNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            deps: FxIndexSet::default(),
            subs: FxIndexSet::default(),
            // computeds start stale (spec §3: "stale: bool (initially true)")
            stale: matches!(kind, NodeKind::Computed),
            computing: false,
        }
    }
}
