//! Ties the graph, registry, and scheduler into the single per-thread
//! runtime instance, following the teacher's `thread_local! { static
//! RUNTIME: Runtime = Runtime::new() }` pattern rather than a
//! reference-counted, explicitly-passed context: this crate targets
//! exactly the "one runtime instance per thread" model spec.md §5 asks for
//! ("A runtime instance is bound to one thread/task"), so there is no
//! multi-runtime indirection (no `RuntimeId`) to carry around.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ReactiveError;
use crate::graph::Graph;
use crate::node::{NodeId, NodeKind};
use crate::registry::Registry;
use crate::scheduler::{PanicPayload, Scheduler};

/// The seam devtools would attach to (spec §6: "may call
/// `registerNode`/`unregisterNode`/`recordUpdate`/`withTiming` hooks on
/// node creation, write, and effect/computed execution"). All methods are
/// no-ops by default; implementing this crate's observability is entirely
/// out of scope (spec §1 non-goals), this trait only exists so a host can
/// wire one in without the runtime knowing anything about it.
pub trait ReactiveObserver {
    fn node_created(&self, _id: NodeId, _kind: &'static str) {}
    fn node_disposed(&self, _id: NodeId) {}
    fn signal_written(&self, _id: NodeId) {}
    fn computation_ran(&self, _id: NodeId, _kind: &'static str) {}
}

struct NoopObserver;
impl ReactiveObserver for NoopObserver {}

thread_local! {
    pub(crate) static RUNTIME: Runtime = Runtime::new();
}

pub(crate) struct Runtime {
    pub(crate) graph: Graph,
    pub(crate) registry: Registry,
    pub(crate) scheduler: Scheduler,
    observer: RefCell<Rc<dyn ReactiveObserver>>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            graph: Graph::default(),
            registry: Registry::default(),
            scheduler: Scheduler::default(),
            observer: RefCell::new(Rc::new(NoopObserver)),
        }
    }

    /// `markStale` (spec §4.5): the canonical propagation routine for a
    /// single `Computed` node — no-op on anything else, and idempotent via
    /// the `stale` short-circuit. Used directly by ordinary signal-write
    /// fan-out (`propagate_to`) and, during atomic rollback, by
    /// `mark_stale_downstream_of_restore` once per directly-affected
    /// computed. Any effect scheduling this triggers further downstream is
    /// still safe to reach during rollback: `Scheduler::schedule_job`
    /// silently drops it because `muted > 0`.
    pub(crate) fn mark_stale(&self, node: NodeId) {
        if self.graph.kind(node) != Some(NodeKind::Computed) {
            return;
        }
        if self.graph.is_stale(node) {
            return;
        }
        self.graph.set_stale(node, true);
        for sub in self.graph.subs_snapshot(node) {
            self.propagate_to(sub);
        }
    }

    fn propagate_to(&self, node: NodeId) {
        match self.graph.kind(node) {
            Some(NodeKind::Computed) => self.mark_stale(node),
            Some(NodeKind::Effect) => self.schedule_effect(node),
            _ => {}
        }
    }

    fn schedule_effect(&self, node: NodeId) {
        if let Some(job) = self.registry.get(node) {
            self.scheduler.schedule_job(job);
        }
    }

    /// Fan-out from a signal write (spec §4.4 step 5): notify every direct
    /// subscriber, whichever kind it is.
    pub(crate) fn notify_subs(&self, signal_id: NodeId) {
        for sub in self.graph.subs_snapshot(signal_id) {
            self.propagate_to(sub);
        }
    }

    /// Rollback-restore propagation (spec §4.3 rollback: "If the node is a
    /// signal, for every downstream computed in its subs, call `markStale`
    /// on it"). Unlike `notify_subs`, this walks only the `Computed` subs of
    /// `node` directly rather than going through `propagate_to` for every
    /// sub — `mark_stale` on `node` itself would be a no-op since `node` is
    /// the restored signal's id, not a computed's.
    pub(crate) fn mark_stale_downstream_of_restore(&self, node: NodeId) {
        for sub in self.graph.subs_snapshot(node) {
            if self.graph.kind(sub) == Some(NodeKind::Computed) {
                self.mark_stale(sub);
            }
        }
    }

    pub(crate) fn observer(&self) -> Rc<dyn ReactiveObserver> {
        self.observer.borrow().clone()
    }
}

pub(crate) fn with_runtime<T>(f: impl FnOnce(&Runtime) -> T) -> T {
    RUNTIME.with(f)
}

/// Installs a devtools/metrics observer for the calling thread's runtime.
/// See [`ReactiveObserver`].
pub fn set_observer(observer: impl ReactiveObserver + 'static) {
    with_runtime(|rt| *rt.observer.borrow_mut() = Rc::new(observer));
}

/// Configures the `flush_jobs` infinite-update-loop guard (default 10,000,
/// spec §4.3). Exposed so tests can exercise `InfiniteUpdateLoop` cheaply.
pub fn set_flush_guard_limit(limit: usize) {
    with_runtime(|rt| rt.scheduler.set_flush_guard_limit(limit));
}

/// Installs a sink for panics caught while isolating one job or cleanup
/// callback from the rest of its flush round (spec §7).
pub fn set_error_hook(hook: impl Fn(PanicPayload) + 'static) {
    with_runtime(|rt| rt.scheduler.set_error_hook(hook));
}

/// `batch(fn)` (spec §4.3).
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    struct BatchGuard;
    impl Drop for BatchGuard {
        fn drop(&mut self) {
            with_runtime(|rt| rt.scheduler.exit_batch());
        }
    }
    with_runtime(|rt| rt.scheduler.enter_batch());
    let _guard = BatchGuard;
    f()
}

/// `atomic(fn)` for a synchronous body: commits on `Ok`, rolls back and
/// rethrows on `Err` or on panic (spec §4.3, §5).
pub fn atomic<T, E>(f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    with_runtime(|rt| rt.scheduler.enter_atomic());
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(Ok(value)) => {
            with_runtime(|rt| rt.scheduler.exit_commit());
            Ok(value)
        }
        Ok(Err(e)) => {
            rollback();
            Err(e)
        }
        Err(payload) => {
            rollback();
            std::panic::resume_unwind(payload)
        }
    }
}

/// `transaction(fn)` — spec §4.3: "equivalent to `atomic(fn)`".
pub fn transaction<T, E>(f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    atomic(f)
}

fn rollback() {
    let entries = with_runtime(|rt| rt.scheduler.begin_rollback());
    for (node, restore) in entries {
        restore();
        with_runtime(|rt| rt.mark_stale_downstream_of_restore(node));
    }
    with_runtime(|rt| rt.scheduler.finish_rollback());
}

/// `atomic(fn)` for an asynchronous body: the scope spans every `.await`
/// inside `f`, per spec §5. The guard's `Drop` rolls back if the future is
/// dropped before settling (cancellation) or the body panics mid-poll, the
/// same way a synchronous panic does.
pub async fn atomic_async<T, E, Fut>(f: impl FnOnce() -> Fut) -> Result<T, E>
where
    Fut: std::future::Future<Output = Result<T, E>>,
{
    with_runtime(|rt| rt.scheduler.enter_atomic());

    struct RollbackOnDrop {
        armed: std::cell::Cell<bool>,
    }
    impl Drop for RollbackOnDrop {
        fn drop(&mut self) {
            if self.armed.get() {
                rollback();
            }
        }
    }
    let guard = RollbackOnDrop {
        armed: std::cell::Cell::new(true),
    };

    let result = f().await;
    guard.armed.set(false);

    match result {
        Ok(value) => {
            with_runtime(|rt| rt.scheduler.exit_commit());
            Ok(value)
        }
        Err(e) => {
            rollback();
            Err(e)
        }
    }
}

/// `transaction(fn)` async counterpart.
pub async fn transaction_async<T, E, Fut>(f: impl FnOnce() -> Fut) -> Result<T, E>
where
    Fut: std::future::Future<Output = Result<T, E>>,
{
    atomic_async(f).await
}

/// `inAtomic()`.
pub fn in_atomic() -> bool {
    with_runtime(|rt| rt.scheduler.in_atomic())
}

/// `flushSync()`.
pub fn flush_sync() {
    with_runtime(|rt| rt.scheduler.flush_sync());
}

pub(crate) fn link(from: NodeId, to: NodeId) -> Result<(), ReactiveError> {
    with_runtime(|rt| rt.graph.link(from, to))
}

pub(crate) fn unlink(from: NodeId, to: NodeId) {
    with_runtime(|rt| rt.graph.unlink(from, to));
}

pub(crate) fn track(dep: NodeId) {
    with_runtime(|rt| rt.graph.track(dep));
}

/// Scoped current-observer acquisition. The graph owns the raw swap; the
/// restoration guard lives here so `f()` can itself call back into
/// `with_runtime` without the graph being borrowed across the call.
pub(crate) fn with_observer<T>(obs: Option<NodeId>, f: impl FnOnce() -> T) -> T {
    let prev = with_runtime(|rt| rt.graph.set_observer_raw(obs));
    struct Restore(Option<NodeId>);
    impl Drop for Restore {
        fn drop(&mut self) {
            with_runtime(|rt| rt.graph.set_observer_raw(self.0));
        }
    }
    let _restore = Restore(prev);
    f()
}

pub(crate) fn insert_node(kind: NodeKind) -> NodeId {
    with_runtime(|rt| rt.graph.insert(kind))
}

pub(crate) fn dispose_node(id: NodeId) {
    with_runtime(|rt| {
        rt.graph.dispose(id);
        rt.registry.delete(id);
        rt.observer().node_disposed(id);
    });
}

pub(crate) fn deps_snapshot(id: NodeId) -> Vec<NodeId> {
    with_runtime(|rt| rt.graph.deps_snapshot(id))
}

pub(crate) fn is_stale(id: NodeId) -> bool {
    with_runtime(|rt| rt.graph.is_stale(id))
}

pub(crate) fn set_stale(id: NodeId, stale: bool) {
    with_runtime(|rt| rt.graph.set_stale(id, stale));
}

pub(crate) fn is_computing(id: NodeId) -> bool {
    with_runtime(|rt| rt.graph.is_computing(id))
}

pub(crate) fn set_computing(id: NodeId, computing: bool) {
    with_runtime(|rt| rt.graph.set_computing(id, computing));
}

pub(crate) fn registry_set(id: NodeId, job: Rc<dyn crate::registry::Job>) {
    with_runtime(|rt| rt.registry.set(id, job));
}

/// Records the pre-write value of `node` in the innermost active atomic
/// write log, if any (spec §4.3 `recordAtomicWrite`).
pub(crate) fn record_atomic_write(node: NodeId, restore: impl FnOnce() + 'static) {
    with_runtime(|rt| rt.scheduler.record_atomic_write(node, restore));
}

/// Fan-out + devtools hook for a signal write (spec §4.4 step 5).
pub(crate) fn notify_signal_write(id: NodeId) {
    with_runtime(|rt| {
        rt.observer().signal_written(id);
        rt.notify_subs(id);
    });
}

pub(crate) fn mark_stale(id: NodeId) {
    with_runtime(|rt| rt.mark_stale(id));
}

pub(crate) fn node_created(id: NodeId, kind: &'static str) {
    with_runtime(|rt| rt.observer().node_created(id, kind));
}

pub(crate) fn computation_ran(id: NodeId, kind: &'static str) {
    with_runtime(|rt| rt.observer().computation_ran(id, kind));
}

/// Forwards a panic caught while isolating one cleanup callback from the
/// rest of its drain (spec §7 "Cleanup errors ... errors MAY be forwarded
/// to an optional error sink") to the same sink `flush_jobs` uses for job
/// panics.
pub(crate) fn report_error(payload: PanicPayload) {
    with_runtime(|rt| rt.scheduler.report_error(payload));
}
