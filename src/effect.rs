//! Side-effect runner with a cleanup stack, dependency re-collection, and
//! dispose semantics (spec §4.6).

use std::cell::RefCell;
use std::rc::Rc;

use crate::node::{NodeId, NodeKind};
use crate::registry::Job;
use crate::runtime;

/// A cleanup callback, registered either as the return value of an effect
/// body or via [`on_cleanup`].
pub type Cleanup = Box<dyn FnOnce()>;

type CleanupStack = Rc<RefCell<Vec<Cleanup>>>;

thread_local! {
    /// LIFO stack of the currently-running effects' cleanup lists, so that
    /// nested effect construction (an effect whose body itself calls
    /// `create_effect`) keeps `on_cleanup` attached to the right instance.
    static ACTIVE_CLEANUPS: RefCell<Vec<CleanupStack>> = const { RefCell::new(Vec::new()) };
}

/// Appends `cb` to the currently-running effect's cleanup list. A no-op
/// outside an active effect body (spec §4.6: "No-op outside an active
/// effect").
pub fn on_cleanup(cb: impl FnOnce() + 'static) {
    ACTIVE_CLEANUPS.with(|stack| {
        if let Some(top) = stack.borrow().last() {
            top.borrow_mut().push(Box::new(cb));
        }
    });
}

struct EffectInner {
    id: NodeId,
    f: Box<dyn Fn() -> Option<Cleanup>>,
    cleanups: CleanupStack,
    disposed: std::cell::Cell<bool>,
}

impl Job for EffectInner {
    fn id(&self) -> NodeId {
        self.id
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    fn run(&self) {
        if self.disposed.get() {
            return;
        }

        drain_cleanups(&self.cleanups);

        for dep in runtime::deps_snapshot(self.id) {
            runtime::unlink(self.id, dep);
        }

        ACTIVE_CLEANUPS.with(|stack| stack.borrow_mut().push(Rc::clone(&self.cleanups)));
        struct PopGuard;
        impl Drop for PopGuard {
            fn drop(&mut self) {
                ACTIVE_CLEANUPS.with(|stack| {
                    stack.borrow_mut().pop();
                });
            }
        }
        let _pop_guard = PopGuard;

        let id = self.id;
        let ret = runtime::with_observer(Some(id), || (self.f)());
        if let Some(cleanup) = ret {
            self.cleanups.borrow_mut().push(cleanup);
        }

        runtime::computation_ran(self.id, "effect");
    }
}

/// Drains `cleanups` back-to-front (LIFO), isolating a panicking callback
/// from the rest of the drain (spec §4.6 step 2 / §7 "Cleanup errors:
/// caught per-callback").
fn drain_cleanups(cleanups: &CleanupStack) {
    let pending: Vec<Cleanup> = std::mem::take(&mut *cleanups.borrow_mut());
    for cleanup in pending.into_iter().rev() {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(cleanup));
        if let Err(payload) = result {
            runtime::report_error(payload);
        }
    }
}

/// A disposer returned by [`create_effect`]. Calling it (or dropping it —
/// no, dropping does *not* dispose; call it explicitly) tears the effect
/// down: drains cleanups, unlinks all deps, and removes it from the
/// registry. Idempotent.
pub struct Disposer {
    id: NodeId,
    inner: Rc<EffectInner>,
}

impl Disposer {
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        drain_cleanups(&self.inner.cleanups);
        runtime::dispose_node(self.id);
    }
}

/// `createEffect(fn)` (spec §4.6): constructs an `EffectInstance`, runs it
/// once eagerly, and returns its disposer.
pub fn create_effect(f: impl Fn() -> Option<Cleanup> + 'static) -> Disposer {
    let id = runtime::insert_node(NodeKind::Effect);
    runtime::node_created(id, "effect");
    let inner = Rc::new(EffectInner {
        id,
        f: Box::new(f),
        cleanups: Rc::new(RefCell::new(Vec::new())),
        disposed: std::cell::Cell::new(false),
    });
    runtime::registry_set(id, Rc::clone(&inner) as Rc<dyn Job>);
    inner.run();
    Disposer { id, inner }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{batch, flush_sync};
    use crate::signal::signal;

    #[test]
    fn runs_once_eagerly_then_on_signal_write() {
        let a = signal(1);
        let runs = Rc::new(RefCell::new(0));
        let runs2 = Rc::clone(&runs);
        let a2 = a.clone();
        let disposer = create_effect(move || {
            a2.get();
            *runs2.borrow_mut() += 1;
            None
        });
        assert_eq!(*runs.borrow(), 1);
        a.set(2);
        flush_sync();
        assert_eq!(*runs.borrow(), 2);
        disposer.dispose();
        a.set(3);
        flush_sync();
        assert_eq!(*runs.borrow(), 2);
    }

    #[test]
    fn coalesces_within_a_batch() {
        let a = signal(1);
        let b = signal(2);
        let runs = Rc::new(RefCell::new(0));
        let runs2 = Rc::clone(&runs);
        let (a2, b2) = (a.clone(), b.clone());
        let _disposer = create_effect(move || {
            a2.get();
            b2.get();
            *runs2.borrow_mut() += 1;
            None
        });
        assert_eq!(*runs.borrow(), 1);
        batch(|| {
            a.set(10);
            b.set(20);
        });
        assert_eq!(*runs.borrow(), 2);
    }

    #[test]
    fn cleanups_drain_lifo() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let trigger = signal(0);
        let trigger2 = trigger.clone();
        let order2 = Rc::clone(&order);
        let _disposer = create_effect(move || {
            trigger2.get();
            let o1 = Rc::clone(&order2);
            let o2 = Rc::clone(&order2);
            let o3 = Rc::clone(&order2);
            on_cleanup(move || o1.borrow_mut().push('a'));
            on_cleanup(move || o2.borrow_mut().push('b'));
            on_cleanup(move || o3.borrow_mut().push('c'));
            None
        });
        trigger.set(1);
        flush_sync();
        assert_eq!(*order.borrow(), vec!['c', 'b', 'a']);
    }
}
