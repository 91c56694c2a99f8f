//! Memoized, pull-on-read derivations (spec §4.5). A computed is lazy: its
//! `fn` doesn't run until the first `get`, and re-runs only when something
//! it previously read has gone stale.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ReactiveError;
use crate::node::{NodeId, NodeKind};
use crate::runtime;

struct ComputedInner<T> {
    value: Option<T>,
    has_value: bool,
    equals: Box<dyn Fn(&T, &T) -> bool>,
    f: Box<dyn Fn() -> T>,
}

/// A handle to a computed value. Cheap to clone, like [`crate::signal::SignalHandle`].
pub struct ComputedHandle<T: 'static> {
    id: NodeId,
    inner: Rc<RefCell<ComputedInner<T>>>,
}

impl<T: 'static> Clone for ComputedHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Creates a computed with the default (`PartialEq`) equality.
pub fn computed<T: PartialEq + 'static>(f: impl Fn() -> T + 'static) -> ComputedHandle<T> {
    computed_with_equals(f, |a, b| a == b)
}

/// Creates a computed with a caller-supplied equality function.
pub fn computed_with_equals<T: 'static>(
    f: impl Fn() -> T + 'static,
    equals: impl Fn(&T, &T) -> bool + 'static,
) -> ComputedHandle<T> {
    let id = runtime::insert_node(NodeKind::Computed);
    runtime::node_created(id, "computed");
    ComputedHandle {
        id,
        inner: Rc::new(RefCell::new(ComputedInner {
            value: None,
            has_value: false,
            equals: Box::new(equals),
            f: Box::new(f),
        })),
    }
}

impl<T: 'static> ComputedHandle<T> {
    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    /// `get()`: tracks this computed, recomputing first if stale or never
    /// evaluated, then returns a clone of its value.
    ///
    /// # Panics
    ///
    /// Panics with [`ReactiveError::CycleDetected`] if recomputing `self`
    /// re-enters its own computation, directly or transitively.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        runtime::track(self.id);
        self.recompute_if_needed();
        self.inner
            .borrow()
            .value
            .clone()
            .expect("computed value missing after recompute")
    }

    /// `peek()`: returns the cached value without tracking and without
    /// recomputing, even if stale (spec §4.5, verbatim). A computed that has
    /// never been evaluated via `get()` has no cached value to return —
    /// calling `peek()` on one is a contract violation, not a case this
    /// method resolves by running `fn` itself.
    ///
    /// # Panics
    ///
    /// Panics if called before this computed has ever been evaluated.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.borrow().value.clone().unwrap_or_else(|| {
            panic!("peek() called on a computed that has never been evaluated; call get() first")
        })
    }

    fn recompute_if_needed(&self) {
        let needs = runtime::is_stale(self.id) || !self.inner.borrow().has_value;
        if needs {
            self.recompute();
        }
    }

    /// `recompute(self)` (spec §4.5 steps 1-6).
    fn recompute(&self) {
        if runtime::is_computing(self.id) {
            panic!("{}", ReactiveError::CycleDetected);
        }
        runtime::set_computing(self.id, true);

        struct ComputingGuard(NodeId);
        impl Drop for ComputingGuard {
            fn drop(&mut self) {
                runtime::set_computing(self.0, false);
            }
        }
        let _guard = ComputingGuard(self.id);

        for dep in runtime::deps_snapshot(self.id) {
            runtime::unlink(self.id, dep);
        }

        let id = self.id;
        let inner = Rc::clone(&self.inner);
        let next = runtime::with_observer(Some(id), move || (inner.borrow().f)());

        {
            let mut inner = self.inner.borrow_mut();
            let changed = match &inner.value {
                Some(old) if inner.has_value => !(inner.equals)(old, &next),
                _ => true,
            };
            if changed {
                inner.value = Some(next);
                inner.has_value = true;
            }
        }

        runtime::set_stale(self.id, false);
        runtime::computation_ran(self.id, "computed");
    }

    /// `dispose()`: severs all incident edges and resets to the initial
    /// (never-evaluated) state.
    pub fn dispose(&self) {
        runtime::dispose_node(self.id);
        let mut inner = self.inner.borrow_mut();
        inner.value = None;
        inner.has_value = false;
        runtime::set_stale(self.id, true);
    }
}
