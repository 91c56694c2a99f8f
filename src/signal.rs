//! Leaf state cells (spec §4.4). A signal never has dependencies of its own
//! (`Graph::link` rejects it as an edge source), so its arena node exists
//! only to carry `subs` and to give downstream computeds/effects something
//! to `track`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ReactiveError;
use crate::node::{NodeId, NodeKind};
use crate::runtime;

struct SignalInner<T> {
    value: T,
    equals: Box<dyn Fn(&T, &T) -> bool>,
}

/// A handle to a signal. Cheap to clone: it wraps an `Rc`, so clones all
/// refer to the same underlying cell, matching the teacher's own signal
/// handles (`ReadSignal`/`WriteSignal` are themselves `Copy` wrappers
/// around an arena id).
pub struct SignalHandle<T: 'static> {
    id: NodeId,
    inner: Rc<RefCell<SignalInner<T>>>,
}

impl<T: 'static> Clone for SignalHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Creates a signal with the default (`PartialEq`) equality.
pub fn signal<T: PartialEq + 'static>(initial: T) -> SignalHandle<T> {
    signal_with_equals(initial, |a, b| a == b)
}

/// Creates a signal with a caller-supplied equality function, for types
/// without a natural `PartialEq` or where identity rather than structural
/// equality should gate writes (spec §4.4: "Equality defaults to identity
/// / reference equality").
pub fn signal_with_equals<T: 'static>(
    initial: T,
    equals: impl Fn(&T, &T) -> bool + 'static,
) -> SignalHandle<T> {
    let id = runtime::insert_node(NodeKind::Signal);
    runtime::node_created(id, "signal");
    SignalHandle {
        id,
        inner: Rc::new(RefCell::new(SignalInner {
            value: initial,
            equals: Box::new(equals),
        })),
    }
}

impl<T: 'static> SignalHandle<T> {
    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    /// `get()`: tracks this signal against the current observer, then
    /// returns a clone of its value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        runtime::track(self.id);
        self.inner.borrow().value.clone()
    }

    /// `peek()`: returns the current value without tracking.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.borrow().value.clone()
    }

    /// Reads the value via a closure, avoiding a clone when `T` is large.
    /// Still tracks, same as [`SignalHandle::get`].
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        runtime::track(self.id);
        f(&self.inner.borrow().value)
    }

    /// `set(next)` (spec §4.4 step 1-5, with `next` supplied directly
    /// rather than via an updater).
    pub fn set(&self, next: T)
    where
        T: Clone,
    {
        self.apply(next);
    }

    /// `set(prev -> next)`: the updater form of spec §4.4 step 1.
    pub fn update(&self, f: impl FnOnce(&T) -> T)
    where
        T: Clone,
    {
        let next = f(&self.inner.borrow().value);
        self.apply(next);
    }

    fn apply(&self, next: T)
    where
        T: Clone,
    {
        let unchanged = {
            let inner = self.inner.borrow();
            (inner.equals)(&inner.value, &next)
        };
        if unchanged {
            return;
        }
        if runtime::in_atomic() {
            let prev = self.inner.borrow().value.clone();
            let inner = Rc::clone(&self.inner);
            runtime::record_atomic_write(self.id, move || {
                inner.borrow_mut().value = prev;
            });
        }
        self.inner.borrow_mut().value = next;
        runtime::notify_signal_write(self.id);
    }

    /// `subscribe(observer)`: links an arbitrary non-signal node to this
    /// signal as a dependency, and returns a disposer that removes the
    /// edge. Exposed for collaborators (framework adapters, devtools) that
    /// need to subscribe without going through `track`'s implicit-observer
    /// path.
    pub fn subscribe(&self, observer: NodeId) -> Result<impl FnOnce(), ReactiveError> {
        runtime::link(observer, self.id)?;
        let id = self.id;
        Ok(move || runtime::unlink(observer, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_roundtrip() {
        let s = signal(1);
        assert_eq!(s.get(), 1);
        s.set(2);
        assert_eq!(s.get(), 2);
        s.update(|v| v + 1);
        assert_eq!(s.get(), 3);
    }

    #[test]
    fn custom_equals_suppresses_write() {
        let s = signal_with_equals(vec![1, 2, 3], |a: &Vec<i32>, b: &Vec<i32>| a.len() == b.len());
        s.set(vec![9, 9, 9]); // same length, should be treated as unchanged
        assert_eq!(s.get(), vec![1, 2, 3]);
        s.set(vec![9, 9]); // different length, should take effect
        assert_eq!(s.get(), vec![9, 9]);
    }

    #[test]
    fn subscribe_rejects_a_signal_as_observer() {
        let a = signal(1);
        let b = signal(2);
        assert_eq!(a.subscribe(b.id()), Err(ReactiveError::IllegalEdge));
    }

    #[test]
    fn subscribe_links_and_its_disposer_unlinks() {
        use crate::computed::computed;

        let a = signal(1);
        let a2 = a.clone();
        let c = computed(move || a2.get());

        let unsubscribe = a.subscribe(c.id()).unwrap();
        assert!(runtime::deps_snapshot(c.id()).contains(&a.id()));

        unsubscribe();
        assert!(!runtime::deps_snapshot(c.id()).contains(&a.id()));
    }
}
