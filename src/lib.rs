#![forbid(unsafe_code)]

//! A fine-grained reactivity runtime: signals, computed values, and effects
//! over a glitch-free, single-threaded dependency graph.
//!
//! ```
//! use reactive_core::{signal, computed, create_effect, flush_sync};
//!
//! let a = signal(1);
//! let b = signal(2);
//! let a2 = a.clone();
//! let b2 = b.clone();
//! let sum = computed(move || a2.get() + b2.get());
//! assert_eq!(sum.get(), 3);
//!
//! let runs = std::rc::Rc::new(std::cell::RefCell::new(0));
//! let runs2 = runs.clone();
//! let sum2 = sum.clone();
//! let _disposer = create_effect(move || {
//!     sum2.get();
//!     *runs2.borrow_mut() += 1;
//!     None
//! });
//! assert_eq!(*runs.borrow(), 1);
//!
//! a.set(10);
//! flush_sync();
//! assert_eq!(sum.get(), 12);
//! assert_eq!(*runs.borrow(), 2);
//! ```
//!
//! The runtime is pinned to the thread that creates it (spec-level design:
//! a runtime instance is bound to one thread/task, see [`runtime`]):
//! signals, computeds, and effects are cheap, `Rc`-backed handles and are
//! neither [`Send`] nor [`Sync`].

mod computed;
mod effect;
mod error;
mod graph;
mod microtask;
mod node;
mod registry;
mod runtime;
mod scheduler;
mod signal;

pub use computed::{computed, computed_with_equals, ComputedHandle};
pub use effect::{create_effect, on_cleanup, Cleanup, Disposer};
pub use error::ReactiveError;
pub use microtask::{set_microtask_executor, ImmediateExecutor, MicrotaskExecutor};
pub use node::NodeId;
pub use runtime::{
    atomic, atomic_async, batch, flush_sync, in_atomic, set_error_hook, set_flush_guard_limit,
    set_observer, transaction, transaction_async, ReactiveObserver,
};
pub use scheduler::PanicPayload;
pub use signal::{signal, signal_with_equals, SignalHandle};
