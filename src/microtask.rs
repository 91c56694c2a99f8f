//! Abstracts "enqueue a microtask" behind a trait (design note §9:
//! "non-JS host runtimes can implement it via a run-loop hook or a task
//! queue processed at well-defined yield points"), the same spirit as the
//! teacher's `spawn_microtask::queue_microtask`, which itself branches on
//! host (immediate on native, real `queueMicrotask` under wasm).
//!
//! This crate has no browser event loop to piggyback on, so the default
//! executor simply records that a flush is owed and leaves it to whichever
//! of `batch`/`atomic`/`flush_sync` closes next — exactly the microtask
//! semantics spec.md describes ("guaranteed to run before the next
//! macrotask"), just with the macrotask boundary made explicit instead of
//! implicit. Hosts embedding this crate in a real async runtime can install
//! an executor that actually spawns the flush onto that runtime.

use std::cell::RefCell;

/// A posted microtask: "run the pending flush".
pub trait MicrotaskExecutor {
    fn post(&self, job: Box<dyn FnOnce()>);
}

/// Default executor: defers to an explicit `flush_sync()` or the closing of
/// a `batch`/`atomic` scope. No-op `post` — the job itself is only ever
/// "run the pending flush", and `flush_sync` already does that
/// unconditionally, so there's nothing to lose by dropping it here.
pub(crate) struct DeferredExecutor;

impl MicrotaskExecutor for DeferredExecutor {
    fn post(&self, _job: Box<dyn FnOnce()>) {}
}

/// An executor that runs the posted job immediately, matching the
/// teacher's native (non-wasm) `queue_microtask` behavior. Useful for
/// integrations that want every `set()` outside a `batch` to flush
/// eagerly, trading coalescing for not having to remember to flush.
pub struct ImmediateExecutor;

impl MicrotaskExecutor for ImmediateExecutor {
    fn post(&self, job: Box<dyn FnOnce()>) {
        job();
    }
}

thread_local! {
    pub(crate) static EXECUTOR: RefCell<Box<dyn MicrotaskExecutor>> =
        RefCell::new(Box::new(DeferredExecutor));
}

/// Installs a custom microtask executor for the calling thread's runtime.
pub fn set_microtask_executor(executor: impl MicrotaskExecutor + 'static) {
    EXECUTOR.with(|e| *e.borrow_mut() = Box::new(executor));
}

pub(crate) fn post_microtask(job: Box<dyn FnOnce()>) {
    EXECUTOR.with(|e| e.borrow().post(job));
}
