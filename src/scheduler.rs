//! Job queue, microtask-coalesced flush, and batch/transaction/atomic
//! scopes with write-log rollback (spec §4.3). Deliberately knows nothing
//! about the dependency graph: it operates on opaque [`Job`]s keyed by
//! [`NodeId`] and on write-log entries that are themselves just "restore
//! this node's value" closures supplied by [`crate::signal`]. The graph
//! propagation that rollback also has to perform (marking downstream
//! computeds stale) lives in [`crate::runtime`], which is the one layer
//! that holds both the graph and the scheduler.

use core::hash::BuildHasherDefault;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHasher;

use crate::error::ReactiveError;
use crate::node::NodeId;
use crate::registry::Job;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// A panic payload caught while isolating one job/cleanup from the rest of
/// a flush round (spec §7: "Cleanup errors: caught per-callback ... errors
/// MAY be forwarded to an optional error sink").
pub type PanicPayload = Box<dyn Any + Send + 'static>;

/// First-seen-wins ordered map from node to a closure that restores its
/// pre-scope value (spec §3 "Write log").
#[derive(Default)]
pub(crate) struct WriteLog {
    entries: FxIndexMap<NodeId, Box<dyn FnOnce()>>,
}

impl WriteLog {
    fn record(&mut self, node: NodeId, restore: Box<dyn FnOnce()>) {
        self.entries.entry(node).or_insert(restore);
    }

    fn merge_into(self, parent: &mut WriteLog) {
        for (node, restore) in self.entries {
            parent.entries.entry(node).or_insert(restore);
        }
    }

    fn into_entries(self) -> Vec<(NodeId, Box<dyn FnOnce()>)> {
        self.entries.into_iter().collect()
    }
}

const DEFAULT_FLUSH_GUARD_LIMIT: usize = 10_000;

pub(crate) struct Scheduler {
    queue: RefCell<FxIndexMap<NodeId, Rc<dyn Job>>>,
    scheduled: Cell<bool>,
    batch_depth: Cell<usize>,
    atomic_depth: Cell<usize>,
    atomic_logs: RefCell<Vec<WriteLog>>,
    muted: Cell<usize>,
    flush_guard_limit: Cell<usize>,
    error_hook: RefCell<Option<Box<dyn Fn(PanicPayload)>>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            queue: RefCell::new(FxIndexMap::default()),
            scheduled: Cell::new(false),
            batch_depth: Cell::new(0),
            atomic_depth: Cell::new(0),
            atomic_logs: RefCell::new(Vec::new()),
            muted: Cell::new(0),
            flush_guard_limit: Cell::new(DEFAULT_FLUSH_GUARD_LIMIT),
            error_hook: RefCell::new(None),
        }
    }
}

impl Scheduler {
    pub fn in_atomic(&self) -> bool {
        self.atomic_depth.get() > 0
    }

    pub fn set_flush_guard_limit(&self, limit: usize) {
        self.flush_guard_limit.set(limit);
    }

    pub fn set_error_hook(&self, hook: impl Fn(PanicPayload) + 'static) {
        *self.error_hook.borrow_mut() = Some(Box::new(hook));
    }

    pub(crate) fn report_error(&self, payload: PanicPayload) {
        let hook = self.error_hook.borrow();
        match hook.as_ref() {
            Some(hook) => hook(payload),
            None => tracing::warn!("unhandled panic inside a reactive job"),
        }
    }

    /// `scheduleJob(job)`.
    #[tracing::instrument(level = "trace", skip(self, job))]
    pub fn schedule_job(&self, job: Rc<dyn Job>) {
        if job.is_disposed() || self.muted.get() > 0 {
            return;
        }
        self.queue.borrow_mut().entry(job.id()).or_insert(job);
        if !self.scheduled.get() && self.batch_depth.get() == 0 {
            self.scheduled.set(true);
            crate::microtask::post_microtask(Box::new(crate::runtime::flush_sync));
        }
    }

    /// Baseline `flushJobs` (spec §4.3): drain-and-run to quiescence, with
    /// the documented choice of isolating a panicking job from the rest of
    /// the round via `catch_unwind`, rather than aborting the whole flush
    /// (§7 Open Question #1 — both are conformant; this crate picks
    /// "continue" and is tested against it, see `tests/effect.rs`).
    pub fn flush_jobs(&self) {
        self.scheduled.set(false);
        let mut guard = 0usize;
        loop {
            let snapshot: Vec<Rc<dyn Job>> = {
                let mut queue = self.queue.borrow_mut();
                std::mem::take(&mut *queue).into_values().collect()
            };
            if snapshot.is_empty() {
                break;
            }
            for job in snapshot {
                if job.is_disposed() {
                    continue;
                }
                let result =
                    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| job.run()));
                if let Err(payload) = result {
                    self.report_error(payload);
                }
            }
            guard += 1;
            if guard > self.flush_guard_limit.get() {
                let limit = self.flush_guard_limit.get();
                self.queue.borrow_mut().clear();
                self.scheduled.set(false);
                panic!("{}", ReactiveError::InfiniteUpdateLoop(limit));
            }
        }
    }

    /// `flushSync()`.
    pub fn flush_sync(&self) {
        if self.scheduled.get() || !self.queue.borrow().is_empty() {
            self.flush_jobs();
        }
    }

    pub fn enter_batch(&self) {
        self.batch_depth.set(self.batch_depth.get() + 1);
    }

    pub fn exit_batch(&self) {
        let depth = self.batch_depth.get() - 1;
        self.batch_depth.set(depth);
        if depth == 0 {
            self.flush_jobs();
        }
    }

    pub fn enter_atomic(&self) {
        self.batch_depth.set(self.batch_depth.get() + 1);
        self.atomic_depth.set(self.atomic_depth.get() + 1);
        self.atomic_logs.borrow_mut().push(WriteLog::default());
    }

    /// `recordAtomicWrite(node, prev)`. No-op if no active log.
    pub fn record_atomic_write(&self, node: NodeId, restore: impl FnOnce() + 'static) {
        if let Some(log) = self.atomic_logs.borrow_mut().last_mut() {
            log.record(node, Box::new(restore));
        }
    }

    /// `exitCommit`, minus the graph-unaware part: pops and merges the
    /// write log, then finishes the batch/flush bookkeeping. Returns
    /// nothing — a commit has no graph-level work to do, since every
    /// signal write it covers has already propagated staleness normally
    /// as it happened.
    pub fn exit_commit(&self) {
        self.atomic_depth.set(self.atomic_depth.get() - 1);
        let log = self
            .atomic_logs
            .borrow_mut()
            .pop()
            .expect("exit_commit called without a matching enter_atomic");
        if let Some(parent) = self.atomic_logs.borrow_mut().last_mut() {
            log.merge_into(parent);
        }
        self.exit_batch();
    }

    /// `exitRollback`, minus the graph propagation: pops the write log,
    /// mutes scheduling, and hands the (node, restore) pairs back to the
    /// caller so it can run them and mark downstream computeds stale while
    /// still muted. Clears the queue and finishes bookkeeping without a
    /// flush, exactly as spec'd.
    pub fn begin_rollback(&self) -> Vec<(NodeId, Box<dyn FnOnce()>)> {
        self.atomic_depth.set(self.atomic_depth.get() - 1);
        let log = self
            .atomic_logs
            .borrow_mut()
            .pop()
            .expect("begin_rollback called without a matching enter_atomic");
        self.muted.set(self.muted.get() + 1);
        log.into_entries()
    }

    pub fn finish_rollback(&self) {
        self.queue.borrow_mut().clear();
        self.scheduled.set(false);
        self.muted.set(self.muted.get() - 1);
        self.batch_depth.set(self.batch_depth.get() - 1);
        // intentionally no flush
    }
}
