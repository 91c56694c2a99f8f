use thiserror::Error;

/// Error kinds surfaced by the reactive runtime itself (as opposed to
/// panics raised by user closures running inside a computed/effect/atomic
/// body, which propagate as ordinary Rust panics).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReactiveError {
    /// Attempted to create a dependency edge (`link`/`subscribe`) whose
    /// source is a signal. Signals are leaves: they never observe anything.
    #[error("cannot create a dependency edge from a signal")]
    IllegalEdge,

    /// A computed's recompute re-entered itself, directly or transitively.
    #[error("computed value re-entered its own computation")]
    CycleDetected,

    /// `flush_jobs` exceeded its iteration guard without reaching quiescence.
    #[error("flush exceeded the infinite-update-loop guard ({0} iterations)")]
    InfiniteUpdateLoop(usize),
}
