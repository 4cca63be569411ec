use thiserror::Error;

/// Errors reported when building a [`Pool`](crate::Pool).
///
/// There are no retryable errors in steady state: once a pool exists, the
/// submit/wait path is infallible and shutdown is a lifecycle state, not an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The configuration asked for zero workers.
    #[error("worker count must be at least 1")]
    ZeroWorkers,

    /// The configuration asked for more workers than supported.
    #[error("too many workers requested ({requested}, max: {max})")]
    TooManyWorkers {
        /// The requested worker count.
        requested: usize,
        /// The supported maximum.
        max: usize,
    },

    /// The configuration asked for zero queue slots.
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread {worker}")]
    Spawn {
        /// Index of the worker that failed to start.
        worker: usize,
    },
}
