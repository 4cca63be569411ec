use crate::error::PoolError;
use crate::kernel::KernelKind;

/// Output tile edge length in elements. Every task computes one
/// `TILE_SIZE x TILE_SIZE` block of C.
pub const TILE_SIZE: usize = 64;

/// Register-blocked sub-tile edge inside one output tile.
pub const MICRO_TILE: usize = 8;

/// Number of tasks a thief claims from a victim queue in one CAS.
pub const STEAL_CHUNK: usize = 4;

/// Steal-loop iterations before a worker parks on its own semaphore.
pub const SPIN_LIMIT: usize = 1024;

/// Alignment the harness uses for operand buffers.
pub const MEM_ALIGNMENT: usize = 64;

/// Default worker count when core detection is unavailable.
pub const N_CORES: usize = 12;

// Micro-tiles must partition the tile exactly.
const _: () = assert!(TILE_SIZE % MICRO_TILE == 0);

/// Configuration for a [`Pool`](crate::Pool).
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Number of pinned worker threads, each owning one queue.
    pub workers: usize,
    /// Requested slots per queue; rounded up to a power of two and clamped
    /// to at least `STEAL_CHUNK + 1`.
    pub queue_capacity: usize,
    /// Which tile kernel the workers run.
    pub kernel: KernelKind,
}

/// Hard ceiling on worker count (one queue per worker; the steal rotation
/// walks all of them every iteration).
pub const MAX_WORKERS: usize = 128;

impl PoolConfig {
    /// Creates a configuration with the given worker count and per-queue
    /// slot request, using automatic kernel selection.
    pub const fn new(workers: usize, queue_capacity: usize) -> Self {
        Self {
            workers,
            queue_capacity,
            kernel: KernelKind::Auto,
        }
    }

    /// Sets the kernel variant.
    pub const fn with_kernel(mut self, kernel: KernelKind) -> Self {
        self.kernel = kernel;
        self
    }

    /// Validates the configuration, returning the error a
    /// [`Pool::new`](crate::Pool::new) call would report.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.workers == 0 {
            return Err(PoolError::ZeroWorkers);
        }
        if self.workers > MAX_WORKERS {
            return Err(PoolError::TooManyWorkers {
                requested: self.workers,
                max: MAX_WORKERS,
            });
        }
        if self.queue_capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }
        Ok(())
    }

    /// Effective slots per queue: `queue_capacity` rounded up to a power of
    /// two, never below `STEAL_CHUNK + 1`.
    #[inline]
    pub fn capacity(&self) -> usize {
        round_capacity(self.queue_capacity)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: crate::affinity::core_count().min(MAX_WORKERS),
            queue_capacity: 1024,
            kernel: KernelKind::Auto,
        }
    }
}

/// Rounds a requested slot count to the effective queue capacity.
#[inline]
pub(crate) fn round_capacity(requested: usize) -> usize {
    next_power_of_two(requested.max(STEAL_CHUNK + 1))
}

#[inline]
fn next_power_of_two(n: usize) -> usize {
    n.next_power_of_two()
}

/// Per-queue slot request sized for one `m x p` output decomposed into
/// `TILE_SIZE` tiles across `workers` queues.
///
/// Round-robin dispatch can leave one queue a slot heavier than the average,
/// and stealing moves claims but not slots, so the safe request is
/// `ceil(tiles / workers) + STEAL_CHUNK + 1` before power-of-two rounding.
pub fn queue_capacity_for(m: usize, p: usize, workers: usize) -> usize {
    assert!(workers > 0, "queue sizing requires at least one worker");
    let tiles = (m / TILE_SIZE) * (p / TILE_SIZE);
    round_capacity(tiles.div_ceil(workers) + STEAL_CHUNK + 1)
}
