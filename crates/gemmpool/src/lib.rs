//! gemmpool - Parallel Tiled f32 Matrix Multiplication
//!
//! A dense single-precision GEMM scheduled onto a pinned worker pool. The
//! driver decomposes the output into 64x64 tiles, a round-robin dispatcher
//! feeds one bounded lock-free ring per worker, and idle workers steal
//! batches of tasks from their neighbours so every core stays busy until
//! the completion barrier releases the caller.
//!
//! Operands are expected tile-aligned and padded, with B stored transposed
//! (output column `j` as row `j`) so the kernel's reduction loop is
//! stride-1 on both operands. The companion harness crate provides the
//! padding, aligned allocation, and random-fill collaborators.
//!
//! # Example
//!
//! ```no_run
//! use gemmpool_rs::{mm, queue_capacity_for, Pool, PoolConfig, TILE_SIZE};
//!
//! let n = 2 * TILE_SIZE;
//! let a = vec![1.0f32; n * n];
//! let b = vec![1.0f32; n * n]; // already transposed
//! let mut c = vec![0.0f32; n * n];
//!
//! let config = PoolConfig::new(4, queue_capacity_for(n, n, 4));
//! let pool = Pool::new(config).unwrap();
//! mm(&a, &b, &mut c, n, n, n, &pool);
//! assert!(c.iter().all(|&x| x == n as f32));
//! ```

mod affinity;
mod config;
mod error;
mod gemm;
mod invariants;
mod kernel;
mod pool;
mod ring;
mod sem;
mod task;

pub use config::{
    queue_capacity_for, PoolConfig, MAX_WORKERS, MEM_ALIGNMENT, MICRO_TILE, N_CORES, SPIN_LIMIT,
    STEAL_CHUNK, TILE_SIZE,
};
pub use error::PoolError;
pub use gemm::mm;
pub use kernel::{KernelFn, KernelKind};
pub use pool::Pool;
pub use ring::TaskRing;
pub use task::TileTask;
