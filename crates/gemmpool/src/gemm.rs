use crate::pool::Pool;
use crate::task::TileTask;
use crate::TILE_SIZE;

/// Multiplies `a` (m x n) by the transposed `b` (p rows of length n) into
/// the pre-zeroed `c` (m x p), using the pool's workers.
///
/// All three dimensions must be multiples of [`TILE_SIZE`] and the buffers
/// must use those exact pitches; the harness produces such buffers by
/// padding. B's transposed layout stores output column `j` as row `j`, so
/// one task reads `TILE_SIZE` rows of A and `TILE_SIZE` rows of B with the
/// same stride-1 pattern.
///
/// The call decomposes the output into `(m / TILE_SIZE) * (p / TILE_SIZE)`
/// tile tasks, submits them round-robin, and blocks on the completion
/// barrier; on return every tile of `c` has been written exactly once.
/// Tasks only borrow the slices for the duration of the call.
///
/// # Panics
///
/// Panics when a dimension is not tile-aligned, a buffer is shorter than
/// its dimensions claim, or the pool's queues cannot hold the decomposition
/// (size them with [`queue_capacity_for`](crate::queue_capacity_for)).
pub fn mm(a: &[f32], b: &[f32], c: &mut [f32], m: usize, n: usize, p: usize, pool: &Pool) {
    assert!(m % TILE_SIZE == 0, "m = {m} is not a multiple of {TILE_SIZE}");
    assert!(n % TILE_SIZE == 0, "n = {n} is not a multiple of {TILE_SIZE}");
    assert!(p % TILE_SIZE == 0, "p = {p} is not a multiple of {TILE_SIZE}");
    assert!(a.len() >= m * n, "A buffer shorter than m * n");
    assert!(b.len() >= p * n, "B buffer shorter than p * n");
    assert!(c.len() >= m * p, "C buffer shorter than m * p");

    let tiles = (m / TILE_SIZE) * (p / TILE_SIZE);
    // Round-robin puts at most ceil(tiles / workers) tasks on one queue.
    assert!(
        tiles.div_ceil(pool.workers()) <= pool.queue_capacity(),
        "pool queues too small for {tiles} tiles across {} workers",
        pool.workers()
    );

    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();
    let c_ptr = c.as_mut_ptr();

    for i in (0..m).step_by(TILE_SIZE) {
        for j in (0..p).step_by(TILE_SIZE) {
            // Safety: the bounds asserts above cover every tile origin, the
            // tiles partition `c` disjointly, and `pool.wait()` below keeps
            // the borrows alive past the last kernel run.
            let task = unsafe {
                TileTask::new(
                    a_ptr.add(i * n),
                    b_ptr.add(j * n),
                    c_ptr.add(i * p + j),
                    n,
                    n,
                    p,
                    n,
                )
            };
            pool.submit(task);
        }
    }

    pool.wait();
}
