//! Property-based tests for capacity rounding, queue occupancy bounds, and
//! randomized multiplications against the reference triple loop.

use gemmpool_rs::{
    mm, queue_capacity_for, KernelKind, Pool, PoolConfig, TaskRing, TileTask, STEAL_CHUNK,
    TILE_SIZE,
};
use proptest::prelude::*;
use std::mem::MaybeUninit;
use std::ptr;

fn reference_mm(a: &[f32], bt: &[f32], m: usize, n: usize, p: usize) -> Vec<f32> {
    let mut c = vec![0.0f32; m * p];
    for i in 0..m {
        for j in 0..p {
            let mut sum = 0.0f32;
            for k in 0..n {
                sum += a[i * n + k] * bt[j * n + k];
            }
            c[i * p + j] = sum;
        }
    }
    c
}

fn tagged(tag: usize) -> TileTask {
    // Safety: queue-only traffic; the pointers are never dereferenced.
    unsafe { TileTask::new(ptr::null(), ptr::null(), ptr::null_mut(), 0, 0, 0, tag) }
}

proptest! {
    /// Effective capacities are powers of two and never below the floor
    /// that keeps a queue stealable-from while leaving its owner a task.
    #[test]
    fn prop_capacity_rounding(requested in 1usize..100_000) {
        let cap = PoolConfig::new(1, requested).capacity();
        prop_assert!(cap.is_power_of_two());
        prop_assert!(cap >= requested.max(STEAL_CHUNK + 1));
        // Tight: rounding never more than doubles past the floor.
        prop_assert!(cap < 2 * requested.max(STEAL_CHUNK + 1));
    }

    /// The sizing formula always leaves the worst-case queue a margin.
    #[test]
    fn prop_sizing_formula_covers_round_robin(
        tiles_m in 1usize..32,
        tiles_p in 1usize..32,
        workers in 1usize..64,
    ) {
        let m = tiles_m * TILE_SIZE;
        let p = tiles_p * TILE_SIZE;
        let cap = queue_capacity_for(m, p, workers);
        let tiles = tiles_m * tiles_p;
        prop_assert!(cap.is_power_of_two());
        prop_assert!(cap >= tiles.div_ceil(workers) + STEAL_CHUNK + 1);
    }

    /// Occupancy stays within capacity and pops drain exactly what pushes
    /// queued, over arbitrary push/pop interleavings.
    #[test]
    fn prop_ring_occupancy_bounded(ops in prop::collection::vec(prop::bool::ANY, 1..200)) {
        let capacity = 256;
        let ring = TaskRing::new(capacity);
        let mut pushed = 0usize;
        let mut popped = 0usize;

        for push_op in ops {
            if push_op {
                if pushed - popped < capacity {
                    ring.push(tagged(pushed));
                    pushed += 1;
                }
            } else if let Some(task) = ring.try_pop() {
                // Single-consumer interleaving preserves FIFO.
                prop_assert_eq!(task.n_k, popped);
                popped += 1;
            }
            prop_assert!(ring.len() <= capacity);
            prop_assert_eq!(ring.len(), pushed - popped);
        }
    }

    /// A steal takes a whole batch or nothing, and never the last batch.
    #[test]
    fn prop_steal_is_all_or_nothing(queued in 0usize..40) {
        let ring = TaskRing::new(64);
        for tag in 0..queued {
            ring.push(tagged(tag));
        }

        let mut buf = [MaybeUninit::uninit(); STEAL_CHUNK];
        let stolen = ring.steal_batch(&mut buf);
        if queued > STEAL_CHUNK {
            prop_assert_eq!(stolen, STEAL_CHUNK);
            prop_assert_eq!(ring.len(), queued - STEAL_CHUNK);
        } else {
            prop_assert_eq!(stolen, 0);
            prop_assert_eq!(ring.len(), queued);
        }
    }
}

proptest! {
    // Full multiplications are expensive; a few random shapes suffice.
    #![proptest_config(ProptestConfig::with_cases(6))]

    /// Scalar-kernel pools match the reference for random shapes and data.
    #[test]
    fn prop_mm_matches_reference(
        tiles_m in 1usize..4,
        tiles_n in 1usize..3,
        tiles_p in 1usize..4,
        workers in 1usize..6,
        seed in any::<u64>(),
    ) {
        use rand::{Rng, SeedableRng};

        let m = tiles_m * TILE_SIZE;
        let n = tiles_n * TILE_SIZE;
        let p = tiles_p * TILE_SIZE;

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let a: Vec<f32> = (0..m * n).map(|_| rng.gen::<f32>()).collect();
        let b: Vec<f32> = (0..p * n).map(|_| rng.gen::<f32>()).collect();
        let mut c = vec![0.0f32; m * p];

        let config = PoolConfig::new(workers, queue_capacity_for(m, p, workers))
            .with_kernel(KernelKind::Scalar);
        let pool = Pool::new(config).unwrap();
        mm(&a, &b, &mut c, m, n, p, &pool);

        let expected = reference_mm(&a, &b, m, n, p);
        for (x, y) in c.iter().zip(&expected) {
            prop_assert!((x - y).abs() <= 1e-4 * y.abs().max(1.0));
        }
    }
}
