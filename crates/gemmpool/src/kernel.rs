use crate::task::TileTask;
use crate::{MICRO_TILE, TILE_SIZE};

/// A tile kernel: overwrite one `TILE_SIZE x TILE_SIZE` block of C with
/// `A_tile * B_tile^T`, accumulating over the full reduction length.
///
/// One pointer is selected at pool construction and shared by all workers;
/// there is no per-task dispatch.
///
/// # Safety
///
/// The task must describe `TILE_SIZE` valid rows in A, the transposed B
/// panel, and an exclusively writable C tile, with strides and `n_k`
/// matching the underlying buffers.
pub type KernelFn = unsafe fn(&TileTask);

/// Which tile kernel variant the pool's workers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelKind {
    /// Runtime detection: the 8-wide FMA variant when the CPU supports it,
    /// the scalar variant otherwise.
    #[default]
    Auto,
    /// Scalar 8x8 micro-tiled variant.
    Scalar,
    /// AVX2+FMA 8-wide variant. Selecting it on a CPU without AVX2/FMA
    /// falls back to scalar.
    #[cfg(target_arch = "x86_64")]
    Simd,
}

impl KernelKind {
    /// Resolves the variant to a concrete kernel pointer.
    pub fn select(self) -> KernelFn {
        match self {
            KernelKind::Scalar => mm_tile_scalar,
            #[cfg(target_arch = "x86_64")]
            KernelKind::Simd | KernelKind::Auto => {
                if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
                    mm_tile_simd
                } else {
                    mm_tile_scalar
                }
            }
            #[cfg(not(target_arch = "x86_64"))]
            KernelKind::Auto => mm_tile_scalar,
        }
    }
}

/// Scalar micro-tiled kernel.
///
/// The output tile is walked in 8x8 micro-tiles; each keeps a local
/// accumulator block so the reduction loop touches only registers and the
/// two stride-1 operand rows. B is transposed, so `B[(tj + j) * stride_b + k]`
/// walks output column `tj + j` with the same access pattern as A's rows.
pub(crate) unsafe fn mm_tile_scalar(task: &TileTask) {
    let a = task.a;
    let b = task.b;
    let c = task.c;

    let mut ti = 0;
    while ti < TILE_SIZE {
        let mut tj = 0;
        while tj < TILE_SIZE {
            let mut acc = [[0.0f32; MICRO_TILE]; MICRO_TILE];

            for k in 0..task.n_k {
                for i in 0..MICRO_TILE {
                    let av = *a.add((ti + i) * task.stride_a + k);
                    for j in 0..MICRO_TILE {
                        acc[i][j] += av * *b.add((tj + j) * task.stride_b + k);
                    }
                }
            }

            for i in 0..MICRO_TILE {
                for j in 0..MICRO_TILE {
                    *c.add((ti + i) * task.stride_c + (tj + j)) = acc[i][j];
                }
            }
            tj += MICRO_TILE;
        }
        ti += MICRO_TILE;
    }
}

/// Plain-unsafe wrapper so the feature-gated inner function coerces to
/// [`KernelFn`]. Callers reach this only through [`KernelKind::select`],
/// which verified AVX2+FMA at pool construction.
#[cfg(target_arch = "x86_64")]
pub(crate) unsafe fn mm_tile_simd(task: &TileTask) {
    mm_tile_avx2(task);
}

/// 8-wide FMA kernel.
///
/// Per micro-tile and per `k`: broadcast the eight A values (one per output
/// row) into vectors, assemble one 8-lane vector of B values for columns
/// `tj..tj + 8`, and issue eight FMAs, one per row accumulator.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn mm_tile_avx2(task: &TileTask) {
    use std::arch::x86_64::*;

    let a = task.a;
    let c = task.c;

    let mut ti = 0;
    while ti < TILE_SIZE {
        let mut tj = 0;
        while tj < TILE_SIZE {
            let mut acc = [_mm256_setzero_ps(); MICRO_TILE];

            for k in 0..task.n_k {
                let a0 = _mm256_set1_ps(*a.add((ti) * task.stride_a + k));
                let a1 = _mm256_set1_ps(*a.add((ti + 1) * task.stride_a + k));
                let a2 = _mm256_set1_ps(*a.add((ti + 2) * task.stride_a + k));
                let a3 = _mm256_set1_ps(*a.add((ti + 3) * task.stride_a + k));
                let a4 = _mm256_set1_ps(*a.add((ti + 4) * task.stride_a + k));
                let a5 = _mm256_set1_ps(*a.add((ti + 5) * task.stride_a + k));
                let a6 = _mm256_set1_ps(*a.add((ti + 6) * task.stride_a + k));
                let a7 = _mm256_set1_ps(*a.add((ti + 7) * task.stride_a + k));

                // Eight B columns at this k. `_mm256_set_ps` takes lanes
                // high-to-low, so column tj+7 comes first.
                let base_b = task.b.add(k);
                let sb = task.stride_b;
                let bv = _mm256_set_ps(
                    *base_b.add((tj + 7) * sb),
                    *base_b.add((tj + 6) * sb),
                    *base_b.add((tj + 5) * sb),
                    *base_b.add((tj + 4) * sb),
                    *base_b.add((tj + 3) * sb),
                    *base_b.add((tj + 2) * sb),
                    *base_b.add((tj + 1) * sb),
                    *base_b.add(tj * sb),
                );

                acc[0] = _mm256_fmadd_ps(a0, bv, acc[0]);
                acc[1] = _mm256_fmadd_ps(a1, bv, acc[1]);
                acc[2] = _mm256_fmadd_ps(a2, bv, acc[2]);
                acc[3] = _mm256_fmadd_ps(a3, bv, acc[3]);
                acc[4] = _mm256_fmadd_ps(a4, bv, acc[4]);
                acc[5] = _mm256_fmadd_ps(a5, bv, acc[5]);
                acc[6] = _mm256_fmadd_ps(a6, bv, acc[6]);
                acc[7] = _mm256_fmadd_ps(a7, bv, acc[7]);
            }

            for (v, row) in acc.iter().enumerate() {
                _mm256_storeu_ps(c.add((ti + v) * task.stride_c + tj), *row);
            }
            tj += MICRO_TILE;
        }
        ti += MICRO_TILE;
    }
}
