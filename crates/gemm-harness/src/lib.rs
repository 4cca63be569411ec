//! Front-end collaborators for the gemmpool engine.
//!
//! The engine multiplies tile-aligned, padded buffers with B stored
//! transposed. This crate supplies everything around that contract:
//! aligned allocation, padding/unpadding, random population, and a naive
//! reference multiply for validation. The `demo` binary wires it all
//! together and times a full multiplication.
//!
//! End-to-end shape:
//!
//! ```no_run
//! use gemm_harness::{align_up, fill_random, pad, pad_transposed, unpad, AlignedBuf};
//! use gemmpool_rs::{mm, queue_capacity_for, Pool, PoolConfig};
//!
//! let (m, n, p) = (100, 80, 90);
//! let mut a = vec![0.0f32; m * n];
//! let mut b = vec![0.0f32; n * p];
//! fill_random(&mut a);
//! fill_random(&mut b);
//!
//! let (padm, padn, padp) = (align_up(m), align_up(n), align_up(p));
//! let pool = Pool::new(PoolConfig::new(4, queue_capacity_for(padm, padp, 4))).unwrap();
//!
//! let pad_a = pad(&a, m, n, padm, padn);
//! let pad_b = pad_transposed(&b, n, p, padn, padp);
//! let mut pad_c = AlignedBuf::zeroed(padm * padp);
//! mm(&pad_a, &pad_b, &mut pad_c, padm, padn, padp, &pool);
//!
//! let mut c = vec![0.0f32; m * p];
//! unpad(&pad_c, &mut c, m, p, padp);
//! ```

mod layout;
mod reference;

pub use layout::{align_up, pad, pad_transposed, unpad, AlignedBuf};
pub use reference::{max_abs_diff, reference_mm};

use rand::Rng;

/// Fills a buffer with uniform values in `[0, 1)`.
pub fn fill_random(buf: &mut [f32]) {
    let mut rng = rand::thread_rng();
    for x in buf.iter_mut() {
        *x = rng.gen::<f32>();
    }
}
