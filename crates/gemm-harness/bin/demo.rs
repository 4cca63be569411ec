//! Timed end-to-end multiplication demo.
//!
//! ```bash
//! cargo run -p gemm-harness --bin demo --release -- <m> <n> <p> [workers] [--validate]
//! ```
//!
//! Fills A (m x n) and B (n x p) with uniform random values, pads both to
//! tile-aligned shapes (B transposed), runs one pooled multiplication, and
//! reports wall time and effective GFLOP/s. With `--validate` the result is
//! checked against the naive reference multiply.

use gemm_harness::{
    align_up, fill_random, max_abs_diff, pad, pad_transposed, reference_mm, unpad, AlignedBuf,
};
use gemmpool_rs::{mm, queue_capacity_for, Pool, PoolConfig};
use std::process::ExitCode;
use std::time::Instant;

struct Args {
    m: usize,
    n: usize,
    p: usize,
    workers: usize,
    validate: bool,
}

fn parse_args() -> Option<Args> {
    let mut dims = Vec::new();
    let mut workers = None;
    let mut validate = false;

    for arg in std::env::args().skip(1) {
        if arg == "--validate" {
            validate = true;
        } else {
            let value: usize = arg.parse().ok()?;
            if dims.len() < 3 {
                dims.push(value);
            } else if workers.is_none() {
                workers = Some(value);
            } else {
                return None;
            }
        }
    }

    if dims.len() != 3 || dims.iter().any(|&d| d == 0) {
        return None;
    }
    Some(Args {
        m: dims[0],
        n: dims[1],
        p: dims[2],
        workers: workers.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(gemmpool_rs::N_CORES, std::num::NonZeroUsize::get)
        }),
        validate,
    })
}

fn main() -> ExitCode {
    let Some(args) = parse_args() else {
        eprintln!("Usage: demo <m> <n> <p> [workers] [--validate]");
        return ExitCode::FAILURE;
    };

    let (m, n, p) = (args.m, args.n, args.p);
    let mut a = vec![0.0f32; m * n];
    let mut b = vec![0.0f32; n * p];
    fill_random(&mut a);
    fill_random(&mut b);

    let (padm, padn, padp) = (align_up(m), align_up(n), align_up(p));
    let capacity = queue_capacity_for(padm, padp, args.workers);
    let pool = match Pool::new(PoolConfig::new(args.workers, capacity)) {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("failed to build pool: {err}");
            return ExitCode::FAILURE;
        }
    };

    let pad_a = pad(&a, m, n, padm, padn);
    let pad_b = pad_transposed(&b, n, p, padn, padp);
    let mut pad_c = AlignedBuf::zeroed(padm * padp);

    let start = Instant::now();
    mm(&pad_a, &pad_b, &mut pad_c, padm, padn, padp, &pool);
    let elapsed = start.elapsed().as_secs_f64();

    let mut c = vec![0.0f32; m * p];
    unpad(&pad_c, &mut c, m, p, padp);

    let gflops = (2.0 * m as f64 * n as f64 * p as f64) / elapsed / 1e9;
    println!(
        "{}x{}x{} on {} workers: {:.6} s ({:.2} GFLOP/s)",
        m, n, p, args.workers, elapsed, gflops
    );

    if args.validate {
        let expected = reference_mm(&a, &b, m, n, p);
        let err = max_abs_diff(&c, &expected);
        println!("max abs error vs reference: {err:.3e}");
        if err >= 1e-2 {
            eprintln!("validation FAILED");
            return ExitCode::FAILURE;
        }
        println!("validation passed");
    }

    ExitCode::SUCCESS
}
