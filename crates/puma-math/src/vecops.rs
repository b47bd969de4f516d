//! BLAS-like vector kernels shared by the Krylov solvers.
//!
//! Reductions are split into fixed-size chunks whose partial sums are
//! combined in order, so results are bit-identical for any thread count.

use rayon::prelude::*;

/// Elements per reduction chunk.
const CHUNK: usize = 4096;

/// Dot product.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let partials: Vec<f64> = a
        .par_chunks(CHUNK)
        .zip(b.par_chunks(CHUNK))
        .map(|(ca, cb)| ca.iter().zip(cb.iter()).map(|(x, y)| x * y).sum::<f64>())
        .collect();
    partials.iter().sum()
}

/// Euclidean (L2) norm.
#[inline]
pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// `y = y + alpha * x` (axpy).
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    y.par_iter_mut()
        .zip(x.par_iter())
        .for_each(|(yi, &xi)| *yi += alpha * xi);
}

/// `out = a - b`.
pub fn sub(a: &[f64], b: &[f64], out: &mut [f64]) {
    out.par_iter_mut()
        .zip(a.par_iter().zip(b.par_iter()))
        .for_each(|(oi, (&ai, &bi))| *oi = ai - bi);
}

/// `out = a * b` element-wise (diagonal scaling).
pub fn hadamard(a: &[f64], b: &[f64], out: &mut [f64]) {
    out.par_iter_mut()
        .zip(a.par_iter().zip(b.par_iter()))
        .for_each(|(oi, (&ai, &bi))| *oi = ai * bi);
}

/// Ordered sum of a slice, deterministic across thread counts.
pub fn sum(v: &[f64]) -> f64 {
    let partials: Vec<f64> = v.par_chunks(CHUNK).map(|c| c.iter().sum::<f64>()).collect();
    partials.iter().sum()
}
