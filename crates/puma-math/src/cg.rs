// ─────────────────────────────────────────────────────────────────────
// PuMA-RS — Preconditioned Conjugate Gradient
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Jacobi-preconditioned conjugate gradient for symmetric positive
//! definite CSR systems.
//!
//! Starts from `x₀ = 0` and stops once `‖r‖ / ‖b‖ < tol`. The reported
//! residual is recomputed from the returned `x`, not taken from the
//! recursively updated `r`.

use crate::iterative::{relative_residual, IterativeConfig, IterativeResult};
use crate::sparse::{CsrMatrix, JacobiPreconditioner};
use crate::vecops::{axpy, dot, norm};

const BREAKDOWN: f64 = 1e-300;

pub fn pcg_jacobi(a: &CsrMatrix, b: &[f64], config: &IterativeConfig) -> IterativeResult {
    let n = b.len();
    assert_eq!(a.dim(), n, "pcg_jacobi: matrix/rhs dimension mismatch");

    let b_norm = norm(b);
    if n == 0 || b_norm == 0.0 {
        return IterativeResult::trivial(n);
    }

    let precond = JacobiPreconditioner::new(a);
    let mut x = vec![0.0; n];
    let mut r = b.to_vec();
    let mut z = vec![0.0; n];
    precond.apply(&r, &mut z);
    let mut p = z.clone();
    let mut ap = vec![0.0; n];
    let mut rz_old = dot(&r, &z);

    let mut iterations = 0;
    while iterations < config.max_iter {
        if norm(&r) / b_norm < config.tol {
            break;
        }
        a.spmv(&p, &mut ap);
        let denom = dot(&p, &ap);
        if denom.abs() < BREAKDOWN {
            break;
        }

        let alpha = rz_old / denom;
        axpy(alpha, &p, &mut x);
        axpy(-alpha, &ap, &mut r);
        iterations += 1;

        precond.apply(&r, &mut z);
        let rz_new = dot(&r, &z);
        if rz_old.abs() < BREAKDOWN {
            break;
        }
        let beta = rz_new / rz_old;
        for (pi, &zi) in p.iter_mut().zip(z.iter()) {
            *pi = zi + beta * *pi;
        }
        rz_old = rz_new;
    }

    let residual = relative_residual(a, &x, b, b_norm);
    IterativeResult {
        x,
        iterations,
        residual,
        converged: residual < config.tol,
    }
}
