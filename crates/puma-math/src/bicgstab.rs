// ─────────────────────────────────────────────────────────────────────
// PuMA-RS — BiCGSTAB
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Right-preconditioned BiCGSTAB (van der Vorst) with a Jacobi
//! preconditioner.
//!
//! Handles the nonsymmetric systems produced by the full multi-point
//! flux stencil under mirrored boundaries. The shadow residual `r̂` is
//! fixed to the initial residual. Breakdowns (`ρ ≈ 0`, `⟨r̂, v⟩ ≈ 0`,
//! `⟨t, t⟩ ≈ 0`, `ω ≈ 0`) stop the iteration and return the current
//! iterate with its true residual.

use crate::iterative::{relative_residual, IterativeConfig, IterativeResult};
use crate::sparse::{CsrMatrix, JacobiPreconditioner};
use crate::vecops::{axpy, dot, norm};

const BREAKDOWN: f64 = 1e-300;

pub fn bicgstab_jacobi(a: &CsrMatrix, b: &[f64], config: &IterativeConfig) -> IterativeResult {
    let n = b.len();
    assert_eq!(a.dim(), n, "bicgstab_jacobi: matrix/rhs dimension mismatch");

    let b_norm = norm(b);
    if n == 0 || b_norm == 0.0 {
        return IterativeResult::trivial(n);
    }

    let precond = JacobiPreconditioner::new(a);
    let mut x = vec![0.0; n];
    let mut r = b.to_vec();
    let r_hat = r.clone();

    let mut rho = 1.0;
    let mut alpha = 1.0;
    let mut omega = 1.0;
    let mut v = vec![0.0; n];
    let mut p = vec![0.0; n];
    let mut p_hat = vec![0.0; n];
    let mut s = vec![0.0; n];
    let mut s_hat = vec![0.0; n];
    let mut t = vec![0.0; n];

    let mut iterations = 0;
    while iterations < config.max_iter {
        let rho_new = dot(&r_hat, &r);
        if rho_new.abs() < BREAKDOWN {
            break;
        }

        // p = r + β (p - ω v)
        let beta = (rho_new / rho) * (alpha / omega);
        for ((pi, &ri), &vi) in p.iter_mut().zip(r.iter()).zip(v.iter()) {
            *pi = ri + beta * (*pi - omega * vi);
        }

        precond.apply(&p, &mut p_hat);
        a.spmv(&p_hat, &mut v);

        let r_hat_v = dot(&r_hat, &v);
        if r_hat_v.abs() < BREAKDOWN {
            break;
        }
        alpha = rho_new / r_hat_v;

        // s = r - α v
        s.copy_from_slice(&r);
        axpy(-alpha, &v, &mut s);
        iterations += 1;

        if norm(&s) / b_norm < config.tol {
            axpy(alpha, &p_hat, &mut x);
            break;
        }

        precond.apply(&s, &mut s_hat);
        a.spmv(&s_hat, &mut t);

        let t_t = dot(&t, &t);
        if t_t.abs() < BREAKDOWN {
            axpy(alpha, &p_hat, &mut x);
            break;
        }
        omega = dot(&t, &s) / t_t;

        axpy(alpha, &p_hat, &mut x);
        axpy(omega, &s_hat, &mut x);

        // r = s - ω t
        r.copy_from_slice(&s);
        axpy(-omega, &t, &mut r);
        rho = rho_new;

        if norm(&r) / b_norm < config.tol || omega.abs() < BREAKDOWN {
            break;
        }
    }

    let residual = relative_residual(a, &x, b, b_norm);
    IterativeResult {
        x,
        iterations,
        residual,
        converged: residual < config.tol,
    }
}
