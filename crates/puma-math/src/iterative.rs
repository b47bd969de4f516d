// ─────────────────────────────────────────────────────────────────────
// PuMA-RS — Iterative Solver Configuration
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Shared configuration, result type and method selection for the
//! Jacobi-preconditioned Krylov solvers.

use std::fmt;
use std::str::FromStr;

use puma_types::constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
use puma_types::error::TransportError;

use crate::sparse::CsrMatrix;

// ───────────────────────────── configuration ─────────────────────────

/// Stopping criteria shared by CG and BiCGSTAB.
#[derive(Debug, Clone, Copy)]
pub struct IterativeConfig {
    /// Maximum number of iterations (default: 10 000).
    pub max_iter: usize,
    /// Convergence tolerance on `‖r‖ / ‖b‖` (default: 1e-5).
    pub tol: f64,
}

impl Default for IterativeConfig {
    fn default() -> Self {
        IterativeConfig {
            max_iter: DEFAULT_MAX_ITERATIONS,
            tol: DEFAULT_TOLERANCE,
        }
    }
}

/// Result of an iterative solve.
#[derive(Debug, Clone)]
pub struct IterativeResult {
    /// Approximate solution.
    pub x: Vec<f64>,
    /// Iterations performed.
    pub iterations: usize,
    /// Final relative residual `‖b - A x‖ / ‖b‖`, recomputed from `x`.
    pub residual: f64,
    /// Whether `residual < tol` was reached.
    pub converged: bool,
}

impl IterativeResult {
    pub(crate) fn trivial(n: usize) -> Self {
        IterativeResult {
            x: vec![0.0; n],
            iterations: 0,
            residual: 0.0,
            converged: true,
        }
    }
}

/// `‖b - A x‖ / ‖b‖`, with `b_norm` precomputed.
pub(crate) fn relative_residual(a: &CsrMatrix, x: &[f64], b: &[f64], b_norm: f64) -> f64 {
    let mut ax = vec![0.0; b.len()];
    a.spmv(x, &mut ax);
    let mut r = vec![0.0; b.len()];
    crate::vecops::sub(b, &ax, &mut r);
    crate::vecops::norm(&r) / b_norm
}

// ─────────────────────────────── method ──────────────────────────────

/// Krylov method applied to the assembled system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterativeMethod {
    /// Conjugate gradient; symmetric positive definite systems only.
    Cg,
    /// Biconjugate gradient stabilised; general nonsymmetric systems.
    BiCgStab,
}

impl IterativeMethod {
    pub fn tag(self) -> &'static str {
        match self {
            IterativeMethod::Cg => "cg",
            IterativeMethod::BiCgStab => "bicgstab",
        }
    }

    /// Run the selected method with Jacobi preconditioning.
    pub fn solve(self, a: &CsrMatrix, b: &[f64], config: &IterativeConfig) -> IterativeResult {
        match self {
            IterativeMethod::Cg => crate::cg::pcg_jacobi(a, b, config),
            IterativeMethod::BiCgStab => crate::bicgstab::bicgstab_jacobi(a, b, config),
        }
    }
}

impl FromStr for IterativeMethod {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cg" => Ok(IterativeMethod::Cg),
            "bicgstab" => Ok(IterativeMethod::BiCgStab),
            other => Err(TransportError::InvalidSolver(format!(
                "unknown solver '{other}', expected 'cg' or 'bicgstab'"
            ))),
        }
    }
}

impl fmt::Display for IterativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
