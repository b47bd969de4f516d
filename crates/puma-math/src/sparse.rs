// ─────────────────────────────────────────────────────────────────────
// PuMA-RS — Compressed Sparse Row Matrix
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Square CSR matrix used for the assembled finite-volume systems.
//!
//! Rows are built independently (one per unknown voxel) and handed over as
//! unsorted `(column, value)` lists; duplicates are merged on construction.
//! All indices are `usize`, so systems beyond 2^31 unknowns are addressable
//! on 64-bit targets.

use rayon::prelude::*;

/// Square sparse matrix in compressed sparse row layout.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Build from per-row entry lists. Columns are sorted, duplicates summed,
    /// exact zeros kept (they preserve the stencil pattern).
    pub fn from_rows(mut rows: Vec<Vec<(usize, f64)>>) -> Self {
        let n = rows.len();
        rows.par_iter_mut().for_each(|row| merge_row(row));

        let nnz: usize = rows.iter().map(|r| r.len()).sum();
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        row_ptr.push(0);
        for row in rows {
            for (c, v) in row {
                debug_assert!(c < n, "column {c} out of range for {n}x{n} matrix");
                col_idx.push(c);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }

        CsrMatrix {
            n,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Build from `(row, col, value)` triplets.
    pub fn from_triplets(n: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut rows = vec![Vec::new(); n];
        for &(r, c, v) in triplets {
            rows[r].push((c, v));
        }
        Self::from_rows(rows)
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of row `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let (s, e) = (self.row_ptr[i], self.row_ptr[i + 1]);
        (&self.col_idx[s..e], &self.values[s..e])
    }

    /// Entry `(i, j)`, zero when outside the pattern.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let (cols, vals) = self.row(i);
        match cols.binary_search(&j) {
            Ok(k) => vals[k],
            Err(_) => 0.0,
        }
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.get(i, i)).collect()
    }

    /// `y = A * x`.
    pub fn spmv(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n, "spmv: x has wrong length");
        assert_eq!(y.len(), self.n, "spmv: y has wrong length");
        y.par_iter_mut().enumerate().for_each(|(i, yi)| {
            let (s, e) = (self.row_ptr[i], self.row_ptr[i + 1]);
            let mut acc = 0.0;
            for k in s..e {
                acc += self.values[k] * x[self.col_idx[k]];
            }
            *yi = acc;
        });
    }

    /// Whether `|a_ij - a_ji| <= rel_tol * max|a|` for every stored entry.
    pub fn is_symmetric(&self, rel_tol: f64) -> bool {
        let scale = self.values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let tol = rel_tol * scale.max(f64::MIN_POSITIVE);
        (0..self.n).into_par_iter().all(|i| {
            let (cols, vals) = self.row(i);
            cols.iter()
                .zip(vals.iter())
                .all(|(&j, &v)| j == i || (v - self.get(j, i)).abs() <= tol)
        })
    }
}

fn merge_row(row: &mut Vec<(usize, f64)>) {
    row.sort_unstable_by_key(|&(c, _)| c);
    let mut merged: Vec<(usize, f64)> = Vec::with_capacity(row.len());
    for &(c, v) in row.iter() {
        match merged.last_mut() {
            Some(last) if last.0 == c => last.1 += v,
            _ => merged.push((c, v)),
        }
    }
    *row = merged;
}

// ───────────────────────── Jacobi preconditioner ─────────────────────

/// Diagonal (Jacobi) preconditioner `M⁻¹ = diag(A)⁻¹`.
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner {
    inv_diag: Vec<f64>,
}

impl JacobiPreconditioner {
    /// Zero diagonal entries fall back to the identity for that row.
    pub fn new(a: &CsrMatrix) -> Self {
        let inv_diag = a
            .diagonal()
            .into_iter()
            .map(|d| if d.abs() > 0.0 && d.is_finite() { 1.0 / d } else { 1.0 })
            .collect();
        JacobiPreconditioner { inv_diag }
    }

    /// `z = M⁻¹ r`.
    pub fn apply(&self, r: &[f64], z: &mut [f64]) {
        crate::vecops::hadamard(&self.inv_diag, r, z);
    }
}
