// ─────────────────────────────────────────────────────────────────────
// PuMA-RS — Finite-Volume Stencil Assembly
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Conservative finite-volume discretisation of `-∇·(K∇T) = 0` on the
//! voxel grid.
//!
//! Unknowns are all voxels strictly between the two end-cap slices along
//! the solve axis. The flux through the face between `lo` and its `+a`
//! neighbour `hi`, scaled by the voxel length, is
//!
//! ```text
//! G = -[ K̄aa (T_hi - T_lo)
//!        + Σ_{b≠a} K̃ab (T_lo+b - T_lo-b + T_hi+b - T_hi-b) / 4 ]
//! ```
//!
//! with `K̄aa` the harmonic mean of the two diagonal entries and `K̃ab` the
//! arithmetic mean of the off-diagonals, dropped when `K̄aa = 0`. Each row
//! is the sum of the six outward face fluxes of one voxel.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;

use puma_math::sparse::CsrMatrix;
use puma_math::tensor::SymmetricTensor;
use puma_types::constants::MIN_SOLVE_SLICES;
use puma_types::error::{TransportError, TransportResult};
use puma_types::state::Direction;

use crate::boundary::{EndCaps, SideBoundary};

// ─────────────────────────────── scheme ──────────────────────────────

/// Discretisation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Multi-point flux: cross-derivative terms are part of the system.
    Mpfa,
    /// Two-point flux in the system; cross terms only in the flux reduction.
    Empfa,
}

impl Scheme {
    pub fn tag(self) -> &'static str {
        match self {
            Scheme::Mpfa => "mpfa",
            Scheme::Empfa => "empfa",
        }
    }

    pub fn cross_terms_in_matrix(self) -> bool {
        matches!(self, Scheme::Mpfa)
    }
}

impl FromStr for Scheme {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mpfa" => Ok(Scheme::Mpfa),
            "empfa" => Ok(Scheme::Empfa),
            other => Err(TransportError::InvalidMethod(other.to_string())),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ───────────────────────────── topology ──────────────────────────────

/// Index arithmetic for a box grid with end caps along the solve axis.
#[derive(Debug, Clone, Copy)]
pub struct GridTopology {
    shape: [usize; 3],
    direction: Direction,
    axis: usize,
    side: SideBoundary,
}

impl GridTopology {
    pub fn new(shape: [usize; 3], direction: Direction, side: SideBoundary) -> TransportResult<Self> {
        let axis = direction.axis();
        if shape.iter().any(|&n| n == 0) || shape[axis] < MIN_SOLVE_SLICES {
            return Err(TransportError::DegenerateDomain(format!(
                "shape {shape:?} leaves no interior slice along {direction}"
            )));
        }
        Ok(GridTopology {
            shape,
            direction,
            axis,
            side,
        })
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Solve axis index.
    pub fn axis(&self) -> usize {
        self.axis
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of slices along the solve axis, end caps included.
    pub fn slices(&self) -> usize {
        self.shape[self.axis]
    }

    pub fn voxel_count(&self) -> usize {
        self.shape.iter().product()
    }

    fn reduced_shape(&self) -> [usize; 3] {
        let mut r = self.shape;
        r[self.axis] -= 2;
        r
    }

    pub fn n_unknowns(&self) -> usize {
        self.reduced_shape().iter().product()
    }

    /// Voxels per slice normal to the solve axis.
    pub fn cross_section(&self) -> usize {
        self.voxel_count() / self.slices()
    }

    /// C-order linear index of a voxel.
    #[inline]
    pub fn linear_index(&self, p: [usize; 3]) -> usize {
        (p[0] * self.shape[1] + p[1]) * self.shape[2] + p[2]
    }

    #[inline]
    pub fn position(&self, linear: usize) -> [usize; 3] {
        let z = linear % self.shape[2];
        let y = (linear / self.shape[2]) % self.shape[1];
        let x = linear / (self.shape[1] * self.shape[2]);
        [x, y, z]
    }

    /// Row/column index of `p`, `None` for end-cap voxels.
    #[inline]
    pub fn unknown_index(&self, p: [usize; 3]) -> Option<usize> {
        let s = p[self.axis];
        if s == 0 || s + 1 >= self.slices() {
            return None;
        }
        let r = self.reduced_shape();
        let mut q = p;
        q[self.axis] -= 1;
        Some((q[0] * r[1] + q[1]) * r[2] + q[2])
    }

    #[inline]
    pub fn unknown_position(&self, u: usize) -> [usize; 3] {
        let r = self.reduced_shape();
        let z = u % r[2];
        let y = (u / r[2]) % r[1];
        let x = u / (r[1] * r[2]);
        let mut p = [x, y, z];
        p[self.axis] += 1;
        p
    }

    /// Neighbour of `p` one step along axis `a`.
    ///
    /// Side axes wrap (periodic) or clamp to the voxel itself (mirror ghost).
    /// Along the solve axis the caller must stay inside the grid.
    #[inline]
    pub fn shift(&self, p: [usize; 3], a: usize, forward: bool) -> [usize; 3] {
        let n = self.shape[a];
        let mut q = p;
        if a == self.axis {
            debug_assert!(forward || p[a] > 0, "solve-axis shift below the low end cap");
            debug_assert!(!forward || p[a] + 1 < n, "solve-axis shift above the high end cap");
            q[a] = if forward { p[a] + 1 } else { p[a] - 1 };
            return q;
        }
        q[a] = match (self.side, forward) {
            (SideBoundary::Periodic, true) => (p[a] + 1) % n,
            (SideBoundary::Periodic, false) => (p[a] + n - 1) % n,
            (SideBoundary::Symmetric, true) => (p[a] + 1).min(n - 1),
            (SideBoundary::Symmetric, false) => p[a].saturating_sub(1),
        };
        q
    }
}

// ─────────────────────────── face stencil ────────────────────────────

/// At most two normal and eight cross-term contributions per face.
const MAX_FACE_TERMS: usize = 10;

/// Linear weights of one face flux `G = Σ w_i T(p_i)`.
#[derive(Debug, Clone, Copy)]
pub struct FaceStencil {
    terms: [([usize; 3], f64); MAX_FACE_TERMS],
    len: usize,
    /// Harmonic-mean normal conductance.
    pub conductance: f64,
}

impl FaceStencil {
    fn empty() -> Self {
        FaceStencil {
            terms: [([0; 3], 0.0); MAX_FACE_TERMS],
            len: 0,
            conductance: 0.0,
        }
    }

    fn push(&mut self, p: [usize; 3], w: f64) {
        self.terms[self.len] = (p, w);
        self.len += 1;
    }

    pub fn terms(&self) -> &[([usize; 3], f64)] {
        &self.terms[..self.len]
    }
}

/// `2ab / (a + b)`, zero when either side does not conduct.
#[inline]
pub fn harmonic_mean(a: f64, b: f64) -> f64 {
    let s = a + b;
    if s > 0.0 {
        2.0 * a * b / s
    } else {
        0.0
    }
}

/// Face-flux evaluator over a fixed grid and per-voxel tensors.
#[derive(Debug, Clone, Copy)]
pub struct FluxStencil<'a> {
    topo: GridTopology,
    tensors: &'a [SymmetricTensor],
}

impl<'a> FluxStencil<'a> {
    pub fn new(topo: GridTopology, tensors: &'a [SymmetricTensor]) -> Self {
        debug_assert_eq!(tensors.len(), topo.voxel_count());
        FluxStencil { topo, tensors }
    }

    pub fn topology(&self) -> &GridTopology {
        &self.topo
    }

    #[inline]
    pub fn tensor(&self, p: [usize; 3]) -> &SymmetricTensor {
        &self.tensors[self.topo.linear_index(p)]
    }

    /// Weights of the flux from `lo` into `hi` across their shared face
    /// normal to axis `a`. `lo == hi` is a mirrored side face.
    pub fn face(&self, lo: [usize; 3], hi: [usize; 3], a: usize, cross: bool) -> FaceStencil {
        let (kl, kh) = (self.tensor(lo), self.tensor(hi));
        let mut st = FaceStencil::empty();
        let kbar = harmonic_mean(kl.get(a, a), kh.get(a, a));
        if kbar == 0.0 {
            return st;
        }
        st.conductance = kbar;
        st.push(hi, -kbar);
        st.push(lo, kbar);
        if !cross {
            return st;
        }
        for b in (0..3).filter(|&b| b != a) {
            let kt = 0.5 * (kl.get(a, b) + kh.get(a, b));
            if kt == 0.0 {
                continue;
            }
            let w = 0.25 * kt;
            st.push(self.topo.shift(lo, b, true), -w);
            st.push(self.topo.shift(lo, b, false), w);
            st.push(self.topo.shift(hi, b, true), -w);
            st.push(self.topo.shift(hi, b, false), w);
        }
        st
    }

    /// Full (normal + cross) face flux for a solved potential field.
    pub fn face_flux(&self, t: &ndarray::Array3<f64>, lo: [usize; 3], hi: [usize; 3], a: usize) -> f64 {
        self.face(lo, hi, a, true)
            .terms()
            .iter()
            .map(|&(p, w)| w * t[p])
            .sum()
    }
}

// ───────────────────────────── assembly ──────────────────────────────

/// Assembled system over the unknown voxels.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    pub matrix: CsrMatrix,
    pub rhs: Vec<f64>,
    /// Rows pinned to the reference profile because no face conducts.
    pub isolated: usize,
}

struct AssembledRow {
    entries: Vec<(usize, f64)>,
    rhs: f64,
    coupled: bool,
}

fn assemble_row(stencil: &FluxStencil<'_>, caps: &EndCaps<'_>, u: usize, cross: bool) -> AssembledRow {
    let topo = stencil.topology();
    let c = topo.unknown_position(u);
    let mut entries = Vec::with_capacity(if cross { 6 * MAX_FACE_TERMS } else { 12 });
    let mut rhs = 0.0;
    let mut coupled = false;

    for a in 0..3 {
        let up = topo.shift(c, a, true);
        let down = topo.shift(c, a, false);
        // Outward flux: +G on the upper face, -G on the lower face.
        for (sign, lo, hi) in [(1.0, c, up), (-1.0, down, c)] {
            let face = stencil.face(lo, hi, a, cross);
            coupled |= face.conductance > 0.0 && lo != hi;
            for &(p, w) in face.terms() {
                match topo.unknown_index(p) {
                    Some(j) => entries.push((j, sign * w)),
                    None => rhs -= sign * w * caps.value(p),
                }
            }
        }
    }

    if !coupled {
        return AssembledRow {
            entries: vec![(u, 1.0)],
            rhs: caps.reference(c),
            coupled,
        };
    }
    AssembledRow {
        entries,
        rhs,
        coupled,
    }
}

/// Build the system for `scheme`. Rows are independent and assembled in
/// parallel on the current rayon pool.
pub fn assemble(
    stencil: &FluxStencil<'_>,
    caps: &EndCaps<'_>,
    scheme: Scheme,
) -> TransportResult<LinearSystem> {
    let n = stencil.topology().n_unknowns();
    if n == 0 {
        return Err(TransportError::DegenerateDomain("no unknown voxels".to_string()));
    }
    let cross = scheme.cross_terms_in_matrix();

    let rows: Vec<AssembledRow> = (0..n)
        .into_par_iter()
        .map(|u| assemble_row(stencil, caps, u, cross))
        .collect();

    let isolated = rows.iter().filter(|r| !r.coupled).count();
    if isolated == n {
        return Err(TransportError::DegenerateDomain(
            "no conducting face between any two voxels".to_string(),
        ));
    }

    let mut rhs = Vec::with_capacity(n);
    let mut entries = Vec::with_capacity(n);
    for row in rows {
        rhs.push(row.rhs);
        entries.push(row.entries);
    }
    let matrix = CsrMatrix::from_rows(entries);
    log::debug!(
        "assembled {} system: {n} unknowns, {} non-zeros, {isolated} isolated rows",
        scheme,
        matrix.nnz()
    );

    Ok(LinearSystem {
        matrix,
        rhs,
        isolated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundarySpec;
    use ndarray::Array3;
    use puma_math::iterative::{IterativeConfig, IterativeMethod};

    fn uniform(shape: [usize; 3], k: SymmetricTensor) -> Vec<SymmetricTensor> {
        vec![k; shape.iter().product()]
    }

    #[test]
    fn test_parse_scheme() {
        assert_eq!("mpfa".parse::<Scheme>().unwrap(), Scheme::Mpfa);
        assert_eq!("empfa".parse::<Scheme>().unwrap(), Scheme::Empfa);
        assert!(matches!(
            "MPFA".parse::<Scheme>().unwrap_err(),
            TransportError::InvalidMethod(_)
        ));
    }

    #[test]
    fn test_unknown_indexing_roundtrip() {
        for dir in Direction::ALL {
            let topo = GridTopology::new([4, 5, 6], dir, SideBoundary::Periodic).expect("topology");
            let n = topo.n_unknowns();
            assert_eq!(n, 4 * 5 * 6 / topo.slices() * (topo.slices() - 2));
            for u in 0..n {
                let p = topo.unknown_position(u);
                assert_eq!(topo.unknown_index(p), Some(u));
            }
            let mut end = [1, 1, 1];
            end[dir.axis()] = 0;
            assert_eq!(topo.unknown_index(end), None);
            end[dir.axis()] = topo.slices() - 1;
            assert_eq!(topo.unknown_index(end), None);
        }
    }

    #[test]
    fn test_shift_side_boundaries() {
        let per = GridTopology::new([3, 4, 1], Direction::X, SideBoundary::Periodic).expect("topology");
        assert_eq!(per.shift([1, 3, 0], 1, true), [1, 0, 0]);
        assert_eq!(per.shift([1, 0, 0], 1, false), [1, 3, 0]);
        assert_eq!(per.shift([1, 0, 0], 2, true), [1, 0, 0]);

        let sym = GridTopology::new([3, 4, 1], Direction::X, SideBoundary::Symmetric).expect("topology");
        assert_eq!(sym.shift([1, 3, 0], 1, true), [1, 3, 0]);
        assert_eq!(sym.shift([1, 0, 0], 1, false), [1, 0, 0]);
        assert_eq!(sym.shift([1, 2, 0], 1, true), [1, 3, 0]);
        assert_eq!(sym.shift([1, 2, 0], 0, false), [0, 2, 0]);
    }

    #[test]
    fn test_thin_domain_is_degenerate() {
        let err = GridTopology::new([2, 100, 100], Direction::X, SideBoundary::Periodic).unwrap_err();
        assert!(matches!(err, TransportError::DegenerateDomain(_)));
    }

    #[test]
    fn test_harmonic_mean() {
        assert_eq!(harmonic_mean(0.0, 0.0), 0.0);
        assert_eq!(harmonic_mean(0.0, 5.0), 0.0);
        assert!((harmonic_mean(1.0, 10.0) - 20.0 / 11.0).abs() < 1e-15);
        assert_eq!(harmonic_mean(3.0, 3.0), 3.0);
    }

    #[test]
    fn test_two_point_face_weights() {
        let topo = GridTopology::new([3, 3, 3], Direction::X, SideBoundary::Symmetric).expect("topology");
        let tensors = uniform([3, 3, 3], SymmetricTensor::from_components([2.0, 1.0, 1.0, 0.5, 0.0, 0.0]));
        let st = FluxStencil::new(topo, &tensors);
        let face = st.face([0, 1, 1], [1, 1, 1], 0, false);
        assert_eq!(face.terms(), &[([1, 1, 1], -2.0), ([0, 1, 1], 2.0)]);

        let full = st.face([0, 1, 1], [1, 1, 1], 0, true);
        // Only K_xy is non-zero: 2 normal + 4 cross terms.
        assert_eq!(full.terms().len(), 6);
    }

    #[test]
    fn test_empfa_matrix_is_symmetric() {
        let shape = [6, 5, 4];
        let topo = GridTopology::new(shape, Direction::Y, SideBoundary::Symmetric).expect("topology");
        let tensors: Vec<SymmetricTensor> = (0..120)
            .map(|i| SymmetricTensor::from_components([1.0 + (i % 7) as f64, 2.0, 0.5 + (i % 3) as f64, 0.3, 0.1, 0.2]))
            .collect();
        let st = FluxStencil::new(topo, &tensors);
        let spec = BoundarySpec::new(SideBoundary::Symmetric);
        let caps = spec.end_caps(shape, Direction::Y);
        let sys = assemble(&st, &caps, Scheme::Empfa).expect("system");
        assert!(sys.matrix.is_symmetric(1e-12));
        assert_eq!(sys.isolated, 0);
        for d in sys.matrix.diagonal() {
            assert!(d > 0.0);
        }
    }

    #[test]
    fn test_homogeneous_solution_is_linear() {
        let shape = [7, 4, 3];
        let topo = GridTopology::new(shape, Direction::X, SideBoundary::Symmetric).expect("topology");
        let tensors = uniform(shape, SymmetricTensor::from_components([1.0, 1.0, 1.0, 0.5, 0.5, 0.5]));
        let st = FluxStencil::new(topo, &tensors);
        let spec = BoundarySpec::new(SideBoundary::Symmetric);
        let caps = spec.end_caps(shape, Direction::X);
        let sys = assemble(&st, &caps, Scheme::Mpfa).expect("system");

        let cfg = IterativeConfig {
            max_iter: 1000,
            tol: 1e-12,
        };
        let res = IterativeMethod::BiCgStab.solve(&sys.matrix, &sys.rhs, &cfg);
        assert!(res.converged, "residual {}", res.residual);
        for (u, t) in res.x.iter().enumerate() {
            let p = topo.unknown_position(u);
            let exact = p[0] as f64 / 6.0;
            assert!((t - exact).abs() < 1e-9, "{p:?}: {t} vs {exact}");
        }
    }

    #[test]
    fn test_isolated_voxels_pinned_to_reference() {
        let shape = [5, 2, 2];
        let topo = GridTopology::new(shape, Direction::X, SideBoundary::Periodic).expect("topology");
        // Conducting everywhere except the x = 2 slice.
        let tensors: Vec<SymmetricTensor> = (0..20)
            .map(|i| {
                let p = topo.position(i);
                SymmetricTensor::isotropic(if p[0] == 2 { 0.0 } else { 1.0 })
            })
            .collect();
        let st = FluxStencil::new(topo, &tensors);
        let spec = BoundarySpec::new(SideBoundary::Periodic);
        let caps = spec.end_caps(shape, Direction::X);
        let sys = assemble(&st, &caps, Scheme::Empfa).expect("system");
        assert_eq!(sys.isolated, 4);
        let u = topo.unknown_index([2, 1, 0]).expect("interior");
        let (cols, vals) = sys.matrix.row(u);
        assert_eq!(cols, &[u]);
        assert_eq!(vals, &[1.0]);
        assert!((sys.rhs[u] - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_non_conducting_domain_is_degenerate() {
        let shape = [4, 3, 3];
        let topo = GridTopology::new(shape, Direction::Z, SideBoundary::Symmetric).expect("topology");
        let tensors = uniform(shape, SymmetricTensor::isotropic(0.0));
        let st = FluxStencil::new(topo, &tensors);
        let spec = BoundarySpec::new(SideBoundary::Symmetric);
        let caps = spec.end_caps(shape, Direction::Z);
        let err = assemble(&st, &caps, Scheme::Mpfa).unwrap_err();
        assert!(matches!(err, TransportError::DegenerateDomain(_)));
    }

    #[test]
    fn test_face_flux_of_linear_field() {
        let shape = [5, 3, 3];
        let topo = GridTopology::new(shape, Direction::X, SideBoundary::Periodic).expect("topology");
        let tensors = uniform(shape, SymmetricTensor::from_components([3.0, 1.0, 1.0, 0.4, 0.2, 0.0]));
        let st = FluxStencil::new(topo, &tensors);
        let t = Array3::from_shape_fn((5, 3, 3), |(x, _, _)| x as f64 * 0.25);
        // Normal face: -K_xx dT/dx.
        assert!((st.face_flux(&t, [1, 1, 1], [2, 1, 1], 0) + 0.75).abs() < 1e-14);
        // Side face normal to y: -K_yx dT/dx through the cross term.
        assert!((st.face_flux(&t, [2, 2, 0], [2, 0, 0], 1) + 0.1).abs() < 1e-14);
    }
}
