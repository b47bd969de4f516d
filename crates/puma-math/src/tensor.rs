// ─────────────────────────────────────────────────────────────────────
// PuMA-RS — Symmetric Tensor Rotation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Symmetric 3×3 conductivity tensors and their rotation into the grid
//! frame.
//!
//! A material tensor is given in local axes whose first axis is the fibre
//! (orientation) direction. [`orthonormal_frame`] builds the rotation
//! `R = [e1 | e2 | e3]` from that direction and [`SymmetricTensor::rotated`]
//! applies `K = R K_local Rᵀ`.

/// Symmetric second-order tensor stored as its six independent entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetricTensor {
    pub xx: f64,
    pub yy: f64,
    pub zz: f64,
    pub xy: f64,
    pub xz: f64,
    pub yz: f64,
}

impl SymmetricTensor {
    pub fn isotropic(k: f64) -> Self {
        SymmetricTensor {
            xx: k,
            yy: k,
            zz: k,
            xy: 0.0,
            xz: 0.0,
            yz: 0.0,
        }
    }

    /// From `[kxx, kyy, kzz, kxy, kxz, kyz]`.
    pub fn from_components(c: [f64; 6]) -> Self {
        SymmetricTensor {
            xx: c[0],
            yy: c[1],
            zz: c[2],
            xy: c[3],
            xz: c[4],
            yz: c[5],
        }
    }

    pub fn to_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.xx, self.xy, self.xz],
            [self.xy, self.yy, self.yz],
            [self.xz, self.yz, self.zz],
        ]
    }

    /// Symmetrised read-back from a full matrix.
    pub fn from_matrix(m: &[[f64; 3]; 3]) -> Self {
        SymmetricTensor {
            xx: m[0][0],
            yy: m[1][1],
            zz: m[2][2],
            xy: 0.5 * (m[0][1] + m[1][0]),
            xz: 0.5 * (m[0][2] + m[2][0]),
            yz: 0.5 * (m[1][2] + m[2][1]),
        }
    }

    /// Entry `K[a][b]` for axes `a, b ∈ {0, 1, 2}`.
    #[inline]
    pub fn get(&self, a: usize, b: usize) -> f64 {
        match (a, b) {
            (0, 0) => self.xx,
            (1, 1) => self.yy,
            (2, 2) => self.zz,
            (0, 1) | (1, 0) => self.xy,
            (0, 2) | (2, 0) => self.xz,
            (1, 2) | (2, 1) => self.yz,
            _ => panic!("tensor axis out of range: ({a}, {b})"),
        }
    }

    pub fn trace(&self) -> f64 {
        self.xx + self.yy + self.zz
    }

    /// `R K Rᵀ` for a rotation given as columns `[e1, e2, e3]`.
    pub fn rotated(&self, frame: &[[f64; 3]; 3]) -> Self {
        let k = self.to_matrix();
        // R[i][j] = frame[j][i]
        let mut rk = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                rk[i][j] = (0..3).map(|m| frame[m][i] * k[m][j]).sum();
            }
        }
        let mut out = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                out[i][j] = (0..3).map(|m| rk[i][m] * frame[m][j]).sum();
            }
        }
        Self::from_matrix(&out)
    }

    /// Rotate so that the local first axis follows `direction`.
    /// `None` when `direction` has no usable length.
    pub fn aligned_with(&self, direction: [f64; 3]) -> Option<Self> {
        orthonormal_frame(direction).map(|frame| self.rotated(&frame))
    }
}

fn dot3(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross3(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize3(v: [f64; 3]) -> Option<[f64; 3]> {
    let n = dot3(v, v).sqrt();
    if n > 0.0 && n.is_finite() {
        Some([v[0] / n, v[1] / n, v[2] / n])
    } else {
        None
    }
}

/// Right-handed orthonormal frame `[e1, e2, e3]` with `e1 ∥ direction`.
///
/// `e2` is the Gram-Schmidt projection of the coordinate axis least
/// aligned with `direction` (first one on ties), `e3 = e1 × e2`. Axis
/// aligned inputs therefore give the identity for `x` and a permutation of
/// axes otherwise.
pub fn orthonormal_frame(direction: [f64; 3]) -> Option<[[f64; 3]; 3]> {
    let e1 = normalize3(direction)?;

    let mut helper_axis = 0;
    for a in 1..3 {
        if e1[a].abs() < e1[helper_axis].abs() {
            helper_axis = a;
        }
    }
    let mut h = [0.0; 3];
    h[helper_axis] = 1.0;

    let proj = dot3(h, e1);
    let e2 = normalize3([h[0] - proj * e1[0], h[1] - proj * e1[1], h[2] - proj * e1[2]])?;
    let e3 = cross3(e1, e2);
    Some([e1, e2, e3])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn fibre() -> SymmetricTensor {
        SymmetricTensor::from_components([12.0, 1.2, 1.2, 0.0, 0.0, 0.0])
    }

    #[test]
    fn test_frame_for_x_is_identity() {
        let f = orthonormal_frame([1.0, 0.0, 0.0]).unwrap();
        assert_eq!(f, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        let k = SymmetricTensor::from_components([1.0, 2.0, 3.0, 0.1, 0.2, 0.3]);
        assert_eq!(k.rotated(&f), k);
    }

    #[test]
    fn test_frame_is_orthonormal_and_right_handed() {
        let f = orthonormal_frame([0.3, -2.0, 0.7]).unwrap();
        for i in 0..3 {
            assert!(close(dot3(f[i], f[i]), 1.0));
            for j in (i + 1)..3 {
                assert!(close(dot3(f[i], f[j]), 0.0));
            }
        }
        let c = cross3(f[0], f[1]);
        for a in 0..3 {
            assert!(close(c[a], f[2][a]));
        }
    }

    #[test]
    fn test_fibre_along_y_swaps_axes() {
        let k = fibre().aligned_with([0.0, 3.0, 0.0]).unwrap();
        assert!(close(k.yy, 12.0));
        assert!(close(k.xx, 1.2));
        assert!(close(k.zz, 1.2));
        assert!(close(k.xy, 0.0) && close(k.xz, 0.0) && close(k.yz, 0.0));
    }

    #[test]
    fn test_fibre_along_z() {
        let k = fibre().aligned_with([0.0, 0.0, -1.0]).unwrap();
        assert!(close(k.zz, 12.0));
        assert!(close(k.xx, 1.2));
        assert!(close(k.yy, 1.2));
    }

    #[test]
    fn test_fibre_along_xy_diagonal() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let k = fibre().aligned_with([s, s, 0.0]).unwrap();
        assert!(close(k.xx, 6.6));
        assert!(close(k.yy, 6.6));
        assert!(close(k.xy, 5.4));
        assert!(close(k.zz, 1.2));
        assert!(close(k.xz, 0.0) && close(k.yz, 0.0));
    }

    #[test]
    fn test_rotation_preserves_trace() {
        let k = SymmetricTensor::from_components([3.0, 2.0, 1.0, 0.4, -0.2, 0.1]);
        let r = k.aligned_with([1.0, 2.0, 3.0]).unwrap();
        assert!((r.trace() - k.trace()).abs() < 1e-12);
    }

    #[test]
    fn test_isotropic_is_rotation_invariant() {
        let k = SymmetricTensor::isotropic(4.5);
        let r = k.aligned_with([0.2, 0.9, -0.4]).unwrap();
        assert!(close(r.xx, 4.5) && close(r.yy, 4.5) && close(r.zz, 4.5));
        assert!(close(r.xy, 0.0) && close(r.xz, 0.0) && close(r.yz, 0.0));
    }

    #[test]
    fn test_degenerate_direction() {
        assert!(orthonormal_frame([0.0, 0.0, 0.0]).is_none());
        assert!(orthonormal_frame([f64::NAN, 1.0, 0.0]).is_none());
        assert!(fibre().aligned_with([0.0; 3]).is_none());
    }

    #[test]
    fn test_get_is_symmetric() {
        let k = SymmetricTensor::from_components([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        for a in 0..3 {
            for b in 0..3 {
                assert_eq!(k.get(a, b), k.get(b, a));
                assert_eq!(k.get(a, b), k.to_matrix()[a][b]);
            }
        }
    }
}
