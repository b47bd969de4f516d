//! Boundary conditions: side treatment and Dirichlet end caps.
//!
//! Along the solve axis the first and last slices are Dirichlet voxels.
//! Their values default to 0 (low end) and 1 (high end); a prescribed
//! matrix with two layers along the solve axis replaces them per voxel.
//! The two side axes are either mirrored or wrapped.

use std::fmt;
use std::str::FromStr;

use ndarray::Array3;

use puma_types::constants::{HIGH_END_POTENTIAL, LOW_END_POTENTIAL};
use puma_types::error::{TransportError, TransportResult};
use puma_types::state::Direction;

/// Treatment of the faces parallel to the solve axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideBoundary {
    /// Reflective: the ghost voxel beyond a side face is its interior mirror.
    Symmetric,
    /// Wraparound to the opposite side.
    Periodic,
}

impl SideBoundary {
    pub fn tag(self) -> &'static str {
        match self {
            SideBoundary::Symmetric => "symmetric",
            SideBoundary::Periodic => "periodic",
        }
    }
}

impl FromStr for SideBoundary {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "symmetric" => Ok(SideBoundary::Symmetric),
            "periodic" => Ok(SideBoundary::Periodic),
            other => Err(TransportError::InvalidBoundaryCondition(other.to_string())),
        }
    }
}

impl fmt::Display for SideBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Side treatment plus optional prescribed end-cap values.
#[derive(Debug, Clone)]
pub struct BoundarySpec {
    pub side: SideBoundary,
    prescribed: Option<Array3<f64>>,
}

impl BoundarySpec {
    pub fn new(side: SideBoundary) -> Self {
        BoundarySpec {
            side,
            prescribed: None,
        }
    }

    /// End caps taken from `matrix`: layer 0 = low end, layer 1 = high end.
    pub fn with_prescribed(side: SideBoundary, matrix: Array3<f64>) -> Self {
        BoundarySpec {
            side,
            prescribed: Some(matrix),
        }
    }

    /// Parse the side tag; the matrix, if any, is attached unchecked.
    pub fn from_tags(kind: &str, matrix: Option<&Array3<f64>>) -> TransportResult<Self> {
        let side = kind.parse()?;
        Ok(BoundarySpec {
            side,
            prescribed: matrix.cloned(),
        })
    }

    /// Volume shape with the solve axis collapsed to its two end layers.
    pub fn expected_matrix_shape(volume_shape: [usize; 3], direction: Direction) -> [usize; 3] {
        let mut shape = volume_shape;
        shape[direction.axis()] = 2;
        shape
    }

    /// The prescribed matrix must match the end-cap layers exactly and hold
    /// finite values only.
    pub fn validate(&self, volume_shape: [usize; 3], direction: Direction) -> TransportResult<()> {
        let Some(matrix) = &self.prescribed else {
            return Ok(());
        };
        let expected = Self::expected_matrix_shape(volume_shape, direction);
        if matrix.shape() != expected {
            return Err(TransportError::InvalidBoundaryMatrix(format!(
                "expected shape {expected:?}, got {:?}",
                matrix.shape()
            )));
        }
        if let Some(((i, j, k), v)) = matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(TransportError::InvalidBoundaryMatrix(format!(
                "non-finite value {v} at [{i}, {j}, {k}]"
            )));
        }
        Ok(())
    }

    /// Dirichlet values; call after [`BoundarySpec::validate`].
    pub fn end_caps(&self, volume_shape: [usize; 3], direction: Direction) -> EndCaps<'_> {
        EndCaps {
            axis: direction.axis(),
            slices: volume_shape[direction.axis()],
            prescribed: self.prescribed.as_ref(),
        }
    }
}

/// Dirichlet values on the two end-cap slices.
#[derive(Debug, Clone, Copy)]
pub struct EndCaps<'a> {
    axis: usize,
    slices: usize,
    prescribed: Option<&'a Array3<f64>>,
}

impl EndCaps<'_> {
    pub fn is_end_cap(&self, p: [usize; 3]) -> bool {
        p[self.axis] == 0 || p[self.axis] + 1 == self.slices
    }

    /// Value at end-cap voxel `p`.
    pub fn value(&self, p: [usize; 3]) -> f64 {
        debug_assert!(self.is_end_cap(p), "{p:?} is not an end-cap voxel");
        let layer = if p[self.axis] == 0 { 0 } else { 1 };
        match self.prescribed {
            Some(m) => {
                let mut q = p;
                q[self.axis] = layer;
                m[q]
            }
            None if layer == 0 => LOW_END_POTENTIAL,
            None => HIGH_END_POTENTIAL,
        }
    }

    /// Linear interpolation between the two end caps on the line through `p`.
    pub fn reference(&self, p: [usize; 3]) -> f64 {
        let mut lo = p;
        lo[self.axis] = 0;
        let mut hi = p;
        hi[self.axis] = self.slices - 1;
        let (t0, t1) = (self.value(lo), self.value(hi));
        t0 + (t1 - t0) * p[self.axis] as f64 / (self.slices - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_side_tags() {
        assert_eq!("symmetric".parse::<SideBoundary>().unwrap(), SideBoundary::Symmetric);
        assert_eq!("periodic".parse::<SideBoundary>().unwrap(), SideBoundary::Periodic);
        for bad in ["Symmetric", "PERIODIC", "mirror", ""] {
            let err = bad.parse::<SideBoundary>().unwrap_err();
            assert!(matches!(err, TransportError::InvalidBoundaryCondition(_)));
        }
    }

    #[test]
    fn test_expected_shapes() {
        let shape = [3, 15, 10];
        assert_eq!(BoundarySpec::expected_matrix_shape(shape, Direction::X), [2, 15, 10]);
        assert_eq!(BoundarySpec::expected_matrix_shape(shape, Direction::Y), [3, 2, 10]);
        assert_eq!(BoundarySpec::expected_matrix_shape(shape, Direction::Z), [3, 15, 2]);
    }

    #[test]
    fn test_shape_mismatch_never_truncated() {
        let spec = BoundarySpec::with_prescribed(SideBoundary::Symmetric, Array3::zeros((2, 14, 10)));
        match spec.validate([3, 15, 10], Direction::X) {
            Err(TransportError::InvalidBoundaryMatrix(msg)) => {
                assert!(msg.contains("[2, 15, 10]"), "{msg}");
                assert!(msg.contains("[2, 14, 10]"), "{msg}");
            }
            other => panic!("expected InvalidBoundaryMatrix, got {other:?}"),
        }
        assert!(spec.validate([3, 14, 10], Direction::X).is_ok());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut m = Array3::from_elem((2, 4, 4), 10.0);
            m[[1, 0, 0]] = bad;
            let spec = BoundarySpec::with_prescribed(SideBoundary::Symmetric, m);
            match spec.validate([3, 4, 4], Direction::X) {
                Err(TransportError::InvalidBoundaryMatrix(msg)) => {
                    assert!(msg.contains("[1, 0, 0]"), "{msg}");
                }
                other => panic!("expected InvalidBoundaryMatrix for {bad}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_default_end_caps() {
        let spec = BoundarySpec::new(SideBoundary::Periodic);
        let caps = spec.end_caps([5, 2, 2], Direction::X);
        assert_eq!(caps.value([0, 1, 1]), 0.0);
        assert_eq!(caps.value([4, 0, 1]), 1.0);
        assert!((caps.reference([2, 0, 0]) - 0.5).abs() < 1e-15);
        assert!(!caps.is_end_cap([3, 0, 0]));
    }

    #[test]
    fn test_prescribed_end_caps() {
        let mut m = Array3::zeros((3, 2, 4));
        m[[1, 1, 2]] = 10.0;
        m[[1, 0, 2]] = 2.0;
        let spec = BoundarySpec::with_prescribed(SideBoundary::Symmetric, m);
        assert!(spec.validate([3, 7, 4], Direction::Y).is_ok());
        let caps = spec.end_caps([3, 7, 4], Direction::Y);
        assert_eq!(caps.value([1, 6, 2]), 10.0);
        assert_eq!(caps.value([1, 0, 2]), 2.0);
        assert_eq!(caps.value([0, 6, 0]), 0.0);
        assert!((caps.reference([1, 3, 2]) - 6.0).abs() < 1e-12);
    }
}
