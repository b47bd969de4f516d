// ─────────────────────────────────────────────────────────────────────
// PuMA-RS — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};

use crate::constants::MIN_SOLVE_SLICES;
use crate::error::{TransportError, TransportResult};

/// Axis along which the potential difference is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    X,
    Y,
    Z,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::X, Direction::Y, Direction::Z];

    /// Array axis index (x = 0, y = 1, z = 2).
    pub fn axis(self) -> usize {
        match self {
            Direction::X => 0,
            Direction::Y => 1,
            Direction::Z => 2,
        }
    }

    /// The two axes perpendicular to this one, in ascending order.
    pub fn transverse(self) -> [usize; 2] {
        match self {
            Direction::X => [1, 2],
            Direction::Y => [0, 2],
            Direction::Z => [0, 1],
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Direction::X => "x",
            Direction::Y => "y",
            Direction::Z => "z",
        }
    }
}

impl FromStr for Direction {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" => Ok(Direction::X),
            "y" => Ok(Direction::Y),
            "z" => Ok(Direction::Z),
            other => Err(TransportError::InvalidDirection(other.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Segmented or grayscale voxel volume, indexed `[x, y, z]`.
#[derive(Debug, Clone)]
pub struct VoxelVolume {
    labels: Array3<u16>,
    voxel_length: f64,
}

impl VoxelVolume {
    pub fn new(labels: Array3<u16>, voxel_length: f64) -> Self {
        VoxelVolume {
            labels,
            voxel_length,
        }
    }

    /// Uniform volume filled with a single label.
    pub fn from_elem(shape: (usize, usize, usize), label: u16, voxel_length: f64) -> Self {
        Self::new(Array3::from_elem(shape, label), voxel_length)
    }

    pub fn from_shape_fn<F>(shape: (usize, usize, usize), voxel_length: f64, f: F) -> Self
    where
        F: FnMut((usize, usize, usize)) -> u16,
    {
        Self::new(Array3::from_shape_fn(shape, f), voxel_length)
    }

    pub fn labels(&self) -> &Array3<u16> {
        &self.labels
    }

    pub fn voxel_length(&self) -> f64 {
        self.voxel_length
    }

    pub fn shape(&self) -> [usize; 3] {
        let (nx, ny, nz) = self.labels.dim();
        [nx, ny, nz]
    }

    /// Total voxel count. `usize` keeps volumes beyond 2^31 voxels addressable.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, idx: [usize; 3]) -> u16 {
        self.labels[idx]
    }

    pub fn distinct_labels(&self) -> BTreeSet<u16> {
        self.labels.iter().copied().collect()
    }

    /// Volume fraction of voxels whose label lies in `[low, high]`.
    pub fn fraction_in_range(&self, low: u16, high: u16) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let count = self
            .labels
            .iter()
            .filter(|&&l| l >= low && l <= high)
            .count();
        count as f64 / self.len() as f64
    }

    /// Check that the volume can host a solve.
    ///
    /// The thickness requirement is only checked when the direction is known;
    /// an unparseable direction is reported later by its own validator.
    pub fn validate(&self, direction: Option<Direction>) -> TransportResult<()> {
        if self.is_empty() {
            return Err(TransportError::InvalidVolume(format!(
                "volume is empty (shape {:?})",
                self.shape()
            )));
        }
        if !self.voxel_length.is_finite() || self.voxel_length <= 0.0 {
            return Err(TransportError::InvalidVolume(format!(
                "voxel length must be finite and > 0, got {}",
                self.voxel_length
            )));
        }
        if let Some(d) = direction {
            let slices = self.shape()[d.axis()];
            if slices < MIN_SOLVE_SLICES {
                return Err(TransportError::InvalidVolume(format!(
                    "{slices} voxel(s) along {d}, need at least {MIN_SOLVE_SLICES}"
                )));
            }
        }
        Ok(())
    }
}

/// Per-voxel direction vectors, shape `[x, y, z, 3]`.
#[derive(Debug, Clone)]
pub struct OrientationField {
    directions: Array4<f64>,
}

impl OrientationField {
    pub fn new(directions: Array4<f64>) -> Self {
        OrientationField { directions }
    }

    /// Field with the same vector at every voxel.
    pub fn uniform(shape: (usize, usize, usize), vector: [f64; 3]) -> Self {
        let (nx, ny, nz) = shape;
        let directions = Array4::from_shape_fn((nx, ny, nz, 3), |(_, _, _, c)| vector[c]);
        OrientationField { directions }
    }

    pub fn directions(&self) -> &Array4<f64> {
        &self.directions
    }

    /// Full array shape including the trailing component axis.
    pub fn raw_shape(&self) -> &[usize] {
        self.directions.shape()
    }

    pub fn vector(&self, idx: [usize; 3]) -> [f64; 3] {
        let [i, j, k] = idx;
        [
            self.directions[[i, j, k, 0]],
            self.directions[[i, j, k, 1]],
            self.directions[[i, j, k, 2]],
        ]
    }
}

/// Caller-owned output sink for the potential and flux fields.
#[derive(Debug, Clone)]
pub struct TransportFields {
    /// Potential (temperature / voltage / concentration) `[x, y, z]`.
    pub temperature: Array3<f64>,
    /// Flux vector `[x, y, z, 3]`.
    pub flux: Array4<f64>,
}

impl TransportFields {
    pub fn new() -> Self {
        TransportFields {
            temperature: Array3::zeros((0, 0, 0)),
            flux: Array4::zeros((0, 0, 0, 3)),
        }
    }

    pub fn zeros(shape: [usize; 3]) -> Self {
        let [nx, ny, nz] = shape;
        TransportFields {
            temperature: Array3::zeros((nx, ny, nz)),
            flux: Array4::zeros((nx, ny, nz, 3)),
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        let (nx, ny, nz) = self.temperature.dim();
        [nx, ny, nz]
    }
}

impl Default for TransportFields {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parsing_is_exact() {
        assert_eq!("x".parse::<Direction>().unwrap(), Direction::X);
        assert_eq!("y".parse::<Direction>().unwrap(), Direction::Y);
        assert_eq!("z".parse::<Direction>().unwrap(), Direction::Z);
        assert!(matches!(
            "X".parse::<Direction>(),
            Err(TransportError::InvalidDirection(_))
        ));
        assert!("a".parse::<Direction>().is_err());
        assert!("".parse::<Direction>().is_err());
    }

    #[test]
    fn test_direction_transverse_axes() {
        assert_eq!(Direction::X.transverse(), [1, 2]);
        assert_eq!(Direction::Y.transverse(), [0, 2]);
        assert_eq!(Direction::Z.transverse(), [0, 1]);
        for d in Direction::ALL {
            assert!(!d.transverse().contains(&d.axis()));
        }
    }

    #[test]
    fn test_volume_validation() {
        let vol = VoxelVolume::from_elem((3, 4, 5), 1, 1e-6);
        assert!(vol.validate(Some(Direction::X)).is_ok());
        assert!(vol.validate(None).is_ok());

        let thin = VoxelVolume::from_elem((2, 100, 100), 1, 1.0);
        assert!(matches!(
            thin.validate(Some(Direction::X)),
            Err(TransportError::InvalidVolume(_))
        ));
        assert!(thin.validate(Some(Direction::Y)).is_ok());

        let empty = VoxelVolume::from_elem((0, 4, 4), 1, 1.0);
        assert!(empty.validate(None).is_err());

        let bad_length = VoxelVolume::from_elem((4, 4, 4), 1, 0.0);
        assert!(bad_length.validate(None).is_err());
    }

    #[test]
    fn test_volume_fraction_and_labels() {
        let vol = VoxelVolume::from_shape_fn((4, 2, 2), 1.0, |(i, _, _)| if i < 1 { 0 } else { 255 });
        assert!((vol.fraction_in_range(0, 127) - 0.25).abs() < 1e-15);
        assert_eq!(vol.distinct_labels().into_iter().collect::<Vec<_>>(), vec![0, 255]);
    }

    #[test]
    fn test_uniform_orientation() {
        let field = OrientationField::uniform((2, 3, 4), [0.0, 1.0, 0.0]);
        assert_eq!(field.raw_shape(), &[2, 3, 4, 3]);
        assert_eq!(field.vector([1, 2, 3]), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_fields_default_is_empty() {
        let fields = TransportFields::default();
        assert_eq!(fields.shape(), [0, 0, 0]);
        assert_eq!(fields.flux.shape(), &[0, 0, 0, 3]);
    }
}
