// ─────────────────────────────────────────────────────────────────────
// PuMA-RS — Orientation Field
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Orientation-field validation and per-voxel conductivity tensors in the
//! grid frame.

use rayon::prelude::*;

use puma_math::tensor::SymmetricTensor;
use puma_types::error::{TransportError, TransportResult};
use puma_types::state::{OrientationField, VoxelVolume};

use crate::materials::{MaterialConductivity, MaterialTable};

#[inline]
fn position(linear: usize, shape: [usize; 3]) -> [usize; 3] {
    let z = linear % shape[2];
    let y = (linear / shape[2]) % shape[1];
    let x = linear / (shape[1] * shape[2]);
    [x, y, z]
}

fn usable(v: [f64; 3]) -> bool {
    let m2 = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
    m2 > 0.0 && m2.is_finite()
}

/// Shape must be `[X, Y, Z, 3]`; voxels of tensor materials need a
/// non-zero finite vector. Scalar materials ignore the field.
pub fn validate_orientation(
    field: &OrientationField,
    volume: &VoxelVolume,
    table: &MaterialTable,
) -> TransportResult<()> {
    let [nx, ny, nz] = volume.shape();
    if field.raw_shape() != [nx, ny, nz, 3] {
        return Err(TransportError::InvalidOrientationField(format!(
            "shape {:?} does not match volume {:?} (expected [{nx}, {ny}, {nz}, 3])",
            field.raw_shape(),
            volume.shape()
        )));
    }

    let shape = volume.shape();
    let bad = (0..volume.len()).into_par_iter().find_first(|&i| {
        let p = position(i, shape);
        let is_tensor = table
            .get(volume.label(p))
            .map(MaterialConductivity::is_tensor)
            .unwrap_or(false);
        is_tensor && !usable(field.vector(p))
    });
    match bad {
        Some(i) => {
            let p = position(i, shape);
            Err(TransportError::InvalidOrientationField(format!(
                "zero or non-finite direction {:?} at voxel {p:?} of tensor material {}",
                field.vector(p),
                volume.label(p)
            )))
        }
        None => Ok(()),
    }
}

/// Conductivity tensor of every voxel in the grid frame, C order.
///
/// Tensor materials are rotated so their local first axis follows the
/// voxel's orientation vector; without a field they are used as given.
pub fn voxel_tensors(
    volume: &VoxelVolume,
    table: &MaterialTable,
    orientation: Option<&OrientationField>,
) -> TransportResult<Vec<SymmetricTensor>> {
    let shape = volume.shape();
    (0..volume.len())
        .into_par_iter()
        .map(|i| {
            let p = position(i, shape);
            let label = volume.label(p);
            let record = table.get(label).ok_or_else(|| {
                TransportError::InvalidMaterialTable(format!("no conductivity for material id {label}"))
            })?;
            match (record, orientation) {
                (MaterialConductivity::Tensor(local), Some(field)) => {
                    local.aligned_with(field.vector(p)).ok_or_else(|| {
                        TransportError::InvalidOrientationField(format!(
                            "cannot build a frame from {:?} at voxel {p:?}",
                            field.vector(p)
                        ))
                    })
                }
                _ => Ok(record.tensor()),
            }
        })
        .collect()
}
