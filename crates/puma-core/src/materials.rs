//! Material id → conductivity lookup.
//!
//! Raw tables map a label to 1 value (isotropic `k`) or 6 values
//! (`kxx, kyy, kzz, kxy, kxz, kyz`). Arity, finiteness and non-negative
//! diagonals are checked when an entry is inserted; coverage of the labels
//! actually present in a volume is checked separately at solve time.

use std::collections::BTreeMap;

use puma_math::tensor::SymmetricTensor;
use puma_types::error::{TransportError, TransportResult};
use puma_types::state::VoxelVolume;

/// Conductivity record of one material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialConductivity {
    Scalar(f64),
    /// Symmetric tensor in the material's local axes (first axis = fibre).
    Tensor(SymmetricTensor),
}

impl MaterialConductivity {
    /// Validate a raw value list for material `id`.
    pub fn from_values(id: u16, values: &[f64]) -> TransportResult<Self> {
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(TransportError::InvalidMaterialTable(format!(
                "material {id}: non-finite conductivity {bad}"
            )));
        }
        let record = match values.len() {
            1 => MaterialConductivity::Scalar(values[0]),
            6 => MaterialConductivity::Tensor(SymmetricTensor::from_components([
                values[0], values[1], values[2], values[3], values[4], values[5],
            ])),
            n => {
                return Err(TransportError::InvalidMaterialTable(format!(
                    "material {id}: expected 1 or 6 conductivity values, got {n}"
                )))
            }
        };
        if let Some(d) = record.diagonal().into_iter().find(|&d| d < 0.0) {
            return Err(TransportError::InvalidMaterialTable(format!(
                "material {id}: negative diagonal conductivity {d}"
            )));
        }
        Ok(record)
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, MaterialConductivity::Tensor(_))
    }

    pub fn diagonal(&self) -> [f64; 3] {
        match self {
            MaterialConductivity::Scalar(k) => [*k; 3],
            MaterialConductivity::Tensor(t) => [t.xx, t.yy, t.zz],
        }
    }

    /// Tensor in global axes before any orientation is applied.
    pub fn tensor(&self) -> SymmetricTensor {
        match self {
            MaterialConductivity::Scalar(k) => SymmetricTensor::isotropic(*k),
            MaterialConductivity::Tensor(t) => *t,
        }
    }
}

/// Validated material table.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    entries: BTreeMap<u16, MaterialConductivity>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the raw `id → values` map, failing on the first bad entry.
    pub fn from_raw(raw: &BTreeMap<u16, Vec<f64>>) -> TransportResult<Self> {
        let mut table = Self::new();
        for (&id, values) in raw {
            table.insert(id, values)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, id: u16, values: &[f64]) -> TransportResult<()> {
        let record = MaterialConductivity::from_values(id, values)?;
        self.entries.insert(id, record);
        Ok(())
    }

    /// Assign the same record to every label in `low..=high`.
    pub fn insert_range(&mut self, low: u16, high: u16, values: &[f64]) -> TransportResult<()> {
        if high < low {
            return Err(TransportError::InvalidMaterialTable(format!(
                "label range {low}..={high} is reversed"
            )));
        }
        let record = MaterialConductivity::from_values(low, values)?;
        for id in low..=high {
            self.entries.insert(id, record);
        }
        Ok(())
    }

    pub fn get(&self, id: u16) -> Option<&MaterialConductivity> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// No entry carries a tensor.
    pub fn is_isotropic(&self) -> bool {
        self.entries.values().all(|m| !m.is_tensor())
    }

    /// Reject tables with tensor entries, for the scalar-only solvers.
    pub fn require_isotropic(&self) -> TransportResult<()> {
        match self.entries.iter().find(|(_, m)| m.is_tensor()) {
            Some((id, _)) => Err(TransportError::InvalidMaterialTable(format!(
                "material {id} is a tensor; this solver accepts scalar conductivities only"
            ))),
            None => Ok(()),
        }
    }

    /// Every label occurring in `volume` must have an entry.
    pub fn check_coverage(&self, volume: &VoxelVolume) -> TransportResult<()> {
        let missing: Vec<u16> = volume
            .distinct_labels()
            .into_iter()
            .filter(|id| !self.entries.contains_key(id))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TransportError::InvalidMaterialTable(format!(
                "no conductivity for material id(s) {missing:?}"
            )))
        }
    }
}
