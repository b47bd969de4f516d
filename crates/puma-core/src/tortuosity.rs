//! Tortuosity factor from an effective-diffusivity solve.
//!
//! Labels inside the inclusive cutoff range are void (diffusivity 1), all
//! others solid (diffusivity 0). The conductivity machinery solves the
//! diffusion problem with the two-point stencil; the tortuosity along the
//! solve axis is `τ = ε / D_eff`, with `ε` the void fraction.

use ndarray::Array3;

use puma_math::iterative::IterativeMethod;
use puma_types::config::SolveOptions;
use puma_types::constants::SENTINEL;
use puma_types::error::{TransportError, TransportResult};
use puma_types::state::{Direction, TransportFields, VoxelVolume};

use crate::boundary::BoundarySpec;
use crate::conductivity::{solve_validated, SolverStats, TransportProblem};
use crate::materials::MaterialTable;
use crate::stencil::Scheme;

const VOID_DIFFUSIVITY: f64 = 1.0;
const SOLID_DIFFUSIVITY: f64 = 0.0;

#[derive(Debug, Clone)]
pub struct TortuositySolution {
    /// `ε / D_eff` along the solve axis; infinite when no void path spans it.
    pub tortuosity: f64,
    /// Effective diffusivity row, normalised by the void diffusivity.
    pub diffusivity: [f64; 3],
    pub porosity: f64,
    pub fields: TransportFields,
    pub stats: SolverStats,
}

/// Plain result of [`compute_fv_tortuosity`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TortuosityReport {
    pub tortuosity: f64,
    pub diffusivity: [f64; 3],
    pub porosity: f64,
}

impl TortuosityReport {
    pub const SENTINEL: TortuosityReport = TortuosityReport {
        tortuosity: -1.0,
        diffusivity: SENTINEL,
        porosity: -1.0,
    };

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }
}

/// Two-phase diffusivity table for the labels present in `volume`.
fn cutoff_table(volume: &VoxelVolume, low: u16, high: u16) -> TransportResult<MaterialTable> {
    let mut table = MaterialTable::new();
    for id in volume.distinct_labels() {
        let d = if (low..=high).contains(&id) {
            VOID_DIFFUSIVITY
        } else {
            SOLID_DIFFUSIVITY
        };
        table.insert(id, &[d])?;
    }
    Ok(table)
}

/// Checks run in order: volume, cutoff, boundary tag and matrix, solver,
/// direction, porosity.
pub fn try_compute_fv_tortuosity(
    volume: &VoxelVolume,
    cutoff: (u16, u16),
    boundary_kind: &str,
    boundary_matrix: Option<&Array3<f64>>,
    solver: &str,
    direction: &str,
    options: &SolveOptions,
) -> TransportResult<TortuositySolution> {
    let axis = direction.parse::<Direction>().ok();
    volume.validate(axis)?;

    let (low, high) = cutoff;
    if high < low {
        return Err(TransportError::InvalidMaterialTable(format!(
            "void cutoff {low}..={high} is reversed"
        )));
    }
    let table = cutoff_table(volume, low, high)?;

    let boundary = BoundarySpec::from_tags(boundary_kind, boundary_matrix)?;
    if let Some(d) = axis {
        boundary.validate(volume.shape(), d)?;
    }
    let solver: IterativeMethod = solver.parse()?;
    let direction: Direction = direction.parse()?;

    let porosity = volume.fraction_in_range(low, high);
    if porosity == 0.0 {
        return Err(TransportError::DegenerateDomain(format!(
            "no void voxels in cutoff {low}..={high}"
        )));
    }

    let problem = TransportProblem {
        volume,
        materials: &table,
        orientation: None,
        boundary,
        scheme: Scheme::Empfa,
        solver,
        direction,
        options: *options,
    };
    let solution = solve_validated(&problem)?;

    let diffusivity = solution.conductivity.map(|k| k / VOID_DIFFUSIVITY);
    let d_axis = diffusivity[direction.axis()];
    let tortuosity = if d_axis > 0.0 {
        porosity / d_axis
    } else {
        f64::INFINITY
    };
    if options.verbose {
        log::info!("tortuosity along {direction}: {tortuosity:.6} (porosity {porosity:.4}, D_eff {d_axis:.6})");
    }

    Ok(TortuositySolution {
        tortuosity,
        diffusivity,
        porosity,
        fields: solution.fields,
        stats: solution.stats,
    })
}

/// Sentinel-returning wrapper of [`try_compute_fv_tortuosity`]; `fields`
/// receives the concentration and flux on success only.
#[allow(clippy::too_many_arguments)]
pub fn compute_fv_tortuosity(
    volume: &VoxelVolume,
    cutoff: (u16, u16),
    boundary_kind: &str,
    boundary_matrix: Option<&Array3<f64>>,
    solver: &str,
    direction: &str,
    options: &SolveOptions,
    fields: &mut TransportFields,
) -> TortuosityReport {
    match try_compute_fv_tortuosity(
        volume,
        cutoff,
        boundary_kind,
        boundary_matrix,
        solver,
        direction,
        options,
    ) {
        Ok(solution) => {
            *fields = solution.fields;
            TortuosityReport {
                tortuosity: solution.tortuosity,
                diffusivity: solution.diffusivity,
                porosity: solution.porosity,
            }
        }
        Err(e) => {
            log::error!("tortuosity: {e}; returning sentinel");
            TortuosityReport::SENTINEL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> SolveOptions {
        SolveOptions::default()
            .with_tolerance(1e-10)
            .with_max_iterations(5000)
    }

    #[test]
    fn test_straight_channels_have_unit_tortuosity() {
        // Void for y < 3, solid above: straight pores along x.
        let volume = VoxelVolume::from_shape_fn((12, 6, 4), 1.0, |(_, y, _)| if y < 3 { 0 } else { 255 });
        let mut fields = TransportFields::new();
        let report = compute_fv_tortuosity(&volume, (0, 0), "symmetric", None, "cg", "x", &opts(), &mut fields);
        assert!((report.porosity - 0.5).abs() < 1e-15);
        assert!((report.diffusivity[0] - 0.5).abs() < 1e-8, "{report:?}");
        assert!((report.tortuosity - 1.0).abs() < 1e-7);
        assert!(report.diffusivity[1].abs() < 1e-8);
        assert_eq!(fields.shape(), [12, 6, 4]);
    }

    #[test]
    fn test_blocked_path_gives_infinite_tortuosity() {
        // A solid wall next to the high end cap cuts every pore.
        let volume = VoxelVolume::from_shape_fn((10, 4, 4), 1.0, |(x, _, _)| if x == 8 { 1 } else { 0 });
        let sol = try_compute_fv_tortuosity(&volume, (0, 0), "periodic", None, "bicgstab", "x", &opts())
            .expect("solve");
        assert!(sol.diffusivity[0].abs() < 1e-12);
        assert!(sol.tortuosity.is_infinite());
        assert_eq!(sol.stats.isolated, 16);
    }

    #[test]
    fn test_zero_porosity_is_degenerate() {
        let volume = VoxelVolume::from_elem((5, 5, 5), 200, 1.0);
        let err = try_compute_fv_tortuosity(&volume, (0, 100), "periodic", None, "cg", "z", &opts())
            .unwrap_err();
        assert!(matches!(err, TransportError::DegenerateDomain(_)));

        let mut fields = TransportFields::zeros([1, 1, 1]);
        fields.temperature[[0, 0, 0]] = 7.0;
        let report = compute_fv_tortuosity(&volume, (0, 100), "periodic", None, "cg", "z", &opts(), &mut fields);
        assert!(report.is_sentinel());
        assert_eq!(fields.temperature[[0, 0, 0]], 7.0);
    }

    #[test]
    fn test_reversed_cutoff_rejected() {
        let volume = VoxelVolume::from_elem((5, 5, 5), 0, 1.0);
        let err = try_compute_fv_tortuosity(&volume, (10, 2), "periodic", None, "cg", "z", &opts())
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidMaterialTable(_)));
    }
}
