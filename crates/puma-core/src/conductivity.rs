// ─────────────────────────────────────────────────────────────────────
// PuMA-RS — Conductivity Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Effective conductivity of a voxel volume along one axis.
//!
//! [`solve_conductivity`] is the typed entry point. The `compute_fv_*`
//! functions take string tags and raw material maps, validate them in a
//! fixed order and return the sentinel row `[-1, -1, -1]` on any input
//! error, leaving the caller's [`TransportFields`] untouched.
//!
//! Iterative non-convergence is not an error: the best iterate is reduced
//! and the shortfall is logged with `log::warn!`.

use std::collections::BTreeMap;

use ndarray::Array3;

use puma_math::iterative::{IterativeConfig, IterativeMethod};
use puma_math::sparse::CsrMatrix;
use puma_types::config::{RunConfig, SolveOptions};
use puma_types::constants::SENTINEL;
use puma_types::error::{TransportError, TransportResult};
use puma_types::state::{Direction, OrientationField, TransportFields, VoxelVolume};

use crate::boundary::{BoundarySpec, SideBoundary};
use crate::flux::{effective_conductivity, flux_field, potential_field};
use crate::materials::MaterialTable;
use crate::orientation::{validate_orientation, voxel_tensors};
use crate::stencil::{assemble, FluxStencil, GridTopology, Scheme};

/// Relative tolerance for treating an assembled matrix as symmetric.
const SYMMETRY_TOLERANCE: f64 = 1e-12;

// ───────────────────────────── problem ───────────────────────────────

/// Fully typed conductivity problem.
#[derive(Debug, Clone)]
pub struct TransportProblem<'a> {
    pub volume: &'a VoxelVolume,
    pub materials: &'a MaterialTable,
    pub orientation: Option<&'a OrientationField>,
    pub boundary: BoundarySpec,
    pub scheme: Scheme,
    pub solver: IterativeMethod,
    pub direction: Direction,
    pub options: SolveOptions,
}

impl<'a> TransportProblem<'a> {
    /// Symmetric sides, `mpfa`, BiCGSTAB, default options.
    pub fn new(volume: &'a VoxelVolume, materials: &'a MaterialTable, direction: Direction) -> Self {
        TransportProblem {
            volume,
            materials,
            orientation: None,
            boundary: BoundarySpec::new(SideBoundary::Symmetric),
            scheme: Scheme::Mpfa,
            solver: IterativeMethod::BiCgStab,
            direction,
            options: SolveOptions::default(),
        }
    }

    pub fn with_orientation(mut self, field: &'a OrientationField) -> Self {
        self.orientation = Some(field);
        self
    }

    pub fn with_boundary(mut self, boundary: BoundarySpec) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_solver(mut self, solver: IterativeMethod) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Volume, material coverage, orientation and boundary matrix checks.
    pub fn validate(&self) -> TransportResult<()> {
        self.volume.validate(Some(self.direction))?;
        self.materials.check_coverage(self.volume)?;
        if let Some(field) = self.orientation {
            validate_orientation(field, self.volume, self.materials)?;
        }
        self.boundary.validate(self.volume.shape(), self.direction)
    }
}

/// Iteration statistics of one solve.
#[derive(Debug, Clone)]
pub struct SolverStats {
    /// Method actually run (CG may fall back to BiCGSTAB).
    pub method: IterativeMethod,
    pub iterations: usize,
    /// Final relative residual `‖b - Ax‖ / ‖b‖`.
    pub residual: f64,
    pub converged: bool,
    pub unknowns: usize,
    pub nonzeros: usize,
    pub isolated: usize,
}

#[derive(Debug, Clone)]
pub struct ConductivitySolution {
    /// Effective conductivity row for the solve direction.
    pub conductivity: [f64; 3],
    pub fields: TransportFields,
    pub stats: SolverStats,
}

// ───────────────────────────── solve ─────────────────────────────────

/// Validate and solve.
pub fn solve_conductivity(problem: &TransportProblem<'_>) -> TransportResult<ConductivitySolution> {
    problem.validate()?;
    solve_validated(problem)
}

/// Solve on a dedicated pool of `options.thread_count()` workers.
pub(crate) fn solve_validated(problem: &TransportProblem<'_>) -> TransportResult<ConductivitySolution> {
    problem.options.validate()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(problem.options.thread_count())
        .build()
        .map_err(|e| TransportError::ThreadPool(e.to_string()))?;
    pool.install(|| run(problem, rayon::current_num_threads()))
}

/// CG needs a symmetric matrix; anything else is handed to BiCGSTAB.
fn effective_method(requested: IterativeMethod, matrix: &CsrMatrix) -> IterativeMethod {
    if requested == IterativeMethod::Cg && !matrix.is_symmetric(SYMMETRY_TOLERANCE) {
        log::warn!("assembled matrix is not symmetric; using bicgstab instead of cg");
        return IterativeMethod::BiCgStab;
    }
    requested
}

fn run(problem: &TransportProblem<'_>, threads: usize) -> TransportResult<ConductivitySolution> {
    let volume = problem.volume;
    let shape = volume.shape();
    let direction = problem.direction;
    let verbose = problem.options.verbose;

    if verbose {
        log::info!(
            "conductivity solve: shape {shape:?}, direction {direction}, {} / {} / {}, {threads} thread(s)",
            problem.scheme,
            problem.boundary.side,
            problem.solver
        );
    }

    let topo = GridTopology::new(shape, direction, problem.boundary.side)?;
    let tensors = voxel_tensors(volume, problem.materials, problem.orientation)?;
    let stencil = FluxStencil::new(topo, &tensors);
    let caps = problem.boundary.end_caps(shape, direction);

    let system = assemble(&stencil, &caps, problem.scheme)?;
    let method = effective_method(problem.solver, &system.matrix);
    let config = IterativeConfig {
        max_iter: problem.options.max_iterations,
        tol: problem.options.tolerance,
    };
    let result = method.solve(&system.matrix, &system.rhs, &config);
    if !result.converged {
        log::warn!(
            "{method} did not converge: residual {:.3e} after {} iterations (tol {:.1e})",
            result.residual,
            result.iterations,
            config.tol
        );
    }

    let temperature = potential_field(&topo, &caps, &result.x);
    let conductivity = effective_conductivity(&stencil, &temperature);
    let flux = flux_field(&stencil, &temperature, volume.voxel_length());

    if verbose {
        log::info!(
            "{method}: {} iterations, residual {:.3e}; k_eff row {conductivity:?}",
            result.iterations,
            result.residual
        );
    }

    Ok(ConductivitySolution {
        conductivity,
        fields: TransportFields { temperature, flux },
        stats: SolverStats {
            method,
            iterations: result.iterations,
            residual: result.residual,
            converged: result.converged,
            unknowns: system.rhs.len(),
            nonzeros: system.matrix.nnz(),
            isolated: system.isolated,
        },
    })
}

// ───────────────────────────── facades ───────────────────────────────

/// Whether a facade result is the input-error sentinel.
pub fn is_sentinel(row: &[f64; 3]) -> bool {
    *row == SENTINEL
}

fn into_row(
    what: &str,
    fields: &mut TransportFields,
    result: TransportResult<ConductivitySolution>,
) -> [f64; 3] {
    match result {
        Ok(solution) => {
            *fields = solution.fields;
            solution.conductivity
        }
        Err(e) => {
            log::error!("{what}: {e}; returning sentinel");
            SENTINEL
        }
    }
}

/// Anisotropic solve from string tags. Checks run in order: volume,
/// materials, orientation, boundary tag and matrix, method, solver,
/// direction; the first failure is returned.
///
/// `"cg"` needs a symmetric system. When the assembled matrix is not
/// symmetric (always the case for `"mpfa"` with `"symmetric"` sides and
/// off-diagonal conductivities) BiCGSTAB runs instead; the substitution is
/// logged and reported in [`SolverStats::method`].
#[allow(clippy::too_many_arguments)]
pub fn try_compute_fv_anisotropic_conductivity(
    volume: &VoxelVolume,
    materials: &BTreeMap<u16, Vec<f64>>,
    orientation: Option<&OrientationField>,
    method: &str,
    boundary_kind: &str,
    boundary_matrix: Option<&Array3<f64>>,
    solver: &str,
    direction: &str,
    options: &SolveOptions,
) -> TransportResult<ConductivitySolution> {
    // Thickness and matrix shape need the axis; a bad tag is reported last.
    let axis = direction.parse::<Direction>().ok();
    volume.validate(axis)?;

    let table = MaterialTable::from_raw(materials)?;
    table.check_coverage(volume)?;

    if let Some(field) = orientation {
        validate_orientation(field, volume, &table)?;
    }

    let boundary = BoundarySpec::from_tags(boundary_kind, boundary_matrix)?;
    if let Some(d) = axis {
        boundary.validate(volume.shape(), d)?;
    }

    let scheme: Scheme = method.parse()?;
    let solver: IterativeMethod = solver.parse()?;
    let direction: Direction = direction.parse()?;

    let problem = TransportProblem {
        volume,
        materials: &table,
        orientation,
        boundary,
        scheme,
        solver,
        direction,
        options: *options,
    };
    solve_validated(&problem)
}

/// Sentinel-returning wrapper of [`try_compute_fv_anisotropic_conductivity`].
#[allow(clippy::too_many_arguments)]
pub fn compute_fv_anisotropic_conductivity(
    volume: &VoxelVolume,
    materials: &BTreeMap<u16, Vec<f64>>,
    orientation: Option<&OrientationField>,
    method: &str,
    boundary_kind: &str,
    boundary_matrix: Option<&Array3<f64>>,
    solver: &str,
    direction: &str,
    options: &SolveOptions,
    fields: &mut TransportFields,
) -> [f64; 3] {
    let result = try_compute_fv_anisotropic_conductivity(
        volume,
        materials,
        orientation,
        method,
        boundary_kind,
        boundary_matrix,
        solver,
        direction,
        options,
    );
    into_row("anisotropic conductivity", fields, result)
}

/// Scalar-conductivity solve: tensor entries are rejected, no orientation,
/// two-point stencil.
pub fn try_compute_fv_thermal_conductivity(
    volume: &VoxelVolume,
    materials: &BTreeMap<u16, Vec<f64>>,
    boundary_kind: &str,
    boundary_matrix: Option<&Array3<f64>>,
    solver: &str,
    direction: &str,
    options: &SolveOptions,
) -> TransportResult<ConductivitySolution> {
    let axis = direction.parse::<Direction>().ok();
    volume.validate(axis)?;

    let table = MaterialTable::from_raw(materials)?;
    table.require_isotropic()?;
    table.check_coverage(volume)?;

    let boundary = BoundarySpec::from_tags(boundary_kind, boundary_matrix)?;
    if let Some(d) = axis {
        boundary.validate(volume.shape(), d)?;
    }

    let solver: IterativeMethod = solver.parse()?;
    let direction: Direction = direction.parse()?;

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
    solve_validated(&problem)
}

#[allow(clippy::too_many_arguments)]
pub fn compute_fv_thermal_conductivity(
    volume: &VoxelVolume,
    materials: &BTreeMap<u16, Vec<f64>>,
    boundary_kind: &str,
    boundary_matrix: Option<&Array3<f64>>,
    solver: &str,
    direction: &str,
    options: &SolveOptions,
    fields: &mut TransportFields,
) -> [f64; 3] {
    let result = try_compute_fv_thermal_conductivity(
        volume,
        materials,
        boundary_kind,
        boundary_matrix,
        solver,
        direction,
        options,
    );
    into_row("thermal conductivity", fields, result)
}

/// Electrical conductivity; same equations as the thermal solve.
#[allow(clippy::too_many_arguments)]
pub fn compute_fv_electrical_conductivity(
    volume: &VoxelVolume,
    materials: &BTreeMap<u16, Vec<f64>>,
    boundary_kind: &str,
    boundary_matrix: Option<&Array3<f64>>,
    solver: &str,
    direction: &str,
    options: &SolveOptions,
    fields: &mut TransportFields,
) -> [f64; 3] {
    let result = try_compute_fv_thermal_conductivity(
        volume,
        materials,
        boundary_kind,
        boundary_matrix,
        solver,
        direction,
        options,
    );
    into_row("electrical conductivity", fields, result)
}

#[allow(clippy::too_many_arguments)]
pub fn compute_fv_anisotropic_electrical_conductivity(
    volume: &VoxelVolume,
    materials: &BTreeMap<u16, Vec<f64>>,
    orientation: Option<&OrientationField>,
    method: &str,
    boundary_kind: &str,
    boundary_matrix: Option<&Array3<f64>>,
    solver: &str,
    direction: &str,
    options: &SolveOptions,
    fields: &mut TransportFields,
) -> [f64; 3] {
    let result = try_compute_fv_anisotropic_conductivity(
        volume,
        materials,
        orientation,
        method,
        boundary_kind,
        boundary_matrix,
        solver,
        direction,
        options,
    );
    into_row("anisotropic electrical conductivity", fields, result)
}

/// Run a [`RunConfig`] against a label array. Bad material ranges in the
/// config are reported like any other input error.
pub fn compute_from_run_config(
    config: &RunConfig,
    labels: Array3<u16>,
    orientation: Option<&OrientationField>,
    fields: &mut TransportFields,
) -> [f64; 3] {
    let materials = match config.raw_materials() {
        Ok(m) => m,
        Err(e) => {
            log::error!("run '{}': {e}; returning sentinel", config.run_name);
            return SENTINEL;
        }
    };
    let volume = VoxelVolume::new(labels, config.voxel_length);
    if config.options.verbose {
        log::info!("run '{}': {:?} along {}", config.run_name, volume.shape(), config.direction);
    }
    compute_fv_anisotropic_conductivity(
        &volume,
        &materials,
        orientation,
        &config.method,
        &config.boundary,
        None,
        &config.solver,
        &config.direction,
        &config.options,
        fields,
    )
}
