//! Reduction of a solved potential field to an effective conductivity row
//! and the cell-centred flux field.

use ndarray::{Array3, Array4};
use rayon::prelude::*;

use puma_types::constants::REFERENCE_POTENTIAL_DROP;

use crate::boundary::EndCaps;
use crate::stencil::{FluxStencil, GridTopology};

/// Potential on the whole grid: solved values inside, Dirichlet values on
/// the end caps.
pub fn potential_field(topo: &GridTopology, caps: &EndCaps<'_>, x: &[f64]) -> Array3<f64> {
    let [nx, ny, nz] = topo.shape();
    Array3::from_shape_fn((nx, ny, nz), |(i, j, k)| {
        let p = [i, j, k];
        match topo.unknown_index(p) {
            Some(u) => x[u],
            None => caps.value(p),
        }
    })
}

/// Effective conductivity row for the solve axis `d`.
///
/// Component `d` averages the total flux through each of the `N-1` planes
/// between consecutive slices; each side component averages the flux
/// through all faces normal to that axis over the interior slices. Both
/// are scaled by `(N-1) / ΔT_ref`, the imposed mean gradient per voxel.
pub fn effective_conductivity(stencil: &FluxStencil<'_>, t: &Array3<f64>) -> [f64; 3] {
    let topo = stencil.topology();
    let d = topo.axis();
    let n = topo.slices();
    let area = topo.cross_section() as f64;
    let scale = (n - 1) as f64 / REFERENCE_POTENTIAL_DROP;
    let [nx, ny, nz] = topo.shape();

    // Cells of slice `s` along the solve axis, in C order.
    let slice_cells = move |s: usize| {
        let (ex, ey, ez) = match d {
            0 => (s..s + 1, 0..ny, 0..nz),
            1 => (0..nx, s..s + 1, 0..nz),
            _ => (0..nx, 0..ny, s..s + 1),
        };
        ex.flat_map(move |x| {
            let ez = ez.clone();
            ey.clone().flat_map(move |y| ez.clone().map(move |z| [x, y, z]))
        })
    };

    let mut row = [0.0; 3];

    let plane_flux: Vec<f64> = (0..n - 1)
        .into_par_iter()
        .map(|s| {
            slice_cells(s)
                .map(|lo| stencil.face_flux(t, lo, topo.shift(lo, d, true), d))
                .sum::<f64>()
        })
        .collect();
    let mean_normal = plane_flux.iter().sum::<f64>() / (area * (n - 1) as f64);
    row[d] = -mean_normal * scale;

    for a in topo.direction().transverse() {
        let slice_flux: Vec<f64> = (1..n - 1)
            .into_par_iter()
            .map(|s| {
                slice_cells(s)
                    .map(|lo| stencil.face_flux(t, lo, topo.shift(lo, a, true), a))
                    .sum::<f64>()
            })
            .collect();
        let mean_side = slice_flux.iter().sum::<f64>() / (area * (n - 2) as f64);
        row[a] = -mean_side * scale;
    }

    row
}

/// Cell-centred flux `q = -K ∇T / voxel_length`, shape `[X, Y, Z, 3]`.
///
/// Gradients are central differences, one-sided on the end caps; side
/// neighbours follow the mirror or wrap rule of the grid.
pub fn flux_field(stencil: &FluxStencil<'_>, t: &Array3<f64>, voxel_length: f64) -> Array4<f64> {
    let topo = stencil.topology();
    let d = topo.axis();
    let last = topo.slices() - 1;

    let q: Vec<[f64; 3]> = (0..topo.voxel_count())
        .into_par_iter()
        .map(|i| {
            let p = topo.position(i);
            let mut grad = [0.0; 3];
            for (a, g) in grad.iter_mut().enumerate() {
                *g = if a == d && p[a] == 0 {
                    t[topo.shift(p, a, true)] - t[p]
                } else if a == d && p[a] == last {
                    t[p] - t[topo.shift(p, a, false)]
                } else {
                    0.5 * (t[topo.shift(p, a, true)] - t[topo.shift(p, a, false)])
                };
            }
            let k = stencil.tensor(p);
            let mut out = [0.0; 3];
            for (r, o) in out.iter_mut().enumerate() {
                *o = -(0..3).map(|c| k.get(r, c) * grad[c]).sum::<f64>() / voxel_length;
            }
            out
        })
        .collect();

    let [nx, ny, nz] = topo.shape();
    Array4::from_shape_fn((nx, ny, nz, 3), |(x, y, z, c)| {
        q[topo.linear_index([x, y, z])][c]
    })
}
