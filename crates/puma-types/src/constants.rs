// ─────────────────────────────────────────────────────────────────────
// PuMA-RS — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Row returned by the string-tag facades when input validation fails.
pub const SENTINEL: [f64; 3] = [-1.0, -1.0, -1.0];

/// Potential difference the effective coefficient is normalised by.
/// Prescribed end caps with a different drop scale the result accordingly.
pub const REFERENCE_POTENTIAL_DROP: f64 = 1.0;

/// Potential imposed on the low end cap when no boundary matrix is given.
pub const LOW_END_POTENTIAL: f64 = 0.0;

/// Potential imposed on the high end cap when no boundary matrix is given.
pub const HIGH_END_POTENTIAL: f64 = 1.0;

/// Minimum number of slices along the solve axis (two end caps + one unknown).
pub const MIN_SOLVE_SLICES: usize = 3;

/// Default relative residual tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// Default Krylov iteration cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;
