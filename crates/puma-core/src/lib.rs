//! Finite-volume transport solvers on voxel volumes.
//!
//! Materials and orientation feed per-voxel tensors, the stencil assembles
//! one conservation row per interior voxel, and the flux reducer turns the
//! solved potential into an effective conductivity row.

pub mod boundary;
pub mod conductivity;
pub mod flux;
pub mod materials;
pub mod orientation;
pub mod stencil;
pub mod tortuosity;
