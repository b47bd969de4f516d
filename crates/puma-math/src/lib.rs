//! Numerical primitives for PuMA-RS.

pub mod bicgstab;
pub mod cg;
pub mod iterative;
pub mod sparse;
pub mod tensor;
pub mod vecops;
