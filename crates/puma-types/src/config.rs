// ─────────────────────────────────────────────────────────────────────
// PuMA-RS — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
use crate::error::{TransportError, TransportResult};

/// Per-call solver controls. Passed explicitly so concurrent solves never
/// share thread-count or verbosity state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Relative residual tolerance ‖r‖/‖b‖.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Emit per-solve progress through `log::info!`.
    pub verbose: bool,
    /// Worker threads; 0 or negative means all hardware threads.
    pub num_threads: i32,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            verbose: false,
            num_threads: 0,
        }
    }
}

impl SolveOptions {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_threads(mut self, num_threads: i32) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Worker count for the rayon pool; 0 lets rayon use every hardware
    /// thread.
    pub fn thread_count(&self) -> usize {
        self.num_threads.max(0) as usize
    }

    /// The tolerance must be finite and positive.
    pub fn validate(&self) -> TransportResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(TransportError::Config(format!(
                "solver tolerance must be finite and positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// One row of a material map: an inclusive label range and its
/// conductivity record (1 value = isotropic, 6 values = kxx,kyy,kzz,kxy,kxz,kyz).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialEntry {
    pub low: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<u16>,
    pub conductivity: Vec<f64>,
}

/// Complete description of a conductivity run, loadable from JSON.
///
/// Tags stay as strings here; they are validated by the solver facade so a
/// bad tag in a file follows the same reporting path as a bad tag in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub run_name: String,
    pub voxel_length: f64,
    pub materials: Vec<MaterialEntry>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_boundary")]
    pub boundary: String,
    #[serde(default = "default_solver")]
    pub solver: String,
    pub direction: String,
    #[serde(default)]
    pub options: SolveOptions,
}

fn default_method() -> String {
    "mpfa".to_string()
}

fn default_boundary() -> String {
    "symmetric".to_string()
}

fn default_solver() -> String {
    "bicgstab".to_string()
}

impl RunConfig {
    pub fn from_file(path: &str) -> TransportResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> TransportResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Expand label ranges into the raw `id -> values` map consumed by the
    /// material table builder. Later entries override earlier ones.
    pub fn raw_materials(&self) -> TransportResult<BTreeMap<u16, Vec<f64>>> {
        let mut raw = BTreeMap::new();
        for entry in &self.materials {
            let high = entry.high.unwrap_or(entry.low);
            if high < entry.low {
                return Err(TransportError::Config(format!(
                    "material range {}..={} is reversed",
                    entry.low, high
                )));
            }
            for id in entry.low..=high {
                raw.insert(id, entry.conductivity.clone());
            }
        }
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "run_name": "fiberform-x",
        "voxel_length": 1.3e-6,
        "materials": [
            { "low": 0, "high": 89, "conductivity": [0.0257] },
            { "low": 90, "high": 255, "conductivity": [15.0, 8.0, 8.0, 0.0, 0.0, 0.0] }
        ],
        "direction": "x",
        "options": { "tolerance": 1e-6, "num_threads": 4 }
    }"#;

    #[test]
    fn test_parse_run_config_with_defaults() {
        let cfg = RunConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(cfg.run_name, "fiberform-x");
        assert_eq!(cfg.method, "mpfa");
        assert_eq!(cfg.boundary, "symmetric");
        assert_eq!(cfg.solver, "bicgstab");
        assert_eq!(cfg.direction, "x");
        assert!((cfg.options.tolerance - 1e-6).abs() < 1e-18);
        assert_eq!(cfg.options.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(cfg.options.num_threads, 4);
        assert!(!cfg.options.verbose);
    }

    #[test]
    fn test_raw_materials_expands_ranges() {
        let cfg = RunConfig::from_json_str(SAMPLE).unwrap();
        let raw = cfg.raw_materials().unwrap();
        assert_eq!(raw.len(), 256);
        assert_eq!(raw[&0], vec![0.0257]);
        assert_eq!(raw[&89], vec![0.0257]);
        assert_eq!(raw[&90].len(), 6);
        assert_eq!(raw[&255][0], 15.0);
    }

    #[test]
    fn test_reversed_range_rejected() {
        let mut cfg = RunConfig::from_json_str(SAMPLE).unwrap();
        cfg.materials[0].high = Some(0);
        cfg.materials[0].low = 5;
        assert!(matches!(cfg.raw_materials(), Err(TransportError::Config(_))));
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg = RunConfig::from_json_str(SAMPLE).unwrap();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2 = RunConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg.run_name, cfg2.run_name);
        assert_eq!(cfg.materials, cfg2.materials);
        assert_eq!(cfg.options, cfg2.options);
    }

    #[test]
    fn test_thread_count_defers_to_rayon() {
        assert_eq!(SolveOptions::default().thread_count(), 0);
        assert_eq!(SolveOptions::default().with_threads(-3).thread_count(), 0);
        assert_eq!(SolveOptions::default().with_threads(2).thread_count(), 2);
    }

    #[test]
    fn test_tolerance_must_be_finite_and_positive() {
        assert!(SolveOptions::default().validate().is_ok());
        assert!(SolveOptions::default().with_tolerance(1e-14).validate().is_ok());
        for bad in [f64::NAN, f64::INFINITY, 0.0, -1e-6] {
            let err = SolveOptions::default().with_tolerance(bad).validate().unwrap_err();
            assert!(matches!(err, TransportError::Config(_)), "{bad}");
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = RunConfig::from_file("/nonexistent/puma/run.json");
        assert!(matches!(result, Err(TransportError::Io(_))));
    }
}
