//! Model parameters and per-well settings.

use mw_fluids::MAX_PHASES;
use serde::{Deserialize, Serialize};

use crate::control::{WellControl, WellType};

/// How the PVT region of the wellbore fluid is chosen.
///
/// All segments of a well share one region. Taking it from the first
/// perforated cell is an approximation for wells crossing several regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionPolicy {
    #[default]
    FirstPerforation,
    Fixed(usize),
}

/// Numerical parameters shared by all multi-segment wells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WellModelParameters {
    /// Largest change of a phase fraction per update.
    pub max_well_fraction_change: f64,
    /// Largest change of a segment pressure per update [Pa].
    pub max_pressure_change: f64,
    /// Flux convergence tolerance (after averaging-factor scaling).
    pub tolerance_wells: f64,
    /// Pressure equation convergence tolerance [Pa].
    pub tolerance_pressure: f64,
    /// Scaled flux residuals above this are classified as too large.
    pub max_residual_allowed: f64,
    pub max_inner_iterations: usize,
    pub use_inner_iterations: bool,
    /// Relaxation applied to updates during inner iterations.
    pub inner_relaxation_factor: f64,
    /// Residual averaging factors used by inner iterations, per phase in
    /// canonical order (water, oil, gas).
    pub inner_iteration_averaging: [f64; MAX_PHASES],
    pub region_policy: RegionPolicy,
}

impl Default for WellModelParameters {
    fn default() -> Self {
        Self {
            max_well_fraction_change: 0.2,
            max_pressure_change: 1.0e6,
            tolerance_wells: 1.0e-4,
            tolerance_pressure: 1000.0,
            max_residual_allowed: 1.0e7,
            max_inner_iterations: 10,
            use_inner_iterations: false,
            inner_relaxation_factor: 0.2,
            inner_iteration_averaging: [0.5, 0.5, 0.005],
            region_policy: RegionPolicy::FirstPerforation,
        }
    }
}

/// Identity and operating policy of one well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellSettings {
    pub name: String,
    pub well_type: WellType,
    #[serde(default = "default_allow_cross_flow")]
    pub allow_cross_flow: bool,
    #[serde(default = "default_efficiency_factor")]
    pub efficiency_factor: f64,
    pub control: WellControl,
}

fn default_allow_cross_flow() -> bool {
    true
}

fn default_efficiency_factor() -> f64 {
    1.0
}

impl WellSettings {
    pub fn new(name: impl Into<String>, well_type: WellType, control: WellControl) -> Self {
        Self {
            name: name.into(),
            well_type,
            allow_cross_flow: default_allow_cross_flow(),
            efficiency_factor: default_efficiency_factor(),
            control,
        }
    }

    pub fn with_cross_flow(mut self, allow: bool) -> Self {
        self.allow_cross_flow = allow;
        self
    }

    pub fn with_efficiency_factor(mut self, factor: f64) -> Self {
        self.efficiency_factor = factor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let params = WellModelParameters::default();
        assert_eq!(params.max_well_fraction_change, 0.2);
        assert_eq!(params.max_inner_iterations, 10);
        assert!(!params.use_inner_iterations);
        assert_eq!(params.region_policy, RegionPolicy::FirstPerforation);
    }

    #[test]
    fn settings_builder() {
        let settings = WellSettings::new("INJ", WellType::Injector, WellControl::Bhp { target: 3.0e7 })
            .with_cross_flow(false)
            .with_efficiency_factor(0.9);
        assert!(!settings.allow_cross_flow);
        assert_eq!(settings.efficiency_factor, 0.9);
    }
}
