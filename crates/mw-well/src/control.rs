//! Well type and the active well control.
//!
//! Rates are surface volumetric rates, positive into the reservoir
//! (injection) and negative for production.

use mw_core::ensure_finite;
use mw_core::units::Pressure;
use mw_fluids::{MAX_PHASES, Phase, PhaseUsage};
use serde::{Deserialize, Serialize};

use crate::error::{WellError, WellResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellType {
    Producer,
    Injector,
}

/// The operating constraint currently enforced at the top segment.
///
/// `distr` holds one weight per active phase in compact order. Rate controls
/// act on the phases with a positive weight. For reservoir-rate control the
/// weights are the surface-to-reservoir conversion coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WellControl {
    Bhp { target: f64 },
    Thp { target: f64 },
    SurfaceRate { target: f64, distr: Vec<f64> },
    ReservoirRate { target: f64, distr: Vec<f64> },
}

/// Default rate scaling per phase: gas rates are two orders of magnitude
/// larger than liquid rates at surface conditions.
pub(crate) fn default_phase_scale(phase: Phase) -> f64 {
    match phase {
        Phase::Water | Phase::Oil => 1.0,
        Phase::Gas => 0.01,
    }
}

impl WellControl {
    pub fn bhp(target: Pressure) -> Self {
        WellControl::Bhp {
            target: target.value,
        }
    }

    pub fn thp(target: Pressure) -> Self {
        WellControl::Thp {
            target: target.value,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WellControl::Bhp { .. } => "BHP",
            WellControl::Thp { .. } => "THP",
            WellControl::SurfaceRate { .. } => "SURFACE_RATE",
            WellControl::ReservoirRate { .. } => "RESERVOIR_RATE",
        }
    }

    pub fn target(&self) -> f64 {
        match self {
            WellControl::Bhp { target }
            | WellControl::Thp { target }
            | WellControl::SurfaceRate { target, .. }
            | WellControl::ReservoirRate { target, .. } => *target,
        }
    }

    pub fn distr(&self) -> Option<&[f64]> {
        match self {
            WellControl::SurfaceRate { distr, .. } | WellControl::ReservoirRate { distr, .. } => {
                Some(distr)
            }
            _ => None,
        }
    }

    /// Number of phases with a positive distribution weight.
    pub fn phases_under_control(&self) -> usize {
        self.distr()
            .map_or(0, |d| d.iter().filter(|&&w| w > 0.0).count())
    }

    pub fn validate(&self, usage: &PhaseUsage) -> WellResult<()> {
        ensure_finite(self.target(), "well control target")?;
        if let Some(distr) = self.distr() {
            for &w in distr {
                ensure_finite(w, "control distribution weight")?;
            }
            if distr.len() != usage.num_phases() {
                return Err(WellError::InvalidState {
                    what: format!(
                        "{} distribution has {} entries for {} phases",
                        self.name(),
                        distr.len(),
                        usage.num_phases()
                    ),
                });
            }
            if self.phases_under_control() == 0 {
                return Err(WellError::InvalidState {
                    what: format!("{} control has no phase under control", self.name()),
                });
            }
        }
        Ok(())
    }

    /// Per-component factors converting phase rates into the well's total
    /// rate variable.
    pub fn scaling(&self, usage: &PhaseUsage) -> ComponentScaling {
        let mut factors = [0.0; MAX_PHASES];
        match self {
            WellControl::ReservoirRate { distr, .. } => {
                for (f, w) in factors.iter_mut().zip(distr) {
                    *f = *w;
                }
            }
            _ => {
                for (pos, phase) in usage.active_phases().enumerate() {
                    factors[pos] = default_phase_scale(phase);
                }
            }
        }
        ComponentScaling {
            factors,
            usage: *usage,
        }
    }
}

/// Scaling factor per component, indexed by compact phase position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentScaling {
    factors: [f64; MAX_PHASES],
    usage: PhaseUsage,
}

impl ComponentScaling {
    pub fn factor(&self, comp: usize) -> f64 {
        self.factors[comp]
    }

    pub fn usage(&self) -> &PhaseUsage {
        &self.usage
    }

    pub fn num_components(&self) -> usize {
        self.usage.num_phases()
    }
}
