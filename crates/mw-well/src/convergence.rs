//! Convergence classification of the well residual.

use mw_fluids::PhaseUsage;
use serde::Serialize;
use tracing::debug;

use crate::assembler::WellEquations;
use crate::config::WellModelParameters;
use crate::primary::WellLayout;

/// An abnormal residual: which well and which equation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemWell {
    pub well: String,
    /// Phase name for mass balances, `"Pressure"` for the pressure equation.
    pub equation: String,
}

/// Outcome of a convergence check. Abnormal residuals are reported, not
/// raised; the caller decides whether to cut the timestep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceReport {
    pub converged: bool,
    pub nan_residual_found: bool,
    pub too_large_residual_found: bool,
    pub problem_wells: Vec<ProblemWell>,
    /// Largest normal residual per well equation (scaled for mass balances).
    pub maximum_residuals: Vec<f64>,
}

impl Default for ConvergenceReport {
    fn default() -> Self {
        Self {
            converged: true,
            nan_residual_found: false,
            too_large_residual_found: false,
            problem_wells: Vec::new(),
            maximum_residuals: Vec::new(),
        }
    }
}

impl ConvergenceReport {
    /// Combine the reports of several wells.
    pub fn merge(&mut self, other: ConvergenceReport) {
        self.converged &= other.converged;
        self.nan_residual_found |= other.nan_residual_found;
        self.too_large_residual_found |= other.too_large_residual_found;
        self.problem_wells.extend(other.problem_wells);
        if self.maximum_residuals.len() < other.maximum_residuals.len() {
            self.maximum_residuals.resize(other.maximum_residuals.len(), 0.0);
        }
        for (mine, theirs) in self.maximum_residuals.iter_mut().zip(&other.maximum_residuals) {
            *mine = mine.max(*theirs);
        }
    }

    pub fn abnormal(&self) -> bool {
        self.nan_residual_found || self.too_large_residual_found
    }
}

/// Classify the residual of one well.
///
/// `b_avg` holds one averaging factor per component in compact order.
pub fn well_convergence(
    well: &str,
    eqs: &WellEquations,
    b_avg: &[f64],
    params: &WellModelParameters,
) -> ConvergenceReport {
    let layout: &WellLayout = eqs.layout();
    let usage: &PhaseUsage = layout.usage();
    let nc = layout.num_components();
    let neq = layout.num_well_eq();

    let mut report = ConvergenceReport {
        maximum_residuals: vec![0.0; neq],
        ..Default::default()
    };
    let problem = |report: &mut ConvergenceReport, equation: &str| {
        report.problem_wells.push(ProblemWell {
            well: well.to_string(),
            equation: equation.to_string(),
        });
    };

    for seg in 0..eqs.num_segments() {
        for eq in 0..neq {
            let residual = eqs.residual_at(seg, eq).abs();
            if eq < nc {
                let flux = b_avg.get(eq).copied().unwrap_or(1.0) * residual;
                let name = usage.phase_at(eq).name();
                if flux.is_nan() {
                    report.nan_residual_found = true;
                    problem(&mut report, name);
                } else if flux > params.max_residual_allowed {
                    report.too_large_residual_found = true;
                    problem(&mut report, name);
                } else if flux > report.maximum_residuals[eq] {
                    report.maximum_residuals[eq] = flux;
                }
            } else if residual.is_nan() {
                report.nan_residual_found = true;
                problem(&mut report, "Pressure");
            } else if residual.is_infinite() {
                report.too_large_residual_found = true;
                problem(&mut report, "Pressure");
            } else if residual > report.maximum_residuals[eq] {
                report.maximum_residuals[eq] = residual;
            }
        }
    }

    report.converged = !report.abnormal()
        && report.maximum_residuals[..nc]
            .iter()
            .all(|&r| r < params.tolerance_wells)
        && report.maximum_residuals[layout.spres()] < params.tolerance_pressure;

    debug!(
        well,
        converged = report.converged,
        maximum_residuals = ?report.maximum_residuals,
        "well convergence"
    );
    report
}
