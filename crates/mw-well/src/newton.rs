//! Bounded Newton update of the well primary variables.

use mw_core::limit_magnitude;

use crate::config::WellModelParameters;
use crate::error::{WellError, WellResult};
use crate::primary::{PrimaryVariables, WellLayout};

/// Step scaling: reduced inside well-local inner iterations, full otherwise.
pub fn relaxation_factor(params: &WellModelParameters, inner_iteration: bool) -> f64 {
    if params.use_inner_iterations && inner_iteration {
        params.inner_relaxation_factor
    } else {
        1.0
    }
}

/// Subtract the Newton increment `dx` (laid out `segment * num_well_eq + pv`)
/// from the primary variables.
///
/// Fraction and pressure steps are clamped in magnitude, fractions are
/// projected back onto the simplex, and the total rate takes the relaxed
/// step unclamped.
pub fn apply_newton_update(
    primary: &mut PrimaryVariables,
    dx: &[f64],
    params: &WellModelParameters,
    inner_iteration: bool,
) -> WellResult<()> {
    let layout: WellLayout = *primary.layout();
    let neq = layout.num_well_eq();
    if dx.len() != primary.len() * neq {
        return Err(WellError::InvalidState {
            what: format!(
                "well update has length {}, expected {}",
                dx.len(),
                primary.len() * neq
            ),
        });
    }
    let relax = relaxation_factor(params, inner_iteration);
    let fraction_limit = relax * params.max_well_fraction_change;
    let pressure_limit = relax * params.max_pressure_change;

    for seg in 0..primary.len() {
        let step = &dx[seg * neq..(seg + 1) * neq];
        let vars = primary.segment_mut(seg);
        if let Some(pv) = layout.wfrac() {
            vars.wfrac -= limit_magnitude(step[pv], fraction_limit);
        }
        if let Some(pv) = layout.gfrac() {
            vars.gfrac -= limit_magnitude(step[pv], fraction_limit);
        }
        primary.process_fractions(seg);

        let vars = primary.segment_mut(seg);
        vars.pressure -= limit_magnitude(step[layout.spres()], pressure_limit);
        vars.g_total -= relax * step[WellLayout::G_TOTAL];
    }
    Ok(())
}

/// How a well-local inner iteration loop ended. Neither outcome stops the
/// global Newton iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerIterationOutcome {
    Converged { iterations: usize },
    Exhausted { iterations: usize },
}

impl InnerIterationOutcome {
    pub fn converged(&self) -> bool {
        matches!(self, InnerIterationOutcome::Converged { .. })
    }

    pub fn iterations(&self) -> usize {
        match *self {
            InnerIterationOutcome::Converged { iterations }
            | InnerIterationOutcome::Exhausted { iterations } => iterations,
        }
    }
}
