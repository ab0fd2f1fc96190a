//! Several wells assembled against one reservoir.

use rayon::prelude::*;
use tracing::debug;

use crate::convergence::ConvergenceReport;
use crate::error::{WellError, WellResult};
use crate::newton::InnerIterationOutcome;
use crate::state::WellState;
use crate::system::{ReservoirContext, ReservoirSystem};
use crate::well::MultisegmentWell;

/// The wells of a model, assembled in parallel.
///
/// Each well writes into its own local system and cell-contribution buffer;
/// the buffers are merged into the reservoir system afterwards, one well at a
/// time, so wells may share cells.
#[derive(Debug, Default)]
pub struct WellCollection {
    wells: Vec<MultisegmentWell>,
}

impl WellCollection {
    pub fn new(wells: Vec<MultisegmentWell>) -> WellResult<Self> {
        for (i, well) in wells.iter().enumerate() {
            if wells[..i].iter().any(|w| w.name() == well.name()) {
                return Err(WellError::InvalidState {
                    what: format!("duplicate well name {}", well.name()),
                });
            }
        }
        Ok(Self { wells })
    }

    pub fn len(&self) -> usize {
        self.wells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wells.is_empty()
    }

    pub fn wells(&self) -> &[MultisegmentWell] {
        &self.wells
    }

    pub fn well(&self, name: &str) -> Option<&MultisegmentWell> {
        self.wells.iter().find(|w| w.name() == name)
    }

    pub fn well_mut(&mut self, name: &str) -> Option<&mut MultisegmentWell> {
        self.wells.iter_mut().find(|w| w.name() == name)
    }

    fn check_states(&self, states: &[WellState]) -> WellResult<()> {
        if states.len() != self.wells.len() {
            return Err(WellError::InvalidState {
                what: format!("{} well states for {} wells", states.len(), self.wells.len()),
            });
        }
        Ok(())
    }

    pub fn init(&mut self, num_cells: usize) -> WellResult<()> {
        self.wells.iter_mut().try_for_each(|w| w.init(num_cells))
    }

    pub fn calculate_explicit_quantities(&mut self, ctx: &ReservoirContext<'_>) -> WellResult<()> {
        self.wells
            .par_iter_mut()
            .try_for_each(|w| w.calculate_explicit_quantities(ctx))
    }

    /// Assemble every well and add the perforation terms to `system`.
    /// `states` is indexed like the wells.
    pub fn assemble(
        &mut self,
        ctx: &ReservoirContext<'_>,
        dt: f64,
        states: &mut [WellState],
        system: &mut dyn ReservoirSystem,
    ) -> WellResult<Vec<Option<InnerIterationOutcome>>> {
        self.check_states(states)?;
        let outcomes = self
            .wells
            .par_iter_mut()
            .zip(states.par_iter_mut())
            .map(|(well, state)| well.assemble_well_eq(ctx, dt, state, false))
            .collect::<WellResult<Vec<_>>>()?;

        for well in &self.wells {
            well.add_cell_contributions(system)?;
        }
        debug!(wells = self.wells.len(), "assembled wells");
        Ok(outcomes)
    }

    /// Merged convergence report of all wells.
    pub fn convergence(&self, b_avg: &[f64]) -> WellResult<ConvergenceReport> {
        let mut report = ConvergenceReport::default();
        for well in &self.wells {
            report.merge(well.well_convergence(b_avg)?);
        }
        Ok(report)
    }

    /// `ax -= Σ C^T D^-1 B x` over all wells.
    pub fn apply(&self, x: &[f64], ax: &mut [f64]) -> WellResult<()> {
        self.wells.iter().try_for_each(|w| w.apply(x, ax))
    }

    pub fn apply_residual(&self, r: &mut [f64]) -> WellResult<()> {
        self.wells.iter().try_for_each(|w| w.apply_residual(r))
    }

    pub fn recover_well_solution_and_update_well_state(
        &mut self,
        x: &[f64],
        states: &mut [WellState],
    ) -> WellResult<()> {
        self.check_states(states)?;
        self.wells
            .par_iter_mut()
            .zip(states.par_iter_mut())
            .try_for_each(|(well, state)| well.recover_well_solution_and_update_well_state(x, state))
    }

    /// Newton step on every well's local system, reservoir frozen.
    pub fn solve_eq_and_update_well_state(&mut self, states: &mut [WellState]) -> WellResult<()> {
        self.check_states(states)?;
        self.wells
            .par_iter_mut()
            .zip(states.par_iter_mut())
            .try_for_each(|(well, state)| well.solve_eq_and_update_well_state(state))
    }
}
