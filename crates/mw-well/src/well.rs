//! A multi-segment well coupled to the reservoir.

use mw_core::ensure_finite;
use mw_fluids::{MAX_PHASES, PhaseUsage};
use mw_topology::SegmentTopology;
use tracing::{debug, warn};

use crate::assembler::{WellEquationAssembler, WellEquations};
use crate::config::{RegionPolicy, WellModelParameters, WellSettings};
use crate::control::{ComponentScaling, WellControl, WellType};
use crate::convergence::{ConvergenceReport, well_convergence};
use crate::error::{WellError, WellResult};
use crate::fluid_state::{SegmentFluidState, WellboreFluid};
use crate::newton::{InnerIterationOutcome, apply_newton_update};
use crate::perforation::cell_perforation_pressure_diff;
use crate::primary::{PrimaryVariables, SegmentEval, SegmentVariables, WellLayout};
use crate::schur::SchurEliminator;
use crate::state::WellState;
use crate::system::{CellContributions, ReservoirContext, ReservoirSystem};

/// One multi-segment well: topology, primary variables and the most
/// recently assembled local system.
///
/// A typical nonlinear iteration is
/// 1. [`assemble_well_eq`](Self::assemble_well_eq) and
///    [`add_cell_contributions`](Self::add_cell_contributions),
/// 2. [`apply_residual`](Self::apply_residual) / [`apply`](Self::apply) inside
///    the reservoir solve,
/// 3. [`recover_well_solution_and_update_well_state`](Self::recover_well_solution_and_update_well_state).
#[derive(Debug)]
pub struct MultisegmentWell {
    settings: WellSettings,
    params: WellModelParameters,
    topology: SegmentTopology,
    layout: WellLayout,
    scaling: ComponentScaling,
    primary: PrimaryVariables,
    evaluation: Vec<SegmentEval>,
    fluid: Option<SegmentFluidState>,
    initial_composition: Vec<[f64; MAX_PHASES]>,
    cell_perf_pressure_diffs: Vec<f64>,
    equations: Option<WellEquations>,
    eliminator: Option<SchurEliminator>,
    contributions: CellContributions,
}

impl MultisegmentWell {
    pub fn new(
        settings: WellSettings,
        topology: SegmentTopology,
        usage: PhaseUsage,
        params: WellModelParameters,
    ) -> WellResult<Self> {
        settings.control.validate(&usage)?;
        if topology.number_of_perforations() == 0 {
            return Err(WellError::Topology(mw_topology::TopologyError::NoPerforations));
        }
        if !(settings.efficiency_factor.is_finite() && settings.efficiency_factor >= 0.0) {
            return Err(WellError::InvalidState {
                what: format!(
                    "efficiency factor of well {} must be finite and non-negative",
                    settings.name
                ),
            });
        }
        let layout = WellLayout::new(usage);
        let nseg = topology.number_of_segments();
        let nperf = topology.number_of_perforations();
        let scaling = settings.control.scaling(&usage);
        let primary = PrimaryVariables::new(layout, nseg);
        let evaluation = primary.evaluate();
        Ok(Self {
            settings,
            params,
            topology,
            layout,
            scaling,
            primary,
            evaluation,
            fluid: None,
            initial_composition: vec![[0.0; MAX_PHASES]; nseg],
            cell_perf_pressure_diffs: vec![0.0; nperf],
            equations: None,
            eliminator: None,
            contributions: CellContributions::default(),
        })
    }

    /// Allocate the local system for a reservoir of `num_cells` cells.
    pub fn init(&mut self, num_cells: usize) -> WellResult<()> {
        if let Some(perf) = self
            .topology
            .perforations()
            .iter()
            .find(|p| p.cell >= num_cells)
        {
            return Err(WellError::InvalidState {
                what: format!(
                    "well {} perforates cell {} of a {num_cells}-cell reservoir",
                    self.settings.name, perf.cell
                ),
            });
        }
        self.equations = Some(WellEquations::new(&self.topology, self.layout, num_cells)?);
        self.eliminator = None;
        debug!(
            well = %self.settings.name,
            segments = self.topology.number_of_segments(),
            perforations = self.topology.number_of_perforations(),
            num_cells,
            "initialised well"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &WellSettings {
        &self.settings
    }

    pub fn params(&self) -> &WellModelParameters {
        &self.params
    }

    pub fn topology(&self) -> &SegmentTopology {
        &self.topology
    }

    pub fn layout(&self) -> &WellLayout {
        &self.layout
    }

    pub fn scaling(&self) -> &ComponentScaling {
        &self.scaling
    }

    pub fn primary_variables(&self) -> &PrimaryVariables {
        &self.primary
    }

    pub fn fluid_state(&self) -> Option<&SegmentFluidState> {
        self.fluid.as_ref()
    }

    pub fn initial_composition(&self) -> &[[f64; MAX_PHASES]] {
        &self.initial_composition
    }

    pub fn cell_perf_pressure_diffs(&self) -> &[f64] {
        &self.cell_perf_pressure_diffs
    }

    pub fn equations(&self) -> Option<&WellEquations> {
        self.equations.as_ref()
    }

    pub fn cell_contributions(&self) -> &CellContributions {
        &self.contributions
    }

    /// Switch the active control; the rate scaling follows the control.
    pub fn set_control(&mut self, control: WellControl) -> WellResult<()> {
        control.validate(self.layout.usage())?;
        self.scaling = control.scaling(self.layout.usage());
        self.settings.control = control;
        Ok(())
    }

    fn equations_ref(&self) -> WellResult<&WellEquations> {
        self.equations.as_ref().ok_or_else(|| WellError::InvalidState {
            what: format!("well {} has not been initialised", self.settings.name),
        })
    }

    fn eliminator_ref(&self) -> WellResult<&SchurEliminator> {
        self.eliminator.as_ref().ok_or_else(|| WellError::InvalidState {
            what: format!("well {} has not been assembled", self.settings.name),
        })
    }

    fn check_state(&self, state: &WellState) -> WellResult<()> {
        state.check_dimensions(&self.topology, self.layout.num_components())
    }

    /// Overwrite the primary variables of one segment.
    pub fn set_segment_variables(&mut self, seg: usize, vars: SegmentVariables) -> WellResult<()> {
        if seg >= self.primary.len() {
            return Err(WellError::InvalidState {
                what: format!("segment location {seg} outside well {}", self.settings.name),
            });
        }
        *self.primary.segment_mut(seg) = vars;
        self.init_primary_variables_evaluation();
        Ok(())
    }

    /// Re-seed the differentiable primary variables from their values.
    pub fn init_primary_variables_evaluation(&mut self) {
        self.evaluation = self.primary.evaluate();
    }

    /// Primary variables from segment rates and pressures.
    pub fn update_primary_variables(&mut self, state: &WellState) -> WellResult<()> {
        self.check_state(state)?;
        let usage = *self.layout.usage();
        let np = self.layout.num_components();
        let distr = self.settings.control.distr();
        let injects = |pos: Option<usize>| -> f64 {
            let weight = pos.and_then(|p| distr.and_then(|d| d.get(p)));
            if weight.is_some_and(|&w| w > 0.0) { 1.0 } else { 0.0 }
        };
        let water = usage.position(mw_fluids::Phase::Water);
        let gas = usage.position(mw_fluids::Phase::Gas);

        for seg in 0..self.topology.number_of_segments() {
            let rate = |p: usize| state.segment_rate(seg, p);
            let total: f64 = (0..np).map(|p| self.scaling.factor(p) * rate(p)).sum();
            let vars = self.primary.segment_mut(seg);
            vars.pressure = state.segment_pressures[seg];
            vars.g_total = total;
            if total.abs() > 0.0 {
                if let Some(w) = water {
                    vars.wfrac = self.scaling.factor(w) * rate(w) / total;
                }
                if let Some(g) = gas {
                    vars.gfrac = self.scaling.factor(g) * rate(g) / total;
                }
            } else {
                match self.settings.well_type {
                    WellType::Injector => {
                        vars.wfrac = injects(water);
                        vars.gfrac = injects(gas);
                    }
                    WellType::Producer => {
                        let share = 1.0 / np as f64;
                        if water.is_some() {
                            vars.wfrac = share;
                        }
                        if gas.is_some() {
                            vars.gfrac = share;
                        }
                    }
                }
            }
        }
        self.init_primary_variables_evaluation();
        Ok(())
    }

    /// Segment rates and pressures from the primary variables. The top
    /// segment defines the well rates and bottom-hole pressure.
    pub fn update_well_state_from_primary_variables(&self, state: &mut WellState) -> WellResult<()> {
        self.check_state(state)?;
        let usage = *self.layout.usage();
        let np = self.layout.num_components();
        for seg in 0..self.topology.number_of_segments() {
            let vars = self.primary.segment(seg);
            let mut fractions = vars.fractions(&usage);
            for (p, fraction) in fractions.iter_mut().enumerate().take(np) {
                let scale = self.scaling.factor(p);
                *fraction = if scale > 0.0 { *fraction / scale } else { 0.0 };
            }
            for (p, fraction) in fractions.iter().enumerate().take(np) {
                let rate = vars.g_total * fraction;
                *state.segment_rate_mut(seg, p) = rate;
                if seg == 0 {
                    state.well_rates[p] = rate;
                }
            }
            state.segment_pressures[seg] = vars.pressure;
            if seg == 0 {
                state.bhp = vars.pressure;
            }
        }
        Ok(())
    }

    /// Spread the well rates over perforations and segments.
    pub fn init_segment_rates_with_well_rates(&self, state: &mut WellState) -> WellResult<()> {
        self.check_state(state)?;
        state.init_segment_rates_with_well_rates(&self.topology);
        Ok(())
    }

    /// Move the well state onto the active control target, then refresh the
    /// primary variables.
    pub fn update_well_state_with_target(&mut self, state: &mut WellState) -> WellResult<()> {
        self.check_state(state)?;
        let np = self.layout.num_components();
        match &self.settings.control {
            WellControl::Bhp { target } => {
                state.bhp = *target;
                state.segment_pressures[0] = *target;
            }
            WellControl::Thp { target } => {
                state.thp = *target;
            }
            WellControl::SurfaceRate { target, distr }
            | WellControl::ReservoirRate { target, distr } => {
                let controlled = |p: usize| distr.get(p).is_some_and(|&w| w > 0.0);
                let n_controlled = (0..np).filter(|&p| controlled(p)).count();
                match self.settings.well_type {
                    WellType::Injector => {
                        if n_controlled != 1 {
                            return Err(WellError::Unimplemented {
                                feature: format!(
                                    "initial rates for an injector controlling {n_controlled} phases"
                                ),
                            });
                        }
                        for p in 0..np {
                            state.well_rates[p] =
                                if controlled(p) { target / distr[p] } else { 0.0 };
                        }
                        state.init_segment_rates_with_well_rates(&self.topology);
                    }
                    WellType::Producer => {
                        let original: f64 = (0..np)
                            .filter(|&p| controlled(p))
                            .map(|p| state.well_rates[p] * distr[p])
                            .sum();
                        if original != 0.0 {
                            let factor = target / original;
                            for rate in state.well_rates.iter_mut() {
                                *rate *= factor;
                            }
                            for rate in state.segment_rates.iter_mut() {
                                *rate *= factor;
                            }
                        } else {
                            let divided = target / n_controlled.max(1) as f64;
                            for p in 0..np {
                                state.well_rates[p] =
                                    if controlled(p) { divided / distr[p] } else { divided };
                            }
                            state.init_segment_rates_with_well_rates(&self.topology);
                        }
                    }
                }
            }
        }
        self.update_primary_variables(state)
    }

    fn wellbore_fluid(&self, ctx: &ReservoirContext<'_>) -> WellResult<WellboreFluid> {
        let first = self
            .topology
            .perforations()
            .first()
            .ok_or(WellError::Topology(mw_topology::TopologyError::NoPerforations))?;
        let cell = ctx.cell(first.cell)?;
        let pvt_region = match self.params.region_policy {
            RegionPolicy::FirstPerforation => cell.pvt_region,
            RegionPolicy::Fixed(region) => region,
        };
        Ok(WellboreFluid {
            pvt_region,
            temperature: cell.temperature,
        })
    }

    /// Quantities frozen for a timestep: the cell-to-perforation hydrostatic
    /// differences and the segment composition used by the accumulation term.
    pub fn calculate_explicit_quantities(&mut self, ctx: &ReservoirContext<'_>) -> WellResult<()> {
        let usage = *self.layout.usage();
        for (perf, diff) in self.cell_perf_pressure_diffs.iter_mut().enumerate() {
            let perforation = self.topology.perforation(perf);
            let cell = ctx.cell(perforation.cell)?;
            *diff = cell_perforation_pressure_diff(
                &usage,
                cell,
                perforation.depth.value,
                ctx.gravity,
            )?;
        }

        self.init_primary_variables_evaluation();
        let nc = self.layout.num_components();
        for (seg, eval) in self.evaluation.iter().enumerate() {
            let fractions = eval.surface_volume_fractions(&self.scaling)?;
            for comp in 0..nc {
                self.initial_composition[seg][comp] = fractions[comp].value();
            }
        }
        Ok(())
    }

    /// Density, viscosity and mass rate of every segment.
    pub fn compute_segment_fluid_properties(&mut self, ctx: &ReservoirContext<'_>) -> WellResult<()> {
        let fluid = self.wellbore_fluid(ctx)?;
        self.fluid = Some(SegmentFluidState::compute(
            &self.evaluation,
            &self.scaling,
            ctx.pvt,
            fluid,
        )?);
        Ok(())
    }

    /// One assembly pass at the current primary variables. Refreshes the
    /// factorisation of `D` used by the elimination operations.
    pub fn assemble_well_eq_without_iteration(
        &mut self,
        ctx: &ReservoirContext<'_>,
        dt: f64,
        state: &mut WellState,
        only_wells: bool,
    ) -> WellResult<()> {
        check_timestep(dt)?;
        self.check_state(state)?;
        self.compute_segment_fluid_properties(ctx)?;
        let fluid = self.fluid.as_ref().ok_or_else(|| WellError::InvalidState {
            what: "segment fluid state missing".to_string(),
        })?;
        let mut equations = self.equations.take().ok_or_else(|| WellError::InvalidState {
            what: format!("well {} has not been initialised", self.settings.name),
        })?;
        if !only_wells {
            self.contributions.clear();
        }
        let assembler = WellEquationAssembler {
            topology: &self.topology,
            settings: &self.settings,
            scaling: &self.scaling,
            segments: &self.evaluation,
            fluid,
            initial_composition: &self.initial_composition,
            cell_perf_pressure_diffs: &self.cell_perf_pressure_diffs,
            reservoir: *ctx,
            dt,
        };
        let result = assembler.assemble(&mut equations, &mut self.contributions, only_wells);
        self.equations = Some(equations);
        self.eliminator = None;
        state.perforation_rates = result?;

        let eliminator = SchurEliminator::new(&self.equations_ref()?.d, &self.settings.name)?;
        self.eliminator = Some(eliminator);
        Ok(())
    }

    /// Inner iterations (when enabled) followed by a full assembly.
    pub fn assemble_well_eq(
        &mut self,
        ctx: &ReservoirContext<'_>,
        dt: f64,
        state: &mut WellState,
        only_wells: bool,
    ) -> WellResult<Option<InnerIterationOutcome>> {
        let outcome = if self.params.use_inner_iterations {
            Some(self.iterate_well_equations(ctx, dt, state)?)
        } else {
            None
        };
        self.assemble_well_eq_without_iteration(ctx, dt, state, only_wells)?;
        Ok(outcome)
    }

    /// Residual averaging factors of the inner iterations in compact order.
    fn inner_averaging(&self) -> Vec<f64> {
        let usage = self.layout.usage();
        usage
            .active_phases()
            .map(|phase| self.params.inner_iteration_averaging[phase.index()])
            .collect()
    }

    /// Newton iterations on the well equations alone, with the reservoir
    /// frozen. Best effort: running out of iterations is not an error.
    pub fn iterate_well_equations(
        &mut self,
        ctx: &ReservoirContext<'_>,
        dt: f64,
        state: &mut WellState,
    ) -> WellResult<InnerIterationOutcome> {
        let b_avg = self.inner_averaging();
        let max_iterations = self.params.max_inner_iterations;
        for it in 0..max_iterations {
            self.assemble_well_eq_without_iteration(ctx, dt, state, true)?;
            let report = self.well_convergence(&b_avg)?;
            if report.converged {
                debug!(well = %self.settings.name, iterations = it, "inner iterations converged");
                return Ok(InnerIterationOutcome::Converged { iterations: it });
            }
            let dx = {
                let eqs = self.equations_ref()?;
                self.eliminator_ref()?.solve(&eqs.residual)?
            };
            self.update_well_state(&dx, true, state)?;
        }
        warn!(
            well = %self.settings.name,
            iterations = max_iterations,
            "inner iterations did not converge"
        );
        Ok(InnerIterationOutcome::Exhausted {
            iterations: max_iterations,
        })
    }

    /// Classify the current residual.
    pub fn well_convergence(&self, b_avg: &[f64]) -> WellResult<ConvergenceReport> {
        let eqs = self.equations_ref()?;
        if b_avg.len() != self.layout.num_components() {
            return Err(WellError::InvalidState {
                what: format!(
                    "{} averaging factors for {} components",
                    b_avg.len(),
                    self.layout.num_components()
                ),
            });
        }
        Ok(well_convergence(&self.settings.name, eqs, b_avg, &self.params))
    }

    /// Subtract the bounded Newton step and write the result to `state`.
    pub fn update_well_state(
        &mut self,
        dx: &[f64],
        inner_iteration: bool,
        state: &mut WellState,
    ) -> WellResult<()> {
        apply_newton_update(&mut self.primary, dx, &self.params, inner_iteration)?;
        self.update_well_state_from_primary_variables(state)?;
        self.init_primary_variables_evaluation();
        Ok(())
    }

    /// `ax -= C^T D^-1 B x`.
    pub fn apply(&self, x: &[f64], ax: &mut [f64]) -> WellResult<()> {
        self.eliminator_ref()?.apply(self.equations_ref()?, x, ax)
    }

    /// `r -= C^T D^-1 r_w`.
    pub fn apply_residual(&self, r: &mut [f64]) -> WellResult<()> {
        self.eliminator_ref()?.apply_residual(self.equations_ref()?, r)
    }

    /// Well increment for a solved reservoir increment.
    pub fn recover_well_solution(&self, x: &[f64]) -> WellResult<Vec<f64>> {
        self.eliminator_ref()?.recover(self.equations_ref()?, x)
    }

    pub fn recover_well_solution_and_update_well_state(
        &mut self,
        x: &[f64],
        state: &mut WellState,
    ) -> WellResult<()> {
        let dx = self.recover_well_solution(x)?;
        self.update_well_state(&dx, false, state)
    }

    /// Newton step on the well equations alone.
    pub fn solve_eq_and_update_well_state(&mut self, state: &mut WellState) -> WellResult<()> {
        let dx = self.eliminator_ref()?.solve(&self.equations_ref()?.residual)?;
        self.update_well_state(&dx, false, state)
    }

    /// Write the perforation terms of the last full assembly into the
    /// reservoir system.
    pub fn add_cell_contributions(&self, system: &mut dyn ReservoirSystem) -> WellResult<()> {
        if system.num_eq() != self.layout.num_cell_eq() {
            return Err(WellError::InvalidState {
                what: format!(
                    "reservoir has {} equations per cell, well expects {}",
                    system.num_eq(),
                    self.layout.num_cell_eq()
                ),
            });
        }
        self.contributions.apply_to(system)
    }
}

fn check_timestep(dt: f64) -> WellResult<()> {
    if ensure_finite(dt, "timestep")? <= 0.0 {
        return Err(WellError::InvalidState {
            what: format!("timestep must be positive, got {dt} s"),
        });
    }
    Ok(())
}
