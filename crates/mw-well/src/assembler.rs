//! Residual and Jacobian assembly of the well equations.
//!
//! Per segment the equations are one mass balance per component followed by
//! the pressure equation, which the top segment replaces by the control
//! equation. Unknowns follow [`WellLayout`]. The coupled linear system is
//!
//! ```text
//! | A  C^T | | x_cells |   | r_cells |
//! | B  D   | | x_well  | = | r_well  |
//! ```
//!
//! where `A` belongs to the reservoir and only its diagonal blocks receive
//! perforation terms.

use mw_core::{CellIndex, EvalWell, MAX_CELL_EQ};
use mw_fluids::MAX_PHASES;
use mw_topology::SegmentTopology;
use tracing::trace;

use crate::blocks::BlockMatrix;
use crate::config::WellSettings;
use crate::control::{ComponentScaling, WellControl, default_phase_scale};
use crate::error::{WellError, WellResult};
use crate::fluid_state::SegmentFluidState;
use crate::hydraulics::{hydrostatic_loss, signed_friction_loss, velocity_head};
use crate::perforation::{
    PerforationConditions, cell_derivatives, compute_perforation_rates, perforation_mobility,
};
use crate::primary::{SegmentEval, WellLayout};
use crate::system::{CellContribution, CellContributions, ReservoirContext};

/// The local linear system of one well.
#[derive(Debug, Clone, PartialEq)]
pub struct WellEquations {
    layout: WellLayout,
    num_cells: usize,
    /// Laid out as `segment * num_well_eq + eq`.
    pub residual: Vec<f64>,
    /// Segment by segment, blocks `[eq][well pv]`.
    pub d: BlockMatrix,
    /// Segment by cell, blocks `[eq][cell pv]`.
    pub b: BlockMatrix,
    /// Segment by cell, blocks `[well pv][cell eq]`.
    pub c: BlockMatrix,
}

impl WellEquations {
    /// Allocate the sparsity patterns: `D` couples a segment with itself, its
    /// outlet and its inlets; `B` and `C` with the cells it perforates.
    pub fn new(topology: &SegmentTopology, layout: WellLayout, num_cells: usize) -> WellResult<Self> {
        let nseg = topology.number_of_segments();
        let neq = layout.num_well_eq();
        let ncell_eq = layout.num_cell_eq();

        let mut d_pattern = Vec::with_capacity(nseg);
        let mut cell_pattern = Vec::with_capacity(nseg);
        for seg in 0..nseg {
            let mut row = vec![seg];
            row.extend(topology.outlet(seg));
            row.extend_from_slice(topology.inlets(seg));
            d_pattern.push(row);
            cell_pattern.push(topology.segment_cells(seg));
        }

        Ok(Self {
            layout,
            num_cells,
            residual: vec![0.0; nseg * neq],
            d: BlockMatrix::from_pattern(nseg, nseg, neq, neq, d_pattern)?,
            b: BlockMatrix::from_pattern(nseg, num_cells, neq, ncell_eq, cell_pattern.clone())?,
            c: BlockMatrix::from_pattern(nseg, num_cells, neq, ncell_eq, cell_pattern)?,
        })
    }

    pub fn layout(&self) -> &WellLayout {
        &self.layout
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn num_segments(&self) -> usize {
        self.d.num_rows()
    }

    pub fn residual_at(&self, seg: usize, eq: usize) -> f64 {
        self.residual[seg * self.layout.num_well_eq() + eq]
    }

    fn residual_mut(&mut self, seg: usize, eq: usize) -> &mut f64 {
        let neq = self.layout.num_well_eq();
        &mut self.residual[seg * neq + eq]
    }

    /// Reset residual and `D`; `B` and `C` only when the reservoir coupling
    /// is assembled as well.
    pub fn clear(&mut self, only_wells: bool) {
        self.residual.fill(0.0);
        self.d.clear();
        if !only_wells {
            self.b.clear();
            self.c.clear();
        }
    }

    /// `D[row, col][eq][pv] += scale * d value/d pv` for every well pv.
    fn add_well_derivatives(
        &mut self,
        row: usize,
        col: usize,
        eq: usize,
        value: &EvalWell,
        scale: f64,
    ) -> WellResult<()> {
        for pv in 0..self.layout.num_well_eq() {
            self.d
                .add(row, col, eq, pv, scale * value.derivative(WellLayout::well_slot(pv)))?;
        }
        Ok(())
    }

    /// Overwrite one `D` row instead of accumulating.
    fn set_well_derivatives(
        &mut self,
        row: usize,
        col: usize,
        eq: usize,
        value: &EvalWell,
        scale: f64,
    ) -> WellResult<()> {
        for pv in 0..self.layout.num_well_eq() {
            self.d
                .set(row, col, eq, pv, scale * value.derivative(WellLayout::well_slot(pv)))?;
        }
        Ok(())
    }
}

fn is_controlled(distr: &[f64], comp: usize) -> bool {
    distr.get(comp).is_some_and(|&w| w > 0.0)
}

/// Residual of the control equation on the top segment.
pub fn control_equation(
    control: &WellControl,
    scaling: &ComponentScaling,
    top: &SegmentEval,
) -> WellResult<EvalWell> {
    let usage = scaling.usage();
    let nc = scaling.num_components();
    match control {
        WellControl::Bhp { target } => Ok(top.pressure - *target),
        WellControl::Thp { .. } => Err(WellError::Unimplemented {
            feature: "THP control".to_string(),
        }),
        WellControl::SurfaceRate { target, distr } => {
            let controlled: Vec<usize> = (0..nc).filter(|&c| is_controlled(distr, c)).collect();
            match controlled.as_slice() {
                [] => Err(WellError::InvalidState {
                    what: "surface rate control without a controlled phase".to_string(),
                }),
                [comp] => {
                    let g = default_phase_scale(usage.phase_at(*comp));
                    Ok(top.g_total * top.volume_fraction(usage, *comp) - g * *target)
                }
                comps => {
                    let mut rate = EvalWell::constant(0.0);
                    for &comp in comps {
                        rate += top.g_total * top.volume_fraction_scaled(scaling, comp);
                    }
                    Ok(rate - *target)
                }
            }
        }
        WellControl::ReservoirRate { target, distr } => {
            let mut rate = EvalWell::constant(0.0);
            for comp in (0..nc).filter(|&c| is_controlled(distr, c)) {
                rate += top.g_total * top.volume_fraction(usage, comp);
            }
            Ok(rate - *target)
        }
    }
}

/// Inputs of one assembly pass.
pub struct WellEquationAssembler<'a> {
    pub topology: &'a SegmentTopology,
    pub settings: &'a WellSettings,
    pub scaling: &'a ComponentScaling,
    pub segments: &'a [SegmentEval],
    pub fluid: &'a SegmentFluidState,
    /// Surface composition frozen at the start of the timestep.
    pub initial_composition: &'a [[f64; MAX_PHASES]],
    pub cell_perf_pressure_diffs: &'a [f64],
    pub reservoir: ReservoirContext<'a>,
    pub dt: f64,
}

impl WellEquationAssembler<'_> {
    /// Assemble all segments into `eqs`.
    ///
    /// With `only_wells` set, the reservoir coupling is skipped: `B`, `C` and
    /// `contributions` are left untouched. Returns the perforation surface
    /// rates (before the efficiency factor), flat by `perf * num_phases + phase`.
    pub fn assemble(
        &self,
        eqs: &mut WellEquations,
        contributions: &mut CellContributions,
        only_wells: bool,
    ) -> WellResult<Vec<f64>> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(WellError::InvalidState {
                what: format!("timestep must be positive, got {}", self.dt),
            });
        }
        let layout = *eqs.layout();
        let usage = *layout.usage();
        let nc = layout.num_components();
        let ncell_eq = layout.num_cell_eq();
        let spres = layout.spres();
        let topology = self.topology;
        let nseg = topology.number_of_segments();
        let efficiency = self.settings.efficiency_factor;

        eqs.clear(only_wells);
        let mut perforation_rates = vec![0.0; topology.number_of_perforations() * nc];

        for seg in 0..nseg {
            let eval = &self.segments[seg];

            // Accumulation plus the rate leaving through the outlet.
            let volume = topology.segment(seg).volume();
            let fractions = self.fluid.surface_fractions(seg);
            for comp in 0..nc {
                let accumulation = (fractions[comp] - self.initial_composition[seg][comp])
                    * (volume / self.dt)
                    + eval.segment_rate(self.scaling, comp);
                *eqs.residual_mut(seg, comp) += accumulation.value();
                eqs.add_well_derivatives(seg, seg, comp, &accumulation, 1.0)?;
            }

            for &inlet in topology.inlets(seg) {
                for comp in 0..nc {
                    let inlet_rate = self.segments[inlet].segment_rate(self.scaling, comp);
                    *eqs.residual_mut(seg, comp) -= inlet_rate.value();
                    eqs.add_well_derivatives(seg, inlet, comp, &inlet_rate, -1.0)?;
                }
            }

            for &perf in topology.segment_perforations(seg) {
                let perforation = topology.perforation(perf);
                let cell_idx: CellIndex = perforation.cell;
                let cell = self.reservoir.cell(cell_idx)?;
                let mobility = perforation_mobility(
                    &usage,
                    cell,
                    perforation.sat_region,
                    self.reservoir.relperm,
                )?;
                let cond = PerforationConditions {
                    usage: &usage,
                    well_type: self.settings.well_type,
                    allow_cross_flow: self.settings.allow_cross_flow,
                    well_index: perforation.well_index,
                    gravity: self.reservoir.gravity,
                    mobility: &mobility,
                    wellbore_fractions: fractions,
                    segment_pressure: eval.pressure,
                    segment_density: *self.fluid.density(seg),
                    perf_segment_depth_diff: topology.perforation_segment_depth_diff(perf),
                    cell_perf_pressure_diff: self.cell_perf_pressure_diffs[perf],
                };
                let flux = compute_perforation_rates(cell, &cond)?;

                let mut contribution = CellContribution {
                    cell: cell_idx,
                    residual: [0.0; MAX_CELL_EQ],
                    jacobian: [[0.0; MAX_CELL_EQ]; MAX_CELL_EQ],
                };
                for comp in 0..nc {
                    perforation_rates[perf * nc + comp] = flux.rates[comp].value();
                    let effective = flux.rates[comp] * efficiency;

                    *eqs.residual_mut(seg, comp) -= effective.value();
                    eqs.add_well_derivatives(seg, seg, comp, &effective, -1.0)?;

                    if !only_wells {
                        for pv in 0..layout.num_well_eq() {
                            let d = effective.derivative(WellLayout::well_slot(pv));
                            eqs.c.add(seg, cell_idx, pv, comp, -d)?;
                        }
                        let cell_d = cell_derivatives(&effective, ncell_eq);
                        for pv in 0..ncell_eq {
                            eqs.b.add(seg, cell_idx, comp, pv, -cell_d[pv])?;
                            contribution.jacobian[comp][pv] = -cell_d[pv];
                        }
                        contribution.residual[comp] = -effective.value();
                    }
                }
                if !only_wells {
                    contributions.push(contribution);
                }
                trace!(
                    perforation = perf,
                    segment = seg,
                    cell = cell_idx,
                    drawdown = flux.drawdown.value(),
                    direction = ?flux.direction,
                    "perforation flux"
                );
            }

            if seg == 0 {
                let control = control_equation(&self.settings.control, self.scaling, eval)?;
                *eqs.residual_mut(0, spres) = control.value();
                eqs.set_well_derivatives(0, 0, spres, &control, 1.0)?;
            } else {
                self.assemble_pressure_equation(eqs, seg)?;
            }
        }
        Ok(perforation_rates)
    }

    /// Pressure drop between a segment and its outlet.
    fn assemble_pressure_equation(&self, eqs: &mut WellEquations, seg: usize) -> WellResult<()> {
        let topology = self.topology;
        let spres = eqs.layout().spres();
        let outlet = topology.outlet(seg).ok_or_else(|| WellError::InvalidState {
            what: format!("segment location {seg} has no outlet"),
        })?;
        let segment = topology.segment(seg);
        let model = segment.pressure_drop();
        let density = self.fluid.density(seg);
        let mass_rate = self.fluid.mass_rate(seg);

        let mut equation = self.segments[seg].pressure
            - hydrostatic_loss(density, self.reservoir.gravity, topology.segment_depth_diff(seg));
        if model.includes_friction() {
            equation -= signed_friction_loss(
                topology.segment_length(seg),
                segment.internal_diameter(),
                segment.cross_area(),
                segment.roughness(),
                density,
                mass_rate,
                self.fluid.viscosity(seg),
            );
        }
        *eqs.residual_mut(seg, spres) = equation.value();
        eqs.set_well_derivatives(seg, seg, spres, &equation, 1.0)?;

        let outlet_pressure = self.segments[outlet].pressure;
        *eqs.residual_mut(seg, spres) -= outlet_pressure.value();
        eqs.set_well_derivatives(seg, outlet, spres, &outlet_pressure, -1.0)?;

        if model.includes_acceleration() {
            let area = segment.cross_area();
            let own = velocity_head(area, mass_rate, density);
            *eqs.residual_mut(seg, spres) -= own.value();
            eqs.add_well_derivatives(seg, seg, spres, &own, -1.0)?;

            // Inlet heads are evaluated with this segment's area.
            for &inlet in topology.inlets(seg) {
                let head = velocity_head(
                    area,
                    self.fluid.mass_rate(inlet),
                    self.fluid.density(inlet),
                );
                *eqs.residual_mut(seg, spres) += head.value();
                eqs.add_well_derivatives(seg, inlet, spres, &head, 1.0)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primary::SegmentVariables;
    use mw_fluids::PhaseUsage;

    fn top(usage: PhaseUsage) -> SegmentEval {
        let layout = WellLayout::new(usage);
        SegmentEval::seed(
            &layout,
            &SegmentVariables {
                g_total: -100.0,
                wfrac: 0.2,
                gfrac: 0.3,
                pressure: 150.0e5,
            },
        )
    }

    #[test]
    fn bhp_control_fixes_top_pressure() {
        let usage = PhaseUsage::three_phase();
        let control = WellControl::Bhp { target: 100.0e5 };
        let eq = control_equation(&control, &control.scaling(&usage), &top(usage)).unwrap();
        assert_eq!(eq.value(), 50.0e5);
        assert_eq!(eq.derivative(WellLayout::well_slot(3)), 1.0);
        assert_eq!(eq.derivative(WellLayout::well_slot(0)), 0.0);
    }

    #[test]
    fn thp_control_is_unimplemented() {
        let usage = PhaseUsage::oil_water();
        let control = WellControl::Thp { target: 10.0e5 };
        assert!(matches!(
            control_equation(&control, &control.scaling(&usage), &top(usage)),
            Err(WellError::Unimplemented { .. })
        ));
    }

    #[test]
    fn single_phase_gas_rate_is_scaled() {
        let usage = PhaseUsage::three_phase();
        let control = WellControl::SurfaceRate {
            target: -1000.0,
            distr: vec![0.0, 0.0, 1.0],
        };
        let eq = control_equation(&control, &control.scaling(&usage), &top(usage)).unwrap();
        // G * gfrac - 0.01 * target
        assert!((eq.value() - (-30.0 + 10.0)).abs() < 1e-12);
    }

    #[test]
    fn multi_phase_rate_sums_scaled_fractions() {
        let usage = PhaseUsage::three_phase();
        let control = WellControl::SurfaceRate {
            target: -50.0,
            distr: vec![1.0, 1.0, 0.0],
        };
        let eq = control_equation(&control, &control.scaling(&usage), &top(usage)).unwrap();
        // Water and oil: -100 * (0.2 + 0.5) + 50.
        assert!((eq.value() + 20.0).abs() < 1e-12);

        let control = WellControl::ReservoirRate {
            target: -50.0,
            distr: vec![1.1, 1.2, 0.0],
        };
        let eq = control_equation(&control, &control.scaling(&usage), &top(usage)).unwrap();
        // Unscaled fractions.
        assert!((eq.value() + 20.0).abs() < 1e-12);
    }
}
