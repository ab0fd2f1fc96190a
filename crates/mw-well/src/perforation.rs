//! Flux through one perforation.

use mw_core::{EvalWell, MAX_CELL_EQ};
use mw_fluids::{CellState, MAX_PHASES, Phase, PhaseUsage, RelPermService};
use tracing::trace;

use crate::control::WellType;
use crate::error::{WellError, WellResult};

/// Which way fluid moves through a perforation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    /// Cell to wellbore.
    Producing,
    /// Wellbore to cell.
    Injecting,
    /// Cross-flow against the well type while cross-flow is disallowed.
    Shut,
}

/// Surface rates of one perforation by compact phase position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerforationFlux {
    pub rates: [EvalWell; MAX_PHASES],
    pub drawdown: EvalWell,
    pub direction: FlowDirection,
}

/// Everything the flux depends on besides the cell state.
#[derive(Debug, Clone, Copy)]
pub struct PerforationConditions<'a> {
    pub usage: &'a PhaseUsage,
    pub well_type: WellType,
    pub allow_cross_flow: bool,
    pub well_index: f64,
    pub gravity: f64,
    /// Per-phase mobility in the perforated cell.
    pub mobility: &'a [EvalWell; MAX_PHASES],
    /// Surface composition of the wellbore fluid.
    pub wellbore_fractions: &'a [EvalWell; MAX_PHASES],
    pub segment_pressure: EvalWell,
    pub segment_density: EvalWell,
    /// Perforation depth minus segment depth.
    pub perf_segment_depth_diff: f64,
    /// Hydrostatic pressure from cell centre to perforation.
    pub cell_perf_pressure_diff: f64,
}

/// Cell quantities moved into the well derivative space.
fn extend(x: &mw_core::EvalCell) -> EvalWell {
    x.extend::<{ mw_core::NUM_DERIVATIVES }>()
}

/// Mobility used for a perforation.
///
/// A perforation with its own saturation region evaluates relative
/// permeability from that region with the cell's saturations and viscosities.
pub fn perforation_mobility(
    usage: &PhaseUsage,
    cell: &CellState,
    sat_region: Option<usize>,
    relperm: &dyn RelPermService,
) -> WellResult<[EvalWell; MAX_PHASES]> {
    let mut mobility = [EvalWell::constant(0.0); MAX_PHASES];
    let nc = usage.num_phases();
    match sat_region {
        Some(region) if region != cell.sat_region => {
            let kr = relperm.relative_permeabilities(region, &cell.saturation, usage)?;
            for pos in 0..nc {
                mobility[pos] = extend(&(kr[pos] / cell.viscosity[pos]));
            }
        }
        _ => {
            for pos in 0..nc {
                mobility[pos] = extend(&cell.mobility[pos]);
            }
        }
    }
    Ok(mobility)
}

/// Hydrostatic pressure difference between the cell centre and the
/// perforation, using the relative-permeability-weighted phase density.
pub fn cell_perforation_pressure_diff(
    usage: &PhaseUsage,
    cell: &CellState,
    perforation_depth: f64,
    gravity: f64,
) -> WellResult<f64> {
    let nc = usage.num_phases();
    let mut sum_kr = 0.0;
    let mut weighted = 0.0;
    for pos in 0..nc {
        let kr = cell.relperm[pos].value();
        sum_kr += kr;
        weighted += kr * cell.density[pos].value();
    }
    if sum_kr == 0.0 {
        return Err(WellError::NumericalProblem {
            what: "no mobile phase in a perforated cell".to_string(),
        });
    }
    Ok(gravity * weighted / sum_kr * (cell.depth - perforation_depth))
}

/// Surface rates through a perforation, positive into the reservoir.
pub fn compute_perforation_rates(
    cell: &CellState,
    cond: &PerforationConditions<'_>,
) -> WellResult<PerforationFlux> {
    let usage = cond.usage;
    let nc = usage.num_phases();
    let zero = EvalWell::constant(0.0);

    let pressure_cell = extend(&cell.pressure);
    let rs = extend(&cell.rs);
    let rv = extend(&cell.rv);
    let mut b = [zero; MAX_PHASES];
    for pos in 0..nc {
        b[pos] = extend(&cell.inv_b[pos]);
    }

    let perf_seg_pressure_diff =
        cond.segment_density * (cond.gravity * cond.perf_segment_depth_diff);
    let drawdown = (pressure_cell + cond.cell_perf_pressure_diff)
        - (cond.segment_pressure + perf_seg_pressure_diff);

    let shut = PerforationFlux {
        rates: [zero; MAX_PHASES],
        drawdown,
        direction: FlowDirection::Shut,
    };
    let mut rates = [zero; MAX_PHASES];

    if drawdown.value() > 0.0 {
        if !cond.allow_cross_flow && cond.well_type == WellType::Injector {
            trace!(drawdown = drawdown.value(), "injector perforation would produce");
            return Ok(shut);
        }
        for pos in 0..nc {
            rates[pos] = b[pos] * (cond.mobility[pos] * drawdown * -cond.well_index);
        }
        if let Some(gas) = usage.position(Phase::Gas) {
            let oil = usage.oil_position();
            let oil_rate = rates[oil];
            let gas_rate = rates[gas];
            rates[gas] += rs * oil_rate;
            rates[oil] += rv * gas_rate;
        }
        return Ok(PerforationFlux {
            rates,
            drawdown,
            direction: FlowDirection::Producing,
        });
    }

    if !cond.allow_cross_flow && cond.well_type == WellType::Producer {
        trace!(drawdown = drawdown.value(), "producer perforation would inject");
        return Ok(shut);
    }

    let mut total_mobility = zero;
    for pos in 0..nc {
        total_mobility += cond.mobility[pos];
    }
    let total_rate = total_mobility * drawdown * -cond.well_index;

    let cmix = cond.wellbore_fractions;
    let mut volume_ratio = zero;
    if let Some(water) = usage.position(Phase::Water) {
        volume_ratio += cmix[water] / b[water];
    }
    let oil = usage.oil_position();
    if let Some(gas) = usage.position(Phase::Gas) {
        let d = 1.0 - rv * rs;
        if d.value() == 0.0 {
            return Err(WellError::NumericalProblem {
                what: format!(
                    "zero 1 - rs*rv in perforation flux (rs {}, rv {})",
                    rs.value(),
                    rv.value()
                ),
            });
        }
        let free_oil = (cmix[oil] - rv * cmix[gas]) / d;
        let free_gas = (cmix[gas] - rs * cmix[oil]) / d;
        volume_ratio += free_oil / b[oil];
        volume_ratio += free_gas / b[gas];
    } else {
        volume_ratio += cmix[oil] / b[oil];
    }

    let surface_rate = total_rate / volume_ratio;
    for pos in 0..nc {
        rates[pos] = cmix[pos] * surface_rate;
    }
    Ok(PerforationFlux {
        rates,
        drawdown,
        direction: FlowDirection::Injecting,
    })
}

/// Cell-variable part of a rate derivative, in cell primary-variable order.
pub(crate) fn cell_derivatives(value: &EvalWell, num_cell_eq: usize) -> [f64; MAX_CELL_EQ] {
    let mut d = [0.0; MAX_CELL_EQ];
    for (pv, slot) in d.iter_mut().enumerate().take(num_cell_eq) {
        *slot = value.derivative(pv);
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primary::WellLayout;
    use mw_fluids::{CellConditions, LinearPvt, TableRelPerm};

    fn cell(usage: &PhaseUsage, pressure: f64) -> CellState {
        CellState::evaluate(
            usage,
            &LinearPvt::default(),
            &TableRelPerm::default(),
            &CellConditions {
                pressure,
                water_saturation: 0.3,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn rates(
        usage: &PhaseUsage,
        cell: &CellState,
        well_type: WellType,
        allow_cross_flow: bool,
        segment_pressure: f64,
    ) -> PerforationFlux {
        let mobility = perforation_mobility(usage, cell, None, &TableRelPerm::default()).unwrap();
        let fractions = [
            EvalWell::constant(0.5),
            EvalWell::constant(0.5),
            EvalWell::constant(0.0),
        ];
        let cond = PerforationConditions {
            usage,
            well_type,
            allow_cross_flow,
            well_index: 1.0e-12,
            gravity: 9.80665,
            mobility: &mobility,
            wellbore_fractions: &fractions,
            segment_pressure: EvalWell::variable(segment_pressure, WellLayout::well_slot(2)),
            segment_density: EvalWell::constant(900.0),
            perf_segment_depth_diff: 0.0,
            cell_perf_pressure_diff: 0.0,
        };
        compute_perforation_rates(cell, &cond).unwrap()
    }

    #[test]
    fn positive_drawdown_produces() {
        let usage = PhaseUsage::oil_water();
        let c = cell(&usage, 200.0e5 + 10.0);
        let flux = rates(&usage, &c, WellType::Producer, true, 200.0e5);
        assert_eq!(flux.direction, FlowDirection::Producing);
        assert!((flux.drawdown.value() - 10.0).abs() < 1e-6);
        for pos in 0..2 {
            let expected = -1.0e-12 * c.mobility[pos].value() * 10.0 * c.inv_b[pos].value();
            assert!((flux.rates[pos].value() - expected).abs() < 1e-12 * expected.abs());
            assert!(flux.rates[pos].value() < 0.0);
            // Producing more when the segment pressure drops.
            assert!(flux.rates[pos].derivative(WellLayout::well_slot(2)) > 0.0);
        }
    }

    #[test]
    fn negative_drawdown_injects_wellbore_mixture() {
        let usage = PhaseUsage::oil_water();
        let c = cell(&usage, 200.0e5 - 10.0);
        let flux = rates(&usage, &c, WellType::Injector, true, 200.0e5);
        assert_eq!(flux.direction, FlowDirection::Injecting);
        assert!(flux.rates[0].value() > 0.0);
        // Wellbore composition is 50/50 at surface conditions.
        assert!((flux.rates[0].value() - flux.rates[1].value()).abs() < 1e-15);

        let total_mob = c.mobility[0].value() + c.mobility[1].value();
        let volume_ratio = 0.5 / c.inv_b[0].value() + 0.5 / c.inv_b[1].value();
        let expected = 0.5 * 1.0e-12 * total_mob * 10.0 / volume_ratio;
        assert!((flux.rates[0].value() - expected).abs() < 1e-9 * expected);
    }

    #[test]
    fn disallowed_cross_flow_is_shut() {
        let usage = PhaseUsage::oil_water();
        let c = cell(&usage, 200.0e5 - 10.0);
        let flux = rates(&usage, &c, WellType::Producer, false, 200.0e5);
        assert_eq!(flux.direction, FlowDirection::Shut);
        assert!(flux.rates.iter().all(|r| *r == EvalWell::constant(0.0)));

        let c = cell(&usage, 200.0e5 + 10.0);
        let flux = rates(&usage, &c, WellType::Injector, false, 200.0e5);
        assert_eq!(flux.direction, FlowDirection::Shut);
    }

    #[test]
    fn cell_derivatives_follow_cell_pressure() {
        let usage = PhaseUsage::oil_water();
        let c = cell(&usage, 200.0e5 + 1.0e5);
        let flux = rates(&usage, &c, WellType::Producer, true, 200.0e5);
        let d = cell_derivatives(&flux.rates[1], usage.num_phases());
        assert!(d[0] < 0.0);
        assert_eq!(d[2], 0.0);
    }

    #[test]
    fn injection_with_unit_rs_rv_product_fails() {
        let usage = PhaseUsage::three_phase();
        let c = CellState::evaluate(
            &usage,
            &LinearPvt::default(),
            &TableRelPerm::default(),
            &CellConditions {
                pressure: 100.0e5,
                water_saturation: 0.2,
                gas_saturation: 0.2,
                rs: Some(2.0),
                rv: Some(0.5),
                ..Default::default()
            },
        )
        .unwrap();
        let mobility = perforation_mobility(&usage, &c, None, &TableRelPerm::default()).unwrap();
        let fractions = [EvalWell::constant(1.0 / 3.0); MAX_PHASES];
        let cond = PerforationConditions {
            usage: &usage,
            well_type: WellType::Injector,
            allow_cross_flow: true,
            well_index: 1.0e-12,
            gravity: 9.80665,
            mobility: &mobility,
            wellbore_fractions: &fractions,
            segment_pressure: EvalWell::constant(110.0e5),
            segment_density: EvalWell::constant(500.0),
            perf_segment_depth_diff: 0.0,
            cell_perf_pressure_diff: 0.0,
        };
        assert!(matches!(
            compute_perforation_rates(&c, &cond),
            Err(WellError::NumericalProblem { .. })
        ));
    }

    fn gas_cell(pressure: f64) -> CellState {
        CellState::evaluate(
            &PhaseUsage::three_phase(),
            &LinearPvt::default(),
            &TableRelPerm::default(),
            &CellConditions {
                pressure,
                water_saturation: 0.3,
                gas_saturation: 0.15,
                rs: Some(20.0),
                rv: Some(5.0e-5),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn gas_flux(cell: &CellState, fractions: [f64; MAX_PHASES]) -> PerforationFlux {
        let usage = PhaseUsage::three_phase();
        let mobility = perforation_mobility(&usage, cell, None, &TableRelPerm::default()).unwrap();
        let fractions = fractions.map(EvalWell::constant);
        let cond = PerforationConditions {
            usage: &usage,
            well_type: WellType::Producer,
            allow_cross_flow: true,
            well_index: 2.0e-12,
            gravity: 9.80665,
            mobility: &mobility,
            wellbore_fractions: &fractions,
            segment_pressure: EvalWell::variable(200.0e5, WellLayout::well_slot(3)),
            segment_density: EvalWell::constant(600.0),
            perf_segment_depth_diff: 0.0,
            cell_perf_pressure_diff: 0.0,
        };
        compute_perforation_rates(cell, &cond).unwrap()
    }

    #[test]
    fn producing_with_gas_moves_dissolved_components() {
        let c = gas_cell(200.0e5 + 2.0e5);
        let flux = gas_flux(&c, [0.1, 0.2, 0.7]);
        assert_eq!(flux.direction, FlowDirection::Producing);

        let free: Vec<f64> = (0..3)
            .map(|pos| -2.0e-12 * c.mobility[pos].value() * c.inv_b[pos].value() * 2.0e5)
            .collect();
        let rs = 20.0;
        let rv = 5.0e-5;
        let expected = [free[0], free[1] + rv * free[2], free[2] + rs * free[1]];
        for pos in 0..3 {
            let q = flux.rates[pos].value();
            assert!((q - expected[pos]).abs() <= 1e-12 * expected[pos].abs(), "phase {pos}");
            assert!(q < 0.0);
        }
        // Dissolved gas makes up a visible share of the gas stream.
        assert!(rs * free[1] / expected[2] > 1.0e-3);
        // Gas rate responds to segment pressure through both phases.
        let dq_dp = flux.rates[2].derivative(WellLayout::well_slot(3));
        let expected_dp = -(free[2] + rs * free[1]) / 2.0e5;
        assert!((dq_dp - expected_dp).abs() <= 1e-9 * expected_dp.abs());
    }

    #[test]
    fn injecting_with_gas_splits_free_phases() {
        let c = gas_cell(200.0e5 - 1.0e5);
        let cmix = [0.001, 0.004, 0.995];
        let flux = gas_flux(&c, cmix);
        assert_eq!(flux.direction, FlowDirection::Injecting);

        let (rs, rv) = (20.0, 5.0e-5);
        let b: Vec<f64> = (0..3).map(|pos| c.inv_b[pos].value()).collect();
        let total_mobility: f64 = (0..3).map(|pos| c.mobility[pos].value()).sum();
        let d = 1.0 - rs * rv;
        let free_oil = (cmix[1] - rv * cmix[2]) / d;
        let free_gas = (cmix[2] - rs * cmix[1]) / d;
        let volume_ratio = cmix[0] / b[0] + free_oil / b[1] + free_gas / b[2];
        let surface_rate = 2.0e-12 * total_mobility * 1.0e5 / volume_ratio;
        for pos in 0..3 {
            let expected = cmix[pos] * surface_rate;
            let q = flux.rates[pos].value();
            assert!((q - expected).abs() <= 1e-12 * expected, "phase {pos}");
        }

        // Reservoir volume of the injected stream equals the total inflow.
        let q: Vec<f64> = flux.rates.iter().map(|r| r.value()).collect();
        let oil_free = (q[1] - rv * q[2]) / d;
        let gas_free = (q[2] - rs * q[1]) / d;
        let reservoir_volume = q[0] / b[0] + oil_free / b[1] + gas_free / b[2];
        let inflow = 2.0e-12 * total_mobility * 1.0e5;
        assert!((reservoir_volume - inflow).abs() <= 1e-10 * inflow);
    }

    #[test]
    fn cell_pressure_difference_uses_mobile_phases() {
        let usage = PhaseUsage::oil_water();
        let mut c = cell(&usage, 200.0e5);
        c.depth = 1010.0;
        let diff = cell_perforation_pressure_diff(&usage, &c, 1000.0, 10.0).unwrap();
        let kr = [c.relperm[0].value(), c.relperm[1].value()];
        let rho = [c.density[0].value(), c.density[1].value()];
        let avg = (kr[0] * rho[0] + kr[1] * rho[1]) / (kr[0] + kr[1]);
        assert!((diff - 10.0 * avg * 10.0).abs() < 1e-9);

        for kr in c.relperm.iter_mut() {
            *kr = mw_core::EvalCell::constant(0.0);
        }
        assert!(matches!(
            cell_perforation_pressure_diff(&usage, &c, 1000.0, 10.0),
            Err(WellError::NumericalProblem { .. })
        ));
    }
}
