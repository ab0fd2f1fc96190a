//! Reservoir cell state as seen by a perforation.

use mw_core::{CellIndex, EvalCell, EvalWell, MAX_CELL_EQ};
use serde::{Deserialize, Serialize};

use crate::error::{FluidError, FluidResult};
use crate::phases::{MAX_PHASES, Phase, PhaseUsage};
use crate::pvt::PvtService;
use crate::relperm::RelPermService;

/// Intensive quantities of one reservoir cell.
///
/// Derivatives are taken with respect to the cell's primary variables:
/// slot 0 is pressure, followed by water saturation (if water is active)
/// and gas saturation (if gas is active). Per-phase arrays are indexed by
/// compact phase position; inactive entries are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CellState {
    /// Oil-phase pressure [Pa].
    pub pressure: EvalCell,
    pub temperature: f64,
    /// Depth of the cell centre [m].
    pub depth: f64,
    pub pvt_region: usize,
    pub sat_region: usize,
    pub rs: EvalCell,
    pub rv: EvalCell,
    pub saturation: [EvalCell; MAX_PHASES],
    pub inv_b: [EvalCell; MAX_PHASES],
    pub viscosity: [EvalCell; MAX_PHASES],
    /// Reservoir-condition density [kg/m³].
    pub density: [EvalCell; MAX_PHASES],
    pub relperm: [EvalCell; MAX_PHASES],
    /// `relperm / viscosity`.
    pub mobility: [EvalCell; MAX_PHASES],
}

/// Scalar description of a cell, used to evaluate a [`CellState`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConditions {
    pub pressure: f64,
    pub water_saturation: f64,
    pub gas_saturation: f64,
    pub temperature: f64,
    pub depth: f64,
    pub pvt_region: usize,
    pub sat_region: usize,
    /// Dissolved gas-oil ratio; saturated when `None`.
    pub rs: Option<f64>,
    /// Vaporized oil-gas ratio; saturated when `None`.
    pub rv: Option<f64>,
}

impl Default for CellConditions {
    fn default() -> Self {
        Self {
            pressure: 200.0e5,
            water_saturation: 0.0,
            gas_saturation: 0.0,
            temperature: 350.0,
            depth: 0.0,
            pvt_region: 0,
            sat_region: 0,
            rs: None,
            rv: None,
        }
    }
}

impl CellState {
    /// Evaluate PVT and relative permeability for a cell.
    pub fn evaluate(
        usage: &PhaseUsage,
        pvt: &dyn PvtService,
        relperm: &dyn RelPermService,
        conditions: &CellConditions,
    ) -> FluidResult<Self> {
        let c = conditions;
        let region = c.pvt_region;

        let pressure = EvalWell::variable(c.pressure, 0);
        let mut slot = 1;
        let mut sat_var = |active: bool, value: f64| {
            if active {
                slot += 1;
                EvalWell::variable(value, slot - 1)
            } else {
                EvalWell::constant(0.0)
            }
        };
        let sw = sat_var(usage.water, c.water_saturation);
        let sg = sat_var(usage.gas, c.gas_saturation);
        let so = 1.0 - sw - sg;
        if [sw.value(), so.value(), sg.value()]
            .iter()
            .any(|s| !(0.0..=1.0).contains(s))
        {
            return Err(FluidError::NonPhysical {
                what: "saturations must lie in [0, 1]",
            });
        }

        let mut rs = EvalWell::constant(0.0);
        let mut rv = EvalWell::constant(0.0);
        if usage.gas {
            rs = match c.rs {
                Some(v) => EvalWell::constant(v),
                None => pvt.rs_max(region, c.temperature, &pressure)?,
            };
            rv = match c.rv {
                Some(v) => EvalWell::constant(v),
                None => pvt.rv_max(region, c.temperature, &pressure)?,
            };
        }

        let zero = EvalCell::constant(0.0);
        let mut state = CellState {
            pressure: pressure.extend::<MAX_CELL_EQ>(),
            temperature: c.temperature,
            depth: c.depth,
            pvt_region: region,
            sat_region: c.sat_region,
            rs: rs.extend(),
            rv: rv.extend(),
            saturation: [zero; MAX_PHASES],
            inv_b: [zero; MAX_PHASES],
            viscosity: [zero; MAX_PHASES],
            density: [zero; MAX_PHASES],
            relperm: [zero; MAX_PHASES],
            mobility: [zero; MAX_PHASES],
        };

        let rho_o_surf = pvt.surface_density(region, Phase::Oil)?;
        let rho_g_surf = if usage.gas {
            pvt.surface_density(region, Phase::Gas)?
        } else {
            0.0
        };

        for (pos, phase) in usage.active_phases().enumerate() {
            let (props, saturation, density_surface) = match phase {
                Phase::Water => (
                    pvt.water(region, c.temperature, &pressure)?,
                    sw,
                    EvalWell::constant(pvt.surface_density(region, Phase::Water)?),
                ),
                Phase::Oil => (
                    pvt.oil(region, c.temperature, &pressure, &rs)?,
                    so,
                    rs * rho_g_surf + rho_o_surf,
                ),
                Phase::Gas => (
                    pvt.gas(region, c.temperature, &pressure, &rv)?,
                    sg,
                    rv * rho_o_surf + rho_g_surf,
                ),
            };
            state.saturation[pos] = saturation.extend();
            state.inv_b[pos] = props.inv_b.extend();
            state.viscosity[pos] = props.viscosity.extend();
            state.density[pos] = (props.inv_b * density_surface).extend();
        }

        state.relperm =
            relperm.relative_permeabilities(c.sat_region, &state.saturation, usage)?;
        for pos in 0..usage.num_phases() {
            state.mobility[pos] = state.relperm[pos] / state.viscosity[pos];
        }
        Ok(state)
    }
}

/// Bounds-checked access to the cell states of the reservoir.
pub fn lookup_cell(cells: &[CellState], cell: CellIndex) -> FluidResult<&CellState> {
    cells.get(cell).ok_or(FluidError::MissingCell {
        cell,
        count: cells.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear_pvt::LinearPvt;
    use crate::relperm::TableRelPerm;

    #[test]
    fn derivative_slots_follow_active_phases() {
        let usage = PhaseUsage::oil_gas();
        let cell = CellState::evaluate(
            &usage,
            &LinearPvt::default(),
            &TableRelPerm::default(),
            &CellConditions {
                gas_saturation: 0.3,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(cell.pressure.derivative(0), 1.0);
        // Gas saturation is slot 1 without water.
        assert_eq!(cell.saturation[1].derivative(1), 1.0);
        assert_eq!(cell.saturation[0].derivative(1), -1.0);
        assert!((cell.saturation[0].value() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn mobility_is_relperm_over_viscosity() {
        let usage = PhaseUsage::three_phase();
        let cell = CellState::evaluate(
            &usage,
            &LinearPvt::default(),
            &TableRelPerm::default(),
            &CellConditions {
                water_saturation: 0.2,
                gas_saturation: 0.1,
                ..Default::default()
            },
        )
        .unwrap();
        for pos in 0..3 {
            let expected = cell.relperm[pos].value() / cell.viscosity[pos].value();
            assert!((cell.mobility[pos].value() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn invalid_saturation_rejected() {
        let result = CellState::evaluate(
            &PhaseUsage::three_phase(),
            &LinearPvt::default(),
            &TableRelPerm::default(),
            &CellConditions {
                water_saturation: 0.8,
                gas_saturation: 0.4,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(FluidError::NonPhysical { .. })));
    }

    #[test]
    fn missing_cell() {
        assert_eq!(
            lookup_cell(&[], 2).unwrap_err(),
            FluidError::MissingCell { cell: 2, count: 0 }
        );
    }
}
