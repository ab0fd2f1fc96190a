//! Service contract checks for the reference fluid implementations.

use mw_core::{EvalCell, EvalWell};
use mw_fluids::{
    CellConditions, CellState, LinearPvt, Phase, PhaseUsage, PvtService, RelPermService,
    RelPermTable, TableRelPerm,
};
use proptest::prelude::*;

#[test]
fn black_oil_densities() {
    let usage = PhaseUsage::three_phase();
    let pvt = LinearPvt::default();
    let cell = CellState::evaluate(
        &usage,
        &pvt,
        &TableRelPerm::default(),
        &CellConditions {
            pressure: 200.0e5,
            water_saturation: 0.2,
            gas_saturation: 0.2,
            ..Default::default()
        },
    )
    .unwrap();

    let oil = usage.position(Phase::Oil).unwrap();
    let rho_o = pvt.surface_density(0, Phase::Oil).unwrap();
    let rho_g = pvt.surface_density(0, Phase::Gas).unwrap();
    let expected = cell.inv_b[oil].value() * (rho_o + cell.rs.value() * rho_g);
    assert!((cell.density[oil].value() - expected).abs() < 1e-9);
    // Saturated rs follows pressure.
    assert!(cell.rs.derivative(0) > 0.0);
}

#[test]
fn undersaturated_ratios_are_constant() {
    let usage = PhaseUsage::oil_gas();
    let cell = CellState::evaluate(
        &usage,
        &LinearPvt::default(),
        &TableRelPerm::default(),
        &CellConditions {
            gas_saturation: 0.1,
            rs: Some(40.0),
            rv: Some(0.0),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(cell.rs.value(), 40.0);
    assert_eq!(cell.rs.derivative(0), 0.0);
}

#[test]
fn saturated_oil_matches_explicit_rs() {
    let pvt = LinearPvt::default();
    let p = EvalWell::constant(150.0e5);
    let rs = pvt.rs_max(0, 350.0, &p).unwrap();
    let a = pvt.oil_saturated(0, 350.0, &p).unwrap();
    let b = pvt.oil(0, 350.0, &p, &rs).unwrap();
    assert_eq!(a, b);
}

#[test]
fn unknown_saturation_region() {
    let relperm = TableRelPerm::default();
    let sat = [EvalCell::constant(0.5); 3];
    assert!(
        relperm
            .relative_permeabilities(7, &sat, &PhaseUsage::three_phase())
            .is_err()
    );
}

proptest! {
    #[test]
    fn corey_tables_are_monotone(
        residual in 0.0..0.5f64,
        exponent in 1.0..4.0f64,
        s1 in 0.0..1.0f64,
        s2 in 0.0..1.0f64,
    ) {
        let table = RelPermTable::corey(residual, 1.0, exponent, 21).unwrap();
        let (lo, hi) = if s1 <= s2 { (s1, s2) } else { (s2, s1) };
        let k_lo = table.evaluate(&EvalCell::constant(lo)).value();
        let k_hi = table.evaluate(&EvalCell::constant(hi)).value();
        prop_assert!(k_lo <= k_hi + 1e-15);
        prop_assert!((0.0..=1.0).contains(&k_lo));
        prop_assert!((0.0..=1.0).contains(&k_hi));
    }
}
