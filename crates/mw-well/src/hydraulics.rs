//! Pressure-drop correlations of a wellbore segment.
//!
//! All inputs are SI: lengths in m, areas in m², mass rates in kg/s,
//! densities in kg/m³, viscosities in Pa·s. Results are in Pa.

use mw_core::EvalWell;

/// Reynolds number below which flow is laminar.
const RE_LAMINAR: f64 = 200.0;
/// Reynolds number above which flow is turbulent.
const RE_TURBULENT: f64 = 4000.0;

/// Haaland explicit approximation of the Colebrook friction factor.
fn haaland(re: EvalWell, diameter: f64, roughness: f64) -> EvalWell {
    let relative_roughness = (roughness / (3.7 * diameter)).powf(10.0 / 9.0);
    let value = (6.9 / re + relative_roughness).log10() * -3.6;
    1.0 / (value * value)
}

/// Fanning friction factor.
///
/// Laminar `16/Re` below Re 200, Haaland above Re 4000, and a linear blend in
/// between. Zero for a fluid at rest.
pub fn friction_factor(
    area: f64,
    diameter: f64,
    mass_rate: &EvalWell,
    roughness: f64,
    viscosity: &EvalWell,
) -> EvalWell {
    let re = (*mass_rate * diameter / (*viscosity * area)).abs();
    let re_value = re.value();

    if re_value == 0.0 {
        EvalWell::constant(0.0)
    } else if re_value < RE_LAMINAR {
        16.0 / re
    } else if re_value > RE_TURBULENT {
        haaland(re, diameter, roughness)
    } else {
        let f1 = 16.0 / RE_LAMINAR;
        let f2 = haaland(EvalWell::constant(RE_TURBULENT), diameter, roughness).value();
        (re - RE_LAMINAR) * ((f2 - f1) / (RE_TURBULENT - RE_LAMINAR)) + f1
    }
}

/// Magnitude of the frictional pressure loss over `length`.
pub fn friction_pressure_loss(
    length: f64,
    diameter: f64,
    area: f64,
    roughness: f64,
    density: &EvalWell,
    mass_rate: &EvalWell,
    viscosity: &EvalWell,
) -> EvalWell {
    let f = friction_factor(area, diameter, mass_rate, roughness, viscosity);
    f * *mass_rate * *mass_rate * (2.0 * length) / (*density * (area * area * diameter))
}

/// Signed frictional term of a segment pressure equation.
///
/// The loss opposes the flow: it is subtracted for non-negative mass rates
/// (flow towards the wellhead in producer convention) and added otherwise.
pub fn signed_friction_loss(
    length: f64,
    diameter: f64,
    area: f64,
    roughness: f64,
    density: &EvalWell,
    mass_rate: &EvalWell,
    viscosity: &EvalWell,
) -> EvalWell {
    let sign = if mass_rate.value() < 0.0 { 1.0 } else { -1.0 };
    friction_pressure_loss(length, diameter, area, roughness, density, mass_rate, viscosity) * sign
}

/// Kinetic pressure `w² / (2 A² ρ)`.
pub fn velocity_head(area: f64, mass_rate: &EvalWell, density: &EvalWell) -> EvalWell {
    *mass_rate * *mass_rate * 0.5 / (*density * (area * area))
}

/// Hydrostatic head `ρ g Δz`.
pub fn hydrostatic_loss(density: &EvalWell, gravity: f64, depth_diff: f64) -> EvalWell {
    *density * (gravity * depth_diff)
}
