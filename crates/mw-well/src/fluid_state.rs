//! Per-iteration fluid properties of every segment.
//!
//! Recomputed from the primary variables each time the well equations are
//! assembled; nothing here outlives one assembly.

use mw_core::{EvalWell, SegmentLocation};
use mw_fluids::{MAX_PHASES, Phase, PvtService};
use tracing::trace;

use crate::control::ComponentScaling;
use crate::error::{WellError, WellResult};
use crate::primary::SegmentEval;

/// PVT region and temperature used for the wellbore fluid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WellboreFluid {
    pub pvt_region: usize,
    pub temperature: f64,
}

/// Derived quantities of one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentFluid {
    /// Surface-condition composition by compact phase position.
    pub surface_fractions: [EvalWell; MAX_PHASES],
    /// Mixture density at segment conditions [kg/m³].
    pub density: EvalWell,
    /// Mixture viscosity [Pa·s].
    pub viscosity: EvalWell,
    /// Mass flow rate [kg/s], same sign convention as `GTotal`.
    pub mass_rate: EvalWell,
}

/// Fluid properties of all segments, indexed by location.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentFluidState {
    segments: Vec<SegmentFluid>,
}

impl SegmentFluidState {
    pub fn compute(
        evals: &[SegmentEval],
        scaling: &ComponentScaling,
        pvt: &dyn PvtService,
        fluid: WellboreFluid,
    ) -> WellResult<Self> {
        let usage = *scaling.usage();
        let nc = usage.num_phases();
        let region = fluid.pvt_region;
        let temperature = fluid.temperature;

        let mut surface_density = [0.0; MAX_PHASES];
        for (pos, phase) in usage.active_phases().enumerate() {
            surface_density[pos] = pvt.surface_density(region, phase)?;
        }
        let water = usage.position(Phase::Water);
        let gas = usage.position(Phase::Gas);
        let oil = usage.oil_position();

        let mut segments = Vec::with_capacity(evals.len());
        for (seg, eval) in evals.iter().enumerate() {
            let mix_s = eval.surface_volume_fractions(scaling)?;
            let pressure = eval.pressure;

            let mut b = [EvalWell::constant(0.0); MAX_PHASES];
            let mut visc = [EvalWell::constant(0.0); MAX_PHASES];

            if let Some(w) = water {
                let props = pvt.water(region, temperature, &pressure)?;
                b[w] = props.inv_b;
                visc[w] = props.viscosity;
            }

            let mut rv = EvalWell::constant(0.0);
            let mut rs = EvalWell::constant(0.0);
            if let Some(g) = gas {
                // Vaporized oil: limited by the saturated ratio.
                let props = if mix_s[oil].value() > 0.0 {
                    if mix_s[g].value() > 0.0 {
                        rv = mix_s[oil] / mix_s[g];
                    }
                    let rv_max = pvt.rv_max(region, temperature, &pressure)?;
                    if rv.value() > rv_max.value() {
                        rv = rv_max;
                    }
                    pvt.gas(region, temperature, &pressure, &rv)?
                } else {
                    pvt.gas_saturated(region, temperature, &pressure)?
                };
                b[g] = props.inv_b;
                visc[g] = props.viscosity;

                // Dissolved gas: same treatment on the oil side.
                let props = if mix_s[g].value() > 0.0 {
                    if mix_s[oil].value() > 0.0 {
                        rs = mix_s[g] / mix_s[oil];
                    }
                    let rs_max = pvt.rs_max(region, temperature, &pressure)?;
                    if rs.value() > rs_max.value() {
                        rs = rs_max;
                    }
                    pvt.oil(region, temperature, &pressure, &rs)?
                } else {
                    pvt.oil_saturated(region, temperature, &pressure)?
                };
                b[oil] = props.inv_b;
                visc[oil] = props.viscosity;
            } else {
                let props = pvt.oil(region, temperature, &pressure, &EvalWell::constant(0.0))?;
                b[oil] = props.inv_b;
                visc[oil] = props.viscosity;
            }

            // Split surface volumes into the free oil and free gas phases.
            let mut mix = mix_s;
            if let Some(g) = gas {
                if rs.value() != 0.0 || rv.value() != 0.0 {
                    let d = 1.0 - rs * rv;
                    if d.value() == 0.0 {
                        return Err(WellError::NumericalProblem {
                            what: format!(
                                "zero 1 - rs*rv in segment {seg} (rs {}, rv {})",
                                rs.value(),
                                rv.value()
                            ),
                        });
                    }
                    if rs.value() != 0.0 {
                        mix[g] = (mix_s[g] - mix_s[oil] * rs) / d;
                    }
                    if rv.value() != 0.0 {
                        mix[oil] = (mix_s[oil] - mix_s[g] * rv) / d;
                    }
                }
            }

            let mut volrat = EvalWell::constant(0.0);
            for comp in 0..nc {
                volrat += mix[comp] / b[comp];
            }
            if volrat.value() == 0.0 || !volrat.value().is_finite() {
                return Err(WellError::NumericalProblem {
                    what: format!("degenerate volume ratio in segment {seg}"),
                });
            }

            let mut viscosity = EvalWell::constant(0.0);
            let mut density = EvalWell::constant(0.0);
            let mut mass_rate = EvalWell::constant(0.0);
            for comp in 0..nc {
                viscosity += visc[comp] * (mix[comp] / b[comp] / volrat);
                density += mix_s[comp] * surface_density[comp];
                mass_rate += eval.segment_rate(scaling, comp) * surface_density[comp];
            }
            let density = density / volrat;

            trace!(
                segment = seg,
                density = density.value(),
                viscosity = viscosity.value(),
                mass_rate = mass_rate.value(),
                "segment fluid"
            );
            segments.push(SegmentFluid {
                surface_fractions: mix_s,
                density,
                viscosity,
                mass_rate,
            });
        }
        Ok(Self { segments })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, seg: SegmentLocation) -> &SegmentFluid {
        &self.segments[seg]
    }

    pub fn density(&self, seg: SegmentLocation) -> &EvalWell {
        &self.segments[seg].density
    }

    pub fn viscosity(&self, seg: SegmentLocation) -> &EvalWell {
        &self.segments[seg].viscosity
    }

    pub fn mass_rate(&self, seg: SegmentLocation) -> &EvalWell {
        &self.segments[seg].mass_rate
    }

    pub fn surface_fractions(&self, seg: SegmentLocation) -> &[EvalWell; MAX_PHASES] {
        &self.segments[seg].surface_fractions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::WellControl;
    use crate::primary::{SegmentVariables, WellLayout};
    use mw_fluids::{LinearPvt, PhaseUsage};

    fn state(usage: PhaseUsage, vars: SegmentVariables) -> SegmentFluidState {
        let layout = WellLayout::new(usage);
        let scaling = WellControl::Bhp { target: 1.0e7 }.scaling(&usage);
        let evals = vec![SegmentEval::seed(&layout, &vars)];
        SegmentFluidState::compute(
            &evals,
            &scaling,
            &LinearPvt::default(),
            WellboreFluid {
                pvt_region: 0,
                temperature: 350.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn single_phase_water_density() {
        let usage = PhaseUsage::oil_water();
        let s = state(
            usage,
            SegmentVariables {
                g_total: 1.0,
                wfrac: 1.0,
                gfrac: 0.0,
                pressure: 200.0e5,
            },
        );
        // Pure water at the reference pressure: rho = rho_s / B.
        assert!((s.density(0).value() - 1000.0 / 1.01).abs() < 1e-9);
        assert!((s.viscosity(0).value() - 0.5e-3).abs() < 1e-15);
        assert!((s.mass_rate(0).value() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn mixture_viscosity_is_bounded_by_phases() {
        let usage = PhaseUsage::oil_water();
        let s = state(
            usage,
            SegmentVariables {
                g_total: -3.0,
                wfrac: 0.4,
                gfrac: 0.0,
                pressure: 150.0e5,
            },
        );
        let mu = s.viscosity(0).value();
        assert!(mu > 0.5e-3 && mu < 1.0e-3);
        assert!(s.mass_rate(0).value() < 0.0);
        // Density responds to pressure.
        assert!(s.density(0).derivative(WellLayout::well_slot(2)) > 0.0);
    }

    #[test]
    fn gas_oil_mixture_is_finite() {
        let usage = PhaseUsage::three_phase();
        let s = state(
            usage,
            SegmentVariables {
                g_total: -1.0,
                wfrac: 0.1,
                gfrac: 0.5,
                pressure: 100.0e5,
            },
        );
        let rho = s.density(0).value();
        assert!(rho.is_finite() && rho > 0.0);
        let sum: f64 = s.surface_fractions(0).iter().map(|f| f.value()).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }
}
