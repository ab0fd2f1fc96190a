//! Analytic black-oil PVT with linear compressibility.
//!
//! Each phase has `1/B(p) = 1/B_ref · (1 + c·(p − p_ref))` and a constant
//! viscosity. Dissolved gas swells the oil and vaporized oil enriches the
//! gas: `1/B_o(p, rs) = 1/B_o(p) / (1 + swelling·rs)` and
//! `1/B_g(p, rv) = 1/B_g(p) / (1 + richness·rv)`. Saturated ratios grow
//! linearly with pressure.

use mw_core::EvalWell;
use serde::{Deserialize, Serialize};

use crate::error::{FluidError, FluidResult};
use crate::phases::Phase;
use crate::pvt::{PhaseProperties, PvtService};

/// Properties of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearPhase {
    /// 1/B at the reference pressure.
    pub inv_b_ref: f64,
    /// Relative change of 1/B per Pa.
    pub compressibility: f64,
    /// Viscosity [Pa·s].
    pub viscosity: f64,
    /// Surface density [kg/m³].
    pub surface_density: f64,
}

impl LinearPhase {
    fn inv_b(&self, reference_pressure: f64, pressure: &EvalWell) -> EvalWell {
        (1.0 + (*pressure - reference_pressure) * self.compressibility) * self.inv_b_ref
    }

    fn validate(&self, what: &'static str) -> FluidResult<()> {
        let ok = self.inv_b_ref.is_finite()
            && self.inv_b_ref > 0.0
            && self.viscosity.is_finite()
            && self.viscosity > 0.0
            && self.surface_density.is_finite()
            && self.surface_density > 0.0
            && self.compressibility.is_finite();
        if ok {
            Ok(())
        } else {
            Err(FluidError::NonPhysical { what })
        }
    }
}

/// One PVT region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearPvtRegion {
    /// Pressure at which `inv_b_ref` applies [Pa].
    pub reference_pressure: f64,
    pub water: LinearPhase,
    pub oil: LinearPhase,
    pub gas: LinearPhase,
    /// Saturated rs per Pa.
    pub rs_per_pa: f64,
    /// Saturated rv per Pa.
    pub rv_per_pa: f64,
    pub oil_swelling: f64,
    pub gas_richness: f64,
}

impl Default for LinearPvtRegion {
    fn default() -> Self {
        Self {
            reference_pressure: 200.0e5,
            water: LinearPhase {
                inv_b_ref: 1.0 / 1.01,
                compressibility: 4.5e-10,
                viscosity: 0.5e-3,
                surface_density: 1000.0,
            },
            oil: LinearPhase {
                inv_b_ref: 1.0 / 1.2,
                compressibility: 1.0e-9,
                viscosity: 1.0e-3,
                surface_density: 800.0,
            },
            gas: LinearPhase {
                inv_b_ref: 200.0,
                compressibility: 1.0 / 200.0e5,
                viscosity: 2.0e-5,
                surface_density: 0.9,
            },
            rs_per_pa: 5.0e-6,
            rv_per_pa: 5.0e-12,
            oil_swelling: 2.0e-3,
            gas_richness: 100.0,
        }
    }
}

impl LinearPvtRegion {
    pub fn validate(&self) -> FluidResult<()> {
        if !(self.reference_pressure.is_finite() && self.reference_pressure > 0.0) {
            return Err(FluidError::NonPhysical {
                what: "reference pressure must be positive",
            });
        }
        self.water.validate("water PVT")?;
        self.oil.validate("oil PVT")?;
        self.gas.validate("gas PVT")?;
        if self.rs_per_pa < 0.0 || self.rv_per_pa < 0.0 {
            return Err(FluidError::NonPhysical {
                what: "saturated solution ratios must be non-negative",
            });
        }
        if self.oil_swelling < 0.0 || self.gas_richness < 0.0 {
            return Err(FluidError::NonPhysical {
                what: "swelling coefficients must be non-negative",
            });
        }
        Ok(())
    }

    fn phase(&self, phase: Phase) -> &LinearPhase {
        match phase {
            Phase::Water => &self.water,
            Phase::Oil => &self.oil,
            Phase::Gas => &self.gas,
        }
    }
}

/// Analytic PVT service with one or more regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPvt {
    regions: Vec<LinearPvtRegion>,
}

impl Default for LinearPvt {
    fn default() -> Self {
        Self {
            regions: vec![LinearPvtRegion::default()],
        }
    }
}

impl LinearPvt {
    pub fn new(regions: Vec<LinearPvtRegion>) -> FluidResult<Self> {
        if regions.is_empty() {
            return Err(FluidError::UnknownRegion {
                region: 0,
                count: 0,
            });
        }
        for region in &regions {
            region.validate()?;
        }
        Ok(Self { regions })
    }

    pub fn region(&self, region: usize) -> FluidResult<&LinearPvtRegion> {
        self.regions.get(region).ok_or(FluidError::UnknownRegion {
            region,
            count: self.regions.len(),
        })
    }
}

fn check_pressure(pressure: &EvalWell) -> FluidResult<()> {
    if pressure.value().is_finite() && pressure.value() > 0.0 {
        Ok(())
    } else {
        Err(FluidError::NonPhysical {
            what: "pressure must be positive and finite",
        })
    }
}

impl PvtService for LinearPvt {
    fn name(&self) -> &str {
        "linear"
    }

    fn num_regions(&self) -> usize {
        self.regions.len()
    }

    fn surface_density(&self, region: usize, phase: Phase) -> FluidResult<f64> {
        Ok(self.region(region)?.phase(phase).surface_density)
    }

    fn water(
        &self,
        region: usize,
        _temperature: f64,
        pressure: &EvalWell,
    ) -> FluidResult<PhaseProperties> {
        check_pressure(pressure)?;
        let r = self.region(region)?;
        Ok(PhaseProperties {
            inv_b: r.water.inv_b(r.reference_pressure, pressure),
            viscosity: EvalWell::constant(r.water.viscosity),
        })
    }

    fn oil(
        &self,
        region: usize,
        _temperature: f64,
        pressure: &EvalWell,
        rs: &EvalWell,
    ) -> FluidResult<PhaseProperties> {
        check_pressure(pressure)?;
        if rs.value() < 0.0 {
            return Err(FluidError::NonPhysical {
                what: "rs must be non-negative",
            });
        }
        let r = self.region(region)?;
        let inv_b = r.oil.inv_b(r.reference_pressure, pressure) / (1.0 + *rs * r.oil_swelling);
        Ok(PhaseProperties {
            inv_b,
            viscosity: EvalWell::constant(r.oil.viscosity),
        })
    }

    fn gas(
        &self,
        region: usize,
        _temperature: f64,
        pressure: &EvalWell,
        rv: &EvalWell,
    ) -> FluidResult<PhaseProperties> {
        check_pressure(pressure)?;
        if rv.value() < 0.0 {
            return Err(FluidError::NonPhysical {
                what: "rv must be non-negative",
            });
        }
        let r = self.region(region)?;
        let inv_b = r.gas.inv_b(r.reference_pressure, pressure) / (1.0 + *rv * r.gas_richness);
        Ok(PhaseProperties {
            inv_b,
            viscosity: EvalWell::constant(r.gas.viscosity),
        })
    }

    fn rs_max(
        &self,
        region: usize,
        _temperature: f64,
        pressure: &EvalWell,
    ) -> FluidResult<EvalWell> {
        let r = self.region(region)?;
        Ok(*pressure * r.rs_per_pa)
    }

    fn rv_max(
        &self,
        region: usize,
        _temperature: f64,
        pressure: &EvalWell,
    ) -> FluidResult<EvalWell> {
        let r = self.region(region)?;
        Ok(*pressure * r.rv_per_pa)
    }
}
