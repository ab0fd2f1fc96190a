//! PVT service contract.

use mw_core::EvalWell;

use crate::error::FluidResult;
use crate::phases::Phase;

/// Inverse formation volume factor and viscosity of one phase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseProperties {
    /// Surface volume per reservoir volume (1/B).
    pub inv_b: EvalWell,
    /// Dynamic viscosity [Pa·s].
    pub viscosity: EvalWell,
}

/// Black-oil PVT evaluation.
///
/// Implementations must be deterministic and side-effect free; they are
/// called concurrently from parallel well assembly. Pressures are in Pa,
/// temperatures in K, solution ratios in surface volume per surface volume.
///
/// Every method propagates the derivatives of its `EvalWell` inputs.
pub trait PvtService: Send + Sync {
    /// Get the service name (for debugging/logging).
    fn name(&self) -> &str;

    /// Number of PVT regions.
    fn num_regions(&self) -> usize;

    /// Density of a phase at surface conditions [kg/m³].
    fn surface_density(&self, region: usize, phase: Phase) -> FluidResult<f64>;

    fn water(
        &self,
        region: usize,
        temperature: f64,
        pressure: &EvalWell,
    ) -> FluidResult<PhaseProperties>;

    /// Undersaturated oil with dissolved gas ratio `rs`.
    fn oil(
        &self,
        region: usize,
        temperature: f64,
        pressure: &EvalWell,
        rs: &EvalWell,
    ) -> FluidResult<PhaseProperties>;

    /// Oil saturated with gas at `pressure`.
    fn oil_saturated(
        &self,
        region: usize,
        temperature: f64,
        pressure: &EvalWell,
    ) -> FluidResult<PhaseProperties> {
        let rs = self.rs_max(region, temperature, pressure)?;
        self.oil(region, temperature, pressure, &rs)
    }

    /// Undersaturated gas with vaporized oil ratio `rv`.
    fn gas(
        &self,
        region: usize,
        temperature: f64,
        pressure: &EvalWell,
        rv: &EvalWell,
    ) -> FluidResult<PhaseProperties>;

    /// Gas saturated with oil at `pressure`.
    fn gas_saturated(
        &self,
        region: usize,
        temperature: f64,
        pressure: &EvalWell,
    ) -> FluidResult<PhaseProperties> {
        let rv = self.rv_max(region, temperature, pressure)?;
        self.gas(region, temperature, pressure, &rv)
    }

    /// Saturated dissolved gas-oil ratio.
    fn rs_max(&self, region: usize, temperature: f64, pressure: &EvalWell)
    -> FluidResult<EvalWell>;

    /// Saturated vaporized oil-gas ratio.
    fn rv_max(&self, region: usize, temperature: f64, pressure: &EvalWell)
    -> FluidResult<EvalWell>;
}
