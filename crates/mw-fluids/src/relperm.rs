//! Relative permeability service contract and a tabulated implementation.

use mw_core::EvalCell;
use serde::{Deserialize, Serialize};

use crate::error::{FluidError, FluidResult};
use crate::phases::{MAX_PHASES, Phase, PhaseUsage};

/// Relative permeability evaluation for one saturation region.
///
/// `saturation` and the result are indexed by compact phase position.
pub trait RelPermService: Send + Sync {
    fn num_regions(&self) -> usize;

    fn relative_permeabilities(
        &self,
        sat_region: usize,
        saturation: &[EvalCell; MAX_PHASES],
        usage: &PhaseUsage,
    ) -> FluidResult<[EvalCell; MAX_PHASES]>;
}

/// Piecewise-linear `kr(S)` curve of one phase.
///
/// Outside the tabulated saturation range the end values are held constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelPermTable {
    saturation: Vec<f64>,
    kr: Vec<f64>,
}

impl RelPermTable {
    pub fn new(saturation: Vec<f64>, kr: Vec<f64>) -> FluidResult<Self> {
        if saturation.len() != kr.len() || saturation.len() < 2 {
            return Err(FluidError::OutOfRange {
                what: "relperm table needs at least two points",
            });
        }
        if saturation.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FluidError::NonPhysical {
                what: "relperm saturations must be strictly increasing",
            });
        }
        if kr.iter().any(|k| !(0.0..=1.0).contains(k)) {
            return Err(FluidError::NonPhysical {
                what: "relperm values must lie in [0, 1]",
            });
        }
        Ok(Self { saturation, kr })
    }

    /// Straight line from (0, 0) to (1, 1).
    pub fn linear() -> Self {
        Self {
            saturation: vec![0.0, 1.0],
            kr: vec![0.0, 1.0],
        }
    }

    /// Corey curve `endpoint · ((S − S_r)/(1 − S_r))^exponent` sampled at
    /// `samples` points above the residual saturation.
    pub fn corey(residual: f64, endpoint: f64, exponent: f64, samples: usize) -> FluidResult<Self> {
        if !(0.0..1.0).contains(&residual) {
            return Err(FluidError::NonPhysical {
                what: "residual saturation must lie in [0, 1)",
            });
        }
        let samples = samples.max(2);
        let mut saturation = Vec::with_capacity(samples + 1);
        let mut kr = Vec::with_capacity(samples + 1);
        if residual > 0.0 {
            saturation.push(0.0);
            kr.push(0.0);
        }
        for i in 0..samples {
            let x = i as f64 / (samples - 1) as f64;
            saturation.push(residual + (1.0 - residual) * x);
            kr.push(endpoint * x.powf(exponent));
        }
        Self::new(saturation, kr)
    }

    pub fn evaluate(&self, s: &EvalCell) -> EvalCell {
        let sv = s.value();
        let last = self.saturation.len() - 1;
        if sv <= self.saturation[0] {
            return EvalCell::constant(self.kr[0]);
        }
        if sv >= self.saturation[last] {
            return EvalCell::constant(self.kr[last]);
        }
        // First point strictly above sv; guaranteed in 1..=last here.
        let hi = self.saturation.partition_point(|&x| x <= sv);
        let lo = hi - 1;
        let slope = (self.kr[hi] - self.kr[lo]) / (self.saturation[hi] - self.saturation[lo]);
        (*s - self.saturation[lo]) * slope + self.kr[lo]
    }
}

/// Curves of one saturation region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationRegion {
    pub water: RelPermTable,
    pub oil: RelPermTable,
    pub gas: RelPermTable,
}

impl Default for SaturationRegion {
    fn default() -> Self {
        // Quadratic curves without residual saturation.
        let quadratic = RelPermTable {
            saturation: (0..=10).map(|i| f64::from(i) / 10.0).collect(),
            kr: (0..=10).map(|i| (f64::from(i) / 10.0).powi(2)).collect(),
        };
        Self {
            water: quadratic.clone(),
            oil: quadratic.clone(),
            gas: quadratic,
        }
    }
}

impl SaturationRegion {
    fn table(&self, phase: Phase) -> &RelPermTable {
        match phase {
            Phase::Water => &self.water,
            Phase::Oil => &self.oil,
            Phase::Gas => &self.gas,
        }
    }
}

/// Tabulated relative permeability with one entry per saturation region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRelPerm {
    regions: Vec<SaturationRegion>,
}

impl Default for TableRelPerm {
    fn default() -> Self {
        Self {
            regions: vec![SaturationRegion::default()],
        }
    }
}

impl TableRelPerm {
    pub fn new(regions: Vec<SaturationRegion>) -> FluidResult<Self> {
        if regions.is_empty() {
            return Err(FluidError::UnknownRegion {
                region: 0,
                count: 0,
            });
        }
        Ok(Self { regions })
    }
}

impl RelPermService for TableRelPerm {
    fn num_regions(&self) -> usize {
        self.regions.len()
    }

    fn relative_permeabilities(
        &self,
        sat_region: usize,
        saturation: &[EvalCell; MAX_PHASES],
        usage: &PhaseUsage,
    ) -> FluidResult<[EvalCell; MAX_PHASES]> {
        let region = self
            .regions
            .get(sat_region)
            .ok_or(FluidError::UnknownRegion {
                region: sat_region,
                count: self.regions.len(),
            })?;
        let mut kr = [EvalCell::constant(0.0); MAX_PHASES];
        for (pos, phase) in usage.active_phases().enumerate() {
            kr[pos] = region.table(phase).evaluate(&saturation[pos]);
        }
        Ok(kr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_and_slope() {
        let table = RelPermTable::new(vec![0.2, 0.6, 1.0], vec![0.0, 0.4, 1.0]).unwrap();
        let s = EvalCell::variable(0.4, 1);
        let kr = table.evaluate(&s);
        assert!((kr.value() - 0.2).abs() < 1e-12);
        assert!((kr.derivative(1) - 1.0).abs() < 1e-12);

        let kr = table.evaluate(&EvalCell::variable(0.8, 1));
        assert!((kr.value() - 0.7).abs() < 1e-12);
        assert!((kr.derivative(1) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn clamped_outside_range() {
        let table = RelPermTable::new(vec![0.2, 1.0], vec![0.0, 0.8]).unwrap();
        let kr = table.evaluate(&EvalCell::variable(0.1, 0));
        assert_eq!(kr.value(), 0.0);
        assert_eq!(kr.derivative(0), 0.0);
        assert_eq!(table.evaluate(&EvalCell::constant(1.5)).value(), 0.8);
    }

    #[test]
    fn invalid_tables_rejected() {
        assert!(RelPermTable::new(vec![0.0], vec![0.0]).is_err());
        assert!(RelPermTable::new(vec![0.5, 0.5], vec![0.0, 1.0]).is_err());
        assert!(RelPermTable::new(vec![0.0, 1.0], vec![0.0, 1.5]).is_err());
    }

    #[test]
    fn corey_endpoints() {
        let table = RelPermTable::corey(0.2, 0.9, 2.0, 9).unwrap();
        assert_eq!(table.evaluate(&EvalCell::constant(0.1)).value(), 0.0);
        assert!((table.evaluate(&EvalCell::constant(1.0)).value() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn inactive_phases_stay_zero() {
        let relperm = TableRelPerm::default();
        let usage = PhaseUsage::oil_water();
        let sat = [
            EvalCell::constant(0.3),
            EvalCell::constant(0.7),
            EvalCell::constant(0.5),
        ];
        let kr = relperm.relative_permeabilities(0, &sat, &usage).unwrap();
        assert!((kr[0].value() - 0.09).abs() < 1e-12);
        assert!((kr[1].value() - 0.49).abs() < 1e-12);
        assert_eq!(kr[2].value(), 0.0);
    }
}
