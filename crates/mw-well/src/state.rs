//! Well state persisted by the caller between nonlinear iterations.

use mw_topology::SegmentTopology;
use serde::{Deserialize, Serialize};

use crate::error::{WellError, WellResult};

/// Rates and pressures of one well.
///
/// Phase-indexed vectors use compact phase positions; per-segment and
/// per-perforation rates are stored flat as `index * num_phases + phase`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellState {
    pub num_phases: usize,
    pub bhp: f64,
    pub thp: f64,
    pub well_rates: Vec<f64>,
    pub segment_rates: Vec<f64>,
    pub segment_pressures: Vec<f64>,
    pub perforation_rates: Vec<f64>,
}

impl WellState {
    /// Zero rates with every segment at `bhp`.
    pub fn new(topology: &SegmentTopology, num_phases: usize, bhp: f64) -> Self {
        let nseg = topology.number_of_segments();
        let nperf = topology.number_of_perforations();
        Self {
            num_phases,
            bhp,
            thp: 0.0,
            well_rates: vec![0.0; num_phases],
            segment_rates: vec![0.0; nseg * num_phases],
            segment_pressures: vec![bhp; nseg],
            perforation_rates: vec![0.0; nperf * num_phases],
        }
    }

    pub fn num_segments(&self) -> usize {
        self.segment_pressures.len()
    }

    pub fn segment_rate(&self, seg: usize, phase: usize) -> f64 {
        self.segment_rates[seg * self.num_phases + phase]
    }

    pub fn segment_rate_mut(&mut self, seg: usize, phase: usize) -> &mut f64 {
        &mut self.segment_rates[seg * self.num_phases + phase]
    }

    /// Check that every vector matches the well dimensions.
    pub fn check_dimensions(&self, topology: &SegmentTopology, num_phases: usize) -> WellResult<()> {
        let nseg = topology.number_of_segments();
        let nperf = topology.number_of_perforations();
        let checks = [
            ("num_phases", self.num_phases, num_phases),
            ("well_rates", self.well_rates.len(), num_phases),
            ("segment_rates", self.segment_rates.len(), nseg * num_phases),
            ("segment_pressures", self.segment_pressures.len(), nseg),
            ("perforation_rates", self.perforation_rates.len(), nperf * num_phases),
        ];
        for (what, len, expected) in checks {
            if len != expected {
                return Err(WellError::InvalidState {
                    what: format!("well state {what} has size {len}, expected {expected}"),
                });
            }
        }
        Ok(())
    }

    /// Spread the well rates evenly over the perforations and rebuild the
    /// segment rates from them.
    pub fn init_segment_rates_with_well_rates(&mut self, topology: &SegmentTopology) {
        let np = self.num_phases;
        let nperf = topology.number_of_perforations();
        if nperf > 0 {
            for perf in 0..nperf {
                for phase in 0..np {
                    self.perforation_rates[perf * np + phase] =
                        self.well_rates[phase] / nperf as f64;
                }
            }
        }
        self.segment_rates = calculate_segment_rates(topology, &self.perforation_rates, np);
    }
}

/// Segment rates from perforation rates: a segment carries its own
/// perforations plus everything entering through its inlets.
pub fn calculate_segment_rates(
    topology: &SegmentTopology,
    perforation_rates: &[f64],
    num_phases: usize,
) -> Vec<f64> {
    let mut rates = vec![0.0; topology.number_of_segments() * num_phases];
    for &seg in topology.upstream_order() {
        for &perf in topology.segment_perforations(seg) {
            for phase in 0..num_phases {
                rates[seg * num_phases + phase] += perforation_rates[perf * num_phases + phase];
            }
        }
        for &inlet in topology.inlets(seg) {
            for phase in 0..num_phases {
                rates[seg * num_phases + phase] += rates[inlet * num_phases + phase];
            }
        }
    }
    rates
}
