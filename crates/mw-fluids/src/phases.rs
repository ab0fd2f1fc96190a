//! Phases and the compact active-phase layout.

use serde::{Deserialize, Serialize};

/// Maximum number of fluid phases (water, oil, gas).
pub const MAX_PHASES: usize = 3;

/// Black-oil fluid phase. Each phase is also one conserved component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Water,
    Oil,
    Gas,
}

impl Phase {
    pub const ALL: [Phase; MAX_PHASES] = [Phase::Water, Phase::Oil, Phase::Gas];

    /// Canonical index (water 0, oil 1, gas 2), independent of which phases are active.
    pub fn index(self) -> usize {
        match self {
            Phase::Water => 0,
            Phase::Oil => 1,
            Phase::Gas => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Water => "Water",
            Phase::Oil => "Oil",
            Phase::Gas => "Gas",
        }
    }
}

/// Which phases are active.
///
/// Oil is always active. Active phases are packed into compact positions in
/// the order water, oil, gas; the same positions index component equations,
/// per-phase arrays of [`crate::CellState`] and well rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseUsage {
    pub water: bool,
    pub gas: bool,
}

impl Default for PhaseUsage {
    fn default() -> Self {
        Self::three_phase()
    }
}

impl PhaseUsage {
    pub fn new(water: bool, gas: bool) -> Self {
        Self { water, gas }
    }

    pub fn three_phase() -> Self {
        Self::new(true, true)
    }

    pub fn oil_water() -> Self {
        Self::new(true, false)
    }

    pub fn oil_gas() -> Self {
        Self::new(false, true)
    }

    pub fn dead_oil() -> Self {
        Self::new(false, false)
    }

    pub fn is_active(&self, phase: Phase) -> bool {
        match phase {
            Phase::Water => self.water,
            Phase::Oil => true,
            Phase::Gas => self.gas,
        }
    }

    pub fn num_phases(&self) -> usize {
        1 + usize::from(self.water) + usize::from(self.gas)
    }

    /// Compact position of an active phase.
    pub fn position(&self, phase: Phase) -> Option<usize> {
        if !self.is_active(phase) {
            return None;
        }
        Some(match phase {
            Phase::Water => 0,
            Phase::Oil => usize::from(self.water),
            Phase::Gas => usize::from(self.water) + 1,
        })
    }

    pub fn oil_position(&self) -> usize {
        usize::from(self.water)
    }

    /// Phase stored at a compact position (panics if out of range).
    pub fn phase_at(&self, position: usize) -> Phase {
        self.active_phases()
            .nth(position)
            .unwrap_or_else(|| panic!("phase position {position} out of range"))
    }

    /// Active phases in compact order.
    pub fn active_phases(&self) -> impl Iterator<Item = Phase> + '_ {
        Phase::ALL.into_iter().filter(|p| self.is_active(*p))
    }

    /// Both oil and gas present, so rs/rv couple the two phases.
    pub fn oil_gas_coupled(&self) -> bool {
        self.gas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_positions() {
        let pu = PhaseUsage::three_phase();
        assert_eq!(pu.num_phases(), 3);
        assert_eq!(pu.position(Phase::Water), Some(0));
        assert_eq!(pu.position(Phase::Oil), Some(1));
        assert_eq!(pu.position(Phase::Gas), Some(2));

        let pu = PhaseUsage::oil_gas();
        assert_eq!(pu.num_phases(), 2);
        assert_eq!(pu.position(Phase::Water), None);
        assert_eq!(pu.position(Phase::Oil), Some(0));
        assert_eq!(pu.position(Phase::Gas), Some(1));
        assert_eq!(pu.phase_at(1), Phase::Gas);
    }

    #[test]
    fn gas_always_comes_with_oil() {
        for pu in [
            PhaseUsage::three_phase(),
            PhaseUsage::oil_gas(),
            PhaseUsage::new(false, true),
        ] {
            assert!(pu.oil_gas_coupled());
            assert_eq!(pu.position(Phase::Oil), Some(pu.oil_position()));
            assert_eq!(pu.phase_at(pu.oil_position()), Phase::Oil);
        }
    }

    #[test]
    fn dead_oil_has_one_phase() {
        let pu = PhaseUsage::dead_oil();
        assert_eq!(pu.num_phases(), 1);
        assert_eq!(pu.oil_position(), 0);
        assert_eq!(pu.active_phases().collect::<Vec<_>>(), vec![Phase::Oil]);
    }
}
