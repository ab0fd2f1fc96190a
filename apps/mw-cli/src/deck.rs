//! YAML well deck: reservoir cells, fluid tables and well definitions.

use std::path::Path;

use mw_core::units::{m, m2, m3};
use mw_fluids::{
    CellConditions, CellState, FluidError, LinearPvt, LinearPvtRegion, PhaseUsage,
    RelPermService,
};
use mw_topology::{
    PressureDropModel, SegmentGeometry, SegmentTopology, TopologyBuilder, TopologyError,
};
use mw_well::{MultisegmentWell, WellError, WellModelParameters, WellSettings, WellState};
use serde::{Deserialize, Serialize};

pub type DeckResult<T> = Result<T, DeckError>;

#[derive(thiserror::Error, Debug)]
pub enum DeckError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Topology error in well {well}: {source}")]
    Topology { well: String, source: TopologyError },

    #[error("Fluid error: {0}")]
    Fluid(#[from] FluidError),

    #[error("Well error: {0}")]
    Well(#[from] WellError),

    #[error("Invalid deck: {what}")]
    Invalid { what: String },
}

fn default_max_iterations() -> usize {
    20
}

fn default_diameter() -> f64 {
    0.1
}

fn default_roughness() -> f64 {
    1.0e-5
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PhaseSpec {
    #[serde(default)]
    pub water: bool,
    #[serde(default)]
    pub gas: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    pub phases: PhaseSpec,
    #[serde(default)]
    pub parameters: WellModelParameters,
    pub timestep_days: f64,
    /// Well-only Newton iterations of `run`.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Empty uses the built-in fluid.
    #[serde(default)]
    pub pvt_regions: Vec<LinearPvtRegion>,
    pub cells: Vec<CellConditions>,
    pub wells: Vec<WellDeck>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellDeck {
    #[serde(flatten)]
    pub settings: WellSettings,
    pub initial_bhp: f64,
    /// Surface rates per active phase, negative for production.
    #[serde(default)]
    pub initial_rates: Vec<f64>,
    pub segments: Vec<SegmentDeck>,
    pub perforations: Vec<PerforationDeck>,
}

/// Circular tubing section ending at the segment node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDeck {
    pub number: u32,
    #[serde(default)]
    pub outlet: Option<u32>,
    pub depth: f64,
    pub total_length: f64,
    pub section_length: f64,
    #[serde(default = "default_diameter")]
    pub diameter: f64,
    #[serde(default = "default_roughness")]
    pub roughness: f64,
    #[serde(default)]
    pub pressure_drop: PressureDropModel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerforationDeck {
    pub segment: u32,
    pub cell: usize,
    pub well_index: f64,
    pub depth: f64,
    #[serde(default)]
    pub sat_region: Option<usize>,
}

pub fn load_deck(path: &Path) -> DeckResult<Deck> {
    let content = std::fs::read_to_string(path)?;
    Deck::from_yaml(&content)
}

impl Deck {
    pub fn from_yaml(content: &str) -> DeckResult<Self> {
        let deck: Deck = serde_yaml::from_str(content)?;
        deck.validate()?;
        Ok(deck)
    }

    fn validate(&self) -> DeckResult<()> {
        if !(self.timestep_days.is_finite() && self.timestep_days > 0.0) {
            return Err(DeckError::Invalid {
                what: format!("timestep must be positive, got {} days", self.timestep_days),
            });
        }
        if self.max_iterations == 0 {
            return Err(DeckError::Invalid {
                what: "max_iterations must be at least 1".to_string(),
            });
        }
        if self.cells.is_empty() {
            return Err(DeckError::Invalid {
                what: "deck has no cells".to_string(),
            });
        }
        if self.wells.is_empty() {
            return Err(DeckError::Invalid {
                what: "deck has no wells".to_string(),
            });
        }
        Ok(())
    }

    pub fn usage(&self) -> PhaseUsage {
        PhaseUsage::new(self.phases.water, self.phases.gas)
    }

    pub fn pvt(&self) -> DeckResult<LinearPvt> {
        if self.pvt_regions.is_empty() {
            Ok(LinearPvt::default())
        } else {
            Ok(LinearPvt::new(self.pvt_regions.clone())?)
        }
    }

    pub fn evaluate_cells(
        &self,
        pvt: &LinearPvt,
        relperm: &dyn RelPermService,
    ) -> DeckResult<Vec<CellState>> {
        let usage = self.usage();
        self.cells
            .iter()
            .map(|c| Ok(CellState::evaluate(&usage, pvt, relperm, c)?))
            .collect()
    }

    /// Wells with their initial state, allocated against the deck's cells.
    pub fn build_wells(&self) -> DeckResult<Vec<(MultisegmentWell, WellState)>> {
        let usage = self.usage();
        self.wells
            .iter()
            .map(|w| {
                let mut well = MultisegmentWell::new(
                    w.settings.clone(),
                    w.topology()?,
                    usage,
                    self.parameters.clone(),
                )?;
                well.init(self.cells.len())?;
                let state = w.initial_state(&mut well, usage.num_phases())?;
                Ok((well, state))
            })
            .collect()
    }
}

impl WellDeck {
    pub fn topology(&self) -> DeckResult<SegmentTopology> {
        let mut builder = TopologyBuilder::new();
        for s in &self.segments {
            let area = std::f64::consts::PI * s.diameter * s.diameter / 4.0;
            let geometry = SegmentGeometry {
                depth: m(s.depth),
                total_length: m(s.total_length),
                volume: m3(area * s.section_length),
                internal_diameter: m(s.diameter),
                roughness: m(s.roughness),
                cross_area: m2(area),
                pressure_drop: s.pressure_drop,
            };
            builder.add_segment(s.number, s.outlet, geometry);
        }
        for p in &self.perforations {
            builder.add_perforation_with_region(
                p.segment,
                p.cell,
                p.well_index,
                m(p.depth),
                p.sat_region,
            );
        }
        builder.build().map_err(|source| DeckError::Topology {
            well: self.settings.name.clone(),
            source,
        })
    }

    fn initial_state(&self, well: &mut MultisegmentWell, num_phases: usize) -> DeckResult<WellState> {
        let mut state = WellState::new(well.topology(), num_phases, self.initial_bhp);
        if !self.initial_rates.is_empty() {
            if self.initial_rates.len() != num_phases {
                return Err(DeckError::Invalid {
                    what: format!(
                        "well {} has {} initial rates for {num_phases} phases",
                        self.settings.name,
                        self.initial_rates.len()
                    ),
                });
            }
            state.well_rates = self.initial_rates.clone();
            well.init_segment_rates_with_well_rates(&mut state)?;
        }
        well.update_well_state_with_target(&mut state)?;
        Ok(state)
    }
}
