//! Incremental topology builder.

use mw_core::units::Length;
use mw_core::{CellIndex, PerfIndex, SegmentNumber};

use crate::error::{TopologyError, TopologyResult};
use crate::indexing::SegmentIndex;
use crate::segment::{Perforation, Segment, SegmentGeometry};
use crate::topology::SegmentTopology;
use crate::validate;

#[derive(Debug, Clone)]
pub(crate) struct RawSegment {
    pub number: u32,
    pub outlet: Option<u32>,
    pub geometry: SegmentGeometry,
}

#[derive(Debug, Clone)]
pub(crate) struct RawPerforation {
    pub segment: u32,
    pub cell: CellIndex,
    pub well_index: f64,
    pub sat_region: Option<usize>,
    pub depth: Length,
}

/// Builder for constructing a segment topology incrementally.
///
/// Segments and perforations are recorded as given; nothing is checked until
/// `build()`, which validates the outlet graph and freezes it into an
/// immutable `SegmentTopology`.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    segments: Vec<RawSegment>,
    perforations: Vec<RawPerforation>,
}

impl TopologyBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment by deck number with its outlet segment number.
    ///
    /// The top segment (number 1) has no outlet.
    pub fn add_segment(
        &mut self,
        number: u32,
        outlet: Option<u32>,
        geometry: SegmentGeometry,
    ) -> &mut Self {
        self.segments.push(RawSegment {
            number,
            outlet,
            geometry,
        });
        self
    }

    /// Add a perforation into `cell` owned by segment `segment`.
    ///
    /// Returns the perforation index within the well.
    pub fn add_perforation(
        &mut self,
        segment: u32,
        cell: CellIndex,
        well_index: f64,
        depth: Length,
    ) -> PerfIndex {
        self.add_perforation_with_region(segment, cell, well_index, depth, None)
    }

    /// Add a perforation that uses its own saturation region for relative permeability.
    pub fn add_perforation_with_region(
        &mut self,
        segment: u32,
        cell: CellIndex,
        well_index: f64,
        depth: Length,
        sat_region: Option<usize>,
    ) -> PerfIndex {
        self.perforations.push(RawPerforation {
            segment,
            cell,
            well_index,
            sat_region,
            depth,
        });
        self.perforations.len() - 1
    }

    /// Validate and build the topology.
    pub fn build(self) -> TopologyResult<SegmentTopology> {
        validate::validate_numbering(&self.segments)?;
        let top = validate::validate_root(&self.segments)?;

        // Top segment goes to location 0, the others keep insertion order.
        let mut ordered: Vec<RawSegment> = Vec::with_capacity(self.segments.len());
        ordered.push(self.segments[top].clone());
        ordered.extend(
            self.segments
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != top)
                .map(|(_, s)| s.clone()),
        );

        let numbers = ordered
            .iter()
            .map(|s| SegmentNumber::new(s.number).ok_or(TopologyError::ZeroSegmentNumber))
            .collect::<TopologyResult<Vec<_>>>()?;
        let index = SegmentIndex::new(numbers)?;

        let mut segments = Vec::with_capacity(ordered.len());
        let mut outlets = Vec::with_capacity(ordered.len());
        for (loc, raw) in ordered.iter().enumerate() {
            let outlet = match raw.outlet {
                None => None,
                Some(o) => {
                    let unknown = TopologyError::UnknownOutletSegment {
                        segment: raw.number,
                        outlet: o,
                    };
                    let number = SegmentNumber::new(o).ok_or(unknown.clone())?;
                    let outlet_loc = index.number_to_location(number).map_err(|_| unknown)?;
                    Some((number, outlet_loc))
                }
            };
            outlets.push(outlet.map(|(_, l)| l));
            segments.push(Segment {
                number: index.location_to_number(loc),
                outlet: outlet.map(|(n, _)| n),
                geometry: raw.geometry,
            });
        }

        validate::validate_outlets_reach_top(&segments, &outlets)?;
        validate::validate_friction_lengths(&segments, &outlets)?;

        if self.perforations.is_empty() {
            return Err(TopologyError::NoPerforations);
        }
        let mut perforations = Vec::with_capacity(self.perforations.len());
        for (perf, raw) in self.perforations.into_iter().enumerate() {
            let segment = SegmentNumber::new(raw.segment)
                .filter(|n| index.number_to_location(*n).is_ok())
                .ok_or(TopologyError::UnknownPerforationSegment {
                    perforation: perf,
                    segment: raw.segment,
                })?;
            perforations.push(Perforation {
                cell: raw.cell,
                segment,
                well_index: raw.well_index,
                sat_region: raw.sat_region,
                depth: raw.depth,
            });
        }

        SegmentTopology::assemble(segments, outlets, perforations, index)
    }
}
