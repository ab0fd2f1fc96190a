//! Immutable segment tree with precomputed adjacency.

use mw_core::{CellIndex, PerfIndex, SegmentLocation, SegmentNumber};

use crate::error::TopologyResult;
use crate::indexing::SegmentIndex;
use crate::segment::{Perforation, Segment};

/// The validated, immutable segment tree of one well.
///
/// Stores, for every segment location:
/// - its outlet location (none for location 0, the top segment),
/// - its direct inlet (child) locations,
/// - the perforations it owns,
/// - its depth difference to the outlet (zero for the top segment).
///
/// and for every perforation its owning location and depth offset from that
/// segment. Built once per well definition; never mutated.
#[derive(Debug, Clone)]
pub struct SegmentTopology {
    segments: Vec<Segment>,
    perforations: Vec<Perforation>,
    index: SegmentIndex,
    outlets: Vec<Option<SegmentLocation>>,
    segment_inlets: Vec<Vec<SegmentLocation>>,
    segment_perforations: Vec<Vec<PerfIndex>>,
    perforation_segment: Vec<SegmentLocation>,
    perforation_segment_depth_diffs: Vec<f64>,
    segment_depth_diffs: Vec<f64>,
    upstream_order: Vec<SegmentLocation>,
}

impl SegmentTopology {
    pub(crate) fn assemble(
        segments: Vec<Segment>,
        outlets: Vec<Option<SegmentLocation>>,
        perforations: Vec<Perforation>,
        index: SegmentIndex,
    ) -> TopologyResult<Self> {
        let nseg = segments.len();

        let mut segment_perforations = vec![Vec::new(); nseg];
        let mut perforation_segment = Vec::with_capacity(perforations.len());
        let mut perforation_segment_depth_diffs = Vec::with_capacity(perforations.len());
        for (perf, p) in perforations.iter().enumerate() {
            let loc = index.number_to_location(p.segment)?;
            segment_perforations[loc].push(perf);
            perforation_segment.push(loc);
            perforation_segment_depth_diffs.push(p.depth.value - segments[loc].depth());
        }

        let mut segment_inlets = vec![Vec::new(); nseg];
        let mut segment_depth_diffs = vec![0.0; nseg];
        for (loc, outlet) in outlets.iter().enumerate() {
            if let Some(outlet) = *outlet {
                segment_inlets[outlet].push(loc);
                segment_depth_diffs[loc] = segments[loc].depth() - segments[outlet].depth();
            }
        }

        let upstream_order = upstream_order(&segment_inlets);

        Ok(Self {
            segments,
            perforations,
            index,
            outlets,
            segment_inlets,
            segment_perforations,
            perforation_segment,
            perforation_segment_depth_diffs,
            segment_depth_diffs,
            upstream_order,
        })
    }

    pub fn number_of_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn number_of_perforations(&self) -> usize {
        self.perforations.len()
    }

    /// Return all segments in location order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Get a segment by location (panics if out of bounds).
    pub fn segment(&self, loc: SegmentLocation) -> &Segment {
        &self.segments[loc]
    }

    pub fn perforations(&self) -> &[Perforation] {
        &self.perforations
    }

    pub fn perforation(&self, perf: PerfIndex) -> &Perforation {
        &self.perforations[perf]
    }

    pub fn index(&self) -> &SegmentIndex {
        &self.index
    }

    /// Location of a deck segment number.
    pub fn number_to_location(&self, number: SegmentNumber) -> TopologyResult<SegmentLocation> {
        self.index.number_to_location(number)
    }

    /// Outlet location of a segment; `None` for the top segment.
    pub fn outlet(&self, loc: SegmentLocation) -> Option<SegmentLocation> {
        self.outlets[loc]
    }

    /// Direct inlet (child) locations of a segment.
    pub fn inlets(&self, loc: SegmentLocation) -> &[SegmentLocation] {
        &self.segment_inlets[loc]
    }

    /// Perforations owned by a segment.
    pub fn segment_perforations(&self, loc: SegmentLocation) -> &[PerfIndex] {
        &self.segment_perforations[loc]
    }

    /// Owning segment location of a perforation.
    pub fn perforation_segment(&self, perf: PerfIndex) -> SegmentLocation {
        self.perforation_segment[perf]
    }

    /// Perforation depth minus owning segment depth.
    pub fn perforation_segment_depth_diff(&self, perf: PerfIndex) -> f64 {
        self.perforation_segment_depth_diffs[perf]
    }

    /// Segment depth minus outlet depth; zero for the top segment.
    pub fn segment_depth_diff(&self, loc: SegmentLocation) -> f64 {
        self.segment_depth_diffs[loc]
    }

    /// Length along the wellbore between a segment and its outlet.
    ///
    /// Zero for the top segment.
    pub fn segment_length(&self, loc: SegmentLocation) -> f64 {
        match self.outlets[loc] {
            Some(outlet) => self.segments[loc].total_length() - self.segments[outlet].total_length(),
            None => 0.0,
        }
    }

    /// Reservoir cell of a perforation.
    pub fn perforation_cell(&self, perf: PerfIndex) -> CellIndex {
        self.perforations[perf].cell
    }

    /// Distinct cells perforated by a segment, sorted.
    pub fn segment_cells(&self, loc: SegmentLocation) -> Vec<CellIndex> {
        let mut cells: Vec<CellIndex> = self.segment_perforations[loc]
            .iter()
            .map(|&perf| self.perforations[perf].cell)
            .collect();
        cells.sort_unstable();
        cells.dedup();
        cells
    }

    /// Segment locations ordered so that every inlet precedes its outlet.
    ///
    /// The top segment is last.
    pub fn upstream_order(&self) -> &[SegmentLocation] {
        &self.upstream_order
    }
}

/// Post-order walk from the top segment.
fn upstream_order(inlets: &[Vec<SegmentLocation>]) -> Vec<SegmentLocation> {
    let mut order = Vec::with_capacity(inlets.len());
    if inlets.is_empty() {
        return order;
    }
    // (location, next inlet to visit)
    let mut stack: Vec<(SegmentLocation, usize)> = vec![(0, 0)];
    while let Some((loc, next)) = stack.pop() {
        if let Some(&child) = inlets[loc].get(next) {
            stack.push((loc, next + 1));
            stack.push((child, 0));
        } else {
            order.push(loc);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_order_visits_children_first() {
        // 0 <- 1 <- 2, 0 <- 3
        let inlets = vec![vec![1, 3], vec![2], vec![], vec![]];
        let order = upstream_order(&inlets);
        assert_eq!(order, vec![2, 1, 3, 0]);
    }

    #[test]
    fn upstream_order_of_single_segment() {
        assert_eq!(upstream_order(&[vec![]]), vec![0]);
    }
}
