//! Topology-specific error types.

use mw_core::{MwError, PerfIndex};
use thiserror::Error;

pub type TopologyResult<T> = Result<T, TopologyError>;

/// Malformed segment graphs. These are fatal at well construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Segment number 0 is not valid (deck numbering starts at 1)")]
    ZeroSegmentNumber,

    #[error("Well has no segments without an outlet (no top segment)")]
    NoRootSegment,

    #[error("Segments {first} and {second} both lack an outlet")]
    MultipleRootSegments { first: u32, second: u32 },

    #[error("Segment {number} has no outlet but is not the top segment 1")]
    RootIsNotTop { number: u32 },

    #[error("Segment number {number} is defined twice")]
    DuplicateSegmentNumber { number: u32 },

    #[error("Segment numbers must cover 1..={count}, found {number}")]
    NonContiguousNumbering { count: usize, number: u32 },

    #[error("Segment {segment} refers to non-existent outlet segment {outlet}")]
    UnknownOutletSegment { segment: u32, outlet: u32 },

    #[error("Outlet chain starting at segment {segment} does not reach the top segment")]
    CyclicOutlet { segment: u32 },

    #[error("Perforation {perforation} refers to non-existent segment {segment}")]
    UnknownPerforationSegment { perforation: PerfIndex, segment: u32 },

    #[error("Well has no perforations")]
    NoPerforations,

    #[error("Segment {segment} has non-positive length {length} relative to its outlet")]
    NonPositiveLength { segment: u32, length: f64 },

    #[error("Segment number {number} not found in index")]
    NumberNotFound { number: u32 },
}

impl From<TopologyError> for MwError {
    fn from(err: TopologyError) -> Self {
        MwError::Invariant {
            what: err.to_string(),
        }
    }
}
