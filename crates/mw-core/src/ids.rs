use core::fmt;
use core::num::NonZeroU32;

/// Segment number as written in a well deck.
///
/// Deck numbering is 1-based and the top segment is always number 1.
/// Numbers are stable identities; the dense storage position of a segment
/// is its *location* (see `mw_topology::SegmentIndex`).
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<SegmentNumber>` (an outlet) to be niche-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentNumber(NonZeroU32);

impl SegmentNumber {
    /// The wellhead segment.
    pub const TOP: SegmentNumber = SegmentNumber(NonZeroU32::MIN);

    /// Create a segment number; `None` for 0, which is not a valid deck number.
    pub fn new(number: u32) -> Option<Self> {
        NonZeroU32::new(number).map(Self)
    }

    /// The raw deck number.
    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn is_top(self) -> bool {
        self == Self::TOP
    }
}

impl fmt::Debug for SegmentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seg#{}", self.get())
    }
}

impl fmt::Display for SegmentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Index of a reservoir grid cell in the global (process-local) numbering.
pub type CellIndex = usize;

/// Dense position of a segment inside one well, `0..number_of_segments`.
pub type SegmentLocation = usize;

/// Index of a perforation inside one well, `0..number_of_perforations`.
pub type PerfIndex = usize;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_a_segment_number() {
        assert!(SegmentNumber::new(0).is_none());
        assert_eq!(SegmentNumber::new(7).map(SegmentNumber::get), Some(7));
    }

    #[test]
    fn top_segment_is_number_one() {
        assert!(SegmentNumber::new(1).is_some_and(SegmentNumber::is_top));
        assert!(!SegmentNumber::new(2).is_some_and(SegmentNumber::is_top));
    }

    #[test]
    fn option_segment_number_is_small() {
        assert_eq!(
            core::mem::size_of::<SegmentNumber>(),
            core::mem::size_of::<Option<SegmentNumber>>()
        );
    }
}
