//! Stable indexing between deck segment numbers and dense locations.
//!
//! Locations are the row/column positions of a segment in every well-local
//! vector and block matrix. The top segment is always location 0.

use mw_core::{SegmentLocation, SegmentNumber};

use crate::error::{TopologyError, TopologyResult};

/// Bijection between segment numbers and locations `0..len`.
#[derive(Debug, Clone)]
pub struct SegmentIndex {
    /// Contiguous list of segment numbers (location -> number).
    numbers: Vec<SegmentNumber>,

    /// Reverse lookup: number -> location.
    /// Sized to max(number) + 1; None if that number doesn't exist.
    number_to_loc: Vec<Option<SegmentLocation>>,
}

impl SegmentIndex {
    /// Build the index from numbers listed in location order.
    ///
    /// Duplicates are rejected; the caller validates contiguity.
    pub(crate) fn new(numbers: Vec<SegmentNumber>) -> TopologyResult<Self> {
        let max = numbers.iter().map(|n| n.get() as usize).max().unwrap_or(0);
        let mut number_to_loc = vec![None; max + 1];
        for (loc, number) in numbers.iter().enumerate() {
            let slot = &mut number_to_loc[number.get() as usize];
            if slot.is_some() {
                return Err(TopologyError::DuplicateSegmentNumber {
                    number: number.get(),
                });
            }
            *slot = Some(loc);
        }
        Ok(Self {
            numbers,
            number_to_loc,
        })
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    /// Location of a segment number.
    pub fn number_to_location(&self, number: SegmentNumber) -> TopologyResult<SegmentLocation> {
        self.number_to_loc
            .get(number.get() as usize)
            .and_then(|&opt| opt)
            .ok_or(TopologyError::NumberNotFound {
                number: number.get(),
            })
    }

    /// Segment number at a location (panics if out of bounds).
    pub fn location_to_number(&self, loc: SegmentLocation) -> SegmentNumber {
        self.numbers[loc]
    }

    /// All segment numbers in location order.
    pub fn numbers(&self) -> &[SegmentNumber] {
        &self.numbers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: u32) -> SegmentNumber {
        SegmentNumber::new(n).unwrap()
    }

    #[test]
    fn round_trip() {
        let index = SegmentIndex::new(vec![num(1), num(3), num(2)]).unwrap();
        assert_eq!(index.len(), 3);
        for loc in 0..index.len() {
            let number = index.location_to_number(loc);
            assert_eq!(index.number_to_location(number).unwrap(), loc);
        }
        assert_eq!(index.number_to_location(num(3)).unwrap(), 1);
    }

    #[test]
    fn missing_number() {
        let index = SegmentIndex::new(vec![num(1), num(2)]).unwrap();
        assert_eq!(
            index.number_to_location(num(5)),
            Err(TopologyError::NumberNotFound { number: 5 })
        );
    }

    #[test]
    fn duplicates_rejected() {
        let err = SegmentIndex::new(vec![num(1), num(2), num(2)]).unwrap_err();
        assert_eq!(err, TopologyError::DuplicateSegmentNumber { number: 2 });
    }
}
