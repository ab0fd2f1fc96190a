//! Topology validation logic.

use mw_core::SegmentLocation;

use crate::builder::RawSegment;
use crate::error::{TopologyError, TopologyResult};
use crate::segment::Segment;

/// Segment numbers must be a permutation of `1..=n`.
pub(crate) fn validate_numbering(segments: &[RawSegment]) -> TopologyResult<()> {
    let count = segments.len();
    let mut seen = vec![false; count + 1];
    for seg in segments {
        if seg.number == 0 {
            return Err(TopologyError::ZeroSegmentNumber);
        }
        let n = seg.number as usize;
        if n > count {
            return Err(TopologyError::NonContiguousNumbering {
                count,
                number: seg.number,
            });
        }
        if seen[n] {
            return Err(TopologyError::DuplicateSegmentNumber { number: seg.number });
        }
        seen[n] = true;
    }
    Ok(())
}

/// Exactly one segment lacks an outlet and it is segment 1.
///
/// Returns the position of the top segment in `segments`.
pub(crate) fn validate_root(segments: &[RawSegment]) -> TopologyResult<usize> {
    let mut root: Option<usize> = None;
    for (i, seg) in segments.iter().enumerate() {
        if seg.outlet.is_some() {
            continue;
        }
        if let Some(first) = root {
            return Err(TopologyError::MultipleRootSegments {
                first: segments[first].number,
                second: seg.number,
            });
        }
        root = Some(i);
    }

    let root = root.ok_or(TopologyError::NoRootSegment)?;
    if segments[root].number != 1 {
        return Err(TopologyError::RootIsNotTop {
            number: segments[root].number,
        });
    }
    Ok(root)
}

/// Every outlet chain terminates at location 0 within `n` steps.
pub(crate) fn validate_outlets_reach_top(
    segments: &[Segment],
    outlets: &[Option<SegmentLocation>],
) -> TopologyResult<()> {
    let n = outlets.len();
    for start in 0..n {
        let mut loc = start;
        let mut steps = 0;
        while let Some(next) = outlets[loc] {
            loc = next;
            steps += 1;
            if steps > n {
                return Err(TopologyError::CyclicOutlet {
                    segment: segments[start].number.get(),
                });
            }
        }
        if loc != 0 {
            return Err(TopologyError::CyclicOutlet {
                segment: segments[start].number.get(),
            });
        }
    }
    Ok(())
}

/// Segments with friction need a positive length relative to their outlet.
pub(crate) fn validate_friction_lengths(
    segments: &[Segment],
    outlets: &[Option<SegmentLocation>],
) -> TopologyResult<()> {
    for (seg, outlet) in segments.iter().zip(outlets) {
        let Some(outlet) = *outlet else { continue };
        if !seg.pressure_drop().includes_friction() {
            continue;
        }
        let length = seg.total_length() - segments[outlet].total_length();
        if length <= 0.0 {
            return Err(TopologyError::NonPositiveLength {
                segment: seg.number.get(),
                length,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentGeometry;

    fn raw(number: u32, outlet: Option<u32>) -> RawSegment {
        RawSegment {
            number,
            outlet,
            geometry: SegmentGeometry::default(),
        }
    }

    #[test]
    fn empty_well_has_no_root() {
        assert!(validate_numbering(&[]).is_ok());
        assert_eq!(validate_root(&[]), Err(TopologyError::NoRootSegment));
    }

    #[test]
    fn gap_in_numbering_rejected() {
        let segs = [raw(1, None), raw(3, Some(1))];
        assert_eq!(
            validate_numbering(&segs),
            Err(TopologyError::NonContiguousNumbering {
                count: 2,
                number: 3
            })
        );
    }

    #[test]
    fn duplicate_number_rejected() {
        let segs = [raw(1, None), raw(1, Some(1))];
        assert_eq!(
            validate_numbering(&segs),
            Err(TopologyError::DuplicateSegmentNumber { number: 1 })
        );
    }

    #[test]
    fn two_roots_rejected() {
        let segs = [raw(1, None), raw(2, None)];
        assert_eq!(
            validate_root(&segs),
            Err(TopologyError::MultipleRootSegments {
                first: 1,
                second: 2
            })
        );
    }

    #[test]
    fn root_must_be_segment_one() {
        let segs = [raw(1, Some(2)), raw(2, None)];
        assert_eq!(
            validate_root(&segs),
            Err(TopologyError::RootIsNotTop { number: 2 })
        );
    }

    #[test]
    fn cycle_detected() {
        // 1 is the root; 2 -> 3 -> 2 never reaches it.
        let segments: Vec<Segment> = (1..=3)
            .map(|n| Segment {
                number: mw_core::SegmentNumber::new(n).unwrap(),
                outlet: None,
                geometry: SegmentGeometry::default(),
            })
            .collect();
        let outlets = [None, Some(2), Some(1)];
        assert_eq!(
            validate_outlets_reach_top(&segments, &outlets),
            Err(TopologyError::CyclicOutlet { segment: 2 })
        );
    }
}
