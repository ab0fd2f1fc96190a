//! Integration tests for mw-topology.

use mw_core::SegmentNumber;
use mw_core::units::m;
use mw_topology::{PressureDropModel, SegmentGeometry, TopologyBuilder, TopologyError};

fn geometry(depth: f64, total_length: f64) -> SegmentGeometry {
    SegmentGeometry {
        depth: m(depth),
        total_length: m(total_length),
        ..Default::default()
    }
}

/// Top segment 1, a main branch 1 <- 2 <- 3 and a lateral 2 <- 4.
fn branched_builder() -> TopologyBuilder {
    let mut builder = TopologyBuilder::new();
    builder
        .add_segment(1, None, geometry(1000.0, 0.0))
        .add_segment(2, Some(1), geometry(1050.0, 60.0))
        .add_segment(3, Some(2), geometry(1100.0, 120.0))
        .add_segment(4, Some(2), geometry(1060.0, 150.0));
    builder.add_perforation(3, 30, 2.0e-12, m(1102.0));
    builder.add_perforation(4, 40, 1.0e-12, m(1058.0));
    builder.add_perforation(3, 31, 2.0e-12, m(1104.0));
    builder
}

#[test]
fn locations_form_a_tree_rooted_at_zero() {
    let topology = branched_builder().build().unwrap();
    let n = topology.number_of_segments();
    assert_eq!(n, 4);

    assert_eq!(topology.outlet(0), None);
    for loc in 1..n {
        // Every non-top segment reaches location 0.
        let mut cur = loc;
        let mut steps = 0;
        while let Some(next) = topology.outlet(cur) {
            cur = next;
            steps += 1;
            assert!(steps <= n);
        }
        assert_eq!(cur, 0);
    }
}

#[test]
fn number_to_location_is_a_bijection() {
    let topology = branched_builder().build().unwrap();
    let index = topology.index();
    let mut seen = vec![false; topology.number_of_segments()];
    for number in 1..=4 {
        let loc = index
            .number_to_location(SegmentNumber::new(number).unwrap())
            .unwrap();
        assert!(!seen[loc]);
        seen[loc] = true;
        assert_eq!(index.location_to_number(loc).get(), number);
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn inlets_and_perforations() {
    let topology = branched_builder().build().unwrap();
    assert_eq!(topology.inlets(0), &[1]);
    assert_eq!(topology.inlets(1), &[2, 3]);
    assert!(topology.inlets(2).is_empty());

    assert_eq!(topology.segment_perforations(2), &[0, 2]);
    assert_eq!(topology.segment_perforations(3), &[1]);
    assert!(topology.segment_perforations(0).is_empty());
    assert_eq!(topology.perforation_segment(1), 3);
    assert_eq!(topology.segment_cells(2), vec![30, 31]);
}

#[test]
fn depth_differences() {
    let topology = branched_builder().build().unwrap();
    assert_eq!(topology.segment_depth_diff(0), 0.0);
    assert!((topology.segment_depth_diff(1) - 50.0).abs() < 1e-12);
    assert!((topology.segment_depth_diff(2) - 50.0).abs() < 1e-12);
    assert!((topology.segment_depth_diff(3) - 10.0).abs() < 1e-12);

    assert!((topology.perforation_segment_depth_diff(0) - 2.0).abs() < 1e-12);
    assert!((topology.perforation_segment_depth_diff(1) + 2.0).abs() < 1e-12);
    assert!((topology.segment_length(3) - 90.0).abs() < 1e-12);
}

#[test]
fn upstream_order_ends_at_top() {
    let topology = branched_builder().build().unwrap();
    let order = topology.upstream_order();
    assert_eq!(order.len(), 4);
    assert_eq!(*order.last().unwrap(), 0);
    let pos = |loc: usize| order.iter().position(|&l| l == loc).unwrap();
    for loc in 1..4 {
        let outlet = topology.outlet(loc).unwrap();
        assert!(pos(loc) < pos(outlet));
    }
}

#[test]
fn cyclic_outlets_rejected() {
    let mut builder = TopologyBuilder::new();
    builder
        .add_segment(1, None, geometry(1000.0, 0.0))
        .add_segment(2, Some(3), geometry(1010.0, 10.0))
        .add_segment(3, Some(2), geometry(1020.0, 20.0));
    builder.add_perforation(1, 0, 1.0, m(1000.0));
    assert!(matches!(
        builder.build(),
        Err(TopologyError::CyclicOutlet { .. })
    ));
}

#[test]
fn friction_needs_positive_length() {
    let mut builder = TopologyBuilder::new();
    builder
        .add_segment(1, None, geometry(1000.0, 50.0))
        .add_segment(
            2,
            Some(1),
            geometry(1010.0, 40.0).with_pressure_drop(PressureDropModel::HydrostaticFriction),
        );
    builder.add_perforation(2, 0, 1.0, m(1010.0));
    assert!(matches!(
        builder.build(),
        Err(TopologyError::NonPositiveLength { segment: 2, .. })
    ));
}
