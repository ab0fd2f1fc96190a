//! mw-topology: segment tree of a multi-segment well.
//!
//! Provides:
//! - Segment and perforation records (static geometry)
//! - Incremental topology builder with validation
//! - Number ↔ location indexing for the dense well unknown layout
//! - Precomputed inlet/perforation lists and depth differences
//!
//! # Example
//!
//! ```
//! use mw_core::units::m;
//! use mw_topology::{SegmentGeometry, TopologyBuilder};
//!
//! let mut builder = TopologyBuilder::new();
//! builder
//!     .add_segment(1, None, SegmentGeometry { depth: m(1000.0), ..Default::default() })
//!     .add_segment(2, Some(1), SegmentGeometry { depth: m(1010.0), ..Default::default() });
//! builder.add_perforation(2, 17, 1.0e-12, m(1012.0));
//! let topology = builder.build().unwrap();
//!
//! assert_eq!(topology.number_of_segments(), 2);
//! assert_eq!(topology.inlets(0), &[1]);
//! ```

pub mod builder;
pub mod error;
pub mod indexing;
pub mod segment;
pub mod topology;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::TopologyBuilder;
pub use error::{TopologyError, TopologyResult};
pub use indexing::SegmentIndex;
pub use segment::{Perforation, PressureDropModel, Segment, SegmentGeometry};
pub use topology::SegmentTopology;
