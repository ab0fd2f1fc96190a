//! mw-well: nonlinear model of a multi-segment well.
//!
//! Provides:
//! - Primary variables and the bounded Newton update
//! - Segment fluid properties and pressure-drop hydraulics
//! - Perforation flux and assembly of the local block system
//! - Schur elimination of the well unknowns into the reservoir system
//! - Convergence classification and well-local inner iterations
//! - Parallel assembly of several wells
//!
//! # Example
//!
//! ```
//! use mw_core::units::{bar, m};
//! use mw_fluids::{CellConditions, CellState, LinearPvt, PhaseUsage, TableRelPerm};
//! use mw_topology::{SegmentGeometry, TopologyBuilder};
//! use mw_well::{
//!     MultisegmentWell, ReservoirContext, WellControl, WellModelParameters, WellSettings,
//!     WellState, WellType,
//! };
//!
//! let usage = PhaseUsage::dead_oil();
//! let pvt = LinearPvt::default();
//! let relperm = TableRelPerm::default();
//! let cells = vec![
//!     CellState::evaluate(&usage, &pvt, &relperm, &CellConditions::default()).unwrap(),
//! ];
//!
//! let mut builder = TopologyBuilder::new();
//! builder.add_segment(1, None, SegmentGeometry::default());
//! builder.add_perforation(1, 0, 1.0e-12, m(0.0));
//! let topology = builder.build().unwrap();
//!
//! let settings = WellSettings::new("P1", WellType::Producer, WellControl::bhp(bar(190.0)));
//! let mut well =
//!     MultisegmentWell::new(settings, topology, usage, WellModelParameters::default()).unwrap();
//! well.init(cells.len()).unwrap();
//!
//! let mut state = WellState::new(well.topology(), 1, 195.0e5);
//! state.well_rates = vec![-1.0e-3];
//! well.init_segment_rates_with_well_rates(&mut state).unwrap();
//! well.update_well_state_with_target(&mut state).unwrap();
//!
//! let ctx = ReservoirContext::new(&cells, &pvt, &relperm);
//! well.calculate_explicit_quantities(&ctx).unwrap();
//! well.assemble_well_eq(&ctx, 86_400.0, &mut state, true).unwrap();
//! well.solve_eq_and_update_well_state(&mut state).unwrap();
//! assert_eq!(state.bhp, 190.0e5);
//! ```

pub mod assembler;
pub mod blocks;
pub mod config;
pub mod control;
pub mod convergence;
pub mod error;
pub mod fluid_state;
pub mod hydraulics;
pub mod newton;
pub mod perforation;
pub mod primary;
pub mod schur;
pub mod state;
pub mod system;
pub mod well;
pub mod wells;

pub use assembler::{WellEquationAssembler, WellEquations, control_equation};
pub use blocks::BlockMatrix;
pub use config::{RegionPolicy, WellModelParameters, WellSettings};
pub use control::{ComponentScaling, WellControl, WellType};
pub use convergence::{ConvergenceReport, ProblemWell, well_convergence};
pub use error::{WellError, WellResult};
pub use fluid_state::{SegmentFluid, SegmentFluidState, WellboreFluid};
pub use newton::{InnerIterationOutcome, apply_newton_update, relaxation_factor};
pub use perforation::{
    FlowDirection, PerforationConditions, PerforationFlux, cell_perforation_pressure_diff,
    compute_perforation_rates, perforation_mobility,
};
pub use primary::{PrimaryVariables, SegmentEval, SegmentVariables, WellLayout, process_fractions};
pub use schur::SchurEliminator;
pub use state::{WellState, calculate_segment_rates};
pub use system::{
    BlockDiagonalSystem, CellContribution, CellContributions, ReservoirContext, ReservoirSystem,
};
pub use well::MultisegmentWell;
pub use wells::WellCollection;
