//! mw-fluids: fluid property services consumed by the well model.
//!
//! Provides:
//! - Phase definitions and the active-phase layout (`PhaseUsage`)
//! - Reservoir cell state as seen by a perforation (`CellState`)
//! - `PvtService` trait for black-oil PVT evaluation
//! - `RelPermService` trait for relative permeability evaluation
//! - Reference implementations: `LinearPvt` and `TableRelPerm`
//!
//! # Architecture
//!
//! The well model never evaluates PVT or relative permeability itself. It
//! calls the traits defined here, so a reservoir simulator plugs in its own
//! tables. The reference implementations are simple analytic models intended
//! for tests and the demo CLI.
//!
//! # Example
//!
//! ```
//! use mw_fluids::{CellConditions, CellState, LinearPvt, PhaseUsage, TableRelPerm};
//!
//! let usage = PhaseUsage::three_phase();
//! let pvt = LinearPvt::default();
//! let relperm = TableRelPerm::default();
//! let conditions = CellConditions {
//!     pressure: 250.0e5,
//!     water_saturation: 0.2,
//!     gas_saturation: 0.1,
//!     ..Default::default()
//! };
//!
//! let cell = CellState::evaluate(&usage, &pvt, &relperm, &conditions).unwrap();
//! assert!(cell.mobility[usage.oil_position()].value() > 0.0);
//! ```

pub mod cell;
pub mod error;
pub mod linear_pvt;
pub mod phases;
pub mod pvt;
pub mod relperm;

// Re-exports for ergonomics
pub use cell::{CellConditions, CellState, lookup_cell};
pub use error::{FluidError, FluidResult};
pub use linear_pvt::{LinearPhase, LinearPvt, LinearPvtRegion};
pub use phases::{MAX_PHASES, Phase, PhaseUsage};
pub use pvt::{PhaseProperties, PvtService};
pub use relperm::{RelPermService, RelPermTable, SaturationRegion, TableRelPerm};
