//! mw-core: stable foundation for the multi-segment well model.
//!
//! Contains:
//! - units (uom SI types + constructors, gravity)
//! - numeric (finiteness check, Newton step clamp)
//! - ids (deck segment numbers)
//! - eval (forward-mode dual numbers used for local Jacobians)
//! - error (shared error types)

pub mod error;
pub mod eval;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{MwError, MwResult};
pub use eval::{Eval, EvalCell, EvalWell, MAX_CELL_EQ, MAX_WELL_EQ, NUM_DERIVATIVES};
pub use ids::*;
pub use numeric::*;
pub use units::*;
