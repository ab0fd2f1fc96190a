//! Fluid service errors.

use mw_core::MwError;
use thiserror::Error;

use crate::phases::Phase;

/// Result type for fluid operations.
pub type FluidResult<T> = Result<T, FluidError>;

/// Errors raised by PVT and relative permeability services.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluidError {
    /// Non-physical values (negative pressure, saturation outside [0, 1], ...).
    #[error("Non-physical value for {what}")]
    NonPhysical { what: &'static str },

    /// Value outside the range covered by a table.
    #[error("Value out of range for {what}")]
    OutOfRange { what: &'static str },

    #[error("Region {region} is not defined ({count} regions available)")]
    UnknownRegion { region: usize, count: usize },

    #[error("Cell {cell} is not available ({count} cells)")]
    MissingCell { cell: usize, count: usize },

    #[error("Phase {phase:?} is not active")]
    InactivePhase { phase: Phase },
}

impl From<FluidError> for MwError {
    fn from(err: FluidError) -> Self {
        match err {
            FluidError::OutOfRange { .. } | FluidError::MissingCell { .. } => {
                MwError::InvalidArg {
                    what: err.to_string(),
                }
            }
            _ => MwError::Invariant {
                what: err.to_string(),
            },
        }
    }
}
