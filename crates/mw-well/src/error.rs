//! Error types for well operations.

use mw_core::MwError;
use mw_fluids::FluidError;
use mw_topology::TopologyError;
use thiserror::Error;

/// Failures that abort the current nonlinear step.
///
/// Convergence problems are not errors; they are reported through
/// [`crate::ConvergenceReport`].
#[derive(Error, Debug)]
pub enum WellError {
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Fluid error: {0}")]
    Fluid(#[from] FluidError),

    #[error("Numerical problem: {what}")]
    NumericalProblem { what: String },

    #[error("Segment system of well {well} is singular")]
    SingularWellSystem { well: String },

    #[error("Not implemented for multi-segment wells: {feature}")]
    Unimplemented { feature: String },

    #[error("Invalid state: {what}")]
    InvalidState { what: String },

    #[error(transparent)]
    Core(#[from] MwError),
}

pub type WellResult<T> = Result<T, WellError>;

impl From<WellError> for MwError {
    fn from(e: WellError) -> Self {
        match e {
            WellError::Topology(err) => err.into(),
            WellError::Fluid(err) => err.into(),
            WellError::InvalidState { what } => MwError::InvalidArg { what },
            WellError::Core(err) => err,
            other => MwError::Invariant {
                what: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = WellError::SingularWellSystem {
            well: "PROD1".into(),
        };
        assert!(err.to_string().contains("PROD1"));

        let err = WellError::Unimplemented {
            feature: "THP control".into(),
        };
        assert!(err.to_string().contains("THP"));
    }

    #[test]
    fn conversions() {
        let err: WellError = TopologyError::NoPerforations.into();
        assert!(matches!(err, WellError::Topology(_)));

        let mw: MwError = WellError::InvalidState {
            what: "size".into(),
        }
        .into();
        assert!(matches!(mw, MwError::InvalidArg { .. }));

        let err: WellError = mw_core::ensure_finite(f64::NAN, "timestep").unwrap_err().into();
        let mw: MwError = err.into();
        assert!(matches!(mw, MwError::NonFinite { what: "timestep", .. }));
    }
}
