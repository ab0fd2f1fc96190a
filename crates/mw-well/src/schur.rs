//! Elimination of the well unknowns from the coupled system.
//!
//! With the system written as
//!
//! ```text
//! | A  C^T | | x |   | r   |
//! | B  D   | | y | = | r_w |
//! ```
//!
//! the well block is removed by `A - C^T D^-1 B` and `r - C^T D^-1 r_w`, and
//! recovered after the reservoir solve by `y = D^-1 (r_w - B x)`. `D` is
//! small (segments times well equations) and factorised densely.

use nalgebra::{DVector, Dyn, LU};
use tracing::debug;

use crate::assembler::WellEquations;
use crate::blocks::BlockMatrix;
use crate::error::{WellError, WellResult};

/// LU factorisation of a well's `D` matrix.
#[derive(Debug, Clone)]
pub struct SchurEliminator {
    well: String,
    lu: LU<f64, Dyn, Dyn>,
    size: usize,
}

impl SchurEliminator {
    /// Factorise `d`; a singular matrix is an error, never regularised.
    pub fn new(d: &BlockMatrix, well: &str) -> WellResult<Self> {
        let dense = d.to_dense();
        let size = dense.nrows();
        let lu = dense.lu();
        if !lu.is_invertible() {
            debug!(well, size, "well matrix is singular");
            return Err(WellError::SingularWellSystem {
                well: well.to_string(),
            });
        }
        Ok(Self {
            well: well.to_string(),
            lu,
            size,
        })
    }

    /// Number of well unknowns.
    pub fn size(&self) -> usize {
        self.size
    }

    /// `D^-1 rhs`.
    pub fn solve(&self, rhs: &[f64]) -> WellResult<Vec<f64>> {
        if rhs.len() != self.size {
            return Err(WellError::InvalidState {
                what: format!("well vector has length {}, expected {}", rhs.len(), self.size),
            });
        }
        let solution = self
            .lu
            .solve(&DVector::from_column_slice(rhs))
            .ok_or_else(|| WellError::SingularWellSystem {
                well: self.well.clone(),
            })?;
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(WellError::SingularWellSystem {
                well: self.well.clone(),
            });
        }
        Ok(solution.as_slice().to_vec())
    }

    /// `ax -= C^T D^-1 B x`.
    pub fn apply(&self, eqs: &WellEquations, x: &[f64], ax: &mut [f64]) -> WellResult<()> {
        let mut bx = vec![0.0; self.size];
        eqs.b.mv(x, &mut bx)?;
        let inv_bx = self.solve(&bx)?;
        eqs.c.mmtv(&inv_bx, ax)
    }

    /// `r -= C^T D^-1 r_w`.
    pub fn apply_residual(&self, eqs: &WellEquations, r: &mut [f64]) -> WellResult<()> {
        let inv_rw = self.solve(&eqs.residual)?;
        eqs.c.mmtv(&inv_rw, r)
    }

    /// Well update `D^-1 (r_w - B x)` for a solved reservoir update `x`.
    pub fn recover(&self, eqs: &WellEquations, x: &[f64]) -> WellResult<Vec<f64>> {
        let mut rhs = eqs.residual.clone();
        eqs.b.mmv(x, &mut rhs)?;
        self.solve(&rhs)
    }
}
