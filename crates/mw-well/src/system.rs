//! The reservoir side of the coupled system.
//!
//! Wells read cell states through [`ReservoirContext`] and write their
//! contributions to cell equations through [`ReservoirSystem`]. During
//! parallel assembly each well first fills its own [`CellContributions`]
//! buffer; buffers are applied to the shared system one well at a time.

use mw_core::{CellIndex, MAX_CELL_EQ};
use mw_fluids::{CellState, PvtService, RelPermService, lookup_cell};

use crate::error::{WellError, WellResult};

/// Read-only view of the reservoir used during well assembly.
#[derive(Clone, Copy)]
pub struct ReservoirContext<'a> {
    pub cells: &'a [CellState],
    pub pvt: &'a dyn PvtService,
    pub relperm: &'a dyn RelPermService,
    /// Gravitational acceleration [m/s²].
    pub gravity: f64,
}

impl<'a> ReservoirContext<'a> {
    pub fn new(
        cells: &'a [CellState],
        pvt: &'a dyn PvtService,
        relperm: &'a dyn RelPermService,
    ) -> Self {
        Self {
            cells,
            pvt,
            relperm,
            gravity: mw_core::constants::G0_MPS2,
        }
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn cell(&self, cell: CellIndex) -> WellResult<&'a CellState> {
        Ok(lookup_cell(self.cells, cell)?)
    }
}

/// Accumulation entry points of the global reservoir linear system.
///
/// Only diagonal blocks are touched: a perforation couples the well to a
/// single cell.
pub trait ReservoirSystem {
    fn num_cells(&self) -> usize;

    /// Equations per cell.
    fn num_eq(&self) -> usize;

    fn add_to_residual(&mut self, cell: CellIndex, eq: usize, value: f64) -> WellResult<()>;

    fn add_to_diagonal(&mut self, cell: CellIndex, eq: usize, pv: usize, value: f64)
    -> WellResult<()>;
}

/// Dense per-cell residual and diagonal Jacobian blocks.
///
/// Enough to drive a well in isolation; a full simulator implements
/// [`ReservoirSystem`] on its own matrix type.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDiagonalSystem {
    num_eq: usize,
    residual: Vec<f64>,
    diagonal: Vec<f64>,
}

impl BlockDiagonalSystem {
    pub fn new(num_cells: usize, num_eq: usize) -> Self {
        Self {
            num_eq,
            residual: vec![0.0; num_cells * num_eq],
            diagonal: vec![0.0; num_cells * num_eq * num_eq],
        }
    }

    /// Residual laid out as `cell * num_eq + eq`.
    pub fn residual(&self) -> &[f64] {
        &self.residual
    }

    pub fn residual_mut(&mut self) -> &mut [f64] {
        &mut self.residual
    }

    pub fn diagonal(&self, cell: CellIndex, eq: usize, pv: usize) -> f64 {
        self.diagonal[(cell * self.num_eq + eq) * self.num_eq + pv]
    }

    pub fn clear(&mut self) {
        self.residual.fill(0.0);
        self.diagonal.fill(0.0);
    }

    fn check(&self, cell: CellIndex, eq: usize) -> WellResult<()> {
        if cell >= self.num_cells() || eq >= self.num_eq {
            return Err(WellError::InvalidState {
                what: format!(
                    "cell equation ({cell}, {eq}) outside {} cells x {} equations",
                    self.num_cells(),
                    self.num_eq
                ),
            });
        }
        Ok(())
    }
}

impl ReservoirSystem for BlockDiagonalSystem {
    fn num_cells(&self) -> usize {
        self.residual.len() / self.num_eq.max(1)
    }

    fn num_eq(&self) -> usize {
        self.num_eq
    }

    fn add_to_residual(&mut self, cell: CellIndex, eq: usize, value: f64) -> WellResult<()> {
        self.check(cell, eq)?;
        self.residual[cell * self.num_eq + eq] += value;
        Ok(())
    }

    fn add_to_diagonal(
        &mut self,
        cell: CellIndex,
        eq: usize,
        pv: usize,
        value: f64,
    ) -> WellResult<()> {
        self.check(cell, eq)?;
        self.check(cell, pv)?;
        self.diagonal[(cell * self.num_eq + eq) * self.num_eq + pv] += value;
        Ok(())
    }
}

/// Contribution of one perforation to its cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellContribution {
    pub cell: CellIndex,
    pub residual: [f64; MAX_CELL_EQ],
    /// `jacobian[eq][pv]`.
    pub jacobian: [[f64; MAX_CELL_EQ]; MAX_CELL_EQ],
}

/// Private buffer of cell contributions collected by one well.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellContributions {
    entries: Vec<CellContribution>,
}

impl CellContributions {
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn push(&mut self, entry: CellContribution) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[CellContribution] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Accumulate every entry into `system`.
    pub fn apply_to(&self, system: &mut dyn ReservoirSystem) -> WellResult<()> {
        let num_eq = system.num_eq().min(MAX_CELL_EQ);
        for entry in &self.entries {
            for eq in 0..num_eq {
                system.add_to_residual(entry.cell, eq, entry.residual[eq])?;
                for pv in 0..num_eq {
                    system.add_to_diagonal(entry.cell, eq, pv, entry.jacobian[eq][pv])?;
                }
            }
        }
        Ok(())
    }
}
