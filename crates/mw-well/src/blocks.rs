//! Block-sparse matrices over segments and cells.
//!
//! The sparsity pattern is fixed when the well is initialised; assembly only
//! accumulates into existing blocks, so no allocation happens per iteration.

use nalgebra::DMatrix;

use crate::error::{WellError, WellResult};

/// Block compressed-row matrix with `br × bc` dense blocks.
///
/// Blocks are stored row-major inside one flat buffer; block `k` starts at
/// `k * br * bc` and entry `(i, j)` of it sits at `i * bc + j`.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMatrix {
    num_rows: usize,
    num_cols: usize,
    br: usize,
    bc: usize,
    row_start: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl BlockMatrix {
    /// Build a zero matrix with the given column pattern per block row.
    /// Duplicate columns are merged.
    pub fn from_pattern(
        num_rows: usize,
        num_cols: usize,
        br: usize,
        bc: usize,
        pattern: Vec<Vec<usize>>,
    ) -> WellResult<Self> {
        if pattern.len() != num_rows {
            return Err(WellError::InvalidState {
                what: format!("pattern has {} rows, expected {num_rows}", pattern.len()),
            });
        }
        let mut row_start = Vec::with_capacity(num_rows + 1);
        let mut cols = Vec::new();
        row_start.push(0);
        for mut row in pattern {
            row.sort_unstable();
            row.dedup();
            if let Some(&last) = row.last() {
                if last >= num_cols {
                    return Err(WellError::InvalidState {
                        what: format!("block column {last} outside {num_cols} columns"),
                    });
                }
            }
            cols.extend(row);
            row_start.push(cols.len());
        }
        let values = vec![0.0; cols.len() * br * bc];
        Ok(Self {
            num_rows,
            num_cols,
            br,
            bc,
            row_start,
            cols,
            values,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Block dimensions `(rows, cols)`.
    pub fn block_size(&self) -> (usize, usize) {
        (self.br, self.bc)
    }

    pub fn nnz_blocks(&self) -> usize {
        self.cols.len()
    }

    /// Column indices of the stored blocks in `row`.
    pub fn row_pattern(&self, row: usize) -> &[usize] {
        &self.cols[self.row_start[row]..self.row_start[row + 1]]
    }

    fn position(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.num_rows {
            return None;
        }
        let start = self.row_start[row];
        self.row_pattern(row)
            .binary_search(&col)
            .ok()
            .map(|k| start + k)
    }

    pub fn block(&self, row: usize, col: usize) -> Option<&[f64]> {
        let size = self.br * self.bc;
        self.position(row, col)
            .map(|k| &self.values[k * size..(k + 1) * size])
    }

    pub fn block_mut(&mut self, row: usize, col: usize) -> Option<&mut [f64]> {
        let size = self.br * self.bc;
        let k = self.position(row, col)?;
        Some(&mut self.values[k * size..(k + 1) * size])
    }

    /// Entry `(i, j)` of block `(row, col)`, zero outside the pattern.
    pub fn get(&self, row: usize, col: usize, i: usize, j: usize) -> f64 {
        self.block(row, col).map_or(0.0, |b| b[i * self.bc + j])
    }

    /// Accumulate into entry `(i, j)` of block `(row, col)`.
    pub fn add(&mut self, row: usize, col: usize, i: usize, j: usize, v: f64) -> WellResult<()> {
        let bc = self.bc;
        let block = self
            .block_mut(row, col)
            .ok_or_else(|| WellError::InvalidState {
                what: format!("block ({row}, {col}) is not in the sparsity pattern"),
            })?;
        block[i * bc + j] += v;
        Ok(())
    }

    /// Overwrite entry `(i, j)` of block `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, i: usize, j: usize, v: f64) -> WellResult<()> {
        let bc = self.bc;
        let block = self
            .block_mut(row, col)
            .ok_or_else(|| WellError::InvalidState {
                what: format!("block ({row}, {col}) is not in the sparsity pattern"),
            })?;
        block[i * bc + j] = v;
        Ok(())
    }

    /// Zero all stored blocks, keeping the pattern.
    pub fn clear(&mut self) {
        self.values.fill(0.0);
    }

    fn check_len(&self, what: &str, len: usize, expected: usize) -> WellResult<()> {
        if len == expected {
            Ok(())
        } else {
            Err(WellError::InvalidState {
                what: format!("{what} has length {len}, expected {expected}"),
            })
        }
    }

    /// `y += A x`.
    pub fn umv(&self, x: &[f64], y: &mut [f64]) -> WellResult<()> {
        self.check_len("x", x.len(), self.num_cols * self.bc)?;
        self.check_len("y", y.len(), self.num_rows * self.br)?;
        let size = self.br * self.bc;
        for row in 0..self.num_rows {
            for k in self.row_start[row]..self.row_start[row + 1] {
                let col = self.cols[k];
                let block = &self.values[k * size..(k + 1) * size];
                for i in 0..self.br {
                    let mut sum = 0.0;
                    for j in 0..self.bc {
                        sum += block[i * self.bc + j] * x[col * self.bc + j];
                    }
                    y[row * self.br + i] += sum;
                }
            }
        }
        Ok(())
    }

    /// `y = A x`.
    pub fn mv(&self, x: &[f64], y: &mut [f64]) -> WellResult<()> {
        y.fill(0.0);
        self.umv(x, y)
    }

    /// `y -= A x`.
    pub fn mmv(&self, x: &[f64], y: &mut [f64]) -> WellResult<()> {
        let mut ax = vec![0.0; y.len()];
        self.umv(x, &mut ax)?;
        for (yi, axi) in y.iter_mut().zip(&ax) {
            *yi -= axi;
        }
        Ok(())
    }

    /// `y -= Aᵀ x`.
    pub fn mmtv(&self, x: &[f64], y: &mut [f64]) -> WellResult<()> {
        self.check_len("x", x.len(), self.num_rows * self.br)?;
        self.check_len("y", y.len(), self.num_cols * self.bc)?;
        let size = self.br * self.bc;
        for row in 0..self.num_rows {
            for k in self.row_start[row]..self.row_start[row + 1] {
                let col = self.cols[k];
                let block = &self.values[k * size..(k + 1) * size];
                for j in 0..self.bc {
                    let mut sum = 0.0;
                    for i in 0..self.br {
                        sum += block[i * self.bc + j] * x[row * self.br + i];
                    }
                    y[col * self.bc + j] -= sum;
                }
            }
        }
        Ok(())
    }

    /// Expand into a dense matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.num_rows * self.br, self.num_cols * self.bc);
        let size = self.br * self.bc;
        for row in 0..self.num_rows {
            for k in self.row_start[row]..self.row_start[row + 1] {
                let col = self.cols[k];
                let block = &self.values[k * size..(k + 1) * size];
                for i in 0..self.br {
                    for j in 0..self.bc {
                        dense[(row * self.br + i, col * self.bc + j)] = block[i * self.bc + j];
                    }
                }
            }
        }
        dense
    }
}
