//! Compressed-column sparse matrix storage.
//!
//! The ordering core moves matrix entries around without ever doing
//! arithmetic on them, so the value type is a plain marker-bounded generic:
//! `f64` for DC/transient systems and `Complex64` for AC systems both work.
//!
//! A matrix can describe a *sub-view* of a larger permuted matrix: `srow` /
//! `scol` record where the view begins in the parent's coordinate system,
//! while the stored row indices are local to the view (in `[0, nrow)`).
//! The whole matrix is simply the view with `srow == scol == 0`.
//!
//! Storage follows a declare-then-fill discipline: `set_shape` records the
//! view geometry and the expected nnz without allocating; `fill` reserves
//! the exact-size col_ptr/row_idx/val triple and flips the `filled` flag.
//! Partitioning uses this to size each output block from a counting pass
//! before a single byte of block storage is touched.

use std::fmt;

use num_complex::Complex64;

use crate::error::OrderError;

/// Marker bound for matrix entry types. The core relocates entries; it
/// never adds or multiplies them.
pub trait Entry: Copy + Default + PartialEq + fmt::Debug + Send + 'static {}

impl Entry for f64 {}
impl Entry for Complex64 {}

/// Sparse matrix in compressed-column (CSC) form with a sub-view origin.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix<E: Entry> {
    /// First row of this view in the parent coordinate system.
    pub srow: usize,
    /// Number of rows.
    pub nrow: usize,
    /// First column of this view in the parent coordinate system.
    pub scol: usize,
    /// Number of columns.
    pub ncol: usize,
    /// Number of stored entries.
    pub nnz: usize,
    /// Column pointers, length ncol + 1 once filled.
    pub col_ptr: Vec<i64>,
    /// Row indices, local to the view: values in [0, nrow).
    pub row_idx: Vec<i64>,
    /// Entry values, parallel to `row_idx`.
    pub val: Vec<E>,
    /// Whether backing storage has been allocated.
    pub filled: bool,
}

impl<E: Entry> SparseMatrix<E> {
    /// An empty shape declaration. Call [`set_shape`](Self::set_shape) and
    /// [`fill`](Self::fill) before storing entries.
    pub fn new() -> Self {
        Self {
            srow: 0,
            nrow: 0,
            scol: 0,
            ncol: 0,
            nnz: 0,
            col_ptr: Vec::new(),
            row_idx: Vec::new(),
            val: Vec::new(),
            filled: false,
        }
    }

    /// Build a whole-matrix view from a validated CSC triple.
    pub fn from_csc(
        nrow: usize,
        ncol: usize,
        col_ptr: Vec<i64>,
        row_idx: Vec<i64>,
        val: Vec<E>,
    ) -> Result<Self, OrderError> {
        let m = Self {
            srow: 0,
            nrow,
            scol: 0,
            ncol,
            nnz: row_idx.len(),
            col_ptr,
            row_idx,
            val,
            filled: true,
        };
        m.validate()?;
        Ok(m)
    }

    /// Declare the view geometry without allocating storage.
    pub fn set_shape(&mut self, srow: usize, nrow: usize, scol: usize, ncol: usize) {
        self.srow = srow;
        self.nrow = nrow;
        self.scol = scol;
        self.ncol = ncol;
    }

    /// Reserve exact-size backing storage for the declared shape and `nnz`.
    ///
    /// The column-pointer array comes back zeroed with `col_ptr[0] == 0`;
    /// the caller writes the remaining pointers as it deposits entries.
    pub fn fill(&mut self) -> Result<(), OrderError> {
        if self.filled {
            return Ok(());
        }
        self.col_ptr = try_zeroed_i64(self.ncol + 1, "col_ptr")?;
        self.row_idx = try_zeroed_i64(self.nnz, "row_idx")?;
        let mut val = Vec::new();
        if val.try_reserve_exact(self.nnz).is_err() {
            return Err(OrderError::AllocationFailed {
                what: "val",
                len: self.nnz,
            });
        }
        val.resize(self.nnz, E::default());
        self.val = val;
        self.filled = true;
        Ok(())
    }

    /// Entry range of column `k` as indices into `row_idx` / `val`.
    pub fn col_range(&self, k: usize) -> std::ops::Range<usize> {
        self.col_ptr[k] as usize..self.col_ptr[k + 1] as usize
    }

    /// Check the CSC header invariant.
    ///
    /// Verifies pointer length, `col_ptr[0] == 0`, monotonicity,
    /// `col_ptr[ncol] == nnz`, array lengths, and that every row index is
    /// local to the view. Returns `InvalidMatrix` with a reason otherwise.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.col_ptr.len() != self.ncol + 1 {
            return Err(OrderError::InvalidMatrix {
                reason: format!(
                    "col_ptr length {} != ncol + 1 = {}",
                    self.col_ptr.len(),
                    self.ncol + 1
                ),
            });
        }
        if self.col_ptr[0] != 0 {
            return Err(OrderError::InvalidMatrix {
                reason: format!("col_ptr[0] = {} != 0", self.col_ptr[0]),
            });
        }
        for k in 0..self.ncol {
            if self.col_ptr[k + 1] < self.col_ptr[k] {
                return Err(OrderError::InvalidMatrix {
                    reason: format!(
                        "col_ptr not monotone at column {}: {} > {}",
                        k,
                        self.col_ptr[k],
                        self.col_ptr[k + 1]
                    ),
                });
            }
        }
        if self.col_ptr[self.ncol] as usize != self.nnz {
            return Err(OrderError::InvalidMatrix {
                reason: format!(
                    "col_ptr[ncol] = {} != nnz = {}",
                    self.col_ptr[self.ncol], self.nnz
                ),
            });
        }
        if self.row_idx.len() != self.nnz || self.val.len() != self.nnz {
            return Err(OrderError::InvalidMatrix {
                reason: format!(
                    "array lengths (row_idx {}, val {}) != nnz {}",
                    self.row_idx.len(),
                    self.val.len(),
                    self.nnz
                ),
            });
        }
        for (i, &r) in self.row_idx.iter().enumerate() {
            if r < 0 || r as usize >= self.nrow {
                return Err(OrderError::InvalidMatrix {
                    reason: format!(
                        "row index {} at position {} outside [0, {})",
                        r, i, self.nrow
                    ),
                });
            }
        }
        Ok(())
    }
}

impl<E: Entry> Default for SparseMatrix<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn try_zeroed_i64(len: usize, what: &'static str) -> Result<Vec<i64>, OrderError> {
    let mut v = Vec::new();
    if v.try_reserve_exact(len).is_err() {
        return Err(OrderError::AllocationFailed { what, len });
    }
    v.resize(len, 0);
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csc_valid() {
        // [ 1  0 ]
        // [ 2  3 ]
        let m = SparseMatrix::from_csc(2, 2, vec![0, 2, 3], vec![0, 1, 1], vec![1.0, 2.0, 3.0])
            .unwrap();
        assert_eq!(m.nnz, 3);
        assert!(m.filled);
        assert_eq!(m.col_range(0), 0..2);
        assert_eq!(m.col_range(1), 2..3);
    }

    #[test]
    fn test_non_monotone_col_ptr_rejected() {
        let err = SparseMatrix::from_csc(2, 2, vec![0, 2, 1], vec![0, 1], vec![1.0, 2.0])
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidMatrix { .. }));
    }

    #[test]
    fn test_nnz_mismatch_rejected() {
        let err = SparseMatrix::from_csc(2, 2, vec![0, 1, 3], vec![0, 1], vec![1.0, 2.0])
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidMatrix { .. }));
    }

    #[test]
    fn test_row_index_out_of_view_rejected() {
        let err = SparseMatrix::from_csc(2, 2, vec![0, 1, 2], vec![0, 2], vec![1.0, 2.0])
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidMatrix { .. }));
    }

    #[test]
    fn test_shape_then_fill() {
        let mut m: SparseMatrix<f64> = SparseMatrix::new();
        m.set_shape(3, 4, 3, 4);
        m.nnz = 5;
        assert!(!m.filled);
        m.fill().unwrap();
        assert!(m.filled);
        assert_eq!(m.col_ptr.len(), 5);
        assert_eq!(m.row_idx.len(), 5);
        assert_eq!(m.val.len(), 5);
        // fill is a no-op once storage exists
        m.fill().unwrap();
        assert_eq!(m.col_ptr.len(), 5);
    }

    #[test]
    fn test_complex_entries() {
        use num_complex::Complex64;
        let m = SparseMatrix::from_csc(
            2,
            2,
            vec![0, 1, 2],
            vec![0, 1],
            vec![Complex64::new(1.0, -1.0), Complex64::new(0.0, 2.0)],
        )
        .unwrap();
        assert_eq!(m.val[1], Complex64::new(0.0, 2.0));
    }
}
