//! Permutation validation and application.
//!
//! A permutation here always maps old index → new index. A symmetric
//! reordering is the composition of two independently testable passes:
//! [`permute_col`] relocates whole columns, then [`permute_row`] relabels
//! row indices in place. Both preserve the nonzero count exactly — each
//! output column is a relabeling, never a re-filter, of an input column.
//!
//! Column relocation builds fresh arrays and swaps them in only at the
//! end, so a rejected input leaves the caller's matrix untouched.

use crate::error::OrderError;
use crate::matrix::{Entry, SparseMatrix};

/// Check that `perm` is a bijection over [0, n).
pub fn check_perm(perm: &[usize], n: usize) -> Result<(), OrderError> {
    if perm.len() != n {
        return Err(OrderError::DimensionMismatch {
            expected: n,
            got: perm.len(),
        });
    }
    let mut seen = vec![false; n];
    for (i, &p) in perm.iter().enumerate() {
        if p >= n {
            return Err(OrderError::InvalidPermutation {
                reason: format!("perm[{}] = {} outside [0, {})", i, p, n),
            });
        }
        if seen[p] {
            return Err(OrderError::InvalidPermutation {
                reason: format!("target {} appears more than once", p),
            });
        }
        seen[p] = true;
    }
    Ok(())
}

/// Invert an old→new permutation into its new→old counterpart.
pub fn invert_perm(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0usize; perm.len()];
    for (old, &new) in perm.iter().enumerate() {
        inv[new] = old;
    }
    inv
}

/// Compose two old→new permutations: apply `first`, then `then`.
pub fn compose_perm(first: &[usize], then: &[usize]) -> Vec<usize> {
    first.iter().map(|&mid| then[mid]).collect()
}

/// Relocate columns: old column k becomes new column `perm[k]`.
pub fn permute_col<E: Entry>(
    m: &mut SparseMatrix<E>,
    perm: &[usize],
) -> Result<(), OrderError> {
    check_perm(perm, m.ncol)?;
    m.validate()?;

    let ncol = m.ncol;
    let mut new_col_ptr = vec![0i64; ncol + 1];
    for k in 0..ncol {
        let count = m.col_ptr[k + 1] - m.col_ptr[k];
        new_col_ptr[perm[k] + 1] = count;
    }
    for k in 0..ncol {
        new_col_ptr[k + 1] += new_col_ptr[k];
    }

    let mut new_row_idx = vec![0i64; m.nnz];
    let mut new_val = vec![E::default(); m.nnz];
    for k in 0..ncol {
        let src = m.col_range(k);
        let mut dst = new_col_ptr[perm[k]] as usize;
        for i in src {
            new_row_idx[dst] = m.row_idx[i];
            new_val[dst] = m.val[i];
            dst += 1;
        }
    }

    m.col_ptr = new_col_ptr;
    m.row_idx = new_row_idx;
    m.val = new_val;
    Ok(())
}

/// Relabel row indices in place: row r becomes row `perm[r]`.
pub fn permute_row<E: Entry>(
    m: &mut SparseMatrix<E>,
    perm: &[usize],
) -> Result<(), OrderError> {
    check_perm(perm, m.nrow)?;
    m.validate()?;

    for r in m.row_idx.iter_mut() {
        *r = perm[*r as usize] as i64;
    }
    Ok(())
}
