//! Block partitioner.
//!
//! Splits a BTF-permuted matrix at a single cut column `scol` into three
//! regions for the two-phase factorization downstream:
//!
//! ```text
//!        scol
//!         │
//! ┌───────┼────────┐
//! │       │        │
//! │  A    │   B    │   A: leading block, columns [0, scol), triangular-
//! │       │        │      dominant, handled by sequential block solves
//! ├───────┼────────┤   B: upper-trailing coupling, rows [0, scol)
//! │       │        │   C: lower-trailing block, rows/cols [scol, ncol),
//! │  0    │   C    │      the "hard" part handed to the parallel
//! │       │        │      factorization stage
//! └───────┴────────┘
//! ```
//!
//! The cut is chosen by a greedy backward walk over the block table:
//! starting from the last block, blocks keep folding into the trailing
//! region while the stopping predicate allows it. The predicate is
//! pluggable ([`CutStrategy`]): a size/percentage threshold pair, or a
//! work-estimate target derived from the worker count. Same walk, same
//! materialization, different predicate — the two variants cannot drift.
//!
//! Materialization is allocation-exact: a counting pass sizes the upper
//! and lower trailing blocks, storage is reserved once, and a second pass
//! deposits the entries. Lower-trailing row indices are re-based by
//! `-scol` so that block's coordinate system starts at 0.

use crate::btf::{BtfForm, BtfState};
use crate::error::OrderError;
use crate::matrix::{Entry, SparseMatrix};
use crate::options::SolverOptions;

/// Stopping predicate for the backward cut scan.
///
/// Both variants run through the identical scan loop; only the fold
/// decision differs.
#[derive(Debug, Clone, PartialEq)]
pub enum CutStrategy {
    /// Fold a block while it is smaller than `btf_large` and the columns
    /// already folded stay below `max_percent` of the matrix.
    Threshold { btf_large: usize, max_percent: f64 },
    /// Fold a block while it is smaller than the per-worker column target
    /// `(ncol + ncol · imbalance) / num_threads`.
    WorkBalanced { num_threads: usize, imbalance: f64 },
}

impl CutStrategy {
    /// Build the strategy selected by `btf_part_method`.
    pub fn from_options(opts: &SolverOptions) -> Self {
        match opts.get_string("btf_part_method") {
            "work" => CutStrategy::WorkBalanced {
                num_threads: opts.get_int("thread_count").max(1) as usize,
                imbalance: opts.get_float("imbalance_tolerance"),
            },
            _ => CutStrategy::Threshold {
                btf_large: opts.get_int("btf_large").max(1) as usize,
                max_percent: opts.get_float("btf_max_percent"),
            },
        }
    }

    /// Strategy name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            CutStrategy::Threshold { .. } => "threshold",
            CutStrategy::WorkBalanced { .. } => "work-balanced",
        }
    }

    /// Whether to fold a block of `blk_size` columns given `t_size`
    /// columns already in the trailing region.
    fn should_fold(&self, blk_size: usize, t_size: usize, ncol: usize) -> bool {
        match *self {
            CutStrategy::Threshold {
                btf_large,
                max_percent,
            } => blk_size < btf_large && (t_size as f64 / ncol as f64) < max_percent,
            CutStrategy::WorkBalanced {
                num_threads,
                imbalance,
            } => {
                let break_size =
                    ((ncol as f64 + ncol as f64 * imbalance) / num_threads as f64) as usize;
                blk_size < break_size
            }
        }
    }

    /// Exact-100% fallback, checked once when the scan stops: if folding
    /// the refused block would make the trailing region the whole matrix,
    /// consume it and cut at column 0. Only reachable when the stop came
    /// from the size test — a percentage stop keeps its cut.
    fn fold_remainder(&self, blk_size: usize, t_size: usize, ncol: usize) -> bool {
        let whole = (t_size + blk_size) as f64 / ncol as f64 == 1.0;
        match *self {
            CutStrategy::Threshold { max_percent, .. } => {
                whole && (t_size as f64 / ncol as f64) < max_percent
            }
            CutStrategy::WorkBalanced { .. } => whole,
        }
    }
}

/// Result of partitioning: three disjoint CSC regions whose union is the
/// permuted input, plus the cut bookkeeping downstream consumers need.
///
/// Degenerate outcomes leave the absent regions as unfilled shape
/// declarations (`filled == false`): trivial BTF materializes only
/// `leading`; an all-trailing cut (`scol == 0`) materializes only `lower`.
#[derive(Debug, Clone)]
pub struct BtfPartition<E: Entry> {
    /// Square leading block, columns [0, scol).
    pub leading: SparseMatrix<E>,
    /// Upper-trailing coupling block: rows [0, scol), columns [scol, ncol).
    pub upper: SparseMatrix<E>,
    /// Lower-trailing block: rows and columns [scol, ncol), row indices
    /// re-based to start at 0.
    pub lower: SparseMatrix<E>,
    /// The cut column.
    pub scol: usize,
    /// Number of leading blocks kept out of the trailing region; blocks
    /// [blk_offset, nblks) were absorbed into it.
    pub blk_offset: usize,
}

/// Choose the cut column and materialize the three regions.
///
/// `form` must come from [`crate::btf::discover_and_permute`] on the same
/// matrix; its state advances to `Partitioned`.
pub fn break_into_parts<E: Entry>(
    m: &SparseMatrix<E>,
    form: &mut BtfForm,
    strategy: &CutStrategy,
) -> Result<BtfPartition<E>, OrderError> {
    m.validate()?;
    if form.tabs.len() != form.nblks + 1 {
        return Err(OrderError::DimensionMismatch {
            expected: form.nblks + 1,
            got: form.tabs.len(),
        });
    }
    if form.tabs[form.nblks] != m.ncol {
        return Err(OrderError::DimensionMismatch {
            expected: m.ncol,
            got: form.tabs[form.nblks],
        });
    }

    // Short circuit: a single irreducible block is the leading block,
    // whole. Nothing to scan, nothing trailing.
    if form.nblks == 1 {
        form.state = BtfState::Partitioned;
        return Ok(BtfPartition {
            leading: m.clone(),
            upper: SparseMatrix::new(),
            lower: SparseMatrix::new(),
            scol: m.ncol,
            blk_offset: 1,
        });
    }

    let ncol = m.ncol;

    // Step 1: walk the block table backward to find the cut.
    let mut t_size = 0usize;
    let mut scol = ncol;
    let mut blk_idx = form.nblks;
    loop {
        let blk_size = form.tabs[blk_idx] - form.tabs[blk_idx - 1];

        if strategy.should_fold(blk_size, t_size, ncol) {
            t_size += blk_size;
            blk_idx -= 1;
            scol = form.tabs[blk_idx];
            if blk_idx == 0 {
                break;
            }
        } else {
            if strategy.fold_remainder(blk_size, t_size, ncol) {
                blk_idx = 0;
                t_size += blk_size;
                scol = form.tabs[0];
            }
            break;
        }
    }

    if scol >= ncol {
        return Err(OrderError::ColumnRangeError { scol, ncol });
    }

    let blk_offset = blk_idx;

    // Step 2: materialize the three regions.
    let mut leading: SparseMatrix<E> = SparseMatrix::new();
    if blk_offset != 0 {
        leading.set_shape(0, scol, 0, scol);
        leading.nnz = m.col_ptr[scol] as usize;
        if leading.nnz == 0 {
            return Err(OrderError::EmptyBlock { block: "leading" });
        }
        leading.fill()?;

        // Straight prefix copy: leading rows and columns already start
        // at 0, so nothing is renumbered.
        let mut annz = 0usize;
        for k in 0..scol {
            for i in m.col_range(k) {
                leading.row_idx[annz] = m.row_idx[i];
                leading.val[annz] = m.val[i];
                annz += 1;
            }
            leading.col_ptr[k + 1] = annz as i64;
        }
    }

    let tcol = ncol - scol;
    let mut upper: SparseMatrix<E> = SparseMatrix::new();
    upper.set_shape(0, scol, scol, tcol);
    let mut lower: SparseMatrix<E> = SparseMatrix::new();
    lower.set_shape(scol, tcol, scol, tcol);

    // Pass 1: count, so each block is allocated exactly once.
    let mut bnnz = 0usize;
    let mut cnnz = 0usize;
    for k in scol..ncol {
        for i in m.col_range(k) {
            if (m.row_idx[i] as usize) < scol {
                bnnz += 1;
            } else {
                cnnz += 1;
            }
        }
    }
    upper.nnz = bnnz;
    lower.nnz = cnnz;

    if cnnz == 0 {
        return Err(OrderError::EmptyBlock {
            block: "lower-trailing",
        });
    }
    if bnnz > 0 {
        upper.fill()?;
    }
    lower.fill()?;

    // Pass 2: deposit entries into the pre-sized arrays.
    bnnz = 0;
    cnnz = 0;
    for k in scol..ncol {
        for i in m.col_range(k) {
            let r = m.row_idx[i] as usize;
            if r < scol {
                // Upper block rows start at 0: no offset.
                upper.row_idx[bnnz] = r as i64;
                upper.val[bnnz] = m.val[i];
                bnnz += 1;
            } else {
                // Re-base into the lower block's own coordinate system.
                lower.row_idx[cnnz] = (r - scol) as i64;
                lower.val[cnnz] = m.val[i];
                cnnz += 1;
            }
        }
        if upper.filled {
            upper.col_ptr[k - scol + 1] = bnnz as i64;
        }
        lower.col_ptr[k - scol + 1] = cnnz as i64;
    }

    form.state = BtfState::Partitioned;

    Ok(BtfPartition {
        leading,
        upper,
        lower,
        scol,
        blk_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btf::discover_and_permute;
    use crate::scc::TarjanScc;

    fn threshold(btf_large: usize, max_percent: f64) -> CutStrategy {
        CutStrategy::Threshold {
            btf_large,
            max_percent,
        }
    }

    /// 6×6 with two dense 3×3 diagonal blocks and one coupling entry so
    /// the partition has an upper-trailing nonzero to place.
    fn two_block_6x6() -> (SparseMatrix<f64>, BtfForm) {
        let n = 6;
        let mut col_ptr = vec![0i64];
        let mut row_idx = Vec::new();
        let mut val = Vec::new();
        let mut v = 1.0f64;
        for c in 0..n {
            let (lo, hi) = if c < 3 { (0, 3) } else { (3, 6) };
            for r in lo..hi {
                row_idx.push(r as i64);
                val.push(v);
                v += 1.0;
            }
            // one coupling entry from the first block's rows into the
            // second block's first column
            if c == 3 {
                row_idx.push(0);
                val.push(99.0);
            }
            col_ptr.push(row_idx.len() as i64);
        }
        let mut m = SparseMatrix::from_csc(n, n, col_ptr, row_idx, val).unwrap();
        let form = discover_and_permute(&mut m, &TarjanScc::new(), None).unwrap();
        assert_eq!(form.nblks, 2);
        assert_eq!(form.tabs, vec![0, 3, 6]);
        (m, form)
    }

    fn check_invariants(m: &SparseMatrix<f64>, p: &BtfPartition<f64>) {
        let total = p.leading.nnz + p.upper.nnz + p.lower.nnz;
        assert_eq!(total, m.nnz, "partition drops or duplicates nonzeros");
        if p.leading.filled {
            p.leading.validate().unwrap();
        }
        if p.upper.filled {
            p.upper.validate().unwrap();
        }
        if p.lower.filled {
            p.lower.validate().unwrap();
        }
    }

    #[test]
    fn test_two_blocks_cut_after_one_fold() {
        // Folding the 3-column last block brings the trailing fraction to
        // 3/6 = 0.5, which is no longer < 0.5, so the second block stays.
        let (m, mut form) = two_block_6x6();
        let p = break_into_parts(&m, &mut form, &threshold(10, 0.5)).unwrap();

        assert_eq!(p.scol, 3);
        assert_eq!(p.blk_offset, 1);
        assert_eq!(form.state, BtfState::Partitioned);
        assert_eq!(p.leading.nrow, 3);
        assert_eq!(p.leading.ncol, 3);
        assert_eq!(p.upper.nrow, 3);
        assert_eq!(p.upper.ncol, 3);
        assert_eq!(p.lower.srow, 3);
        assert_eq!(p.lower.nrow, 3);
        check_invariants(&m, &p);

        // All lower rows re-based into [0, 3)
        for &r in &p.lower.row_idx {
            assert!((0..3).contains(&(r as usize)));
        }
        // The coupling entry landed in the upper block
        assert_eq!(p.upper.nnz, 1);
        assert_eq!(p.lower.nnz, 9);
        assert_eq!(p.leading.nnz, 9);
    }

    #[test]
    fn test_generous_thresholds_fold_everything() {
        let (m, mut form) = two_block_6x6();
        let p = break_into_parts(&m, &mut form, &threshold(100, 1.0)).unwrap();

        assert_eq!(p.scol, 0);
        assert_eq!(p.blk_offset, 0);
        assert!(!p.leading.filled, "no leading block when scol == 0");
        assert!(!p.upper.filled, "upper has no rows when scol == 0");
        assert_eq!(p.lower.nnz, m.nnz);
        check_invariants(&m, &p);
    }

    #[test]
    fn test_oversized_last_block_is_a_range_error() {
        // btf_large = 1 refuses even the last block: nothing trails.
        let (m, mut form) = two_block_6x6();
        let err = break_into_parts(&m, &mut form, &threshold(1, 0.5)).unwrap_err();
        assert!(matches!(
            err,
            OrderError::ColumnRangeError { scol: 6, ncol: 6 }
        ));
    }

    #[test]
    fn test_exact_full_fallback_from_size_stop() {
        // A dense 6×6 block feeding two trailing singletons. The walk
        // folds both singletons, the size test refuses the 6-wide block,
        // and with the percent budget still open, folding it would make
        // the trailing region exactly the whole matrix — so everything
        // folds and the cut lands at column 0.
        let n = 8;
        let mut col_ptr = vec![0i64];
        let mut row_idx = Vec::new();
        for _c in 0..6 {
            for r in 0..6 {
                row_idx.push(r as i64);
            }
            col_ptr.push(row_idx.len() as i64);
        }
        for c in 6..8 {
            // diagonal entry plus coupling from the dense block's rows,
            // which pins the singletons after the block topologically
            row_idx.push(0);
            row_idx.push(c as i64);
            col_ptr.push(row_idx.len() as i64);
        }
        let val = vec![1.0; row_idx.len()];
        let mut m = SparseMatrix::from_csc(n, n, col_ptr, row_idx, val).unwrap();
        let mut form = discover_and_permute(&mut m, &TarjanScc::new(), None).unwrap();
        assert_eq!(form.nblks, 3);
        assert_eq!(form.tabs, vec![0, 6, 7, 8]);

        let p = break_into_parts(&m, &mut form, &threshold(5, 1.0)).unwrap();
        assert_eq!(p.scol, 0);
        assert_eq!(p.blk_offset, 0);
        assert_eq!(p.lower.nnz, m.nnz);
    }

    #[test]
    fn test_diagonal_matrix_concrete_boundary() {
        // 8×8 diagonal: eight singleton blocks. With max_percent = 0.5
        // the walk folds four singletons (fractions 0, 1/8, 2/8, 3/8 all
        // < 0.5) and stops when the folded fraction reaches 4/8.
        let n = 8;
        let col_ptr: Vec<i64> = (0..=n as i64).collect();
        let row_idx: Vec<i64> = (0..n as i64).collect();
        let val = vec![1.0; n];
        let mut m = SparseMatrix::from_csc(n, n, col_ptr, row_idx, val).unwrap();
        let mut form = discover_and_permute(&mut m, &TarjanScc::new(), None).unwrap();
        assert_eq!(form.nblks, n);

        let p = break_into_parts(&m, &mut form, &threshold(10, 0.5)).unwrap();
        assert_eq!(p.scol, 4);
        assert_eq!(p.blk_offset, 4);
        assert_eq!(p.leading.nnz, 4);
        assert_eq!(p.lower.nnz, 4);
        assert_eq!(p.upper.nnz, 0);
        assert!(!p.upper.filled, "empty upper block stays a shape");
        check_invariants(&m, &p);
    }

    #[test]
    fn test_trivial_short_circuit() {
        // One irreducible block: leading is the whole matrix.
        let mut m = SparseMatrix::from_csc(
            3,
            3,
            vec![0, 2, 4, 6],
            vec![0, 1, 1, 2, 0, 2],
            vec![1.0; 6],
        )
        .unwrap();
        let mut form = discover_and_permute(&mut m, &TarjanScc::new(), None).unwrap();
        assert_eq!(form.nblks, 1);

        let p = break_into_parts(&m, &mut form, &threshold(10, 0.5)).unwrap();
        assert_eq!(p.scol, 3);
        assert_eq!(p.blk_offset, 1);
        assert_eq!(p.leading, m);
        assert!(!p.upper.filled);
        assert!(!p.lower.filled);
        assert_eq!(form.state, BtfState::Partitioned);
    }

    #[test]
    fn test_work_balanced_strategy() {
        // Two threads, 10% imbalance, 6 columns: per-worker target
        // (6 + 0.6) / 2 truncates to 3, so a 3-wide block never folds and
        // the scan refuses to cut. One thread raises the target to 6 and
        // both blocks fold, cutting at column 0.
        let (m, mut form) = two_block_6x6();
        let err = break_into_parts(
            &m,
            &mut form,
            &CutStrategy::WorkBalanced {
                num_threads: 2,
                imbalance: 0.1,
            },
        )
        .unwrap_err();
        assert!(matches!(err, OrderError::ColumnRangeError { .. }));

        let (m, mut form) = two_block_6x6();
        let p = break_into_parts(
            &m,
            &mut form,
            &CutStrategy::WorkBalanced {
                num_threads: 1,
                imbalance: 0.1,
            },
        )
        .unwrap();
        assert_eq!(p.scol, 0);
        check_invariants(&m, &p);
    }

    #[test]
    fn test_tabs_mismatch_rejected() {
        let (m, mut form) = two_block_6x6();
        form.tabs = vec![0, 3, 5]; // does not reach ncol
        let err = break_into_parts(&m, &mut form, &threshold(10, 0.5)).unwrap_err();
        assert!(matches!(err, OrderError::DimensionMismatch { .. }));
    }
}
