//! Block Triangular Form driver.
//!
//! Orchestrates the ordering pipeline: strong-connectivity discovery, then
//! in-place symmetric permutation of the matrix, then bookkeeping for the
//! partitioner. The driver owns no matrix — each stage takes the matrix
//! and its own inputs explicitly and hands results forward, so every stage
//! stays independently testable.
//!
//! ```text
//! Unordered ── discover_and_permute ──► Ordered ── break_into_parts ──► Partitioned
//!      │
//!      └────── (single component) ────► OrderedTrivial   (terminal, valid)
//! ```
//!
//! A matrix whose pattern digraph is one strongly connected component has
//! no usable block structure. That outcome is a status, not a failure: the
//! driver reports `OrderedTrivial`, the whole matrix is the single leading
//! block, and partitioning short-circuits.
//!
//! Calling `discover_and_permute` twice re-derives a (generally finer)
//! permutation of the already-permuted matrix; callers wanting one
//! ordering per solve must call it once.

use crate::amd::FillReducer;
use crate::error::OrderError;
use crate::matrix::{Entry, SparseMatrix};
use crate::options::SolverOptions;
use crate::partition::{break_into_parts, BtfPartition, CutStrategy};
use crate::permute::{compose_perm, permute_col, permute_row};
use crate::scc::{SccAlgorithm, TarjanScc};

/// Driver state, advanced only by the pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BtfState {
    /// No ordering applied yet.
    Unordered,
    /// BTF permutation applied, two or more diagonal blocks found.
    Ordered,
    /// Single irreducible block: the whole matrix is the leading block.
    /// Terminal and valid; partitioning short-circuits.
    OrderedTrivial,
    /// Partition outputs materialized.
    Partitioned,
}

/// Per-block pattern statistics recorded by the refinement pass for
/// downstream load balancing.
#[derive(Debug, Clone)]
pub struct BlockStats {
    /// Nonzeros inside each diagonal block.
    pub nnz: Vec<usize>,
    /// Factorization work estimate per block: sum over the block's
    /// columns of the squared within-block entry count. A flop proxy,
    /// monotone in both block size and density.
    pub work: Vec<usize>,
}

/// Bookkeeping produced by BTF discovery.
#[derive(Debug, Clone)]
pub struct BtfForm {
    pub state: BtfState,
    /// Number of irreducible diagonal blocks.
    pub nblks: usize,
    /// Block boundaries: block b spans columns [tabs[b], tabs[b+1]).
    pub tabs: Vec<usize>,
    /// True when a non-trivial block structure was found and applied.
    pub btf_active: bool,
    /// Composite permutation applied to the matrix, old index → new.
    /// Kept so a solution vector can be un-permuted later.
    pub perm: Vec<usize>,
    /// Filled by the within-block refinement pass; `None` otherwise.
    pub blk_stats: Option<BlockStats>,
}

impl BtfForm {
    /// Size of block b in columns.
    pub fn block_size(&self, b: usize) -> usize {
        self.tabs[b + 1] - self.tabs[b]
    }
}

/// Discover block-triangular structure and permute `m` into it in place.
///
/// Runs the strong-connectivity engine, applies the component permutation
/// symmetrically (columns, then rows), and records the block table. With a
/// [`FillReducer`] supplied, each diagonal block's columns are additionally
/// reordered for fill reduction and per-block statistics are recorded; the
/// core functions identically, just without fill reduction, when `refine`
/// is `None`.
pub fn discover_and_permute<E: Entry>(
    m: &mut SparseMatrix<E>,
    scc: &dyn SccAlgorithm<i64>,
    refine: Option<&dyn FillReducer<i64>>,
) -> Result<BtfForm, OrderError> {
    m.validate()?;
    if m.nrow != m.ncol {
        return Err(OrderError::DimensionMismatch {
            expected: m.nrow,
            got: m.ncol,
        });
    }

    let sc = scc.strong_components(m.ncol, &m.col_ptr, &m.row_idx)?;

    permute_col(m, &sc.perm)?;
    permute_row(m, &sc.perm)?;

    let mut form = BtfForm {
        state: if sc.nblks >= 2 {
            BtfState::Ordered
        } else {
            BtfState::OrderedTrivial
        },
        nblks: sc.nblks,
        tabs: sc.tabs,
        btf_active: sc.nblks >= 2,
        perm: sc.perm,
        blk_stats: None,
    };

    if let Some(reducer) = refine {
        refine_within_blocks(m, &mut form, reducer)?;
    }

    Ok(form)
}

/// Reorder each diagonal block's columns by the supplied fill reducer and
/// record per-block nnz and work estimates.
fn refine_within_blocks<E: Entry>(
    m: &mut SparseMatrix<E>,
    form: &mut BtfForm,
    reducer: &dyn FillReducer<i64>,
) -> Result<(), OrderError> {
    let n = m.ncol;
    // Identity outside the blocks; each block contributes its own
    // within-block reordering.
    let mut blk_perm: Vec<usize> = (0..n).collect();
    let mut blk_nnz = vec![0usize; form.nblks];
    let mut blk_work = vec![0usize; form.nblks];

    for b in 0..form.nblks {
        let s = form.tabs[b];
        let e = form.tabs[b + 1];
        let size = e - s;

        // Local pattern of the diagonal block: columns [s, e), rows
        // restricted to [s, e) and re-based to 0.
        let mut lap = vec![0i64; size + 1];
        let mut lai: Vec<i64> = Vec::new();
        for local in 0..size {
            let mut cnnz = 0usize;
            for i in m.col_range(s + local) {
                let r = m.row_idx[i] as usize;
                if r >= s && r < e {
                    lai.push((r - s) as i64);
                    cnnz += 1;
                }
            }
            lap[local + 1] = lai.len() as i64;
            blk_nnz[b] += cnnz;
            blk_work[b] += cnnz * cnnz;
        }

        if size > 1 {
            let local_perm = reducer.order(size, &lap, &lai)?;
            for local in 0..size {
                blk_perm[s + local] = s + local_perm[local];
            }
        }
    }

    permute_col(m, &blk_perm)?;
    permute_row(m, &blk_perm)?;

    form.perm = compose_perm(&form.perm, &blk_perm);
    form.blk_stats = Some(BlockStats {
        nnz: blk_nnz,
        work: blk_work,
    });
    Ok(())
}

/// Run the full pipeline: discovery, permutation, optional refinement, and
/// partitioning, all configured from `opts`.
pub fn order_and_partition<E: Entry>(
    m: &mut SparseMatrix<E>,
    opts: &SolverOptions,
) -> Result<(BtfForm, BtfPartition<E>), OrderError> {
    let scc = TarjanScc::new();
    let reducer = crate::amd::MinDegree::new();
    let refine: Option<&dyn FillReducer<i64>> = if opts.get_bool("btf_amd") {
        Some(&reducer)
    } else {
        None
    };

    let mut form = discover_and_permute(m, &scc, refine)?;

    let strategy = CutStrategy::from_options(opts);
    let partition = break_into_parts(m, &mut form, &strategy)?;

    Ok((form, partition))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_diag_4() -> SparseMatrix<f64> {
        // [ 1  2  .  . ]
        // [ 3  4  .  . ]
        // [ .  .  5  6 ]
        // [ .  .  7  8 ]
        SparseMatrix::from_csc(
            4,
            4,
            vec![0, 2, 4, 6, 8],
            vec![0, 1, 0, 1, 2, 3, 2, 3],
            vec![1.0, 3.0, 2.0, 4.0, 5.0, 7.0, 6.0, 8.0],
        )
        .unwrap()
    }

    #[test]
    fn test_discover_two_blocks() {
        let mut m = block_diag_4();
        let form = discover_and_permute(&mut m, &TarjanScc::new(), None).unwrap();

        assert_eq!(form.state, BtfState::Ordered);
        assert!(form.btf_active);
        assert_eq!(form.nblks, 2);
        assert_eq!(form.tabs, vec![0, 2, 4]);
        assert_eq!(m.nnz, 8);
        m.validate().unwrap();
    }

    #[test]
    fn test_trivial_single_component() {
        // 0 → 1 → 2 → 0 cycle: one irreducible block.
        let mut m = SparseMatrix::from_csc(
            3,
            3,
            vec![0, 2, 4, 6],
            vec![0, 1, 1, 2, 0, 2],
            vec![1.0; 6],
        )
        .unwrap();
        let form = discover_and_permute(&mut m, &TarjanScc::new(), None).unwrap();

        assert_eq!(form.state, BtfState::OrderedTrivial);
        assert!(!form.btf_active);
        assert_eq!(form.nblks, 1);
        assert_eq!(form.tabs, vec![0, 3]);
    }

    #[test]
    fn test_nonsquare_rejected() {
        let mut m =
            SparseMatrix::from_csc(3, 2, vec![0, 1, 2], vec![0, 2], vec![1.0, 2.0]).unwrap();
        let err = discover_and_permute(&mut m, &TarjanScc::new(), None).unwrap_err();
        assert!(matches!(err, OrderError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_malformed_header_leaves_matrix_untouched() {
        let mut m = block_diag_4();
        m.col_ptr[2] = 5;
        m.col_ptr[1] = 6; // non-monotone
        let before = m.clone();

        let err = discover_and_permute(&mut m, &TarjanScc::new(), None).unwrap_err();
        assert!(matches!(err, OrderError::InvalidMatrix { .. }));
        assert_eq!(m, before);
    }

    #[test]
    fn test_refinement_preserves_structure() {
        let mut m = block_diag_4();
        let reducer = crate::amd::MinDegree::new();
        let form =
            discover_and_permute(&mut m, &TarjanScc::new(), Some(&reducer)).unwrap();

        assert_eq!(form.nblks, 2);
        assert_eq!(m.nnz, 8);
        m.validate().unwrap();

        let stats = form.blk_stats.as_ref().expect("refinement records stats");
        assert_eq!(stats.nnz, vec![4, 4]);
        assert_eq!(stats.nnz.iter().sum::<usize>(), 8);
        // Each 2×2 block has two columns of two entries: work 2·4 = 8.
        assert_eq!(stats.work, vec![8, 8]);
    }

    #[test]
    fn test_permutation_recorded_for_unpermuting() {
        let mut m = block_diag_4();
        let original = m.clone();
        let form = discover_and_permute(&mut m, &TarjanScc::new(), None).unwrap();

        // Undo with the inverse of the recorded permutation.
        let inv = crate::permute::invert_perm(&form.perm);
        crate::permute::permute_col(&mut m, &inv).unwrap();
        crate::permute::permute_row(&mut m, &inv).unwrap();
        assert_eq!(m, original);
    }
}
