//! Error types for the ordering and partitioning core.
//!
//! Every error here is fatal to the current ordering attempt: a malformed
//! header or a non-bijective permutation cannot succeed on retry, so callers
//! must abort or fall back to unordered factorization. A matrix that turns
//! out to have no usable block structure is *not* an error — see
//! [`crate::btf::BtfState::OrderedTrivial`].

use std::fmt;

/// Error taxonomy for BTF ordering and partitioning.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderError {
    /// Malformed compressed-column header (non-monotone column pointers,
    /// nnz mismatch, out-of-range row index, or an index that does not fit
    /// the requested integer width).
    InvalidMatrix { reason: String },
    /// Permutation array is not a bijection over [0, n): duplicate or
    /// out-of-range target.
    InvalidPermutation { reason: String },
    /// Size mismatch between the matrix and a permutation or block table.
    DimensionMismatch { expected: usize, got: usize },
    /// The partition scan produced a cut column outside [0, ncol).
    ColumnRangeError { scol: usize, ncol: usize },
    /// A materialized block has zero nonzeros where a non-degenerate block
    /// was expected (threshold misconfiguration).
    EmptyBlock { block: &'static str },
    /// Exact-size backing storage for a block could not be reserved.
    AllocationFailed { what: &'static str, len: usize },
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderError::InvalidMatrix { reason } => {
                write!(f, "invalid matrix: {}", reason)
            }
            OrderError::InvalidPermutation { reason } => {
                write!(f, "invalid permutation: {}", reason)
            }
            OrderError::DimensionMismatch { expected, got } => {
                write!(f, "dimension mismatch: expected {}, got {}", expected, got)
            }
            OrderError::ColumnRangeError { scol, ncol } => {
                write!(
                    f,
                    "partition cut column {} outside [0, {}); no trailing region",
                    scol, ncol
                )
            }
            OrderError::EmptyBlock { block } => {
                write!(f, "{} block has no nonzeros", block)
            }
            OrderError::AllocationFailed { what, len } => {
                write!(f, "failed to reserve {} entries for {}", len, what)
            }
        }
    }
}

impl std::error::Error for OrderError {}
