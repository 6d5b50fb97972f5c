//! Block-triangular ordering and partitioning core for a sparse direct
//! LU solver.
//!
//! Given a square sparse matrix in compressed-column form, this crate
//! finds the permutation exposing its block upper triangular structure
//! (strongly connected components of the pattern digraph), applies it in
//! place, and splits the permuted matrix at a heuristically chosen cut
//! into a triangular-solve-friendly leading region and an upper/lower
//! trailing pair destined for multithreaded factorization.
//!
//! ```text
//! matrix ──► strong connectivity ──► permute (cols, rows) ──► partition
//!                 (scc.rs)              (permute.rs)        (partition.rs)
//! ```
//!
//! The crate is purely structural: no pivoting, no numeric factors, no
//! arithmetic on matrix values. Downstream factorization receives exactly
//! three sparse matrices plus the cut bookkeeping and owns everything
//! numeric.
//!
//! # Usage
//!
//! ```ignore
//! use slu_core::{order_and_partition, SolverOptions, SparseMatrix};
//!
//! let mut m = SparseMatrix::from_csc(n, n, col_ptr, row_idx, val)?;
//! let opts = SolverOptions::new();
//! let (form, parts) = order_and_partition(&mut m, &opts)?;
//!
//! println!("{} blocks, cut at column {}", form.nblks, parts.scol);
//! ```
//!
//! All stages are single-threaded and blocking; the matrix is exclusively
//! owned by the caller for the duration. The point of the exercise is to
//! manufacture independent units of work for the parallel stage that runs
//! afterwards.

pub mod amd;
pub mod btf;
pub mod error;
pub mod matrix;
pub mod options;
pub mod partition;
pub mod permute;
pub mod scc;

pub use amd::{FillReducer, MinDegree};
pub use btf::{discover_and_permute, order_and_partition, BlockStats, BtfForm, BtfState};
pub use error::OrderError;
pub use matrix::{Entry, SparseMatrix};
pub use options::SolverOptions;
pub use partition::{break_into_parts, BtfPartition, CutStrategy};
pub use scc::{IndexInt, SccAlgorithm, SccResult, TarjanScc};
