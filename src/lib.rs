//! Sparse symmetric linear systems solved by LDL^T factorization.
//!
//! This crate factors a symmetric matrix A, given as the lower-triangular
//! part of its sparsity pattern plus values, into `P A P^T = L D L^T` and
//! solves `A x = b` in place. The pipeline runs in fixed stages, each an
//! owned, reusable object:
//!
//! - [`IndexSet`] validates the lower-triangular, column-major pattern.
//! - [`Ordering`] computes a fill-reducing permutation (or wraps one the
//!   caller supplies).
//! - [`OrderedIndexSet`] re-expresses the pattern in permuted coordinates.
//! - [`AssemblyTree`] builds the elimination tree that schedules the
//!   numeric phase.
//! - [`LdltFactorization`] runs the pivoted numeric factorization under
//!   [`FactorizationSettings`] and performs the in-place triangular solve.
//!
//! The structural stages depend only on the pattern; for matrices with a
//! static pattern and changing values, only the factorization is re-run.
//! [`SymmetricSolver`] bundles the whole chain behind one type and reuses
//! allocations across factorizations and solves.
//!
//! Example:
//! ```rust
//! use sparse_ldlt::{IndexSet, SolverOptions, SymmetricSolver};
//!
//! // Lower triangle of [[4, 1], [1, 3]], column major.
//! let pattern = IndexSet::new(2, vec![0, 1, 1], vec![0, 0, 1], true)?;
//! let mut solver = SymmetricSolver::new(pattern, &SolverOptions::default())?;
//! solver.factorize(&[4.0, 1.0, 3.0], None)?;
//!
//! // In place: x holds the right-hand side going in, the solution coming out.
//! let mut x = vec![9.0, 10.0];
//! solver.solve_in_place(&mut x)?;
//! assert!((x[0] - 17.0 / 11.0).abs() < 1e-12);
//! assert!((x[1] - 31.0 / 11.0).abs() < 1e-12);
//! # Ok::<(), sparse_ldlt::SolverError>(())
//! ```

mod factor;
mod ordered;
mod ordering;
mod pattern;
mod report;
mod solver;
mod tree;

pub use factor::{
    FactorError, FactorizationSettings, LdltFactorization, SettingsError, SolveError,
    DEFAULT_PIVOT_TOLERANCE,
};
pub use ordered::{OrderedError, OrderedIndexSet};
pub use ordering::{Ordering, OrderingError};
pub use pattern::{IndexSet, PatternError};
pub use report::{FactorStats, Reporter, StageReport, StdoutReporter};
pub use solver::{SolverError, SolverOptions, SymmetricSolver};
pub use tree::{AssemblyTree, TreeError};
