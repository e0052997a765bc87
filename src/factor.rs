use core::fmt;

use crate::ordered::OrderedIndexSet;
use crate::ordering::Ordering;
use crate::tree::AssemblyTree;

/// Default pivot tolerance used by [`FactorizationSettings::default`].
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-8;

/// Numeric tuning knobs for the factorization.
///
/// Independent of any specific matrix; may be reused across many
/// factorizations and shared read-only between pipelines.
#[derive(Debug, Clone)]
pub struct FactorizationSettings {
    pivot_tolerance: f64,
}

/// Errors when mutating settings.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// Pivot tolerance must be finite and strictly positive.
    InvalidTolerance { value: f64 },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTolerance { value } => {
                write!(f, "pivot tolerance must be finite and positive (got {value})")
            }
        }
    }
}

impl std::error::Error for SettingsError {}

impl Default for FactorizationSettings {
    fn default() -> Self {
        Self {
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
        }
    }
}

impl FactorizationSettings {
    /// Current pivot tolerance.
    pub fn pivot_tolerance(&self) -> f64 {
        self.pivot_tolerance
    }

    /// Sets the pivot tolerance.
    ///
    /// A pivot whose magnitude falls below `tolerance * max |diag(A)|` is
    /// treated as numerically unsafe and fails the factorization.
    pub fn set_pivot_tolerance(&mut self, tolerance: f64) -> Result<(), SettingsError> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(SettingsError::InvalidTolerance { value: tolerance });
        }
        self.pivot_tolerance = tolerance;
        Ok(())
    }
}

/// Errors during numeric factorization.
#[derive(Debug, Clone, PartialEq)]
pub enum FactorError {
    /// A diagonal pivot fell below the configured tolerance.
    UnstablePivot { col: usize, pivot: f64 },
    /// The value buffer does not match the pattern's entry count.
    ValueLengthMismatch { expected: usize, actual: usize },
    /// The structural inputs disagree on the dimension.
    DimensionMismatch {
        ordered_n: usize,
        ordering_n: usize,
        tree_n: usize,
    },
    /// The structural inputs passed to a refactorization do not match the
    /// dimension the factorization was built for.
    StructureMismatch {
        expected: usize,
        ordered_n: usize,
        tree_n: usize,
    },
}

impl fmt::Display for FactorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnstablePivot { col, pivot } => {
                write!(
                    f,
                    "pivot {pivot:e} in permuted column {col} is below the stability tolerance"
                )
            }
            Self::ValueLengthMismatch { expected, actual } => {
                write!(f, "value buffer length {actual} does not match {expected} pattern entries")
            }
            Self::DimensionMismatch {
                ordered_n,
                ordering_n,
                tree_n,
            } => {
                write!(
                    f,
                    "structural inputs disagree: ordered pattern {ordered_n}, ordering {ordering_n}, tree {tree_n}"
                )
            }
            Self::StructureMismatch {
                expected,
                ordered_n,
                tree_n,
            } => {
                write!(
                    f,
                    "ordered pattern {ordered_n} and tree {tree_n} do not match the factorization dimension {expected}"
                )
            }
        }
    }
}

impl std::error::Error for FactorError {}

/// Errors during the triangular solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    /// The solve buffer has the wrong length.
    DimensionMismatch { expected: usize, actual: usize },
    /// The last refactorization failed and cleared the factors.
    NotFactorized,
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "buffer length {actual} does not match dimension {expected}")
            }
            Self::NotFactorized => {
                write!(f, "the factors were cleared by a failed refactorization")
            }
        }
    }
}

impl std::error::Error for SolveError {}

/// Numeric LDL^T factorization of a permuted symmetric matrix.
///
/// Holds `P A P^T = L D L^T` with L unit lower triangular in CSC form (the
/// unit diagonal is implicit) and D diagonal with 1x1 pivots, together with
/// a copy of the permutation so the solve can translate between original
/// and permuted coordinates.
///
/// The factorization is tied to the structural inputs it was built from;
/// [`refactorize`](Self::refactorize) re-runs only the numeric phase for new
/// values sharing the same pattern.
#[derive(Debug, Clone)]
pub struct LdltFactorization {
    n: usize,
    l_col_ptrs: Vec<usize>,
    l_row_indices: Vec<usize>,
    l_values: Vec<f64>,
    d: Vec<f64>,
    d_inv: Vec<f64>,
    perm: Vec<usize>,
    inverse: Vec<usize>,
    valid: bool,
    workspace: Workspace,
}

/// Reused numeric scratch space, allocated once per factorization object.
#[derive(Debug, Clone)]
struct Workspace {
    /// Scattered working column.
    y: Vec<f64>,
    /// Which entries of `y` are live.
    marker: Vec<bool>,
    /// Nonzero positions of the working column, reach order.
    reach: Vec<usize>,
    /// Path buffer for one elimination-tree climb.
    path: Vec<usize>,
    /// Next free slot in each factor column.
    next_in_col: Vec<usize>,
    /// Matrix values permuted into CSC order.
    a_csc: Vec<f64>,
}

impl Workspace {
    fn new(n: usize, nnz: usize) -> Self {
        Self {
            y: vec![0.0; n],
            marker: vec![false; n],
            reach: vec![0; n],
            path: vec![0; n],
            next_in_col: vec![0; n],
            a_csc: vec![0.0; nnz],
        }
    }
}

impl LdltFactorization {
    /// Computes the factorization.
    ///
    /// `values` holds the numeric value of every entry of the *original*
    /// IndexSet, in the original entry order; the coordinate translation
    /// into permuted CSC positions happens here.
    pub fn new(
        ordered: &OrderedIndexSet,
        values: &[f64],
        ordering: &Ordering,
        tree: &AssemblyTree,
        settings: &FactorizationSettings,
    ) -> Result<Self, FactorError> {
        let n = ordered.n();
        if ordering.n() != n || tree.n() != n {
            return Err(FactorError::DimensionMismatch {
                ordered_n: n,
                ordering_n: ordering.n(),
                tree_n: tree.n(),
            });
        }

        let factor_nnz = tree.factor_nnz();
        let mut l_col_ptrs = vec![0; n + 1];
        for col in 0..n {
            l_col_ptrs[col + 1] = l_col_ptrs[col] + tree.col_counts()[col];
        }

        let mut this = Self {
            n,
            l_col_ptrs,
            l_row_indices: vec![0; factor_nnz],
            l_values: vec![0.0; factor_nnz],
            d: vec![0.0; n],
            d_inv: vec![0.0; n],
            perm: ordering.perm().to_vec(),
            inverse: ordering.inverse().to_vec(),
            valid: false,
            workspace: Workspace::new(n, ordered.nnz()),
        };
        this.factor_numeric(ordered, values, tree, settings)?;
        Ok(this)
    }

    /// Re-runs the numeric phase with new values on the same structure.
    ///
    /// Cheap path for matrices with a static pattern but changing values:
    /// the ordering, the ordered pattern and the assembly tree are reused
    /// untouched. The structural inputs must be the ones this factorization
    /// was built from.
    ///
    /// On failure the factors are cleared and solves report
    /// [`SolveError::NotFactorized`] until a later refactorization succeeds.
    pub fn refactorize(
        &mut self,
        ordered: &OrderedIndexSet,
        values: &[f64],
        tree: &AssemblyTree,
        settings: &FactorizationSettings,
    ) -> Result<(), FactorError> {
        if ordered.n() != self.n || tree.n() != self.n {
            return Err(FactorError::StructureMismatch {
                expected: self.n,
                ordered_n: ordered.n(),
                tree_n: tree.n(),
            });
        }
        self.factor_numeric(ordered, values, tree, settings)
    }

    /// Left-looking column elimination in ascending (topological) order.
    ///
    /// For each permuted column k: scatter row k of the upper triangle into
    /// the working vector, collect its elimination-tree reach, apply every
    /// reached factor column, then emit the L entries and the pivot.
    fn factor_numeric(
        &mut self,
        ordered: &OrderedIndexSet,
        values: &[f64],
        tree: &AssemblyTree,
        settings: &FactorizationSettings,
    ) -> Result<(), FactorError> {
        if values.len() != ordered.nnz() {
            return Err(FactorError::ValueLengthMismatch {
                expected: ordered.nnz(),
                actual: values.len(),
            });
        }

        let n = self.n;
        let ws = &mut self.workspace;
        for (entry, &value) in values.iter().enumerate() {
            ws.a_csc[ordered.value_map()[entry]] = value;
        }

        // Pivot magnitudes are judged relative to the largest diagonal of A.
        let mut scale: f64 = 0.0;
        for col in 0..n {
            let range = ordered.col_range(col);
            if !range.is_empty() && ordered.row_indices()[range.end - 1] == col {
                scale = scale.max(ws.a_csc[range.end - 1].abs());
            }
        }
        if scale == 0.0 {
            scale = 1.0;
        }
        let threshold = settings.pivot_tolerance() * scale;

        ws.y.fill(0.0);
        ws.marker.fill(false);
        ws.next_in_col.copy_from_slice(&self.l_col_ptrs[..n]);

        let parent = tree.parents();
        for k in 0..n {
            let mut reach_len = 0;
            self.d[k] = 0.0;

            // Scatter row k of the upper triangle, walking the elimination
            // tree from each entry towards k to collect the reach.
            for p in ordered.col_range(k) {
                let i = ordered.row_indices()[p];
                if i == k {
                    self.d[k] = ws.a_csc[p];
                    continue;
                }
                ws.y[i] = ws.a_csc[p];
                if ws.marker[i] {
                    continue;
                }
                ws.marker[i] = true;
                ws.path[0] = i;
                let mut path_len = 1;
                let mut node = parent[i];
                while let Some(next) = node {
                    if next >= k || ws.marker[next] {
                        break;
                    }
                    ws.marker[next] = true;
                    ws.path[path_len] = next;
                    path_len += 1;
                    node = parent[next];
                }
                while path_len > 0 {
                    path_len -= 1;
                    ws.reach[reach_len] = ws.path[path_len];
                    reach_len += 1;
                }
            }

            // Apply the reached columns, deepest first.
            for r in (0..reach_len).rev() {
                let c = ws.reach[r];
                let y_c = ws.y[c];
                let slot = ws.next_in_col[c];
                for p in self.l_col_ptrs[c]..slot {
                    ws.y[self.l_row_indices[p]] -= self.l_values[p] * y_c;
                }
                let l_kc = y_c * self.d_inv[c];
                self.l_row_indices[slot] = k;
                self.l_values[slot] = l_kc;
                self.d[k] -= y_c * l_kc;
                ws.next_in_col[c] = slot + 1;
                ws.y[c] = 0.0;
                ws.marker[c] = false;
            }

            if self.d[k].abs() < threshold {
                let pivot = self.d[k];
                // Leave no usable factors behind.
                self.d.fill(0.0);
                self.d_inv.fill(0.0);
                self.valid = false;
                return Err(FactorError::UnstablePivot { col: k, pivot });
            }
            self.d_inv[k] = 1.0 / self.d[k];
        }

        self.valid = true;
        Ok(())
    }

    /// Matrix dimension.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Below-diagonal nonzeros of L.
    pub fn factor_nnz(&self) -> usize {
        self.l_row_indices.len()
    }

    /// Column pointers of L in CSC form.
    pub fn l_col_ptrs(&self) -> &[usize] {
        &self.l_col_ptrs
    }

    /// Row indices of L in CSC form.
    pub fn l_row_indices(&self) -> &[usize] {
        &self.l_row_indices
    }

    /// Below-diagonal values of L in CSC form.
    pub fn l_values(&self) -> &[f64] {
        &self.l_values
    }

    /// The diagonal factor D.
    pub fn d(&self) -> &[f64] {
        &self.d
    }

    /// Solves `A x = b` in place: on input `x` holds the right-hand side,
    /// on output the solution.
    ///
    /// Performs, in permuted coordinates, forward substitution with L,
    /// scaling by 1/D, and back substitution with L^T, then un-permutes.
    pub fn solve_in_place(&self, x: &mut [f64]) -> Result<(), SolveError> {
        let mut scratch = vec![0.0; self.n];
        self.solve_in_place_with_scratch(x, &mut scratch)
    }

    /// As [`solve_in_place`](Self::solve_in_place), with a caller-provided
    /// scratch buffer so repeated solves avoid reallocating.
    pub fn solve_in_place_with_scratch(
        &self,
        x: &mut [f64],
        scratch: &mut Vec<f64>,
    ) -> Result<(), SolveError> {
        if !self.valid {
            return Err(SolveError::NotFactorized);
        }
        let n = self.n;
        if x.len() != n {
            return Err(SolveError::DimensionMismatch {
                expected: n,
                actual: x.len(),
            });
        }
        scratch.resize(n, 0.0);

        // Into permuted coordinates.
        for old in 0..n {
            scratch[self.inverse[old]] = x[old];
        }

        // L y = b.
        for col in 0..n {
            let y_col = scratch[col];
            for p in self.l_col_ptrs[col]..self.l_col_ptrs[col + 1] {
                scratch[self.l_row_indices[p]] -= self.l_values[p] * y_col;
            }
        }

        // D z = y.
        for col in 0..n {
            scratch[col] *= self.d_inv[col];
        }

        // L^T w = z.
        for col in (0..n).rev() {
            let mut sum = scratch[col];
            for p in self.l_col_ptrs[col]..self.l_col_ptrs[col + 1] {
                sum -= self.l_values[p] * scratch[self.l_row_indices[p]];
            }
            scratch[col] = sum;
        }

        // Back to original coordinates.
        for old in 0..n {
            x[old] = scratch[self.inverse[old]];
        }
        Ok(())
    }
}
