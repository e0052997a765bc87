use core::fmt;
use core::ops::Range;

use crate::ordered::OrderedIndexSet;

/// Elimination forest over the permuted columns, plus the column counts of
/// the factor it predicts.
///
/// The parent of column `j` is the row index of the first off-diagonal
/// nonzero in column `j` of L, or `None` for a root. Parents are always
/// greater than their children, so eliminating columns in ascending order is
/// a valid children-before-parents schedule; the numeric phase relies on
/// that.
#[derive(Debug, Clone)]
pub struct AssemblyTree {
    parent: Vec<Option<usize>>,
    col_counts: Vec<usize>,
    supernodes: Vec<Range<usize>>,
    relaxed: bool,
}

/// Errors during symbolic analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// A column has no diagonal entry, so no pivot can be formed there.
    MissingDiagonal { col: usize },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDiagonal { col } => {
                write!(f, "column {col} has no diagonal entry")
            }
        }
    }
}

impl std::error::Error for TreeError {}

impl AssemblyTree {
    /// Computes the elimination tree and per-column factor counts.
    ///
    /// Walks each row subtree of the upper-triangular CSC pattern (Liu's
    /// algorithm): for every off-diagonal entry `(i, j)` with `i < j`, the
    /// path from `i` towards the root is extended to reach `j`, and every
    /// column on the fresh part of the path gains one factor nonzero.
    ///
    /// `relax_supernodes` additionally groups chains of columns with nested
    /// patterns into supernode ranges. The grouping only informs scheduling;
    /// it never changes the factors.
    pub fn new(ordered: &OrderedIndexSet, relax_supernodes: bool) -> Result<Self, TreeError> {
        let n = ordered.n();
        let mut parent: Vec<Option<usize>> = vec![None; n];
        let mut col_counts = vec![0; n];
        // visited[i] == j marks column i as already reached while scanning
        // row j, collapsing repeated path walks.
        let mut visited = vec![usize::MAX; n];

        for j in 0..n {
            let rows = ordered.rows_of_col(j);
            // Row indices are sorted, so an explicit diagonal is the last
            // entry of its column.
            if rows.last() != Some(&j) {
                return Err(TreeError::MissingDiagonal { col: j });
            }
            visited[j] = j;
            for &entry_row in rows {
                let mut i = entry_row;
                while visited[i] != j {
                    if parent[i].is_none() {
                        parent[i] = Some(j);
                    }
                    col_counts[i] += 1;
                    visited[i] = j;
                    i = parent[i].unwrap_or(j);
                }
            }
        }

        let supernodes = if relax_supernodes {
            group_supernodes(&parent, &col_counts)
        } else {
            (0..n).map(|j| j..j + 1).collect()
        };

        Ok(Self {
            parent,
            col_counts,
            supernodes,
            relaxed: relax_supernodes,
        })
    }

    /// Number of permuted columns.
    pub fn n(&self) -> usize {
        self.parent.len()
    }

    /// Parent of each column (`None` for roots).
    pub fn parents(&self) -> &[Option<usize>] {
        &self.parent
    }

    /// Parent of the given column.
    pub fn parent_of(&self, col: usize) -> Option<usize> {
        self.parent[col]
    }

    /// Strictly-below-diagonal nonzero count of each column of L.
    pub fn col_counts(&self) -> &[usize] {
        &self.col_counts
    }

    /// Total below-diagonal nonzeros of L (the unit diagonal is implicit).
    pub fn factor_nnz(&self) -> usize {
        self.col_counts.iter().sum()
    }

    /// Column ranges grouped for elimination scheduling.
    pub fn supernodes(&self) -> &[Range<usize>] {
        &self.supernodes
    }

    /// Whether supernode relaxation was requested at construction.
    pub fn is_relaxed(&self) -> bool {
        self.relaxed
    }
}

/// Groups column `j` with `j + 1` when `j + 1` is its parent and the factor
/// column of `j` is the factor column of `j + 1` plus the single entry at
/// row `j + 1` — the classic nested-pattern criterion for fundamental
/// supernodes.
fn group_supernodes(parent: &[Option<usize>], col_counts: &[usize]) -> Vec<Range<usize>> {
    let n = parent.len();
    let mut supernodes = Vec::new();
    let mut start = 0;
    for j in 0..n {
        let chains = parent[j] == Some(j + 1) && col_counts[j] == col_counts[j + 1] + 1;
        if !chains {
            supernodes.push(start..j + 1);
            start = j + 1;
        }
    }
    supernodes
}
