use core::fmt;
use core::ops::Range;

use crate::ordering::Ordering;
use crate::pattern::IndexSet;

/// The sparsity pattern of an [`IndexSet`] re-expressed in permuted
/// coordinates.
///
/// Each entry `(row, col)` of the lower triangle maps to
/// `(inverse[row], inverse[col])` and is mirrored into the upper triangle of
/// the permuted matrix, the layout the left-looking factorization consumes.
/// Entries are stored in compressed sparse column form together with a map
/// from the original entry order to CSC positions, so numeric values can
/// keep arriving in the original order.
#[derive(Debug, Clone)]
pub struct OrderedIndexSet {
    n: usize,
    col_ptrs: Vec<usize>,
    row_indices: Vec<usize>,
    value_map: Vec<usize>,
}

/// Errors when combining a pattern with an ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderedError {
    /// The pattern and the ordering disagree on the dimension.
    DimensionMismatch { pattern_n: usize, ordering_n: usize },
}

impl fmt::Display for OrderedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch {
                pattern_n,
                ordering_n,
            } => {
                write!(
                    f,
                    "pattern dimension {pattern_n} does not match ordering dimension {ordering_n}"
                )
            }
        }
    }
}

impl std::error::Error for OrderedError {}

impl OrderedIndexSet {
    /// Applies the ordering to the pattern and records the CSC layout.
    ///
    /// Purely structural; no numeric values are touched.
    pub fn new(pattern: &IndexSet, ordering: &Ordering) -> Result<Self, OrderedError> {
        if pattern.n() != ordering.n() {
            return Err(OrderedError::DimensionMismatch {
                pattern_n: pattern.n(),
                ordering_n: ordering.n(),
            });
        }

        let n = pattern.n();
        let nnz = pattern.nnz();

        // Permute every entry into the upper triangle of the new coordinate
        // space, remembering which original entry it came from.
        let mut permuted = Vec::with_capacity(nnz);
        for entry in 0..nnz {
            let (row, col) = pattern.entry(entry);
            let p_row = ordering.new_index(row);
            let p_col = ordering.new_index(col);
            let (upper_row, upper_col) = if p_row <= p_col {
                (p_row, p_col)
            } else {
                (p_col, p_row)
            };
            permuted.push((upper_col, upper_row, entry));
        }
        permuted.sort_unstable();

        let mut col_ptrs = vec![0; n + 1];
        let mut row_indices = vec![0; nnz];
        let mut value_map = vec![0; nnz];
        for &(col, _, _) in &permuted {
            col_ptrs[col + 1] += 1;
        }
        for col in 0..n {
            col_ptrs[col + 1] += col_ptrs[col];
        }
        for (position, &(_, row, entry)) in permuted.iter().enumerate() {
            row_indices[position] = row;
            value_map[entry] = position;
        }

        Ok(Self {
            n,
            col_ptrs,
            row_indices,
            value_map,
        })
    }

    /// Matrix dimension.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.row_indices.len()
    }

    /// Column pointer array of the permuted upper-triangular CSC pattern.
    pub fn col_ptrs(&self) -> &[usize] {
        &self.col_ptrs
    }

    /// Row index array of the permuted upper-triangular CSC pattern.
    pub fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }

    /// CSC position of each entry of the original pattern.
    pub fn value_map(&self) -> &[usize] {
        &self.value_map
    }

    /// Index range in `row_indices` for the given permuted column.
    pub fn col_range(&self, col: usize) -> Range<usize> {
        self.col_ptrs[col]..self.col_ptrs[col + 1]
    }

    /// Sorted row indices for the given permuted column.
    pub fn rows_of_col(&self, col: usize) -> &[usize] {
        &self.row_indices[self.col_range(col)]
    }
}
