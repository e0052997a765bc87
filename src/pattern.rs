use core::fmt;

/// Lower-triangular, column-major sparsity pattern of a symmetric matrix.
///
/// Entries are zero-based `(row, col)` pairs with `col <= row`, sorted by
/// column then row. The pattern is validated once at construction and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct IndexSet {
    n: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    diagonal_present: bool,
}

/// Validation errors for an IndexSet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// rows and cols have different lengths.
    LengthMismatch { rows_len: usize, cols_len: usize },
    /// An entry has row or col >= n.
    IndexOutOfBounds { entry: usize, row: usize, col: usize, n: usize },
    /// An entry lies strictly above the diagonal.
    MustBeLowerTriangular { entry: usize, row: usize, col: usize },
    /// Adjacent entries are not in strictly ascending column-major order.
    NotColumnMajorOrder {
        entry: usize,
        prev: (usize, usize),
        next: (usize, usize),
    },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { rows_len, cols_len } => {
                write!(
                    f,
                    "rows length {rows_len} does not match cols length {cols_len}"
                )
            }
            Self::IndexOutOfBounds { entry, row, col, n } => {
                write!(
                    f,
                    "entry {entry} ({row},{col}) lies outside the {n}x{n} matrix"
                )
            }
            Self::MustBeLowerTriangular { entry, row, col } => {
                write!(
                    f,
                    "entry {entry} ({row},{col}) is in the strict upper triangle"
                )
            }
            Self::NotColumnMajorOrder { entry, prev, next } => {
                write!(
                    f,
                    "entry {entry}: ({},{}) does not follow ({},{}) in column-major order",
                    next.0, next.1, prev.0, prev.1
                )
            }
        }
    }
}

impl std::error::Error for PatternError {}

impl IndexSet {
    /// Creates a validated lower-triangular column-major pattern.
    ///
    /// Requirements, checked in a single left-to-right scan (the first
    /// violated entry decides the error):
    /// - every `row` and `col` is `< n`
    /// - every entry satisfies `col <= row` (diagonal included)
    /// - entries are strictly ascending by `(col, row)`; duplicates are
    ///   rejected as an ordering violation
    ///
    /// `diagonal_present` records the caller's guarantee that every column
    /// carries an explicit diagonal entry. The symbolic phase re-checks this
    /// structurally, so a wrong flag cannot corrupt the factorization.
    pub fn new(
        n: usize,
        rows: Vec<usize>,
        cols: Vec<usize>,
        diagonal_present: bool,
    ) -> Result<Self, PatternError> {
        if rows.len() != cols.len() {
            return Err(PatternError::LengthMismatch {
                rows_len: rows.len(),
                cols_len: cols.len(),
            });
        }

        for entry in 0..rows.len() {
            let row = rows[entry];
            let col = cols[entry];
            if row >= n || col >= n {
                return Err(PatternError::IndexOutOfBounds { entry, row, col, n });
            }
            if col > row {
                return Err(PatternError::MustBeLowerTriangular { entry, row, col });
            }
            if entry > 0 {
                let prev = (rows[entry - 1], cols[entry - 1]);
                if (col, row) <= (prev.1, prev.0) {
                    return Err(PatternError::NotColumnMajorOrder {
                        entry,
                        prev,
                        next: (row, col),
                    });
                }
            }
        }

        Ok(Self {
            n,
            rows,
            cols,
            diagonal_present,
        })
    }

    /// Matrix dimension.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of stored entries in the lower triangle.
    pub fn nnz(&self) -> usize {
        self.rows.len()
    }

    /// Row index of each entry, in storage order.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Column index of each entry, in storage order.
    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// The `(row, col)` pair of the given entry.
    pub fn entry(&self, entry: usize) -> (usize, usize) {
        (self.rows[entry], self.cols[entry])
    }

    /// Whether the caller guaranteed an explicit diagonal in every column.
    pub fn diagonal_present(&self) -> bool {
        self.diagonal_present
    }
}
