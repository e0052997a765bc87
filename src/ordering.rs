use core::fmt;

use crate::pattern::IndexSet;

/// Symmetric permutation of `{0, .., n-1}` chosen to reduce fill-in.
///
/// Stored together with its inverse: `perm[new] = old` lists original
/// indices in elimination order, `inverse[old] = new` maps an original index
/// to its permuted position. Derived purely from the sparsity pattern.
#[derive(Debug, Clone)]
pub struct Ordering {
    perm: Vec<usize>,
    inverse: Vec<usize>,
}

/// Validation errors for a caller-supplied permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderingError {
    /// The supplied sequence is not a permutation of 0..n.
    NotAPermutation { index: usize },
    /// The supplied sequence has the wrong length.
    LengthMismatch { expected: usize, actual: usize },
}

impl fmt::Display for OrderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAPermutation { index } => {
                write!(f, "index {index} is missing, repeated, or out of range")
            }
            Self::LengthMismatch { expected, actual } => {
                write!(f, "permutation length {actual} does not match n = {expected}")
            }
        }
    }
}

impl std::error::Error for OrderingError {}

impl Ordering {
    /// Computes a fill-reducing ordering with a minimum-degree heuristic.
    ///
    /// Works on the symmetrized adjacency graph of the pattern. At each step
    /// the still-active node of smallest degree is eliminated and its
    /// neighbours are joined into a clique; ties break on the smallest
    /// original index, so the result is reproducible. Disconnected and
    /// structurally singular patterns are handled like any other graph.
    pub fn min_degree(pattern: &IndexSet) -> Self {
        let n = pattern.n();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for entry in 0..pattern.nnz() {
            let (row, col) = pattern.entry(entry);
            if row != col {
                adjacency[row].push(col);
                adjacency[col].push(row);
            }
        }
        for list in &mut adjacency {
            list.sort_unstable();
            list.dedup();
        }

        let mut alive = vec![true; n];
        let mut perm = Vec::with_capacity(n);
        let mut merged = Vec::new();

        for _ in 0..n {
            let mut best = usize::MAX;
            let mut best_degree = usize::MAX;
            for node in 0..n {
                if alive[node] && adjacency[node].len() < best_degree {
                    best = node;
                    best_degree = adjacency[node].len();
                }
            }

            let node = best;
            alive[node] = false;
            perm.push(node);

            // Eliminating `node` joins its remaining neighbours into a
            // clique; their adjacency lists absorb each other's members.
            let neighbours = std::mem::take(&mut adjacency[node]);
            for &u in &neighbours {
                if !alive[u] {
                    continue;
                }
                merged.clear();
                let mut own = adjacency[u].iter().copied().filter(|&v| v != node);
                let mut new = neighbours.iter().copied().filter(|&v| v != u && alive[v]);
                let mut a = own.next();
                let mut b = new.next();
                loop {
                    match (a, b) {
                        (Some(x), Some(y)) => {
                            if x < y {
                                merged.push(x);
                                a = own.next();
                            } else if y < x {
                                merged.push(y);
                                b = new.next();
                            } else {
                                merged.push(x);
                                a = own.next();
                                b = new.next();
                            }
                        }
                        (Some(x), None) => {
                            merged.push(x);
                            a = own.next();
                        }
                        (None, Some(y)) => {
                            merged.push(y);
                            b = new.next();
                        }
                        (None, None) => break,
                    }
                }
                std::mem::swap(&mut adjacency[u], &mut merged);
            }
        }

        Self::from_elimination_order(perm)
    }

    /// Wraps a caller-supplied permutation after validating it.
    ///
    /// `perm[new] = old`: position `new` in the permuted matrix holds the
    /// original index `perm[new]`.
    pub fn from_permutation(n: usize, perm: Vec<usize>) -> Result<Self, OrderingError> {
        if perm.len() != n {
            return Err(OrderingError::LengthMismatch {
                expected: n,
                actual: perm.len(),
            });
        }
        let mut seen = vec![false; n];
        for &old in &perm {
            if old >= n || seen[old] {
                return Err(OrderingError::NotAPermutation { index: old });
            }
            seen[old] = true;
        }
        Ok(Self::from_elimination_order(perm))
    }

    /// The identity ordering.
    pub fn natural(n: usize) -> Self {
        Self::from_elimination_order((0..n).collect())
    }

    fn from_elimination_order(perm: Vec<usize>) -> Self {
        let mut inverse = vec![0; perm.len()];
        for (new, &old) in perm.iter().enumerate() {
            inverse[old] = new;
        }
        Self { perm, inverse }
    }

    /// Dimension of the permuted index space.
    pub fn n(&self) -> usize {
        self.perm.len()
    }

    /// Original indices in elimination order (`perm[new] = old`).
    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    /// Inverse permutation (`inverse[old] = new`).
    pub fn inverse(&self) -> &[usize] {
        &self.inverse
    }

    /// Permuted position of an original index.
    pub fn new_index(&self, old: usize) -> usize {
        self.inverse[old]
    }

    /// Original index at a permuted position.
    pub fn old_index(&self, new: usize) -> usize {
        self.perm[new]
    }
}
