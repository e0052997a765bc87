use sparse_ldlt::{
    AssemblyTree, FactorError, FactorizationSettings, IndexSet, LdltFactorization,
    OrderedError, OrderedIndexSet, Ordering, OrderingError, PatternError, SettingsError,
    SolveError, SolverError, SolverOptions, SymmetricSolver, TreeError,
    DEFAULT_PIVOT_TOLERANCE,
};

/// Lower-triangular column-major triplets of a dense symmetric matrix,
/// dropping explicit zeros.
fn dense_to_lower_triplets(dense: &[Vec<f64>]) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
    let n = dense.len();
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut values = Vec::new();
    for col in 0..n {
        for row in col..n {
            let v = dense[row][col];
            if v != 0.0 {
                rows.push(row);
                cols.push(col);
                values.push(v);
            }
        }
    }
    (rows, cols, values)
}

/// Dense Gaussian elimination with partial pivoting, the reference the
/// sparse pipeline is checked against.
fn dense_solve(dense: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = dense.len();
    let mut a: Vec<Vec<f64>> = dense.to_vec();
    let mut x = b.to_vec();
    for k in 0..n {
        let pivot_row = (k..n)
            .max_by(|&p, &q| a[p][k].abs().total_cmp(&a[q][k].abs()))
            .unwrap();
        a.swap(k, pivot_row);
        x.swap(k, pivot_row);
        for i in k + 1..n {
            let m = a[i][k] / a[k][k];
            for j in k..n {
                a[i][j] -= m * a[k][j];
            }
            x[i] -= m * x[k];
        }
    }
    for k in (0..n).rev() {
        for j in k + 1..n {
            x[k] -= a[k][j] * x[j];
        }
        x[k] /= a[k][k];
    }
    x
}

fn residual_norm(dense: &[Vec<f64>], x: &[f64], b: &[f64]) -> f64 {
    let n = dense.len();
    let mut sum = 0.0;
    for i in 0..n {
        let mut r = -b[i];
        for j in 0..n {
            r += dense[i][j] * x[j];
        }
        sum += r * r;
    }
    sum.sqrt()
}

/// The 4x4 diagonally dominant SPD example: diagonal {4,4,5,6}, all
/// off-diagonals 1.
fn spd_4x4() -> Vec<Vec<f64>> {
    let mut dense = vec![vec![1.0; 4]; 4];
    for (i, d) in [4.0, 4.0, 5.0, 6.0].into_iter().enumerate() {
        dense[i][i] = d;
    }
    dense
}

/// Deterministic xorshift values in [-1, 1] for right-hand sides.
struct Xorshift(u64);

impl Xorshift {
    fn next_f64(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
    }
}

#[test]
fn row_index_outside_n_is_rejected() {
    let rows = vec![0, 1, 2, 1, 3, 2];
    let cols = vec![0, 0, 0, 1, 1, 2];
    let err = IndexSet::new(3, rows, cols, true).unwrap_err();
    assert!(matches!(err, PatternError::IndexOutOfBounds { row: 3, .. }));
}

#[test]
fn col_index_outside_n_is_rejected() {
    let rows = vec![0, 1, 2, 1, 4, 2];
    let cols = vec![0, 0, 0, 1, 4, 2];
    let err = IndexSet::new(3, rows, cols, true).unwrap_err();
    assert!(matches!(err, PatternError::IndexOutOfBounds { .. }));
}

#[test]
fn upper_triangular_pattern_is_rejected() {
    let rows = vec![0, 0, 1, 0, 1, 2];
    let cols = vec![0, 1, 1, 2, 2, 2];
    let err = IndexSet::new(3, rows, cols, true).unwrap_err();
    assert!(matches!(err, PatternError::MustBeLowerTriangular { .. }));
}

#[test]
fn row_major_pattern_is_rejected() {
    let rows = vec![0, 1, 1, 2, 2, 2];
    let cols = vec![0, 0, 1, 0, 1, 2];
    let err = IndexSet::new(3, rows, cols, true).unwrap_err();
    assert!(matches!(err, PatternError::NotColumnMajorOrder { .. }));
}

#[test]
fn valid_pattern_round_trips() {
    let (rows, cols, _) = dense_to_lower_triplets(&spd_4x4());
    let pattern = IndexSet::new(4, rows.clone(), cols.clone(), true).unwrap();
    assert_eq!(pattern.rows(), rows.as_slice());
    assert_eq!(pattern.cols(), cols.as_slice());
    assert_eq!(pattern.n(), 4);
}

#[test]
fn staged_pipeline_matches_dense_reference() {
    let dense = spd_4x4();
    let (rows, cols, values) = dense_to_lower_triplets(&dense);
    let b = vec![1.0, 2.0, 3.0, 4.0];

    let pattern = IndexSet::new(4, rows, cols, true).unwrap();
    let ordering = Ordering::min_degree(&pattern);
    let ordered = OrderedIndexSet::new(&pattern, &ordering).unwrap();
    let tree = AssemblyTree::new(&ordered, true).unwrap();
    let mut settings = FactorizationSettings::default();
    settings.set_pivot_tolerance(0.02).unwrap();
    let factorization =
        LdltFactorization::new(&ordered, &values, &ordering, &tree, &settings).unwrap();

    let mut x = b.clone();
    factorization.solve_in_place(&mut x).unwrap();

    let x_ref = dense_solve(&dense, &b);
    assert!(residual_norm(&dense, &x, &b) < 1e-10);
    for (xi, ri) in x.iter().zip(&x_ref) {
        assert!((xi - ri).abs() < 1e-10);
    }
}

#[test]
fn factorization_is_idempotent() {
    let dense = spd_4x4();
    let (rows, cols, values) = dense_to_lower_triplets(&dense);
    let pattern = IndexSet::new(4, rows, cols, true).unwrap();
    let ordering = Ordering::min_degree(&pattern);
    let ordered = OrderedIndexSet::new(&pattern, &ordering).unwrap();
    let tree = AssemblyTree::new(&ordered, false).unwrap();
    let settings = FactorizationSettings::default();

    let first =
        LdltFactorization::new(&ordered, &values, &ordering, &tree, &settings).unwrap();
    let second =
        LdltFactorization::new(&ordered, &values, &ordering, &tree, &settings).unwrap();
    assert_eq!(first.d(), second.d());
    assert_eq!(first.l_values(), second.l_values());
    assert_eq!(first.l_row_indices(), second.l_row_indices());
}

#[test]
fn refactorize_reuses_the_structure() {
    let dense_a = spd_4x4();
    let mut dense_b = spd_4x4();
    for i in 0..4 {
        dense_b[i][i] += 3.0;
    }
    // Same pattern, different values.
    let (rows, cols, values_a) = dense_to_lower_triplets(&dense_a);
    let (_, _, values_b) = dense_to_lower_triplets(&dense_b);

    let pattern = IndexSet::new(4, rows, cols, true).unwrap();
    let ordering = Ordering::min_degree(&pattern);
    let ordered = OrderedIndexSet::new(&pattern, &ordering).unwrap();
    let tree = AssemblyTree::new(&ordered, false).unwrap();
    let settings = FactorizationSettings::default();
    let mut factorization =
        LdltFactorization::new(&ordered, &values_a, &ordering, &tree, &settings).unwrap();

    let b = vec![-1.0, 0.5, 2.0, 1.0];
    let mut x = b.clone();
    factorization.solve_in_place(&mut x).unwrap();
    assert!(residual_norm(&dense_a, &x, &b) < 1e-10);

    factorization
        .refactorize(&ordered, &values_b, &tree, &settings)
        .unwrap();
    let mut x = b.clone();
    factorization.solve_in_place(&mut x).unwrap();
    assert!(residual_norm(&dense_b, &x, &b) < 1e-10);
}

#[test]
fn settings_default_is_documented_and_mutation_is_observed() {
    let mut settings = FactorizationSettings::default();
    assert_eq!(settings.pivot_tolerance(), DEFAULT_PIVOT_TOLERANCE);
    assert_eq!(DEFAULT_PIVOT_TOLERANCE, 1e-8);
    settings.set_pivot_tolerance(0.02).unwrap();
    assert_eq!(settings.pivot_tolerance(), 0.02);
}

#[test]
fn numerically_singular_matrix_reports_unstable_pivot() {
    // Rank-one 3x3 matrix of ones.
    let dense = vec![vec![1.0; 3]; 3];
    let (rows, cols, values) = dense_to_lower_triplets(&dense);
    let pattern = IndexSet::new(3, rows, cols, true).unwrap();
    let ordering = Ordering::natural(3);
    let ordered = OrderedIndexSet::new(&pattern, &ordering).unwrap();
    let tree = AssemblyTree::new(&ordered, false).unwrap();
    let err = LdltFactorization::new(
        &ordered,
        &values,
        &ordering,
        &tree,
        &FactorizationSettings::default(),
    )
    .unwrap_err();
    assert!(matches!(err, FactorError::UnstablePivot { .. }));
}

#[test]
fn indefinite_but_factorizable_matrix_solves() {
    // Saddle-point-like system, LDL^T with a negative pivot in D.
    let dense = vec![
        vec![2.0, 0.0, 1.0],
        vec![0.0, 3.0, 1.0],
        vec![1.0, 1.0, -1.0],
    ];
    let (rows, cols, values) = dense_to_lower_triplets(&dense);
    let b = vec![1.0, -2.0, 0.5];

    let pattern = IndexSet::new(3, rows, cols, true).unwrap();
    let mut solver = SymmetricSolver::new(pattern, &SolverOptions::default()).unwrap();
    solver.factorize(&values, None).unwrap();
    let mut x = b.clone();
    solver.solve_in_place(&mut x).unwrap();
    assert!(residual_norm(&dense, &x, &b) < 1e-10);

    let d = solver.factorization().unwrap().d();
    assert!(d.iter().any(|&di| di < 0.0));
}

#[test]
fn solve_buffer_dimension_mismatch_is_reported() {
    let (rows, cols, values) = dense_to_lower_triplets(&spd_4x4());
    let pattern = IndexSet::new(4, rows, cols, true).unwrap();
    let ordering = Ordering::natural(4);
    let ordered = OrderedIndexSet::new(&pattern, &ordering).unwrap();
    let tree = AssemblyTree::new(&ordered, false).unwrap();
    let factorization = LdltFactorization::new(
        &ordered,
        &values,
        &ordering,
        &tree,
        &FactorizationSettings::default(),
    )
    .unwrap();

    let mut too_short = vec![1.0; 3];
    assert_eq!(
        factorization.solve_in_place(&mut too_short).unwrap_err(),
        SolveError::DimensionMismatch {
            expected: 4,
            actual: 3
        }
    );
}

#[test]
fn explicit_permutation_agrees_with_min_degree() {
    let dense = spd_4x4();
    let (rows, cols, values) = dense_to_lower_triplets(&dense);
    let b = vec![0.25, -1.0, 4.0, 2.0];

    let pattern = IndexSet::new(4, rows.clone(), cols.clone(), true).unwrap();
    let mut amd_solver = SymmetricSolver::new(pattern, &SolverOptions::default()).unwrap();
    amd_solver.factorize(&values, None).unwrap();
    let mut x_amd = b.clone();
    amd_solver.solve_in_place(&mut x_amd).unwrap();

    let pattern = IndexSet::new(4, rows, cols, true).unwrap();
    let ordering = Ordering::from_permutation(4, vec![3, 1, 0, 2]).unwrap();
    let mut perm_solver =
        SymmetricSolver::with_ordering(pattern, ordering, &SolverOptions::default()).unwrap();
    perm_solver.factorize(&values, None).unwrap();
    let mut x_perm = b.clone();
    perm_solver.solve_in_place(&mut x_perm).unwrap();

    for (a, p) in x_amd.iter().zip(&x_perm) {
        assert!((a - p).abs() < 1e-10);
    }
}

#[test]
fn relaxed_and_plain_trees_give_identical_solutions() {
    let dense = spd_4x4();
    let (rows, cols, values) = dense_to_lower_triplets(&dense);
    let b = vec![1.0, 2.0, 3.0, 4.0];

    let mut solutions = Vec::new();
    for relax in [false, true] {
        let pattern = IndexSet::new(4, rows.clone(), cols.clone(), true).unwrap();
        let options = SolverOptions {
            relax_supernodes: relax,
            ..SolverOptions::default()
        };
        let mut solver = SymmetricSolver::new(pattern, &options).unwrap();
        solver.factorize(&values, None).unwrap();
        let mut x = b.clone();
        solver.solve_in_place(&mut x).unwrap();
        solutions.push(x);
    }
    assert_eq!(solutions[0], solutions[1]);
}

#[test]
fn banded_diagonally_dominant_system_solves_within_tolerance() {
    // Pentadiagonal, strictly diagonally dominant.
    let n = 60;
    let mut dense = vec![vec![0.0; n]; n];
    for i in 0..n {
        dense[i][i] = 8.0;
        if i >= 1 {
            dense[i][i - 1] = -2.0;
            dense[i - 1][i] = -2.0;
        }
        if i >= 2 {
            dense[i][i - 2] = 1.0;
            dense[i - 2][i] = 1.0;
        }
    }
    let (rows, cols, values) = dense_to_lower_triplets(&dense);

    let mut rng = Xorshift(0x1234_5678_9abc_def0);
    let b: Vec<f64> = (0..n).map(|_| rng.next_f64()).collect();

    let pattern = IndexSet::new(n, rows, cols, true).unwrap();
    let mut solver = SymmetricSolver::new(pattern, &SolverOptions::default()).unwrap();
    solver.factorize(&values, None).unwrap();
    let mut x = b.clone();
    solver.solve_in_place(&mut x).unwrap();
    assert!(residual_norm(&dense, &x, &b) < 1e-9);

    let stats = solver.stats();
    assert_eq!(stats.n, n);
    assert!(stats.factor_nnz >= stats.pattern_nnz - n);
}

#[test]
fn failed_refactorize_leaves_no_usable_factors() {
    let dense = spd_4x4();
    let (rows, cols, good_values) = dense_to_lower_triplets(&dense);
    let singular_values: Vec<f64> = good_values.iter().map(|_| 1.0).collect();

    let pattern = IndexSet::new(4, rows, cols, true).unwrap();
    let ordering = Ordering::min_degree(&pattern);
    let ordered = OrderedIndexSet::new(&pattern, &ordering).unwrap();
    let tree = AssemblyTree::new(&ordered, false).unwrap();
    let settings = FactorizationSettings::default();
    let mut factorization =
        LdltFactorization::new(&ordered, &good_values, &ordering, &tree, &settings).unwrap();

    let err = factorization
        .refactorize(&ordered, &singular_values, &tree, &settings)
        .unwrap_err();
    assert!(matches!(err, FactorError::UnstablePivot { .. }));

    // The failed refactorization must not masquerade as solvable.
    let mut x = vec![1.0, 2.0, 3.0, 4.0];
    assert_eq!(
        factorization.solve_in_place(&mut x).unwrap_err(),
        SolveError::NotFactorized
    );

    factorization
        .refactorize(&ordered, &good_values, &tree, &settings)
        .unwrap();
    let b = vec![1.0, 2.0, 3.0, 4.0];
    let mut x = b.clone();
    factorization.solve_in_place(&mut x).unwrap();
    assert!(residual_norm(&dense, &x, &b) < 1e-10);
}

#[test]
fn every_error_explains_itself() {
    let explanations = [
        format!("{}", PatternError::IndexOutOfBounds { entry: 0, row: 4, col: 1, n: 3 }),
        format!("{}", PatternError::MustBeLowerTriangular { entry: 1, row: 0, col: 1 }),
        format!(
            "{}",
            PatternError::NotColumnMajorOrder {
                entry: 3,
                prev: (1, 1),
                next: (2, 0)
            }
        ),
        format!("{}", PatternError::LengthMismatch { rows_len: 3, cols_len: 2 }),
        format!("{}", OrderingError::NotAPermutation { index: 1 }),
        format!("{}", OrderingError::LengthMismatch { expected: 3, actual: 2 }),
        format!(
            "{}",
            OrderedError::DimensionMismatch {
                pattern_n: 3,
                ordering_n: 4
            }
        ),
        format!("{}", TreeError::MissingDiagonal { col: 2 }),
        format!("{}", SettingsError::InvalidTolerance { value: -1.0 }),
        format!("{}", FactorError::UnstablePivot { col: 2, pivot: 1e-14 }),
        format!(
            "{}",
            FactorError::ValueLengthMismatch {
                expected: 6,
                actual: 5
            }
        ),
        format!(
            "{}",
            FactorError::DimensionMismatch {
                ordered_n: 4,
                ordering_n: 3,
                tree_n: 4
            }
        ),
        format!(
            "{}",
            FactorError::StructureMismatch {
                expected: 4,
                ordered_n: 3,
                tree_n: 3
            }
        ),
        format!(
            "{}",
            SolveError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ),
        format!("{}", SolveError::NotFactorized),
        format!("{}", SolverError::NotFactorized),
        format!("{}", SolverError::InvalidDimensions { n: 0 }),
    ];
    for explanation in explanations {
        assert!(!explanation.is_empty());
    }
}

#[test]
fn refactorize_after_unstable_pivot_recovers() {
    // Start from a singular value set, then retry with an SPD one.
    let dense = spd_4x4();
    let (rows, cols, good_values) = dense_to_lower_triplets(&dense);
    let singular_values: Vec<f64> = good_values.iter().map(|_| 1.0).collect();

    let pattern = IndexSet::new(4, rows, cols, true).unwrap();
    let mut solver = SymmetricSolver::new(pattern, &SolverOptions::default()).unwrap();
    let err = solver.factorize(&singular_values, None).unwrap_err();
    assert!(matches!(
        err,
        SolverError::Factor(FactorError::UnstablePivot { .. })
    ));
    let mut x = vec![1.0; 4];
    assert!(matches!(
        solver.solve_in_place(&mut x),
        Err(SolverError::NotFactorized)
    ));

    solver.factorize(&good_values, None).unwrap();
    let b = vec![1.0, 2.0, 3.0, 4.0];
    let mut x = b.clone();
    solver.solve_in_place(&mut x).unwrap();
    assert!(residual_norm(&dense, &x, &b) < 1e-10);
}
