use core::fmt;

use std::time::{Duration, Instant};

use crate::factor::{
    FactorError, FactorizationSettings, LdltFactorization, SettingsError, SolveError,
};
use crate::ordered::{OrderedError, OrderedIndexSet};
use crate::ordering::{Ordering, OrderingError};
use crate::pattern::{IndexSet, PatternError};
use crate::report::{FactorStats, Reporter, StageReport, StdoutReporter};
use crate::tree::{AssemblyTree, TreeError};

/// Errors while constructing or running the solver.
#[derive(Debug)]
pub enum SolverError {
    /// The sparsity pattern is invalid.
    Pattern(PatternError),
    /// The supplied ordering is invalid.
    Ordering(OrderingError),
    /// The pattern and ordering could not be combined.
    Ordered(OrderedError),
    /// Symbolic analysis failed.
    Tree(TreeError),
    /// Numeric factorization failed.
    Factor(FactorError),
    /// The solve buffer is inconsistent with the factorization.
    Solve(SolveError),
    /// A settings value is out of range.
    Settings(SettingsError),
    /// The pattern has dimension zero.
    InvalidDimensions { n: usize },
    /// `solve_in_place` was called before a successful `factorize`.
    NotFactorized,
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(err) => write!(f, "invalid sparsity pattern: {err}"),
            Self::Ordering(err) => write!(f, "invalid ordering: {err}"),
            Self::Ordered(err) => write!(f, "ordering mismatch: {err}"),
            Self::Tree(err) => write!(f, "symbolic analysis failed: {err}"),
            Self::Factor(err) => write!(f, "factorization failed: {err}"),
            Self::Solve(err) => write!(f, "solve failed: {err}"),
            Self::Settings(err) => write!(f, "invalid settings: {err}"),
            Self::InvalidDimensions { n } => write!(f, "invalid dimensions: n={n}"),
            Self::NotFactorized => write!(f, "matrix has not been factorized yet"),
        }
    }
}

impl std::error::Error for SolverError {}

impl From<PatternError> for SolverError {
    fn from(err: PatternError) -> Self {
        Self::Pattern(err)
    }
}

impl From<OrderingError> for SolverError {
    fn from(err: OrderingError) -> Self {
        Self::Ordering(err)
    }
}

impl From<OrderedError> for SolverError {
    fn from(err: OrderedError) -> Self {
        Self::Ordered(err)
    }
}

impl From<TreeError> for SolverError {
    fn from(err: TreeError) -> Self {
        Self::Tree(err)
    }
}

impl From<FactorError> for SolverError {
    fn from(err: FactorError) -> Self {
        Self::Factor(err)
    }
}

impl From<SolveError> for SolverError {
    fn from(err: SolveError) -> Self {
        Self::Solve(err)
    }
}

impl From<SettingsError> for SolverError {
    fn from(err: SettingsError) -> Self {
        Self::Settings(err)
    }
}

/// Options controlling the solver pipeline.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Group columns into supernodes for the elimination schedule.
    pub relax_supernodes: bool,
    /// Minimum relative pivot magnitude accepted during factorization.
    pub pivot_tolerance: f64,
    /// Emit per-stage diagnostics to stdout by default.
    pub verbose: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            relax_supernodes: true,
            pivot_tolerance: crate::factor::DEFAULT_PIVOT_TOLERANCE,
            verbose: false,
        }
    }
}

/// One-shot pipeline for solving `A x = b` with a symmetric sparse A.
///
/// Owns the whole structural chain (pattern, ordering, ordered pattern,
/// assembly tree) built once at construction, and re-runs only the numeric
/// phase when [`factorize`](Self::factorize) is called again with new
/// values on the same pattern.
pub struct SymmetricSolver {
    pattern: IndexSet,
    ordering: Ordering,
    ordered: OrderedIndexSet,
    tree: AssemblyTree,
    settings: FactorizationSettings,
    factorization: Option<LdltFactorization>,
    scratch: Vec<f64>,
    stage_reports: Vec<StageReport>,
    verbose: bool,
}

enum ReporterSlot<'a> {
    External(&'a mut dyn Reporter),
    Local(StdoutReporter),
    None,
}

impl<'a> ReporterSlot<'a> {
    fn new(reporter: Option<&'a mut dyn Reporter>, verbose: bool) -> Self {
        match reporter {
            Some(r) => Self::External(r),
            None if verbose => Self::Local(StdoutReporter::new()),
            None => Self::None,
        }
    }

    fn as_mut(&mut self) -> Option<&mut dyn Reporter> {
        match self {
            Self::External(r) => Some(*r),
            Self::Local(r) => Some(r),
            Self::None => None,
        }
    }
}

impl SymmetricSolver {
    /// Builds the structural chain with a minimum-degree fill-reducing
    /// ordering.
    pub fn new(pattern: IndexSet, options: &SolverOptions) -> Result<Self, SolverError> {
        if pattern.n() == 0 {
            return Err(SolverError::InvalidDimensions { n: 0 });
        }
        let start = Instant::now();
        let ordering = Ordering::min_degree(&pattern);
        let ordering_time = start.elapsed();
        Self::assemble(pattern, ordering, ordering_time, options)
    }

    /// Builds the structural chain with a caller-supplied ordering.
    pub fn with_ordering(
        pattern: IndexSet,
        ordering: Ordering,
        options: &SolverOptions,
    ) -> Result<Self, SolverError> {
        if pattern.n() == 0 {
            return Err(SolverError::InvalidDimensions { n: 0 });
        }
        Self::assemble(pattern, ordering, Duration::ZERO, options)
    }

    fn assemble(
        pattern: IndexSet,
        ordering: Ordering,
        ordering_time: Duration,
        options: &SolverOptions,
    ) -> Result<Self, SolverError> {
        let mut settings = FactorizationSettings::default();
        settings.set_pivot_tolerance(options.pivot_tolerance)?;

        let start = Instant::now();
        let ordered = OrderedIndexSet::new(&pattern, &ordering)?;
        let ordered_time = start.elapsed();

        let start = Instant::now();
        let tree = AssemblyTree::new(&ordered, options.relax_supernodes)?;
        let tree_time = start.elapsed();

        let stage_reports = vec![
            StageReport {
                stage: "ordering",
                output: ordering.n(),
                elapsed: ordering_time,
            },
            StageReport {
                stage: "ordered pattern",
                output: ordered.nnz(),
                elapsed: ordered_time,
            },
            StageReport {
                stage: "assembly tree",
                output: tree.factor_nnz(),
                elapsed: tree_time,
            },
        ];

        Ok(Self {
            pattern,
            ordering,
            ordered,
            tree,
            settings,
            factorization: None,
            scratch: Vec::new(),
            stage_reports,
            verbose: options.verbose,
        })
    }

    /// Computes (or recomputes) the numeric factorization.
    ///
    /// `values` holds one number per pattern entry, in the pattern's entry
    /// order. Repeated calls reuse the structural chain and all numeric
    /// workspaces.
    pub fn factorize(
        &mut self,
        values: &[f64],
        reporter: Option<&mut dyn Reporter>,
    ) -> Result<(), SolverError> {
        let mut reporter = ReporterSlot::new(reporter, self.verbose);

        let start = Instant::now();
        let result = match self.factorization.as_mut() {
            Some(factorization) => factorization
                .refactorize(&self.ordered, values, &self.tree, &self.settings)
                .map_err(SolverError::from),
            None => LdltFactorization::new(
                &self.ordered,
                values,
                &self.ordering,
                &self.tree,
                &self.settings,
            )
            .map(|factorization| {
                self.factorization = Some(factorization);
            })
            .map_err(SolverError::from),
        };
        let factor_time = start.elapsed();

        if let Err(err) = result {
            // A failed refactorization leaves no usable factors behind.
            self.factorization = None;
            return Err(err);
        }

        if let Some(reporter) = reporter.as_mut() {
            for report in &self.stage_reports {
                reporter.on_stage(report);
            }
            reporter.on_stage(&StageReport {
                stage: "factorization",
                output: self.tree.factor_nnz(),
                elapsed: factor_time,
            });
            reporter.on_finish(&self.stats());
        }
        Ok(())
    }

    /// Solves `A x = b` in place using the current factorization.
    ///
    /// On input `x` holds the right-hand side, on output the solution.
    pub fn solve_in_place(&mut self, x: &mut [f64]) -> Result<(), SolverError> {
        let factorization = self
            .factorization
            .as_ref()
            .ok_or(SolverError::NotFactorized)?;
        factorization.solve_in_place_with_scratch(x, &mut self.scratch)?;
        Ok(())
    }

    /// The validated input pattern.
    pub fn pattern(&self) -> &IndexSet {
        &self.pattern
    }

    /// The fill-reducing ordering in use.
    pub fn ordering(&self) -> &Ordering {
        &self.ordering
    }

    /// The permuted pattern.
    pub fn ordered(&self) -> &OrderedIndexSet {
        &self.ordered
    }

    /// The assembly tree scheduling the elimination.
    pub fn tree(&self) -> &AssemblyTree {
        &self.tree
    }

    /// The current factorization, if `factorize` has succeeded.
    pub fn factorization(&self) -> Option<&LdltFactorization> {
        self.factorization.as_ref()
    }

    /// Current pivot tolerance.
    pub fn pivot_tolerance(&self) -> f64 {
        self.settings.pivot_tolerance()
    }

    /// Updates the pivot tolerance for subsequent factorizations.
    pub fn set_pivot_tolerance(&mut self, tolerance: f64) -> Result<(), SolverError> {
        self.settings.set_pivot_tolerance(tolerance)?;
        Ok(())
    }

    /// Structural statistics of the pipeline.
    pub fn stats(&self) -> FactorStats {
        let off_diagonal = self
            .pattern
            .rows()
            .iter()
            .zip(self.pattern.cols())
            .filter(|(row, col)| row != col)
            .count();
        FactorStats {
            n: self.pattern.n(),
            pattern_nnz: self.pattern.nnz(),
            factor_nnz: self.tree.factor_nnz(),
            fill_ratio: self.tree.factor_nnz() as f64 / off_diagonal.max(1) as f64,
            supernodes: self.tree.supernodes().len(),
        }
    }
}
