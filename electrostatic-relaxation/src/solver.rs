use crate::boundary::Boundary;
use crate::error::{RelaxError, Result};
use crate::field::{max_abs_diff, Charge, ChargeDensity, Potential};
use crate::grid::{Grid, Placement};
use ndarray::Array2;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, trace, warn};

/// Iteration cap applied to charge-driven runs when none is given.
pub const DEFAULT_POISSON_MAX_ITER: usize = 10_000;
pub const DEFAULT_TOLERANCE: f64 = 1e-5;
pub const DEFAULT_REPORT_EVERY: usize = 100;

/// Update ordering of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Every node reads the field as it was before the sweep.
    Jacobi,
    /// Nodes are overwritten in row-major order, later nodes read earlier ones.
    GaussSeidel,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Jacobi => write!(f, "jacobi"),
            Method::GaussSeidel => write!(f, "gauss-seidel"),
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "jacobi" => Ok(Method::Jacobi),
            "gauss_seidel" | "gs" => Ok(Method::GaussSeidel),
            other => Err(format!("unknown relaxation method '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverParams {
    pub method: Method,
    pub omega: f64,              // Relaxation factor, 1 = unrelaxed
    pub tolerance: f64,          // Stop once the max change per sweep drops to this
    pub max_iter: Option<usize>, // Optional cap on the number of sweeps
    pub report_every: usize,     // Observer period in sweeps, 0 disables it
}

impl SolverParams {
    pub fn new(method: Method, omega: f64) -> Self {
        Self {
            method,
            omega,
            tolerance: DEFAULT_TOLERANCE,
            max_iter: None,
            report_every: DEFAULT_REPORT_EVERY,
        }
    }

    pub fn jacobi() -> Self {
        Self::new(Method::Jacobi, 1.0)
    }

    pub fn jacobi_sor(omega: f64) -> Self {
        Self::new(Method::Jacobi, omega)
    }

    pub fn gauss_seidel() -> Self {
        Self::new(Method::GaussSeidel, 1.0)
    }

    pub fn sor(omega: f64) -> Self {
        Self::new(Method::GaussSeidel, omega)
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    pub fn with_report_every(mut self, report_every: usize) -> Self {
        self.report_every = report_every;
        self
    }

    pub fn validate(&self) -> Result<()> {
        // Over-relaxation is only stable strictly inside (0, 2).
        if !(self.omega > 0.0 && self.omega < 2.0) {
            return Err(RelaxError::InvalidRelaxationFactor(self.omega));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(RelaxError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        Self::sor(1.5)
    }
}

/// Snapshot handed to the progress observer.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub iteration: usize,
    pub delta: f64,
    pub potential: &'a Potential,
}

/// Outcome of a run. `converged == false` means the iteration cap was hit
/// first; the field is then the best effort reached so far.
#[derive(Debug, Clone)]
pub struct Solution {
    pub potential: Potential,
    pub iterations: usize,
    pub delta: f64,
    pub converged: bool,
    pub history: Vec<f64>, // delta of every sweep, in order
}

impl Solution {
    pub fn ensure_converged(self) -> Result<Self> {
        if self.converged {
            Ok(self)
        } else {
            Err(RelaxError::NonConvergence {
                iterations: self.iterations,
                delta: self.delta,
            })
        }
    }
}

/// One relaxation sweep reading only from `old` and writing the free nodes
/// of `new`. Fixed nodes of `new` are left as they are.
///
/// # Panics
///
/// Panics if `new`, `fixed` or `source` differ in shape from `old`.
pub fn jacobi_sweep(
    old: &Array2<f64>,
    new: &mut Array2<f64>,
    fixed: &Array2<bool>,
    source: Option<&Array2<f64>>,
    h: f64,
    omega: f64,
) {
    let (rows, cols) = old.dim();
    assert_eq!(new.dim(), (rows, cols), "jacobi_sweep: output shape");
    check_operands(fixed, source, (rows, cols));
    let h2 = h * h;

    for i in 1..rows.saturating_sub(1) {
        for j in 1..cols.saturating_sub(1) {
            if fixed[[i, j]] {
                continue;
            }
            let charge = source.map_or(0.0, |rho| h2 * rho[[i, j]]);
            let estimate = 0.25
                * (old[[i + 1, j]] + old[[i - 1, j]] + old[[i, j + 1]] + old[[i, j - 1]]
                    + charge);
            new[[i, j]] = (1.0 - omega) * old[[i, j]] + omega * estimate;
        }
    }
}

/// One relaxation sweep in place. Row-major order means (i-1, j) and
/// (i, j-1) have already been updated when (i, j) is computed.
///
/// # Panics
///
/// Panics if `fixed` or `source` differ in shape from `phi`.
pub fn gauss_seidel_sweep(
    phi: &mut Array2<f64>,
    fixed: &Array2<bool>,
    source: Option<&Array2<f64>>,
    h: f64,
    omega: f64,
) {
    let (rows, cols) = phi.dim();
    check_operands(fixed, source, (rows, cols));
    let h2 = h * h;

    for i in 1..rows.saturating_sub(1) {
        for j in 1..cols.saturating_sub(1) {
            if fixed[[i, j]] {
                continue;
            }
            let charge = source.map_or(0.0, |rho| h2 * rho[[i, j]]);
            let estimate = 0.25
                * (phi[[i + 1, j]] + phi[[i - 1, j]] + phi[[i, j + 1]] + phi[[i, j - 1]]
                    + charge);
            phi[[i, j]] = (1.0 - omega) * phi[[i, j]] + omega * estimate;
        }
    }
}

fn check_operands(fixed: &Array2<bool>, source: Option<&Array2<f64>>, shape: (usize, usize)) {
    assert_eq!(fixed.dim(), shape, "fixed mask shape");
    if let Some(rho) = source {
        assert_eq!(rho.dim(), shape, "source shape");
    }
}

/// Relaxation state for one problem. Grid, boundary and parameters are
/// fixed at construction; the fixed-node mask is derived from them.
pub struct Solver {
    grid: Grid,
    boundary: Boundary,
    params: SolverParams,
    source: Option<ChargeDensity>,
    fixed: Array2<bool>,
    potential: Potential,
    previous: Array2<f64>, // Field before the current sweep
    iteration: usize,
    delta: f64,
    history: Vec<f64>,
}

impl Solver {
    pub fn new(
        grid: Grid,
        boundary: Boundary,
        source: Option<ChargeDensity>,
        params: SolverParams,
    ) -> Result<Self> {
        params.validate()?;
        if let Some(density) = &source {
            if density.dim() != grid.shape() {
                return Err(RelaxError::ShapeMismatch {
                    expected: grid.shape(),
                    found: density.dim(),
                });
            }
        }
        if boundary == Boundary::Electrodes(Placement::Truncate) {
            warn!("truncating electrode placement may sit one node off from rounding");
        }

        let mut potential = Potential::for_grid(&grid);
        boundary.apply(&mut potential.phi)?;
        let fixed = boundary.fixed_mask(grid.rows, grid.cols);
        let previous = potential.phi.clone();

        debug!(
            rows = grid.rows,
            cols = grid.cols,
            method = %params.method,
            omega = params.omega,
            tolerance = params.tolerance,
            "solver ready"
        );

        Ok(Self {
            grid,
            boundary,
            params,
            source,
            fixed,
            potential,
            previous,
            iteration: 0,
            delta: f64::INFINITY,
            history: Vec::new(),
        })
    }

    /// Laplace problem with the electrode pair on a grounded box.
    pub fn laplace(grid: Grid, params: SolverParams) -> Result<Self> {
        Self::new(grid, Boundary::electrodes(), None, params)
    }

    /// Poisson problem driven by `rho` inside a grounded box. Without an
    /// explicit cap the run stops after [`DEFAULT_POISSON_MAX_ITER`] sweeps.
    pub fn poisson(grid: Grid, rho: ChargeDensity, mut params: SolverParams) -> Result<Self> {
        params.max_iter.get_or_insert(DEFAULT_POISSON_MAX_ITER);
        Self::new(grid, Boundary::grounded(), Some(rho), params)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    pub fn potential(&self) -> &Potential {
        &self.potential
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn is_converged(&self) -> bool {
        self.delta <= self.params.tolerance
    }

    fn is_capped(&self) -> bool {
        self.params
            .max_iter
            .is_some_and(|max_iter| self.iteration >= max_iter)
    }

    /// Run one sweep: interior update, boundary re-stamp, then measure the
    /// change against the pre-sweep field. Returns that change.
    pub fn step(&mut self) -> Result<f64> {
        // 1. Snapshot the field
        self.previous.assign(&self.potential.phi);

        // 2. Update the free nodes
        let source = self.source.as_ref().map(|density| &density.rho);
        match self.params.method {
            Method::Jacobi => jacobi_sweep(
                &self.previous,
                &mut self.potential.phi,
                &self.fixed,
                source,
                self.grid.h,
                self.params.omega,
            ),
            Method::GaussSeidel => gauss_seidel_sweep(
                &mut self.potential.phi,
                &self.fixed,
                source,
                self.grid.h,
                self.params.omega,
            ),
        }

        // 3. Re-assert the fixed nodes
        self.boundary.stamp(&mut self.potential.phi);

        // 4. Measure the change
        self.iteration += 1;
        let delta = max_abs_diff(&self.potential.phi, &self.previous);
        if !delta.is_finite() {
            return Err(RelaxError::NumericalDivergence {
                iteration: self.iteration,
            });
        }
        self.delta = delta;
        self.history.push(delta);
        trace!(iteration = self.iteration, delta, "sweep");

        Ok(delta)
    }

    pub fn run(self) -> Result<Solution> {
        self.run_with_observer(|_| {})
    }

    /// Sweep until the change drops to the tolerance or the cap is reached.
    /// `observer` sees the state every `report_every` sweeps.
    pub fn run_with_observer<F>(mut self, mut observer: F) -> Result<Solution>
    where
        F: FnMut(&Progress<'_>),
    {
        while !self.is_converged() {
            if self.is_capped() {
                warn!(
                    iterations = self.iteration,
                    delta = self.delta,
                    tolerance = self.params.tolerance,
                    "iteration cap reached before convergence"
                );
                break;
            }

            let delta = self.step()?;

            let every = self.params.report_every;
            if every > 0 && self.iteration % every == 0 {
                observer(&Progress {
                    iteration: self.iteration,
                    delta,
                    potential: &self.potential,
                });
            }
        }

        let converged = self.is_converged();
        if converged {
            info!(
                method = %self.params.method,
                omega = self.params.omega,
                iterations = self.iteration,
                delta = self.delta,
                "converged"
            );
        }

        Ok(Solution {
            potential: self.potential,
            iterations: self.iteration,
            delta: self.delta,
            converged,
            history: self.history,
        })
    }
}

/// Electrode problem on an `(n + 1) x (n + 1)` grid with unit spacing.
pub fn solve_laplace(n: usize, params: SolverParams) -> Result<Solution> {
    Solver::laplace(Grid::square(n, 1.0)?, params)?.run()
}

/// Charge problem on `grid` with square charges stamped in order.
pub fn solve_poisson(grid: Grid, charges: &[Charge], params: SolverParams) -> Result<Solution> {
    let rho = ChargeDensity::from_charges(&grid, charges);
    Solver::poisson(grid, rho, params)?.run()
}
