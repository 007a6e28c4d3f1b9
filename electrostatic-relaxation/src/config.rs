use crate::boundary::Boundary;
use crate::field::{Charge, ChargeDensity};
use crate::grid::{Grid, Placement};
use crate::solver::{Method, Solver, SolverParams, DEFAULT_POISSON_MAX_ITER};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Number of intervals per side when the grid is left unspecified.
pub const DEFAULT_N: usize = 100;

/// Grid configuration. Either `n` (square, n + 1 nodes per side) or both
/// `rows` and `cols`; neither means a `DEFAULT_N` square.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<usize>,
    pub h: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            n: None,
            rows: None,
            cols: None,
            h: 1.0,
        }
    }
}

impl GridConfig {
    fn shape(&self) -> Result<(usize, usize)> {
        match (self.n, self.rows, self.cols) {
            (Some(n), None, None) => Ok((n + 1, n + 1)),
            (None, Some(rows), Some(cols)) => Ok((rows, cols)),
            (None, None, None) => Ok((DEFAULT_N + 1, DEFAULT_N + 1)),
            _ => Err(anyhow!("grid needs either `n` or both `rows` and `cols`")),
        }
    }

    fn validate(&self) -> Result<()> {
        let (rows, cols) = self.shape()?;
        if rows < 3 || cols < 3 {
            return Err(anyhow!(
                "Grid must have at least 3x3 nodes (rows={}, cols={})",
                rows,
                cols
            ));
        }
        if !(self.h > 0.0) || !self.h.is_finite() {
            return Err(anyhow!("Grid spacing must be positive, got {}", self.h));
        }
        Ok(())
    }
}

/// Relaxation scheme, named the way runs are usually described.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    Jacobi,
    JacobiSor,
    GaussSeidel,
    Sor,
}

impl Scheme {
    pub const ALL: [Scheme; 4] = [
        Scheme::Jacobi,
        Scheme::JacobiSor,
        Scheme::GaussSeidel,
        Scheme::Sor,
    ];

    pub fn method(self) -> Method {
        match self {
            Scheme::Jacobi | Scheme::JacobiSor => Method::Jacobi,
            Scheme::GaussSeidel | Scheme::Sor => Method::GaussSeidel,
        }
    }

    pub fn is_relaxed(self) -> bool {
        matches!(self, Scheme::JacobiSor | Scheme::Sor)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scheme::Jacobi => "jacobi",
            Scheme::JacobiSor => "jacobi_sor",
            Scheme::GaussSeidel => "gauss_seidel",
            Scheme::Sor => "sor",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub scheme: Scheme,
    pub omega: f64, // Only used by the relaxed schemes
    pub tolerance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iter: Option<usize>,
    pub report_every: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Sor,
            omega: 1.5,
            tolerance: 1e-5,
            max_iter: None,
            report_every: 100,
        }
    }
}

impl SolverConfig {
    fn validate(&self) -> Result<()> {
        if self.scheme.is_relaxed() && !(self.omega > 0.0 && self.omega < 2.0) {
            return Err(anyhow!("omega must be in (0, 2), got {}", self.omega));
        }
        if !(self.tolerance > 0.0) || !self.tolerance.is_finite() {
            return Err(anyhow!("tolerance must be positive, got {}", self.tolerance));
        }
        if self.max_iter == Some(0) {
            return Err(anyhow!("max_iter must be at least 1"));
        }
        Ok(())
    }

    /// Solver parameters for `scheme`, sharing tolerance, cap and omega.
    pub fn params_for(&self, scheme: Scheme) -> SolverParams {
        let omega = if scheme.is_relaxed() { self.omega } else { 1.0 };
        let mut params = SolverParams::new(scheme.method(), omega)
            .with_tolerance(self.tolerance)
            .with_report_every(self.report_every);
        params.max_iter = self.max_iter;
        params
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// Electrodes in a grounded box, no charge.
    #[default]
    Laplace,
    /// Square charges in a grounded box.
    Poisson,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemConfig {
    pub kind: ProblemKind,
    pub placement: Placement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub width: u32,
    pub height: u32,
    pub render: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
            width: 900,
            height: 800,
            render: true,
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!(
                "Image dimensions must be positive (width={}, height={})",
                self.width,
                self.height
            ));
        }
        Ok(())
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid: GridConfig,
    pub solver: SolverConfig,
    pub problem: ProblemConfig,
    pub charges: Vec<Charge>,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::parse(&content)
    }

    /// Parse and validate a TOML document
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.solver.validate()?;
        self.output.validate()?;

        let grid = self.grid()?;
        match self.problem.kind {
            ProblemKind::Laplace => {
                if !self.charges.is_empty() {
                    return Err(anyhow!("charges are only used by the poisson problem"));
                }
            }
            ProblemKind::Poisson => {
                if self.charges.is_empty() {
                    return Err(anyhow!("At least one charge must be defined"));
                }
                for (idx, charge) in self.charges.iter().enumerate() {
                    if !grid.in_bounds(charge.y, charge.x) {
                        return Err(anyhow!(
                            "Charge {} at ({}, {}) is outside grid bounds ({}, {})",
                            idx,
                            charge.x,
                            charge.y,
                            grid.cols,
                            grid.rows
                        ));
                    }
                    if charge.size == 0 {
                        return Err(anyhow!("Charge {} has zero size", idx));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn grid(&self) -> Result<Grid> {
        let (rows, cols) = self.grid.shape()?;
        Ok(Grid::new(rows, cols, self.grid.h)?)
    }

    pub fn params(&self) -> SolverParams {
        self.solver.params_for(self.solver.scheme)
    }

    pub fn charge_density(&self, grid: &Grid) -> ChargeDensity {
        ChargeDensity::from_charges(grid, &self.charges)
    }

    /// Solver for this problem with the given scheme.
    pub fn solver(&self, scheme: Scheme) -> Result<Solver> {
        let grid = self.grid()?;
        let params = self.solver.params_for(scheme);
        let solver = match self.problem.kind {
            ProblemKind::Laplace => Solver::new(
                grid,
                Boundary::Electrodes(self.problem.placement),
                None,
                params,
            )?,
            ProblemKind::Poisson => Solver::poisson(grid, self.charge_density(&grid), params)?,
        };
        Ok(solver)
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        match self.grid() {
            Ok(grid) => info!(
                "grid: {}x{} nodes, h={} ({} x {})",
                grid.rows,
                grid.cols,
                grid.h,
                grid.width(),
                grid.height()
            ),
            Err(e) => warn!("grid: {}", e),
        }
        info!(
            "solver: {} omega={} tolerance={:e} max_iter={}",
            self.solver.scheme,
            self.solver.omega,
            self.solver.tolerance,
            self.solver
                .max_iter
                .map(|m| m.to_string())
                .unwrap_or_else(|| match self.problem.kind {
                    ProblemKind::Poisson => DEFAULT_POISSON_MAX_ITER.to_string(),
                    ProblemKind::Laplace => "none".to_string(),
                })
        );
        match self.problem.kind {
            ProblemKind::Laplace => info!(
                "problem: laplace, electrodes placed by {:?}",
                self.problem.placement
            ),
            ProblemKind::Poisson => {
                info!("problem: poisson, {} charge(s)", self.charges.len());
                for (i, c) in self.charges.iter().enumerate() {
                    info!("  charge {}: ({}, {}) size={} value={}", i, c.x, c.y, c.size, c.value);
                }
            }
        }
    }
}
