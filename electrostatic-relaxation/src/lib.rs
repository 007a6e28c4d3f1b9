//! Electrostatic potential on a rectangular grid by stationary relaxation.
//!
//! A [`Boundary`] stamps the fixed nodes (grounded border, optionally a
//! +1/-1 electrode pair) and a [`Solver`] sweeps the five-point stencil over
//! the free nodes until the largest change per sweep falls to the tolerance.
//! Sweeps are either Jacobi (read a pre-sweep snapshot) or Gauss-Seidel
//! (update in place), each with an optional relaxation factor.
//!
//! With a [`ChargeDensity`] the same stencil solves `lap(phi) = -rho` with
//! the border grounded, so a positive charge raises the potential around it.
//!
//! ```no_run
//! use electrostatic_relaxation::{solve_laplace, SolverParams};
//!
//! let solution = solve_laplace(100, SolverParams::sor(1.5)).unwrap();
//! println!("{} iterations", solution.iterations);
//! ```

pub mod boundary;
pub mod config;
pub mod error;
pub mod field;
pub mod grid;
pub mod solver;
pub mod visualisation;

pub use boundary::Boundary;
pub use error::{RelaxError, Result};
pub use field::{max_abs_diff, Charge, ChargeDensity, Potential};
pub use grid::{ElectrodeLayout, Grid, Placement};
pub use solver::{
    gauss_seidel_sweep, jacobi_sweep, solve_laplace, solve_poisson, Method, Progress, Solution,
    Solver, SolverParams,
};
