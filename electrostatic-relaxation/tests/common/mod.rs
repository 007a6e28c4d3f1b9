//! Shared helpers for the integration tests

use electrostatic_relaxation::{Boundary, Grid, Solver, SolverParams};
use ndarray::Array2;

/// Every scheme the crate offers, with the factors used in the tests.
pub fn all_schemes() -> Vec<(&'static str, SolverParams)> {
    vec![
        ("jacobi", SolverParams::jacobi()),
        ("jacobi_sor", SolverParams::jacobi_sor(0.8)),
        ("gauss_seidel", SolverParams::gauss_seidel()),
        ("sor", SolverParams::sor(1.5)),
    ]
}

pub fn laplace_solver(n: usize, params: SolverParams) -> Solver {
    Solver::laplace(Grid::square(n, 1.0).unwrap(), params).unwrap()
}

/// Plain Jacobi update of the free nodes, written out with no relaxation.
pub fn reference_jacobi(phi: &Array2<f64>, boundary: Boundary) -> Array2<f64> {
    let (rows, cols) = phi.dim();
    let fixed = boundary.fixed_mask(rows, cols);
    let mut next = phi.clone();
    for i in 1..rows - 1 {
        for j in 1..cols - 1 {
            if !fixed[[i, j]] {
                next[[i, j]] =
                    0.25 * (phi[[i + 1, j]] + phi[[i - 1, j]] + phi[[i, j + 1]] + phi[[i, j - 1]]);
            }
        }
    }
    next
}

/// Plain Gauss-Seidel update of the free nodes, in place, row-major.
pub fn reference_gauss_seidel(phi: &Array2<f64>, boundary: Boundary) -> Array2<f64> {
    let (rows, cols) = phi.dim();
    let fixed = boundary.fixed_mask(rows, cols);
    let mut next = phi.clone();
    for i in 1..rows - 1 {
        for j in 1..cols - 1 {
            if !fixed[[i, j]] {
                next[[i, j]] = 0.25
                    * (next[[i + 1, j]] + next[[i - 1, j]] + next[[i, j + 1]] + next[[i, j - 1]]);
            }
        }
    }
    next
}

/// Largest |phi(i, j) + phi(i, cols - 1 - j)|, zero for a field that is odd
/// under left-right mirroring.
pub fn mirror_defect(phi: &Array2<f64>) -> f64 {
    let (_, cols) = phi.dim();
    phi.indexed_iter()
        .map(|((i, j), &v)| (v + phi[[i, cols - 1 - j]]).abs())
        .fold(0.0, f64::max)
}
