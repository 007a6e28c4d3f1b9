use crate::grid::Grid;
use ndarray::{Array2, ArrayView1, Zip};
use serde::{Deserialize, Serialize};

/// Scalar potential phi on the grid nodes, indexed `[[i, j]]` (row, column).
#[derive(Debug, Clone, PartialEq)]
pub struct Potential {
    pub phi: Array2<f64>,
}

impl Potential {
    pub fn new(rows: usize, cols: usize) -> Self {
        Potential {
            phi: Array2::zeros((rows, cols)),
        }
    }

    pub fn for_grid(grid: &Grid) -> Self {
        Self::new(grid.rows, grid.cols)
    }

    pub fn column(&self, j: usize) -> ArrayView1<'_, f64> {
        self.phi.column(j)
    }

    /// Largest |phi| anywhere on the grid.
    pub fn max_abs(&self) -> f64 {
        self.phi.iter().fold(0.0_f64, |acc, &v| acc.max(v.abs()))
    }
}

/// Max over all nodes of |a - b|.
///
/// A NaN anywhere makes the result NaN, so a blown-up field is never
/// mistaken for a converged one.
///
/// # Panics
///
/// Panics if the two arrays differ in shape.
pub fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    Zip::from(a).and(b).fold(0.0_f64, |acc, &x, &y| {
        let diff = (x - y).abs();
        if diff > acc || diff.is_nan() {
            diff
        } else {
            acc
        }
    })
}

/// A square block of charge, centred on node (x, y) = (column, row).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub x: usize,
    pub y: usize,
    pub size: usize,
    pub value: f64,
}

impl Charge {
    pub fn new(x: usize, y: usize, size: usize, value: f64) -> Self {
        Self { x, y, size, value }
    }
}

/// Fixed charge density rho, the source term of the Poisson variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeDensity {
    pub rho: Array2<f64>,
}

impl ChargeDensity {
    pub fn new(rows: usize, cols: usize) -> Self {
        ChargeDensity {
            rho: Array2::zeros((rows, cols)),
        }
    }

    pub fn for_grid(grid: &Grid) -> Self {
        Self::new(grid.rows, grid.cols)
    }

    pub fn from_charges(grid: &Grid, charges: &[Charge]) -> Self {
        let mut density = Self::for_grid(grid);
        for charge in charges {
            density.add(charge);
        }
        density
    }

    pub fn dim(&self) -> (usize, usize) {
        self.rho.dim()
    }

    pub fn add(&mut self, charge: &Charge) {
        self.inject(charge.x, charge.y, charge.size, charge.value);
    }

    /// Stamp a `size x size` square of `value` centred on column `center_x`,
    /// row `center_y`. The square starts `size / 2` nodes before the centre.
    ///
    /// Parts falling outside the array are dropped, the same way a clipped
    /// slice assignment would behave.
    pub fn inject(&mut self, center_x: usize, center_y: usize, size: usize, value: f64) {
        let (rows, cols) = self.rho.dim();
        let (row_start, row_end) = clip(center_y, size, rows);
        let (col_start, col_end) = clip(center_x, size, cols);
        for i in row_start..row_end {
            for j in col_start..col_end {
                self.rho[[i, j]] = value;
            }
        }
    }

    pub fn total(&self) -> f64 {
        self.rho.sum()
    }
}

/// Half-open range `[center - size/2, center - size/2 + size)` clipped to `0..len`.
fn clip(center: usize, size: usize, len: usize) -> (usize, usize) {
    let start = center.saturating_sub(size / 2);
    let end = center.saturating_add(size - size / 2);
    (start.min(len), end.min(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn max_abs_diff_picks_largest_change() {
        let a = array![[0.0, 1.0], [2.0, -3.0]];
        let b = array![[0.5, 1.0], [2.0, 1.0]];
        assert_eq!(max_abs_diff(&a, &b), 4.0);
        assert_eq!(max_abs_diff(&a, &a), 0.0);
    }

    #[test]
    fn max_abs_diff_propagates_nan() {
        let a = array![[f64::NAN, 0.0], [0.0, 0.0]];
        let b = array![[0.0, 5.0], [0.0, 0.0]];
        assert!(max_abs_diff(&a, &b).is_nan());
        assert!(max_abs_diff(&b, &a).is_nan());
    }

    #[test]
    fn potential_max_abs() {
        let mut p = Potential::new(3, 3);
        p.phi[[1, 1]] = -0.75;
        p.phi[[2, 0]] = 0.5;
        assert_eq!(p.max_abs(), 0.75);
        assert_eq!(Potential::new(2, 2).max_abs(), 0.0);
    }

    #[test]
    fn inject_places_square_around_center() {
        let mut density = ChargeDensity::new(10, 10);
        density.inject(5, 3, 3, 2.0);
        // rows 2..5, cols 4..7
        assert_eq!(density.rho[[2, 4]], 2.0);
        assert_eq!(density.rho[[4, 6]], 2.0);
        assert_eq!(density.rho[[5, 5]], 0.0);
        assert_eq!(density.rho[[3, 7]], 0.0);
        assert_eq!(density.total(), 18.0);
    }

    #[test]
    fn inject_even_size_starts_half_before_center() {
        let mut density = ChargeDensity::new(20, 20);
        density.inject(5, 10, 2, 1.0);
        assert_eq!(density.rho[[9, 4]], 1.0);
        assert_eq!(density.rho[[10, 5]], 1.0);
        assert_eq!(density.rho[[11, 5]], 0.0);
        assert_eq!(density.total(), 4.0);
    }

    #[test]
    fn inject_clips_at_edges() {
        let mut density = ChargeDensity::new(5, 5);
        density.inject(0, 4, 4, -1.0);
        // rows 2..5, cols 0..2 survive
        assert_eq!(density.total(), -6.0);
        assert_eq!(density.rho[[4, 0]], -1.0);

        density.inject(40, 40, 3, 7.0);
        assert_eq!(density.total(), -6.0);
    }

    #[test]
    fn inject_far_outside_leaves_density_untouched() {
        let mut density = ChargeDensity::new(10, 10);
        density.inject(usize::MAX, 5, 4, 1.0);
        density.inject(5, usize::MAX, 4, 1.0);
        density.inject(usize::MAX - 1, usize::MAX - 1, 3, 1.0);
        assert_eq!(density.total(), 0.0);
    }

    #[test]
    fn from_charges_overwrites_in_order() {
        let grid = Grid::new(8, 8, 1.0).unwrap();
        let density = ChargeDensity::from_charges(
            &grid,
            &[Charge::new(3, 3, 2, 1.0), Charge::new(3, 3, 1, -1.0)],
        );
        assert_eq!(density.rho[[3, 3]], -1.0);
        assert_eq!(density.rho[[2, 2]], 1.0);
    }
}
