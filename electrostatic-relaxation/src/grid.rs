use crate::error::{RelaxError, Result};
use serde::{Deserialize, Serialize};

/// Fraction of the extent where the electrodes start (columns and rows).
const ELECTRODE_LOW: f64 = 0.2;
/// Fraction of the extent where the electrodes end.
const ELECTRODE_HIGH: f64 = 0.8;

/// How electrode fractions are turned into node indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Nearest node.
    #[default]
    Round,
    /// Floor of the fraction. Reproduces older runs but can sit one node
    /// off from `Round` near fractional boundaries.
    Truncate,
}

impl Placement {
    fn index(self, fraction: f64, extent: usize) -> usize {
        let position = fraction * extent as f64;
        match self {
            Placement::Round => position.round() as usize,
            Placement::Truncate => position as usize,
        }
    }
}

/// Location of the +1 and -1 electrode segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectrodeLayout {
    pub positive_col: usize, // Column held at +1
    pub negative_col: usize, // Column held at -1
    pub first_row: usize,    // First row of both segments
    pub last_row: usize,     // Last row of both segments (inclusive)
}

impl ElectrodeLayout {
    pub const POSITIVE: f64 = 1.0;
    pub const NEGATIVE: f64 = -1.0;

    /// Layout for a field of `rows x cols` nodes.
    pub fn for_shape(rows: usize, cols: usize, placement: Placement) -> Self {
        let extent_x = cols - 1;
        let extent_y = rows - 1;
        Self {
            positive_col: placement.index(ELECTRODE_LOW, extent_x),
            negative_col: placement.index(ELECTRODE_HIGH, extent_x),
            first_row: placement.index(ELECTRODE_LOW, extent_y),
            last_row: placement.index(ELECTRODE_HIGH, extent_y),
        }
    }

    /// Fixed electrode value at (i, j), if any.
    pub fn value_at(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.first_row || i > self.last_row {
            return None;
        }
        // The negative electrode is stamped last and wins on a shared column.
        if j == self.negative_col {
            Some(Self::NEGATIVE)
        } else if j == self.positive_col {
            Some(Self::POSITIVE)
        } else {
            None
        }
    }
}

/// Uniform rectangular grid. Node (i, j) sits at x = j*h, y = i*h.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub rows: usize, // Number of nodes along y
    pub cols: usize, // Number of nodes along x
    pub h: f64,      // Node spacing
}

impl Grid {
    pub fn new(rows: usize, cols: usize, h: f64) -> Result<Self> {
        check_shape(rows, cols)?;
        if !h.is_finite() || h <= 0.0 {
            return Err(RelaxError::InvalidSpacing(h));
        }
        Ok(Grid { rows, cols, h })
    }

    /// `(n + 1) x (n + 1)` nodes, the usual way runs are sized.
    pub fn square(n: usize, h: f64) -> Result<Self> {
        Self::new(n + 1, n + 1, h)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn x_coord(&self, j: usize) -> f64 {
        self.h * j as f64
    }

    pub fn y_coord(&self, i: usize) -> f64 {
        self.h * i as f64
    }

    pub fn in_bounds(&self, i: usize, j: usize) -> bool {
        i < self.rows && j < self.cols
    }

    /// Physical extent along x, first to last node.
    pub fn width(&self) -> f64 {
        (self.cols - 1) as f64 * self.h
    }

    pub fn height(&self) -> f64 {
        (self.rows - 1) as f64 * self.h
    }
}

pub(crate) fn check_shape(rows: usize, cols: usize) -> Result<()> {
    if rows < 3 || cols < 3 {
        return Err(RelaxError::InvalidGridShape { rows, cols });
    }
    Ok(())
}
