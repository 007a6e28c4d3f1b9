use crate::error::Result;
use crate::grid::{check_shape, ElectrodeLayout, Placement};
use ndarray::Array2;

/// Value every border node is held at.
pub const GROUND: f64 = 0.0;

/// The fixed nodes of a problem and the values they are held at.
///
/// Stamping is idempotent and only ever writes fixed nodes, so it can be
/// re-applied after every sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Grounded border plus the +1/-1 electrode pair.
    Electrodes(Placement),
    /// Grounded border only, used when the field is driven by a charge density.
    Grounded,
}

impl Boundary {
    pub fn electrodes() -> Self {
        Boundary::Electrodes(Placement::Round)
    }

    pub fn grounded() -> Self {
        Boundary::Grounded
    }

    fn layout(&self, rows: usize, cols: usize) -> Option<ElectrodeLayout> {
        match *self {
            Boundary::Electrodes(placement) => {
                Some(ElectrodeLayout::for_shape(rows, cols, placement))
            }
            Boundary::Grounded => None,
        }
    }

    /// Overwrite the fixed nodes of `phi`.
    pub fn apply(&self, phi: &mut Array2<f64>) -> Result<()> {
        let (rows, cols) = phi.dim();
        check_shape(rows, cols)?;
        self.stamp(phi);
        Ok(())
    }

    /// `apply` without the shape check, for fields already known to be valid.
    pub(crate) fn stamp(&self, phi: &mut Array2<f64>) {
        let (rows, cols) = phi.dim();

        // Left and right borders
        for i in 0..rows {
            phi[[i, 0]] = GROUND;
            phi[[i, cols - 1]] = GROUND;
        }

        // Top and bottom borders
        for j in 0..cols {
            phi[[0, j]] = GROUND;
            phi[[rows - 1, j]] = GROUND;
        }

        if let Some(layout) = self.layout(rows, cols) {
            for i in layout.first_row..=layout.last_row {
                phi[[i, layout.positive_col]] = ElectrodeLayout::POSITIVE;
                phi[[i, layout.negative_col]] = ElectrodeLayout::NEGATIVE;
            }
        }
    }

    /// Mask of the nodes the stencil must leave alone.
    pub fn fixed_mask(&self, rows: usize, cols: usize) -> Array2<bool> {
        let layout = self.layout(rows, cols);
        Array2::from_shape_fn((rows, cols), |(i, j)| {
            let border = i == 0 || j == 0 || i == rows - 1 || j == cols - 1;
            border || layout.is_some_and(|l| l.value_at(i, j).is_some())
        })
    }

    /// The value a fixed node is held at, `None` for free nodes.
    pub fn fixed_value(&self, i: usize, j: usize, rows: usize, cols: usize) -> Option<f64> {
        // Electrodes are stamped after the border, so they take precedence.
        if let Some(value) = self
            .layout(rows, cols)
            .and_then(|layout| layout.value_at(i, j))
        {
            return Some(value);
        }
        let border = i == 0 || j == 0 || i == rows - 1 || j == cols - 1;
        border.then_some(GROUND)
    }

    /// True when every fixed node of `phi` holds its value exactly.
    pub fn holds(&self, phi: &Array2<f64>) -> bool {
        let (rows, cols) = phi.dim();
        phi.indexed_iter().all(|((i, j), &v)| {
            self.fixed_value(i, j, rows, cols)
                .map_or(true, |fixed| v == fixed)
        })
    }
}
