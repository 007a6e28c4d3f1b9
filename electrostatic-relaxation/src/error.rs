use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelaxError>;

/// Failures of the relaxation core.
///
/// Everything except `NumericalDivergence` and `NonConvergence` is raised
/// before the first sweep, so a rejected run never touches a field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelaxError {
    #[error("grid of {rows}x{cols} nodes has no interior (need at least 3x3)")]
    InvalidGridShape { rows: usize, cols: usize },

    #[error("grid spacing must be finite and positive, got {0}")]
    InvalidSpacing(f64),

    #[error("relaxation factor must lie in (0, 2), got {0}")]
    InvalidRelaxationFactor(f64),

    #[error("tolerance must be finite and positive, got {0}")]
    InvalidTolerance(f64),

    #[error("charge density is {found:?} but the field is {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("non-finite update at iteration {iteration}, the method diverged")]
    NumericalDivergence { iteration: usize },

    #[error("no convergence after {iterations} iterations (delta = {delta:e})")]
    NonConvergence { iterations: usize, delta: f64 },
}
