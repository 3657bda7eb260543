//! Error types for bokeh-layout.

use bokeh_constraint::SolverError;
use thiserror::Error;

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Errors that can occur while building or solving a layout.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// The solver rejected a layout constraint or edit.
    #[error("solver error: {0}")]
    Solver(#[from] SolverError),

    /// The layout has not been installed in a solver.
    #[error("layout is not installed in a solver")]
    NotInstalled,

    /// The layout is already installed in a solver.
    #[error("layout is already installed in a solver")]
    AlreadyInstalled,

    /// A size or border is negative or not finite.
    #[error("invalid {what}: {value}")]
    InvalidSize { what: &'static str, value: f64 },
}

impl LayoutError {
    /// Create an invalid size error.
    pub fn invalid_size(what: &'static str, value: f64) -> Self {
        Self::InvalidSize { what, value }
    }
}
