//! Error types for bokeh-constraint.

use thiserror::Error;

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;

/// Errors that can occur during constraint solving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    /// The constraint is already in the solver.
    #[error("duplicate constraint")]
    DuplicateConstraint,

    /// The constraint is not in the solver.
    #[error("unknown constraint")]
    UnknownConstraint,

    /// The variable is already an edit variable.
    #[error("duplicate edit variable")]
    DuplicateEditVariable,

    /// The variable is not an edit variable.
    #[error("unknown edit variable")]
    UnknownEditVariable,

    /// Edit variables cannot be added with a required strength.
    #[error("edit variable strength must be weaker than required")]
    BadRequiredStrength,

    /// A required constraint cannot be satisfied alongside the required
    /// constraints already in the solver.
    #[error("unsatisfiable constraint")]
    UnsatisfiableConstraint,

    /// An internal invariant of the solver was violated (should not happen).
    #[error("internal solver error: {0}")]
    Internal(&'static str),
}

impl SolverError {
    /// Check whether the error reports a misuse of the solver API rather than
    /// a property of the constraint system.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            SolverError::DuplicateConstraint
                | SolverError::UnknownConstraint
                | SolverError::DuplicateEditVariable
                | SolverError::UnknownEditVariable
                | SolverError::BadRequiredStrength
        )
    }
}
