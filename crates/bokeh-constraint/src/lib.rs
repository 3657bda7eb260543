//! Incremental linear constraint solving for Bokeh layout.
//!
//! This crate implements the Cassowary algorithm in its incremental form:
//! - Linear expressions and constraints over arena-allocated variables
//! - Lexicographic strengths (`required`, `strong`, `medium`, `weak`)
//! - Edit variables with fast re-solving through the dual simplex method
//!
//! # Example
//!
//! ```
//! use bokeh_constraint::{expr, Constraint, Operator, Solver, Strength, Variables};
//!
//! let mut vars = Variables::new();
//! let left = vars.add("left");
//! let width = vars.add("width");
//! let right = vars.add("right");
//!
//! let mut solver = Solver::new();
//! solver.add_constraint(&Constraint::required(expr![left], Operator::Eq))?;
//! solver.add_constraint(&Constraint::required(right - (left + width), Operator::Eq))?;
//!
//! solver.add_edit_variable(&vars, width, Strength::STRONG)?;
//! solver.suggest_value(width, 50.0)?;
//! solver.update_variables(&mut vars);
//!
//! assert!((vars.value(right) - 50.0).abs() < 1e-6);
//! # Ok::<(), bokeh_constraint::SolverError>(())
//! ```

mod constraint;
mod error;
mod expression;
mod row;
mod solver;
mod strength;
mod variable;

pub use constraint::{Constraint, ConstraintId, Operator};
pub use error::{Result, SolverError};
pub use expression::{Component, Expression};
pub use solver::Solver;
pub use strength::Strength;
pub use variable::{Variable, Variables};

/// Tolerance below which coefficients and constants are treated as zero.
pub(crate) const EPSILON: f64 = 1.0e-8;

pub(crate) fn near_zero(value: f64) -> bool {
    value.abs() < EPSILON
}
