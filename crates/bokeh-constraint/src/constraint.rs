//! Linear constraints.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::expression::Expression;
use crate::strength::Strength;
use crate::variable::Variables;
use crate::EPSILON;

/// Process-wide constraint id counter. Starts at zero when the process
/// starts and is never reset.
static NEXT_CONSTRAINT_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstraintId(u64);

impl ConstraintId {
    fn next() -> Self {
        Self(NEXT_CONSTRAINT_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// The raw id number.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// The relational operator of a constraint. The right-hand side is always
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operator {
    /// `expression <= 0`
    Le,
    /// `expression >= 0`
    Ge,
    /// `expression == 0`
    Eq,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Le => write!(f, "<="),
            Operator::Ge => write!(f, ">="),
            Operator::Eq => write!(f, "=="),
        }
    }
}

/// A linear constraint `expression ⋈ 0` with a strength.
///
/// Constraints are immutable. To change the strength of a constraint held by
/// a solver, remove it and add a new one.
#[derive(Debug, Clone)]
pub struct Constraint {
    id: ConstraintId,
    expression: Expression,
    op: Operator,
    strength: Strength,
}

impl Constraint {
    /// Create a constraint. The strength is clipped into the legal range.
    pub fn new(expression: impl Into<Expression>, op: Operator, strength: Strength) -> Self {
        Self {
            id: ConstraintId::next(),
            expression: expression.into(),
            op,
            strength: Strength::clip(strength.value()),
        }
    }

    /// Create a required constraint.
    pub fn required(expression: impl Into<Expression>, op: Operator) -> Self {
        Self::new(expression, op, Strength::REQUIRED)
    }

    pub fn id(&self) -> ConstraintId {
        self.id
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn strength(&self) -> Strength {
        self.strength
    }

    /// Check whether the constraint holds for the current variable values,
    /// within the solver tolerance.
    pub fn is_satisfied(&self, vars: &Variables) -> bool {
        let value = self.expression.value(vars);
        match self.op {
            Operator::Le => value <= EPSILON,
            Operator::Ge => value >= -EPSILON,
            Operator::Eq => value.abs() <= EPSILON,
        }
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Constraint {}

impl PartialOrd for Constraint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Constraint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} 0 | strength = {}",
            self.expression,
            self.op,
            self.strength.value()
        )
    }
}
