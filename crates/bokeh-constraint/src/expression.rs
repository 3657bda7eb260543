//! Linear expressions over constraint variables.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use crate::variable::{Variable, Variables};
use crate::near_zero;

/// One argument of an expression constructor.
///
/// Numbers add to the constant, bare variables add a unit term, and
/// `(coefficient, variable)` pairs add a scaled term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Component {
    Constant(f64),
    Variable(Variable),
    Term(f64, Variable),
}

impl From<f64> for Component {
    fn from(value: f64) -> Self {
        Component::Constant(value)
    }
}

impl From<Variable> for Component {
    fn from(variable: Variable) -> Self {
        Component::Variable(variable)
    }
}

impl From<(f64, Variable)> for Component {
    fn from((coefficient, variable): (f64, Variable)) -> Self {
        Component::Term(coefficient, variable)
    }
}

/// Build an [`Expression`] from a mix of numbers, variables and
/// `(coefficient, variable)` pairs.
///
/// ```
/// use bokeh_constraint::{expr, Variables};
///
/// let mut vars = Variables::new();
/// let left = vars.add("left");
/// let right = vars.add("right");
/// // right - left - 10
/// let e = expr![right, (-1.0, left), -10.0];
/// assert_eq!(e.constant(), -10.0);
/// ```
#[macro_export]
macro_rules! expr {
    ($($item:expr),* $(,)?) => {
        $crate::Expression::from_components([
            $($crate::Component::from($item)),*
        ])
    };
}

/// An immutable linear expression: `Σ coefficient·variable + constant`.
///
/// Terms with a zero coefficient are never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expression {
    terms: BTreeMap<Variable, f64>,
    constant: f64,
}

impl Expression {
    /// A constant expression.
    pub fn from_constant(constant: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant,
        }
    }

    /// Build an expression by summing components.
    ///
    /// Coefficients of repeated variables are added together.
    pub fn from_components<I>(components: I) -> Self
    where
        I: IntoIterator<Item = Component>,
    {
        let mut expr = Self::default();
        for component in components {
            match component {
                Component::Constant(value) => expr.constant += value,
                Component::Variable(variable) => expr.add_term(variable, 1.0),
                Component::Term(coefficient, variable) => expr.add_term(variable, coefficient),
            }
        }
        expr
    }

    fn add_term(&mut self, variable: Variable, coefficient: f64) {
        let entry = self.terms.entry(variable).or_insert(0.0);
        *entry += coefficient;
        if near_zero(*entry) {
            self.terms.remove(&variable);
        }
    }

    fn add_expression(&mut self, other: &Expression, multiplier: f64) {
        self.constant += other.constant * multiplier;
        for (&variable, &coefficient) in &other.terms {
            self.add_term(variable, coefficient * multiplier);
        }
    }

    fn scaled(mut self, scalar: f64) -> Self {
        self.constant *= scalar;
        self.terms.retain(|_, coefficient| {
            *coefficient *= scalar;
            !near_zero(*coefficient)
        });
        self
    }

    /// The variable terms of the expression, ordered by variable id.
    pub fn terms(&self) -> &BTreeMap<Variable, f64> {
        &self.terms
    }

    /// The coefficient of a variable (zero if absent).
    pub fn coefficient(&self, variable: Variable) -> f64 {
        self.terms.get(&variable).copied().unwrap_or(0.0)
    }

    /// The constant offset.
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Check if the expression has no variable terms.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate the expression against the current variable values.
    pub fn value(&self, vars: &Variables) -> f64 {
        self.terms
            .iter()
            .fold(self.constant, |acc, (&variable, &coefficient)| {
                acc + coefficient * vars.value(variable)
            })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (variable, coefficient) in &self.terms {
            if first {
                write!(f, "{} * {}", coefficient, variable)?;
                first = false;
            } else if *coefficient < 0.0 {
                write!(f, " - {} * {}", -coefficient, variable)?;
            } else {
                write!(f, " + {} * {}", coefficient, variable)?;
            }
        }
        if first {
            write!(f, "{}", self.constant)
        } else if self.constant < 0.0 {
            write!(f, " - {}", -self.constant)
        } else if self.constant > 0.0 {
            write!(f, " + {}", self.constant)
        } else {
            Ok(())
        }
    }
}

impl From<f64> for Expression {
    fn from(constant: f64) -> Self {
        Self::from_constant(constant)
    }
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Self::from_components([Component::Variable(variable)])
    }
}

impl From<(f64, Variable)> for Expression {
    fn from(term: (f64, Variable)) -> Self {
        Self::from_components([Component::from(term)])
    }
}

impl<T: Into<Expression>> Add<T> for Expression {
    type Output = Expression;

    fn add(mut self, rhs: T) -> Expression {
        self.add_expression(&rhs.into(), 1.0);
        self
    }
}

impl<T: Into<Expression>> Sub<T> for Expression {
    type Output = Expression;

    fn sub(mut self, rhs: T) -> Expression {
        self.add_expression(&rhs.into(), -1.0);
        self
    }
}

impl Mul<f64> for Expression {
    type Output = Expression;

    fn mul(self, rhs: f64) -> Expression {
        self.scaled(rhs)
    }
}

impl Mul<Expression> for f64 {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        rhs.scaled(self)
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        self.scaled(-1.0)
    }
}

impl<T: Into<Expression>> Add<T> for Variable {
    type Output = Expression;

    fn add(self, rhs: T) -> Expression {
        Expression::from(self) + rhs
    }
}

impl<T: Into<Expression>> Sub<T> for Variable {
    type Output = Expression;

    fn sub(self, rhs: T) -> Expression {
        Expression::from(self) - rhs
    }
}

impl Mul<f64> for Variable {
    type Output = Expression;

    fn mul(self, rhs: f64) -> Expression {
        Expression::from((rhs, self))
    }
}

impl Mul<Variable> for f64 {
    type Output = Expression;

    fn mul(self, rhs: Variable) -> Expression {
        Expression::from((self, rhs))
    }
}

impl Neg for Variable {
    type Output = Expression;

    fn neg(self) -> Expression {
        Expression::from((-1.0, self))
    }
}

impl Add<Variable> for f64 {
    type Output = Expression;

    fn add(self, rhs: Variable) -> Expression {
        Expression::from(rhs) + self
    }
}

impl Sub<Variable> for f64 {
    type Output = Expression;

    fn sub(self, rhs: Variable) -> Expression {
        Expression::from(self) - rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_are_summed() {
        let mut vars = Variables::new();
        let x = vars.add("x");
        let y = vars.add("y");

        let e = crate::expr![1.0, x, (2.0, y), (3.0, x), 4.5];
        assert_eq!(e.constant(), 5.5);
        assert_eq!(e.coefficient(x), 4.0);
        assert_eq!(e.coefficient(y), 2.0);
        assert_eq!(e.terms().len(), 2);
    }

    #[test]
    fn test_zero_terms_are_dropped() {
        let mut vars = Variables::new();
        let x = vars.add("x");
        let y = vars.add("y");

        let e = crate::expr![x, (-1.0, x), (0.0, y), 3.0];
        assert!(e.is_constant());
        assert_eq!(e.coefficient(x), 0.0);
        assert_eq!(e.constant(), 3.0);
    }

    #[test]
    fn test_value_is_a_fresh_read() {
        let mut vars = Variables::new();
        let x = vars.add("x");
        let y = vars.add("y");
        let e = crate::expr![(2.0, x), y, 1.0];

        vars.set_value(x, 3.0);
        vars.set_value(y, 4.0);
        assert_eq!(e.value(&vars), 11.0);

        vars.set_value(y, -4.0);
        assert_eq!(e.value(&vars), 3.0);
    }

    #[test]
    fn test_operators() {
        let mut vars = Variables::new();
        let left = vars.add("left");
        let width = vars.add("width");
        let right = vars.add("right");

        let e = right - (left + width);
        assert_eq!(e.coefficient(right), 1.0);
        assert_eq!(e.coefficient(left), -1.0);
        assert_eq!(e.coefficient(width), -1.0);

        let half = 0.5 * width + 10.0;
        assert_eq!(half.coefficient(width), 0.5);
        assert_eq!(half.constant(), 10.0);

        let doubled = -(half * 2.0);
        assert_eq!(doubled.coefficient(width), -1.0);
        assert_eq!(doubled.constant(), -20.0);

        let cancelled = left - left;
        assert!(cancelled.is_constant());
    }

    #[test]
    fn test_terms_iterate_in_id_order() {
        let mut vars = Variables::new();
        let a = vars.add("a");
        let b = vars.add("b");
        let c = vars.add("c");

        let e = crate::expr![c, a, b];
        let order: Vec<_> = e.terms().keys().copied().collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn test_display() {
        let mut vars = Variables::new();
        let x = vars.add("x");
        let y = vars.add("y");
        let e = crate::expr![x, (-2.0, y), -5.0];
        assert_eq!(e.to_string(), "1 * v0 - 2 * v1 - 5");
        assert_eq!(Expression::from_constant(3.0).to_string(), "3");
    }
}
