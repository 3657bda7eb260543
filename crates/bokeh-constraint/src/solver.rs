//! Cassowary constraint solver implementation.
//!
//! This is an implementation of the Cassowary linear constraint solving algorithm,
//! as described in "The Cassowary Linear Arithmetic Constraint Solving Algorithm"
//! by Greg J. Badros and Alan Borning.
//!
//! The algorithm uses a variation of the simplex method optimized for incremental
//! constraint solving with priorities (strengths). Constraints and edit variables
//! can be added and removed at any time; suggesting a new value for an edit
//! variable repairs the tableau with the dual simplex method instead of solving
//! from scratch.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::constraint::{Constraint, ConstraintId, Operator};
use crate::error::{Result, SolverError};
use crate::expression::Expression;
use crate::near_zero;
use crate::row::{Row, Symbol};
use crate::strength::Strength;
use crate::variable::{Variable, Variables};

/// The symbols a constraint introduced into the tableau.
///
/// The marker is the slack, dummy or positive error symbol; `other` is the
/// error symbol of a non-required inequality or the negative error symbol of
/// a non-required equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tag {
    marker: Symbol,
    other: Option<Symbol>,
}

impl Tag {
    fn symbols(self) -> impl Iterator<Item = Symbol> {
        std::iter::once(self.marker).chain(self.other)
    }
}

#[derive(Debug, Clone)]
struct ConstraintInfo {
    tag: Tag,
    constraint: Constraint,
}

#[derive(Debug, Clone)]
struct EditInfo {
    tag: Tag,
    constraint: Constraint,
    /// The last suggested value.
    constant: f64,
}

/// Which objective row an optimization pass minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Objective {
    Main,
    Artificial,
}

/// The Cassowary constraint solver.
///
/// The solver never owns variables. It maps each variable it has seen to a
/// tableau symbol and writes solved values back with
/// [`update_variables`](Solver::update_variables).
#[derive(Debug, Default)]
pub struct Solver {
    /// Constraints in the solver, keyed by id
    constraints: BTreeMap<ConstraintId, ConstraintInfo>,
    /// The tableau rows, keyed by their basic symbol
    rows: BTreeMap<Symbol, Row>,
    /// Mapping from variables to their external symbols
    var_symbols: BTreeMap<Variable, Symbol>,
    /// Edit variables in the order they were added
    edits: IndexMap<Variable, EditInfo>,
    /// Basic symbols whose rows may have gone negative
    infeasible_rows: Vec<Symbol>,
    /// The objective function row
    objective: Row,
    /// Artificial objective for phase 1
    artificial: Option<Row>,
    /// Counter for generating unique symbol IDs
    id_tick: u64,
}

impl Solver {
    /// Create a new solver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all constraints, edit variables and tableau state.
    pub fn reset(&mut self) {
        debug!(
            constraints = self.constraints.len(),
            edits = self.edits.len(),
            "resetting solver"
        );
        *self = Self::default();
    }

    /// Add a constraint to the solver.
    ///
    /// Fails with [`SolverError::UnsatisfiableConstraint`] if the constraint
    /// is required and conflicts with the required constraints already
    /// present.
    pub fn add_constraint(&mut self, constraint: &Constraint) -> Result<()> {
        if self.constraints.contains_key(&constraint.id()) {
            return Err(SolverError::DuplicateConstraint);
        }

        // A variable new to the solver puts an unrestricted external symbol
        // in the row, which is always a valid subject, so a rejected
        // constraint only ever mentions variables the solver already knew.
        let (mut row, tag) = self.create_row(constraint);
        let mut subject = choose_subject(&row, tag);

        // A row made only of dummies is either redundant (zero constant) or
        // contradicts the required equalities already in the tableau.
        if subject.is_none() && row.all_dummies() {
            if !near_zero(row.constant) {
                warn!(constraint = %constraint, "rejecting unsatisfiable constraint");
                return Err(SolverError::UnsatisfiableConstraint);
            }
            subject = Some(tag.marker);
        }

        match subject {
            Some(subject) => {
                row.solve_for(subject);
                self.substitute(subject, &row);
                self.rows.insert(subject, row);
            }
            None => {
                if !self.add_with_artificial_variable(&row)? {
                    warn!(constraint = %constraint, "rejecting unsatisfiable constraint");
                    // Phase 1 may have moved to another feasible basis.
                    self.optimize(Objective::Main)?;
                    return Err(SolverError::UnsatisfiableConstraint);
                }
            }
        }

        debug!(
            id = constraint.id().get(),
            op = %constraint.op(),
            strength = constraint.strength().value(),
            "added constraint"
        );
        self.constraints.insert(
            constraint.id(),
            ConstraintInfo {
                tag,
                constraint: constraint.clone(),
            },
        );

        self.optimize(Objective::Main)
    }

    /// Remove a constraint from the solver.
    pub fn remove_constraint(&mut self, constraint: &Constraint) -> Result<()> {
        let info = self
            .constraints
            .remove(&constraint.id())
            .ok_or(SolverError::UnknownConstraint)?;

        // The error terms must leave the objective before any pivot, or the
        // substitutions below would fold them back in.
        self.remove_constraint_effects(&info);

        let marker = info.tag.marker;
        if self.rows.remove(&marker).is_none() {
            let leaving = self
                .marker_leaving_symbol(marker)
                .ok_or(SolverError::Internal("failed to find leaving row"))?;
            let mut row = self
                .rows
                .remove(&leaving)
                .ok_or(SolverError::Internal("leaving row is not basic"))?;
            row.solve_for_ex(leaving, marker);
            self.substitute(marker, &row);
        }

        debug!(id = constraint.id().get(), "removed constraint");
        self.optimize(Objective::Main)
    }

    /// Test whether the solver contains the constraint.
    pub fn has_constraint(&self, constraint: &Constraint) -> bool {
        self.constraints.contains_key(&constraint.id())
    }

    /// Number of constraints in the solver, including edit constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Add an edit variable to the solver.
    ///
    /// The variable is held at its current value in `vars` with the given
    /// strength until [`suggest_value`](Solver::suggest_value) moves it.
    /// A required strength is rejected, since an edit variable has to stay
    /// adjustable.
    pub fn add_edit_variable(
        &mut self,
        vars: &Variables,
        variable: Variable,
        strength: Strength,
    ) -> Result<()> {
        self.add_edit_variable_at(variable, strength, vars.value(variable))
    }

    /// Add an edit variable held at `seed` instead of its current value.
    pub fn add_edit_variable_at(
        &mut self,
        variable: Variable,
        strength: Strength,
        seed: f64,
    ) -> Result<()> {
        if self.edits.contains_key(&variable) {
            return Err(SolverError::DuplicateEditVariable);
        }
        let strength = Strength::clip(strength.value());
        if strength.is_required() {
            return Err(SolverError::BadRequiredStrength);
        }

        let constraint = Constraint::new(Expression::from(variable) - seed, Operator::Eq, strength);
        self.add_constraint(&constraint)?;

        let tag = self
            .constraints
            .get(&constraint.id())
            .map(|info| info.tag)
            .ok_or(SolverError::Internal("edit constraint missing after insertion"))?;
        debug!(variable = %variable, strength = strength.value(), "added edit variable");
        self.edits.insert(
            variable,
            EditInfo {
                tag,
                constraint,
                constant: seed,
            },
        );
        Ok(())
    }

    /// Remove an edit variable from the solver.
    pub fn remove_edit_variable(&mut self, variable: Variable) -> Result<()> {
        let info = self
            .edits
            .shift_remove(&variable)
            .ok_or(SolverError::UnknownEditVariable)?;
        debug!(variable = %variable, "removing edit variable");
        self.remove_constraint(&info.constraint)
    }

    /// Test whether the solver contains the edit variable.
    pub fn has_edit_variable(&self, variable: Variable) -> bool {
        self.edits.contains_key(&variable)
    }

    /// Number of edit variables.
    pub fn edit_variable_count(&self) -> usize {
        self.edits.len()
    }

    /// Iterate over the edit variables in the order they were added.
    pub fn edit_variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.edits.keys().copied()
    }

    /// Suggest the value of an edit variable.
    ///
    /// Only the rows touched by the edit's error symbols are adjusted; the
    /// tableau is then repaired with the dual simplex method.
    pub fn suggest_value(&mut self, variable: Variable, value: f64) -> Result<()> {
        let info = self
            .edits
            .get_mut(&variable)
            .ok_or(SolverError::UnknownEditVariable)?;
        let delta = value - info.constant;
        info.constant = value;
        let tag = info.tag;
        trace!(variable = %variable, value, delta, "suggest value");

        // Check first if the positive error variable is basic.
        if let Some(row) = self.rows.get_mut(&tag.marker) {
            if row.add(-delta) < 0.0 {
                self.infeasible_rows.push(tag.marker);
            }
            return self.dual_optimize();
        }

        // Check next if the negative error variable is basic.
        if let Some(other) = tag.other {
            if let Some(row) = self.rows.get_mut(&other) {
                if row.add(delta) < 0.0 {
                    self.infeasible_rows.push(other);
                }
                return self.dual_optimize();
            }
        }

        // Otherwise update each row where the error variables exist.
        for (&symbol, row) in self.rows.iter_mut() {
            let coeff = row.coefficient_for(tag.marker);
            if coeff != 0.0 && row.add(delta * coeff) < 0.0 && !symbol.is_external() {
                self.infeasible_rows.push(symbol);
            }
        }
        self.dual_optimize()
    }

    /// Write the solved value of every known variable into the arena.
    ///
    /// Variables whose symbol is not basic are set to zero. The solver state
    /// is not modified.
    pub fn update_variables(&self, vars: &mut Variables) {
        for (&variable, symbol) in &self.var_symbols {
            let value = self.rows.get(symbol).map_or(0.0, |row| row.constant);
            vars.set_value(variable, value);
        }
    }

    /// Get the current solved value of a variable.
    ///
    /// This is the value [`update_variables`](Solver::update_variables) would
    /// write; variables the solver has never seen read as zero.
    pub fn value(&self, variable: Variable) -> f64 {
        self.var_symbols
            .get(&variable)
            .and_then(|symbol| self.rows.get(symbol))
            .map_or(0.0, |row| row.constant)
    }

    /// Render the internal state of the solver for debugging.
    pub fn dump(&self) -> String {
        self.to_string()
    }

    /// Get the symbol for a variable, creating it on first use.
    fn var_symbol(&mut self, variable: Variable) -> Symbol {
        if let Some(&symbol) = self.var_symbols.get(&variable) {
            return symbol;
        }
        let symbol = self.make_symbol(Symbol::External);
        self.var_symbols.insert(variable, symbol);
        symbol
    }

    /// Generate a new symbol.
    fn make_symbol(&mut self, kind: fn(u64) -> Symbol) -> Symbol {
        let id = self.id_tick;
        self.id_tick += 1;
        kind(id)
    }

    /// Create a row for a constraint.
    ///
    /// Basic variables are substituted by their rows, the slack, error and
    /// dummy symbols required by the operator and strength are added, and
    /// the row is negated if needed so its constant is non-negative.
    fn create_row(&mut self, constraint: &Constraint) -> (Row, Tag) {
        let expr = constraint.expression();
        let mut row = Row::new(expr.constant());

        for (&variable, &coefficient) in expr.terms() {
            if near_zero(coefficient) {
                continue;
            }
            let symbol = self.var_symbol(variable);
            match self.rows.get(&symbol) {
                Some(basic) => row.insert_row(basic, coefficient),
                None => row.insert_symbol(symbol, coefficient),
            }
        }

        let strength = constraint.strength();
        let tag = match constraint.op() {
            Operator::Le | Operator::Ge => {
                let coeff = if constraint.op() == Operator::Le { 1.0 } else { -1.0 };
                let slack = self.make_symbol(Symbol::Slack);
                row.insert_symbol(slack, coeff);

                let other = if strength.is_required() {
                    None
                } else {
                    let error = self.make_symbol(Symbol::Error);
                    row.insert_symbol(error, -coeff);
                    self.objective.insert_symbol(error, strength.value());
                    Some(error)
                };
                Tag { marker: slack, other }
            }
            Operator::Eq if strength.is_required() => {
                let dummy = self.make_symbol(Symbol::Dummy);
                row.insert_symbol(dummy, 1.0);
                Tag {
                    marker: dummy,
                    other: None,
                }
            }
            Operator::Eq => {
                // expression = errplus - errminus
                let errplus = self.make_symbol(Symbol::Error);
                let errminus = self.make_symbol(Symbol::Error);
                row.insert_symbol(errplus, -1.0);
                row.insert_symbol(errminus, 1.0);
                self.objective.insert_symbol(errplus, strength.value());
                self.objective.insert_symbol(errminus, strength.value());
                Tag {
                    marker: errplus,
                    other: Some(errminus),
                }
            }
        };

        if row.constant < 0.0 {
            row.reverse_sign();
        }

        (row, tag)
    }

    /// Add the row to the tableau using an artificial variable.
    ///
    /// Returns `false` if the constraint cannot be satisfied.
    fn add_with_artificial_variable(&mut self, row: &Row) -> Result<bool> {
        let art = self.make_symbol(Symbol::Slack);
        self.rows.insert(art, row.clone());
        self.artificial = Some(row.clone());

        // The row is satisfiable only if the artificial objective can be
        // driven to zero.
        self.optimize(Objective::Artificial)?;
        let success = self
            .artificial
            .take()
            .is_some_and(|objective| near_zero(objective.constant));

        // If the artificial variable is still basic, pivot it out. A failed
        // row is dropped outright so the tableau keeps only the constraints
        // that were accepted.
        if let Some(mut basic) = self.rows.remove(&art) {
            if !success || basic.is_constant() {
                return Ok(success);
            }
            let Some(entering) = basic.any_pivotable_symbol() else {
                return Ok(false);
            };
            basic.solve_for_ex(art, entering);
            self.substitute(entering, &basic);
            self.rows.insert(entering, basic);
        }

        for row in self.rows.values_mut() {
            row.remove_symbol(art);
        }
        self.objective.remove_symbol(art);
        Ok(success)
    }

    /// Substitute a symbol throughout the tableau and the objectives.
    fn substitute(&mut self, symbol: Symbol, row: &Row) {
        for (&basic, r) in self.rows.iter_mut() {
            r.substitute(symbol, row);
            if r.constant < 0.0 && !basic.is_external() {
                self.infeasible_rows.push(basic);
            }
        }
        self.objective.substitute(symbol, row);
        if let Some(artificial) = self.artificial.as_mut() {
            artificial.substitute(symbol, row);
        }
    }

    fn objective_row(&self, objective: Objective) -> Option<&Row> {
        match objective {
            Objective::Main => Some(&self.objective),
            Objective::Artificial => self.artificial.as_ref(),
        }
    }

    /// Optimize an objective function with the primal simplex method.
    fn optimize(&mut self, objective: Objective) -> Result<()> {
        loop {
            let Some(entering) = self.objective_row(objective).and_then(Row::entering_symbol) else {
                return Ok(());
            };
            let leaving = self
                .leaving_symbol(entering)
                .ok_or(SolverError::Internal("the objective is unbounded"))?;
            let mut row = self
                .rows
                .remove(&leaving)
                .ok_or(SolverError::Internal("leaving row is not basic"))?;

            trace!(%entering, %leaving, "pivot");
            row.solve_for_ex(leaving, entering);
            self.substitute(entering, &row);
            self.rows.insert(entering, row);
        }
    }

    /// Restore feasibility with the dual simplex method.
    ///
    /// The objective must already be optimal; each infeasible row is pivoted
    /// until every restricted basic symbol is non-negative again.
    fn dual_optimize(&mut self) -> Result<()> {
        while let Some(leaving) = self.infeasible_rows.pop() {
            let entering = match self.rows.get(&leaving) {
                Some(row) if row.constant < 0.0 => self
                    .dual_entering_symbol(row)
                    .ok_or(SolverError::Internal("dual optimize failed"))?,
                _ => continue,
            };
            let mut row = self
                .rows
                .remove(&leaving)
                .ok_or(SolverError::Internal("leaving row is not basic"))?;

            trace!(%entering, %leaving, "dual pivot");
            row.solve_for_ex(leaving, entering);
            self.substitute(entering, &row);
            self.rows.insert(entering, row);
        }
        Ok(())
    }

    /// Find the row to leave the basis: the restricted row with the smallest
    /// ratio `-constant / coefficient` among rows where the entering symbol
    /// has a negative coefficient.
    fn leaving_symbol(&self, entering: Symbol) -> Option<Symbol> {
        let mut min_ratio = f64::MAX;
        let mut leaving = None;

        for (&symbol, row) in &self.rows {
            if symbol.is_external() {
                continue;
            }
            let coeff = row.coefficient_for(entering);
            if coeff < 0.0 {
                let ratio = -row.constant / coeff;
                if ratio < min_ratio {
                    min_ratio = ratio;
                    leaving = Some(symbol);
                }
            }
        }

        leaving
    }

    /// Find the entering symbol for a dual pivot on an infeasible row: the
    /// non-dummy symbol with a positive coefficient minimizing
    /// `objective coefficient / coefficient`.
    fn dual_entering_symbol(&self, row: &Row) -> Option<Symbol> {
        let mut min_ratio = f64::MAX;
        let mut entering = None;

        for (&symbol, &coeff) in row.cells() {
            if coeff > 0.0 && !symbol.is_dummy() {
                let ratio = self.objective.coefficient_for(symbol) / coeff;
                if ratio < min_ratio {
                    min_ratio = ratio;
                    entering = Some(symbol);
                }
            }
        }

        entering
    }

    /// Find the basic row to pivot a non-basic marker into.
    ///
    /// Precedence:
    /// 1. a restricted row with a negative marker coefficient and the
    ///    smallest `-constant / coefficient`;
    /// 2. a restricted row with the smallest `constant / coefficient`;
    /// 3. the last unrestricted row containing the marker.
    fn marker_leaving_symbol(&self, marker: Symbol) -> Option<Symbol> {
        let mut r1 = f64::MAX;
        let mut r2 = f64::MAX;
        let mut first = None;
        let mut second = None;
        let mut third = None;

        for (&symbol, row) in &self.rows {
            let coeff = row.coefficient_for(marker);
            if coeff == 0.0 {
                continue;
            }
            if symbol.is_external() {
                third = Some(symbol);
            } else if coeff < 0.0 {
                let ratio = -row.constant / coeff;
                if ratio < r1 {
                    r1 = ratio;
                    first = Some(symbol);
                }
            } else {
                let ratio = row.constant / coeff;
                if ratio < r2 {
                    r2 = ratio;
                    second = Some(symbol);
                }
            }
        }

        first.or(second).or(third)
    }

    /// Remove the error terms of a constraint from the objective.
    fn remove_constraint_effects(&mut self, info: &ConstraintInfo) {
        let strength = info.constraint.strength().value();
        for marker in info.tag.symbols().filter(|s| s.is_error()) {
            self.remove_marker_effects(marker, strength);
        }
    }

    fn remove_marker_effects(&mut self, marker: Symbol, strength: f64) {
        match self.rows.get(&marker) {
            Some(row) => self.objective.insert_row(row, -strength),
            None => self.objective.insert_symbol(marker, -strength),
        }
    }
}

/// Choose the symbol to solve a new row for.
///
/// The first external symbol wins; otherwise a slack or error tag symbol
/// with a negative coefficient. `None` means the row needs an artificial
/// variable.
fn choose_subject(row: &Row, tag: Tag) -> Option<Symbol> {
    if let Some(symbol) = row.cells().keys().copied().find(|s| s.is_external()) {
        return Some(symbol);
    }
    tag.symbols()
        .find(|&s| s.is_pivotable() && row.coefficient_for(s) < 0.0)
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Objective")?;
        writeln!(f, "---------")?;
        writeln!(f, "{}", self.objective)?;
        writeln!(f)?;
        writeln!(f, "Tableau")?;
        writeln!(f, "-------")?;
        for (symbol, row) in &self.rows {
            writeln!(f, "{} | {}", symbol, row)?;
        }
        writeln!(f)?;
        writeln!(f, "Infeasible")?;
        writeln!(f, "----------")?;
        for symbol in &self.infeasible_rows {
            writeln!(f, "{}", symbol)?;
        }
        writeln!(f)?;
        writeln!(f, "Variables")?;
        writeln!(f, "---------")?;
        for (variable, symbol) in &self.var_symbols {
            writeln!(f, "{} = {}", variable, symbol)?;
        }
        writeln!(f)?;
        writeln!(f, "Edit Variables")?;
        writeln!(f, "--------------")?;
        for (variable, info) in &self.edits {
            writeln!(f, "{} = {}", variable, info.constant)?;
        }
        writeln!(f)?;
        writeln!(f, "Constraints")?;
        writeln!(f, "-----------")?;
        for info in self.constraints.values() {
            writeln!(f, "{}", info.constraint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr;

    const TOLERANCE: f64 = 1e-6;

    fn assert_near(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    struct Horizontal {
        vars: Variables,
        left: Variable,
        width: Variable,
        right: Variable,
    }

    /// `left == 0` and `right == left + width`, both required.
    fn horizontal(solver: &mut Solver) -> Horizontal {
        let mut vars = Variables::new();
        let left = vars.add("left");
        let width = vars.add("width");
        let right = vars.add("right");

        solver
            .add_constraint(&Constraint::required(Expression::from(left), Operator::Eq))
            .unwrap();
        solver
            .add_constraint(&Constraint::required(right - (left + width), Operator::Eq))
            .unwrap();

        Horizontal {
            vars,
            left,
            width,
            right,
        }
    }

    #[test]
    fn test_simple_equality() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");

        solver
            .add_constraint(&Constraint::required(expr![x, -100.0], Operator::Eq))
            .unwrap();

        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 100.0);
        assert_near(solver.value(x), 100.0);
    }

    #[test]
    fn test_box_with_fixed_width() {
        let mut solver = Solver::new();
        let mut h = horizontal(&mut solver);

        solver
            .add_constraint(&Constraint::required(expr![h.width, -100.0], Operator::Eq))
            .unwrap();

        solver.update_variables(&mut h.vars);
        assert_near(h.vars.value(h.left), 0.0);
        assert_near(h.vars.value(h.width), 100.0);
        assert_near(h.vars.value(h.right), 100.0);
    }

    #[test]
    fn test_box_with_edited_width() {
        let mut solver = Solver::new();
        let mut h = horizontal(&mut solver);

        solver.add_edit_variable(&h.vars, h.width, Strength::STRONG).unwrap();
        solver.suggest_value(h.width, 50.0).unwrap();

        solver.update_variables(&mut h.vars);
        assert_near(h.vars.value(h.width), 50.0);
        assert_near(h.vars.value(h.right), 50.0);

        solver.suggest_value(h.width, 75.0).unwrap();
        solver.update_variables(&mut h.vars);
        assert_near(h.vars.value(h.width), 75.0);
        assert_near(h.vars.value(h.right), 75.0);
    }

    #[test]
    fn test_conflicting_required_constraints() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let width = vars.add("width");

        solver
            .add_constraint(&Constraint::required(expr![width, -100.0], Operator::Eq))
            .unwrap();
        let conflict = Constraint::required(expr![width, -200.0], Operator::Eq);
        assert_eq!(
            solver.add_constraint(&conflict),
            Err(SolverError::UnsatisfiableConstraint)
        );
        assert!(!solver.has_constraint(&conflict));

        solver.update_variables(&mut vars);
        assert_near(vars.value(width), 100.0);
    }

    #[test]
    fn test_conflicting_required_inequalities() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");

        solver
            .add_constraint(&Constraint::required(expr![x, -10.0], Operator::Ge))
            .unwrap();
        let result = solver.add_constraint(&Constraint::required(expr![x, -5.0], Operator::Le));
        assert_eq!(result, Err(SolverError::UnsatisfiableConstraint));

        // The rejected row leaves no trace in the tableau.
        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 10.0);
        solver
            .add_constraint(&Constraint::required(expr![x, -20.0], Operator::Le))
            .unwrap();
        solver
            .add_constraint(&Constraint::new(expr![x, -15.0], Operator::Eq, Strength::WEAK))
            .unwrap();
        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 15.0);
    }

    #[test]
    fn test_rejected_constraint_keeps_optimal_solution() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");

        solver
            .add_constraint(&Constraint::required(expr![x], Operator::Ge))
            .unwrap();
        solver
            .add_constraint(&Constraint::required(expr![x, -100.0], Operator::Le))
            .unwrap();
        solver
            .add_constraint(&Constraint::new(expr![x, -50.0], Operator::Eq, Strength::WEAK))
            .unwrap();

        // Phase 1 pushes x to its upper bound before giving up.
        let beyond = Constraint::required(expr![x, -200.0], Operator::Ge);
        assert_eq!(
            solver.add_constraint(&beyond),
            Err(SolverError::UnsatisfiableConstraint)
        );
        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 50.0);
    }

    #[test]
    fn test_redundant_required_constraint() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");

        solver
            .add_constraint(&Constraint::required(expr![x, -10.0], Operator::Eq))
            .unwrap();
        solver
            .add_constraint(&Constraint::required(expr![(2.0, x), -20.0], Operator::Eq))
            .unwrap();

        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 10.0);
    }

    #[test]
    fn test_inequality_with_weak_preference() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");

        solver
            .add_constraint(&Constraint::required(expr![x, -50.0], Operator::Ge))
            .unwrap();
        solver
            .add_constraint(&Constraint::new(expr![x, -20.0], Operator::Eq, Strength::WEAK))
            .unwrap();

        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 50.0);
    }

    #[test]
    fn test_strength_ordering() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");

        solver
            .add_constraint(&Constraint::new(expr![x, -20.0], Operator::Eq, Strength::WEAK))
            .unwrap();
        solver
            .add_constraint(&Constraint::new(expr![x, -10.0], Operator::Eq, Strength::STRONG))
            .unwrap();

        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 10.0);
    }

    #[test]
    fn test_strength_ordering_medium_beats_many_weak() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");

        for _ in 0..10 {
            solver
                .add_constraint(&Constraint::new(expr![x, -20.0], Operator::Eq, Strength::WEAK))
                .unwrap();
        }
        solver
            .add_constraint(&Constraint::new(expr![x, -10.0], Operator::Eq, Strength::MEDIUM))
            .unwrap();

        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 10.0);
    }

    #[test]
    fn test_duplicate_and_unknown_constraints() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");
        let c = Constraint::required(expr![x, -1.0], Operator::Ge);

        assert_eq!(solver.remove_constraint(&c), Err(SolverError::UnknownConstraint));
        solver.add_constraint(&c).unwrap();
        assert!(solver.has_constraint(&c));
        assert_eq!(solver.add_constraint(&c), Err(SolverError::DuplicateConstraint));

        solver.remove_constraint(&c).unwrap();
        assert!(!solver.has_constraint(&c));
        assert_eq!(solver.remove_constraint(&c), Err(SolverError::UnknownConstraint));
    }

    #[test]
    fn test_remove_restores_previous_solution() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");

        solver
            .add_constraint(&Constraint::new(expr![x, -10.0], Operator::Eq, Strength::WEAK))
            .unwrap();
        let floor = Constraint::required(expr![x, -20.0], Operator::Ge);
        solver.add_constraint(&floor).unwrap();
        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 20.0);

        solver.remove_constraint(&floor).unwrap();
        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 10.0);
    }

    #[test]
    fn test_remove_non_basic_dummy_marker() {
        let mut solver = Solver::new();
        let mut h = horizontal(&mut solver);
        solver.update_variables(&mut h.vars);
        let before: Vec<_> = h.vars.iter().collect();

        let fixed = Constraint::required(expr![h.width, -100.0], Operator::Eq);
        solver.add_constraint(&fixed).unwrap();
        solver.remove_constraint(&fixed).unwrap();

        solver.update_variables(&mut h.vars);
        let after: Vec<_> = h.vars.iter().collect();
        assert_eq!(before.len(), after.len());
        for ((_, a), (_, b)) in before.iter().zip(&after) {
            assert_near(*a, *b);
        }
        assert_near(
            h.vars.value(h.right),
            h.vars.value(h.left) + h.vars.value(h.width),
        );
    }

    #[test]
    fn test_remove_leaves_no_residual_objective_terms() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");

        let soft = Constraint::new(expr![x, -10.0], Operator::Eq, Strength::STRONG);
        let soft_le = Constraint::new(expr![x, -5.0], Operator::Le, Strength::MEDIUM);
        solver.add_constraint(&soft).unwrap();
        solver.add_constraint(&soft_le).unwrap();
        solver.remove_constraint(&soft_le).unwrap();
        solver.remove_constraint(&soft).unwrap();

        assert!(solver.objective.is_constant());
        assert_eq!(solver.constraint_count(), 0);
    }

    #[test]
    fn test_edit_variable_lifecycle() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");

        assert_eq!(
            solver.suggest_value(x, 1.0),
            Err(SolverError::UnknownEditVariable)
        );
        assert_eq!(
            solver.remove_edit_variable(x),
            Err(SolverError::UnknownEditVariable)
        );
        assert_eq!(
            solver.add_edit_variable(&vars, x, Strength::REQUIRED),
            Err(SolverError::BadRequiredStrength)
        );

        solver.add_edit_variable(&vars, x, Strength::MEDIUM).unwrap();
        assert!(solver.has_edit_variable(x));
        assert_eq!(solver.edit_variable_count(), 1);
        assert_eq!(
            solver.add_edit_variable(&vars, x, Strength::STRONG),
            Err(SolverError::DuplicateEditVariable)
        );

        solver.remove_edit_variable(x).unwrap();
        assert!(!solver.has_edit_variable(x));
        assert_eq!(solver.constraint_count(), 0);
    }

    #[test]
    fn test_edit_starts_at_current_value() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");

        solver
            .add_constraint(&Constraint::new(expr![x, -30.0], Operator::Eq, Strength::WEAK))
            .unwrap();
        solver.update_variables(&mut vars);
        solver.add_edit_variable(&vars, x, Strength::STRONG).unwrap();

        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 30.0);

        solver.suggest_value(x, 12.0).unwrap();
        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 12.0);
    }

    #[test]
    fn test_edit_starts_at_seeded_value() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");
        let y = vars.add("y");
        vars.set_value(x, 30.0);

        solver.add_edit_variable(&vars, x, Strength::STRONG).unwrap();
        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 30.0);

        solver.suggest_value(x, 45.0).unwrap();
        solver.update_variables(&mut vars);
        assert_near(vars.value(x), 45.0);

        // An explicit seed overrides the arena value.
        vars.set_value(y, 8.0);
        solver.add_edit_variable_at(y, Strength::STRONG, -3.0).unwrap();
        solver.update_variables(&mut vars);
        assert_near(vars.value(y), -3.0);
    }

    #[test]
    fn test_edit_variables_keep_insertion_order() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");
        let y = vars.add("y");
        let z = vars.add("z");

        for v in [y, x, z] {
            solver.add_edit_variable(&vars, v, Strength::MEDIUM).unwrap();
        }
        assert_eq!(solver.edit_variables().collect::<Vec<_>>(), vec![y, x, z]);

        solver.remove_edit_variable(x).unwrap();
        solver.add_edit_variable(&vars, x, Strength::WEAK).unwrap();
        assert_eq!(solver.edit_variables().collect::<Vec<_>>(), vec![y, z, x]);
    }

    #[test]
    fn test_new_variable_makes_required_constraint_satisfiable() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");
        let y = vars.add("y");
        vars.set_value(y, 7.0);

        solver
            .add_constraint(&Constraint::required(expr![x, -10.0], Operator::Eq))
            .unwrap();
        // x alone cannot move, y absorbs the difference.
        solver
            .add_constraint(&Constraint::required(expr![x, y, -4.0], Operator::Eq))
            .unwrap();
        solver.update_variables(&mut vars);
        assert_near(vars.value(y), -6.0);

        // A rejected constraint over known variables leaves unrelated
        // seeded values alone.
        let z = vars.add("z");
        vars.set_value(z, 3.0);
        let conflict = Constraint::required(expr![x, -11.0], Operator::Eq);
        assert_eq!(
            solver.add_constraint(&conflict),
            Err(SolverError::UnsatisfiableConstraint)
        );
        solver.update_variables(&mut vars);
        assert_eq!(vars.value(z), 3.0);
        assert_near(vars.value(y), -6.0);
    }

    #[test]
    fn test_edit_cannot_break_required_bounds() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");

        solver
            .add_constraint(&Constraint::required(expr![x, -10.0], Operator::Ge))
            .unwrap();
        solver
            .add_constraint(&Constraint::required(expr![x, -90.0], Operator::Le))
            .unwrap();
        solver.add_edit_variable(&vars, x, Strength::STRONG).unwrap();

        for (suggested, expected) in [(50.0, 50.0), (200.0, 90.0), (-5.0, 10.0), (25.0, 25.0)] {
            solver.suggest_value(x, suggested).unwrap();
            solver.update_variables(&mut vars);
            assert_near(vars.value(x), expected);
        }
    }

    #[test]
    fn test_edit_drives_dependent_variables() {
        let mut solver = Solver::new();
        let mut vars = Variables::new();
        let left = vars.add("left");
        let right = vars.add("right");
        let mid = vars.add("mid");

        // mid == (left + right) / 2, right >= left + 10, left >= 0
        solver
            .add_constraint(&Constraint::required(
                2.0 * mid - (left + right),
                Operator::Eq,
            ))
            .unwrap();
        solver
            .add_constraint(&Constraint::required(right - left - 10.0, Operator::Ge))
            .unwrap();
        solver
            .add_constraint(&Constraint::required(Expression::from(left), Operator::Ge))
            .unwrap();

        solver.add_edit_variable(&vars, mid, Strength::STRONG).unwrap();
        solver.add_edit_variable(&vars, left, Strength::WEAK).unwrap();
        solver.suggest_value(left, 20.0).unwrap();
        solver.suggest_value(mid, 50.0).unwrap();

        solver.update_variables(&mut vars);
        assert_near(vars.value(mid), 50.0);
        assert_near(vars.value(left), 20.0);
        assert_near(vars.value(right), 80.0);
    }

    #[test]
    fn test_update_variables_is_idempotent() {
        let mut solver = Solver::new();
        let mut h = horizontal(&mut solver);
        solver.add_edit_variable(&h.vars, h.width, Strength::STRONG).unwrap();
        solver.suggest_value(h.width, 42.0).unwrap();

        solver.update_variables(&mut h.vars);
        let first: Vec<_> = h.vars.iter().collect();
        solver.update_variables(&mut h.vars);
        let second: Vec<_> = h.vars.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unseen_variable_reads_zero() {
        let solver = Solver::new();
        let mut vars = Variables::new();
        let x = vars.add("x");
        vars.set_value(x, 5.0);

        solver.update_variables(&mut vars);
        assert_eq!(vars.value(x), 5.0);
        assert_eq!(solver.value(x), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut solver = Solver::new();
        let h = horizontal(&mut solver);
        solver.add_edit_variable(&h.vars, h.width, Strength::STRONG).unwrap();

        solver.reset();
        assert_eq!(solver.constraint_count(), 0);
        assert_eq!(solver.edit_variable_count(), 0);
        assert!(solver.rows.is_empty());
        assert!(solver.var_symbols.is_empty());
    }

    #[test]
    fn test_dump_lists_sections() {
        let mut solver = Solver::new();
        let h = horizontal(&mut solver);
        solver.add_edit_variable(&h.vars, h.width, Strength::STRONG).unwrap();

        let dump = solver.dump();
        for section in ["Objective", "Tableau", "Infeasible", "Variables", "Edit Variables", "Constraints"] {
            assert!(dump.contains(section), "missing section {section}");
        }
        assert_eq!(dump.matches("| strength =").count(), 3);
    }

    #[test]
    fn test_leaving_symbol_uses_minimum_ratio() {
        let mut solver = Solver::new();
        let entering = Symbol::Error(10);

        let mut a = Row::new(8.0);
        a.insert_symbol(entering, -2.0); // ratio 4
        let mut b = Row::new(3.0);
        b.insert_symbol(entering, -1.0); // ratio 3
        let mut ext = Row::new(0.0);
        ext.insert_symbol(entering, -5.0); // external rows never leave
        let mut positive = Row::new(0.0);
        positive.insert_symbol(entering, 1.0);

        solver.rows.insert(Symbol::Slack(1), a);
        solver.rows.insert(Symbol::Slack(2), b);
        solver.rows.insert(Symbol::External(3), ext);
        solver.rows.insert(Symbol::Slack(4), positive);

        assert_eq!(solver.leaving_symbol(entering), Some(Symbol::Slack(2)));
        assert_eq!(solver.leaving_symbol(Symbol::Error(99)), None);
    }

    #[test]
    fn test_dual_entering_symbol_skips_dummies() {
        let mut solver = Solver::new();
        solver.objective.insert_symbol(Symbol::Error(1), 10.0);
        solver.objective.insert_symbol(Symbol::Error(2), 4.0);

        let mut row = Row::new(-5.0);
        row.insert_symbol(Symbol::Dummy(0), 1.0);
        row.insert_symbol(Symbol::Error(1), 5.0); // ratio 2
        row.insert_symbol(Symbol::Error(2), 1.0); // ratio 4
        row.insert_symbol(Symbol::Slack(3), -1.0);

        assert_eq!(solver.dual_entering_symbol(&row), Some(Symbol::Error(1)));
    }

    #[test]
    fn test_marker_leaving_prefers_negative_restricted_row() {
        let mut solver = Solver::new();
        let marker = Symbol::Dummy(0);

        let mut a = Row::new(4.0);
        a.insert_symbol(marker, -1.0); // -constant / coeff = 4
        let mut b = Row::new(2.0);
        b.insert_symbol(marker, -2.0); // 1
        let mut c = Row::new(0.0);
        c.insert_symbol(marker, 1.0); // positive, tier two
        let mut d = Row::new(0.0);
        d.insert_symbol(marker, 1.0); // external, tier three

        solver.rows.insert(Symbol::Slack(1), a);
        solver.rows.insert(Symbol::Error(2), b);
        solver.rows.insert(Symbol::Slack(3), c);
        solver.rows.insert(Symbol::External(4), d);

        assert_eq!(solver.marker_leaving_symbol(marker), Some(Symbol::Error(2)));
    }

    #[test]
    fn test_marker_leaving_falls_back_to_positive_restricted_row() {
        let mut solver = Solver::new();
        let marker = Symbol::Slack(0);

        let mut a = Row::new(5.0);
        a.insert_symbol(marker, 1.0); // constant / coeff = 5
        let mut b = Row::new(4.0);
        b.insert_symbol(marker, 2.0); // 2
        let mut ext = Row::new(1.0);
        ext.insert_symbol(marker, -1.0);

        solver.rows.insert(Symbol::Slack(1), a);
        solver.rows.insert(Symbol::Slack(2), b);
        solver.rows.insert(Symbol::External(3), ext);

        assert_eq!(solver.marker_leaving_symbol(marker), Some(Symbol::Slack(2)));
    }

    #[test]
    fn test_marker_leaving_falls_back_to_last_unrestricted_row() {
        let mut solver = Solver::new();
        let marker = Symbol::Dummy(0);

        let mut a = Row::new(5.0);
        a.insert_symbol(marker, 1.0);
        let mut b = Row::new(-3.0);
        b.insert_symbol(marker, -1.0);
        let unrelated = Row::new(7.0);

        solver.rows.insert(Symbol::External(1), a);
        solver.rows.insert(Symbol::External(2), b);
        solver.rows.insert(Symbol::Slack(3), unrelated);

        assert_eq!(solver.marker_leaving_symbol(marker), Some(Symbol::External(2)));
        assert_eq!(solver.marker_leaving_symbol(Symbol::Dummy(42)), None);
    }

    #[test]
    fn test_choose_subject_precedence() {
        let slack = Symbol::Slack(1);
        let error = Symbol::Error(2);
        let tag = Tag {
            marker: slack,
            other: Some(error),
        };

        let mut with_external = Row::new(1.0);
        with_external.insert_symbol(Symbol::External(5), 2.0);
        with_external.insert_symbol(slack, -1.0);
        assert_eq!(choose_subject(&with_external, tag), Some(Symbol::External(5)));

        let mut negative_other = Row::new(1.0);
        negative_other.insert_symbol(slack, 1.0);
        negative_other.insert_symbol(error, -1.0);
        assert_eq!(choose_subject(&negative_other, tag), Some(error));

        let mut no_candidate = Row::new(1.0);
        no_candidate.insert_symbol(slack, 1.0);
        no_candidate.insert_symbol(Symbol::Slack(9), -1.0);
        assert_eq!(choose_subject(&no_candidate, tag), None);
    }
}
