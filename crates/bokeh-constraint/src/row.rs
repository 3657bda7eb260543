//! Tableau symbols and rows.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::near_zero;

/// Symbol types used internally in the solver.
///
/// Symbols are ordered by id alone, so tableau maps iterate in creation
/// order regardless of kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Symbol {
    /// An external variable (the actual unknowns we're solving for)
    External(u64),
    /// A slack variable (for inequality constraints)
    Slack(u64),
    /// An error variable (for non-required constraints)
    Error(u64),
    /// A dummy variable (for required equality constraints)
    Dummy(u64),
}

impl Symbol {
    pub(crate) fn id(self) -> u64 {
        match self {
            Symbol::External(id) | Symbol::Slack(id) | Symbol::Error(id) | Symbol::Dummy(id) => id,
        }
    }

    pub(crate) fn is_external(self) -> bool {
        matches!(self, Symbol::External(_))
    }

    pub(crate) fn is_error(self) -> bool {
        matches!(self, Symbol::Error(_))
    }

    pub(crate) fn is_dummy(self) -> bool {
        matches!(self, Symbol::Dummy(_))
    }

    /// Slack and error symbols are restricted to non-negative values and may
    /// be pivoted freely.
    pub(crate) fn is_pivotable(self) -> bool {
        matches!(self, Symbol::Slack(_) | Symbol::Error(_))
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::External(id) => write!(f, "v{}", id),
            Symbol::Slack(id) => write!(f, "s{}", id),
            Symbol::Error(id) => write!(f, "e{}", id),
            Symbol::Dummy(id) => write!(f, "d{}", id),
        }
    }
}

/// A row in the simplex tableau: `basic = constant + Σ coefficient·symbol`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Row {
    pub(crate) constant: f64,
    cells: BTreeMap<Symbol, f64>,
}

impl Row {
    pub(crate) fn new(constant: f64) -> Self {
        Self {
            constant,
            cells: BTreeMap::new(),
        }
    }

    pub(crate) fn cells(&self) -> &BTreeMap<Symbol, f64> {
        &self.cells
    }

    /// Check if the row has no symbols.
    pub(crate) fn is_constant(&self) -> bool {
        self.cells.is_empty()
    }

    /// Check if every symbol in the row is a dummy.
    pub(crate) fn all_dummies(&self) -> bool {
        self.cells.keys().all(|s| s.is_dummy())
    }

    /// Add to the constant, returning the new constant.
    pub(crate) fn add(&mut self, value: f64) -> f64 {
        self.constant += value;
        self.constant
    }

    /// Add a term for a symbol, dropping the cell if it cancels out.
    pub(crate) fn insert_symbol(&mut self, symbol: Symbol, coefficient: f64) {
        let entry = self.cells.entry(symbol).or_insert(0.0);
        *entry += coefficient;
        if near_zero(*entry) {
            self.cells.remove(&symbol);
        }
    }

    /// Add a multiple of another row to this one.
    pub(crate) fn insert_row(&mut self, other: &Row, coefficient: f64) {
        self.constant += other.constant * coefficient;
        for (&symbol, &c) in &other.cells {
            self.insert_symbol(symbol, c * coefficient);
        }
    }

    pub(crate) fn remove_symbol(&mut self, symbol: Symbol) {
        self.cells.remove(&symbol);
    }

    /// Negate the constant and every coefficient.
    pub(crate) fn reverse_sign(&mut self) {
        self.constant = -self.constant;
        for c in self.cells.values_mut() {
            *c = -*c;
        }
    }

    /// Solve the row for a symbol it contains.
    ///
    /// Treating the row as `0 = constant + Σ cells`, the symbol is removed
    /// and the rest is scaled so the row reads `symbol = ...`.
    pub(crate) fn solve_for(&mut self, symbol: Symbol) {
        let coeff = self.cells.remove(&symbol);
        debug_assert!(coeff.is_some(), "solving for {} which is not in the row", symbol);
        let multiplier = -1.0 / coeff.unwrap_or(1.0);
        self.constant *= multiplier;
        for c in self.cells.values_mut() {
            *c *= multiplier;
        }
    }

    /// Solve the row `lhs = ...` for `rhs`, turning it into `rhs = ...`.
    pub(crate) fn solve_for_ex(&mut self, lhs: Symbol, rhs: Symbol) {
        self.insert_symbol(lhs, -1.0);
        self.solve_for(rhs);
    }

    pub(crate) fn coefficient_for(&self, symbol: Symbol) -> f64 {
        self.cells.get(&symbol).copied().unwrap_or(0.0)
    }

    /// Substitute a symbol in this row with another row.
    pub(crate) fn substitute(&mut self, symbol: Symbol, row: &Row) {
        if let Some(coeff) = self.cells.remove(&symbol) {
            self.insert_row(row, coeff);
        }
    }

    /// First symbol with a negative coefficient that is not a dummy.
    pub(crate) fn entering_symbol(&self) -> Option<Symbol> {
        self.cells
            .iter()
            .find(|&(s, c)| *c < 0.0 && !s.is_dummy())
            .map(|(&s, _)| s)
    }

    /// First slack or error symbol in the row.
    pub(crate) fn any_pivotable_symbol(&self) -> Option<Symbol> {
        self.cells.keys().copied().find(|s| s.is_pivotable())
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.constant)?;
        for (symbol, coeff) in &self.cells {
            write!(f, " + {} * {}", coeff, symbol)?;
        }
        Ok(())
    }
}
