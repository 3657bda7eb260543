//! Constraint variables.
//!
//! Variables are stored in a [`Variables`] arena owned by client code. A
//! [`Variable`] is a small copyable handle into that arena, so the solver can
//! reference variables without sharing ownership of their data.

use std::any::Any;
use std::fmt;

/// Handle to a variable stored in a [`Variables`] arena.
///
/// Handles are ordered by id, which is the order every internal solver map
/// keyed by variable iterates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable(u32);

impl Variable {
    /// The unique id of the variable within its arena.
    pub fn id(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Per-variable data held by the arena.
struct Slot {
    name: String,
    value: f64,
    context: Option<Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("context", &self.context.is_some())
            .finish()
    }
}

/// Arena of constraint variables.
///
/// The arena owns the id counter: ids are handed out in creation order and
/// never reused. Handles from one arena must not be used with another.
///
/// Accessors panic when given a handle that was not created by this arena,
/// the same way slice indexing panics out of bounds.
#[derive(Debug, Default)]
pub struct Variables {
    slots: Vec<Slot>,
}

impl Variables {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new variable with the given name and a value of zero.
    pub fn add(&mut self, name: impl Into<String>) -> Variable {
        let id = self.slots.len() as u32;
        self.slots.push(Slot {
            name: name.into(),
            value: 0.0,
            context: None,
        });
        Variable(id)
    }

    /// Create a new unnamed variable.
    pub fn add_unnamed(&mut self) -> Variable {
        self.add(String::new())
    }

    /// Number of variables in the arena.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Check whether a handle belongs to this arena.
    pub fn contains(&self, variable: Variable) -> bool {
        variable.index() < self.slots.len()
    }

    /// The display name of a variable (empty when unnamed).
    pub fn name(&self, variable: Variable) -> &str {
        &self.slots[variable.index()].name
    }

    /// Rename a variable.
    pub fn set_name(&mut self, variable: Variable, name: impl Into<String>) {
        self.slots[variable.index()].name = name.into();
    }

    /// The last solved (or seeded) value of a variable.
    pub fn value(&self, variable: Variable) -> f64 {
        self.slots[variable.index()].value
    }

    /// Set the value of a variable.
    ///
    /// The solver calls this from `update_variables`; clients may call it to
    /// seed initial values.
    pub fn set_value(&mut self, variable: Variable, value: f64) {
        self.slots[variable.index()].value = value;
    }

    /// The user context attached to a variable, if it has one of type `T`.
    pub fn context<T: Any>(&self, variable: Variable) -> Option<&T> {
        self.slots[variable.index()]
            .context
            .as_ref()
            .and_then(|ctx| ctx.downcast_ref::<T>())
    }

    /// Attach an opaque user context to a variable, replacing any previous one.
    pub fn set_context<T: Any + Send + Sync>(&mut self, variable: Variable, context: T) {
        self.slots[variable.index()].context = Some(Box::new(context));
    }

    /// Detach the user context of a variable.
    pub fn clear_context(&mut self, variable: Variable) {
        self.slots[variable.index()].context = None;
    }

    /// Iterate over all variables and their current values in id order.
    pub fn iter(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (Variable(i as u32), slot.value))
    }
}
