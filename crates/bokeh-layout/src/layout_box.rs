//! Rectangles expressed as constraint variables.

use bokeh_constraint::{Constraint, Operator, Variable, Variables};
use glam::DVec2;

/// An edge of a layout box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

/// A size dimension of a layout box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Dimension {
    Width,
    Height,
}

/// Axis-aligned bounding box in canvas space (y grows upward).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    /// Left edge
    pub x: f64,
    /// Bottom edge
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Create bounds with position and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Get position (bottom-left corner) as DVec2.
    pub fn position(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    /// Get size as DVec2.
    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width, self.height)
    }

    /// Get the right edge (x + width).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Get the top edge (y + height).
    pub fn top(&self) -> f64 {
        self.y + self.height
    }
}

/// A rectangle whose edges and size are solver variables.
///
/// The box only relates its own variables (see [`LayoutBox::constraints`]);
/// where it sits is decided by constraints added by the layout that owns it.
#[derive(Debug, Clone)]
pub struct LayoutBox {
    name: String,
    left: Variable,
    right: Variable,
    bottom: Variable,
    top: Variable,
    width: Variable,
    height: Variable,
}

impl LayoutBox {
    /// Create the box's variables in the arena, named `{name}.left` and so on.
    pub fn new(vars: &mut Variables, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut var = |field: &str| vars.add(format!("{}.{}", name, field));
        let left = var("left");
        let right = var("right");
        let bottom = var("bottom");
        let top = var("top");
        let width = var("width");
        let height = var("height");

        Self {
            name,
            left,
            right,
            bottom,
            top,
            width,
            height,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn left(&self) -> Variable {
        self.left
    }

    pub fn right(&self) -> Variable {
        self.right
    }

    pub fn bottom(&self) -> Variable {
        self.bottom
    }

    pub fn top(&self) -> Variable {
        self.top
    }

    pub fn width(&self) -> Variable {
        self.width
    }

    pub fn height(&self) -> Variable {
        self.height
    }

    /// The variable for an edge.
    pub fn edge(&self, edge: Edge) -> Variable {
        match edge {
            Edge::Left => self.left,
            Edge::Right => self.right,
            Edge::Bottom => self.bottom,
            Edge::Top => self.top,
        }
    }

    /// The variable for a dimension.
    pub fn dimension(&self, dimension: Dimension) -> Variable {
        match dimension {
            Dimension::Width => self.width,
            Dimension::Height => self.height,
        }
    }

    /// Required constraints tying the edges to the size:
    /// `right == left + width` and `top == bottom + height`.
    pub fn constraints(&self) -> [Constraint; 2] {
        [
            Constraint::required(self.right - (self.left + self.width), Operator::Eq),
            Constraint::required(self.top - (self.bottom + self.height), Operator::Eq),
        ]
    }

    /// Read the box's current bounds from the arena.
    pub fn bounds(&self, vars: &Variables) -> Bounds {
        Bounds::new(
            vars.value(self.left),
            vars.value(self.bottom),
            vars.value(self.width),
            vars.value(self.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bokeh_constraint::{expr, Solver};

    #[test]
    fn test_variable_names() {
        let mut vars = Variables::new();
        let frame = LayoutBox::new(&mut vars, "frame");

        assert_eq!(frame.name(), "frame");
        assert_eq!(vars.len(), 6);
        assert_eq!(vars.name(frame.left()), "frame.left");
        assert_eq!(vars.name(frame.edge(Edge::Top)), "frame.top");
        assert_eq!(vars.name(frame.dimension(Dimension::Height)), "frame.height");
    }

    #[test]
    fn test_constraints_relate_edges_and_size() {
        let mut vars = Variables::new();
        let b = LayoutBox::new(&mut vars, "box");
        let mut solver = Solver::new();

        for c in b.constraints() {
            solver.add_constraint(&c).unwrap();
        }
        for (var, value) in [(b.left(), 10.0), (b.bottom(), 20.0), (b.width(), 30.0), (b.height(), 40.0)] {
            solver
                .add_constraint(&Constraint::required(expr![var, -value], Operator::Eq))
                .unwrap();
        }
        solver.update_variables(&mut vars);

        let bounds = b.bounds(&vars);
        let expected = Bounds::new(10.0, 20.0, 30.0, 40.0);
        assert!((bounds.position() - expected.position()).length() < 1e-6);
        assert!((bounds.size() - expected.size()).length() < 1e-6);
        assert!((vars.value(b.right()) - 40.0).abs() < 1e-6);
        assert!((vars.value(b.top()) - 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_geometry() {
        let b = Bounds::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(b.right(), 110.0);
        assert_eq!(b.top(), 70.0);
        assert_eq!(b.position(), DVec2::new(10.0, 20.0));
        assert_eq!(b.size(), DVec2::new(100.0, 50.0));
    }
}
