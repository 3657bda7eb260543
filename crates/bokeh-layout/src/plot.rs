//! Plot layout: a frame surrounded by borders and stacked side panels.
//!
//! Each side of the frame gets a border box reaching from the frame to the
//! canvas edge. Side panels (axes, titles, toolbars) stack outward from the
//! frame inside that border and a padding box takes up whatever is left.
//! A border keeps at least its `min_border` and grows when its panels need
//! more room; the frame gets the rest of the canvas.
//!
//! The canvas size is driven through two `strong` edit variables, so
//! [`PlotLayout::resize`] only suggests new values to the solver instead of
//! rebuilding the constraint set.

use bokeh_constraint::{expr, Constraint, Operator, Solver, Strength, Variable, Variables};
use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::error::{LayoutError, Result};
use crate::layout_box::{Bounds, Dimension, Edge, LayoutBox};

/// A side of the plot frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Above,
    Below,
    Left,
    Right,
}

impl Side {
    /// All sides, in layout order.
    pub const ALL: [Side; 4] = [Side::Above, Side::Below, Side::Left, Side::Right];

    pub fn name(self) -> &'static str {
        match self {
            Side::Above => "above",
            Side::Below => "below",
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    /// The edge of a box on this side that faces the canvas boundary.
    pub fn outer_edge(self) -> Edge {
        match self {
            Side::Above => Edge::Top,
            Side::Below => Edge::Bottom,
            Side::Left => Edge::Left,
            Side::Right => Edge::Right,
        }
    }

    /// The edge of a box on this side that faces the frame.
    pub fn inner_edge(self) -> Edge {
        match self {
            Side::Above => Edge::Bottom,
            Side::Below => Edge::Top,
            Side::Left => Edge::Right,
            Side::Right => Edge::Left,
        }
    }

    /// The dimension panels on this side stack along.
    pub fn dimension(self) -> Dimension {
        match self {
            Side::Above | Side::Below => Dimension::Height,
            Side::Left | Side::Right => Dimension::Width,
        }
    }

    /// The pair of edges spanning the side across its stacking direction.
    fn cross_edges(self) -> (Edge, Edge) {
        match self {
            Side::Above | Side::Below => (Edge::Left, Edge::Right),
            Side::Left | Side::Right => (Edge::Bottom, Edge::Top),
        }
    }

    fn index(self) -> usize {
        match self {
            Side::Above => 0,
            Side::Below => 1,
            Side::Left => 2,
            Side::Right => 3,
        }
    }
}

/// Options for plot layout.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct LayoutOptions {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Minimum space between the frame and each canvas edge
    pub min_border: f64,
    pub min_border_top: Option<f64>,
    pub min_border_bottom: Option<f64>,
    pub min_border_left: Option<f64>,
    pub min_border_right: Option<f64>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 600.0,
            min_border: 50.0,
            min_border_top: None,
            min_border_bottom: None,
            min_border_left: None,
            min_border_right: None,
        }
    }
}

impl LayoutOptions {
    /// Set the canvas size.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the minimum border for every side without an override.
    pub fn with_min_border(mut self, min_border: f64) -> Self {
        self.min_border = min_border;
        self
    }

    /// Override the minimum border of one side.
    pub fn with_side_min_border(mut self, side: Side, min_border: f64) -> Self {
        *self.side_override_mut(side) = Some(min_border);
        self
    }

    /// The effective minimum border of a side.
    pub fn min_border(&self, side: Side) -> f64 {
        self.side_override(side).unwrap_or(self.min_border)
    }

    fn side_override(&self, side: Side) -> Option<f64> {
        match side {
            Side::Above => self.min_border_top,
            Side::Below => self.min_border_bottom,
            Side::Left => self.min_border_left,
            Side::Right => self.min_border_right,
        }
    }

    fn side_override_mut(&mut self, side: Side) -> &mut Option<f64> {
        match side {
            Side::Above => &mut self.min_border_top,
            Side::Below => &mut self.min_border_bottom,
            Side::Left => &mut self.min_border_left,
            Side::Right => &mut self.min_border_right,
        }
    }

    fn validate(&self) -> Result<()> {
        check_size("canvas width", self.width)?;
        check_size("canvas height", self.height)?;
        for side in Side::ALL {
            check_size("min border", self.min_border(side))?;
        }
        Ok(())
    }
}

/// Requested panel sizes for each side, listed from the frame outward.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SidePanels {
    sizes: [SmallVec<[f64; 4]>; 4],
}

impl SidePanels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a panel on a side, outside the panels already there.
    pub fn with_panel(mut self, side: Side, size: f64) -> Self {
        self.push(side, size);
        self
    }

    pub fn push(&mut self, side: Side, size: f64) {
        self.sizes[side.index()].push(size);
    }

    /// Panel sizes on a side, nearest the frame first.
    pub fn sizes(&self, side: Side) -> &[f64] {
        &self.sizes[side.index()]
    }

    /// Total number of panels.
    pub fn len(&self) -> usize {
        self.sizes.iter().map(SmallVec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self) -> Result<()> {
        for size in self.sizes.iter().flatten() {
            check_size("panel size", *size)?;
        }
        Ok(())
    }
}

fn check_size(what: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LayoutError::invalid_size(what, value))
    }
}

/// The boxes laid out on one side of the frame.
#[derive(Debug, Clone)]
struct SideLayout {
    border: LayoutBox,
    panels: SmallVec<[LayoutBox; 4]>,
    padding: LayoutBox,
}

/// Solved bounds of every box in a layout, keyed by box name in creation
/// order (`canvas`, `frame`, then per side `border`, panels and `padding`).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComputedLayout {
    boxes: IndexMap<String, Bounds>,
}

impl ComputedLayout {
    /// Bounds of a box by name, e.g. `"frame"` or `"left.panel0"`.
    pub fn get(&self, name: &str) -> Option<&Bounds> {
        self.boxes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bounds)> {
        self.boxes.iter().map(|(name, bounds)| (name.as_str(), bounds))
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// The constraint model of a plot: canvas, frame and the boxes around it.
#[derive(Debug, Clone)]
pub struct PlotLayout {
    options: LayoutOptions,
    canvas: LayoutBox,
    frame: LayoutBox,
    sides: [SideLayout; 4],
    constraints: Vec<Constraint>,
    installed: bool,
}

impl PlotLayout {
    /// Create the layout's variables in the arena and build its constraints.
    ///
    /// Nothing is added to a solver until [`install`](PlotLayout::install).
    pub fn new(vars: &mut Variables, options: &LayoutOptions, panels: &SidePanels) -> Result<Self> {
        options.validate()?;
        panels.validate()?;

        let canvas = LayoutBox::new(vars, "canvas");
        let frame = LayoutBox::new(vars, "frame");

        let mut constraints = Vec::new();
        constraints.extend(canvas.constraints());
        constraints.extend(frame.constraints());
        constraints.push(Constraint::required(expr![canvas.left()], Operator::Eq));
        constraints.push(Constraint::required(expr![canvas.bottom()], Operator::Eq));
        constraints.push(Constraint::required(expr![frame.width()], Operator::Ge));
        constraints.push(Constraint::required(expr![frame.height()], Operator::Ge));

        let sides = Side::ALL.map(|side| {
            build_side(
                vars,
                side,
                options.min_border(side),
                panels.sizes(side),
                &canvas,
                &frame,
                &mut constraints,
            )
        });

        debug!(
            constraints = constraints.len(),
            panels = panels.len(),
            "built plot layout"
        );

        Ok(Self {
            options: options.clone(),
            canvas,
            frame,
            sides,
            constraints,
            installed: false,
        })
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn canvas(&self) -> &LayoutBox {
        &self.canvas
    }

    pub fn frame(&self) -> &LayoutBox {
        &self.frame
    }

    pub fn border(&self, side: Side) -> &LayoutBox {
        &self.sides[side.index()].border
    }

    pub fn panels(&self, side: Side) -> &[LayoutBox] {
        &self.sides[side.index()].panels
    }

    pub fn padding(&self, side: Side) -> &LayoutBox {
        &self.sides[side.index()].padding
    }

    /// Every constraint the layout adds to a solver, edit constraints aside.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Iterate over every box in creation order.
    pub fn boxes(&self) -> impl Iterator<Item = &LayoutBox> {
        [&self.canvas, &self.frame].into_iter().chain(
            self.sides.iter().flat_map(|side| {
                std::iter::once(&side.border)
                    .chain(side.panels.iter())
                    .chain(std::iter::once(&side.padding))
            }),
        )
    }

    /// Add the layout to a solver and suggest the configured canvas size.
    ///
    /// On failure every constraint added so far is removed again.
    pub fn install(&mut self, solver: &mut Solver) -> Result<()> {
        if self.installed {
            return Err(LayoutError::AlreadyInstalled);
        }

        for (i, constraint) in self.constraints.iter().enumerate() {
            if let Err(err) = solver.add_constraint(constraint) {
                warn!(%err, "failed to install plot layout");
                self.remove_constraints(solver, i);
                return Err(err.into());
            }
        }

        let edits = [
            (self.canvas.width(), self.options.width),
            (self.canvas.height(), self.options.height),
        ];
        for (i, &(variable, seed)) in edits.iter().enumerate() {
            if let Err(err) = solver.add_edit_variable_at(variable, Strength::STRONG, seed) {
                warn!(%err, "failed to install plot layout");
                for &(added, _) in &edits[..i] {
                    solver.remove_edit_variable(added).ok();
                }
                self.remove_constraints(solver, self.constraints.len());
                return Err(err.into());
            }
        }

        self.installed = true;
        debug!(constraints = self.constraints.len(), "installed plot layout");
        self.suggest_size(solver)
    }

    /// Suggest a new canvas size to the solver.
    pub fn resize(&mut self, solver: &mut Solver, width: f64, height: f64) -> Result<()> {
        if !self.installed {
            return Err(LayoutError::NotInstalled);
        }
        check_size("canvas width", width)?;
        check_size("canvas height", height)?;

        trace!(width, height, "resize plot layout");
        self.options.width = width;
        self.options.height = height;
        self.suggest_size(solver)
    }

    /// Remove everything the layout added from the solver.
    ///
    /// Every removal is attempted even when an earlier one fails, so the
    /// layout always ends up uninstalled. The first error is returned.
    pub fn uninstall(&mut self, solver: &mut Solver) -> Result<()> {
        if !self.installed {
            return Err(LayoutError::NotInstalled);
        }

        let mut first_error = None;
        for variable in [self.canvas.width(), self.canvas.height()] {
            if let Err(err) = solver.remove_edit_variable(variable) {
                first_error.get_or_insert(err);
            }
        }
        for constraint in &self.constraints {
            if let Err(err) = solver.remove_constraint(constraint) {
                first_error.get_or_insert(err);
            }
        }
        self.installed = false;

        match first_error {
            Some(err) => {
                warn!(%err, "uninstalled plot layout with errors");
                Err(err.into())
            }
            None => {
                debug!("uninstalled plot layout");
                Ok(())
            }
        }
    }

    /// Read the bounds of every box from the arena.
    pub fn computed(&self, vars: &Variables) -> ComputedLayout {
        let boxes = self
            .boxes()
            .map(|b| (b.name().to_string(), b.bounds(vars)))
            .collect();
        ComputedLayout { boxes }
    }

    fn suggest_size(&self, solver: &mut Solver) -> Result<()> {
        solver.suggest_value(self.canvas.width(), self.options.width)?;
        solver.suggest_value(self.canvas.height(), self.options.height)?;
        Ok(())
    }

    /// Remove the first `count` constraints, ignoring failures.
    fn remove_constraints(&self, solver: &mut Solver, count: usize) {
        for constraint in &self.constraints[..count] {
            solver.remove_constraint(constraint).ok();
        }
    }
}

/// Build the border, panels and padding of one side.
fn build_side(
    vars: &mut Variables,
    side: Side,
    min_border: f64,
    sizes: &[f64],
    canvas: &LayoutBox,
    frame: &LayoutBox,
    constraints: &mut Vec<Constraint>,
) -> SideLayout {
    let outer = side.outer_edge();
    let inner = side.inner_edge();
    let dim = side.dimension();
    let (low, high) = side.cross_edges();

    // The border spans from the frame to the canvas edge and prefers to stay
    // at its minimum so the frame takes the remaining space.
    let border = LayoutBox::new(vars, format!("{}.border", side.name()));
    let border_size = border.dimension(dim);
    constraints.extend(border.constraints());
    constraints.push(Constraint::new(border_size - min_border, Operator::Ge, Strength::STRONG));
    constraints.push(Constraint::new(border_size - min_border, Operator::Eq, Strength::WEAK));
    constraints.push(Constraint::required(frame.edge(outer) - border.edge(inner), Operator::Eq));
    constraints.push(Constraint::required(border.edge(outer) - canvas.edge(outer), Operator::Eq));
    constraints.push(Constraint::required(border.edge(low) - canvas.edge(low), Operator::Eq));
    constraints.push(Constraint::required(border.edge(high) - canvas.edge(high), Operator::Eq));

    // Panels and padding span the frame across the stacking direction.
    let align = |b: &LayoutBox| {
        [
            Constraint::required(b.edge(low) - frame.edge(low), Operator::Eq),
            Constraint::required(b.edge(high) - frame.edge(high), Operator::Eq),
        ]
    };

    let mut last: Variable = frame.edge(outer);
    let mut panels = SmallVec::new();
    for (i, &size) in sizes.iter().enumerate() {
        let panel = LayoutBox::new(vars, format!("{}.panel{}", side.name(), i));
        constraints.extend(panel.constraints());
        constraints.push(Constraint::new(last - panel.edge(inner), Operator::Eq, Strength::STRONG));
        constraints.push(Constraint::new(
            panel.dimension(dim) - size,
            Operator::Eq,
            Strength::STRONG,
        ));
        constraints.extend(align(&panel));
        last = panel.edge(outer);
        panels.push(panel);
    }

    let padding = LayoutBox::new(vars, format!("{}.padding", side.name()));
    constraints.extend(padding.constraints());
    constraints.push(Constraint::new(last - padding.edge(inner), Operator::Eq, Strength::STRONG));
    constraints.push(Constraint::new(
        padding.edge(outer) - canvas.edge(outer),
        Operator::Eq,
        Strength::STRONG,
    ));
    constraints.push(Constraint::required(expr![padding.dimension(dim)], Operator::Ge));
    constraints.extend(align(&padding));

    SideLayout {
        border,
        panels,
        padding,
    }
}

/// Build a layout, solve it once and return the bounds of every box.
pub fn compute_layout(options: &LayoutOptions, panels: &SidePanels) -> Result<ComputedLayout> {
    let mut vars = Variables::new();
    let mut solver = Solver::new();

    let mut layout = PlotLayout::new(&mut vars, options, panels)?;
    layout.install(&mut solver)?;
    solver.update_variables(&mut vars);

    Ok(layout.computed(&vars))
}
