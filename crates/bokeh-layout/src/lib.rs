//! Plot layout on top of the Bokeh constraint solver.
//!
//! This crate turns a plot description (canvas size, minimum borders and the
//! panels stacked on each side of the frame) into linear constraints and
//! reads the solved rectangles back.
//!
//! # Architecture
//!
//! 1. **Layout boxes**: each rectangle is six solver variables tied together
//!    by `right == left + width` and `top == bottom + height`
//! 2. **Plot layout**: borders, panels and padding around the frame, with the
//!    canvas size driven through edit variables
//! 3. **Read-out**: solved values become [`Bounds`] keyed by box name
//!
//! # Example
//!
//! ```
//! use bokeh_layout::{compute_layout, LayoutOptions, Side, SidePanels};
//!
//! let options = LayoutOptions::default().with_size(600.0, 400.0);
//! let panels = SidePanels::new().with_panel(Side::Left, 80.0);
//! let layout = compute_layout(&options, &panels)?;
//!
//! let frame = layout.get("frame").expect("frame is always laid out");
//! assert!((frame.x - 80.0).abs() < 1e-6);
//! # Ok::<(), bokeh_layout::LayoutError>(())
//! ```

mod error;
mod layout_box;
mod plot;

pub use error::{LayoutError, Result};
pub use layout_box::{Bounds, Dimension, Edge, LayoutBox};
pub use plot::{compute_layout, ComputedLayout, LayoutOptions, PlotLayout, Side, SidePanels};
