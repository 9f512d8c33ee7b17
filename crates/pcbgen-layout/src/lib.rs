//! Board layout for generated designs.
//!
//! Footprints are spaced by iterative pairwise separation, enclosed in a
//! rectangular board edge and handed back to the board runtime through the
//! [`Board`] trait. Routing is delegated to an [`Autorouter`].

mod board;
mod error;
mod geometry;
mod separation;
pub mod preview;

pub use board::{layout_board, Autorouter, Board, LayoutOptions, LayoutReport};
pub use error::LayoutError;
pub use geometry::{Footprint, Point, Rect, Segment};
pub use separation::{bounds, outline, separate, SeparationReport, EPSILON};
pub use preview::{board_svg, render_svg};
