//! Seams to the board runtime and the autorouter, and the layout pipeline
//! that drives them.

use std::path::Path;

use serde::Serialize;

use crate::error::LayoutError;
use crate::geometry::{Footprint, Point, Rect, Segment};
use crate::separation::{bounds, outline, separate, SeparationReport};

/// A board file opened in some runtime that can move footprints and draw the
/// board edge
pub trait Board {
    /// Current footprints with absolute bounding boxes
    fn footprints(&self) -> anyhow::Result<Vec<Footprint>>;

    fn move_footprint(&mut self, reference: &str, position: Point) -> anyhow::Result<()>;

    /// Replace the board edge with `segments`
    fn add_outline(&mut self, segments: &[Segment]) -> anyhow::Result<()>;

    fn save(&mut self) -> anyhow::Result<()>;
}

/// External routing of a saved board file, in place
pub trait Autorouter {
    fn route(&self, board_file: &Path) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Minimum clearance between footprint bounding boxes, mm
    pub min_spacing: f64,
    pub max_iterations: usize,
    /// Distance from the footprints to the board edge, mm
    pub margin: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        LayoutOptions {
            min_spacing: 2.0,
            max_iterations: 200,
            margin: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutReport {
    pub separation: SeparationReport,
    /// References of the footprints that were moved
    pub moved: Vec<String>,
    pub bounds: Rect,
    pub outline: [Segment; 4],
    /// Final footprint positions
    pub footprints: Vec<Footprint>,
}

/// Space the board's footprints, draw its outline and save it.
pub fn layout_board(board: &mut dyn Board, options: &LayoutOptions) -> Result<LayoutReport, LayoutError> {
    let mut footprints = board.footprints()?;
    if footprints.is_empty() {
        return Err(LayoutError::EmptySet);
    }
    log::info!("Laying out {} footprint(s)", footprints.len());

    let original: Vec<Point> = footprints.iter().map(|fp| fp.position).collect();
    let separation = separate(&mut footprints, options.min_spacing, options.max_iterations);

    let mut moved = Vec::new();
    for (fp, before) in footprints.iter().zip(original) {
        if fp.position != before {
            board.move_footprint(&fp.reference, fp.position)?;
            moved.push(fp.reference.clone());
        }
    }

    let bounds = bounds(&footprints)?;
    let outline = outline(bounds, options.margin);
    board.add_outline(&outline)?;
    board.save()?;
    log::info!(
        "Moved {} footprint(s), board is {:.2} x {:.2} mm",
        moved.len(),
        bounds.width + 2.0 * options.margin,
        bounds.height + 2.0 * options.margin
    );

    Ok(LayoutReport {
        separation,
        moved,
        bounds,
        outline,
        footprints,
    })
}
