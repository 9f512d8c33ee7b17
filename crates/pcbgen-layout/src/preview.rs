//! SVG preview of a laid-out board.

use std::path::Path;

use anyhow::{Context, Result};
use svg::node::element::{Line, Rectangle, Text};
use svg::Document;

use crate::geometry::{Footprint, Rect, Segment};

const PADDING: f64 = 2.0;

/// Build the preview: footprint boxes with their references and the outline.
pub fn board_svg(footprints: &[Footprint], outline: &[Segment]) -> Document {
    let view = view_box(footprints, outline).expand(PADDING);
    let mut document = Document::new()
        .set("width", format!("{}mm", view.width))
        .set("height", format!("{}mm", view.height))
        .set(
            "viewBox",
            format!("{} {} {} {}", view.x, view.y, view.width, view.height),
        );

    for segment in outline {
        let line = Line::new()
            .set("x1", segment.start.x)
            .set("y1", segment.start.y)
            .set("x2", segment.end.x)
            .set("y2", segment.end.y)
            .set("stroke", "gold")
            .set("stroke-width", 0.3);
        document = document.add(line);
    }

    for fp in footprints {
        let rect = Rectangle::new()
            .set("x", fp.bbox.x)
            .set("y", fp.bbox.y)
            .set("width", fp.bbox.width)
            .set("height", fp.bbox.height)
            .set("fill", "lightblue")
            .set("stroke", "blue")
            .set("stroke-width", 0.2);
        document = document.add(rect);

        let label = Text::new()
            .set("x", fp.bbox.x + 0.5)
            .set("y", fp.bbox.y + 1.5)
            .set("font-size", "1.2px")
            .add(svg::node::Text::new(fp.reference.clone()));
        document = document.add(label);
    }

    document
}

/// Write the preview to `path`.
pub fn render_svg(footprints: &[Footprint], outline: &[Segment], path: &Path) -> Result<()> {
    let document = board_svg(footprints, outline);
    svg::save(path, &document)
        .with_context(|| format!("Failed to save SVG to {}", path.display()))?;
    log::debug!("Wrote board preview {}", path.display());
    Ok(())
}

fn view_box(footprints: &[Footprint], outline: &[Segment]) -> Rect {
    let mut boxes = footprints.iter().map(|fp| fp.bbox).chain(
        outline
            .iter()
            .map(|s| Rect::from_corners(s.start, s.start).union(&Rect::from_corners(s.end, s.end))),
    );
    match boxes.next() {
        Some(first) => boxes.fold(first, |acc, r| acc.union(&r)),
        None => Rect::new(0.0, 0.0, 10.0, 10.0),
    }
}
