//! Minimum-spacing enforcement and board outline.

use serde::Serialize;

use crate::error::LayoutError;
use crate::geometry::{Footprint, Point, Rect, Segment};

/// Shortfalls at or below this are treated as satisfied
pub const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeparationReport {
    /// Passes run
    pub iterations: usize,
    /// Pairs still closer than the minimum spacing
    pub violations: usize,
    pub converged: bool,
}

/// Box enclosing every footprint.
pub fn bounds(footprints: &[Footprint]) -> Result<Rect, LayoutError> {
    let (first, rest) = footprints.split_first().ok_or(LayoutError::EmptySet)?;
    Ok(rest
        .iter()
        .fold(first.bbox, |acc, fp| acc.union(&fp.bbox)))
}

/// Push footprints apart until every pair is at least `min_spacing` apart or
/// `max_iterations` passes have run.
///
/// Each pass visits every unordered pair once. A pair that is too close moves
/// apart along the line between the box centres, each footprint by half the
/// shortfall, so the pair's centroid stays put. Coincident centres separate
/// along +x.
pub fn separate(
    footprints: &mut [Footprint],
    min_spacing: f64,
    max_iterations: usize,
) -> SeparationReport {
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        let mut moved = false;

        for i in 0..footprints.len() {
            for j in i + 1..footprints.len() {
                let shortfall = min_spacing - footprints[i].bbox.gap(&footprints[j].bbox);
                if shortfall <= EPSILON {
                    continue;
                }

                let (ux, uy) = direction(footprints[i].bbox.center(), footprints[j].bbox.center());
                let half = shortfall / 2.0;
                footprints[i].translate(-ux * half, -uy * half);
                footprints[j].translate(ux * half, uy * half);
                moved = true;
            }
        }

        if !moved {
            break;
        }
    }

    let violations = count_violations(footprints, min_spacing);
    if violations > 0 {
        log::warn!(
            "{violations} footprint pair(s) still closer than {min_spacing} mm after {iterations} pass(es)"
        );
    } else {
        log::debug!("Spacing satisfied after {iterations} pass(es)");
    }

    SeparationReport {
        iterations,
        violations,
        converged: violations == 0,
    }
}

fn direction(from: Point, to: Point) -> (f64, f64) {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let length = dx.hypot(dy);
    if length < EPSILON {
        (1.0, 0.0)
    } else {
        (dx / length, dy / length)
    }
}

fn count_violations(footprints: &[Footprint], min_spacing: f64) -> usize {
    let mut count = 0;
    for (i, a) in footprints.iter().enumerate() {
        for b in &footprints[i + 1..] {
            if min_spacing - a.bbox.gap(&b.bbox) > EPSILON {
                count += 1;
            }
        }
    }
    count
}

/// The board edge: `bounds` grown by `margin`, as four segments running
/// clockwise from the top-left corner.
pub fn outline(bounds: Rect, margin: f64) -> [Segment; 4] {
    let r = bounds.expand(margin);
    let top_left = Point::new(r.x, r.y);
    let top_right = Point::new(r.max_x(), r.y);
    let bottom_right = Point::new(r.max_x(), r.max_y());
    let bottom_left = Point::new(r.x, r.max_y());

    let segment = |start, end| Segment { start, end };

    [
        segment(top_left, top_right),
        segment(top_right, bottom_right),
        segment(bottom_right, bottom_left),
        segment(bottom_left, top_left),
    ]
}
