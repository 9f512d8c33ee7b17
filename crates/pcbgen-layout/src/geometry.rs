use serde::{Deserialize, Serialize};

/// Board coordinates in millimetres, y pointing down
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// Axis-aligned box anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_corners(min: Point, max: Point) -> Self {
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_corners(
            Point::new(self.x.min(other.x), self.y.min(other.y)),
            Point::new(self.max_x().max(other.max_x()), self.max_y().max(other.max_y())),
        )
    }

    /// Grow by `margin` on every side
    pub fn expand(&self, margin: f64) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Clearance between two boxes: zero when they overlap or touch, the
    /// axis distance when they are apart along one axis only, and the
    /// corner-to-corner distance when apart along both.
    pub fn gap(&self, other: &Rect) -> f64 {
        let dx = (other.x - self.max_x()).max(self.x - other.max_x()).max(0.0);
        let dy = (other.y - self.max_y()).max(self.y - other.max_y()).max(0.0);
        if dx > 0.0 && dy > 0.0 {
            dx.hypot(dy)
        } else {
            dx.max(dy)
        }
    }
}

/// A footprint as seen by the layout engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub reference: String,
    pub position: Point,
    /// Absolute bounding box; moves together with `position`
    pub bbox: Rect,
}

impl Footprint {
    pub fn new(reference: impl Into<String>, position: Point, bbox: Rect) -> Self {
        Footprint {
            reference: reference.into(),
            position,
            bbox,
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.position.x += dx;
        self.position.y += dy;
        self.bbox.translate(dx, dy);
    }
}

/// A straight board-edge segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}
