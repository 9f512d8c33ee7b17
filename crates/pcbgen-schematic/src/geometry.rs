//! Schematic coordinate transforms.
//!
//! Symbol-local coordinates have y pointing up while the schematic sheet has y
//! pointing down, so a local offset is rotated and then added with its y
//! component negated.

use pcbgen_sexpr::Sexpr;
use serde::{Deserialize, Serialize};

/// Absolute placement of a symbol on the sheet, in millimetres and degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rot: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, rot: f64) -> Self {
        Position { x, y, rot }
    }

    /// Read `(at x y [rot])` from a node's children
    pub fn from_at(node: &Sexpr) -> Option<Self> {
        let at = node.child("at")?;
        Some(Position {
            x: at.f64_at(1)?,
            y: at.f64_at(2)?,
            rot: at.f64_at(3).unwrap_or(0.0),
        })
    }

    pub fn to_at(&self) -> Sexpr {
        Sexpr::node(
            "at",
            [
                Sexpr::number(self.x),
                Sexpr::number(self.y),
                Sexpr::number(self.rot),
            ],
        )
    }
}

/// Fold an angle into `[0, 360)`
pub fn normalize_rotation(degrees: f64) -> f64 {
    let r = degrees.rem_euclid(360.0);
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

/// Sine and cosine, exact for multiples of 90 degrees
fn sin_cos(degrees: f64) -> (f64, f64) {
    let r = normalize_rotation(degrees);
    if r == 0.0 {
        (0.0, 1.0)
    } else if r == 90.0 {
        (1.0, 0.0)
    } else if r == 180.0 {
        (0.0, -1.0)
    } else if r == 270.0 {
        (-1.0, 0.0)
    } else {
        r.to_radians().sin_cos()
    }
}

/// Rotate the local offset `(px, py)` by `rot` degrees.
pub fn rotate(px: f64, py: f64, rot: f64) -> (f64, f64) {
    let (sin, cos) = sin_cos(rot);
    (px * cos - py * sin, px * sin + py * cos)
}

/// Map a symbol-local point to sheet coordinates for a symbol placed at `at`.
pub fn rotate_translate(px: f64, py: f64, at: Position) -> (f64, f64) {
    let (cx, cy) = rotate(px, py, at.rot);
    (at.x + cx, at.y - cy)
}

/// Map a symbol-local anchor (position plus text/pin angle) to the sheet.
pub fn transform(local: Position, at: Position) -> Position {
    let (x, y) = rotate_translate(local.x, local.y, at);
    Position {
        x,
        y,
        rot: normalize_rotation(local.rot + at.rot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn test_identity_rotation_inverts_y() {
        let at = Position::new(50.0, 40.0, 0.0);
        assert!(close(rotate_translate(2.032, 1.5, at), (52.032, 38.5)));
    }

    #[test]
    fn test_quarter_turn_label() {
        let label = transform(Position::new(0.0, 1.27, 0.0), Position::new(10.0, 10.0, 90.0));
        assert!(close((label.x, label.y), (8.73, 10.0)));
        assert_eq!(label.rot, 90.0);
    }

    #[test]
    fn test_half_turn_twice_is_identity() {
        let (x, y) = rotate(3.81, -1.27, 180.0);
        let back = rotate(x, y, 180.0);
        assert_eq!(back, (3.81, -1.27));
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(450.0), 90.0);
        assert_eq!(normalize_rotation(-90.0), 270.0);
        assert_eq!(normalize_rotation(360.0), 0.0);
        assert_eq!(transform(Position::new(0.0, 0.0, 270.0), Position::new(0.0, 0.0, 180.0)).rot, 90.0);
    }

    #[test]
    fn test_arbitrary_angle() {
        let (x, y) = rotate(1.0, 0.0, 45.0);
        assert!(close((x, y), (0.5f64.sqrt(), 0.5f64.sqrt())));
    }

    #[test]
    fn test_read_at() {
        let node = pcbgen_sexpr::parse("(pin passive line (at 0 3.81 270) (length 1.27))").unwrap();
        assert_eq!(Position::from_at(&node), Some(Position::new(0.0, 3.81, 270.0)));
        let node = pcbgen_sexpr::parse("(property \"Value\" \"R\" (at 1 2))").unwrap();
        assert_eq!(Position::from_at(&node), Some(Position::new(1.0, 2.0, 0.0)));
    }
}
