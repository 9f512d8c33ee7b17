use std::collections::HashMap;

use anyhow::bail;
use pcbgen_layout::{
    layout_board, Board, Footprint, LayoutError, LayoutOptions, Point, Rect, Segment, EPSILON,
};

/// In-memory board that records what the pipeline asked of it
#[derive(Default)]
struct RecordingBoard {
    footprints: Vec<Footprint>,
    moves: HashMap<String, Point>,
    outline: Vec<Segment>,
    saved: bool,
    fail_save: bool,
}

impl RecordingBoard {
    fn with(footprints: Vec<Footprint>) -> Self {
        RecordingBoard {
            footprints,
            ..Default::default()
        }
    }
}

impl Board for RecordingBoard {
    fn footprints(&self) -> anyhow::Result<Vec<Footprint>> {
        Ok(self.footprints.clone())
    }

    fn move_footprint(&mut self, reference: &str, position: Point) -> anyhow::Result<()> {
        if !self.footprints.iter().any(|fp| fp.reference == reference) {
            return Err(LayoutError::UnknownFootprint(reference.to_string()).into());
        }
        self.moves.insert(reference.to_string(), position);
        Ok(())
    }

    fn add_outline(&mut self, segments: &[Segment]) -> anyhow::Result<()> {
        self.outline = segments.to_vec();
        Ok(())
    }

    fn save(&mut self) -> anyhow::Result<()> {
        if self.fail_save {
            bail!("pcbnew refused to save");
        }
        self.saved = true;
        Ok(())
    }
}

fn square(reference: &str, x: f64, y: f64) -> Footprint {
    Footprint::new(reference, Point::new(x, y), Rect::new(x - 1.0, y - 1.0, 2.0, 2.0))
}

#[test]
fn test_layout_moves_crowded_footprints() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut board = RecordingBoard::with(vec![
        square("R1", 10.0, 10.0),
        square("R2", 11.0, 10.0),
        square("C1", 40.0, 40.0),
    ]);

    let report = layout_board(&mut board, &LayoutOptions::default()).unwrap();

    assert!(report.separation.converged);
    assert_eq!(report.moved, vec!["R1", "R2"]);
    assert!(!board.moves.contains_key("C1"));
    assert_eq!(board.moves["R1"], report.footprints[0].position);
    assert!(board.saved);
    assert_eq!(board.outline.len(), 4);
    assert_eq!(board.outline[0].start, Point::new(report.bounds.x - 5.0, report.bounds.y - 5.0));

    let gap = report.footprints[0].bbox.gap(&report.footprints[1].bbox);
    assert!(gap >= 2.0 - EPSILON);
}

#[test]
fn test_layout_rejects_empty_board() {
    let mut board = RecordingBoard::default();
    let err = layout_board(&mut board, &LayoutOptions::default()).unwrap_err();
    assert!(matches!(err, LayoutError::EmptySet));
    assert!(!board.saved);
}

#[test]
fn test_runtime_failure_is_reported() {
    let mut board = RecordingBoard::with(vec![square("U1", 0.0, 0.0)]);
    board.fail_save = true;
    let err = layout_board(&mut board, &LayoutOptions::default()).unwrap_err();
    assert!(matches!(err, LayoutError::Runtime(_)));
    assert!(err.to_string().contains("refused to save"));
}
