use std::cell::Cell;
use std::path::Path;

use anyhow::bail;
use pcbgen_core::{process_board, ErrorKind, Phase};
use pcbgen_kicad::ToolError;
use pcbgen_layout::{Autorouter, Board, Footprint, LayoutOptions, Point, Rect, Segment};

struct MemoryBoard {
    footprints: Vec<Footprint>,
    saved: bool,
}

impl Board for MemoryBoard {
    fn footprints(&self) -> anyhow::Result<Vec<Footprint>> {
        Ok(self.footprints.clone())
    }

    fn move_footprint(&mut self, reference: &str, position: Point) -> anyhow::Result<()> {
        match self.footprints.iter_mut().find(|fp| fp.reference == reference) {
            Some(fp) => {
                fp.translate(position.x - fp.position.x, position.y - fp.position.y);
                Ok(())
            }
            None => bail!("no footprint {reference}"),
        }
    }

    fn add_outline(&mut self, _segments: &[Segment]) -> anyhow::Result<()> {
        Ok(())
    }

    fn save(&mut self) -> anyhow::Result<()> {
        self.saved = true;
        Ok(())
    }
}

struct Router {
    fail: bool,
    calls: Cell<usize>,
}

impl Autorouter for Router {
    fn route(&self, _board_file: &Path) -> anyhow::Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(ToolError::TimedOut {
                tool: "Freerouting".to_string(),
                seconds: 1,
            }
            .into());
        }
        Ok(())
    }
}

fn board() -> MemoryBoard {
    let square = |reference: &str, x: f64| {
        Footprint::new(reference, Point::new(x, 0.0), Rect::new(x - 1.0, -1.0, 2.0, 2.0))
    };
    MemoryBoard {
        footprints: vec![square("R1", 0.0), square("R2", 0.5)],
        saved: false,
    }
}

#[test]
fn test_layout_preview_and_route() {
    let dir = tempfile::tempdir().unwrap();
    let preview = dir.path().join("board.svg");
    let router = Router {
        fail: false,
        calls: Cell::new(0),
    };
    let mut board = board();

    let result = process_board(
        &mut board,
        Path::new("board.kicad_pcb"),
        &LayoutOptions::default(),
        Some(&preview),
        Some(&router),
    )
    .unwrap();

    assert!(board.saved);
    assert!(result.routed);
    assert!(result.layout.separation.converged);
    assert_eq!(router.calls.get(), 1);
    assert!(std::fs::read_to_string(&preview).unwrap().contains("<svg"));
}

#[test]
fn test_router_timeout_is_phase_8() {
    let router = Router {
        fail: true,
        calls: Cell::new(0),
    };
    let err = process_board(
        &mut board(),
        Path::new("board.kicad_pcb"),
        &LayoutOptions::default(),
        None,
        Some(&router),
    )
    .unwrap_err();
    assert_eq!(err.phase, Phase::Routing);
    assert_eq!(err.kind(), ErrorKind::ExternalTool);
}

#[test]
fn test_empty_board_is_phase_7() {
    let mut empty = MemoryBoard {
        footprints: vec![],
        saved: false,
    };
    let err = process_board(
        &mut empty,
        Path::new("board.kicad_pcb"),
        &LayoutOptions::default(),
        None,
        None,
    )
    .unwrap_err();
    assert_eq!(err.phase, Phase::Layout);
    assert_eq!(err.kind(), ErrorKind::EmptySet);
}
