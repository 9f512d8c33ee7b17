//! [`Board`] backed by a `.kicad_pcb` file and KiCad's `pcbnew` module.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pcbgen_layout::{Board, Footprint, LayoutError, Point, Segment};
use serde::Serialize;

use crate::python::KicadPython;

const EXPORT_FOOTPRINTS: &str = include_str!("scripts/export_footprints.py");
const APPLY_LAYOUT: &str = include_str!("scripts/apply_layout.py");

/// Line width of generated Edge.Cuts segments, mm
const EDGE_WIDTH: f64 = 0.1;

#[derive(Debug, Serialize)]
struct Move<'a> {
    reference: &'a str,
    x: f64,
    y: f64,
}

/// Pending edits handed to the apply script
#[derive(Debug, Serialize)]
struct LayoutEdits<'a> {
    moves: Vec<Move<'a>>,
    outline: &'a [Segment],
    edge_width: f64,
}

/// A board file whose footprints are read once on open. Moves and the
/// outline are buffered and written by [`Board::save`].
#[derive(Debug)]
pub struct PcbnewBoard {
    path: PathBuf,
    python: KicadPython,
    footprints: Vec<Footprint>,
    moves: BTreeMap<String, Point>,
    outline: Vec<Segment>,
}

impl PcbnewBoard {
    pub fn open(path: &Path, python: KicadPython) -> Result<Self> {
        let export = tempfile::NamedTempFile::new()
            .context("Failed to create temporary file for footprint export")?;
        python
            .run(
                EXPORT_FOOTPRINTS,
                [path.to_string_lossy(), export.path().to_string_lossy()],
            )
            .with_context(|| format!("Failed to read footprints from {}", path.display()))?;

        let json = std::fs::read_to_string(export.path())
            .context("Failed to read exported footprints")?;
        let footprints = parse_footprints(&json)?;
        log::debug!(
            "Opened {} with {} footprint(s)",
            path.display(),
            footprints.len()
        );

        Ok(PcbnewBoard {
            path: path.to_path_buf(),
            python,
            footprints,
            moves: BTreeMap::new(),
            outline: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn edits(&self) -> LayoutEdits<'_> {
        LayoutEdits {
            moves: self
                .moves
                .iter()
                .map(|(reference, p)| Move {
                    reference,
                    x: p.x,
                    y: p.y,
                })
                .collect(),
            outline: &self.outline,
            edge_width: EDGE_WIDTH,
        }
    }
}

fn parse_footprints(json: &str) -> Result<Vec<Footprint>> {
    serde_json::from_str(json).context("Footprint export is not valid JSON")
}

impl Board for PcbnewBoard {
    fn footprints(&self) -> Result<Vec<Footprint>> {
        Ok(self.footprints.clone())
    }

    fn move_footprint(&mut self, reference: &str, position: Point) -> Result<()> {
        let footprint = self
            .footprints
            .iter_mut()
            .find(|fp| fp.reference == reference)
            .ok_or_else(|| LayoutError::UnknownFootprint(reference.to_string()))?;
        footprint.translate(
            position.x - footprint.position.x,
            position.y - footprint.position.y,
        );
        self.moves.insert(reference.to_string(), position);
        Ok(())
    }

    fn add_outline(&mut self, segments: &[Segment]) -> Result<()> {
        self.outline = segments.to_vec();
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        let edits = serde_json::to_string(&self.edits())?;
        let file = tempfile::NamedTempFile::new()
            .context("Failed to create temporary file for layout edits")?;
        std::fs::write(file.path(), edits).context("Failed to write layout edits")?;

        self.python
            .run(
                APPLY_LAYOUT,
                [self.path.to_string_lossy(), file.path().to_string_lossy()],
            )
            .with_context(|| format!("Failed to update {}", self.path.display()))?;

        log::info!(
            "Saved {} ({} move(s), {} edge segment(s))",
            self.path.display(),
            self.moves.len(),
            self.outline.len()
        );
        self.moves.clear();
        Ok(())
    }
}
