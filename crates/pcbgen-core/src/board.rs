//! Board phases: spacing relaxation, outline, optional preview and autorouting.

use std::path::{Path, PathBuf};

use pcbgen_layout::{layout_board, render_svg, Autorouter, Board, LayoutOptions, LayoutReport};
use serde::Serialize;

use crate::error::{Error, InPhase, Phase, PhaseError};

#[derive(Debug, Clone, Serialize)]
pub struct BoardResult {
    pub layout: LayoutReport,
    pub routed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<PathBuf>,
}

/// Lay out `board` (phase 7), write an SVG preview when asked, then route
/// `board_file` with `router` (phase 8) when one is given.
pub fn process_board(
    board: &mut dyn Board,
    board_file: &Path,
    options: &LayoutOptions,
    preview: Option<&Path>,
    router: Option<&dyn Autorouter>,
) -> Result<BoardResult, PhaseError> {
    let layout = layout_board(board, options).in_phase(Phase::Layout)?;
    log::info!(
        "Laid out {} footprints ({} moved, {} passes, converged: {})",
        layout.footprints.len(),
        layout.moved.len(),
        layout.separation.iterations,
        layout.separation.converged
    );
    if !layout.separation.converged {
        log::warn!(
            "{} footprint pairs are still closer than {} mm",
            layout.separation.violations,
            options.min_spacing
        );
    }

    if let Some(path) = preview {
        render_svg(&layout.footprints, &layout.outline, path)
            .map_err(Error::Runtime)
            .in_phase(Phase::Layout)?;
        log::info!("Wrote board preview to {}", path.display());
    }

    let routed = match router {
        Some(router) => {
            router
                .route(board_file)
                .map_err(Error::Runtime)
                .in_phase(Phase::Routing)?;
            true
        }
        None => false,
    };

    Ok(BoardResult {
        layout,
        routed,
        preview: preview.map(Path::to_path_buf),
    })
}
