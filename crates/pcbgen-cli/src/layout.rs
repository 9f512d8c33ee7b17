use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use pcbgen_core::process_board;
use pcbgen_kicad::PcbnewBoard;
use pcbgen_layout::Autorouter;

use crate::ui::{self, Spinner};
use crate::GlobalArgs;

#[derive(Args, Debug, Clone)]
#[command(about = "Space out footprints, draw the board outline and optionally autoroute")]
pub struct LayoutArgs {
    /// KiCad board file
    #[arg(value_name = "BOARD", value_hint = clap::ValueHint::FilePath)]
    pub board: PathBuf,

    /// Run the autorouter after layout
    #[arg(long)]
    pub route: bool,

    /// Write an SVG preview of the laid out board
    #[arg(long, value_name = "FILE")]
    pub svg: Option<PathBuf>,

    /// Override the minimum footprint spacing, mm
    #[arg(long)]
    pub min_spacing: Option<f64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: LayoutArgs, global: &GlobalArgs) -> Result<()> {
    let config = global.config(&args.board)?;
    let mut options = config.layout_options();
    if let Some(spacing) = args.min_spacing {
        options.min_spacing = spacing;
    }

    let spinner = Spinner::start(format!("Laying out {}", args.board.display()));
    let mut board = match PcbnewBoard::open(&args.board, config.kicad_python()) {
        Ok(board) => board,
        Err(e) => {
            spinner.error("Failed to open board");
            return Err(e);
        }
    };

    let router = config.autorouter();
    let result = process_board(
        &mut board,
        &args.board,
        &options,
        args.svg.as_deref(),
        args.route.then_some(&router as &dyn Autorouter),
    );
    let result = match result {
        Ok(result) => {
            spinner.finish();
            result
        }
        Err(e) => {
            spinner.error(format!("{e}"));
            return Err(e.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let separation = &result.layout.separation;
    let icon = if separation.converged {
        ui::success()
    } else {
        ui::warning()
    };
    println!(
        "{} {} ({} footprints, {} moved, {} passes)",
        icon,
        args.board.display().to_string().green().bold(),
        result.layout.footprints.len(),
        result.layout.moved.len(),
        separation.iterations
    );
    if !separation.converged {
        println!(
            "    {} pairs still closer than {} mm",
            separation.violations, options.min_spacing
        );
    }
    if result.routed {
        println!("    routed with {}", config.autorouter.command);
    }
    if let Some(preview) = &result.preview {
        println!("    preview: {}", preview.display());
    }
    Ok(())
}
