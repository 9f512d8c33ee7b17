use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use pcbgen_schematic::{clear_file, place_symbol, PlacementRequest, Position, SymbolLibrary};

use crate::ui;
use crate::GlobalArgs;

#[derive(Args, Debug, Clone)]
#[command(about = "Place a single symbol into a schematic")]
pub struct PlaceArgs {
    /// Schematic file to edit
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,

    /// Symbol library, e.g. Device or Device.kicad_sym
    #[arg(long)]
    pub lib: String,

    /// Symbol name inside the library
    #[arg(long)]
    pub symbol: String,

    /// Designator (R3), prefix (R) or placeholder (R?)
    #[arg(long = "ref")]
    pub reference: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub x: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub y: f64,

    /// Rotation in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub rot: f64,

    #[arg(long)]
    pub value: Option<String>,

    #[arg(long)]
    pub footprint: Option<String>,
}

#[derive(Args, Debug, Clone)]
#[command(about = "Remove all components and wires from a schematic")]
pub struct ClearArgs {
    /// Schematic file to clear
    #[arg(value_name = "SCHEMATIC", value_hint = clap::ValueHint::FilePath)]
    pub schematic: PathBuf,
}

pub fn execute(args: PlaceArgs, global: &GlobalArgs) -> Result<()> {
    let config = global.config(&args.schematic)?;
    let mut library = SymbolLibrary::new(config.library_root()?);

    let request = PlacementRequest {
        library: args.lib,
        symbol: args.symbol,
        designator: args.reference,
        position: Position::new(args.x, args.y, args.rot),
        value: args.value,
        footprint: args.footprint,
    };
    let (_, instance) = place_symbol(&args.schematic, &mut library, &request)?;

    println!(
        "{} Placed {} ({}) at ({}, {}) with {} pins",
        ui::success(),
        instance.reference.green().bold(),
        instance.lib_id,
        instance.position.x,
        instance.position.y,
        instance.pins.len()
    );
    Ok(())
}

pub fn clear(args: ClearArgs) -> Result<()> {
    clear_file(&args.schematic)?;
    println!(
        "{} Cleared {}",
        ui::success(),
        args.schematic.display().to_string().green().bold()
    );
    Ok(())
}
