use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pcbgen_core::Config;

mod generate;
mod layout;
mod place;
mod ui;

#[derive(Parser)]
#[command(name = "pcbgen")]
#[command(about = "Generate KiCad schematics and board layouts from a description", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file; by default the nearest pcbgen.toml is used
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory with the KiCad symbol libraries (overrides library_root)
    #[arg(long, global = true, value_name = "DIR")]
    pub library_root: Option<PathBuf>,
}

impl GlobalArgs {
    /// The configuration for work on `target`
    pub fn config(&self, target: &Path) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => {
                let start = if target.as_os_str().is_empty() {
                    std::env::current_dir()?
                } else {
                    target.to_path_buf()
                };
                Config::discover(&start)?
            }
        };
        if let Some(root) = &self.library_root {
            config.library_root = Some(std::env::current_dir()?.join(root));
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a wired schematic from a description
    #[command(alias = "g")]
    Generate(generate::GenerateArgs),

    /// Rebuild a schematic from saved llm_output1.json / llm_output2.json
    Replay(generate::ReplayArgs),

    /// Place a single symbol into a schematic
    Place(place::PlaceArgs),

    /// Remove all components and wires from a schematic
    Clear(place::ClearArgs),

    /// Space out footprints, draw the board outline and optionally autoroute
    #[command(alias = "l")]
    Layout(layout::LayoutArgs),
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate::execute(args, &cli.global),
        Commands::Replay(args) => generate::replay(args, &cli.global),
        Commands::Place(args) => place::execute(args, &cli.global),
        Commands::Clear(args) => place::clear(args),
        Commands::Layout(args) => layout::execute(args, &cli.global),
    }
}
