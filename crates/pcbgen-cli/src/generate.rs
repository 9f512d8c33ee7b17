use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use pcbgen_core::{Config, GenerateResult, Workflow};
use pcbgen_llm::{Allowlist, ComponentSelector, NetlistGenerator, Prompts, ReplayPlanner};

use crate::ui::{self, Spinner};
use crate::GlobalArgs;

#[derive(Args, Debug, Clone)]
#[command(about = "Generate a wired KiCad schematic from a description")]
pub struct GenerateArgs {
    /// What the circuit should do
    #[arg(value_name = "PROMPT", required = true, num_args = 1..)]
    pub prompt: Vec<String>,

    /// Schematic file or directory to write into
    #[arg(short, long, default_value = ".", value_hint = clap::ValueHint::AnyPath)]
    pub out: PathBuf,

    /// Component allowlist JSON (overrides the configured allowlist)
    #[arg(long, value_name = "FILE")]
    pub allowlist: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
#[command(about = "Rebuild a schematic from saved model replies")]
pub struct ReplayArgs {
    /// Directory holding llm_output1.json and llm_output2.json
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub from: PathBuf,

    /// Schematic file or directory to write into
    #[arg(short, long, default_value = ".", value_hint = clap::ValueHint::AnyPath)]
    pub out: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: GenerateArgs, global: &GlobalArgs) -> Result<()> {
    let config = global.config(&args.out)?;
    let allowlist_path = match &args.allowlist {
        Some(path) => path.clone(),
        None => config.allowlist_path(),
    };
    let allowlist = Allowlist::load(&allowlist_path)
        .with_context(|| format!("Failed to load allowlist {}", allowlist_path.display()))?;
    let planner = pcbgen_llm::connect(&config.llm())?;

    let prompt = args.prompt.join(" ");
    log::info!("Generating schematic for: {prompt}");
    let result = run(&config, &planner, &planner, allowlist, &prompt, &args.out)?;
    report(&result, args.json)
}

pub fn replay(args: ReplayArgs, global: &GlobalArgs) -> Result<()> {
    let config = global.config(&args.out)?;
    let planner = ReplayPlanner::new(&args.from);
    let result = run(&config, &planner, &planner, Allowlist::default(), "", &args.out)?;
    report(&result, args.json)
}

fn run(
    config: &Config,
    selector: &dyn ComponentSelector,
    netlist: &dyn NetlistGenerator,
    allowlist: Allowlist,
    prompt: &str,
    out: &Path,
) -> Result<GenerateResult> {
    let prompts = Prompts::from_config(&config.llm())?;
    let library_root = config.library_root()?;

    let spinner = Spinner::start("Generating schematic");
    let result = Workflow::new(selector, netlist, library_root, allowlist)
        .with_prompts(prompts)
        .generate(prompt, out);
    spinner.finish();
    Ok(result)
}

fn report(result: &GenerateResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    }

    if let Some(error) = &result.error {
        if !json {
            eprintln!(
                "{} {} in phase {}: {}",
                ui::error(),
                "Generation failed".red().bold(),
                result.failed_phase.unwrap_or_default(),
                error
            );
        }
        bail!("schematic generation failed");
    }

    if !json {
        let schematic = result
            .schematic()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!(
            "{} {} ({} components, {} nets)",
            ui::success(),
            schematic.green().bold(),
            result.components.len(),
            result.nets.len()
        );
        for (role, path) in &result.files {
            println!("    {role}: {}", path.display());
        }
    }
    Ok(())
}
