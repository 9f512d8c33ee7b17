//! Language model collaborators for schematic generation.
//!
//! [`LlmPlanner`] asks an OpenAI-compatible chat endpoint to pick components
//! and to connect them; [`ReplayPlanner`] answers the same questions from the
//! JSON files a previous run saved.

mod client;
mod config;
mod error;
pub mod plan;
mod planner;
mod prompts;
pub mod reply;

pub use client::{Completion, LlmClient};
pub use config::LlmConfig;
pub use error::LlmError;
pub use plan::{
    AllowedComponent, Allowlist, CanvasPosition, ComponentPlan, NetPlan, PinnedPlan,
    PinnedSymbol, PlannedSymbol,
};
pub use planner::{
    ComponentSelector, LlmPlanner, NetlistGenerator, ReplayPlanner, COMPONENT_PLAN_FILE,
    NET_PLAN_FILE,
};
pub use prompts::Prompts;

/// A planner backed by a live model, configured from `config`
pub fn connect(config: &LlmConfig) -> Result<LlmPlanner<LlmClient>, LlmError> {
    let prompts = Prompts::from_config(config)?;
    let client = LlmClient::new(config.clone())?;
    Ok(LlmPlanner::new(client, prompts, &config.model, &config.filter_model))
}
