//! The two model-backed steps of schematic generation.

use std::path::{Path, PathBuf};

use crate::client::Completion;
use crate::error::LlmError;
use crate::plan::{AllowedComponent, Allowlist, ComponentPlan, FilterSelection, NetPlan};
use crate::prompts::Prompts;
use crate::reply::parse_reply;

/// Picks components for a request from an allowlist
pub trait ComponentSelector {
    /// Narrow the allowlist to the parts relevant for `request`.
    /// Never fails; the full allowlist is the fallback.
    fn filter(&self, _request: &str, allowlist: &Allowlist) -> Vec<AllowedComponent> {
        allowlist.allowlist.clone()
    }

    fn select(
        &self,
        request: &str,
        components: &[AllowedComponent],
        canvas: &serde_json::Value,
    ) -> Result<ComponentPlan, LlmError>;
}

/// Produces nets for a prompt describing the placed components
pub trait NetlistGenerator {
    fn generate(&self, prompt: &str) -> Result<NetPlan, LlmError>;
}

/// Both steps answered by a chat model
pub struct LlmPlanner<C> {
    completion: C,
    prompts: Prompts,
    model: String,
    filter_model: String,
}

impl<C: Completion> LlmPlanner<C> {
    pub fn new(completion: C, prompts: Prompts, model: &str, filter_model: &str) -> Self {
        Self {
            completion,
            prompts,
            model: model.to_string(),
            filter_model: filter_model.to_string(),
        }
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    fn try_filter(&self, request: &str, allowlist: &Allowlist) -> Result<Vec<AllowedComponent>, LlmError> {
        let prompt = self.prompts.filter(request, &allowlist.allowlist);
        let reply = self.completion.complete(&self.filter_model, &prompt)?;
        let selection: FilterSelection = parse_reply("component filter", &reply)?;
        Ok(selection.selected)
    }
}

impl<C: Completion> ComponentSelector for LlmPlanner<C> {
    fn filter(&self, request: &str, allowlist: &Allowlist) -> Vec<AllowedComponent> {
        log::debug!("Filtering {} components with {}", allowlist.len(), self.filter_model);
        match self.try_filter(request, allowlist) {
            Ok(selected) if !selected.is_empty() => {
                let names: Vec<_> = selected.iter().map(|c| c.symbol.as_str()).collect();
                log::debug!("Filter kept: {}", names.join(", "));
                selected
            }
            Ok(_) => {
                log::warn!("No components selected by the filter, using the full allowlist");
                allowlist.allowlist.clone()
            }
            Err(e) => {
                log::warn!("Component filter failed ({e}), using the full allowlist");
                allowlist.allowlist.clone()
            }
        }
    }

    fn select(
        &self,
        request: &str,
        components: &[AllowedComponent],
        canvas: &serde_json::Value,
    ) -> Result<ComponentPlan, LlmError> {
        let prompt = self.prompts.selection(request, components, canvas);
        let reply = self.completion.complete(&self.model, &prompt)?;
        let plan: ComponentPlan = parse_reply("component selection", &reply)?;
        log::debug!("Model selected {} components", plan.symbols.len());
        Ok(plan)
    }
}

impl<C: Completion> NetlistGenerator for LlmPlanner<C> {
    fn generate(&self, prompt: &str) -> Result<NetPlan, LlmError> {
        let reply = self.completion.complete(&self.model, prompt)?;
        let nets: NetPlan = parse_reply("netlist", &reply)?;
        log::debug!("Model generated {} nets", nets.nets.len());
        Ok(nets)
    }
}

pub const COMPONENT_PLAN_FILE: &str = "llm_output1.json";
pub const NET_PLAN_FILE: &str = "llm_output2.json";

/// Replays replies saved by an earlier run instead of calling a model
#[derive(Debug, Clone)]
pub struct ReplayPlanner {
    components: PathBuf,
    nets: PathBuf,
}

impl ReplayPlanner {
    /// Read `llm_output1.json` and `llm_output2.json` from `dir`.
    pub fn new(dir: &Path) -> Self {
        Self::from_files(dir.join(COMPONENT_PLAN_FILE), dir.join(NET_PLAN_FILE))
    }

    pub fn from_files(components: PathBuf, nets: PathBuf) -> Self {
        Self { components, nets }
    }

    fn read(path: &Path) -> Result<String, LlmError> {
        log::debug!("Replaying {}", path.display());
        std::fs::read_to_string(path).map_err(|e| LlmError::io(path, e))
    }
}

impl ComponentSelector for ReplayPlanner {
    fn select(
        &self,
        _request: &str,
        _components: &[AllowedComponent],
        _canvas: &serde_json::Value,
    ) -> Result<ComponentPlan, LlmError> {
        parse_reply(&self.components.display().to_string(), &Self::read(&self.components)?)
    }
}

impl NetlistGenerator for ReplayPlanner {
    fn generate(&self, _prompt: &str) -> Result<NetPlan, LlmError> {
        parse_reply(&self.nets.display().to_string(), &Self::read(&self.nets)?)
    }
}
