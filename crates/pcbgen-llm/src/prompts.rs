use std::path::Path;

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::plan::AllowedComponent;

const FILTER: &str = include_str!("prompts/filter.txt");
const SELECTION: &str = include_str!("prompts/selection.txt");
const NETLIST: &str = include_str!("prompts/netlist.txt");

/// Prompt templates, built in or loaded from the configured overrides
#[derive(Debug, Clone, PartialEq)]
pub struct Prompts {
    filter: String,
    selection: String,
    netlist: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            filter: FILTER.to_string(),
            selection: SELECTION.to_string(),
            netlist: NETLIST.to_string(),
        }
    }
}

fn load(path: Option<&Path>, builtin: &str) -> Result<String, LlmError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| LlmError::io(path, e)),
        None => Ok(builtin.to_string()),
    }
}

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

impl Prompts {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            filter: load(config.filter_prompt.as_deref(), FILTER)?,
            selection: load(config.selection_prompt.as_deref(), SELECTION)?,
            netlist: load(config.netlist_prompt.as_deref(), NETLIST)?,
        })
    }

    /// `{request}` and `{allowlist}` in the template are substituted.
    pub fn filter(&self, request: &str, allowlist: &[AllowedComponent]) -> String {
        self.filter
            .replace("{request}", request)
            .replace("{allowlist}", &pretty(&allowlist))
    }

    pub fn selection(
        &self,
        request: &str,
        allowlist: &[AllowedComponent],
        canvas: &serde_json::Value,
    ) -> String {
        let input = serde_json::json!({
            "allowlist": allowlist,
            "canvas": canvas,
            "request": request,
        });
        format!("{}\n\nINPUT:\n{}", self.selection.trim_end(), pretty(&input))
    }

    /// `components` is the placed plan with pins reduced to names.
    pub fn netlist(&self, components: &serde_json::Value) -> String {
        format!(
            "{}\n\nHere is the component list JSON:\n\n{}\n",
            self.netlist.trim_end(),
            pretty(components)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resistor() -> AllowedComponent {
        AllowedComponent {
            lib: "Device.kicad_sym".to_string(),
            symbol: "R".to_string(),
            reference: "R".to_string(),
            footprint: Some("Resistor_SMD:R_0603_1608Metric".to_string()),
            description: None,
            reason: None,
        }
    }

    #[test]
    fn test_filter_prompt_substitutes() {
        let prompt = Prompts::default().filter("blink an LED", &[resistor()]);
        assert!(prompt.contains("Request: \"blink an LED\""));
        assert!(prompt.contains("\"ref\": \"R\""));
        assert!(!prompt.contains("{allowlist}"));
        assert!(prompt.contains("\"selected\""));
    }

    #[test]
    fn test_selection_prompt_input_block() {
        let canvas = serde_json::json!({"width": 297, "height": 210});
        let prompt = Prompts::default().selection("blink an LED", &[resistor()], &canvas);
        let (_, input) = prompt.split_once("\n\nINPUT:\n").unwrap();
        let input: serde_json::Value = serde_json::from_str(input).unwrap();
        assert_eq!(input["request"], "blink an LED");
        assert_eq!(input["canvas"]["width"], 297);
        assert_eq!(input["allowlist"][0]["symbol"], "R");
    }

    #[test]
    fn test_netlist_prompt() {
        let prompt = Prompts::default().netlist(&serde_json::json!({"symbols": []}));
        assert!(prompt.ends_with("Here is the component list JSON:\n\n{\n  \"symbols\": []\n}\n"));
    }

    #[test]
    fn test_override_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netlist.txt");
        std::fs::write(&path, "Wire it up.\n").unwrap();
        let config = LlmConfig {
            netlist_prompt: Some(path),
            ..LlmConfig::default()
        };
        let prompts = Prompts::from_config(&config).unwrap();
        assert!(prompts.netlist(&serde_json::json!({})).starts_with("Wire it up.\n\n"));
        assert_eq!(prompts.filter, FILTER);

        let missing = LlmConfig {
            selection_prompt: Some(dir.path().join("nope.txt")),
            ..LlmConfig::default()
        };
        assert!(matches!(Prompts::from_config(&missing), Err(LlmError::Io { .. })));
    }
}
