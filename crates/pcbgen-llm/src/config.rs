use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the LLM collaborators, the `[llm]` table of `pcbgen.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model for component selection and netlist generation
    pub model: String,
    /// Fast model used to pre-filter the allowlist
    pub filter_model: String,
    /// OpenAI-compatible API root; `/chat/completions` is appended
    pub base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask for `response_format: json_object`
    pub json_mode: bool,
    pub timeout_seconds: u64,
    /// Prompt template overrides; the built-in templates are used when unset
    pub filter_prompt: Option<PathBuf>,
    pub selection_prompt: Option<PathBuf>,
    pub netlist_prompt: Option<PathBuf>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1".to_string(),
            filter_model: "gpt-4.1-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 8000,
            temperature: 0.2,
            json_mode: true,
            timeout_seconds: 180,
            filter_prompt: None,
            selection_prompt: None,
            netlist_prompt: None,
        }
    }
}

impl LlmConfig {
    pub fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
