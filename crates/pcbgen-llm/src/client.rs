//! Blocking client for OpenAI-compatible chat completion endpoints.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Something that turns a prompt into a text reply
pub trait Completion {
    fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Option<String>,
}

pub struct LlmClient {
    config: LlmConfig,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl LlmClient {
    /// Create a client, reading the API key from the configured variable.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn request<'a>(&self, model: &'a str, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: self
                .config
                .json_mode
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

impl Completion for LlmClient {
    fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        log::debug!("Calling {model} with a {} byte prompt", prompt.len());

        let response = self
            .client
            .post(self.config.chat_url())
            .bearer_auth(&self.api_key)
            .json(&self.request(model, prompt))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json()?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(json_mode: bool) -> LlmClient {
        LlmClient {
            config: LlmConfig {
                json_mode,
                ..LlmConfig::default()
            },
            api_key: "test".to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(client(true).request("gpt-4.1", "hello")).unwrap();
        assert_eq!(body["model"], "gpt-4.1");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["response_format"]["type"], "json_object");

        let body = serde_json::to_value(client(false).request("m", "p")).unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_missing_api_key() {
        let config = LlmConfig {
            api_key_env: "PCBGEN_TEST_UNSET_KEY".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            LlmClient::new(config),
            Err(LlmError::MissingApiKey(name)) if name == "PCBGEN_TEST_UNSET_KEY"
        ));
    }
}
