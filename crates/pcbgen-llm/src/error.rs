use std::path::PathBuf;

/// Failures talking to the language model or reading its saved replies
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("environment variable {0} with the API key is not set")]
    MissingApiKey(String),

    #[error("failed to reach the LLM endpoint: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM returned invalid JSON for {context}: {source}")]
    InvalidJson {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("LLM returned error: {0}")]
    ErrorPayload(String),

    #[error("LLM returned an empty reply")]
    EmptyReply,

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LlmError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LlmError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_json(context: impl Into<String>, source: serde_json::Error) -> Self {
        LlmError::InvalidJson {
            context: context.into(),
            source,
        }
    }
}
