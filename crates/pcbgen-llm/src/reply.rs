//! Pulling JSON payloads out of model replies.

use serde::de::DeserializeOwned;

use crate::error::LlmError;

/// The JSON object inside `reply`, which may be wrapped in a markdown fence
/// or surrounded by prose.
pub fn extract_json(reply: &str) -> &str {
    let body = match reply.find("```") {
        Some(fence) => {
            let after = &reply[fence + 3..];
            // skip the info string, e.g. ```json
            let after = after.find('\n').map_or(after, |nl| &after[nl + 1..]);
            after.find("```").map_or(after, |end| &after[..end])
        }
        None => reply,
    };

    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body.trim(),
    }
}

/// Parse a reply into `T`. An `{"error": …}` object is reported as an
/// upstream error rather than a shape mismatch.
pub fn parse_reply<T: DeserializeOwned>(context: &str, reply: &str) -> Result<T, LlmError> {
    let value: serde_json::Value = serde_json::from_str(extract_json(reply))
        .map_err(|e| LlmError::invalid_json(context, e))?;

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .or_else(|| error.as_str())
            .unwrap_or("Unknown error");
        return Err(LlmError::ErrorPayload(message.to_string()));
    }

    serde_json::from_value(value).map_err(|e| LlmError::invalid_json(context, e))
}
