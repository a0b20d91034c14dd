//! Universal types for Gemini interactions.
//!
//! These types isolate the chat flow from the wire format of each binding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by a model client.
///
/// The chat flow catches these and turns them into a readable answer, so
/// nothing here is ever shown to the user as a failure page.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key is required to initialise the Gemini client.")]
    MissingApiKey,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Gemini API error [{status}]: {message}")]
    Api { status: u16, message: String },
    #[error("Gemini returned no text in its response")]
    EmptyCompletion,
}

// -----------------------------------------------------------------------------
// generateContent DTOs (shared by both bindings)
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest {
    pub contents: Vec<Content>,
}

impl GenerateRequest {
    /// Single user turn. The provider is stateless across calls, so each
    /// request carries the whole prompt.
    pub fn user_prompt(prompt: &str, with_role: bool) -> Self {
        Self {
            contents: vec![Content {
                role: with_role.then(|| "user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<Content>,
}

impl GenerateResponse {
    /// Text of the first candidate, with all of its parts concatenated.
    pub fn text(self) -> Result<String, LlmError> {
        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or(LlmError::EmptyCompletion)?;

        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        Ok(text)
    }
}

/// Turn a non-success response into `LlmError::Api`, keeping the provider's
/// own message when it sends one.
pub(crate) async fn check_response(resp: reqwest::Response) -> Result<GenerateResponse, LlmError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(body);
        return Err(LlmError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp.json().await?)
}
