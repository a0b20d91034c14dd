//! Stand-in client for builds without any Gemini binding.

use super::provider::{ModelBinding, ModelClient};
use super::types::LlmError;
use async_trait::async_trait;

pub const UNAVAILABLE_MESSAGE: &str = "No Gemini API binding is compiled into this build. \
Rebuild with the `genai` or `generativeai` feature to enable Gemini API calls.";

/// Answers every prompt with [`UNAVAILABLE_MESSAGE`].
///
/// The message reaches the chat exactly like a model reply would.
pub struct UnavailableClient {
    model: String,
}

impl UnavailableClient {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ModelClient for UnavailableClient {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok(UNAVAILABLE_MESSAGE.to_string())
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn binding(&self) -> ModelBinding {
        ModelBinding::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_explains_itself() {
        let client = UnavailableClient::new("gemini-2.5-flash");
        let reply = client.generate("anything").await.unwrap();
        assert_eq!(reply, UNAVAILABLE_MESSAGE);
    }
}
