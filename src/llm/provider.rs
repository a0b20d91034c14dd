//! The model client abstraction.
//!
//! Every binding answers one prompt with one completion. Which binding is
//! used is decided once at start-up by [`ModelBinding::probe`] and then
//! injected wherever a client is built.

use super::types::LlmError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Model used for every turn unless the config says otherwise.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Root of the public Gemini API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Which Gemini binding backs the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBinding {
    /// Newer `v1beta` client, key sent as a header.
    GenAi,
    /// Older `v1` client, key sent as a query parameter.
    GenerativeAi,
    /// No binding compiled in; answers with an explanation instead.
    Unavailable,
}

impl ModelBinding {
    /// Pick the best binding this build supports, preferring the newer one.
    pub fn probe() -> Self {
        if cfg!(feature = "genai") {
            Self::GenAi
        } else if cfg!(feature = "generativeai") {
            Self::GenerativeAi
        } else {
            Self::Unavailable
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GenAi => "genai",
            Self::GenerativeAi => "generativeai",
            Self::Unavailable => "unavailable",
        }
    }
}

/// The core trait for model calls.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one prompt and return the raw completion text.
    ///
    /// Transport and provider errors are returned, never swallowed.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    fn model_id(&self) -> &str;

    fn binding(&self) -> ModelBinding;
}

/// Builds a client once the user supplies a credential.
pub trait ClientFactory: Send + Sync {
    /// Fails only when the key is empty; a missing binding degrades to the
    /// stub client.
    fn build(&self, api_key: &str) -> Result<Arc<dyn ModelClient>, LlmError>;

    fn binding(&self) -> ModelBinding;

    fn model_id(&self) -> &str;
}

/// Gemini client settings, everything except the credential.
#[derive(Debug, Clone)]
pub struct GeminiClientFactory {
    pub binding: ModelBinding,
    pub model: String,
    pub api_base: String,
}

impl GeminiClientFactory {
    pub fn new(binding: ModelBinding, model: impl Into<String>, api_base: Option<String>) -> Self {
        Self {
            binding,
            model: model.into(),
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        }
    }
}

impl ClientFactory for GeminiClientFactory {
    fn build(&self, api_key: &str) -> Result<Arc<dyn ModelClient>, LlmError> {
        build_model_client(self.binding, api_key, &self.model, &self.api_base)
    }

    fn binding(&self) -> ModelBinding {
        self.binding
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

impl Default for GeminiClientFactory {
    fn default() -> Self {
        Self::new(ModelBinding::probe(), DEFAULT_MODEL, None)
    }
}

pub fn build_model_client(
    binding: ModelBinding,
    api_key: &str,
    model: &str,
    api_base: &str,
) -> Result<Arc<dyn ModelClient>, LlmError> {
    if api_key.trim().is_empty() {
        return Err(LlmError::MissingApiKey);
    }

    let client: Arc<dyn ModelClient> = match binding {
        #[cfg(feature = "genai")]
        ModelBinding::GenAi => Arc::new(super::genai::GenAiClient::new(api_key, model, api_base)),
        #[cfg(feature = "generativeai")]
        ModelBinding::GenerativeAi => Arc::new(super::generativeai::GenerativeAiClient::new(
            api_key, model, api_base,
        )),
        ModelBinding::Unavailable => Arc::new(super::stub::UnavailableClient::new(model)),
        #[allow(unreachable_patterns)]
        other => {
            tracing::warn!(
                binding = other.name(),
                "Binding was not compiled in, falling back to the unavailable client"
            );
            Arc::new(super::stub::UnavailableClient::new(model))
        }
    };
    Ok(client)
}
