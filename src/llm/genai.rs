//! Newer Gemini binding (`v1beta` generateContent).

use super::provider::{ModelBinding, ModelClient};
use super::types::{check_response, GenerateRequest, LlmError};
use async_trait::async_trait;
use reqwest::Client;

pub struct GenAiClient {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GenAiClient {
    pub fn new(api_key: &str, model: &str, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl ModelClient for GenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateRequest::user_prompt(prompt, true);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        check_response(response).await?.text()
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn binding(&self) -> ModelBinding {
        ModelBinding::GenAi
    }
}
