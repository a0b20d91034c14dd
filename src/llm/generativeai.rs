//! Older Gemini binding (`v1` generateContent, key as query parameter).

use super::provider::{ModelBinding, ModelClient};
use super::types::{check_response, GenerateRequest, LlmError};
use async_trait::async_trait;
use reqwest::Client;

pub struct GenerativeAiClient {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GenerativeAiClient {
    pub fn new(api_key: &str, model: &str, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ModelClient for GenerativeAiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/models/{}:generateContent", self.api_base, self.model);
        let request = GenerateRequest::user_prompt(prompt, false);

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        check_response(response).await?.text()
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn binding(&self) -> ModelBinding {
        ModelBinding::GenerativeAi
    }
}
