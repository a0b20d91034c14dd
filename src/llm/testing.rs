//! Test doubles for the model layer.

use super::provider::{ClientFactory, ModelBinding, ModelClient};
use super::types::LlmError;
use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What the mock Gemini server answers with.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Error(u16, String),
}

/// One request as the mock server saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub query_key: Option<String>,
    pub api_key_header: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct MockState {
    reply: MockReply,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

pub struct GeminiMock {
    pub base_url: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl GeminiMock {
    pub async fn last_request(&self) -> Option<SeenRequest> {
        self.seen.lock().unwrap().last().cloned()
    }
}

/// Serve a canned generateContent reply on a random local port.
pub async fn spawn_gemini_mock(reply: MockReply) -> GeminiMock {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        reply,
        seen: Arc::clone(&seen),
    };
    let app = Router::new().fallback(handle).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    GeminiMock {
        base_url: format!("http://{}", addr),
        seen,
    }
}

async fn handle(State(state): State<MockState>, uri: Uri, headers: HeaderMap, body: String) -> Response {
    let query_key = uri.query().and_then(|q| {
        q.split('&')
            .find_map(|pair| pair.strip_prefix("key=").map(str::to_string))
    });
    state.seen.lock().unwrap().push(SeenRequest {
        path: uri.path().to_string(),
        query_key,
        api_key_header: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(serde_json::Value::Null),
    });

    match state.reply {
        MockReply::Text(text) => Json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        }))
        .into_response(),
        MockReply::Error(status, message) => (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({"error": {"code": status, "message": message}})),
        )
            .into_response(),
    }
}

/// Client that records every prompt and plays back scripted replies.
///
/// `Err` entries become provider failures. When the script runs out the
/// last reply is repeated.
pub struct RecordingClient {
    script: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingClient {
    pub fn new(script: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for RecordingClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let next = self.script.lock().unwrap().pop_front();
        let reply = match next {
            Some(reply) => {
                *self.last.lock().unwrap() = Some(reply.clone());
                reply
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Ok(String::new())),
        };

        reply.map_err(|message| LlmError::Api {
            status: 503,
            message,
        })
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }

    fn binding(&self) -> ModelBinding {
        ModelBinding::Unavailable
    }
}

/// Factory that hands out the same recording client for every key.
pub struct MockFactory {
    pub client: Arc<RecordingClient>,
    pub keys: Mutex<Vec<String>>,
}

impl MockFactory {
    pub fn new(client: Arc<RecordingClient>) -> Arc<Self> {
        Arc::new(Self {
            client,
            keys: Mutex::new(Vec::new()),
        })
    }
}

impl ClientFactory for MockFactory {
    fn build(&self, api_key: &str) -> Result<Arc<dyn ModelClient>, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        self.keys.lock().unwrap().push(api_key.to_string());
        let client: Arc<dyn ModelClient> = self.client.clone();
        Ok(client)
    }

    fn binding(&self) -> ModelBinding {
        ModelBinding::Unavailable
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}
