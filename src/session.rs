//! One user's chat with one document.
//!
//! A [`ChatSession`] holds the extracted document, the credential, the
//! model client bound to that credential, and the logs of every turn. The
//! server keeps one session per browser, so users never see each other's
//! documents, keys, or logs.

use crate::contract::PromptContract;
use crate::interpret::{interpret, ParsedReply};
use crate::llm::{ClientFactory, ModelClient};
use crate::pdf;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub const MSG_NO_FILE: &str = "Please upload a PDF file.";
pub const MSG_NO_KEY: &str = "Please provide your Gemini API key.";
pub const MSG_NO_TEXT: &str = "Failed to parse PDF or PDF contained no extractable text.";
pub const MSG_READY: &str =
    "PDF loaded and API key set. You can now ask questions about the document.";
pub const MSG_AWAITING_DOCUMENT: &str =
    "Please upload a PDF and set your API key before asking questions.";
pub const MSG_AWAITING_CREDENTIAL: &str =
    "API key is missing. Please upload a PDF and provide your key first.";
pub const MSG_CLIENT_MISSING: &str = "Gemini client is not initialised.";
pub const MSG_NO_LOGS: &str = "No logs available yet.";

/// Where a session is on its way to answering questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    AwaitingDocument,
    AwaitingCredential,
    Ready,
}

/// API key held in memory only. Never printed.
#[derive(Clone, Default)]
struct Credential(String);

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Credential(<unset>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

/// One question and the answer shown for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

/// Everything the chat view needs after a turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub history: Vec<ConversationTurn>,
    /// Always empty; clears the question box.
    pub input: String,
    /// Every raw reply so far, newline-joined.
    pub raw_stream: String,
}

#[derive(Serialize)]
struct SetupEvent {
    event: &'static str,
    message: &'static str,
}

/// Event log entry for one turn, in `user`, `answer` order.
#[derive(Serialize)]
struct TurnEvent<'a> {
    user: &'a str,
    answer: &'a str,
}

/// Lightweight description of a session for the API.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub stage: SessionStage,
    pub turns: usize,
    pub document_chars: usize,
}

pub struct ChatSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    contract: Arc<PromptContract>,
    document: String,
    credential: Credential,
    model: Option<Arc<dyn ModelClient>>,
    transcript: Vec<ConversationTurn>,
    raw_log: Vec<String>,
    parsed_log: Vec<ParsedReply>,
    event_log: Vec<String>,
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("stage", &self.stage())
            .field("credential", &self.credential)
            .field("document_chars", &self.document.len())
            .field("turns", &self.transcript.len())
            .finish()
    }
}

impl ChatSession {
    pub fn new(contract: Arc<PromptContract>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            contract,
            document: String::new(),
            credential: Credential::default(),
            model: None,
            transcript: Vec::new(),
            raw_log: Vec::new(),
            parsed_log: Vec::new(),
            event_log: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.transcript
    }

    pub fn event_log(&self) -> &[String] {
        &self.event_log
    }

    pub fn stage(&self) -> SessionStage {
        if self.document.is_empty() {
            SessionStage::AwaitingDocument
        } else if self.credential.0.is_empty() {
            SessionStage::AwaitingCredential
        } else {
            SessionStage::Ready
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            created_at: self.created_at,
            stage: self.stage(),
            turns: self.transcript.len(),
            document_chars: self.document.len(),
        }
    }

    /// Handle an upload: extract the PDF and bind a client to the key.
    ///
    /// Returns the status line shown under the upload controls. Each upload
    /// that reaches extraction replaces the document, even when nothing
    /// could be extracted.
    pub async fn setup(
        &mut self,
        file: Option<Vec<u8>>,
        api_key: &str,
        factory: &dyn ClientFactory,
    ) -> String {
        let Some(bytes) = file else {
            return MSG_NO_FILE.to_string();
        };
        if api_key.trim().is_empty() {
            return MSG_NO_KEY.to_string();
        }

        let extraction = tokio::task::spawn_blocking(move || pdf::extract_text(Some(bytes.as_slice())));
        let document = match extraction.await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(session = %self.id, error = %e, "PDF extraction task failed");
                format!("Error parsing PDF: {}", e)
            }
        };

        self.load_text(document, api_key, factory)
    }

    /// Install already-extracted text and bind a client to the key.
    ///
    /// The credential and its client are replaced together. If no client
    /// can be built for the key, both are cleared so the previous key is
    /// never used with the new document.
    pub fn load_text(&mut self, document: String, api_key: &str, factory: &dyn ClientFactory) -> String {
        self.document = document;
        if self.document.is_empty() {
            return MSG_NO_TEXT.to_string();
        }

        match factory.build(api_key) {
            Ok(client) => {
                self.credential = Credential(api_key.to_string());
                self.model = Some(client);
            }
            Err(e) => {
                self.credential = Credential::default();
                self.model = None;
                tracing::warn!(session = %self.id, error = %e, "Could not bind a client to the key");
                return e.to_string();
            }
        }

        self.log_event(&SetupEvent {
            event: "initialised",
            message: "Loaded PDF and API key",
        });
        tracing::info!(
            session = %self.id,
            document_chars = self.document.len(),
            binding = factory.binding().name(),
            "Session ready"
        );
        MSG_READY.to_string()
    }

    /// Run one turn and return the updated chat view.
    ///
    /// Never fails: missing setup, provider errors, and malformed replies
    /// all end up as a readable answer in the transcript.
    pub async fn ask(&mut self, question: &str) -> TurnOutcome {
        match self.stage() {
            SessionStage::AwaitingDocument => {
                return self.short_circuit(question, MSG_AWAITING_DOCUMENT)
            }
            SessionStage::AwaitingCredential => {
                return self.short_circuit(question, MSG_AWAITING_CREDENTIAL)
            }
            SessionStage::Ready => {}
        }

        let prompt = self.contract.compose(&self.document, question);
        tracing::debug!(session = %self.id, prompt_chars = prompt.len(), "Sending prompt");

        let output = match &self.model {
            Some(model) => match model.generate(&prompt).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(session = %self.id, error = %e, "Error calling Gemini API");
                    format!("Error calling Gemini API: {}", e)
                }
            },
            None => MSG_CLIENT_MISSING.to_string(),
        };

        let interpretation = interpret(&output);
        if !interpretation.parsed.is_structured() {
            tracing::warn!(session = %self.id, "Model reply was not a JSON object, keeping raw text");
        }

        let answer = interpretation.display_answer().to_string();
        self.raw_log.push(interpretation.text);
        self.parsed_log.push(interpretation.parsed);

        self.log_event(&TurnEvent {
            user: question,
            answer: &answer,
        });
        self.transcript.push(ConversationTurn {
            question: question.to_string(),
            answer,
        });

        self.outcome()
    }

    fn log_event(&mut self, event: &impl Serialize) {
        match serde_json::to_string(event) {
            Ok(line) => self.event_log.push(line),
            Err(e) => tracing::error!(session = %self.id, error = %e, "Could not encode log event"),
        }
    }

    fn short_circuit(&mut self, question: &str, message: &str) -> TurnOutcome {
        self.transcript.push(ConversationTurn {
            question: question.to_string(),
            answer: message.to_string(),
        });
        self.outcome()
    }

    fn outcome(&self) -> TurnOutcome {
        TurnOutcome {
            history: self.transcript.clone(),
            input: String::new(),
            raw_stream: self.raw_logs(),
        }
    }

    /// Parsed replies in turn order.
    pub fn structured_logs(&self) -> &[ParsedReply] {
        &self.parsed_log
    }

    /// Raw replies, newline-joined; empty when there are none.
    pub fn raw_logs(&self) -> String {
        self.raw_log.join("\n")
    }

    /// A log view that is never blank.
    pub fn fallback_log_view(&self) -> String {
        if !self.raw_log.is_empty() {
            self.raw_log.join("\n")
        } else if !self.event_log.is_empty() {
            self.event_log.join("\n")
        } else {
            MSG_NO_LOGS.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{MockFactory, RecordingClient};
    use crate::llm::LlmError;
    use serde_json::json;

    fn contract() -> Arc<PromptContract> {
        Arc::new(PromptContract::from_text("<contract>reply in JSON</contract>"))
    }

    fn ready_session(client: Arc<RecordingClient>) -> ChatSession {
        let mut session = ChatSession::new(contract());
        let factory = MockFactory::new(client);
        let status = session.load_text("Revenue was $5M.".to_string(), "AIza-test", factory.as_ref());
        assert_eq!(status, MSG_READY);
        session
    }

    #[tokio::test]
    async fn test_revenue_scenario() {
        let client = RecordingClient::replying(
            "```json\n{\"answer\": \"$5M\", \"evidence\": \"page 1\"}\n```",
        );
        let mut session = ready_session(client.clone());

        let outcome = session.ask("What was revenue?").await;

        assert_eq!(
            outcome.history,
            vec![ConversationTurn {
                question: "What was revenue?".to_string(),
                answer: "$5M".to_string(),
            }]
        );
        assert_eq!(outcome.input, "");
        assert_eq!(outcome.raw_stream, "{\"answer\": \"$5M\", \"evidence\": \"page 1\"}");
        assert_eq!(
            serde_json::to_value(session.structured_logs()).unwrap(),
            json!([{"answer": "$5M", "evidence": "page 1"}])
        );
    }

    #[tokio::test]
    async fn test_prompt_is_contract_document_question() {
        let client = RecordingClient::replying("{\"answer\": \"ok\"}");
        let mut session = ready_session(client.clone());

        session.ask("What was revenue?").await;

        assert_eq!(client.calls(), 1);
        let prompts = client.prompts.lock().unwrap();
        assert_eq!(
            prompts[0],
            "<contract>reply in JSON</contract>\nDocument contents:\nRevenue was $5M.\n\nWhat was revenue?"
        );
    }

    #[tokio::test]
    async fn test_ask_before_upload() {
        let client = RecordingClient::replying("{\"answer\": \"never\"}");
        let mut session = ChatSession::new(contract());

        let outcome = session.ask("Anything?").await;

        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.history[0].answer, MSG_AWAITING_DOCUMENT);
        assert_eq!(client.calls(), 0);
        assert!(session.structured_logs().is_empty());
        assert_eq!(session.raw_logs(), "");
        assert!(session.event_log().is_empty());
        assert_eq!(session.stage(), SessionStage::AwaitingDocument);
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_answer() {
        let client = RecordingClient::new(vec![Err("connection reset".to_string())]);
        let mut session = ready_session(client);

        let outcome = session.ask("What was revenue?").await;
        let answer = &outcome.history[0].answer;

        assert!(answer.starts_with("Error calling Gemini API:"), "got: {}", answer);
        assert!(answer.contains("connection reset"));
        assert_eq!(
            serde_json::to_value(&session.structured_logs()[0]).unwrap(),
            json!({"raw": answer})
        );
    }

    #[tokio::test]
    async fn test_non_json_reply_is_shown_verbatim() {
        let client = RecordingClient::replying("I could not find that in the document.");
        let mut session = ready_session(client);

        let outcome = session.ask("Who is the CEO?").await;

        assert_eq!(outcome.history[0].answer, "I could not find that in the document.");
        assert_eq!(
            serde_json::to_value(&session.structured_logs()[0]).unwrap(),
            json!({"raw": "I could not find that in the document."})
        );
    }

    #[tokio::test]
    async fn test_logs_stay_aligned_across_turns() {
        let client = RecordingClient::new(vec![
            Ok("{\"answer\": \"one\"}".to_string()),
            Err("timeout".to_string()),
            Ok("not json".to_string()),
            Ok("```json\n{\"reasoning\": \"no answer key\"}\n```".to_string()),
        ]);
        let mut session = ready_session(client.clone());

        for q in ["a", "b", "c", "d"] {
            session.ask(q).await;
        }

        assert_eq!(client.calls(), 4);
        assert_eq!(session.structured_logs().len(), 4);
        assert_eq!(session.raw_logs().lines().count(), 4);
        assert_eq!(session.transcript().len(), 4);
        // One entry for the upload, one per turn.
        assert_eq!(session.event_log().len(), 5);
        assert_eq!(session.transcript()[3].answer, "{\"reasoning\": \"no answer key\"}");
    }

    #[tokio::test]
    async fn test_event_log_entries() {
        let client = RecordingClient::replying("{\"answer\": \"über\"}");
        let mut session = ready_session(client);

        let initialised: serde_json::Value = serde_json::from_str(&session.fallback_log_view()).unwrap();
        assert_eq!(initialised, json!({"event": "initialised", "message": "Loaded PDF and API key"}));

        session.ask("Wer?").await;
        let turn: serde_json::Value = serde_json::from_str(&session.event_log()[1]).unwrap();
        assert_eq!(turn, json!({"user": "Wer?", "answer": "über"}));
        assert_eq!(session.event_log()[1], "{\"user\":\"Wer?\",\"answer\":\"über\"}");
        // Non-ASCII text is stored as-is, not escaped.
        assert!(session.event_log()[1].contains("über"));
        assert_eq!(session.fallback_log_view(), "{\"answer\": \"über\"}");
    }

    #[test]
    fn test_fallback_view_when_empty() {
        let session = ChatSession::new(contract());
        assert_eq!(session.fallback_log_view(), MSG_NO_LOGS);
        assert_eq!(session.raw_logs(), "");
    }

    #[tokio::test]
    async fn test_setup_validates_inputs() {
        let factory = MockFactory::new(RecordingClient::replying("{}"));
        let mut session = ChatSession::new(contract());

        assert_eq!(session.setup(None, "key", factory.as_ref()).await, MSG_NO_FILE);
        assert_eq!(session.setup(Some(b"%PDF".to_vec()), "", factory.as_ref()).await, MSG_NO_KEY);
        assert_eq!(session.setup(Some(b"%PDF".to_vec()), "  \t", factory.as_ref()).await, MSG_NO_KEY);
        assert!(factory.keys.lock().unwrap().is_empty());
        assert_eq!(session.stage(), SessionStage::AwaitingDocument);
    }

    #[test]
    fn test_empty_document_clears_previous_one() {
        let factory = MockFactory::new(RecordingClient::replying("{}"));
        let mut session = ChatSession::new(contract());
        session.load_text("first".to_string(), "key", factory.as_ref());
        assert_eq!(session.stage(), SessionStage::Ready);

        let status = session.load_text(String::new(), "key", factory.as_ref());
        assert_eq!(status, MSG_NO_TEXT);
        assert_eq!(session.stage(), SessionStage::AwaitingDocument);
    }

    #[tokio::test]
    #[cfg(feature = "pdf")]
    async fn test_setup_with_real_pdf() {
        let client = RecordingClient::replying("{\"answer\": \"5M\"}");
        let factory = MockFactory::new(client.clone());
        let mut session = ChatSession::new(contract());

        let pdf = crate::pdf::tests::minimal_pdf("Revenue was 5M.");
        let status = session.setup(Some(pdf), "AIza-test", factory.as_ref()).await;

        assert_eq!(status, MSG_READY);
        assert!(session.document().contains("Revenue"));
        assert_eq!(*factory.keys.lock().unwrap(), vec!["AIza-test".to_string()]);

        let outcome = session.ask("What was revenue?").await;
        assert_eq!(outcome.history[0].answer, "5M");
    }

    #[tokio::test]
    async fn test_blank_key_on_reupload_drops_previous_client() {
        let client = RecordingClient::replying("{\"answer\": \"from old key\"}");
        let factory = MockFactory::new(client.clone());
        let mut session = ChatSession::new(contract());
        assert_eq!(session.load_text("doc A".to_string(), "KEY-A", factory.as_ref()), MSG_READY);

        let status = session.load_text("doc B".to_string(), "   ", factory.as_ref());
        assert_eq!(status, LlmError::MissingApiKey.to_string());
        assert_eq!(session.stage(), SessionStage::AwaitingCredential);

        let outcome = session.ask("q").await;
        assert_eq!(outcome.history[0].answer, MSG_AWAITING_CREDENTIAL);
        assert_eq!(client.calls(), 0);
        assert_eq!(*factory.keys.lock().unwrap(), vec!["KEY-A".to_string()]);
    }

    #[tokio::test]
    async fn test_ask_without_credential() {
        let client = RecordingClient::replying("{\"answer\": \"never\"}");
        let mut session = ChatSession::new(contract());
        let model: Arc<dyn ModelClient> = client.clone();
        session.model = Some(model);
        session.document = "Revenue was $5M.".to_string();
        assert_eq!(session.stage(), SessionStage::AwaitingCredential);

        let outcome = session.ask("What was revenue?").await;

        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.history[0].answer, MSG_AWAITING_CREDENTIAL);
        assert_eq!(client.calls(), 0);
        assert!(session.structured_logs().is_empty());
        assert!(session.event_log().is_empty());
    }

    #[test]
    fn test_credential_is_redacted() {
        let factory = MockFactory::new(RecordingClient::replying("{}"));
        let mut session = ChatSession::new(contract());
        session.load_text("doc".to_string(), "AIza-secret", factory.as_ref());

        let debug = format!("{:?}", session);
        assert!(!debug.contains("AIza-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
