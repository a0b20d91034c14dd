//! pdf-chat: ask questions about a PDF with Gemini.
//!
//! The document text is sent together with a reasoning contract on every
//! turn; the model's JSON reply is interpreted so the chat shows only the
//! answer while the full replies stay available in the logs.

pub mod config;
pub mod contract;
pub mod interpret;
pub mod llm;
pub mod pdf;
pub mod server;
pub mod session;

pub use config::Config;
pub use contract::{ContractError, PromptContract};
pub use interpret::{interpret, strip_code_fence, Interpretation, ParsedReply};
pub use llm::{ClientFactory, GeminiClientFactory, LlmError, ModelBinding, ModelClient};
pub use session::{ChatSession, ConversationTurn, SessionStage, TurnOutcome};
