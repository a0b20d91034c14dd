//! Model layer: everything that talks to Gemini.
//!
//! - Provider abstraction and binding selection
//! - The two Gemini bindings plus a stand-in when neither is compiled in

pub mod provider;
pub mod stub;
pub mod types;

#[cfg(feature = "genai")]
pub mod genai;
#[cfg(feature = "generativeai")]
pub mod generativeai;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types
pub use provider::{
    build_model_client, ClientFactory, GeminiClientFactory, ModelBinding, ModelClient, DEFAULT_MODEL,
};
pub use types::LlmError;
