//! The reasoning contract.
//!
//! A text template, loaded once at start-up, that tells the model how to
//! reason and which JSON shape to answer in. It always goes first in the
//! prompt because its format rules apply to everything after it.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the contract shipped next to the binary.
pub const DEFAULT_CONTRACT_FILE: &str = "universal_v4_contract.xml";

/// Header placed in front of the document text in every prompt.
pub const DOCUMENT_HEADER: &str = "Document contents:\n";

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Prompt contract file not found at {0}")]
    NotFound(PathBuf),
    #[error("Failed to read prompt contract at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct PromptContract {
    text: String,
    path: PathBuf,
}

impl PromptContract {
    /// Load the contract. A missing file is fatal for the caller.
    pub fn load(path: &Path) -> Result<Self, ContractError> {
        let path = resolve(path).ok_or_else(|| ContractError::NotFound(path.to_path_buf()))?;
        let text = std::fs::read_to_string(&path).map_err(|source| ContractError::Unreadable {
            path: path.clone(),
            source,
        })?;

        tracing::info!(path = %path.display(), chars = text.len(), "Loaded prompt contract");
        Ok(Self { text, path })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            path: PathBuf::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build the outgoing prompt: contract, then document, then question.
    pub fn compose(&self, document: &str, question: &str) -> String {
        let document_context = format!("{}{}\n", DOCUMENT_HEADER, document);
        [self.text.as_str(), document_context.as_str(), question].join("\n")
    }
}

/// Relative paths are tried against the working directory first, then the
/// directory holding the executable.
fn resolve(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    if path.is_absolute() {
        return None;
    }
    let exe_dir = std::env::current_exe().ok()?.parent()?.to_path_buf();
    let candidate = exe_dir.join(path);
    candidate.is_file().then_some(candidate)
}
