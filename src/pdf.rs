//! PDF text extraction.
//!
//! Extraction never fails from the caller's point of view: every problem is
//! reported as a readable string in place of the document text. An empty
//! string means "nothing uploaded", not "empty document".

use std::path::Path;

/// Returned when the binary was built without the `pdf` feature.
///
/// Downstream code cannot tell this apart from real document text.
pub const PDF_UNSUPPORTED_MESSAGE: &str = "PDF support is not compiled into this build. \
Rebuild with the `pdf` feature to enable PDF parsing.";

/// Whether this build can parse PDFs at all.
pub fn pdf_supported() -> bool {
    cfg!(feature = "pdf")
}

/// Extract the text of every page, one trailing newline per page.
pub fn extract_text(file: Option<&[u8]>) -> String {
    let Some(bytes) = file else {
        return String::new();
    };

    match extract_pages(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Error parsing PDF");
            format!("Error parsing PDF: {}", e)
        }
    }
}

/// Read a PDF from disk and extract it. Used by the CLI.
pub fn extract_file(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => extract_text(Some(bytes.as_slice())),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Error reading PDF");
            format!("Error parsing PDF: {}", e)
        }
    }
}

#[cfg(feature = "pdf")]
fn extract_pages(bytes: &[u8]) -> anyhow::Result<String> {
    // pdf_oxide opens documents by path, so spool the upload to a temp file
    let temp_path = std::env::temp_dir().join(format!("pdf_chat_{}.pdf", uuid::Uuid::new_v4()));
    std::fs::write(&temp_path, bytes)
        .map_err(|e| anyhow::anyhow!("Failed to write temp PDF: {}", e))?;

    let result = extract_pages_from_path(&temp_path);

    let _ = std::fs::remove_file(&temp_path);

    result
}

#[cfg(feature = "pdf")]
fn extract_pages_from_path(path: &Path) -> anyhow::Result<String> {
    let mut doc = pdf_oxide::PdfDocument::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open PDF: {}", e))?;

    let page_count = doc
        .page_count()
        .map_err(|e| anyhow::anyhow!("Failed to get page count: {}", e))?;

    let mut text = String::new();
    for page_idx in 0..page_count {
        let page_text = doc
            .extract_text(page_idx)
            .map_err(|e| anyhow::anyhow!("Failed to extract page {}: {}", page_idx + 1, e))?;
        text.push_str(&page_text);
        text.push('\n');
    }

    tracing::debug!(pages = page_count, chars = text.len(), "Extracted PDF text");
    Ok(text)
}

#[cfg(not(feature = "pdf"))]
fn extract_pages(_bytes: &[u8]) -> anyhow::Result<String> {
    Ok(PDF_UNSUPPORTED_MESSAGE.to_string())
}
