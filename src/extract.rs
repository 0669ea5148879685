//! PDF text extraction.
//!
//! Turns a PDF byte stream into a single normalized text string: every
//! page's extracted text joined with a single space, then trimmed. Pages
//! with no extractable text (image-only or blank) contribute an empty
//! string rather than an error, so extraction only fails when the bytes
//! are not a valid PDF at all.

use crate::error::PipelineError;

/// Extract the full text of a PDF document.
///
/// # Errors
///
/// Returns [`PipelineError::Extraction`] if the bytes cannot be parsed
/// as a PDF.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, PipelineError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| PipelineError::Extraction(e.to_string()))?;
    Ok(join_pages(&pages))
}

/// Join per-page texts with a single-space separator and trim the result.
/// Empty pages stay in the join (harmless: the chunker splits on runs of
/// whitespace).
fn join_pages(pages: &[String]) -> String {
    pages.join(" ").trim().to_string()
}
