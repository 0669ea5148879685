//! Pipeline error taxonomy.
//!
//! Upload-time errors ([`PipelineError::Extraction`], [`PipelineError::InvalidArgument`],
//! store contract violations) abort the current ingest without touching any
//! previously stored collection. Query-time errors ([`PipelineError::NotReady`],
//! [`PipelineError::Upstream`]) abort only the current question, leaving chat
//! history and the collection intact. Nothing here retries automatically.

/// Error taxonomy for the extract → chunk → embed → store → answer pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// The byte stream is not a valid document of the expected format.
    Extraction(String),
    /// Bad chunk size, unknown model, empty required input.
    InvalidArgument(String),
    /// An embedding's length disagrees with the collection's established
    /// dimensionality.
    DimensionMismatch { expected: usize, got: usize },
    /// The three upsert input sequences differ in length.
    LengthMismatch {
        ids: usize,
        documents: usize,
        embeddings: usize,
    },
    /// A question was asked before any document was processed.
    NotReady,
    /// The language-model call failed: non-2xx status (with the status code
    /// and response body) or a network-level failure (`status: None`).
    Upstream { status: Option<u16>, detail: String },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Extraction(e) => write!(f, "PDF extraction failed: {}", e),
            PipelineError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            PipelineError::DimensionMismatch { expected, got } => write!(
                f,
                "embedding dimension mismatch: collection expects {}, got {}",
                expected, got
            ),
            PipelineError::LengthMismatch {
                ids,
                documents,
                embeddings,
            } => write!(
                f,
                "upsert length mismatch: {} ids, {} documents, {} embeddings",
                ids, documents, embeddings
            ),
            PipelineError::NotReady => {
                write!(f, "no document has been processed yet")
            }
            PipelineError::Upstream { status, detail } => match status {
                Some(code) => write!(f, "upstream API error {}: {}", code, detail),
                None => write!(f, "upstream request failed: {}", detail),
            },
        }
    }
}

impl std::error::Error for PipelineError {}
