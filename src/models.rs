//! Core data models used throughout the pipeline.
//!
//! These types represent the chunks and chat turns that flow through the
//! ingestion and question-answering pipeline.

/// A fixed-size slice of a document's words, addressed by a deterministic
/// ordinal-derived identifier (`chunk_<ordinal>`). The stable id makes
/// re-uploads idempotent: the same ordinal always maps to the same id.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub ordinal: i64,
    pub text: String,
}

/// One question/answer exchange in a session's append-only chat history.
/// A turn is recorded only after a successful answer.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}
