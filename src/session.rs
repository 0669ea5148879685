//! Session-scoped orchestration.
//!
//! A [`Session`] owns the mutable per-user state: the handle to the
//! current collection (set once a document has been processed) and the
//! append-only chat history. Both dependencies with heavyweight setup —
//! the embedder and the chat client — are injected, so sessions are
//! independent of each other and testable with stubs.
//!
//! Operations run one at a time to completion; there is no background
//! work and no cancellation. An ingest failure leaves the previously
//! stored collection untouched; a question failure leaves history and
//! collection intact.

use anyhow::Result;
use std::sync::Arc;

use crate::chunk::chunk_document;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::PipelineError;
use crate::extract::extract_pdf_text;
use crate::llm::{build_prompt, ChatClient};
use crate::models::ChatTurn;
use crate::retrieve::retrieve;
use crate::store::{Collection, Store};

/// Summary of a completed document ingest.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub words: usize,
    pub chunks: usize,
}

/// A successful answer. `truncated` signals that the grounded prompt was
/// cut to the configured ceiling before being sent upstream.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub truncated: bool,
}

pub struct Session {
    config: Config,
    store: Store,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatClient>,
    collection: Option<Collection>,
    history: Vec<ChatTurn>,
}

impl Session {
    pub fn new(
        config: Config,
        store: Store,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            config,
            store,
            embedder,
            chat,
            collection: None,
            history: Vec::new(),
        }
    }

    /// The ordered chat history of this session. Append-only; a turn is
    /// recorded only when an answer succeeded.
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Whether a document is available for questions.
    pub fn is_ready(&self) -> bool {
        self.collection.is_some()
    }

    /// Attach to a collection left behind by an earlier process, if it
    /// holds any chunks. Lets `ask` work in a fresh process after a
    /// previous ingest.
    pub async fn attach_existing(&mut self) -> Result<()> {
        self.store.init_schema().await?;
        let collection = self.store.collection(&self.config.store.collection).await?;
        if collection.count().await? > 0 {
            self.collection = Some(collection);
        }
        Ok(())
    }

    /// Process an uploaded PDF: extract → chunk → embed → store.
    ///
    /// The collection is cleared and rewritten in one transaction, so it
    /// reflects only the latest document and a failure anywhere leaves
    /// the previous contents in place.
    pub async fn process_document(&mut self, bytes: &[u8]) -> Result<IngestReport> {
        let text = extract_pdf_text(bytes)?;
        self.process_text(&text).await
    }

    /// Ingest already-extracted text. Entry point for non-PDF callers.
    pub async fn process_text(&mut self, text: &str) -> Result<IngestReport> {
        let chunks = chunk_document(text, self.config.chunking.size)?;
        let words = text.split_whitespace().count();

        self.store.init_schema().await?;
        let collection = self.store.collection(&self.config.store.collection).await?;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed(&texts).await?
        };
        let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();

        collection.replace(&ids, &texts, &embeddings).await?;
        self.collection = Some(collection);

        Ok(IngestReport {
            words,
            chunks: chunks.len(),
        })
    }

    /// Answer a question grounded in the current document.
    ///
    /// Fails with [`PipelineError::NotReady`] when no document has been
    /// processed, and with [`PipelineError::Upstream`] when the model
    /// call fails; neither failure appends to the chat history.
    pub async fn ask(
        &mut self,
        question: &str,
        api_key: &str,
        model: &str,
        top_k: usize,
    ) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(PipelineError::InvalidArgument("empty question".to_string()).into());
        }
        let collection = match &self.collection {
            Some(c) => c,
            None => return Err(PipelineError::NotReady.into()),
        };

        let context = retrieve(self.embedder.as_ref(), collection, question, top_k).await?;
        let prompt = build_prompt(&context, question, self.config.llm.max_input_chars);
        let text = self.chat.complete(api_key, model, &prompt.text).await?;

        self.history.push(ChatTurn {
            question: question.to_string(),
            answer: text.clone(),
        });

        Ok(Answer {
            text,
            truncated: prompt.truncated,
        })
    }
}
