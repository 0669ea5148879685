//! End-to-end pipeline tests through the library API.
//!
//! Uses a deterministic stub embedder and a stub chat client so the full
//! ingest → retrieve → answer flow runs against a real SQLite store with
//! no model download and no network.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use pdfrag::config::Config;
use pdfrag::embedding::Embedder;
use pdfrag::error::PipelineError;
use pdfrag::llm::ChatClient;
use pdfrag::session::Session;
use pdfrag::store::Store;

/// Bag-of-letters embedding: deterministic, and identical texts always
/// score cosine 1.0 against each other.
struct StubEmbedder;

fn stub_vec(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 8];
    for c in text.chars() {
        v[(c as usize) % 8] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn model_name(&self) -> &str {
        "stub"
    }
    fn dims(&self) -> usize {
        8
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| stub_vec(t)).collect())
    }
}

/// Echoes the prompt back so tests can inspect what would go upstream.
struct EchoClient {
    prompts: Mutex<Vec<String>>,
}

impl EchoClient {
    fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatClient for EchoClient {
    async fn complete(
        &self,
        _api_key: &str,
        _model: &str,
        prompt: &str,
    ) -> Result<String, PipelineError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(format!("answered from {} chars of prompt", prompt.len()))
    }
}

async fn fresh_session(tmp: &TempDir, chat: Arc<dyn ChatClient>, chunk_size: usize) -> Session {
    let mut config = Config::default();
    config.store.path = tmp.path().join("pipeline.sqlite");
    config.chunking.size = chunk_size;
    let store = Store::open(&config.store.path).await.unwrap();
    Session::new(config, store, Arc::new(StubEmbedder), chat)
}

fn numbered_words(n: usize) -> String {
    (0..n)
        .map(|i| format!("word{}", i))
        .collect::<Vec<_>>()
        .join(" ")
}

#[tokio::test]
async fn five_hundred_words_make_exactly_one_chunk() {
    let tmp = TempDir::new().unwrap();
    let mut session = fresh_session(&tmp, Arc::new(EchoClient::new()), 500).await;

    let report = session.process_text(&numbered_words(500)).await.unwrap();
    assert_eq!(report.chunks, 1);
    assert_eq!(report.words, 500);
}

#[tokio::test]
async fn thousand_and_one_words_make_three_chunks() {
    let tmp = TempDir::new().unwrap();
    let mut session = fresh_session(&tmp, Arc::new(EchoClient::new()), 500).await;

    let report = session.process_text(&numbered_words(1001)).await.unwrap();
    assert_eq!(report.chunks, 3);
}

#[tokio::test]
async fn answer_is_grounded_in_the_most_relevant_chunk() {
    let tmp = TempDir::new().unwrap();
    let chat = Arc::new(EchoClient::new());
    // Chunk size 3 splits the document into three chunks with distinct
    // letter distributions.
    let mut session = fresh_session(&tmp, chat.clone(), 3).await;

    session
        .process_text("aaaa aaaa aaaa bbbb bbbb bbbb cccc cccc cccc")
        .await
        .unwrap();

    let answer = session.ask("aaaa aaaa aaaa", "key", "m", 1).await.unwrap();
    assert!(answer.text.starts_with("answered from"));

    // Only the matching chunk made it into the grounded context.
    let prompts = chat.prompts.lock().unwrap();
    assert!(prompts[0].contains("aaaa aaaa aaaa"));
    assert!(!prompts[0].contains("bbbb"));
    assert!(prompts[0].ends_with("Question: aaaa aaaa aaaa"));
}

#[tokio::test]
async fn chat_history_accumulates_in_order() {
    let tmp = TempDir::new().unwrap();
    let mut session = fresh_session(&tmp, Arc::new(EchoClient::new()), 500).await;
    session.process_text(&numbered_words(50)).await.unwrap();

    session.ask("first question", "key", "m", 2).await.unwrap();
    session.ask("second question", "key", "m", 2).await.unwrap();
    session.ask("third question", "key", "m", 2).await.unwrap();

    let history = session.history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].question, "first question");
    assert_eq!(history[2].question, "third question");
}

#[tokio::test]
async fn reingest_changes_what_grounds_the_answers() {
    let tmp = TempDir::new().unwrap();
    let chat = Arc::new(EchoClient::new());
    let mut session = fresh_session(&tmp, chat.clone(), 500).await;

    session.process_text("oldword oldword oldword").await.unwrap();
    session.ask("q1", "key", "m", 2).await.unwrap();

    session.process_text("newword newword newword").await.unwrap();
    session.ask("q2", "key", "m", 2).await.unwrap();

    let prompts = chat.prompts.lock().unwrap();
    assert!(prompts[0].contains("oldword"));
    assert!(prompts[1].contains("newword"));
    assert!(!prompts[1].contains("oldword"));
}

#[tokio::test]
async fn retrieval_never_exceeds_top_k_or_collection_size() {
    let tmp = TempDir::new().unwrap();
    let chat = Arc::new(EchoClient::new());
    let mut session = fresh_session(&tmp, chat.clone(), 500).await;

    // One chunk stored, top_k of 5: the grounded context is that single chunk.
    session.process_text("only chunk here").await.unwrap();
    session.ask("anything", "key", "m", 5).await.unwrap();

    let prompts = chat.prompts.lock().unwrap();
    let context = prompts[0]
        .strip_prefix("Answer the question using only this context:\n\n")
        .unwrap();
    let context = context.strip_suffix("\n\nQuestion: anything").unwrap();
    assert_eq!(context, "only chunk here");
}
