//! # pdfrag
//!
//! Retrieval-augmented question answering over a single PDF document.
//!
//! pdfrag extracts the text of an uploaded PDF, splits it into fixed-size
//! word-count chunks, embeds the chunks locally, and stores them in a
//! SQLite-backed vector collection. At question time it retrieves the
//! top-K most relevant chunks and grounds an answer from a remote
//! chat-completion service (Groq-compatible).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌─────────────────────┐   ┌──────────┐
//! │   PDF   │──▶│  Extract → Chunk →  │──▶│  SQLite   │
//! │  bytes  │   │  Embed              │   │  vectors  │
//! └─────────┘   └─────────────────────┘   └────┬─────┘
//!                                              │
//! ┌──────────┐   ┌─────────────────────┐       │
//! │ question │──▶│ Retrieve → Prompt → │◀──────┘
//! └──────────┘   │ Chat completion     │
//!                └─────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Pipeline error taxonomy |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Word-window chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | SQLite vector store |
//! | [`retrieve`] | Top-K chunk retrieval |
//! | [`llm`] | Prompt assembly and chat-completion call |
//! | [`session`] | Per-session orchestration and chat history |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod llm;
pub mod models;
pub mod retrieve;
pub mod session;
pub mod store;
