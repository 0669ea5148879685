//! # pdfrag CLI
//!
//! Command-line interface for the PDF question-answering pipeline.
//!
//! ## Usage
//!
//! ```bash
//! pdfrag --config ./config/pdfrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfrag init` | Create the SQLite database and schema |
//! | `pdfrag ingest <file.pdf>` | Extract, chunk, embed, and store a PDF |
//! | `pdfrag ask "<question>"` | Answer one question grounded in the stored document |
//! | `pdfrag chat` | Interactive question loop with session chat history |
//!
//! The Groq API key is read from `--api-key` or the `GROQ_API_KEY`
//! environment variable and passed through opaquely.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use pdfrag::config::{self, Config};
use pdfrag::embedding::create_embedder;
use pdfrag::llm::{GroqClient, ALLOWED_MODELS};
use pdfrag::session::Session;
use pdfrag::store::Store;

/// pdfrag — retrieval-augmented question answering over a single PDF.
#[derive(Parser)]
#[command(
    name = "pdfrag",
    about = "Retrieval-augmented question answering over a single PDF document",
    version,
    long_about = "pdfrag extracts the text of a PDF, chunks and embeds it into a local \
    SQLite vector store, and answers questions grounded in the most relevant chunks \
    via a Groq-compatible chat-completion endpoint."
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults are used when the file
    /// does not exist.
    #[arg(long, global = true, default_value = "./config/pdfrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the collections/chunks tables.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Process a PDF document.
    ///
    /// Extracts the text, chunks it into fixed-size word windows, embeds
    /// every chunk, and rewrites the collection so it holds only this
    /// document's chunks.
    Ingest {
        /// Path to the PDF file.
        file: PathBuf,
    },

    /// Ask a single question about the stored document.
    Ask {
        /// The question text.
        question: String,

        /// Chat model to use. Must be on the allow-list.
        #[arg(long)]
        model: Option<String>,

        /// Number of chunks retrieved to ground the answer.
        #[arg(long)]
        top_k: Option<usize>,

        /// Groq API key (falls back to the GROQ_API_KEY environment variable).
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Interactive question loop.
    ///
    /// Keeps the session chat history for the life of the process. Type
    /// `history` to print it, `exit` or `quit` to leave.
    Chat {
        /// Chat model to use. Must be on the allow-list.
        #[arg(long)]
        model: Option<String>,

        /// Number of chunks retrieved to ground each answer.
        #[arg(long)]
        top_k: Option<usize>,

        /// Groq API key (falls back to the GROQ_API_KEY environment variable).
        #[arg(long)]
        api_key: Option<String>,
    },
}

fn resolve_api_key(flag: Option<String>) -> Result<String> {
    if let Some(key) = flag {
        return Ok(key);
    }
    match std::env::var("GROQ_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!("No API key. Pass --api-key or set GROQ_API_KEY."),
    }
}

fn load_config_or_default(path: &PathBuf) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        Ok(Config::default())
    }
}

async fn build_session(config: &Config) -> Result<Session> {
    let store = Store::open(&config.store.path).await?;
    let embedder = create_embedder(&config.embedding)?;
    let chat = Arc::new(GroqClient::new(&config.llm)?);
    Ok(Session::new(config.clone(), store, embedder, chat))
}

async fn run_ingest(config: &Config, file: &PathBuf) -> Result<()> {
    let bytes = std::fs::read(file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;

    let mut session = build_session(config).await?;
    let report = session.process_document(&bytes).await?;

    println!("ingest {}", file.display());
    println!("  words extracted: {}", report.words);
    println!("  chunks written: {}", report.chunks);
    println!("  collection: {}", config.store.collection);
    println!("ok");
    Ok(())
}

async fn run_ask(
    config: &Config,
    question: &str,
    model: Option<String>,
    top_k: Option<usize>,
    api_key: Option<String>,
) -> Result<()> {
    let api_key = resolve_api_key(api_key)?;
    let model = model.unwrap_or_else(|| config.llm.model.clone());
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let mut session = build_session(config).await?;
    session.attach_existing().await?;
    if !session.is_ready() {
        bail!("No document has been processed yet. Run `pdfrag ingest <file.pdf>` first.");
    }

    let answer = session.ask(question, &api_key, &model, top_k).await?;
    if answer.truncated {
        eprintln!("Warning: prompt truncated to fit the input limit.");
    }
    println!("{}", answer.text);
    Ok(())
}

async fn run_chat(
    config: &Config,
    model: Option<String>,
    top_k: Option<usize>,
    api_key: Option<String>,
) -> Result<()> {
    let api_key = resolve_api_key(api_key)?;
    let model = model.unwrap_or_else(|| config.llm.model.clone());
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let mut session = build_session(config).await?;
    session.attach_existing().await?;
    if !session.is_ready() {
        bail!("No document has been processed yet. Run `pdfrag ingest <file.pdf>` first.");
    }

    println!("Ask questions about the document ({}).", model);
    println!("Type `history` to show past turns, `exit` to leave.");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            "" => continue,
            "exit" | "quit" => break,
            "history" => {
                for (i, turn) in session.history().iter().enumerate() {
                    println!("Q{}: {}", i + 1, turn.question);
                    println!("A{}: {}", i + 1, turn.answer);
                }
                continue;
            }
            _ => {}
        }

        // A failed question aborts only this turn; the session stays usable.
        match session.ask(line, &api_key, &model, top_k).await {
            Ok(answer) => {
                if answer.truncated {
                    eprintln!("Warning: prompt truncated to fit the input limit.");
                }
                println!("{}", answer.text);
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = Store::open(&config.store.path).await?;
            store.init_schema().await?;
            store.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { file } => {
            run_ingest(&config, &file).await?;
        }
        Commands::Ask {
            question,
            model,
            top_k,
            api_key,
        } => {
            if let Some(ref m) = model {
                if !ALLOWED_MODELS.contains(&m.as_str()) {
                    bail!("Unknown model '{}'. Allowed: {}", m, ALLOWED_MODELS.join(", "));
                }
            }
            run_ask(&config, &question, model, top_k, api_key).await?;
        }
        Commands::Chat {
            model,
            top_k,
            api_key,
        } => {
            if let Some(ref m) = model {
                if !ALLOWED_MODELS.contains(&m.as_str()) {
                    bail!("Unknown model '{}'. Allowed: {}", m, ALLOWED_MODELS.join(", "));
                }
            }
            run_chat(&config, model, top_k, api_key).await?;
        }
    }

    Ok(())
}
