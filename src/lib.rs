//! Svar - Grounded Question Answering
//!
//! Answers natural-language questions grounded in a previously indexed
//! library of transcribed spoken content, falling back to live web search
//! when the indexed corpus is insufficient, and optionally rendering answers
//! as synthesized speech.
//!
//! The name "Svar" comes from the Norwegian/Scandinavian word for "answer."
//!
//! # Overview
//!
//! For each question the workflow:
//! - retrieves relevant passages from the vector index
//! - evaluates whether that evidence is sufficient to answer
//! - falls back to web search when it is not
//! - synthesizes a grounded answer with citations and a confidence score
//! - optionally renders the answer as speech, on demand
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `conversation` - Caller-owned conversation history
//! - `evidence` - Evidence items and sets shared by both retrieval paths
//! - `retrieval` - Vector index capability and evidence retriever
//! - `evaluate` - Sufficiency evaluation
//! - `search` - Web search fallback
//! - `synthesis` - Grounded answer generation
//! - `speech` - Speech rendering for produced answers
//! - `workflow` - The per-query state machine tying it all together
//!
//! # Example
//!
//! ```rust,no_run
//! use svar::config::Settings;
//! use svar::conversation::ConversationHistory;
//! use svar::workflow::{Query, Workflow};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let workflow = Workflow::new(&settings)?;
//!
//!     let history = ConversationHistory::new();
//!     let answer = workflow
//!         .ask(Query::new("What is the playlist about?"), &history)
//!         .await?;
//!     println!("{} (confidence {:.2})", answer.text, answer.confidence);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod evaluate;
pub mod evidence;
pub mod llm;
pub mod openai;
pub mod retrieval;
pub mod search;
pub mod speech;
pub mod synthesis;
pub mod workflow;

pub use error::{Result, SvarError};
