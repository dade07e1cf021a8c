//! # Policy RAG
//!
//! A small retrieval-augmented assistant over a directory of plain-text
//! policy documents.
//!
//! Documents are split into overlapping character windows, embedded, and
//! held in a vector store. A question is embedded the same way, the nearest
//! chunks are pasted into a prompt template, and a hosted OpenAI-compatible
//! LLM writes the answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ data/*.txt │──▶│ Chunk+Embed │──▶│ VectorStore  │
//! └────────────┘   └─────────────┘   │ memory/SQLite│
//!                                    └──────┬───────┘
//!                                           │ top-k
//!                  ┌──────────┐       ┌─────▼──────┐
//!                  │ question │──────▶│  Prompt +  │──▶ answer
//!                  └──────────┘       │  LLM call  │
//!                                     └────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`models`] | Core data types |
//! | [`error`] | Typed errors for chunking, templates, and generation |
//! | [`connector_fs`] | Loads `*.txt` documents from a directory |
//! | [`chunk`] | Fixed-size overlapping text windows |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store trait with memory and SQLite backends |
//! | [`ingest`] | Chunk, tag, and index documents |
//! | [`retrieve`] | Top-k retrieval |
//! | [`prompt`] | Prompt templates |
//! | [`llm`] | OpenAI-compatible completion client |
//! | [`generate`] | Model resolution and answer generation |
//! | [`pipeline`] | Retrieve → format → generate |
//! | [`shell`] | Interactive question loop |
//! | [`eval`] | Scripted evaluation with manual scoring |
//! | [`db`] | SQLite connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod connector_fs;
pub mod db;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod generate;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod retrieve;
pub mod shell;
pub mod store;
