//! # doc-query - Question answering over a local document folder
//!
//! An HTTP service that answers natural-language questions from the files in a
//! data directory using retrieval-augmented generation (RAG).
//!
//! ## Overview
//!
//! Every `POST /process` request reads the data directory from scratch, routes
//! `.docx` files through a Markdown-producing parser, embeds the resulting
//! text with a local FastEmbed model, builds an in-memory vector index and
//! asks an Ollama-hosted model (`phi3` by default) to answer from the two most
//! similar chunks. Nothing is cached between requests, so edits to the folder
//! are visible on the next call.
//!
//! ## Key Features
//!
//! - **Local Embeddings**: FastEmbed models resolved from `local:<model>` identifiers
//! - **Office Documents**: `.docx` to Markdown in-process, or via the LlamaParse API
//! - **PDF and Text**: default readers for everything outside the parser map
//! - **Bounded LLM Calls**: the Ollama round trip fails after a configurable timeout
//! - **Layered Configuration**: defaults, TOML file, environment, CLI flags
//!
//! ## Architecture
//!
//! ```text
//! POST /process
//!      │
//! ┌────▼─────────┐
//! │ QueryService │  (per request)
//! └────┬─────────┘
//!      │
//!   ┌──┴──────────────┬─────────────────┬──────────────┐
//!   │                 │                 │              │
//! ┌─▼──────────────┐ ┌▼───────────────┐ ┌▼───────────┐ ┌▼─────────────┐
//! │DirectoryLoader │ │resolve_embed_  │ │VectorStore │ │ QueryEngine  │
//! │ + DocxParser / │ │model           │ │Index       │ │ + Ollama     │
//! │   LlamaParse   │ │ (FastEmbed)    │ │ (in-memory)│ │   (timeout)  │
//! └────────────────┘ └────────────────┘ └────────────┘ └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`server`]: axum router, handlers and error-to-status mapping
//! - [`service`]: the per-request pipeline and its collaborator factory
//! - [`loader`]: directory walking and default file readers
//! - [`parser`]: `.docx`, LlamaParse and PDF parsers
//! - [`embedding`]: embedding model resolution using FastEmbed
//! - [`index`]: chunking and the in-memory vector index
//! - [`query`]: prompt template and query engine
//! - [`llm`]: language model trait and the Ollama client
//! - [`config`]: configuration management with environment variable support
//! - [`types`]: request/response and document types
//! - [`error`]: error types
//! - [`paths`]: platform paths
//!
//! ## Usage Example
//!
//! ```no_run
//! use doc_query::config::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Defaults: ./data, local:BAAI/bge-m3, phi3 on localhost:11434
//!     let config = Config::new(None)?;
//!     config.validate()?;
//!
//!     // Serve POST /process until Ctrl-C
//!     doc_query::server::serve(Arc::new(config)).await
//! }
//! ```

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding generation using FastEmbed
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Text chunking and the in-memory vector index
pub mod index;

/// Language model clients
pub mod llm;

/// Directory loading into documents
pub mod loader;

/// Document parsers (.docx, LlamaParse, PDF)
pub mod parser;

/// Platform paths and path utilities
pub mod paths;

/// Retrieval-augmented query engine
pub mod query;

/// HTTP server
pub mod server;

/// Per-request query pipeline
pub mod service;

/// Request/response and document types
pub mod types;

#[cfg(test)]
mod testing;
