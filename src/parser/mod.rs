//! Document parsers that turn office files into Markdown or plain text
//!
//! A [`FileExtractor`] maps file extensions to the parser that should handle
//! them; files with other extensions fall back to the loader's default
//! readers.

mod docx;
mod llama_parse;
mod pdf;

pub use docx::DocxParser;
pub use llama_parse::LlamaParseClient;
pub use pdf::extract_pdf_to_markdown;

use crate::config::{ParserBackend, ParserConfig, ResultType};
use crate::error::RagError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Trait for turning a file into text
#[async_trait::async_trait]
pub trait DocumentParser: Send + Sync {
    /// Parse the file at `path` into a single text blob
    async fn parse(&self, path: &Path) -> Result<String, RagError>;

    /// Format of the text returned by [`DocumentParser::parse`]
    fn result_type(&self) -> ResultType;
}

/// Extension (lower-case, with leading dot) to parser mapping
pub type FileExtractor = HashMap<String, Arc<dyn DocumentParser>>;

/// Construct a parser for the configured backend
pub fn build_parser(config: &ParserConfig) -> Result<Arc<dyn DocumentParser>, RagError> {
    let parser: Arc<dyn DocumentParser> = match config.backend {
        ParserBackend::Local => Arc::new(DocxParser::new(config.result_type)),
        ParserBackend::LlamaParse => Arc::new(LlamaParseClient::from_config(config)?),
    };
    Ok(parser)
}

/// Map every configured extension to one shared parser handle
pub fn build_file_extractor(config: &ParserConfig) -> Result<FileExtractor, RagError> {
    let parser = build_parser(config)?;
    Ok(config
        .extensions
        .iter()
        .map(|ext| (ext.to_lowercase(), Arc::clone(&parser)))
        .collect())
}

/// MIME type for the file types this crate knows how to read
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pdf" => "application/pdf",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "txt" | "text" | "log" => "text/plain",
        _ => "application/octet-stream",
    }
}
