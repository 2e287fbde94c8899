/// Configuration system for doc-query
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
///
/// The process loads configuration once at startup; request handlers only
/// ever see the resulting immutable [`Config`].
use crate::error::{ConfigError, RagError};
use crate::query::DEFAULT_TEXT_QA_TEMPLATE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Language model configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Document directory configuration
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Document parser configuration
    #[serde(default)]
    pub parser: ParserConfig,

    /// Chunking configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Retrieval and answer synthesis configuration
    #[serde(default)]
    pub query: QueryConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow cross-origin requests from any origin
    #[serde(default = "default_cors")]
    pub cors: bool,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the Ollama server
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model name as known to Ollama (e.g., "phi3", "llama3")
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Upper bound for a single completion round trip
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model identifier (e.g., "local:BAAI/bge-m3", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_embed_model")]
    pub model: String,

    /// Batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Document directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Directory read on every request
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Descend into subdirectories
    #[serde(default)]
    pub recursive: bool,

    /// Skip files and directories whose name starts with '.'
    #[serde(default = "default_exclude_hidden")]
    pub exclude_hidden: bool,

    /// Only load files with these extensions (e.g. [".md", ".docx"]); empty means all
    #[serde(default)]
    pub required_extensions: Vec<String>,

    /// Stop after this many files
    #[serde(default)]
    pub num_files_limit: Option<usize>,

    /// Maximum file size to load (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Fail the whole load when a single file cannot be read
    #[serde(default)]
    pub raise_on_error: bool,
}

/// Parser backend used for the extensions in [`ParserConfig::extensions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserBackend {
    /// Parse in-process with docx-rs
    Local,
    /// Upload to the LlamaParse cloud API
    LlamaParse,
}

/// Output format requested from parsers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    Markdown,
    Text,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Markdown => "markdown",
            ResultType::Text => "text",
        }
    }
}

/// Document parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default = "default_parser_backend")]
    pub backend: ParserBackend,

    /// Extensions routed through the parser (with leading dot)
    #[serde(default = "default_parser_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_result_type")]
    pub result_type: ResultType,

    /// LlamaParse API key, normally supplied through LLAMA_CLOUD_API_KEY
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// LlamaParse API base URL
    #[serde(default = "default_parser_base_url")]
    pub base_url: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Give up on a parsing job after this long
    #[serde(default = "default_parser_max_timeout")]
    pub max_timeout_secs: u64,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Words per node
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Words shared between consecutive nodes
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

/// Retrieval and answer synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Number of nodes handed to the LLM as context
    #[serde(default = "default_similarity_top_k")]
    pub similarity_top_k: usize,

    /// Prompt with `{context_str}` and `{query_str}` placeholders
    #[serde(default)]
    pub text_qa_template: Option<String>,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cors() -> bool {
    true
}

fn default_llm_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "phi3".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.75
}

fn default_embed_model() -> String {
    "local:BAAI/bge-m3".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_exclude_hidden() -> bool {
    true
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}

fn default_parser_backend() -> ParserBackend {
    ParserBackend::Local
}

fn default_parser_extensions() -> Vec<String> {
    vec![".docx".to_string()]
}

fn default_result_type() -> ResultType {
    ResultType::Markdown
}

fn default_parser_base_url() -> String {
    "https://api.cloud.llamaindex.ai".to_string()
}

fn default_poll_interval() -> u64 {
    1
}

fn default_parser_max_timeout() -> u64 {
    2000
}

fn default_chunk_size() -> usize {
    1024
}

fn default_chunk_overlap() -> usize {
    20
}

fn default_similarity_top_k() -> usize {
    2
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: default_cors(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            request_timeout_secs: default_llm_timeout(),
            temperature: default_temperature(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embed_model(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            recursive: false,
            exclude_hidden: default_exclude_hidden(),
            required_extensions: Vec::new(),
            num_files_limit: None,
            max_file_size: default_max_file_size(),
            raise_on_error: false,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            backend: default_parser_backend(),
            extensions: default_parser_extensions(),
            result_type: default_result_type(),
            api_key: None,
            base_url: default_parser_base_url(),
            poll_interval_secs: default_poll_interval(),
            max_timeout_secs: default_parser_max_timeout(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            similarity_top_k: default_similarity_top_k(),
            text_qa_template: None,
        }
    }
}

impl QueryConfig {
    /// The configured template, or the built-in text-QA prompt
    pub fn template(&self) -> &str {
        self.text_qa_template
            .as_deref()
            .unwrap_or(DEFAULT_TEXT_QA_TEMPLATE)
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> RagError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from the default location or fall back to defaults
    pub fn load_or_default() -> Result<Self, RagError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RagError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "must be greater than 0"));
        }

        if self.llm.model.trim().is_empty() {
            return Err(invalid("llm.model", "must not be empty"));
        }

        if self.llm.request_timeout_secs == 0 {
            return Err(invalid("llm.request_timeout_secs", "must be greater than 0"));
        }

        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be greater than 0"));
        }

        if self.indexing.chunk_size == 0 {
            return Err(invalid("indexing.chunk_size", "must be greater than 0"));
        }

        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return Err(invalid(
                "indexing.chunk_overlap",
                format!(
                    "must be smaller than chunk_size ({}), got {}",
                    self.indexing.chunk_size, self.indexing.chunk_overlap
                ),
            ));
        }

        if self.query.similarity_top_k == 0 {
            return Err(invalid("query.similarity_top_k", "must be greater than 0"));
        }

        let template = self.query.template();
        if !template.contains("{context_str}") || !template.contains("{query_str}") {
            return Err(invalid(
                "query.text_qa_template",
                "must contain {context_str} and {query_str}",
            ));
        }

        for ext in self
            .parser
            .extensions
            .iter()
            .chain(self.documents.required_extensions.iter())
        {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(invalid(
                    "parser.extensions",
                    format!("extensions must start with '.', got '{}'", ext),
                ));
            }
        }

        if self.parser.backend == ParserBackend::LlamaParse {
            let has_key = self
                .parser
                .api_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty());
            if !has_key {
                return Err(ConfigError::MissingRequired("LLAMA_CLOUD_API_KEY".to_string()).into());
            }
            if self.parser.max_timeout_secs == 0 {
                return Err(invalid("parser.max_timeout_secs", "must be greater than 0"));
            }
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("DOC_QUERY_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("DOC_QUERY_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }

        if let Ok(cors) = std::env::var("DOC_QUERY_CORS")
            && let Ok(cors) = cors.parse()
        {
            self.server.cors = cors;
        }

        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            self.llm.base_url = url;
        }

        if let Ok(model) = std::env::var("DOC_QUERY_LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(timeout) = std::env::var("DOC_QUERY_LLM_TIMEOUT")
            && let Ok(secs) = timeout.parse()
        {
            self.llm.request_timeout_secs = secs;
        }

        if let Ok(model) = std::env::var("DOC_QUERY_EMBED_MODEL") {
            self.embedding.model = model;
        }

        if let Ok(batch_size) = std::env::var("DOC_QUERY_BATCH_SIZE")
            && let Ok(size) = batch_size.parse()
        {
            self.embedding.batch_size = size;
        }

        if let Ok(dir) = std::env::var("DOC_QUERY_DATA_DIR") {
            self.documents.data_dir = PathBuf::from(dir);
        }

        if let Ok(backend) = std::env::var("DOC_QUERY_PARSER") {
            match backend.as_str() {
                "local" => self.parser.backend = ParserBackend::Local,
                "llama_parse" => self.parser.backend = ParserBackend::LlamaParse,
                other => tracing::warn!("Ignoring unknown DOC_QUERY_PARSER value '{}'", other),
            }
        }

        if let Ok(key) = std::env::var("LLAMA_CLOUD_API_KEY") {
            self.parser.api_key = Some(key);
        }

        if let Ok(url) = std::env::var("LLAMA_CLOUD_BASE_URL") {
            self.parser.base_url = url;
        }

        if let Ok(chunk_size) = std::env::var("DOC_QUERY_CHUNK_SIZE")
            && let Ok(size) = chunk_size.parse()
        {
            self.indexing.chunk_size = size;
        }

        if let Ok(top_k) = std::env::var("DOC_QUERY_TOP_K")
            && let Ok(k) = top_k.parse()
        {
            self.query.similarity_top_k = k;
        }
    }

    /// Build the process configuration: file (explicit or default location),
    /// then environment overrides. Callers apply CLI flags and then call
    /// [`Config::validate`].
    pub fn new(config_path: Option<&Path>) -> Result<Self, RagError> {
        let mut config = match config_path {
            Some(path) => {
                tracing::info!("Loading config from: {}", path.display());
                Self::from_file(path)?
            }
            None => Self::load_or_default()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }
}
