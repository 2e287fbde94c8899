/// Centralized error types for doc-query using thiserror
///
/// Every stage of the per-request pipeline reports through [`RagError`] so the
/// HTTP layer can pick a status code from the error category alone.
use thiserror::Error;

/// Main error type for the query pipeline
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Document loading error: {0}")]
    Load(#[from] LoadError),

    #[error("Parser error: {0}")]
    Parse(#[from] ParseError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while reading the document directory
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Failed to walk directory: {0}")]
    WalkFailed(String),

    #[error("Failed to read file '{file}': {reason}")]
    FileReadFailed { file: String, reason: String },

    #[error("No files found in {0}")]
    NoFilesFound(String),
}

/// Errors raised by document parsers
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to parse '{file}': {reason}")]
    ParseFailed { file: String, reason: String },

    #[error("Parsing service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Parsing job {job_id} failed with status {status}")]
    JobFailed { job_id: String, status: String },

    #[error("Parsing job {0} did not finish within {1} seconds")]
    Timeout(String, u64),
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Unsupported embedding model: {0}")]
    UnsupportedModel(String),

    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model lock was poisoned: {0}")]
    LockPoisoned(String),
}

/// Errors related to building or querying the in-memory index
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Embedding count {embeddings} does not match node count {nodes}")]
    CountMismatch { nodes: usize, embeddings: usize },

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

/// Errors related to the language model round trip
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM request timed out after {0} seconds")]
    Timeout(u64),

    #[error("LLM server unavailable: {0}")]
    Unavailable(String),

    #[error("LLM API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to request validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Empty {0}")]
    Empty(String),
}

// Conversion from anyhow::Error to RagError
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Other(format!("{:#}", err))
    }
}

impl RagError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        RagError::Other(msg.into())
    }

    /// Check if this is a caller error rather than a system fault
    pub fn is_user_error(&self) -> bool {
        matches!(self, RagError::Validation(_))
    }

    /// Check if the fault came from a collaborator outside this process
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            RagError::Llm(LlmError::Timeout(_))
                | RagError::Llm(LlmError::Unavailable(_))
                | RagError::Parse(ParseError::ServiceUnavailable(_))
                | RagError::Parse(ParseError::Timeout(..))
        )
    }
}
