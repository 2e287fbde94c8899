use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Body of `POST /process`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// The natural-language question
    #[serde(default)]
    pub query: Option<String>,
}

impl ProcessRequest {
    /// Return the query text, rejecting a missing or blank field
    pub fn validate(&self) -> Result<&str, ValidationError> {
        let query = self
            .query
            .as_deref()
            .ok_or_else(|| ValidationError::MissingField("query".to_string()))?;
        if query.trim().is_empty() {
            return Err(ValidationError::Empty("query".to_string()));
        }
        Ok(query)
    }
}

/// Successful answer from `POST /process`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessResponse {
    pub result: String,
}

/// Error body shared by every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub commit: String,
}

/// File-level attributes attached to every document and node
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub file_path: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub creation_date: Option<String>,
    pub last_modified_date: Option<String>,
}

/// Parsed content of one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    /// SHA-256 of `text`
    pub hash: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        let text = text.into();
        let hash = content_hash(&text);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text,
            hash,
            metadata,
        }
    }
}

/// A chunk of a document, the unit that gets embedded and retrieved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub doc_id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
    /// Word offsets into the parent document, end exclusive
    pub start_word: usize,
    pub end_word: usize,
}

/// A retrieved node with its similarity to the query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredNode {
    pub node: Node,
    pub score: f32,
}

pub(crate) fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
