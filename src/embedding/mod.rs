mod fastembed_manager;

pub use fastembed_manager::FastEmbedManager;

use crate::error::{EmbeddingError, RagError};
use anyhow::Result;
use std::sync::Arc;

/// Trait for embedding generation
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of text
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Where an embedding model identifier points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedModelSpec {
    /// Run the named model in-process
    Local(String),
}

impl EmbedModelSpec {
    /// Parse identifiers such as `local:BAAI/bge-m3` or a bare model name.
    ///
    /// A bare name is treated as local; any other `scheme:` prefix is
    /// rejected since only in-process models are available.
    pub fn parse(identifier: &str) -> Result<Self, RagError> {
        let identifier = identifier.trim();
        let (scheme, name) = match identifier.split_once(':') {
            Some((scheme, name)) => (Some(scheme), name.trim()),
            None => (None, identifier),
        };

        match scheme {
            None | Some("local") if !name.is_empty() => Ok(Self::Local(name.to_string())),
            _ => Err(EmbeddingError::UnsupportedModel(identifier.to_string()).into()),
        }
    }
}

/// Resolve an identifier into a ready-to-use embedding model.
///
/// Blocking: may download and load model weights. Call from
/// `spawn_blocking` when on the async runtime.
pub fn resolve_embed_model(
    identifier: &str,
    batch_size: usize,
) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
    match EmbedModelSpec::parse(identifier)? {
        EmbedModelSpec::Local(name) => {
            let manager = FastEmbedManager::from_model_name(&name)?.with_batch_size(batch_size);
            Ok(Arc::new(manager))
        }
    }
}
