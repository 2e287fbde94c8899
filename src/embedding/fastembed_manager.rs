use super::EmbeddingProvider;
use crate::error::{EmbeddingError, RagError};
use anyhow::{Context, Result, anyhow};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// FastEmbed-based embedding provider for any model fastembed ships
pub struct FastEmbedManager {
    // `TextEmbedding::embed` takes `&mut self`
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: usize,
    batch_size: Option<usize>,
}

impl FastEmbedManager {
    /// Create a manager for a model code such as "BAAI/bge-m3".
    ///
    /// Matching is case-insensitive against fastembed's supported model list,
    /// on either the full model code or the part after the `/`.
    pub fn from_model_name(name: &str) -> Result<Self, RagError> {
        let models = TextEmbedding::list_supported_models();
        let (model, model_code, dim) = models
            .iter()
            .find(|info| info.model_code.eq_ignore_ascii_case(name))
            .or_else(|| {
                models.iter().find(|info| {
                    info.model_code
                        .rsplit('/')
                        .next()
                        .is_some_and(|short| short.eq_ignore_ascii_case(name))
                })
            })
            .map(|info| (info.model.clone(), info.model_code.clone(), info.dim))
            .ok_or_else(|| EmbeddingError::UnsupportedModel(name.to_string()))?;

        Self::with_model(model, model_code, dim)
            .map_err(|e| EmbeddingError::InitializationFailed(format!("{:#}", e)).into())
    }

    /// Create a new FastEmbedManager with a specific model
    pub fn with_model(
        model: EmbeddingModel,
        model_name: impl Into<String>,
        dimension: usize,
    ) -> Result<Self> {
        let model_name = model_name.into();
        tracing::info!("Initializing FastEmbed model: {} ({} dims)", model_name, dimension);

        let mut options = InitOptions::default();
        options.model_name = model;
        options.show_download_progress = true;

        let embedding_model =
            TextEmbedding::try_new(options).context("Failed to initialize FastEmbed model")?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            model_name,
            dimension,
            batch_size: None,
        })
    }

    /// Texts per inference batch; fastembed picks its own default when unset
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = (batch_size > 0).then_some(batch_size);
        self
    }
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow!(EmbeddingError::LockPoisoned(e.to_string())))?;
        let embeddings = model
            .embed(texts, self.batch_size)
            .context("Failed to generate embeddings")?;

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests below download model weights on first run
    const SMALL_MODEL: &str = "BAAI/bge-small-en-v1.5";

    #[test]
    fn test_unknown_model_is_rejected() {
        let result = FastEmbedManager::from_model_name("acme/unknown-embedder");
        assert!(matches!(
            result,
            Err(RagError::Embedding(EmbeddingError::UnsupportedModel(_)))
        ));
    }

    #[test]
    fn test_bge_m3_is_a_supported_model() {
        let found = TextEmbedding::list_supported_models()
            .into_iter()
            .any(|info| info.model_code.eq_ignore_ascii_case("BAAI/bge-m3"));
        assert!(found);
    }

    #[test]
    #[ignore = "downloads model weights"]
    fn test_embedding_generation() {
        let manager = FastEmbedManager::from_model_name(SMALL_MODEL).unwrap();
        let texts = vec![
            "Our refund policy lasts 30 days.".to_string(),
            "The office is closed on public holidays.".to_string(),
        ];

        let embeddings = manager.embed_batch(texts).unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), manager.dimension());
        assert_eq!(embeddings[1].len(), manager.dimension());
    }

    #[test]
    #[ignore = "downloads model weights"]
    fn test_empty_batch() {
        let manager = FastEmbedManager::from_model_name(SMALL_MODEL).unwrap();
        let embeddings = manager.embed_batch(vec![]).unwrap();
        assert_eq!(embeddings.len(), 0);
    }

    #[test]
    #[ignore = "downloads model weights"]
    fn test_model_name_and_dimension() {
        let manager = FastEmbedManager::from_model_name("baai/BGE-small-en-v1.5").unwrap();
        assert_eq!(manager.model_name(), SMALL_MODEL);
        assert_eq!(manager.dimension(), 384);
    }

    #[test]
    #[ignore = "downloads model weights"]
    fn test_short_name_lookup() {
        let manager = FastEmbedManager::from_model_name("bge-small-en-v1.5").unwrap();
        assert_eq!(manager.model_name(), SMALL_MODEL);
    }

    #[test]
    #[ignore = "downloads model weights"]
    fn test_batched_generation() {
        let manager = FastEmbedManager::from_model_name(SMALL_MODEL)
            .unwrap()
            .with_batch_size(4);
        let texts: Vec<String> = (0..10).map(|i| format!("Test text {}", i)).collect();
        let embeddings = manager.embed_batch(texts).unwrap();
        assert_eq!(embeddings.len(), 10);
    }
}
