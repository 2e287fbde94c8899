//! The per-request query pipeline
//!
//! Every call to [`QueryService::process`] asks its [`PipelineComponents`] for
//! fresh collaborators, reads the document directory, builds an index and
//! answers from it. Nothing carries over between requests except the
//! configuration.

use crate::config::Config;
use crate::embedding::{EmbeddingProvider, resolve_embed_model};
use crate::error::{IndexError, RagError};
use crate::index::{ChunkStrategy, TextChunker, VectorStoreIndex};
use crate::llm::{LanguageModel, OllamaClient};
use crate::loader::{DirectoryLoader, DocumentLoader};
use crate::parser::build_file_extractor;
use crate::query::{QueryOptions, QueryResponse};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Factory for the collaborators a single request needs
#[async_trait]
pub trait PipelineComponents: Send + Sync {
    fn language_model(&self) -> Result<Arc<dyn LanguageModel>, RagError>;

    fn document_loader(&self) -> Result<Box<dyn DocumentLoader>, RagError>;

    /// May load model weights, so it is async
    async fn embedding_model(&self) -> Result<Arc<dyn EmbeddingProvider>, RagError>;
}

/// Collaborators built from the process configuration
pub struct DefaultComponents {
    config: Arc<Config>,
}

impl DefaultComponents {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PipelineComponents for DefaultComponents {
    fn language_model(&self) -> Result<Arc<dyn LanguageModel>, RagError> {
        Ok(Arc::new(OllamaClient::from_config(&self.config.llm)?))
    }

    fn document_loader(&self) -> Result<Box<dyn DocumentLoader>, RagError> {
        let file_extractor = build_file_extractor(&self.config.parser)?;
        Ok(Box::new(DirectoryLoader::from_config(
            &self.config.documents,
            file_extractor,
        )))
    }

    async fn embedding_model(&self) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
        let identifier = self.config.embedding.model.clone();
        let batch_size = self.config.embedding.batch_size;
        tokio::task::spawn_blocking(move || resolve_embed_model(&identifier, batch_size))
            .await
            .map_err(|e| IndexError::TaskFailed(e.to_string()))?
    }
}

pub struct QueryService {
    config: Arc<Config>,
    components: Arc<dyn PipelineComponents>,
}

impl QueryService {
    pub fn new(config: Arc<Config>, components: Arc<dyn PipelineComponents>) -> Self {
        Self { config, components }
    }

    /// Service wired to the real collaborators
    pub fn with_default_components(config: Arc<Config>) -> Self {
        let components = Arc::new(DefaultComponents::new(Arc::clone(&config)));
        Self::new(config, components)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load, index and answer `query`. Callers validate the query first.
    pub async fn process(&self, query: &str) -> Result<QueryResponse, RagError> {
        let started = Instant::now();

        let llm = self.components.language_model()?;
        let documents = self.components.document_loader()?.load_data().await?;
        let embed_model = self.components.embedding_model().await?;

        let chunker = TextChunker::new(ChunkStrategy::SlidingWindow {
            size: self.config.indexing.chunk_size,
            overlap: self.config.indexing.chunk_overlap,
        });
        let index = VectorStoreIndex::from_documents(
            documents,
            embed_model,
            &chunker,
            self.config.embedding.batch_size,
        )
        .await?;

        let options = QueryOptions::from_config(&self.config.query, &self.config.llm);
        let response = index.as_query_engine(llm, options).query(query).await?;

        tracing::info!(
            "Processed query in {:?} ({} source nodes, answered: {})",
            started.elapsed(),
            response.source_nodes.len(),
            response.response.is_some()
        );
        Ok(response)
    }
}
