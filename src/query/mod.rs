//! Retrieval-augmented answering over a [`VectorStoreIndex`]

use crate::config::{LlmConfig, QueryConfig};
use crate::error::{EmbeddingError, IndexError, LlmError, RagError};
use crate::index::VectorStoreIndex;
use crate::llm::LanguageModel;
use crate::types::ScoredNode;
use std::sync::Arc;
use std::time::Duration;

/// Prompt used when no custom template is configured
pub const DEFAULT_TEXT_QA_TEMPLATE: &str = "Context information is below.\n\
---------------------\n\
{context_str}\n\
---------------------\n\
Given the context information and not prior knowledge, answer the query.\n\
Query: {query_str}\n\
Answer: ";

/// A prompt with `{context_str}` and `{query_str}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn format(&self, context_str: &str, query_str: &str) -> String {
        self.template
            .replace("{context_str}", context_str)
            .replace("{query_str}", query_str)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_QA_TEMPLATE)
    }
}

/// Answer plus the nodes it was grounded on
#[derive(Debug, Clone, Default)]
pub struct QueryResponse {
    /// `None` when nothing relevant was retrieved or the model answered blank
    pub response: Option<String>,
    pub source_nodes: Vec<ScoredNode>,
}

/// Knobs for answer synthesis
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub similarity_top_k: usize,
    pub template: PromptTemplate,
    /// Upper bound for the LLM round trip
    pub timeout: Duration,
}

impl QueryOptions {
    pub fn from_config(query: &QueryConfig, llm: &LlmConfig) -> Self {
        Self {
            similarity_top_k: query.similarity_top_k,
            template: PromptTemplate::new(query.template()),
            timeout: Duration::from_secs(llm.request_timeout_secs),
        }
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::from_config(&QueryConfig::default(), &LlmConfig::default())
    }
}

pub struct QueryEngine {
    index: Arc<VectorStoreIndex>,
    llm: Arc<dyn LanguageModel>,
    options: QueryOptions,
}

impl QueryEngine {
    pub fn new(
        index: Arc<VectorStoreIndex>,
        llm: Arc<dyn LanguageModel>,
        options: QueryOptions,
    ) -> Self {
        Self {
            index,
            llm,
            options,
        }
    }

    /// Retrieve context for `query` and ask the LLM to answer from it
    pub async fn query(&self, query: &str) -> Result<QueryResponse, RagError> {
        let source_nodes = self.retrieve(query).await?;
        if source_nodes.is_empty() {
            tracing::info!("No nodes retrieved for query; skipping LLM call");
            return Ok(QueryResponse::default());
        }

        let context_str = source_nodes
            .iter()
            .map(|scored| scored.node.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = self.options.template.format(&context_str, query);

        tracing::debug!(
            "Querying {} with {} context nodes",
            self.llm.model_name(),
            source_nodes.len()
        );
        let timeout = self.options.timeout;
        let answer = tokio::time::timeout(timeout, self.llm.complete(&prompt))
            .await
            .map_err(|_| LlmError::Timeout(timeout.as_secs()))??;

        let response = Some(answer.trim().to_string()).filter(|a| !a.is_empty());
        Ok(QueryResponse {
            response,
            source_nodes,
        })
    }

    /// Embed the query and return the closest nodes
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredNode>, RagError> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let index = Arc::clone(&self.index);
        let text = query.to_string();
        let top_k = self.options.similarity_top_k;
        tokio::task::spawn_blocking(move || -> Result<Vec<ScoredNode>, RagError> {
            let mut embeddings = index
                .embed_model()
                .embed_batch(vec![text])
                .map_err(|e| EmbeddingError::GenerationFailed(format!("{:#}", e)))?;
            let query_embedding = embeddings.pop().ok_or_else(|| {
                EmbeddingError::GenerationFailed("no embedding returned for query".to_string())
            })?;
            let expected = index.embed_model().dimension();
            if query_embedding.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: query_embedding.len(),
                }
                .into());
            }
            Ok(index.retrieve(&query_embedding, top_k))
        })
        .await
        .map_err(|e| IndexError::TaskFailed(e.to_string()))?
    }
}
