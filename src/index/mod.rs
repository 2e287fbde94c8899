//! In-memory vector index over document nodes
//!
//! The index is built fresh for every request and dropped with it; nothing is
//! persisted between requests.

mod chunker;

pub use chunker::{ChunkStrategy, TextChunker};

use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, IndexError, RagError};
use crate::llm::LanguageModel;
use crate::query::{QueryEngine, QueryOptions};
use crate::types::{Document, Node, ScoredNode};
use std::sync::Arc;

pub struct VectorStoreIndex {
    nodes: Vec<Node>,
    embeddings: Vec<Vec<f32>>,
    norms: Vec<f32>,
    embed_model: Arc<dyn EmbeddingProvider>,
}

impl VectorStoreIndex {
    /// Chunk the documents, embed every node and keep both in memory.
    ///
    /// Embedding runs on the blocking pool.
    pub async fn from_documents(
        documents: Vec<Document>,
        embed_model: Arc<dyn EmbeddingProvider>,
        chunker: &TextChunker,
        batch_size: usize,
    ) -> Result<Self, RagError> {
        let nodes = chunker.chunk_documents(&documents);
        tracing::info!(
            "Indexing {} nodes from {} documents with {}",
            nodes.len(),
            documents.len(),
            embed_model.model_name()
        );

        let texts: Vec<String> = nodes.iter().map(|n| n.text.clone()).collect();
        let model = Arc::clone(&embed_model);
        let embeddings = tokio::task::spawn_blocking(move || {
            embed_in_batches(model.as_ref(), texts, batch_size)
        })
        .await
        .map_err(|e| IndexError::TaskFailed(e.to_string()))??;

        Self::from_parts(nodes, embeddings, embed_model)
    }

    /// Assemble an index from nodes and their precomputed vectors
    pub fn from_parts(
        nodes: Vec<Node>,
        embeddings: Vec<Vec<f32>>,
        embed_model: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, RagError> {
        if nodes.len() != embeddings.len() {
            return Err(IndexError::CountMismatch {
                nodes: nodes.len(),
                embeddings: embeddings.len(),
            }
            .into());
        }

        let expected = embed_model.dimension();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: bad.len(),
            }
            .into());
        }

        let norms = embeddings.iter().map(|e| magnitude(e)).collect();
        Ok(Self {
            nodes,
            embeddings,
            norms,
            embed_model,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn embed_model(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embed_model
    }

    /// Top `top_k` nodes by cosine similarity, highest first
    pub fn retrieve(&self, query_embedding: &[f32], top_k: usize) -> Vec<ScoredNode> {
        if top_k == 0 || self.nodes.is_empty() {
            return Vec::new();
        }

        let query_norm = magnitude(query_embedding);
        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(idx, (embedding, &norm))| {
                (idx, cosine_similarity(embedding, query_embedding, norm, query_norm))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(idx, score)| ScoredNode {
                node: self.nodes[idx].clone(),
                score,
            })
            .collect()
    }

    /// Bind this index to a language model
    pub fn as_query_engine(
        self,
        llm: Arc<dyn LanguageModel>,
        options: QueryOptions,
    ) -> QueryEngine {
        QueryEngine::new(Arc::new(self), llm, options)
    }
}

fn embed_in_batches(
    model: &dyn EmbeddingProvider,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, RagError> {
    let mut embeddings = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let batch_embeddings = model
            .embed_batch(batch.to_vec())
            .map_err(|e| EmbeddingError::GenerationFailed(format!("{:#}", e)))?;
        embeddings.extend(batch_embeddings);
    }
    Ok(embeddings)
}

fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with precomputed magnitudes; zero vectors score 0
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32], mag_a: f32, mag_b: f32) -> f32 {
    if mag_a == 0.0 || mag_b == 0.0 || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (mag_a * mag_b)
}
