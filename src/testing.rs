//! Deterministic stand-ins for the pipeline collaborators used in unit tests

use crate::embedding::EmbeddingProvider;
use crate::error::{LoadError, RagError};
use crate::llm::LanguageModel;
use crate::loader::DocumentLoader;
use crate::service::PipelineComponents;
use crate::types::{Document, DocumentMetadata};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Bag-of-words embedder: each lower-cased word bumps one hashed bucket, so
/// texts sharing words have positive cosine similarity
pub struct HashEmbedder {
    pub dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for word in text.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if word.is_empty() {
                continue;
            }
            let bucket = fnv1a(word.as_bytes()) as usize % self.dimension;
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

/// Embedder whose vectors have the wrong length
pub struct WrongDimensionEmbedder;

impl EmbeddingProvider for WrongDimensionEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0; 3]).collect())
    }

    fn dimension(&self) -> usize {
        8
    }

    fn model_name(&self) -> &str {
        "wrong-dimension"
    }
}

/// Embedder that always fails
pub struct FailingEmbedder;

impl EmbeddingProvider for FailingEmbedder {
    fn embed_batch(&self, _texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("model file is corrupt")
    }

    fn dimension(&self) -> usize {
        8
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// LLM that answers with a fixed string after an optional delay and keeps
/// every prompt it received
pub struct ScriptedLlm {
    answer: String,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl LanguageModel for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.answer.clone())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Loader over in-memory texts; an empty list behaves like an empty directory
pub struct StaticLoader {
    pub texts: Vec<String>,
}

#[async_trait::async_trait]
impl DocumentLoader for StaticLoader {
    async fn load_data(&self) -> Result<Vec<Document>, RagError> {
        if self.texts.is_empty() {
            return Err(LoadError::NoFilesFound("memory".to_string()).into());
        }
        Ok(self
            .texts
            .iter()
            .map(|t| Document::new(t.clone(), DocumentMetadata::default()))
            .collect())
    }
}

/// Pipeline components that count how often each collaborator is built
pub struct MockComponents {
    pub texts: Vec<String>,
    pub llm: Arc<ScriptedLlm>,
    pub loader_calls: AtomicUsize,
    pub embed_calls: AtomicUsize,
}

impl MockComponents {
    pub fn new(texts: &[&str], llm: ScriptedLlm) -> Arc<Self> {
        Arc::new(Self {
            texts: texts.iter().map(|t| t.to_string()).collect(),
            llm: Arc::new(llm),
            loader_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl PipelineComponents for MockComponents {
    fn language_model(&self) -> Result<Arc<dyn LanguageModel>, RagError> {
        Ok(self.llm.clone())
    }

    fn document_loader(&self) -> Result<Box<dyn DocumentLoader>, RagError> {
        self.loader_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticLoader {
            texts: self.texts.clone(),
        }))
    }

    async fn embedding_model(&self) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(HashEmbedder::new(128)))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf29ce484222325, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(0x100000001b3)
    })
}
