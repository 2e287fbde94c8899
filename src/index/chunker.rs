use crate::types::{Document, Node};

/// Strategy for splitting documents into nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Fixed number of words per node
    FixedWords(usize),
    /// Sliding window with overlap, measured in words
    SlidingWindow { size: usize, overlap: usize },
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    strategy: ChunkStrategy,
}

impl TextChunker {
    pub fn new(strategy: ChunkStrategy) -> Self {
        Self { strategy }
    }

    /// Create a chunker with default strategy (1024 words, 20 overlap)
    pub fn default_strategy() -> Self {
        Self::new(ChunkStrategy::SlidingWindow {
            size: 1024,
            overlap: 20,
        })
    }

    pub fn strategy(&self) -> ChunkStrategy {
        self.strategy
    }

    /// Split a document into nodes.
    ///
    /// Node text is sliced from the original so line breaks and Markdown
    /// structure survive; only whitespace at the node edges is dropped.
    pub fn chunk_document(&self, document: &Document) -> Vec<Node> {
        let (size, step) = match self.strategy {
            ChunkStrategy::FixedWords(size) => (size.max(1), size.max(1)),
            ChunkStrategy::SlidingWindow { size, overlap } => {
                let size = size.max(1);
                let step = if overlap < size { size - overlap } else { 1 };
                (size, step)
            }
        };

        let spans = word_spans(&document.text);
        let mut nodes = Vec::new();
        let mut start = 0;

        while start < spans.len() {
            let end = (start + size).min(spans.len());
            let text = &document.text[spans[start].0..spans[end - 1].1];

            nodes.push(Node {
                id: uuid::Uuid::new_v4().to_string(),
                doc_id: document.id.clone(),
                text: text.to_string(),
                metadata: document.metadata.clone(),
                start_word: start,
                end_word: end,
            });

            if end >= spans.len() {
                break;
            }
            start += step;
        }

        nodes
    }

    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Node> {
        documents
            .iter()
            .flat_map(|doc| self.chunk_document(doc))
            .collect()
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::default_strategy()
    }
}

/// Byte ranges of every whitespace-separated word
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut word_start = None;

    for (idx, ch) in text.char_indices() {
        match (ch.is_whitespace(), word_start) {
            (true, Some(start)) => {
                spans.push((start, idx));
                word_start = None;
            }
            (false, None) => word_start = Some(idx),
            _ => {}
        }
    }
    if let Some(start) = word_start {
        spans.push((start, text.len()));
    }

    spans
}
