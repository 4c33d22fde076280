//! Retrieval index over menu text.
//!
//! `RetrievalIndex` splits a document into overlapping chunks, embeds each
//! chunk and answers similarity queries. Building replaces the previous
//! contents wholesale; searching an index that was never built is an error.

use std::sync::Arc;

use thali_core::config::RetrievalConfig;
use thali_core::error::ThaliError;
use tracing::{debug, info};

use crate::embedding::DynEmbeddingService;
use crate::index::{SearchHit, VectorIndex};
use crate::splitter::RecursiveTextSplitter;

/// Similarity-searchable store of document chunks.
///
/// Uses dynamic dispatch (`Arc<dyn DynEmbeddingService>`) so that production
/// code can supply `OnnxEmbeddingService` while tests use `MockEmbedding`.
pub struct RetrievalIndex {
    embedder: Arc<dyn DynEmbeddingService>,
    splitter: RecursiveTextSplitter,
    index: VectorIndex,
    built: bool,
}

impl std::fmt::Debug for RetrievalIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalIndex")
            .field("chunks", &self.index.len())
            .field("built", &self.built)
            .finish()
    }
}

impl RetrievalIndex {
    pub fn new(embedder: Arc<dyn DynEmbeddingService>, splitter: RecursiveTextSplitter) -> Self {
        Self {
            embedder,
            splitter,
            index: VectorIndex::new(),
            built: false,
        }
    }

    /// Create an index whose splitter follows the `[retrieval]` config section.
    pub fn from_config(
        embedder: Arc<dyn DynEmbeddingService>,
        config: &RetrievalConfig,
    ) -> Result<Self, ThaliError> {
        let splitter = RecursiveTextSplitter::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self::new(embedder, splitter))
    }

    /// Chunk and embed `raw_text`, replacing any previous contents.
    ///
    /// On failure the index is left unbuilt rather than half-populated.
    pub async fn build(&mut self, raw_text: &str) -> Result<usize, ThaliError> {
        self.built = false;
        self.index.clear();

        let chunks = self.splitter.split_text(raw_text);
        let mut fresh = VectorIndex::new();
        for chunk in chunks {
            let embedding = self.embedder.embed_boxed(&chunk).await?;
            fresh.insert(chunk, embedding)?;
        }

        let count = fresh.len();
        self.index = fresh;
        self.built = true;
        info!(chunks = count, "Retrieval index built");
        Ok(count)
    }

    /// Return the `k` chunks most similar to `query`, best first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, ThaliError> {
        Ok(self
            .search_scored(query, k)
            .await?
            .into_iter()
            .map(|hit| hit.text)
            .collect())
    }

    /// Like [`search`](Self::search) but keeps similarity scores.
    pub async fn search_scored(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, ThaliError> {
        if !self.built {
            return Err(ThaliError::IndexNotBuilt);
        }
        if self.index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed_boxed(query).await?;
        let hits = self.index.search(&query_vec, k)?;
        debug!(k, hits = hits.len(), "Retrieval search");
        Ok(hits)
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Number of chunks currently indexed.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
