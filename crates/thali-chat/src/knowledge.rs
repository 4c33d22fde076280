//! Processed menu shared read-only by every turn.
//!
//! [`process_menu`] parses the document text into items and builds the
//! retrieval index in one step. The result is never mutated afterwards;
//! reprocessing produces a new value that replaces the old one.

use std::sync::Arc;

use thali_core::config::RetrievalConfig;
use thali_core::MenuItem;
use thali_menu::MenuParser;
use thali_vector::{DynEmbeddingService, RetrievalIndex};
use tracing::{info, warn};

use crate::error::ChatError;

/// Parsed items plus the retrieval index over the same document.
#[derive(Debug)]
pub struct MenuKnowledgeBase {
    items: Vec<MenuItem>,
    index: RetrievalIndex,
    low_confidence_threshold: usize,
}

/// Parse `raw_text` and index it for retrieval.
///
/// Zero parsed items is a valid, degraded result; only embedding or
/// configuration failures are errors.
pub async fn process_menu(
    raw_text: &str,
    embedder: Arc<dyn DynEmbeddingService>,
    retrieval: &RetrievalConfig,
    low_confidence_threshold: usize,
) -> Result<MenuKnowledgeBase, ChatError> {
    let items = MenuParser::new().parse(raw_text);

    let mut index = RetrievalIndex::from_config(embedder, retrieval)?;
    let chunks = index.build(raw_text).await?;

    let kb = MenuKnowledgeBase {
        items,
        index,
        low_confidence_threshold,
    };
    if kb.is_low_confidence() {
        warn!(
            items = kb.items.len(),
            threshold = low_confidence_threshold,
            "Low-confidence menu extraction"
        );
    }
    info!(items = kb.items.len(), chunks, "Menu processed");
    Ok(kb)
}

impl MenuKnowledgeBase {
    /// Items in parser emission order.
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    /// True when fewer items were parsed than the configured threshold.
    pub fn is_low_confidence(&self) -> bool {
        self.items.len() < self.low_confidence_threshold
    }

    /// The `k` document chunks most similar to `query`.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, ChatError> {
        Ok(self.index.search(query, k).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thali_vector::MockEmbedding;

    const MENU: &str = "MAINS\nChicken Biryani .... Rs 450\nVeggie Burger - 380\n\n\
                        BREADS\nNaan - 80\n\nDRINKS\nMango Lassi - 250";

    async fn kb(text: &str, threshold: usize) -> MenuKnowledgeBase {
        process_menu(
            text,
            Arc::new(MockEmbedding::new()),
            &RetrievalConfig::default(),
            threshold,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_process_menu_parses_and_indexes() {
        let kb = kb(MENU, 3).await;
        let names: Vec<&str> = kb.items().iter().map(|i| i.name.as_str()).collect();
        assert!(names.contains(&"Chicken Biryani"));
        assert!(names.contains(&"Naan"));
        assert!(kb.chunk_count() >= 1);
        assert!(!kb.is_low_confidence());
    }

    #[tokio::test]
    async fn test_search_returns_chunks() {
        let kb = kb(MENU, 3).await;
        let chunks = kb.search("lassi", 4).await.unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.len() <= 4);
    }

    #[tokio::test]
    async fn test_garbled_text_is_degraded_not_error() {
        let kb = kb("@@@ ### page 1 of 2", 3).await;
        assert!(kb.items().is_empty());
        assert!(kb.is_low_confidence());
        assert!(kb.search("anything", 4).await.is_ok());
    }

    #[tokio::test]
    async fn test_threshold_zero_never_low_confidence() {
        let kb = kb("", 0).await;
        assert!(!kb.is_low_confidence());
    }

    #[tokio::test]
    async fn test_invalid_chunking_config() {
        let retrieval = RetrievalConfig {
            chunk_size: 10,
            chunk_overlap: 10,
            ..RetrievalConfig::default()
        };
        let result = process_menu(MENU, Arc::new(MockEmbedding::new()), &retrieval, 3).await;
        assert!(matches!(result, Err(ChatError::Config(_))));
    }
}
