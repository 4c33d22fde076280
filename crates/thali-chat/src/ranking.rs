//! Relevance ranking of menu items for browse-turn display.
//!
//! Independent of the item selector: this list is only shown to the
//! customer and stored so a follow-up "add those" can commit it.

use thali_core::{MenuItem, RecommendedItem};

use crate::intent::{extract_budget, mentions, FoodCategory};

/// Name words shorter than this never count as a direct mention.
const MIN_NAME_WORD_LEN: usize = 3;

/// Ranks menu items against an utterance.
#[derive(Debug, Clone, Copy)]
pub struct RelevanceRanker {
    max_results: usize,
}

impl Default for RelevanceRanker {
    fn default() -> Self {
        Self::new(6)
    }
}

impl RelevanceRanker {
    pub fn new(max_results: usize) -> Self {
        Self { max_results }
    }

    /// Items the utterance names directly or through a food category,
    /// under any stated price ceiling, in menu order. Falls back to the
    /// first items on the menu when nothing qualifies.
    pub fn rank(&self, utterance: &str, items: &[MenuItem]) -> Vec<RecommendedItem> {
        if items.is_empty() {
            return Vec::new();
        }

        let lower = utterance.to_lowercase();
        let price_limit = extract_budget(utterance);
        let categories: Vec<FoodCategory> = FoodCategory::DISPLAY_VOCABULARY
            .iter()
            .copied()
            .filter(|c| c.mentioned_in(&lower))
            .collect();

        let relevant: Vec<RecommendedItem> = items
            .iter()
            .filter(|item| is_relevant(item, &lower, &categories))
            .filter(|item| price_limit.map_or(true, |limit| item.price <= limit))
            .take(self.max_results)
            .map(MenuItem::to_recommended)
            .collect();

        if relevant.is_empty() {
            items
                .iter()
                .take(self.max_results)
                .map(MenuItem::to_recommended)
                .collect()
        } else {
            relevant
        }
    }
}

fn is_relevant(item: &MenuItem, lower_utterance: &str, categories: &[FoodCategory]) -> bool {
    let name = item.name.to_lowercase();
    let named_directly = name
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_NAME_WORD_LEN)
        .any(|w| mentions(lower_utterance, w));
    if named_directly {
        return true;
    }
    categories
        .iter()
        .any(|c| c.synonyms().iter().any(|s| mentions(&name, s)))
}
