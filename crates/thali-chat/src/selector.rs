//! Deterministic item selection for agent-placed orders.
//!
//! With a budget the spend is split 50/30/20 across a main, a side and a
//! drink. Main and side maximize price within their ceiling; the drink is
//! the cheapest that fits. Without a budget the selector falls back to
//! keyword matches or the first items on the menu.

use serde::Serialize;
use thali_core::MenuItem;
use tracing::debug;

use crate::intent::{FoodCategory, Intent};

const MAIN_SHARE: f64 = 0.5;
const SIDE_SHARE: f64 = 0.3;
const DRINK_SHARE: f64 = 0.2;

const SIDE_WORDS: &[&str] = &["naan", "rice", "roti", "salad"];
const DRINK_WORDS: &[&str] = &["drink", "lassi", "juice", "water"];

/// Items returned without a budget.
const FALLBACK_LIMIT: usize = 2;

/// One unit of a menu item chosen for the cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedItem {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

impl SelectedItem {
    fn from_item(item: &MenuItem) -> Self {
        Self {
            name: item.name.clone(),
            price: item.price,
            quantity: 1,
        }
    }
}

/// Per-slot spending ceilings derived from a budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub main: f64,
    pub side: f64,
    pub drink: f64,
}

impl Allocation {
    pub fn from_budget(budget: f64) -> Self {
        Self {
            main: budget * MAIN_SHARE,
            side: budget * SIDE_SHARE,
            drink: budget * DRINK_SHARE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ItemSelector;

impl ItemSelector {
    pub fn new() -> Self {
        Self
    }

    /// Choose items for `intent` from `items` (in parser order).
    ///
    /// Never fails; an empty result means nothing fits.
    pub fn select(&self, intent: &Intent, items: &[MenuItem]) -> Vec<SelectedItem> {
        let selected = match intent.budget {
            Some(budget) => select_within_budget(budget, &intent.keywords, items),
            None if !intent.keywords.is_empty() => select_by_keywords(&intent.keywords, items),
            None => items.iter().take(FALLBACK_LIMIT).map(SelectedItem::from_item).collect(),
        };
        debug!(
            budget = ?intent.budget,
            keywords = intent.keywords.len(),
            selected = selected.len(),
            "Items selected"
        );
        selected
    }
}

fn select_within_budget(
    budget: f64,
    keywords: &[FoodCategory],
    items: &[MenuItem],
) -> Vec<SelectedItem> {
    let allocation = Allocation::from_budget(budget);

    let main = pick(items, Pick::Highest, |item| {
        item.price <= allocation.main && matches_keywords(item, keywords)
    });
    let side = pick(items, Pick::Highest, |item| {
        item.price <= allocation.side && name_contains_any(item, SIDE_WORDS)
    });
    let drink = pick(items, Pick::Cheapest, |item| {
        item.price <= allocation.drink && name_contains_any(item, DRINK_WORDS)
    });

    [main, side, drink]
        .into_iter()
        .flatten()
        .map(SelectedItem::from_item)
        .collect()
}

fn select_by_keywords(keywords: &[FoodCategory], items: &[MenuItem]) -> Vec<SelectedItem> {
    let mut matching: Vec<&MenuItem> = items
        .iter()
        .filter(|item| matches_keywords(item, keywords))
        .collect();
    // Stable sort: equal prices keep menu order.
    matching.sort_by(|a, b| b.price.total_cmp(&a.price));
    matching
        .into_iter()
        .take(FALLBACK_LIMIT)
        .map(SelectedItem::from_item)
        .collect()
}

#[derive(Clone, Copy)]
enum Pick {
    Highest,
    Cheapest,
}

/// Best item passing `qualifies`. Ties go to the earliest item.
fn pick<F>(items: &[MenuItem], mode: Pick, qualifies: F) -> Option<&MenuItem>
where
    F: Fn(&MenuItem) -> bool,
{
    let mut best: Option<&MenuItem> = None;
    for item in items.iter().filter(|item| qualifies(item)) {
        let better = match best {
            None => true,
            Some(b) => match mode {
                Pick::Highest => item.price > b.price,
                Pick::Cheapest => item.price < b.price,
            },
        };
        if better {
            best = Some(item);
        }
    }
    best
}

fn matches_keywords(item: &MenuItem, keywords: &[FoodCategory]) -> bool {
    keywords.is_empty() || keywords.iter().any(|k| k.matches_item(item))
}

fn name_contains_any(item: &MenuItem, words: &[&str]) -> bool {
    let lower = item.name.to_lowercase();
    words.iter().any(|w| lower.contains(w))
}
