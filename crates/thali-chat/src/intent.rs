//! Intent classification for customer utterances.
//!
//! Decides whether a turn refers back to the previous recommendations
//! ("add those"), asks the agent to order, or is a browse question, and
//! extracts an optional budget plus food categories from the text.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thali_core::MenuItem;
use tracing::debug;

use crate::memory::ConversationMemory;

// =============================================================================
// Compiled regex sets (compiled once, reused across calls)
// =============================================================================

static REFERRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:these|those|them|that|it|same|all)\b").expect("Invalid referring regex")
});

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:add|order|want|get|buy|take)\b").expect("Invalid action regex")
});

static ORDER_TRIGGER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:order|want|get\s+me|i\s+need|hungry|buy|purchase|add|give\s+me)\b",
    )
    .expect("Invalid order trigger regex")
});

static BUDGET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    const AMOUNT: &str = r"(?:rs\.?\s*|pkr\s*)?(\d+(?:\.\d+)?)";
    [
        format!(r"(?i)\b(?:under|below|less\s+than|maximum)\s+{AMOUNT}"),
        format!(r"(?i){AMOUNT}\s+budget\b"),
        format!(r"(?i)\bbudget\s+(?:is\s+|of\s+)?{AMOUNT}"),
        r"(?i)\b(\d+(?:\.\d+)?)\s*(?:rupees|rs|pkr)\b".to_string(),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid budget regex"))
    .collect()
});

// =============================================================================
// Food vocabulary
// =============================================================================

/// Food category recognized in utterances and menu item names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoodCategory {
    Chicken,
    /// Red meat: beef, mutton and lamb.
    Beef,
    Fish,
    Vegetarian,
    Spicy,
    Rice,
    Bread,
    Drink,
    Dessert,
}

impl FoodCategory {
    /// Categories that steer automatic ordering, in declaration order.
    pub const ORDER_VOCABULARY: [FoodCategory; 7] = [
        FoodCategory::Chicken,
        FoodCategory::Beef,
        FoodCategory::Fish,
        FoodCategory::Vegetarian,
        FoodCategory::Spicy,
        FoodCategory::Rice,
        FoodCategory::Bread,
    ];

    /// Categories used to rank browse-turn recommendations.
    pub const DISPLAY_VOCABULARY: [FoodCategory; 9] = [
        FoodCategory::Chicken,
        FoodCategory::Beef,
        FoodCategory::Fish,
        FoodCategory::Vegetarian,
        FoodCategory::Spicy,
        FoodCategory::Rice,
        FoodCategory::Bread,
        FoodCategory::Drink,
        FoodCategory::Dessert,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FoodCategory::Chicken => "chicken",
            FoodCategory::Beef => "beef",
            FoodCategory::Fish => "fish",
            FoodCategory::Vegetarian => "vegetarian",
            FoodCategory::Spicy => "spicy",
            FoodCategory::Rice => "rice",
            FoodCategory::Bread => "bread",
            FoodCategory::Drink => "drink",
            FoodCategory::Dessert => "dessert",
        }
    }

    /// Lowercase words that signal this category.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            FoodCategory::Chicken => &["chicken"],
            FoodCategory::Beef => &["beef", "mutton", "lamb"],
            FoodCategory::Fish => &["fish", "seafood"],
            FoodCategory::Vegetarian => &["vegetarian", "vegan", "veggie"],
            FoodCategory::Spicy => &["spicy", "hot"],
            FoodCategory::Rice => &["rice", "biryani", "pulao"],
            FoodCategory::Bread => &["bread", "naan", "roti"],
            FoodCategory::Drink => &["drink", "juice", "coffee", "tea", "lassi"],
            FoodCategory::Dessert => &["dessert", "sweet", "ice cream", "cake"],
        }
    }

    /// True if any synonym starts a word in `lowercase_text`.
    pub fn mentioned_in(&self, lowercase_text: &str) -> bool {
        self.synonyms().iter().any(|s| mentions(lowercase_text, s))
    }

    /// True if the item's name or tags mention this category.
    pub fn matches_item(&self, item: &MenuItem) -> bool {
        self.mentioned_in(&item.search_text())
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// True if `word` occurs in `haystack` at the start of a word.
///
/// Plurals and suffixes still match ("naans"), words buried inside other
/// words do not ("price" does not mention "rice").
pub fn mentions(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    haystack.match_indices(word).any(|(i, _)| {
        haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

// =============================================================================
// Intent
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Order,
    Browse,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentKind::Order => f.write_str("order"),
            IntentKind::Browse => f.write_str("browse"),
        }
    }
}

/// Classification of a single turn that is not a back-reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub kind: IntentKind,
    /// Positive spending limit, if the utterance stated one.
    pub budget: Option<f64>,
    /// Matched categories, in vocabulary order.
    pub keywords: Vec<FoodCategory>,
}

impl Intent {
    pub fn browse() -> Self {
        Self {
            kind: IntentKind::Browse,
            budget: None,
            keywords: Vec::new(),
        }
    }
}

/// Outcome of classifying one utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// "add those": commit the previous turn's recommendations.
    ReferentialAdd,
    Intent(Intent),
}

// =============================================================================
// IntentClassifier
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify `utterance` given the session's memory.
    ///
    /// A back-reference is only recognized while recommendations are stored;
    /// it takes precedence over order triggers. Negation is not detected.
    pub fn classify(&self, utterance: &str, memory: &ConversationMemory) -> Classification {
        if memory.has_recommendations() && is_referential(utterance) {
            debug!("Referential add detected");
            return Classification::ReferentialAdd;
        }

        let kind = if ORDER_TRIGGER_RE.is_match(utterance) {
            IntentKind::Order
        } else {
            IntentKind::Browse
        };
        let budget = extract_budget(utterance);
        let keywords = extract_keywords(utterance, &FoodCategory::ORDER_VOCABULARY);

        debug!(kind = %kind, budget = ?budget, keywords = keywords.len(), "Intent classified");
        Classification::Intent(Intent {
            kind,
            budget,
            keywords,
        })
    }
}

/// Referring word plus action word, e.g. "yes add those".
pub fn is_referential(utterance: &str) -> bool {
    REFERRING_RE.is_match(utterance) && ACTION_RE.is_match(utterance)
}

/// Extract a positive spending limit; the phrase starting earliest wins.
pub fn extract_budget(utterance: &str) -> Option<f64> {
    BUDGET_PATTERNS
        .iter()
        .filter_map(|re| re.captures(utterance))
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let value: f64 = caps.get(1)?.as_str().parse().ok()?;
            Some((start, value))
        })
        .min_by_key(|(start, _)| *start)
        .map(|(_, value)| value)
        .filter(|value| *value > 0.0)
}

/// Categories from `vocabulary` mentioned in `utterance`, in vocabulary order.
pub fn extract_keywords(utterance: &str, vocabulary: &[FoodCategory]) -> Vec<FoodCategory> {
    let lower = utterance.to_lowercase();
    vocabulary
        .iter()
        .copied()
        .filter(|c| c.mentioned_in(&lower))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
