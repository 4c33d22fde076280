//! Heuristic menu parser.
//!
//! Scans raw document text with several independent price/name patterns and
//! merges the matches into a deduplicated list of [`MenuItem`]s. Unmatched
//! text is ignored; an empty result is a valid (degraded) outcome.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use thali_core::{DietaryTag, MenuItem};
use tracing::{debug, info, warn};

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 50;
const MIN_PRICE: f64 = 10.0;
const MAX_PRICE: f64 = 10_000.0;
/// Names with more digits than this are page numbers or table noise.
const MAX_NAME_DIGITS: usize = 3;

// =============================================================================
// Compiled patterns (compiled once, reused across calls)
// =============================================================================

/// Which capture group holds the name and which holds the price.
#[derive(Clone, Copy)]
enum Layout {
    NameThenPrice,
    PriceThenName,
}

struct MenuPattern {
    regex: Regex,
    layout: Layout,
}

static MENU_PATTERNS: LazyLock<Vec<MenuPattern>> = LazyLock::new(|| {
    let mk = |pat: &str, layout: Layout| MenuPattern {
        regex: Regex::new(pat).expect("Invalid menu regex"),
        layout,
    };

    // Name classes only admit horizontal whitespace so a name never spans
    // two lines of the source document.
    vec![
        // "Chicken Biryani .... Rs 450"
        mk(
            r"(?im)([A-Za-z \t&'\-]+?)[ \t.]+(?:Rs\.?[ \t]*|PKR[ \t]*)(\d{2,5})",
            Layout::NameThenPrice,
        ),
        // "Naan - 80"
        mk(
            r"(?im)([A-Za-z \t&'\-]{3,40}?)[ \t]*[-—][ \t]*(\d{2,5})(?:[ \t]|$|\.)",
            Layout::NameThenPrice,
        ),
        // "Raita      60"
        mk(
            r"(?im)([A-Za-z \t&'\-]{3,40}?)[ \t]{2,}(\d{2,5})(?:[ \t]|$|\.)",
            Layout::NameThenPrice,
        ),
        // "Rs 250 Mango Lassi"
        mk(
            r"(?im)(?:Rs\.?[ \t]*|PKR[ \t]*)?(\d{2,5})[ \t]+([A-Za-z \t&'\-]{3,40})",
            Layout::PriceThenName,
        ),
        // "Gulab Jamun.....150"
        mk(
            r"(?im)([A-Za-z \t&'\-]{3,40}?)\.{2,}[ \t]*(\d{2,5})",
            Layout::NameThenPrice,
        ),
    ]
});

const VEGETARIAN_WORDS: &[&str] = &["vegan", "vegetarian", "veggie"];
const SPICY_WORDS: &[&str] = &["spicy", "hot", "chili", "jalapeño"];
const MEAT_WORDS: &[&str] = &["chicken", "beef", "mutton", "fish", "meat", "lamb"];

// =============================================================================
// MenuParser
// =============================================================================

/// Extracts structured menu items from best-effort document text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MenuParser;

impl MenuParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse `raw_text` into menu items.
    ///
    /// Patterns are applied in a fixed order and matches are kept in the
    /// order they are found, so the first occurrence of a
    /// `(lowercased name, price)` pair wins. Never fails.
    pub fn parse(&self, raw_text: &str) -> Vec<MenuItem> {
        debug!(chars = raw_text.len(), "Parsing menu text");

        let mut seen: HashSet<(String, u64)> = HashSet::new();
        let mut items = Vec::new();

        for (idx, pattern) in MENU_PATTERNS.iter().enumerate() {
            let before = items.len();
            for caps in pattern.regex.captures_iter(raw_text) {
                let (name_group, price_group) = match pattern.layout {
                    Layout::NameThenPrice => (1, 2),
                    Layout::PriceThenName => (2, 1),
                };
                let (Some(raw_name), Some(raw_price)) = (caps.get(name_group), caps.get(price_group))
                else {
                    continue;
                };
                let Some(item) = build_item(raw_name.as_str(), raw_price.as_str()) else {
                    continue;
                };
                let key = (item.name.to_lowercase(), item.price.to_bits());
                if seen.insert(key) {
                    items.push(item);
                }
            }
            debug!(pattern = idx, added = items.len() - before, "Menu pattern applied");
        }

        if items.is_empty() {
            warn!("No menu items found in document text");
        } else {
            info!(items = items.len(), "Menu items parsed");
        }
        items
    }
}

/// Validate one raw match and turn it into a tagged item.
fn build_item(raw_name: &str, raw_price: &str) -> Option<MenuItem> {
    let name = normalize_name(raw_name);
    let name_len = name.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&name_len) {
        return None;
    }

    let price: f64 = raw_price.parse().ok()?;
    if !(MIN_PRICE..=MAX_PRICE).contains(&price) {
        return None;
    }

    if name.chars().filter(|c| c.is_ascii_digit()).count() > MAX_NAME_DIGITS {
        return None;
    }

    let tags = infer_tags(&name);
    Some(MenuItem { name, price, tags })
}

/// Collapse internal whitespace and strip leading/trailing `.`, `-`, `_`.
pub fn normalize_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c| matches!(c, '.' | '-' | '_'))
        .trim()
        .to_string()
}

/// Infer dietary tags from keywords contained in the item name.
pub fn infer_tags(name: &str) -> Vec<DietaryTag> {
    let lower = name.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    let mut tags = Vec::new();
    if has_any(VEGETARIAN_WORDS) {
        tags.push(DietaryTag::Vegetarian);
    }
    if has_any(SPICY_WORDS) {
        tags.push(DietaryTag::Spicy);
    }
    if has_any(MEAT_WORDS) {
        tags.push(DietaryTag::Meat);
    }
    tags
}

// =============================================================================
// Tests
// =============================================================================
