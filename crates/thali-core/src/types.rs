use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Dietary tag inferred from keywords in a menu item's name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietaryTag {
    /// vegan / vegetarian / veggie.
    Vegetarian,
    /// spicy / hot / chili / jalapeño.
    Spicy,
    /// chicken / beef / mutton / fish / meat / lamb.
    Meat,
}

impl DietaryTag {
    /// Lowercase label, as it appears in prompts and keyword matching.
    pub fn as_str(&self) -> &'static str {
        match self {
            DietaryTag::Vegetarian => "vegetarian",
            DietaryTag::Spicy => "spicy",
            DietaryTag::Meat => "meat",
        }
    }
}

impl fmt::Display for DietaryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speaker of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

// =============================================================================
// Menu
// =============================================================================

/// One parsed menu entry.
///
/// Created in bulk by the menu parser and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Normalized display name (3 to 50 characters).
    pub name: String,
    /// Price in currency units (10 to 10000).
    pub price: f64,
    /// Tags inferred from the name, in declaration order without duplicates.
    #[serde(default)]
    pub tags: Vec<DietaryTag>,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            tags: Vec::new(),
        }
    }

    /// Builder-style helper used mostly by tests and fixtures.
    pub fn with_tags(mut self, tags: &[DietaryTag]) -> Self {
        self.tags = tags.to_vec();
        self
    }

    pub fn has_tag(&self, tag: DietaryTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Lowercased name followed by tag labels, used for keyword containment.
    pub fn search_text(&self) -> String {
        let mut text = self.name.to_lowercase();
        for tag in &self.tags {
            text.push(' ');
            text.push_str(tag.as_str());
        }
        text
    }

    pub fn to_recommended(&self) -> RecommendedItem {
        RecommendedItem {
            name: self.name.clone(),
            price: self.price,
        }
    }
}

/// A `{name, price}` pair shown to the user or committed to the cart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendedItem {
    pub name: String,
    pub price: f64,
}

impl RecommendedItem {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// Format a currency amount the way menus print it: whole amounts without
/// decimals (`450`), everything else with two (`472.50`).
pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line of the customer's cart.
///
/// `line_subtotal` always equals `quantity * unit_price`; use
/// [`CartLine::set_quantity`] rather than writing the fields directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub line_subtotal: f64,
}

impl CartLine {
    pub fn new(name: impl Into<String>, unit_price: f64) -> Self {
        Self {
            name: name.into(),
            quantity: 1,
            unit_price,
            line_subtotal: unit_price,
        }
    }

    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.line_subtotal = f64::from(quantity) * self.unit_price;
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// A single entry in a session transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl TurnRecord {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}
