//! Prompt building and reply composition.
//!
//! Everything the customer reads is composed here: the LLM prompt for
//! browse turns, confirmations for items the agent committed, and the
//! friendly fallbacks used when a turn degrades.

use std::fmt::Write as _;

use thali_core::{format_amount, MenuItem};

use crate::selector::SelectedItem;

// =============================================================================
// Fixed replies
// =============================================================================

/// Substituted for the LLM answer when generation fails or times out.
pub const APOLOGY_MESSAGE: &str = "Sorry, I couldn't put together an answer just now. \
Here are some items from the menu that might help. Please try rephrasing your question.";

/// Returned when an order turn finds nothing that fits.
pub const REPHRASE_MESSAGE: &str = "I couldn't find items on the menu that match that order. \
Could you rephrase, name a dish, or try a different budget?";

const PROMPT_INSTRUCTIONS: &str = "INSTRUCTIONS:
- Answer ONLY based on the menu information above
- Always mention specific items and their prices ({currency} XXX)
- Be friendly and conversational
- If recommending items, suggest 2-3 with prices
- For dietary preferences (vegetarian, spicy), filter accordingly
- If item not found, politely say it's not on the menu";

// =============================================================================
// ResponseComposer
// =============================================================================

/// Builds prompts and customer-facing messages.
#[derive(Debug, Clone)]
pub struct ResponseComposer {
    /// Currency marker placed before every amount.
    currency: String,
    /// Number of menu items listed in a browse prompt.
    prompt_menu_items: usize,
}

impl Default for ResponseComposer {
    fn default() -> Self {
        Self::new("Rs", 30)
    }
}

impl ResponseComposer {
    pub fn new(currency: impl Into<String>, prompt_menu_items: usize) -> Self {
        Self {
            currency: currency.into(),
            prompt_menu_items,
        }
    }

    /// Format an amount with the currency marker, e.g. `Rs 450`.
    pub fn money(&self, amount: f64) -> String {
        format!("{} {}", self.currency, format_amount(amount))
    }

    /// Listing line for one menu item, e.g. `- Chicken Biryani: Rs 450 (meat)`.
    pub fn menu_line(&self, item: &MenuItem) -> String {
        let mut line = format!("- {}: {}", item.name, self.money(item.price));
        if !item.tags.is_empty() {
            let tags: Vec<&str> = item.tags.iter().map(|t| t.as_str()).collect();
            let _ = write!(line, " ({})", tags.join(", "));
        }
        line
    }

    /// Browse-turn prompt: retrieved chunks, a bounded item listing and
    /// the customer's question.
    pub fn build_prompt(&self, question: &str, context_chunks: &[String], items: &[MenuItem]) -> String {
        let menu_context = context_chunks.join("\n\n");
        let listing: Vec<String> = items
            .iter()
            .take(self.prompt_menu_items)
            .map(|item| self.menu_line(item))
            .collect();

        format!(
            "You are a helpful restaurant assistant. Answer customer questions about the menu.\n\
             \n\
             MENU CONTEXT FROM PDF:\n\
             {menu_context}\n\
             \n\
             AVAILABLE ITEMS:\n\
             {items}\n\
             \n\
             CUSTOMER QUESTION: {question}\n\
             \n\
             {instructions}\n\
             \n\
             Your answer:",
            items = listing.join("\n"),
            instructions = PROMPT_INSTRUCTIONS.replace("{currency}", &self.currency),
        )
    }

    /// Confirmation for items committed to the cart, with their total and,
    /// when a budget was given, what is left of it.
    pub fn compose_added_message(&self, items: &[SelectedItem], budget: Option<f64>) -> String {
        let total: f64 = items.iter().map(|i| i.price * f64::from(i.quantity)).sum();

        let mut message = String::from("I've added these to your cart:\n");
        for item in items {
            let _ = writeln!(message, "- {} ({})", item.name, self.money(item.price));
        }
        let _ = write!(message, "Total: {}", self.money(total));

        if let Some(budget) = budget {
            let remaining = (budget - total).max(0.0);
            let _ = write!(message, "\nRemaining budget: {}", self.money(remaining));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thali_core::DietaryTag;

    fn selected(name: &str, price: f64) -> SelectedItem {
        SelectedItem {
            name: name.to_string(),
            price,
            quantity: 1,
        }
    }

    // ---- Prompt ----

    #[test]
    fn test_menu_line_with_tags() {
        let item = MenuItem::new("Chicken Biryani", 450.0).with_tags(&[DietaryTag::Meat]);
        assert_eq!(
            ResponseComposer::default().menu_line(&item),
            "- Chicken Biryani: Rs 450 (meat)"
        );
    }

    #[test]
    fn test_menu_line_without_tags() {
        let item = MenuItem::new("Naan", 80.0);
        assert_eq!(ResponseComposer::default().menu_line(&item), "- Naan: Rs 80");
    }

    #[test]
    fn test_menu_line_multiple_tags() {
        let item = MenuItem::new("Spicy Chicken Wings", 520.5)
            .with_tags(&[DietaryTag::Spicy, DietaryTag::Meat]);
        assert_eq!(
            ResponseComposer::default().menu_line(&item),
            "- Spicy Chicken Wings: Rs 520.50 (spicy, meat)"
        );
    }

    #[test]
    fn test_build_prompt_sections() {
        let items = vec![MenuItem::new("Naan", 80.0)];
        let chunks = vec!["BREADS\nNaan - 80".to_string(), "DRINKS".to_string()];
        let prompt = ResponseComposer::default().build_prompt("Is there bread?", &chunks, &items);

        assert!(prompt.starts_with("You are a helpful restaurant assistant."));
        assert!(prompt.contains("MENU CONTEXT FROM PDF:\nBREADS\nNaan - 80\n\nDRINKS"));
        assert!(prompt.contains("AVAILABLE ITEMS:\n- Naan: Rs 80"));
        assert!(prompt.contains("CUSTOMER QUESTION: Is there bread?"));
        assert!(prompt.contains("- Answer ONLY based on the menu information above"));
        assert!(prompt.ends_with("Your answer:"));
    }

    #[test]
    fn test_build_prompt_bounds_listing() {
        let items: Vec<MenuItem> = (0..40)
            .map(|i| MenuItem::new(format!("Dish {}", i), 100.0))
            .collect();
        let prompt = ResponseComposer::new("Rs", 30).build_prompt("menu?", &[], &items);
        assert!(prompt.contains("- Dish 29: Rs 100"));
        assert!(!prompt.contains("- Dish 30:"));
    }

    // ---- Confirmations ----

    #[test]
    fn test_added_message_without_budget() {
        let message = ResponseComposer::default()
            .compose_added_message(&[selected("Chicken Biryani", 450.0)], None);
        assert!(message.contains("- Chicken Biryani (Rs 450)"));
        assert!(message.contains("Total: Rs 450"));
        assert!(!message.contains("Remaining"));
    }

    #[test]
    fn test_added_message_with_remaining_budget() {
        let items = vec![selected("Mango Lassi", 250.0), selected("Naan", 80.0)];
        let message = ResponseComposer::default().compose_added_message(&items, Some(800.0));
        assert!(message.contains("Total: Rs 330"));
        assert!(message.contains("Remaining budget: Rs 470"));
    }

    #[test]
    fn test_custom_currency() {
        let composer = ResponseComposer::new("PKR", 30);
        assert_eq!(composer.money(99.5), "PKR 99.50");
    }

    #[test]
    fn test_prompt_instructions_use_configured_currency() {
        let items = vec![MenuItem::new("Naan", 80.0)];
        let prompt = ResponseComposer::new("USD", 30).build_prompt("bread?", &[], &items);
        assert!(prompt.contains("their prices (USD XXX)"));
        assert!(prompt.contains("- Naan: USD 80"));
        assert!(!prompt.contains("Rs"));
    }

    #[test]
    fn test_fallback_messages_hide_internals() {
        for message in [APOLOGY_MESSAGE, REPHRASE_MESSAGE] {
            assert!(!message.to_lowercase().contains("error"));
            assert!(message.contains("rephras"));
        }
    }
}
