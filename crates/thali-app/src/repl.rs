//! Interactive chat loop commands and rendering.

use std::fmt::Write as _;
use std::path::PathBuf;

use thali_chat::{Cart, MenuKnowledgeBase, TurnResponse};
use thali_core::{format_amount, TurnRecord};

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Plain text for the agent.
    Say(String),
    Cart,
    Menu,
    Load(PathBuf),
    Reset,
    History,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        let Some(command) = line.strip_prefix(':') else {
            return ReplCommand::Say(line.to_string());
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        match name {
            "cart" => ReplCommand::Cart,
            "menu" => ReplCommand::Menu,
            "load" if !rest.is_empty() => ReplCommand::Load(PathBuf::from(rest)),
            "reset" => ReplCommand::Reset,
            "history" => ReplCommand::History,
            "help" | "h" => ReplCommand::Help,
            "quit" | "q" | "exit" => ReplCommand::Quit,
            _ => ReplCommand::Unknown(line.to_string()),
        }
    }
}

pub const HELP: &str = "Commands:
  :cart          show the cart and totals
  :menu          list parsed menu items
  :load <file>   process a new menu document
  :reset         forget the conversation
  :history       show the transcript
  :quit          exit
Anything else is sent to the assistant.";

/// Assistant reply followed by any recommendations or cart actions.
pub fn render_turn(response: &TurnResponse, currency: &str) -> String {
    let mut out = response.answer.clone();
    if !response.recommendations.is_empty() {
        out.push_str("\n\nRecommended:");
        for item in &response.recommendations {
            let _ = write!(out, "\n  - {} ({} {})", item.name, currency, format_amount(item.price));
        }
        out.push_str("\n(say \"add those\" to order them)");
    }
    out
}

pub fn render_cart(cart: &Cart, currency: &str) -> String {
    if cart.is_empty() {
        return "Your cart is empty.".to_string();
    }
    let money = |v: f64| format!("{} {}", currency, format_amount(v));
    let mut out = String::from("Cart:");
    for line in cart.lines() {
        let _ = write!(
            out,
            "\n  {} x{} @ {} = {}",
            line.name,
            line.quantity,
            money(line.unit_price),
            money(line.line_subtotal)
        );
    }
    let totals = cart.totals();
    let _ = write!(
        out,
        "\nSubtotal: {}\nTax: {}\nDelivery: {}\nTotal: {}",
        money(totals.subtotal),
        money(totals.tax),
        money(totals.delivery_fee),
        money(totals.total)
    );
    out
}

pub fn render_menu(kb: &MenuKnowledgeBase, currency: &str) -> String {
    if kb.items().is_empty() {
        return "No menu items were recognized in this document.".to_string();
    }
    let mut out = format!("{} items:", kb.items().len());
    for item in kb.items() {
        let _ = write!(out, "\n  {} - {} {}", item.name, currency, format_amount(item.price));
        if !item.tags.is_empty() {
            let tags: Vec<&str> = item.tags.iter().map(|t| t.as_str()).collect();
            let _ = write!(out, " [{}]", tags.join(", "));
        }
    }
    out
}

pub fn render_history(transcript: &[TurnRecord]) -> String {
    if transcript.is_empty() {
        return "No messages yet.".to_string();
    }
    transcript
        .iter()
        .map(|t| format!("[{}] {}: {}", t.timestamp.format("%H:%M:%S"), t.role, t.content))
        .collect::<Vec<_>>()
        .join("\n")
}
